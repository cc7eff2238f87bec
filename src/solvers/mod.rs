//! Built-in `FactorizationEngine` implementations.
//!
//! # Available Engines
//!
//! - [`IalsEngine`](crate::solvers::IalsEngine): implicit alternating least
//!   squares with cosine neighbour search over the learned factors.

/// Implements the implicit alternating least squares engine.
pub mod ials;
/// Dense factor storage and the Cholesky solver.
pub mod linalg;
/// The trained model returned by the iALS engine.
pub mod model;

pub use ials::{IalsConfig, IalsEngine};
pub use model::LatentFactorModel;
