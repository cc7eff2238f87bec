//! Factorus - A ranking-factorization recommender adapter.
//!
//! Factorus wraps a matrix-factorization engine behind a small adapter: it
//! converts a tabular dataset into the engine's column store, delegates
//! training, and reshapes similarity results into a tagged table. The
//! default engine learns latent factors with implicit alternating least
//! squares, but any [`FactorizationEngine`](engine::FactorizationEngine)
//! can be plugged in.

pub mod error;
pub mod frame;
pub mod table;
pub mod config;
pub mod engine;
pub mod recommender;
pub mod solvers;

pub mod prelude {
    //! Convenient re-exports for common types and traits.

    pub use crate::error::FactorusError;
    pub use crate::frame::*;
    pub use crate::table::*;
    pub use crate::config::*;
    pub use crate::engine::*;
    pub use crate::recommender::*;
    pub use crate::solvers::*;
}
