//! Error type shared by the adapter, the tables and the engines.

use thiserror::Error;

/// Convenience alias used throughout the crate.
pub type Result<T> = std::result::Result<T, FactorusError>;

/// Everything that can go wrong while converting, fitting or querying.
///
/// The adapter itself never produces or translates these beyond `NotFitted`;
/// they come from table access or from the engine and are passed through
/// unchanged.
#[derive(Error, Debug)]
pub enum FactorusError {
  #[error("Column '{column}' not found")]
  ColumnNotFound { column: String },

  #[error("Row has {found} cells but the frame has {expected} columns")]
  RowLength { expected: usize, found: usize },

  #[error("Record {index} is not a JSON object")]
  InvalidRecord { index: usize },

  #[error("Cannot train on an empty dataset")]
  EmptyDataset,

  #[error("Recommender has not been fitted yet")]
  NotFitted,

  #[error("Solver failed: {message}")]
  Solver { message: String },

  #[error("Invalid configuration: {0}")]
  Config(#[from] serde_json::Error),
}

impl FactorusError {
  pub fn column_not_found(column: impl Into<String>) -> Self {
    Self::ColumnNotFound { column: column.into() }
  }

  pub fn solver(message: impl Into<String>) -> Self {
    Self::Solver { message: message.into() }
  }
}
