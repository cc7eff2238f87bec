//! Serializable configuration for recommenders and solvers.

use crate::error::Result;
use crate::solvers::IalsConfig;
use serde::{Deserialize, Serialize};

/// The solver an engine is asked to train with.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Solver {
  /// Implicit alternating least squares.
  #[default]
  Ials,
}

impl Solver {
  pub fn as_str(&self) -> &'static str {
    match self {
      Solver::Ials => "ials",
    }
  }
}

/// Configuration for a [`RankingFactorizationRecommender`].
///
/// Only `name`, `users_col` and `items_col` are required when
/// deserializing; the rest falls back to defaults.
///
/// [`RankingFactorizationRecommender`]: crate::recommender::RankingFactorizationRecommender
///
/// # Examples
///
/// ```rust
/// use factorus::prelude::*;
///
/// let config = RecommenderConfig::from_json(
///     r#"{ "name": "movies", "users_col": "user_id", "items_col": "movie_id",
///          "solver": { "num_factors": 4 } }"#,
/// ).unwrap();
///
/// assert!(config.extra_cols.is_empty());
/// assert_eq!(config.solver.num_factors, 4);
/// assert_eq!(config.solver.max_iterations, IalsConfig::default().max_iterations);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RecommenderConfig {
  /// Identifier of the adapter, written into the `table` column of results.
  pub name: String,
  /// Column holding user identifiers.
  pub users_col: String,
  /// Column holding item identifiers.
  pub items_col: String,
  /// Item side-feature columns, in order.
  #[serde(default)]
  pub extra_cols: Vec<String>,
  /// Settings for the default iALS engine.
  #[serde(default)]
  pub solver: IalsConfig,
}

impl RecommenderConfig {
  pub fn new(
    name: impl Into<String>,
    users_col: impl Into<String>,
    items_col: impl Into<String>,
  ) -> Self {
    Self {
      name: name.into(),
      users_col: users_col.into(),
      items_col: items_col.into(),
      extra_cols: Vec::new(),
      solver: IalsConfig::default(),
    }
  }

  /// Parses a configuration from JSON text.
  pub fn from_json(text: &str) -> Result<Self> {
    Ok(serde_json::from_str(text)?)
  }

  /// Sets the side-feature columns.
  pub fn extra_cols<I, S>(mut self, cols: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.extra_cols = cols.into_iter().map(Into::into).collect();
    self
  }

  /// Sets the solver settings.
  pub fn solver(mut self, solver: IalsConfig) -> Self {
    self.solver = solver;
    self
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use crate::error::FactorusError;

  #[test]
  fn test_solver_serializes_lowercase() {
    assert_eq!(serde_json::to_string(&Solver::Ials).unwrap(), "\"ials\"");
    assert_eq!(Solver::default().as_str(), "ials");
  }

  #[test]
  fn test_missing_required_field() {
    let err = RecommenderConfig::from_json(r#"{ "name": "x", "users_col": "u" }"#).unwrap_err();
    assert!(matches!(err, FactorusError::Config(_)));
  }

  #[test]
  fn test_builder_matches_json() {
    let built = RecommenderConfig::new("movies", "user_id", "movie_id").extra_cols(["genre"]);
    let parsed = RecommenderConfig::from_json(
      r#"{ "name": "movies", "users_col": "user_id", "items_col": "movie_id", "extra_cols": ["genre"] }"#,
    )
    .unwrap();
    assert_eq!(built, parsed);
  }
}
