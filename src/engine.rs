//! The `FactorizationEngine` trait, which defines the interface for training backends.

use crate::config::Solver;
use crate::error::Result;
use crate::table::ScalableTable;

/// Everything an engine needs to know to train a model on a table.
#[derive(Debug, Clone)]
pub struct TrainingConfig {
  /// Column holding user identifiers.
  pub users_col: String,
  /// Column holding item identifiers.
  pub items_col: String,
  /// Optional item side features. When present, the table contains the items
  /// column plus one column per feature.
  pub item_data: Option<ScalableTable>,
  /// The solver to train with.
  pub solver: Solver,
}

/// A trait for ranking-factorization backends.
///
/// The recommender adapter never learns anything itself. It converts data,
/// hands it to an engine, keeps the returned model and later asks the engine
/// to query that model. Implementations own the whole algorithm: latent
/// factor learning, similarity computation and ranking.
///
/// The model is an associated type so that the adapter can store it without
/// knowing what it is.
///
/// # Output tables
///
/// Query methods return a [`ScalableTable`] with one row per result:
///
/// | method          | columns                                    |
/// |-----------------|--------------------------------------------|
/// | `similar_users` | `<users_col>`, `similar`, `score`, `rank`  |
/// | `similar_items` | `<items_col>`, `similar`, `score`, `rank`  |
/// | `recommend`     | `<users_col>`, `<items_col>`, `score`, `rank` |
///
/// One block of at most `k` rows is emitted for every entry in the query
/// slice, duplicates included; deduplication is left to the caller.
pub trait FactorizationEngine {
  /// The trained model handle.
  type Model;

  /// Trains a model on `data`.
  ///
  /// # Errors
  ///
  /// Implementations should fail with `ColumnNotFound` when the configured
  /// columns are absent and `EmptyDataset` when `data` has no rows.
  fn train(&self, data: &ScalableTable, config: &TrainingConfig) -> Result<Self::Model>;

  /// Finds, for every query user, the `k` users whose latent factors are
  /// closest by cosine similarity. A user is never its own neighbour.
  fn similar_users(&self, model: &Self::Model, users: &[String], k: usize) -> Result<ScalableTable>;

  /// Finds, for every query item, the `k` most similar items.
  fn similar_items(&self, model: &Self::Model, items: &[String], k: usize) -> Result<ScalableTable>;

  /// Ranks the `k` best unseen items for every query user.
  fn recommend(&self, model: &Self::Model, users: &[String], k: usize) -> Result<ScalableTable>;
}
