//! The recommender adapter that ties data conversion, training and ranking together.

use crate::config::{RecommenderConfig, Solver};
use crate::engine::{FactorizationEngine, TrainingConfig};
use crate::error::{FactorusError, Result};
use crate::frame::DataFrame;
use crate::solvers::IalsEngine;
use crate::table::ScalableTable;
use serde_json::Value;

/// Name of the provenance column appended to every ranking result.
pub const PROVENANCE_COLUMN: &str = "table";

/// Whether a recommender has been trained yet.
///
/// A recommender starts `Unfitted` and moves to `Fitted` on its first
/// successful [`fit`](RankingFactorizationRecommender::fit). Fitting again
/// replaces the stored model and table.
pub enum FitState<M> {
  Unfitted,
  Fitted {
    /// The model handle returned by the engine.
    model: M,
    /// The converted table the model was trained on.
    table: ScalableTable,
  },
}

/// A ranking-factorization recommender bound to a named dataset layout.
///
/// The recommender knows which columns hold users, items and optional item
/// side features. It converts a [`DataFrame`] into a [`ScalableTable`],
/// delegates training to its [`FactorizationEngine`] and reshapes the
/// engine's similarity output: duplicate rows are dropped, rows are sorted
/// by the key column and a `table` column carrying the recommender's name is
/// appended.
///
/// Create one with [`new`](Self::new) or [`from_config`](Self::from_config).
/// The default engine is [`IalsEngine`]; use [`with_engine`](Self::with_engine)
/// to swap it.
///
/// # Examples
///
/// ```rust
/// use factorus::prelude::*;
/// use serde_json::json;
///
/// let mut data = DataFrame::new(["user_id", "movie_id"]);
/// for (user, movie) in [(1, 10), (1, 11), (2, 10), (2, 11), (3, 12), (3, 13)] {
///     data.push_row(vec![json!(user), json!(movie)]).unwrap();
/// }
///
/// let mut recommender = RankingFactorizationRecommender::new("movies", "user_id", "movie_id");
/// recommender.fit(&data).unwrap();
///
/// let ranked = recommender.rank_users(2).unwrap();
/// assert!(ranked
///     .column("table")
///     .unwrap()
///     .iter()
///     .all(|v| **v == json!("movies")));
/// ```
pub struct RankingFactorizationRecommender<E: FactorizationEngine = IalsEngine> {
  name: String,
  users_col: String,
  items_col: String,
  extra_cols: Vec<String>,
  engine: E,
  state: FitState<E::Model>,
}

impl RankingFactorizationRecommender<IalsEngine> {
  /// Creates a recommender using the default iALS engine.
  ///
  /// Nothing is validated here. Missing columns surface when fitting.
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
      engine: IalsEngine::default(),
      state: FitState::Unfitted,
    }
  }

  /// Creates a recommender from a deserialized configuration.
  pub fn from_config(config: RecommenderConfig) -> Self {
    Self {
      name: config.name,
      users_col: config.users_col,
      items_col: config.items_col,
      extra_cols: config.extra_cols,
      engine: IalsEngine::new(config.solver),
      state: FitState::Unfitted,
    }
  }
}

impl<E: FactorizationEngine> RankingFactorizationRecommender<E> {
  /// Replaces the engine. The returned recommender is unfitted.
  pub fn with_engine<F: FactorizationEngine>(self, engine: F) -> RankingFactorizationRecommender<F> {
    RankingFactorizationRecommender {
      name: self.name,
      users_col: self.users_col,
      items_col: self.items_col,
      extra_cols: self.extra_cols,
      engine,
      state: FitState::Unfitted,
    }
  }

  /// Sets the item side-feature columns.
  pub fn with_extra_cols<I, S>(mut self, cols: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    self.extra_cols = cols.into_iter().map(Into::into).collect();
    self
  }

  pub fn name(&self) -> &str {
    &self.name
  }

  pub fn users_col(&self) -> &str {
    &self.users_col
  }

  pub fn items_col(&self) -> &str {
    &self.items_col
  }

  pub fn extra_cols(&self) -> &[String] {
    &self.extra_cols
  }

  pub fn engine(&self) -> &E {
    &self.engine
  }

  pub fn is_fitted(&self) -> bool {
    matches!(self.state, FitState::Fitted { .. })
  }

  /// The trained model, if any.
  pub fn model(&self) -> Option<&E::Model> {
    match &self.state {
      FitState::Fitted { model, .. } => Some(model),
      FitState::Unfitted => None,
    }
  }

  /// The converted table from the last successful fit, if any.
  pub fn table(&self) -> Option<&ScalableTable> {
    match &self.state {
      FitState::Fitted { table, .. } => Some(table),
      FitState::Unfitted => None,
    }
  }

  /// Converts a frame into the engine's container, coercing every cell to text.
  pub fn get_dataframe(&self, data: &DataFrame) -> ScalableTable {
    let table = ScalableTable::from_frame(data);
    tracing::debug!(
      rows = table.num_rows(),
      columns = table.num_columns(),
      "converted dataframe to scalable table"
    );
    table
  }

  /// Learns latent factors for every user and item in `data`.
  ///
  /// On success the model and the converted table replace any earlier fit.
  /// On failure the previous state is kept and the engine's error is
  /// returned as is.
  pub fn fit(&mut self, data: &DataFrame) -> Result<()> {
    let table = self.get_dataframe(data);
    let config = TrainingConfig {
      users_col: self.users_col.clone(),
      items_col: self.items_col.clone(),
      item_data: self.item_data(&table)?,
      solver: Solver::Ials,
    };

    let model = self.engine.train(&table, &config)?;
    tracing::info!(name = %self.name, rows = table.num_rows(), "fitted recommender");
    self.state = FitState::Fitted { model, table };
    Ok(())
  }

  /// Resolves the configured extra columns into an item side-feature table.
  ///
  /// With no extra columns there is no side table. Otherwise the side table
  /// holds the items column followed by the extra columns, one row per
  /// distinct combination.
  fn item_data(&self, table: &ScalableTable) -> Result<Option<ScalableTable>> {
    if self.extra_cols.is_empty() {
      return Ok(None);
    }

    let mut columns = vec![self.items_col.as_str()];
    columns.extend(
      self
        .extra_cols
        .iter()
        .map(String::as_str)
        .filter(|c| *c != self.items_col),
    );

    Ok(Some(table.select(&columns[..])?.drop_duplicates()))
  }

  fn fitted(&self) -> Result<(&E::Model, &ScalableTable)> {
    match &self.state {
      FitState::Fitted { model, table } => Ok((model, table)),
      FitState::Unfitted => Err(FactorusError::NotFitted),
    }
  }

  /// Drops duplicate rows, sorts by `key` and tags every row with the name.
  fn finish(&self, result: ScalableTable, key: &str) -> Result<DataFrame> {
    let frame = result
      .drop_duplicates()
      .sort_by(key)?
      .to_frame()?
      .with_constant_column(PROVENANCE_COLUMN, Value::String(self.name.clone()));
    Ok(frame)
  }

  /// Ranks the `n_top` nearest users of every fitted user.
  ///
  /// Nearness is cosine similarity between latent user factors. The result
  /// has the columns `<users_col>`, `similar`, `score`, `rank` and `table`,
  /// contains no duplicate rows and is sorted ascending by the users column.
  ///
  /// # Errors
  ///
  /// Fails with `NotFitted` before the first successful fit.
  pub fn rank_users(&self, n_top: usize) -> Result<DataFrame> {
    let (model, table) = self.fitted()?;
    let users = table.column(&self.users_col)?.text();
    let result = self.engine.similar_users(model, &users, n_top)?;
    self.finish(result, &self.users_col)
  }

  /// Ranks the `n_top` nearest items of every fitted item.
  ///
  /// Same shape as [`rank_users`](Self::rank_users), keyed by the items
  /// column.
  pub fn rank_items(&self, n_top: usize) -> Result<DataFrame> {
    let (model, table) = self.fitted()?;
    let items = table.column(&self.items_col)?.text();
    let result = self.engine.similar_items(model, &items, n_top)?;
    self.finish(result, &self.items_col)
  }

  /// Recommends up to `n_top` items each fitted user has not interacted with.
  ///
  /// Columns are `<users_col>`, `<items_col>`, `score`, `rank` and `table`,
  /// sorted ascending by the users column.
  pub fn recommend(&self, n_top: usize) -> Result<DataFrame> {
    let (model, table) = self.fitted()?;
    let users = table.column(&self.users_col)?.text();
    let result = self.engine.recommend(model, &users, n_top)?;
    self.finish(result, &self.users_col)
  }
}
