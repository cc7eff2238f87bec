//! Implicit-feedback alternating least squares.
//!
//! Every observed (user, item) pair counts as a positive preference whose
//! confidence grows with how often the pair was observed. Missing pairs are
//! treated as weak negatives. User and item factors are solved in closed
//! form, one side at a time.

use crate::config::Solver;
use crate::engine::{FactorizationEngine, TrainingConfig};
use crate::error::{FactorusError, Result};
use crate::solvers::linalg::{cholesky_solve, Factors};
use crate::solvers::model::{IdIndex, LatentFactorModel};
use crate::table::{Column, ScalableTable};
use ndarray::{Array1, Array2, Axis};
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashMap};

#[cfg(feature = "parallel")]
use rayon::prelude::*;

/// Tuning parameters for [`IalsEngine`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IalsConfig {
  /// Length of every latent vector.
  #[serde(default = "default_num_factors")]
  pub num_factors: usize,
  /// L2 penalty added to every solve. Must be positive.
  #[serde(default = "default_regularization")]
  pub regularization: f64,
  /// Confidence scaling: an observation of strength `r` gets confidence
  /// `1 + alpha * r`.
  #[serde(default = "default_alpha")]
  pub alpha: f64,
  /// Number of full user/item sweeps.
  #[serde(default = "default_max_iterations")]
  pub max_iterations: usize,
  /// Seed for the initial factors.
  #[serde(default)]
  pub seed: u64,
  /// Strength of the implicit link between a user and the side features of
  /// the items they interacted with.
  #[serde(default = "default_side_data_weight")]
  pub side_data_weight: f64,
}

fn default_num_factors() -> usize {
  8
}

fn default_regularization() -> f64 {
  0.01
}

fn default_alpha() -> f64 {
  40.0
}

fn default_max_iterations() -> usize {
  15
}

fn default_side_data_weight() -> f64 {
  0.5
}

impl Default for IalsConfig {
  fn default() -> Self {
    Self {
      num_factors: default_num_factors(),
      regularization: default_regularization(),
      alpha: default_alpha(),
      max_iterations: default_max_iterations(),
      seed: 0,
      side_data_weight: default_side_data_weight(),
    }
  }
}

impl IalsConfig {
  pub fn num_factors(mut self, num_factors: usize) -> Self {
    self.num_factors = num_factors;
    self
  }

  pub fn regularization(mut self, regularization: f64) -> Self {
    self.regularization = regularization;
    self
  }

  pub fn alpha(mut self, alpha: f64) -> Self {
    self.alpha = alpha;
    self
  }

  pub fn max_iterations(mut self, max_iterations: usize) -> Self {
    self.max_iterations = max_iterations;
    self
  }

  pub fn seed(mut self, seed: u64) -> Self {
    self.seed = seed;
    self
  }

  pub fn side_data_weight(mut self, side_data_weight: f64) -> Self {
    self.side_data_weight = side_data_weight;
    self
  }

  /// Rejects settings that cannot produce usable factors.
  pub fn validate(&self) -> Result<()> {
    if self.num_factors == 0 {
      return Err(FactorusError::solver("num_factors must be at least 1"));
    }
    if !(self.regularization > 0.0 && self.regularization.is_finite()) {
      return Err(FactorusError::solver(format!(
        "regularization must be a positive number, got {}",
        self.regularization
      )));
    }
    Ok(())
  }
}

/// The default [`FactorizationEngine`]: iALS training with brute-force
/// cosine neighbour search.
///
/// Item side features are folded into the interaction matrix. Each distinct
/// `(column, value)` pair becomes an extra pseudo-item, and every interaction
/// with an item also counts, with weight `side_data_weight`, as an
/// interaction with that item's pseudo-items. Users who favour items with
/// shared features therefore end up with closer factors.
///
/// # Examples
///
/// ```rust
/// use factorus::prelude::*;
///
/// let table = ScalableTable::from_columns(vec![
///     ("user", Column::Text(vec!["a".into(), "a".into(), "b".into(), "b".into()])),
///     ("item", Column::Text(vec!["x".into(), "y".into(), "x".into(), "y".into()])),
/// ]).unwrap();
///
/// let engine = IalsEngine::new(IalsConfig::default().num_factors(2));
/// let config = TrainingConfig {
///     users_col: "user".into(),
///     items_col: "item".into(),
///     item_data: None,
///     solver: Solver::Ials,
/// };
/// let model = engine.train(&table, &config).unwrap();
/// assert_eq!(model.num_users(), 2);
/// assert_eq!(model.num_items(), 2);
/// ```
#[derive(Debug, Clone, Default)]
pub struct IalsEngine {
  config: IalsConfig,
}

impl IalsEngine {
  pub fn new(config: IalsConfig) -> Self {
    Self { config }
  }

  pub fn config(&self) -> &IalsConfig {
    &self.config
  }

  /// Solves every row of one side against the fixed factors of the other.
  ///
  /// `observations[r]` lists `(column, strength)` pairs for row `r`.
  fn solve_side(&self, observations: &[Vec<(usize, f64)>], fixed: &Factors) -> Result<Factors> {
    let gram = fixed.gram();

    #[cfg(feature = "parallel")]
    let iter = observations.par_iter();
    #[cfg(not(feature = "parallel"))]
    let iter = observations.iter();

    let rows = iter
      .map(|observed| self.solve_row(observed, fixed, &gram))
      .collect::<Result<Vec<Array1<f64>>>>()?;

    Ok(Factors::from_rows(fixed.dim(), rows))
  }

  /// `(YᵀY + Yᵀ(C - I)Y + λI) x = YᵀCp` for a single row.
  fn solve_row(&self, observed: &[(usize, f64)], fixed: &Factors, gram: &Array2<f64>) -> Result<Array1<f64>> {
    let mut a = gram.clone();
    let mut b = Array1::<f64>::zeros(fixed.dim());

    a.diag_mut().mapv_inplace(|d| d + self.config.regularization);

    for &(column, strength) in observed {
      let confidence = 1.0 + self.config.alpha * strength;
      let y = fixed.row(column);
      let outer = y.insert_axis(Axis(1));
      b.scaled_add(confidence, &y);
      a.scaled_add(confidence - 1.0, &outer.dot(&outer.t()));
    }

    cholesky_solve(&a, &b)
  }

  /// Side features as pseudo-item lists, keyed by item position.
  fn side_features(
    &self,
    item_data: &ScalableTable,
    items_col: &str,
    items: &IdIndex,
  ) -> Result<(Vec<Vec<usize>>, usize)> {
    let keys = item_data.column(items_col)?.text();
    let mut features = IdIndex::default();
    let mut by_item: Vec<Vec<usize>> = vec![Vec::new(); items.len()];

    for name in item_data.column_names().iter().filter(|n| *n != items_col) {
      let values = item_data.column(name)?.text();
      for (key, value) in keys.iter().zip(values.iter()) {
        let Some(item) = items.get(key) else {
          continue;
        };
        let feature = features.insert(&format!("{name}={value}"));
        if !by_item[item].contains(&feature) {
          by_item[item].push(feature);
        }
      }
    }

    Ok((by_item, features.len()))
  }

  fn ranked_table(
    query_col: &str,
    result_col: &str,
    blocks: Vec<(&str, Vec<(String, f64)>)>,
  ) -> Result<ScalableTable> {
    let mut queries = Vec::new();
    let mut results = Vec::new();
    let mut scores = Vec::new();
    let mut ranks = Vec::new();

    for (query, ranked) in blocks {
      for (rank, (result, score)) in ranked.into_iter().enumerate() {
        queries.push(query.to_string());
        results.push(result);
        scores.push(score);
        ranks.push(rank as i64 + 1);
      }
    }

    ScalableTable::from_columns(vec![
      (query_col.to_string(), Column::Text(queries)),
      (result_col.to_string(), Column::Text(results)),
      ("score".to_string(), Column::Float(scores)),
      ("rank".to_string(), Column::Integer(ranks)),
    ])
  }

  /// Runs `lookup` for every known query id, skipping unknown ones.
  fn lookup_each<'q, F>(
    index: &IdIndex,
    labels: &IdIndex,
    queries: &'q [String],
    kind: &str,
    lookup: F,
  ) -> Vec<(&'q str, Vec<(String, f64)>)>
  where
    F: Fn(usize) -> Vec<(usize, f64)> + Sync + Send,
  {
    #[cfg(feature = "parallel")]
    let iter = queries.par_iter();
    #[cfg(not(feature = "parallel"))]
    let iter = queries.iter();

    iter
      .filter_map(|query| match index.get(query) {
        Some(position) => {
          let ranked = lookup(position)
            .into_iter()
            .map(|(r, score)| (labels.id(r).to_string(), score))
            .collect();
          Some((query.as_str(), ranked))
        }
        None => {
          tracing::warn!(%query, kind, "skipping unknown query id");
          None
        }
      })
      .collect()
  }
}

impl FactorizationEngine for IalsEngine {
  type Model = LatentFactorModel;

  fn train(&self, data: &ScalableTable, config: &TrainingConfig) -> Result<LatentFactorModel> {
    match config.solver {
      Solver::Ials => self.config.validate()?,
    }

    let user_col = data.column(&config.users_col)?.text();
    let item_col = data.column(&config.items_col)?.text();
    if data.is_empty() {
      return Err(FactorusError::EmptyDataset);
    }

    let mut users = IdIndex::default();
    let mut items = IdIndex::default();
    let mut strengths: BTreeMap<(usize, usize), f64> = BTreeMap::new();

    for (user, item) in user_col.iter().zip(item_col.iter()) {
      let u = users.insert(user);
      let i = items.insert(item);
      *strengths.entry((u, i)).or_insert(0.0) += 1.0;
    }

    let seen: Vec<Vec<usize>> = {
      let mut seen = vec![Vec::new(); users.len()];
      for &(u, i) in strengths.keys() {
        seen[u].push(i);
      }
      seen
    };

    let num_items = items.len();
    let mut num_side_features = 0;
    if let Some(item_data) = &config.item_data {
      let (by_item, count) = self.side_features(item_data, &config.items_col, &items)?;
      num_side_features = count;

      let mut side: HashMap<(usize, usize), f64> = HashMap::new();
      for (&(u, i), &strength) in &strengths {
        for &feature in &by_item[i] {
          *side.entry((u, num_items + feature)).or_insert(0.0) +=
            self.config.side_data_weight * strength;
        }
      }
      strengths.extend(side);
    }

    let columns = num_items + num_side_features;
    let mut by_user: Vec<Vec<(usize, f64)>> = vec![Vec::new(); users.len()];
    let mut by_column: Vec<Vec<(usize, f64)>> = vec![Vec::new(); columns];
    for (&(u, c), &strength) in &strengths {
      by_user[u].push((c, strength));
      by_column[c].push((u, strength));
    }

    let k = self.config.num_factors;
    let mut user_factors = Factors::zeros(users.len(), k);
    let mut item_factors = Factors::seeded(columns, k, self.config.seed);

    for iteration in 0..self.config.max_iterations {
      user_factors = self.solve_side(&by_user, &item_factors)?;
      item_factors = self.solve_side(&by_column, &user_factors)?;
      tracing::debug!(iteration, "iALS sweep complete");
    }
    item_factors.truncate(num_items);

    tracing::info!(
      users = users.len(),
      items = num_items,
      side_features = num_side_features,
      factors = k,
      "trained ranking factorization model"
    );

    Ok(LatentFactorModel {
      users_col: config.users_col.clone(),
      items_col: config.items_col.clone(),
      users,
      items,
      user_factors,
      item_factors,
      seen,
      num_side_features,
    })
  }

  fn similar_users(&self, model: &LatentFactorModel, users: &[String], k: usize) -> Result<ScalableTable> {
    let blocks = Self::lookup_each(&model.users, &model.users, users, "user", |u| {
      model.nearest_users(u, k)
    });
    Self::ranked_table(&model.users_col, "similar", blocks)
  }

  fn similar_items(&self, model: &LatentFactorModel, items: &[String], k: usize) -> Result<ScalableTable> {
    let blocks = Self::lookup_each(&model.items, &model.items, items, "item", |i| {
      model.nearest_items(i, k)
    });
    Self::ranked_table(&model.items_col, "similar", blocks)
  }

  fn recommend(&self, model: &LatentFactorModel, users: &[String], k: usize) -> Result<ScalableTable> {
    let blocks = Self::lookup_each(&model.users, &model.items, users, "user", |u| {
      model.top_unseen(u, k)
    });
    Self::ranked_table(&model.users_col, &model.items_col, blocks)
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn text(values: &[&str]) -> Column {
    Column::Text(values.iter().map(|v| v.to_string()).collect())
  }

  fn interactions() -> ScalableTable {
    ScalableTable::from_columns(vec![
      ("user", text(&["a", "a", "b", "b", "c", "c"])),
      ("item", text(&["x", "y", "x", "y", "z", "w"])),
    ])
    .unwrap()
  }

  fn training(item_data: Option<ScalableTable>) -> TrainingConfig {
    TrainingConfig {
      users_col: "user".into(),
      items_col: "item".into(),
      item_data,
      solver: Solver::Ials,
    }
  }

  #[test]
  fn test_identical_histories_are_nearest() {
    let engine = IalsEngine::new(IalsConfig::default().num_factors(3));
    let model = engine.train(&interactions(), &training(None)).unwrap();

    let neighbours = model.nearest_users(model.users.get("a").unwrap(), 1);
    assert_eq!(model.users.id(neighbours[0].0), "b");
    assert!((neighbours[0].1 - 1.0).abs() < 1e-9);
  }

  #[test]
  fn test_recommend_skips_seen_items() {
    let engine = IalsEngine::new(IalsConfig::default().num_factors(3));
    let model = engine.train(&interactions(), &training(None)).unwrap();

    let table = engine.recommend(&model, &["a".to_string()], 10).unwrap();
    let recommended = table.column("item").unwrap().text().into_owned();
    assert_eq!(recommended.len(), 2);
    assert!(!recommended.contains(&"x".to_string()));
    assert!(!recommended.contains(&"y".to_string()));
  }

  #[test]
  fn test_side_features_become_pseudo_items() {
    let item_data = ScalableTable::from_columns(vec![
      ("item", text(&["x", "y", "z", "unknown"])),
      ("genre", text(&["drama", "drama", "comedy", "horror"])),
    ])
    .unwrap();
    let engine = IalsEngine::new(IalsConfig::default().num_factors(2));
    let model = engine.train(&interactions(), &training(Some(item_data))).unwrap();

    assert_eq!(model.num_side_features(), 2);
    assert_eq!(model.num_items(), 4);
    assert_eq!(model.item_factors.rows(), 4);
  }

  #[test]
  fn test_side_data_requires_items_column() {
    let item_data = ScalableTable::from_columns(vec![("genre", text(&["drama"]))]).unwrap();
    let err = IalsEngine::default()
      .train(&interactions(), &training(Some(item_data)))
      .unwrap_err();
    assert!(matches!(err, FactorusError::ColumnNotFound { column } if column == "item"));
  }

  #[test]
  fn test_missing_users_column() {
    let err = IalsEngine::default()
      .train(&interactions(), &TrainingConfig { users_col: "uid".into(), ..training(None) })
      .unwrap_err();
    assert!(matches!(err, FactorusError::ColumnNotFound { column } if column == "uid"));
  }

  #[test]
  fn test_empty_dataset() {
    let empty = ScalableTable::from_columns(vec![("user", text(&[])), ("item", text(&[]))]).unwrap();
    let err = IalsEngine::default().train(&empty, &training(None)).unwrap_err();
    assert!(matches!(err, FactorusError::EmptyDataset));
  }

  #[test]
  fn test_training_is_deterministic() {
    let engine = IalsEngine::new(IalsConfig::default().num_factors(4).seed(9));
    let first = engine.train(&interactions(), &training(None)).unwrap();
    let second = engine.train(&interactions(), &training(None)).unwrap();
    assert_eq!(first.user_factors, second.user_factors);
    assert_eq!(first.item_factors, second.item_factors);
  }

  #[test]
  fn test_rejects_zero_factors() {
    let engine = IalsEngine::new(IalsConfig::default().num_factors(0));
    let err = engine.train(&interactions(), &training(None)).unwrap_err();
    assert!(matches!(err, FactorusError::Solver { message } if message.contains("num_factors")));
  }

  #[test]
  fn test_rejects_non_positive_regularization() {
    for regularization in [0.0, -1.0, f64::NAN] {
      let engine = IalsEngine::new(IalsConfig::default().regularization(regularization));
      let err = engine.train(&interactions(), &training(None)).unwrap_err();
      assert!(matches!(err, FactorusError::Solver { message } if message.contains("regularization")));
    }
  }

  #[test]
  fn test_model_accessors() {
    let engine = IalsEngine::new(IalsConfig::default().num_factors(3));
    let model = engine.train(&interactions(), &training(None)).unwrap();

    assert_eq!(model.user_ids(), &["a", "b", "c"].map(String::from));
    assert_eq!(model.item_ids(), &["x", "y", "z", "w"].map(String::from));
    assert_eq!(model.num_factors(), 3);

    let expected = model.user_factors("a").unwrap().dot(&model.item_factors("x").unwrap());
    assert_eq!(model.score("a", "x"), Some(expected));
    assert!(model.score("a", "x").unwrap() > model.score("a", "z").unwrap());
    assert_eq!(model.score("nobody", "x"), None);
    assert_eq!(model.score("a", "nothing"), None);
  }
}
