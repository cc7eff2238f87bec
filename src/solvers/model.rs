//! The trained latent factor model and its neighbour lookups.

use crate::solvers::linalg::{cosine_similarity, Factors};
use ndarray::ArrayView1;
use std::collections::HashMap;

/// Bidirectional mapping between identifiers and factor rows.
#[derive(Debug, Clone, Default)]
pub struct IdIndex {
  ids: Vec<String>,
  positions: HashMap<String, usize>,
}

impl IdIndex {
  /// Returns the position of `id`, registering it if it is new.
  pub fn insert(&mut self, id: &str) -> usize {
    if let Some(&position) = self.positions.get(id) {
      return position;
    }
    let position = self.ids.len();
    self.ids.push(id.to_string());
    self.positions.insert(id.to_string(), position);
    position
  }

  pub fn get(&self, id: &str) -> Option<usize> {
    self.positions.get(id).copied()
  }

  pub fn id(&self, position: usize) -> &str {
    &self.ids[position]
  }

  pub fn ids(&self) -> &[String] {
    &self.ids
  }

  pub fn len(&self) -> usize {
    self.ids.len()
  }

  pub fn is_empty(&self) -> bool {
    self.ids.is_empty()
  }
}

/// A trained ranking-factorization model.
///
/// Holds one latent vector per user and per item, plus each user's observed
/// items so recommendations can skip them.
#[derive(Debug, Clone)]
pub struct LatentFactorModel {
  pub(crate) users_col: String,
  pub(crate) items_col: String,
  pub(crate) users: IdIndex,
  pub(crate) items: IdIndex,
  pub(crate) user_factors: Factors,
  pub(crate) item_factors: Factors,
  pub(crate) seen: Vec<Vec<usize>>,
  pub(crate) num_side_features: usize,
}

impl LatentFactorModel {
  pub fn users_col(&self) -> &str {
    &self.users_col
  }

  pub fn items_col(&self) -> &str {
    &self.items_col
  }

  pub fn num_users(&self) -> usize {
    self.users.len()
  }

  pub fn num_items(&self) -> usize {
    self.items.len()
  }

  pub fn num_factors(&self) -> usize {
    self.user_factors.dim()
  }

  /// Number of distinct side-feature values the model was trained with.
  pub fn num_side_features(&self) -> usize {
    self.num_side_features
  }

  pub fn user_ids(&self) -> &[String] {
    self.users.ids()
  }

  pub fn item_ids(&self) -> &[String] {
    self.items.ids()
  }

  pub fn user_factors(&self, user: &str) -> Option<ArrayView1<'_, f64>> {
    self.users.get(user).map(|u| self.user_factors.row(u))
  }

  pub fn item_factors(&self, item: &str) -> Option<ArrayView1<'_, f64>> {
    self.items.get(item).map(|i| self.item_factors.row(i))
  }

  /// Predicted affinity of a user for an item.
  pub fn score(&self, user: &str, item: &str) -> Option<f64> {
    Some(self.user_factors(user)?.dot(&self.item_factors(item)?))
  }

  pub(crate) fn nearest_users(&self, user: usize, k: usize) -> Vec<(usize, f64)> {
    nearest(&self.user_factors, user, k)
  }

  pub(crate) fn nearest_items(&self, item: usize, k: usize) -> Vec<(usize, f64)> {
    nearest(&self.item_factors, item, k)
  }

  /// Best `k` items the user has not interacted with, by dot product.
  pub(crate) fn top_unseen(&self, user: usize, k: usize) -> Vec<(usize, f64)> {
    let x = self.user_factors.row(user);
    let seen = &self.seen[user];
    let scored = (0..self.item_factors.rows())
      .filter(|i| seen.binary_search(i).is_err())
      .map(|i| (i, x.dot(&self.item_factors.row(i))))
      .collect();
    top_k(scored, k)
  }
}

/// Brute-force cosine neighbours of one row, excluding the row itself.
fn nearest(factors: &Factors, query: usize, k: usize) -> Vec<(usize, f64)> {
  let q = factors.row(query);
  let scored = (0..factors.rows())
    .filter(|&r| r != query)
    .map(|r| (r, cosine_similarity(q, factors.row(r))))
    .collect();
  top_k(scored, k)
}

/// Keeps the `k` highest scores. Ties go to the lower index.
fn top_k(mut scored: Vec<(usize, f64)>, k: usize) -> Vec<(usize, f64)> {
  scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
  scored.truncate(k);
  scored
}
