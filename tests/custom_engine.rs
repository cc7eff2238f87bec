use factorus::error::Result;
use factorus::prelude::*;
use serde_json::{json, Value};
use std::cell::RefCell;

/// Records what it was trained with and answers similarity queries by
/// listing every other known user, in reverse query order.
#[derive(Default)]
struct RecordingEngine {
  trained_with: RefCell<Option<TrainingConfig>>,
}

impl FactorizationEngine for RecordingEngine {
  type Model = Vec<String>;

  fn train(&self, data: &ScalableTable, config: &TrainingConfig) -> Result<Vec<String>> {
    *self.trained_with.borrow_mut() = Some(config.clone());
    let users = data.column(&config.users_col)?.text().into_owned();
    data.column(&config.items_col)?;
    if data.is_empty() {
      return Err(FactorusError::EmptyDataset);
    }

    let mut distinct: Vec<String> = Vec::new();
    for user in users {
      if !distinct.contains(&user) {
        distinct.push(user);
      }
    }
    Ok(distinct)
  }

  fn similar_users(&self, model: &Vec<String>, users: &[String], k: usize) -> Result<ScalableTable> {
    let mut queries = Vec::new();
    let mut similar = Vec::new();
    let mut scores = Vec::new();
    let mut ranks = Vec::new();

    for user in users.iter().rev() {
      for (rank, other) in model.iter().filter(|o| *o != user).take(k).enumerate() {
        queries.push(user.clone());
        similar.push(other.clone());
        scores.push(0.5);
        ranks.push(rank as i64 + 1);
      }
    }

    ScalableTable::from_columns(vec![
      ("user_id", Column::Text(queries)),
      ("similar", Column::Text(similar)),
      ("score", Column::Float(scores)),
      ("rank", Column::Integer(ranks)),
    ])
  }

  fn similar_items(&self, _model: &Vec<String>, _items: &[String], _k: usize) -> Result<ScalableTable> {
    Ok(ScalableTable::default())
  }

  fn recommend(&self, _model: &Vec<String>, _users: &[String], _k: usize) -> Result<ScalableTable> {
    Ok(ScalableTable::default())
  }
}

fn ratings() -> DataFrame {
  DataFrame::from_rows(
    ["user_id", "movie_id", "genre"],
    vec![
      vec![json!("u2"), json!(1), json!("drama")],
      vec![json!("u1"), json!(1), json!("drama")],
      vec![json!("u3"), json!(2), json!("comedy")],
      vec![json!("u1"), json!(3), json!("comedy")],
      vec![json!("u2"), json!(2), json!("comedy")],
    ],
  )
  .unwrap()
}

fn recommender() -> RankingFactorizationRecommender<RecordingEngine> {
  RankingFactorizationRecommender::new("movies", "user_id", "movie_id")
    .with_engine(RecordingEngine::default())
}

#[test]
fn test_rank_users_reshapes_engine_output() {
  let mut recommender = recommender();
  recommender.fit(&ratings()).unwrap();
  let ranked = recommender.rank_users(1).unwrap();

  assert_eq!(
    ranked.columns(),
    &["user_id", "similar", "score", "rank", "table"].map(String::from)
  );

  // One row per distinct user despite duplicated queries.
  assert_eq!(ranked.height(), 3);

  let users: Vec<&Value> = ranked.column("user_id").unwrap();
  assert_eq!(users, vec![&json!("u1"), &json!("u2"), &json!("u3")]);

  for record in ranked.to_records() {
    assert_eq!(record["table"], json!("movies"));
  }
}

#[test]
fn test_rank_users_has_no_duplicate_rows() {
  let mut recommender = recommender();
  recommender.fit(&ratings()).unwrap();
  let ranked = recommender.rank_users(5).unwrap();

  let rows = ranked.rows();
  for (i, row) in rows.iter().enumerate() {
    assert!(!rows[i + 1..].contains(row), "duplicate row {row:?}");
  }
}

#[test]
fn test_fit_passes_configuration_to_engine() {
  let mut recommender = recommender().with_extra_cols(["genre"]);
  recommender.fit(&ratings()).unwrap();

  let trained = recommender.engine().trained_with.borrow();
  let config = trained.as_ref().unwrap();
  assert_eq!(config.users_col, "user_id");
  assert_eq!(config.items_col, "movie_id");
  assert_eq!(config.solver, Solver::Ials);

  let side = config.item_data.as_ref().unwrap();
  assert_eq!(side.column_names(), &["movie_id".to_string(), "genre".to_string()]);
  assert_eq!(side.num_rows(), 3);
}

#[test]
fn test_fit_without_extra_cols_passes_no_side_data() {
  let mut recommender = recommender();
  recommender.fit(&ratings()).unwrap();

  let trained = recommender.engine().trained_with.borrow();
  assert!(trained.as_ref().unwrap().item_data.is_none());
}

#[test]
fn test_engine_errors_propagate() {
  let mut recommender =
    RankingFactorizationRecommender::new("movies", "customer", "movie_id").with_engine(RecordingEngine::default());
  let err = recommender.fit(&ratings()).unwrap_err();

  assert!(matches!(err, FactorusError::ColumnNotFound { column } if column == "customer"));
  assert!(!recommender.is_fitted());
}

#[test]
fn test_rank_before_fit_fails() {
  let recommender = recommender();
  assert!(matches!(recommender.rank_users(2), Err(FactorusError::NotFitted)));
  assert!(matches!(recommender.rank_items(2), Err(FactorusError::NotFitted)));
  assert!(matches!(recommender.recommend(2), Err(FactorusError::NotFitted)));
}

#[test]
fn test_refit_replaces_state() {
  let mut recommender = recommender();
  recommender.fit(&ratings()).unwrap();
  assert_eq!(recommender.model().unwrap().len(), 3);

  let smaller = DataFrame::from_rows(
    ["user_id", "movie_id"],
    vec![vec![json!("solo"), json!(1)], vec![json!("duo"), json!(1)]],
  )
  .unwrap();
  recommender.fit(&smaller).unwrap();

  assert_eq!(recommender.model().unwrap(), &vec!["solo".to_string(), "duo".to_string()]);
  assert_eq!(recommender.table().unwrap().num_rows(), 2);
}

#[test]
fn test_rank_users_sorts_ids_as_text() {
  let mut recommender = recommender();
  let numeric = DataFrame::from_rows(
    ["user_id", "movie_id"],
    vec![vec![json!(10), json!(1)], vec![json!(2), json!(1)]],
  )
  .unwrap();
  recommender.fit(&numeric).unwrap();
  // The engine answers "2" first; the text sort puts "10" ahead of it.
  let ranked = recommender.rank_users(1).unwrap();

  let users: Vec<&Value> = ranked.column("user_id").unwrap();
  assert_eq!(users, vec![&json!("10"), &json!("2")]);
}
