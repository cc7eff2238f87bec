//! The caller-facing tabular structure.

use crate::error::{FactorusError, Result};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// A row-oriented table of named columns holding JSON-like cells.
///
/// `DataFrame` is what callers hand to [`fit`] and what every ranking
/// operation returns. Cells are plain `serde_json::Value`s, so ids can be
/// strings or numbers and side features can be anything serializable.
///
/// [`fit`]: crate::recommender::RankingFactorizationRecommender::fit
///
/// # Examples
///
/// ```rust
/// use factorus::prelude::*;
/// use serde_json::json;
///
/// let mut frame = DataFrame::new(["user_id", "movie_id"]);
/// frame.push_row(vec![json!("alice"), json!(1)]).unwrap();
/// frame.push_row(vec![json!("bob"), json!(2)]).unwrap();
///
/// assert_eq!(frame.height(), 2);
/// assert_eq!(frame.get(1, "movie_id"), Some(&json!(2)));
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawFrame")]
pub struct DataFrame {
  columns: Vec<String>,
  rows: Vec<Vec<Value>>,
}

/// Unchecked wire shape of a [`DataFrame`].
#[derive(Deserialize)]
struct RawFrame {
  columns: Vec<String>,
  #[serde(default)]
  rows: Vec<Vec<Value>>,
}

impl TryFrom<RawFrame> for DataFrame {
  type Error = FactorusError;

  fn try_from(raw: RawFrame) -> Result<Self> {
    Self::from_rows(raw.columns, raw.rows)
  }
}

impl DataFrame {
  /// Creates an empty frame with the given column names.
  pub fn new<I, S>(columns: I) -> Self
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    Self {
      columns: columns.into_iter().map(Into::into).collect(),
      rows: Vec::new(),
    }
  }

  /// Creates a frame from column names and rows, checking every row's width.
  pub fn from_rows<I, S>(columns: I, rows: Vec<Vec<Value>>) -> Result<Self>
  where
    I: IntoIterator<Item = S>,
    S: Into<String>,
  {
    let mut frame = Self::new(columns);
    for row in rows {
      frame.push_row(row)?;
    }
    Ok(frame)
  }

  /// Builds a frame from serializable records.
  ///
  /// Each record is serialized with `serde_json` and must become an object.
  /// Columns are the union of all keys in first-seen order; a record that
  /// lacks a key gets `null` in that column.
  pub fn from_records<T: Serialize>(records: &[T]) -> Result<Self> {
    let mut objects = Vec::with_capacity(records.len());
    let mut columns: Vec<String> = Vec::new();

    for (index, record) in records.iter().enumerate() {
      match serde_json::to_value(record)? {
        Value::Object(map) => {
          for key in map.keys() {
            if !columns.iter().any(|c| c == key) {
              columns.push(key.clone());
            }
          }
          objects.push(map);
        }
        _ => return Err(FactorusError::InvalidRecord { index }),
      }
    }

    let rows = objects
      .into_iter()
      .map(|mut map| {
        columns
          .iter()
          .map(|c| map.remove(c).unwrap_or(Value::Null))
          .collect()
      })
      .collect();

    Ok(Self { columns, rows })
  }

  /// Appends a row. Its length must match the number of columns.
  pub fn push_row(&mut self, row: Vec<Value>) -> Result<()> {
    if row.len() != self.columns.len() {
      return Err(FactorusError::RowLength {
        expected: self.columns.len(),
        found: row.len(),
      });
    }
    self.rows.push(row);
    Ok(())
  }

  pub fn columns(&self) -> &[String] {
    &self.columns
  }

  pub fn rows(&self) -> &[Vec<Value>] {
    &self.rows
  }

  /// Number of rows.
  pub fn height(&self) -> usize {
    self.rows.len()
  }

  /// Number of columns.
  pub fn width(&self) -> usize {
    self.columns.len()
  }

  pub fn is_empty(&self) -> bool {
    self.rows.is_empty()
  }

  /// Returns the position of a column, if present.
  pub fn column_index(&self, name: &str) -> Option<usize> {
    self.columns.iter().position(|c| c == name)
  }

  /// Returns every cell of a column, top to bottom.
  pub fn column(&self, name: &str) -> Result<Vec<&Value>> {
    let index = self
      .column_index(name)
      .ok_or_else(|| FactorusError::column_not_found(name))?;
    Ok(self.rows.iter().map(|row| &row[index]).collect())
  }

  /// Returns a single cell by row position and column name.
  pub fn get(&self, row: usize, column: &str) -> Option<&Value> {
    let index = self.column_index(column)?;
    self.rows.get(row).map(|r| &r[index])
  }

  /// Sets a column to the same value on every row.
  ///
  /// An existing column of that name is overwritten in place; otherwise the
  /// column is appended at the end.
  pub fn with_constant_column(mut self, name: impl Into<String>, value: Value) -> Self {
    let name = name.into();
    match self.column_index(&name) {
      Some(index) => {
        for row in &mut self.rows {
          row[index] = value.clone();
        }
      }
      None => {
        self.columns.push(name);
        for row in &mut self.rows {
          row.push(value.clone());
        }
      }
    }
    self
  }

  /// Converts every row into a JSON object keyed by column name.
  pub fn to_records(&self) -> Vec<Value> {
    self
      .rows
      .iter()
      .map(|row| {
        let map = self
          .columns
          .iter()
          .cloned()
          .zip(row.iter().cloned())
          .collect::<serde_json::Map<String, Value>>();
        Value::Object(map)
      })
      .collect()
  }
}
