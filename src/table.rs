//! Column-oriented container handed to factorization engines.

use crate::error::{FactorusError, Result};
use crate::frame::DataFrame;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::borrow::Cow;
use std::cmp::Ordering;
use std::collections::HashSet;

/// A single typed column of a [`ScalableTable`].
///
/// Tables built from a caller's [`DataFrame`] only ever contain `Text`
/// columns. Engines produce `Integer` and `Float` columns for ranks and
/// scores.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "values")]
pub enum Column {
    Text(Vec<String>),
    Integer(Vec<i64>),
    Float(Vec<f64>),
}

/// Hashable view of a cell, used for row deduplication.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
enum CellKey<'a> {
    Text(&'a str),
    Integer(i64),
    Float(u64),
}

impl Column {
    pub fn len(&self) -> usize {
        match self {
            Column::Text(v) => v.len(),
            Column::Integer(v) => v.len(),
            Column::Float(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Borrows the column as text if it already is text.
    pub fn as_text(&self) -> Option<&[String]> {
        match self {
            Column::Text(v) => Some(v),
            _ => None,
        }
    }

    /// Returns the column as text, converting numbers when needed.
    pub fn text(&self) -> Cow<'_, [String]> {
        match self {
            Column::Text(v) => Cow::Borrowed(v.as_slice()),
            Column::Integer(v) => Cow::Owned(v.iter().map(|x| x.to_string()).collect()),
            Column::Float(v) => Cow::Owned(v.iter().map(|x| x.to_string()).collect()),
        }
    }

    /// Converts one cell into a JSON value.
    pub fn value(&self, row: usize) -> Value {
        match self {
            Column::Text(v) => Value::String(v[row].clone()),
            Column::Integer(v) => Value::from(v[row]),
            Column::Float(v) => serde_json::Number::from_f64(v[row])
                .map(Value::Number)
                .unwrap_or(Value::Null),
        }
    }

    fn key(&self, row: usize) -> CellKey<'_> {
        match self {
            Column::Text(v) => CellKey::Text(&v[row]),
            Column::Integer(v) => CellKey::Integer(v[row]),
            Column::Float(v) => CellKey::Float(v[row].to_bits()),
        }
    }

    fn compare(&self, a: usize, b: usize) -> Ordering {
        match self {
            Column::Text(v) => v[a].cmp(&v[b]),
            Column::Integer(v) => v[a].cmp(&v[b]),
            Column::Float(v) => v[a].total_cmp(&v[b]),
        }
    }

    fn take(&self, indices: &[usize]) -> Column {
        match self {
            Column::Text(v) => Column::Text(indices.iter().map(|&i| v[i].clone()).collect()),
            Column::Integer(v) => Column::Integer(indices.iter().map(|&i| v[i]).collect()),
            Column::Float(v) => Column::Float(indices.iter().map(|&i| v[i]).collect()),
        }
    }
}

/// A column-oriented table with named, typed columns.
///
/// This is the container every [`FactorizationEngine`] consumes and
/// produces. Converting a [`DataFrame`] coerces every cell to text: strings
/// keep their raw contents, everything else uses its JSON text.
///
/// [`FactorizationEngine`]: crate::engine::FactorizationEngine
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScalableTable {
    names: Vec<String>,
    columns: Vec<Column>,
    rows: usize,
}

impl ScalableTable {
    /// Converts a caller's frame, coercing every cell to text.
    pub fn from_frame(frame: &DataFrame) -> Self {
        let columns = (0..frame.width())
            .map(|c| Column::Text(frame.rows().iter().map(|row| cell_text(&row[c])).collect()))
            .collect();

        Self {
            names: frame.columns().to_vec(),
            columns,
            rows: frame.height(),
        }
    }

    /// Builds a table from named columns. All columns must share a length.
    pub fn from_columns<I, S>(columns: I) -> Result<Self>
    where
        I: IntoIterator<Item = (S, Column)>,
        S: Into<String>,
    {
        let mut table = Self::default();
        for (name, column) in columns {
            if !table.names.is_empty() && column.len() != table.rows {
                return Err(FactorusError::RowLength {
                    expected: table.rows,
                    found: column.len(),
                });
            }
            table.rows = column.len();
            table.names.push(name.into());
            table.columns.push(column);
        }
        Ok(table)
    }

    pub fn column_names(&self) -> &[String] {
        &self.names
    }

    pub fn num_rows(&self) -> usize {
        self.rows
    }

    pub fn num_columns(&self) -> usize {
        self.columns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows == 0
    }

    fn position(&self, name: &str) -> Result<usize> {
        self.names
            .iter()
            .position(|n| n == name)
            .ok_or_else(|| FactorusError::column_not_found(name))
    }

    /// Looks up a column by name.
    pub fn column(&self, name: &str) -> Result<&Column> {
        Ok(&self.columns[self.position(name)?])
    }

    /// Projects the table onto the listed columns, in the listed order.
    pub fn select<S: AsRef<str>>(&self, names: &[S]) -> Result<ScalableTable> {
        let mut selected = Vec::with_capacity(names.len());
        for name in names {
            let name = name.as_ref();
            selected.push((name.to_string(), self.column(name)?.clone()));
        }
        let mut table = Self::from_columns(selected)?;
        table.rows = self.rows;
        Ok(table)
    }

    /// Drops rows that repeat an earlier row across every column.
    ///
    /// The first occurrence is kept and relative order is preserved.
    pub fn drop_duplicates(self) -> Self {
        let keep: Vec<usize> = {
            let mut seen = HashSet::with_capacity(self.rows);
            (0..self.rows)
                .filter(|&row| {
                    let key: Vec<CellKey<'_>> = self.columns.iter().map(|c| c.key(row)).collect();
                    seen.insert(key)
                })
                .collect()
        };
        self.take(&keep)
    }

    /// Sorts rows ascending by one column. The sort is stable.
    pub fn sort_by(self, name: &str) -> Result<Self> {
        let column = self.column(name)?;
        let mut order: Vec<usize> = (0..self.rows).collect();
        order.sort_by(|&a, &b| column.compare(a, b));
        Ok(self.take(&order))
    }

    fn take(self, indices: &[usize]) -> Self {
        Self {
            columns: self.columns.iter().map(|c| c.take(indices)).collect(),
            names: self.names,
            rows: indices.len(),
        }
    }

    /// Converts back into a row-oriented [`DataFrame`].
    pub fn to_frame(&self) -> Result<DataFrame> {
        let rows = (0..self.rows)
            .map(|row| self.columns.iter().map(|c| c.value(row)).collect())
            .collect();
        DataFrame::from_rows(self.names.clone(), rows)
    }
}

/// Text representation of a single cell.
fn cell_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}
