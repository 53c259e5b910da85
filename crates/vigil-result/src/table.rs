//! Tabular time-series data.

use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TableError {
  #[error("row has {actual} values but table has {expected} columns")]
  ArityMismatch { expected: usize, actual: usize },

  #[error("unknown column: {0}")]
  UnknownColumn(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ColumnType {
  String,
  Long,
  Double,
  Boolean,
  Timestamp,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
  pub name: String,
  pub column_type: ColumnType,
}

impl Column {
  pub fn new(name: impl Into<String>, column_type: ColumnType) -> Self {
    Self {
      name: name.into(),
      column_type,
    }
  }
}

/// Rows of JSON scalars under a fixed column schema.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct DataTable {
  columns: Vec<Column>,
  rows: Vec<Vec<serde_json::Value>>,
}

impl DataTable {
  pub fn new(columns: Vec<Column>) -> Self {
    Self {
      columns,
      rows: Vec::new(),
    }
  }

  /// Append a row, checking it matches the schema width.
  pub fn push_row(&mut self, row: Vec<serde_json::Value>) -> Result<(), TableError> {
    if row.len() != self.columns.len() {
      return Err(TableError::ArityMismatch {
        expected: self.columns.len(),
        actual: row.len(),
      });
    }
    self.rows.push(row);
    Ok(())
  }

  pub fn columns(&self) -> &[Column] {
    &self.columns
  }

  pub fn rows(&self) -> &[Vec<serde_json::Value>] {
    &self.rows
  }

  pub fn row_count(&self) -> usize {
    self.rows.len()
  }

  pub fn column_count(&self) -> usize {
    self.columns.len()
  }

  pub fn column_index(&self, name: &str) -> Result<usize, TableError> {
    self
      .columns
      .iter()
      .position(|c| c.name == name)
      .ok_or_else(|| TableError::UnknownColumn(name.to_string()))
  }

  pub fn get(&self, row: usize, col: usize) -> Option<&serde_json::Value> {
    self.rows.get(row).and_then(|r| r.get(col))
  }

  /// A row as a column-name keyed map.
  pub fn record(&self, row: usize) -> Option<serde_json::Map<String, serde_json::Value>> {
    let values = self.rows.get(row)?;
    Some(
      self
        .columns
        .iter()
        .zip(values)
        .map(|(column, value)| (column.name.clone(), value.clone()))
        .collect(),
    )
  }

  /// All rows as records, in row order.
  pub fn records(&self) -> Vec<serde_json::Map<String, serde_json::Value>> {
    (0..self.rows.len()).filter_map(|i| self.record(i)).collect()
  }
}
