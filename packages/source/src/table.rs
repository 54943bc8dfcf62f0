//! Raw source tables as read from disk.
//!
//! Two JSON layouts are accepted:
//!
//! * records: `[{"school_name": "A", "lat": 28.6}, ...]`
//! * columns: `{"school_name": {"0": "A", "1": "B"}, "lat": {"0": 28.6, ...}}`
//!
//! The column layout is what pandas writes by default. Its row indices are
//! ordered numerically when every index parses as an integer.

use std::collections::BTreeSet;
use std::path::{Path, PathBuf};

use serde_json::{Map, Value};

use crate::LoadError;

/// One row of a source table, keyed by column name.
pub type Row = Map<String, Value>;

/// A source table with its rows in file order.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    path: PathBuf,
    rows: Vec<Row>,
}

impl RawTable {
    /// Reads and parses a source table from disk.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::Io`] if the file cannot be read,
    /// [`LoadError::Json`] if it is not valid JSON, or
    /// [`LoadError::UnsupportedLayout`] if it is neither layout.
    pub fn read(path: &Path) -> Result<Self, LoadError> {
        let contents = std::fs::read_to_string(path).map_err(|source| LoadError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let value: Value = serde_json::from_str(&contents).map_err(|source| LoadError::Json {
            path: path.to_path_buf(),
            source,
        })?;
        Self::from_value(path, value)
    }

    /// Builds a table from an already-parsed JSON document.
    ///
    /// # Errors
    ///
    /// Returns [`LoadError::UnsupportedLayout`] if the document is neither an
    /// array of objects nor an object of column objects.
    pub fn from_value(path: &Path, value: Value) -> Result<Self, LoadError> {
        let unsupported = |reason: String| LoadError::UnsupportedLayout {
            path: path.to_path_buf(),
            reason,
        };

        let rows = match value {
            Value::Array(items) => items
                .into_iter()
                .enumerate()
                .map(|(i, item)| match item {
                    Value::Object(row) => Ok(row),
                    other => Err(unsupported(format!(
                        "record {i} is {}, expected an object",
                        json_kind(&other)
                    ))),
                })
                .collect::<Result<Vec<_>, _>>()?,
            Value::Object(columns) => {
                let mut cols = Vec::with_capacity(columns.len());
                for (name, column) in columns {
                    match column {
                        Value::Object(cells) => cols.push((name, cells)),
                        other => {
                            return Err(unsupported(format!(
                                "column '{name}' is {}, expected an object of row values",
                                json_kind(&other)
                            )));
                        }
                    }
                }
                pivot_columns(cols)
            }
            other => {
                return Err(unsupported(format!(
                    "top-level value is {}, expected an array or object",
                    json_kind(&other)
                )));
            }
        };

        Ok(Self {
            path: path.to_path_buf(),
            rows,
        })
    }

    /// Path the table was read from.
    #[must_use]
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Rows in file order.
    #[must_use]
    pub fn rows(&self) -> &[Row] {
        &self.rows
    }

    /// Number of rows.
    #[must_use]
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Whether the table has no rows.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    /// Whether any row has a cell for `column`. An empty table has every
    /// column vacuously.
    #[must_use]
    pub fn has_column(&self, column: &str) -> bool {
        self.rows.is_empty() || self.rows.iter().any(|r| r.contains_key(column))
    }

    /// Fails with [`LoadError::MissingColumn`] unless [`Self::has_column`].
    ///
    /// # Errors
    ///
    /// Returns an error naming the table and the absent column.
    pub fn require_column(&self, column: &str) -> Result<(), LoadError> {
        if self.has_column(column) {
            Ok(())
        } else {
            Err(LoadError::MissingColumn {
                path: self.path.clone(),
                column: column.to_string(),
            })
        }
    }
}

/// Turns `{column: {index: value}}` into rows ordered by index.
fn pivot_columns(columns: Vec<(String, Row)>) -> Vec<Row> {
    let indices: BTreeSet<&str> = columns
        .iter()
        .flat_map(|(_, cells)| cells.keys().map(String::as_str))
        .collect();

    let mut ordered: Vec<&str> = indices.into_iter().collect();
    if ordered.iter().all(|i| i.parse::<u64>().is_ok()) {
        ordered.sort_by_key(|i| i.parse::<u64>().unwrap_or(u64::MAX));
    }

    ordered
        .iter()
        .map(|index| {
            columns
                .iter()
                .filter_map(|(name, cells)| cells.get(*index).map(|v| (name.clone(), v.clone())))
                .collect()
        })
        .collect()
}

const fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
