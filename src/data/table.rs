//! In-memory tables with a schema discovered at runtime
//!
//! Exports from different teams do not share a fixed record type, so a row is
//! an ordered mapping from column name to a tagged [`Value`]. A [`Table`] keeps
//! one ordered column list and row vectors aligned with it.

use crate::{HoopsError, Result};
use serde::{Deserialize, Serialize};
use std::collections::{HashMap, HashSet};
use std::fmt;

/// A single cell
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Value {
    Number(f64),
    Text(String),
    Missing,
}

impl Value {
    /// Parse a raw export cell: empty is missing, anything float-like is a number
    pub fn parse(raw: &str) -> Self {
        let trimmed = raw.trim();
        if trimmed.is_empty() {
            return Value::Missing;
        }
        match trimmed.parse::<f64>() {
            Ok(n) if n.is_finite() => Value::Number(n),
            _ => Value::Text(trimmed.to_string()),
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn is_missing(&self) -> bool {
        matches!(self, Value::Missing)
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{}", n),
            Value::Text(s) => write!(f, "{}", s),
            Value::Missing => Ok(()),
        }
    }
}

/// Rows × uniquely named columns
#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    columns: Vec<String>,
    rows: Vec<Vec<Value>>,
}

impl Table {
    /// Create an empty table. Fails if two columns share a name.
    pub fn new(columns: Vec<String>) -> Result<Self> {
        let mut seen = HashSet::with_capacity(columns.len());
        for name in &columns {
            if !seen.insert(name.as_str()) {
                return Err(HoopsError::DuplicateColumn(name.clone()));
            }
        }
        Ok(Table {
            columns,
            rows: Vec::new(),
        })
    }

    /// Create a table from columns and rows; rows are padded or truncated to width
    pub fn from_rows(columns: Vec<String>, rows: Vec<Vec<Value>>) -> Result<Self> {
        let mut table = Table::new(columns)?;
        for row in rows {
            table.push_row(row);
        }
        Ok(table)
    }

    pub fn columns(&self) -> &[String] {
        &self.columns
    }

    pub fn rows(&self) -> &[Vec<Value>] {
        &self.rows
    }

    /// Number of rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn width(&self) -> usize {
        self.columns.len()
    }

    pub fn column_index(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == name)
    }

    /// Append a row, padding with `Missing` or truncating to the table width
    pub fn push_row(&mut self, mut row: Vec<Value>) {
        row.resize(self.columns.len(), Value::Missing);
        self.rows.push(row);
    }

    /// Iterate over one column's values
    pub fn column_values<'a>(&'a self, name: &str) -> Option<impl Iterator<Item = &'a Value>> {
        let idx = self.column_index(name)?;
        Some(self.rows.iter().map(move |row| &row[idx]))
    }

    /// Set every row's value of `name` to `value`, appending the column if absent
    pub fn set_constant_column(&mut self, name: &str, value: Value) {
        match self.column_index(name) {
            Some(idx) => {
                for row in &mut self.rows {
                    row[idx] = value.clone();
                }
            }
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(value.clone());
                }
            }
        }
    }

    /// Add or replace a column computed from each row
    pub fn set_column_with<F>(&mut self, name: &str, mut f: F)
    where
        F: FnMut(&[Value]) -> Value,
    {
        let values: Vec<Value> = self.rows.iter().map(|row| f(row.as_slice())).collect();
        let idx = match self.column_index(name) {
            Some(idx) => idx,
            None => {
                self.columns.push(name.to_string());
                for row in &mut self.rows {
                    row.push(Value::Missing);
                }
                self.columns.len() - 1
            }
        };
        for (row, value) in self.rows.iter_mut().zip(values) {
            row[idx] = value;
        }
    }

    /// Columns whose non-missing values are all numbers, with at least one number
    pub fn numeric_columns(&self) -> Vec<String> {
        self.columns
            .iter()
            .enumerate()
            .filter(|(idx, _)| {
                let mut any_number = false;
                for row in &self.rows {
                    match &row[*idx] {
                        Value::Number(_) => any_number = true,
                        Value::Missing => {}
                        Value::Text(_) => return false,
                    }
                }
                any_number
            })
            .map(|(_, name)| name.clone())
            .collect()
    }

    /// Concatenate tables on the union of their columns (first-seen order).
    ///
    /// A table lacking a column contributes `Missing` for it.
    pub fn concat(tables: &[Table]) -> Table {
        let mut columns: Vec<String> = Vec::new();
        let mut positions: HashMap<String, usize> = HashMap::new();
        for table in tables {
            for name in &table.columns {
                if !positions.contains_key(name) {
                    positions.insert(name.clone(), columns.len());
                    columns.push(name.clone());
                }
            }
        }

        let total: usize = tables.iter().map(Table::len).sum();
        let mut rows = Vec::with_capacity(total);
        for table in tables {
            let mapping: Vec<usize> = table.columns.iter().map(|c| positions[c]).collect();
            for row in &table.rows {
                let mut out = vec![Value::Missing; columns.len()];
                for (value, &target) in row.iter().zip(&mapping) {
                    out[target] = value.clone();
                }
                rows.push(out);
            }
        }

        Table { columns, rows }
    }
}
