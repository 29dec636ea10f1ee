//! Records: one row's worth of named values.

use std::collections::BTreeMap;
use std::collections::btree_map;

use serde_json::Value as JsonValue;

use crate::value::SqlValue;

/// A mapping from column name to value.
///
/// Column order carries no meaning; iteration is sorted by name so that two
/// records with the same column set always line up column-for-column.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Record {
    fields: BTreeMap<String, SqlValue>,
}

/// An equality predicate: every `(column, value)` pair must match (AND).
pub type Predicate = Record;

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Self {
        self.fields.insert(column.into(), value.into());
        self
    }

    /// Set a column, returning the previous value.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<SqlValue>) -> Option<SqlValue> {
        self.fields.insert(column.into(), value.into())
    }

    /// Look up a column.
    pub fn get(&self, column: &str) -> Option<&SqlValue> {
        self.fields.get(column)
    }

    /// Text value of a column.
    pub fn get_str(&self, column: &str) -> Option<&str> {
        self.get(column).and_then(SqlValue::as_str)
    }

    /// Integer value of a column.
    pub fn get_i64(&self, column: &str) -> Option<i64> {
        self.get(column).and_then(SqlValue::as_i64)
    }

    /// Boolean value of a column.
    pub fn get_bool(&self, column: &str) -> Option<bool> {
        self.get(column).and_then(SqlValue::as_bool)
    }

    /// Column names in iteration order.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.fields.keys().map(String::as_str)
    }

    /// Values in column order.
    pub fn values(&self) -> impl Iterator<Item = &SqlValue> {
        self.fields.values()
    }

    /// `(column, value)` pairs in column order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &SqlValue)> {
        self.fields.iter().map(|(k, v)| (k.as_str(), v))
    }

    pub fn len(&self) -> usize {
        self.fields.len()
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty()
    }

    /// Whether `other` has exactly the same column names.
    pub fn same_columns(&self, other: &Record) -> bool {
        self.fields.len() == other.fields.len() && self.columns().eq(other.columns())
    }

    /// Render as a JSON object.
    pub fn to_json(&self) -> JsonValue {
        JsonValue::Object(
            self.fields
                .iter()
                .map(|(k, v)| (k.clone(), v.to_json()))
                .collect(),
        )
    }
}

impl<K: Into<String>, V: Into<SqlValue>> FromIterator<(K, V)> for Record {
    fn from_iter<I: IntoIterator<Item = (K, V)>>(iter: I) -> Self {
        Self {
            fields: iter
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }
}

impl IntoIterator for Record {
    type Item = (String, SqlValue);
    type IntoIter = btree_map::IntoIter<String, SqlValue>;

    fn into_iter(self) -> Self::IntoIter {
        self.fields.into_iter()
    }
}
