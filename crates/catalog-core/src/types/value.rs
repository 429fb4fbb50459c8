//! Column values and records exchanged with stores.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::result::AppResult;

/// The declared type of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ValueKind {
    /// 64-bit signed integer.
    Integer,
    /// Text.
    Text,
    /// UTC timestamp.
    Timestamp,
    /// Calendar date.
    Date,
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Integer => write!(f, "integer"),
            Self::Text => write!(f, "text"),
            Self::Timestamp => write!(f, "timestamp"),
            Self::Date => write!(f, "date"),
        }
    }
}

/// A single column value.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Value {
    /// SQL `NULL`.
    Null,
    /// An integer value.
    Integer(i64),
    /// A text value.
    Text(String),
    /// A UTC timestamp.
    Timestamp(DateTime<Utc>),
    /// A calendar date.
    Date(NaiveDate),
    /// Rows of a projected related collection.
    List(Vec<Record>),
}

impl Value {
    /// The scalar kind of this value, `None` for `Null` and lists.
    pub fn kind(&self) -> Option<ValueKind> {
        match self {
            Self::Integer(_) => Some(ValueKind::Integer),
            Self::Text(_) => Some(ValueKind::Text),
            Self::Timestamp(_) => Some(ValueKind::Timestamp),
            Self::Date(_) => Some(ValueKind::Date),
            Self::Null | Self::List(_) => None,
        }
    }

    /// Short type name used in error messages.
    pub fn type_name(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Integer(_) => "integer",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "timestamp",
            Self::Date(_) => "date",
            Self::List(_) => "list",
        }
    }

    /// Whether this is `Null`.
    pub fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }

    /// Return the integer, if this is one.
    pub fn as_i64(&self) -> Option<i64> {
        match self {
            Self::Integer(v) => Some(*v),
            _ => None,
        }
    }

    /// Return the text, if this is text.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(v) => Some(v),
            _ => None,
        }
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Self::Integer(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Self::Integer(i64::from(v))
    }
}

impl From<String> for Value {
    fn from(v: String) -> Self {
        Self::Text(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

impl From<DateTime<Utc>> for Value {
    fn from(v: DateTime<Utc>) -> Self {
        Self::Timestamp(v)
    }
}

impl From<NaiveDate> for Value {
    fn from(v: NaiveDate) -> Self {
        Self::Date(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Self::Null, Into::into)
    }
}

/// One row: an ordered map from column name to value.
///
/// Records are the only shape that crosses the store boundary. Entities and
/// projections convert to and from them.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Record(BTreeMap<String, Value>);

impl Record {
    /// Create an empty record.
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insert.
    pub fn with(mut self, column: impl Into<String>, value: impl Into<Value>) -> Self {
        self.insert(column, value);
        self
    }

    /// Set a column value, replacing any previous one.
    pub fn insert(&mut self, column: impl Into<String>, value: impl Into<Value>) {
        self.0.insert(column.into(), value.into());
    }

    /// Look up a column.
    pub fn get(&self, column: &str) -> Option<&Value> {
        self.0.get(column)
    }

    /// Look up a column, treating a missing column as `Null`.
    pub fn value(&self, column: &str) -> &Value {
        self.0.get(column).unwrap_or(&Value::Null)
    }

    /// Remove a column and return its value.
    pub fn remove(&mut self, column: &str) -> Option<Value> {
        self.0.remove(column)
    }

    /// Whether the record has this column.
    pub fn contains(&self, column: &str) -> bool {
        self.0.contains_key(column)
    }

    /// Iterate columns in name order.
    pub fn iter(&self) -> impl Iterator<Item = (&str, &Value)> {
        self.0.iter().map(|(k, v)| (k.as_str(), v))
    }

    /// Number of columns.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the record has no columns.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Keep only the named columns.
    pub fn project(&self, columns: &[&str]) -> Self {
        Self(
            columns
                .iter()
                .map(|c| (c.to_string(), self.value(c).clone()))
                .collect(),
        )
    }

    /// Take a required integer column.
    pub fn take_i64(&mut self, column: &str) -> AppResult<i64> {
        match self.remove(column) {
            Some(Value::Integer(v)) => Ok(v),
            other => Err(unexpected(column, "integer", other)),
        }
    }

    /// Take a required text column.
    pub fn take_text(&mut self, column: &str) -> AppResult<String> {
        match self.remove(column) {
            Some(Value::Text(v)) => Ok(v),
            other => Err(unexpected(column, "text", other)),
        }
    }

    /// Take a nullable text column.
    pub fn take_opt_text(&mut self, column: &str) -> AppResult<Option<String>> {
        match self.remove(column) {
            Some(Value::Text(v)) => Ok(Some(v)),
            Some(Value::Null) | None => Ok(None),
            other => Err(unexpected(column, "text", other)),
        }
    }

    /// Take a required timestamp column.
    pub fn take_timestamp(&mut self, column: &str) -> AppResult<DateTime<Utc>> {
        match self.remove(column) {
            Some(Value::Timestamp(v)) => Ok(v),
            other => Err(unexpected(column, "timestamp", other)),
        }
    }

    /// Take a projected related collection. A missing column is empty.
    pub fn take_list(&mut self, column: &str) -> AppResult<Vec<Record>> {
        match self.remove(column) {
            Some(Value::List(rows)) => Ok(rows),
            Some(Value::Null) | None => Ok(Vec::new()),
            other => Err(unexpected(column, "list", other)),
        }
    }
}

impl FromIterator<(String, Value)> for Record {
    fn from_iter<I: IntoIterator<Item = (String, Value)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

impl IntoIterator for Record {
    type Item = (String, Value);
    type IntoIter = std::collections::btree_map::IntoIter<String, Value>;

    fn into_iter(self) -> Self::IntoIter {
        self.0.into_iter()
    }
}

fn unexpected(column: &str, expected: &str, found: Option<Value>) -> AppError {
    match found {
        None => AppError::translation(format!("Column '{column}' missing from result row")),
        Some(v) => AppError::translation(format!(
            "Column '{column}' expected {expected}, found {}",
            v.type_name()
        )),
    }
}
