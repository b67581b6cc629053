//! Flat storage rows.
//!
//! A [`Row`] is what the storage query layer hands over for one entity:
//! column identifier to raw scalar. Readers are strict about scalar types
//! with two leniencies for rows arriving over the wire as JSON: timestamp
//! columns also accept RFC 3339 text, and float columns accept whole
//! numbers.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use rust_decimal::prelude::ToPrimitive as _;
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

use crate::error::CodecError;

/// A single raw cell value.
///
/// JSON input goes through [`Value`] first, so numbers keep their digits
/// and nested documents arrive as their JSON text.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum CellValue {
    /// SQL `NULL`, or a column missing from the row.
    Null,
    /// Boolean cell.
    Bool(bool),
    /// Integer cell (keys, discriminators).
    Integer(i64),
    /// Floating point cell.
    Float(f64),
    /// Text cell (strings, JSON documents, WKT).
    Text(String),
    /// Timestamp cell.
    Timestamp(DateTime<Utc>),
}

impl CellValue {
    /// Name of the scalar type, for error messages.
    pub const fn kind(&self) -> &'static str {
        match self {
            Self::Null => "null",
            Self::Bool(_) => "bool",
            Self::Integer(_) => "integer",
            Self::Float(_) => "float",
            Self::Text(_) => "text",
            Self::Timestamp(_) => "timestamp",
        }
    }

    /// Whether the cell is null.
    pub const fn is_null(&self) -> bool {
        matches!(self, Self::Null)
    }
}

impl<'de> Deserialize<'de> for CellValue {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        Value::deserialize(deserializer).map(Self::from)
    }
}

impl From<Value> for CellValue {
    fn from(value: Value) -> Self {
        match value {
            Value::Null => Self::Null,
            Value::Bool(b) => Self::Bool(b),
            Value::Number(n) => n.as_i64().map_or_else(
                || n.as_f64().map_or_else(|| Self::Text(n.to_string()), Self::Float),
                Self::Integer,
            ),
            Value::String(s) => Self::Text(s),
            nested @ (Value::Array(_) | Value::Object(_)) => Self::Text(nested.to_string()),
        }
    }
}

impl From<bool> for CellValue {
    fn from(value: bool) -> Self {
        Self::Bool(value)
    }
}

impl From<i64> for CellValue {
    fn from(value: i64) -> Self {
        Self::Integer(value)
    }
}

impl From<f64> for CellValue {
    fn from(value: f64) -> Self {
        Self::Float(value)
    }
}

impl From<&str> for CellValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_owned())
    }
}

impl From<String> for CellValue {
    fn from(value: String) -> Self {
        Self::Text(value)
    }
}

impl From<DateTime<Utc>> for CellValue {
    fn from(value: DateTime<Utc>) -> Self {
        Self::Timestamp(value)
    }
}

impl<T: Into<Self>> From<Option<T>> for CellValue {
    fn from(value: Option<T>) -> Self {
        value.map_or(Self::Null, Into::into)
    }
}

static NULL: CellValue = CellValue::Null;

/// One storage row, keyed by column identifier.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Row(BTreeMap<String, CellValue>);

impl Row {
    /// An empty row.
    pub const fn new() -> Self {
        Self(BTreeMap::new())
    }

    /// Set a cell (builder style).
    #[must_use]
    pub fn with(mut self, column: &str, value: impl Into<CellValue>) -> Self {
        self.insert(column, value);
        self
    }

    /// Set a cell, replacing any previous value.
    pub fn insert(&mut self, column: &str, value: impl Into<CellValue>) {
        self.0.insert(column.to_owned(), value.into());
    }

    /// The raw cell. Missing columns read as [`CellValue::Null`].
    pub fn get(&self, column: &str) -> &CellValue {
        self.0.get(column).unwrap_or(&NULL)
    }

    /// Number of columns present.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    /// Whether the row has no columns.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Column identifiers present in the row.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    /// Read an integer column.
    pub fn integer(&self, column: &str) -> Result<Option<i64>, CodecError> {
        match self.get(column) {
            CellValue::Null => Ok(None),
            CellValue::Integer(v) => Ok(Some(*v)),
            other => Err(mismatch(column, "integer", other)),
        }
    }

    /// Read a floating point column. Integer cells are widened, since a
    /// JSON whole number deserializes as [`CellValue::Integer`].
    pub fn float(&self, column: &str) -> Result<Option<f64>, CodecError> {
        match self.get(column) {
            CellValue::Null => Ok(None),
            CellValue::Float(v) => Ok(Some(*v)),
            CellValue::Integer(v) => v
                .to_f64()
                .map(Some)
                .ok_or_else(|| mismatch(column, "float", &CellValue::Integer(*v))),
            other => Err(mismatch(column, "float", other)),
        }
    }

    /// Read a boolean column.
    pub fn boolean(&self, column: &str) -> Result<Option<bool>, CodecError> {
        match self.get(column) {
            CellValue::Null => Ok(None),
            CellValue::Bool(v) => Ok(Some(*v)),
            other => Err(mismatch(column, "bool", other)),
        }
    }

    /// Read a text column.
    pub fn text(&self, column: &str) -> Result<Option<&str>, CodecError> {
        match self.get(column) {
            CellValue::Null => Ok(None),
            CellValue::Text(v) => Ok(Some(v.as_str())),
            other => Err(mismatch(column, "text", other)),
        }
    }

    /// Read a timestamp column. RFC 3339 text is accepted and converted to
    /// UTC.
    pub fn timestamp(&self, column: &str) -> Result<Option<DateTime<Utc>>, CodecError> {
        match self.get(column) {
            CellValue::Null => Ok(None),
            CellValue::Timestamp(v) => Ok(Some(*v)),
            CellValue::Text(s) => DateTime::parse_from_rfc3339(s)
                .map(|t| Some(t.with_timezone(&Utc)))
                .map_err(|_parse| CodecError::InvalidTimestamp {
                    column: column.to_owned(),
                    value: s.clone(),
                }),
            other => Err(mismatch(column, "timestamp", other)),
        }
    }
}

impl FromIterator<(String, CellValue)> for Row {
    fn from_iter<I: IntoIterator<Item = (String, CellValue)>>(iter: I) -> Self {
        Self(iter.into_iter().collect())
    }
}

fn mismatch(column: &str, expected: &'static str, found: &CellValue) -> CodecError {
    CodecError::UnexpectedType {
        column: column.to_owned(),
        expected,
        found: found.kind(),
    }
}
