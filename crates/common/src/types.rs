//! Logical column types and the typed values they carry.

use std::{fmt, str::FromStr};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::json::JsonValue;

// ---------------------------------------------------------------------------
// Logical types
// ---------------------------------------------------------------------------

/// The application-level kind of data an encrypted column holds.
///
/// Fixed per column when the schema is defined; never inferred from stored data.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LogicalType {
    Integer,
    Number,
    Boolean,
    #[serde(alias = "varchar")]
    ShortText,
    Text,
    Json,
    #[serde(alias = "date")]
    Timestamp,
}

impl LogicalType {
    /// Every logical type, in declaration order.
    pub const ALL: [LogicalType; 7] = [
        LogicalType::Integer,
        LogicalType::Number,
        LogicalType::Boolean,
        LogicalType::ShortText,
        LogicalType::Text,
        LogicalType::Json,
        LogicalType::Timestamp,
    ];

    /// Canonical lowercase name.
    pub fn as_str(self) -> &'static str {
        match self {
            LogicalType::Integer => "integer",
            LogicalType::Number => "number",
            LogicalType::Boolean => "boolean",
            LogicalType::ShortText => "short_text",
            LogicalType::Text => "text",
            LogicalType::Json => "json",
            LogicalType::Timestamp => "timestamp",
        }
    }
}

impl fmt::Display for LogicalType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Returned when a string names no known [`LogicalType`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("unknown logical type: {0}")]
pub struct UnknownLogicalType(pub String);

impl FromStr for LogicalType {
    type Err = UnknownLogicalType;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "integer" => Ok(LogicalType::Integer),
            "number" => Ok(LogicalType::Number),
            "boolean" => Ok(LogicalType::Boolean),
            "short_text" | "varchar" => Ok(LogicalType::ShortText),
            "text" => Ok(LogicalType::Text),
            "json" => Ok(LogicalType::Json),
            "timestamp" | "date" => Ok(LogicalType::Timestamp),
            other => Err(UnknownLogicalType(other.to_owned())),
        }
    }
}

// ---------------------------------------------------------------------------
// Typed values
// ---------------------------------------------------------------------------

/// A value tagged with exactly one [`LogicalType`].
///
/// The variant decides both how the value is rendered to text and how stored
/// text is parsed back.
#[derive(Debug, Clone, PartialEq)]
pub enum TypedValue {
    Integer(i64),
    Number(f64),
    Boolean(bool),
    ShortText(String),
    Text(String),
    Json(JsonValue),
    Timestamp(DateTime<Utc>),
}

impl TypedValue {
    /// The logical type this value is tagged with.
    pub fn logical_type(&self) -> LogicalType {
        match self {
            TypedValue::Integer(_) => LogicalType::Integer,
            TypedValue::Number(_) => LogicalType::Number,
            TypedValue::Boolean(_) => LogicalType::Boolean,
            TypedValue::ShortText(_) => LogicalType::ShortText,
            TypedValue::Text(_) => LogicalType::Text,
            TypedValue::Json(_) => LogicalType::Json,
            TypedValue::Timestamp(_) => LogicalType::Timestamp,
        }
    }

    pub fn as_i64(&self) -> Option<i64> {
        match self {
            TypedValue::Integer(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            TypedValue::Number(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            TypedValue::Boolean(v) => Some(*v),
            _ => None,
        }
    }

    /// Borrow the text of a `ShortText` or `Text` value.
    pub fn as_str(&self) -> Option<&str> {
        match self {
            TypedValue::ShortText(s) | TypedValue::Text(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_json(&self) -> Option<&JsonValue> {
        match self {
            TypedValue::Json(v) => Some(v),
            _ => None,
        }
    }

    pub fn as_timestamp(&self) -> Option<DateTime<Utc>> {
        match self {
            TypedValue::Timestamp(v) => Some(*v),
            _ => None,
        }
    }
}

impl From<i64> for TypedValue {
    fn from(v: i64) -> Self {
        TypedValue::Integer(v)
    }
}

impl From<f64> for TypedValue {
    fn from(v: f64) -> Self {
        TypedValue::Number(v)
    }
}

impl From<bool> for TypedValue {
    fn from(v: bool) -> Self {
        TypedValue::Boolean(v)
    }
}

/// Plain strings default to the unbounded `Text` type.
impl From<String> for TypedValue {
    fn from(v: String) -> Self {
        TypedValue::Text(v)
    }
}

impl From<&str> for TypedValue {
    fn from(v: &str) -> Self {
        TypedValue::Text(v.to_owned())
    }
}

impl From<JsonValue> for TypedValue {
    fn from(v: JsonValue) -> Self {
        TypedValue::Json(v)
    }
}

impl From<DateTime<Utc>> for TypedValue {
    fn from(v: DateTime<Utc>) -> Self {
        TypedValue::Timestamp(v)
    }
}
