//! Structural value carried by the `Json` logical type.
//!
//! A superset of plain JSON: it also distinguishes `undefined`, big integers,
//! dates, sets, maps with non-string keys, and non-finite numbers, all of which
//! survive a storage round trip through the type-metadata segment.
//!
//! Circular references are not representable. Object keys are kept in
//! lexicographic order. Stored values may nest at most 127 containers deep
//! (a map counts twice); deeper values fail to serialize.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};

#[derive(Debug, Clone, PartialEq)]
pub enum JsonValue {
    Null,
    Undefined,
    Bool(bool),
    /// May be NaN or infinite.
    Number(f64),
    BigInt(i128),
    String(String),
    Date(DateTime<Utc>),
    Array(Vec<JsonValue>),
    /// Insertion-ordered; uniqueness is the producer's concern.
    Set(Vec<JsonValue>),
    /// Insertion-ordered key/value pairs; keys may be any value.
    Map(Vec<(JsonValue, JsonValue)>),
    Object(BTreeMap<String, JsonValue>),
}

impl JsonValue {
    /// Build an object from `(key, value)` pairs.
    pub fn object<K, I>(entries: I) -> Self
    where
        K: Into<String>,
        I: IntoIterator<Item = (K, JsonValue)>,
    {
        JsonValue::Object(entries.into_iter().map(|(k, v)| (k.into(), v)).collect())
    }
}

impl From<serde_json::Value> for JsonValue {
    /// Plain JSON converts losslessly except for integers beyond `f64` precision.
    fn from(value: serde_json::Value) -> Self {
        match value {
            serde_json::Value::Null => JsonValue::Null,
            serde_json::Value::Bool(b) => JsonValue::Bool(b),
            serde_json::Value::Number(n) => JsonValue::Number(n.as_f64().unwrap_or(f64::NAN)),
            serde_json::Value::String(s) => JsonValue::String(s),
            serde_json::Value::Array(items) => {
                JsonValue::Array(items.into_iter().map(JsonValue::from).collect())
            }
            serde_json::Value::Object(map) => JsonValue::Object(
                map.into_iter().map(|(k, v)| (k, JsonValue::from(v))).collect(),
            ),
        }
    }
}

impl From<&str> for JsonValue {
    fn from(s: &str) -> Self {
        JsonValue::String(s.to_owned())
    }
}

impl From<f64> for JsonValue {
    fn from(n: f64) -> Self {
        JsonValue::Number(n)
    }
}

impl From<bool> for JsonValue {
    fn from(b: bool) -> Self {
        JsonValue::Bool(b)
    }
}
