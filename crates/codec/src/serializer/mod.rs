//! Canonical text form of every [`LogicalType`].
//!
//! | Type                 | Text form                                         |
//! |----------------------|---------------------------------------------------|
//! | `Integer`            | decimal `i64`                                     |
//! | `Number`             | shortest round-trip decimal, `NaN`, `±Infinity`   |
//! | `Boolean`            | `true` / `false`                                  |
//! | `ShortText` / `Text` | the string itself                                 |
//! | `Json`               | `<payload>:::::<metadata>` (see [`json`])         |
//! | `Timestamp`          | `YYYY-MM-DDTHH:MM:SS.mmmZ`                        |
//!
//! `deserialize(serialize(v)?, v.logical_type())? == v` for every value the
//! type can represent. Timestamps round-trip at millisecond precision.
//!
//! Numeric parsing is strict: empty or partially numeric text is an error,
//! never a NaN or zero stand-in.

pub mod json;

use chrono::{DateTime, Datelike, NaiveDate, SecondsFormat, TimeZone, Utc};
use common::{CodecError, LogicalType, TypedValue};

/// Render `value` using its own logical type's rules.
///
/// # Errors
///
/// Returns [`CodecError::SerializationFailure`] for timestamps outside years
/// 0000–9999 (including dates nested in Json values).
pub fn serialize(value: &TypedValue) -> Result<String, CodecError> {
    match value {
        TypedValue::Integer(v) => Ok(v.to_string()),
        TypedValue::Number(v) => Ok(format_number(*v)),
        TypedValue::Boolean(v) => Ok(v.to_string()),
        TypedValue::ShortText(s) | TypedValue::Text(s) => Ok(s.clone()),
        TypedValue::Json(v) => json::serialize(v),
        TypedValue::Timestamp(ts) => format_timestamp(ts, LogicalType::Timestamp),
    }
}

/// Render `value` for a column declared as `logical_type`.
///
/// # Errors
///
/// Returns [`CodecError::SerializationFailure`] if the value's tag differs
/// from `logical_type`, in addition to the errors of [`serialize`].
pub fn serialize_as(value: &TypedValue, logical_type: LogicalType) -> Result<String, CodecError> {
    if value.logical_type() != logical_type {
        return Err(CodecError::serialization(
            logical_type,
            format!("value is tagged {}", value.logical_type()),
        ));
    }
    serialize(value)
}

/// Parse `text` according to `logical_type`.
///
/// # Errors
///
/// Returns [`CodecError::DeserializationFailure`] if `text` does not match the
/// type's grammar.
pub fn deserialize(text: &str, logical_type: LogicalType) -> Result<TypedValue, CodecError> {
    let fail = |reason: String| CodecError::deserialization(logical_type, reason);

    match logical_type {
        LogicalType::Integer => text
            .parse::<i64>()
            .map(TypedValue::Integer)
            .map_err(|e| fail(format!("not a decimal integer: {e}"))),
        LogicalType::Number => text
            .parse::<f64>()
            .map(TypedValue::Number)
            .map_err(|e| fail(format!("not a number: {e}"))),
        LogicalType::Boolean => match text {
            "true" => Ok(TypedValue::Boolean(true)),
            "false" => Ok(TypedValue::Boolean(false)),
            _ => Err(fail("expected 'true' or 'false'".into())),
        },
        LogicalType::ShortText => Ok(TypedValue::ShortText(text.to_owned())),
        LogicalType::Text => Ok(TypedValue::Text(text.to_owned())),
        LogicalType::Json => json::deserialize(text).map(TypedValue::Json),
        LogicalType::Timestamp => parse_timestamp(text)
            .map(TypedValue::Timestamp)
            .ok_or_else(|| fail("not an ISO-8601 timestamp".into())),
    }
}

/// Decimal form of an `f64`, spelling non-finite values the way stored data does.
pub(crate) fn format_number(n: f64) -> String {
    if n.is_nan() {
        "NaN".into()
    } else if n == f64::INFINITY {
        "Infinity".into()
    } else if n == f64::NEG_INFINITY {
        "-Infinity".into()
    } else {
        n.to_string()
    }
}

/// ISO-8601 with millisecond precision and a `Z` designator.
///
/// `logical_type` is the type reported if the year needs more than four digits.
pub(crate) fn format_timestamp(
    ts: &DateTime<Utc>,
    logical_type: LogicalType,
) -> Result<String, CodecError> {
    if !(0..=9999).contains(&ts.year()) {
        return Err(CodecError::serialization(
            logical_type,
            format!("year {} is outside 0000-9999", ts.year()),
        ));
    }
    Ok(ts.to_rfc3339_opts(SecondsFormat::Millis, true))
}

/// Accepts RFC 3339 with any offset, or a bare `YYYY-MM-DD` taken as midnight UTC.
pub(crate) fn parse_timestamp(text: &str) -> Option<DateTime<Utc>> {
    if let Ok(ts) = DateTime::parse_from_rfc3339(text) {
        return Some(ts.with_timezone(&Utc));
    }
    let midnight = NaiveDate::parse_from_str(text, "%Y-%m-%d")
        .ok()?
        .and_hms_opt(0, 0, 0)?;
    Some(Utc.from_utc_datetime(&midnight))
}
