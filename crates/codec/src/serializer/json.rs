//! Two-segment text form of the `Json` logical type.
//!
//! ```text
//! <payload JSON>:::::<metadata JSON>
//! ```
//!
//! The payload is plain JSON. Values plain JSON cannot express are lowered to a
//! JSON stand-in and recorded in the metadata segment, keyed by the RFC 6901
//! pointer of the lowered value:
//!
//! | Value            | Payload stand-in              | Tag         |
//! |------------------|-------------------------------|-------------|
//! | `Undefined`      | `null`                        | `undefined` |
//! | NaN / ±Infinity  | `"NaN"`, `"Infinity"`, ...    | `number`    |
//! | `BigInt`         | decimal string                | `bigint`    |
//! | `Date`           | ISO-8601 string               | `date`      |
//! | `Set`            | array                         | `set`       |
//! | `Map`            | array of `[key, value]` pairs | `map`       |
//!
//! The metadata segment is always an object, `{"values":{...}}`, even when
//! empty. Both segments are written with every `:` inside a string literal
//! escaped as `\u003a`, so the separator can never occur inside a segment.
//!
//! This is not the superjson layout of the legacy writer (`{"json":...}`
//! payload, dotted paths with tag arrays in the metadata). Json cells written
//! by that system do not decode here.

use std::{collections::BTreeMap, io};

use common::{CodecError, JsonValue, LogicalType};
use serde::{Deserialize, Serialize};
use serde_json::{ser::Formatter, Value};

use super::{format_number, format_timestamp, parse_timestamp};

/// Literal joining the payload and metadata segments.
pub const SEPARATOR: &str = ":::::";

/// Deepest container nesting of the lowered payload.
///
/// `serde_json` refuses to parse anything deeper, so [`serialize`] rejects it
/// up front. A `Map` counts two levels: its entry list and each pair.
pub const MAX_DEPTH: usize = 127;

/// Type annotation for a single lowered value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
enum TypeTag {
    Undefined,
    Number,
    Bigint,
    Date,
    Set,
    Map,
}

/// The metadata segment.
#[derive(Debug, Default, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
struct Metadata {
    values: BTreeMap<String, TypeTag>,
}

/// Render a [`JsonValue`] as `<payload>:::::<metadata>`.
///
/// # Errors
///
/// [`CodecError::SerializationFailure`] for a date outside years 0000–9999 or
/// nesting past [`MAX_DEPTH`].
pub fn serialize(value: &JsonValue) -> Result<String, CodecError> {
    let mut meta = Metadata::default();
    let payload = lower(value, "", 0, &mut meta.values)?;
    Ok(format!(
        "{}{SEPARATOR}{}",
        to_segment(&payload)?,
        to_segment(&meta)?
    ))
}

/// Parse the two-segment form back into a [`JsonValue`].
///
/// # Errors
///
/// [`CodecError::DeserializationFailure`] if the separator is missing, either
/// segment is empty or not JSON, or the metadata disagrees with the payload.
pub fn deserialize(text: &str) -> Result<JsonValue, CodecError> {
    let (payload_text, meta_text) = text
        .split_once(SEPARATOR)
        .ok_or_else(|| fail("missing segment separator"))?;
    if payload_text.is_empty() || meta_text.is_empty() {
        return Err(fail("empty segment"));
    }

    let payload: Value = serde_json::from_str(payload_text)
        .map_err(|e| fail(format!("invalid payload segment: {e}")))?;
    let mut meta: Metadata = serde_json::from_str(meta_text)
        .map_err(|e| fail(format!("invalid metadata segment: {e}")))?;

    let value = raise(payload, "", &mut meta.values)?;
    if !meta.values.is_empty() {
        return Err(fail(format!(
            "metadata annotates {} path(s) absent from the payload",
            meta.values.len()
        )));
    }
    Ok(value)
}

/// The payload segment alone, as a plain JSON value.
///
/// Lossy: the type metadata is dropped, so dates read back as strings.
pub fn to_plain(value: &JsonValue) -> Result<Value, CodecError> {
    lower(value, "", 0, &mut BTreeMap::new())
}

fn fail(reason: impl Into<String>) -> CodecError {
    CodecError::deserialization(LogicalType::Json, reason)
}

// ---------------------------------------------------------------------------
// Lowering: JsonValue → plain JSON + tags
// ---------------------------------------------------------------------------

fn lower(
    value: &JsonValue,
    pointer: &str,
    depth: usize,
    tags: &mut BTreeMap<String, TypeTag>,
) -> Result<Value, CodecError> {
    let lowered = match value {
        JsonValue::Null => Value::Null,
        JsonValue::Undefined => {
            tags.insert(pointer.to_owned(), TypeTag::Undefined);
            Value::Null
        }
        JsonValue::Bool(b) => Value::Bool(*b),
        JsonValue::Number(n) => match serde_json::Number::from_f64(*n) {
            Some(num) => Value::Number(num),
            None => {
                tags.insert(pointer.to_owned(), TypeTag::Number);
                Value::String(format_number(*n))
            }
        },
        JsonValue::BigInt(i) => {
            tags.insert(pointer.to_owned(), TypeTag::Bigint);
            Value::String(i.to_string())
        }
        JsonValue::String(s) => Value::String(s.clone()),
        JsonValue::Date(d) => {
            tags.insert(pointer.to_owned(), TypeTag::Date);
            Value::String(format_timestamp(d, LogicalType::Json)?)
        }
        JsonValue::Array(items) => Value::Array(lower_items(items, pointer, nest(depth)?, tags)?),
        JsonValue::Set(items) => {
            tags.insert(pointer.to_owned(), TypeTag::Set);
            Value::Array(lower_items(items, pointer, nest(depth)?, tags)?)
        }
        JsonValue::Map(entries) => {
            tags.insert(pointer.to_owned(), TypeTag::Map);
            // Outer array plus one array per pair.
            let inner = nest(nest(depth)?)?;
            let mut pairs = Vec::with_capacity(entries.len());
            for (i, (k, v)) in entries.iter().enumerate() {
                let entry = child(pointer, &i.to_string());
                let k = lower(k, &child(&entry, "0"), inner, tags)?;
                let v = lower(v, &child(&entry, "1"), inner, tags)?;
                pairs.push(Value::Array(vec![k, v]));
            }
            Value::Array(pairs)
        }
        JsonValue::Object(map) => {
            let inner = nest(depth)?;
            let mut out = serde_json::Map::new();
            for (k, v) in map {
                out.insert(k.clone(), lower(v, &child(pointer, k), inner, tags)?);
            }
            Value::Object(out)
        }
    };
    Ok(lowered)
}

fn lower_items(
    items: &[JsonValue],
    pointer: &str,
    depth: usize,
    tags: &mut BTreeMap<String, TypeTag>,
) -> Result<Vec<Value>, CodecError> {
    items
        .iter()
        .enumerate()
        .map(|(i, item)| lower(item, &child(pointer, &i.to_string()), depth, tags))
        .collect()
}

/// Depth inside one more container, or an error past [`MAX_DEPTH`].
fn nest(depth: usize) -> Result<usize, CodecError> {
    if depth >= MAX_DEPTH {
        return Err(encode_err(format!(
            "nesting deeper than {MAX_DEPTH} levels cannot be read back"
        )));
    }
    Ok(depth + 1)
}

// ---------------------------------------------------------------------------
// Raising: plain JSON + tags → JsonValue
// ---------------------------------------------------------------------------

fn raise(
    value: Value,
    pointer: &str,
    tags: &mut BTreeMap<String, TypeTag>,
) -> Result<JsonValue, CodecError> {
    let raised = match (tags.remove(pointer), value) {
        (None, Value::Null) => JsonValue::Null,
        (None, Value::Bool(b)) => JsonValue::Bool(b),
        (None, Value::Number(n)) => JsonValue::Number(
            n.as_f64()
                .ok_or_else(|| fail("number outside f64 range"))?,
        ),
        (None, Value::String(s)) => JsonValue::String(s),
        (None, Value::Array(items)) => JsonValue::Array(raise_items(items, pointer, tags)?),
        (None, Value::Object(map)) => {
            let mut out = BTreeMap::new();
            for (k, v) in map {
                let raised = raise(v, &child(pointer, &k), tags)?;
                out.insert(k, raised);
            }
            JsonValue::Object(out)
        }
        (Some(TypeTag::Undefined), Value::Null) => JsonValue::Undefined,
        (Some(TypeTag::Number), Value::String(s)) => JsonValue::Number(
            s.parse::<f64>()
                .map_err(|_| fail("tagged number is not numeric"))?,
        ),
        (Some(TypeTag::Bigint), Value::String(s)) => JsonValue::BigInt(
            s.parse::<i128>()
                .map_err(|_| fail("tagged bigint is not a decimal integer"))?,
        ),
        (Some(TypeTag::Date), Value::String(s)) => JsonValue::Date(
            parse_timestamp(&s).ok_or_else(|| fail("tagged date is not ISO-8601"))?,
        ),
        (Some(TypeTag::Set), Value::Array(items)) => {
            JsonValue::Set(raise_items(items, pointer, tags)?)
        }
        (Some(TypeTag::Map), Value::Array(pairs)) => {
            let mut entries = Vec::with_capacity(pairs.len());
            for (i, pair) in pairs.into_iter().enumerate() {
                let entry = child(pointer, &i.to_string());
                let [k, v] = match pair {
                    Value::Array(kv) => <[Value; 2]>::try_from(kv)
                        .map_err(|_| fail("map entry is not a [key, value] pair"))?,
                    _ => return Err(fail("map entry is not a [key, value] pair")),
                };
                let k = raise(k, &child(&entry, "0"), tags)?;
                let v = raise(v, &child(&entry, "1"), tags)?;
                entries.push((k, v));
            }
            JsonValue::Map(entries)
        }
        (Some(tag), _) => {
            return Err(fail(format!(
                "metadata tag '{}' does not fit the payload value",
                tag_name(tag)
            )))
        }
    };
    Ok(raised)
}

fn raise_items(
    items: Vec<Value>,
    pointer: &str,
    tags: &mut BTreeMap<String, TypeTag>,
) -> Result<Vec<JsonValue>, CodecError> {
    items
        .into_iter()
        .enumerate()
        .map(|(i, item)| raise(item, &child(pointer, &i.to_string()), tags))
        .collect()
}

fn tag_name(tag: TypeTag) -> &'static str {
    match tag {
        TypeTag::Undefined => "undefined",
        TypeTag::Number => "number",
        TypeTag::Bigint => "bigint",
        TypeTag::Date => "date",
        TypeTag::Set => "set",
        TypeTag::Map => "map",
    }
}

/// Append one reference token to an RFC 6901 pointer.
fn child(pointer: &str, token: &str) -> String {
    format!("{pointer}/{}", token.replace('~', "~0").replace('/', "~1"))
}

// ---------------------------------------------------------------------------
// Separator-safe JSON output
// ---------------------------------------------------------------------------

/// Compact formatter that escapes `:` inside string literals.
///
/// Structural colons are written singly by `begin_object_value`, so the
/// output never contains two colons in a row.
struct SeparatorSafeFormatter;

impl Formatter for SeparatorSafeFormatter {
    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        let mut parts = fragment.split(':');
        if let Some(first) = parts.next() {
            writer.write_all(first.as_bytes())?;
        }
        for part in parts {
            writer.write_all(b"\\u003a")?;
            writer.write_all(part.as_bytes())?;
        }
        Ok(())
    }
}

fn to_segment<T: Serialize>(value: &T) -> Result<String, CodecError> {
    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, SeparatorSafeFormatter);
    value.serialize(&mut ser).map_err(encode_err)?;
    String::from_utf8(buf).map_err(encode_err)
}

fn encode_err(e: impl std::fmt::Display) -> CodecError {
    CodecError::serialization(LogicalType::Json, e.to_string())
}
