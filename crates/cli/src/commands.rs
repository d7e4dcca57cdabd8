//! Subcommand bodies. Each returns the text to print on stdout.

use anyhow::{Context, Result};
use common::{JsonValue, LogicalType, TypedValue};
use fieldseal::serializer::{self, json};
use fieldseal::{ColumnBinding, ColumnCodec, Config, EncodedBlob};
use tracing::info;

fn codec(cfg: &Config, column: &str, logical_type: LogicalType) -> Result<ColumnCodec> {
    let codec = ColumnCodec::new(
        ColumnBinding::new(column, logical_type),
        cfg.field_cipher()?,
    );
    Ok(if cfg.bind_column_identity {
        codec.bind_column_identity()
    } else {
        codec
    })
}

/// Read a command-line value as `logical_type`.
///
/// JSON arrives as plain JSON text; every other type uses its canonical
/// serialized form.
fn parse_value(text: &str, logical_type: LogicalType) -> Result<TypedValue> {
    if logical_type == LogicalType::Json {
        let plain: serde_json::Value =
            serde_json::from_str(text).context("value is not valid JSON")?;
        return Ok(TypedValue::Json(JsonValue::from(plain)));
    }
    Ok(serializer::deserialize(text, logical_type)?)
}

fn render_value(value: &TypedValue) -> Result<String> {
    match value {
        TypedValue::Json(v) => Ok(json::to_plain(v)?.to_string()),
        other => Ok(serializer::serialize(other)?),
    }
}

pub fn encrypt(cfg: &Config, column: &str, logical_type: LogicalType, value: &str) -> Result<String> {
    let typed = parse_value(value, logical_type)?;
    let blob = codec(cfg, column, logical_type)?.encode(&typed)?;
    info!(column, logical_type = %logical_type, "value sealed");
    Ok(blob)
}

pub fn decrypt(cfg: &Config, column: &str, logical_type: LogicalType, blob: &str) -> Result<String> {
    let typed = codec(cfg, column, logical_type)?.decode(blob)?;
    info!(column, logical_type = %logical_type, "value opened");
    render_value(&typed)
}

/// Layout of a blob: nonce in hex and section sizes. Needs no key.
pub fn inspect(blob: &str) -> Result<String> {
    let parsed: EncodedBlob = blob.parse()?;
    let nonce: String = parsed.nonce.iter().map(|b| format!("{b:02x}")).collect();
    Ok(serde_json::json!({
        "nonce": nonce,
        "tag_bytes": parsed.tag.len(),
        "ciphertext_bytes": parsed.ciphertext.len(),
    })
    .to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn cfg(bind: bool) -> Config {
        Config {
            encryption_key: "cli-test-secret".into(),
            log_level: "info".into(),
            bind_column_identity: bind,
        }
    }

    #[test]
    fn encrypt_then_decrypt_each_type() {
        let cases = [
            (LogicalType::Integer, "-42"),
            (LogicalType::Number, "3.5"),
            (LogicalType::Boolean, "true"),
            (LogicalType::ShortText, "Alice"),
            (LogicalType::Text, "line one\nline two"),
            (LogicalType::Timestamp, "2024-01-15T10:30:00.000Z"),
        ];
        for (ty, input) in cases {
            let blob = encrypt(&cfg(false), "c", ty, input).unwrap();
            assert_ne!(blob, input);
            assert_eq!(decrypt(&cfg(false), "c", ty, &blob).unwrap(), input, "{ty}");
        }
    }

    #[test]
    fn json_values_print_as_plain_json() {
        let blob = encrypt(&cfg(false), "doc", LogicalType::Json, r#"{"a":[1.5,"x"],"b":null}"#)
            .unwrap();
        let out = decrypt(&cfg(false), "doc", LogicalType::Json, &blob).unwrap();
        let parsed: serde_json::Value = serde_json::from_str(&out).unwrap();
        assert_eq!(parsed, serde_json::json!({"a": [1.5, "x"], "b": null}));
    }

    #[test]
    fn invalid_input_is_rejected() {
        assert!(encrypt(&cfg(false), "n", LogicalType::Integer, "12abc").is_err());
        assert!(encrypt(&cfg(false), "j", LogicalType::Json, "{not json").is_err());
    }

    #[test]
    fn decrypt_error_names_column() {
        let err = decrypt(&cfg(false), "age", LogicalType::Integer, "AAAA").unwrap_err();
        assert!(err.to_string().contains("age"), "{err}");
    }

    #[test]
    fn identity_binding_rejects_other_column() {
        let blob = encrypt(&cfg(true), "email", LogicalType::Text, "a@b.c").unwrap();
        assert!(decrypt(&cfg(true), "name", LogicalType::Text, &blob).is_err());
        assert_eq!(
            decrypt(&cfg(true), "email", LogicalType::Text, &blob).unwrap(),
            "a@b.c"
        );
    }

    #[test]
    fn inspect_reports_layout() {
        let blob = encrypt(&cfg(false), "c", LogicalType::Text, "hello").unwrap();
        let out: serde_json::Value = serde_json::from_str(&inspect(&blob).unwrap()).unwrap();
        assert_eq!(out["nonce"].as_str().unwrap().len(), 24);
        assert_eq!(out["tag_bytes"], 16);
        assert_eq!(out["ciphertext_bytes"], 5);
    }

    #[test]
    fn inspect_rejects_short_blob() {
        assert!(inspect("AAAA").is_err());
    }
}
