//! Typed column codec: serialize then encrypt on write, decrypt then
//! deserialize on read.
//!
//! Whichever stage fails, callers get one [`ColumnCodecError`] naming the
//! column. A failure is never replaced by a default value.

use std::sync::Arc;

use common::{CodecError, ColumnCodecError, ColumnOp, LogicalType, TypedValue};
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::crypto::{EncryptionKey, FieldCipher};
use crate::serializer;

/// Column name reported by the unbound [`encode_column`] / [`decode_column`].
pub const UNBOUND_COLUMN: &str = "<unbound>";

/// A column's name and logical type, fixed when the schema is defined.
///
/// The name appears in errors and logs. It is not key material.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnBinding {
    pub name: String,
    #[serde(rename = "type")]
    pub logical_type: LogicalType,
}

impl ColumnBinding {
    pub fn new(name: impl Into<String>, logical_type: LogicalType) -> Self {
        Self {
            name: name.into(),
            logical_type,
        }
    }
}

/// Encrypting codec for a single column.
///
/// Stateless apart from the shared key; clone freely across threads.
#[derive(Debug, Clone)]
pub struct ColumnCodec {
    binding: ColumnBinding,
    cipher: FieldCipher,
    bind_identity: bool,
}

impl ColumnCodec {
    pub fn new(binding: ColumnBinding, cipher: FieldCipher) -> Self {
        Self {
            binding,
            cipher,
            bind_identity: false,
        }
    }

    /// Authenticate the column name as AEAD associated data.
    ///
    /// A blob sealed for one column then fails authentication if presented to
    /// another. Blobs written without this setting are not readable with it,
    /// and vice versa.
    pub fn bind_column_identity(mut self) -> Self {
        self.bind_identity = true;
        self
    }

    pub fn binding(&self) -> &ColumnBinding {
        &self.binding
    }

    /// Turn a typed value into the opaque text handed to storage.
    ///
    /// # Errors
    ///
    /// Returns a [`ColumnCodecError`] wrapping a serialization or cipher failure.
    pub fn encode(&self, value: &TypedValue) -> Result<String, ColumnCodecError> {
        let result = serializer::serialize_as(value, self.binding.logical_type)
            .and_then(|text| self.cipher.seal(&text, self.aad()));
        self.finish(ColumnOp::Encode, result)
    }

    /// Turn opaque text read from storage back into a typed value.
    ///
    /// # Errors
    ///
    /// Returns a [`ColumnCodecError`] wrapping a malformed blob, authentication
    /// failure, or deserialization failure.
    pub fn decode(&self, stored: &str) -> Result<TypedValue, ColumnCodecError> {
        let result = self
            .cipher
            .open(stored, self.aad())
            .and_then(|text| serializer::deserialize(&text, self.binding.logical_type));
        self.finish(ColumnOp::Decode, result)
    }

    fn aad(&self) -> &[u8] {
        if self.bind_identity {
            self.binding.name.as_bytes()
        } else {
            &[]
        }
    }

    fn finish<T>(&self, op: ColumnOp, result: Result<T, CodecError>) -> Result<T, ColumnCodecError> {
        match result {
            Ok(v) => {
                debug!(column = %self.binding.name, logical_type = %self.binding.logical_type, %op, "column codec ok");
                Ok(v)
            }
            Err(e) => {
                warn!(column = %self.binding.name, %op, error_code = e.code(), "column codec failed");
                Err(ColumnCodecError::new(self.binding.name.clone(), op, e))
            }
        }
    }
}

/// Encode `value` for a column of `logical_type` without a named binding.
pub fn encode_column(
    value: &TypedValue,
    logical_type: LogicalType,
    key: &Arc<EncryptionKey>,
) -> Result<String, ColumnCodecError> {
    unbound(logical_type, key).encode(value)
}

/// Decode a stored blob for a column of `logical_type` without a named binding.
pub fn decode_column(
    blob: &str,
    logical_type: LogicalType,
    key: &Arc<EncryptionKey>,
) -> Result<TypedValue, ColumnCodecError> {
    unbound(logical_type, key).decode(blob)
}

fn unbound(logical_type: LogicalType, key: &Arc<EncryptionKey>) -> ColumnCodec {
    ColumnCodec::new(
        ColumnBinding::new(UNBOUND_COLUMN, logical_type),
        FieldCipher::new(Arc::clone(key)),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{encrypt, KEY_LEN};
    use chrono::{TimeZone, Utc};
    use common::JsonValue;

    fn key(byte: u8) -> Arc<EncryptionKey> {
        Arc::new(EncryptionKey::from_bytes([byte; KEY_LEN]))
    }

    fn codec(name: &str, ty: LogicalType) -> ColumnCodec {
        ColumnCodec::new(ColumnBinding::new(name, ty), FieldCipher::new(key(0x42)))
    }

    fn samples() -> Vec<TypedValue> {
        vec![
            TypedValue::Integer(-9_007_199_254_740_993),
            TypedValue::Number(3.25),
            TypedValue::Boolean(true),
            TypedValue::ShortText("Alice".into()),
            TypedValue::Text("line one\nline two".into()),
            TypedValue::Json(JsonValue::object([
                ("a", JsonValue::Number(1.0)),
                ("b", JsonValue::from("x")),
                (
                    "seen",
                    JsonValue::Date(Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()),
                ),
            ])),
            TypedValue::Timestamp(Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()),
        ]
    }

    #[test]
    fn every_logical_type_round_trips() {
        for value in samples() {
            let c = codec("col", value.logical_type());
            let stored = c.encode(&value).unwrap();
            assert_eq!(c.decode(&stored).unwrap(), value);
        }
    }

    #[test]
    fn boolean_scenario() {
        let k = key(1);
        let stored = encode_column(&TypedValue::Boolean(true), LogicalType::Boolean, &k).unwrap();
        assert_ne!(stored, "true");
        assert_eq!(
            decode_column(&stored, LogicalType::Boolean, &k).unwrap(),
            TypedValue::Boolean(true)
        );
    }

    #[test]
    fn stored_text_does_not_leak_plaintext() {
        let c = codec("name", LogicalType::ShortText);
        let stored = c.encode(&TypedValue::ShortText("Alice".into())).unwrap();
        assert!(!stored.contains("Alice"));
    }

    #[test]
    fn wrong_key_is_authentication_failure_naming_column() {
        let stored = codec("email", LogicalType::Text)
            .encode(&TypedValue::Text("a@b.c".into()))
            .unwrap();
        let other = ColumnCodec::new(
            ColumnBinding::new("email", LogicalType::Text),
            FieldCipher::new(key(0x43)),
        );
        let err = other.decode(&stored).unwrap_err();
        assert_eq!(err.column, "email");
        assert_eq!(err.op, ColumnOp::Decode);
        assert_eq!(err.kind(), &CodecError::AuthenticationFailure);
        assert!(err.to_string().contains("'email'"));
    }

    #[test]
    fn malformed_blob_is_reported() {
        let err = codec("age", LogicalType::Integer).decode("c2hvcnQ=").unwrap_err();
        assert_eq!(err.kind().code(), "malformed_blob");
    }

    #[test]
    fn deserialization_failure_is_wrapped_not_defaulted() {
        // Authentic ciphertext whose plaintext is not a boolean.
        let k = key(0x42);
        let stored = encrypt("maybe", &k).unwrap().to_string();
        let err = codec("isEncrypted", LogicalType::Boolean)
            .decode(&stored)
            .unwrap_err();
        assert_eq!(err.kind().code(), "deserialization_failure");
        assert!(err.to_string().contains("isEncrypted"));
    }

    #[test]
    fn empty_plaintext_for_integer_column_fails() {
        let k = key(0x42);
        let stored = encrypt("", &k).unwrap().to_string();
        assert!(codec("n", LogicalType::Integer).decode(&stored).is_err());
    }

    #[test]
    fn type_mismatch_is_encode_error() {
        let err = codec("createdAt", LogicalType::Timestamp)
            .encode(&TypedValue::Text("2024-01-15".into()))
            .unwrap_err();
        assert_eq!(err.op, ColumnOp::Encode);
        assert_eq!(err.kind().code(), "serialization_failure");
    }

    #[test]
    fn bound_identity_rejects_blob_from_other_column() {
        let k = key(7);
        let make = |name: &str| {
            ColumnCodec::new(
                ColumnBinding::new(name, LogicalType::Text),
                FieldCipher::new(Arc::clone(&k)),
            )
            .bind_column_identity()
        };
        let stored = make("ssn").encode(&TypedValue::Text("123".into())).unwrap();
        assert_eq!(
            make("ssn").decode(&stored).unwrap(),
            TypedValue::Text("123".into())
        );
        assert_eq!(
            make("phone").decode(&stored).unwrap_err().kind(),
            &CodecError::AuthenticationFailure
        );
    }

    #[test]
    fn unbound_identity_shares_blobs_across_columns() {
        let stored = codec("a", LogicalType::Text)
            .encode(&TypedValue::Text("x".into()))
            .unwrap();
        assert!(codec("b", LogicalType::Text).decode(&stored).is_ok());
    }

    #[test]
    fn concurrent_encode_decode() {
        let c = codec("counter", LogicalType::Integer);
        std::thread::scope(|s| {
            for i in 0..16i64 {
                let c = c.clone();
                s.spawn(move || {
                    let stored = c.encode(&TypedValue::Integer(i)).unwrap();
                    assert_eq!(c.decode(&stored).unwrap(), TypedValue::Integer(i));
                });
            }
        });
    }

    #[test]
    fn binding_deserialises_from_schema_json() {
        let b: ColumnBinding =
            serde_json::from_str(r#"{"name":"createdAt","type":"date"}"#).unwrap();
        assert_eq!(b, ColumnBinding::new("createdAt", LogicalType::Timestamp));
    }
}
