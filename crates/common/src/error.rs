//! Common error types shared across crates.

use std::fmt;

use thiserror::Error;

use crate::types::LogicalType;

/// Narrow error kinds raised by the cipher and serializer stages.
///
/// Each variant has a stable machine-readable [`code`](CodecError::code):
/// - [`CodecError::MissingKeyConfiguration`] → `missing_key_configuration` (fatal, startup only)
/// - [`CodecError::MalformedBlob`] → `malformed_blob`
/// - [`CodecError::AuthenticationFailure`] → `authentication_failure`
/// - [`CodecError::SerializationFailure`] → `serialization_failure`
/// - [`CodecError::DeserializationFailure`] → `deserialization_failure`
/// - [`CodecError::CipherFailure`] → `cipher_failure`
#[derive(Debug, Clone, PartialEq, Error)]
pub enum CodecError {
    /// No usable secret was supplied to derive the encryption key from.
    #[error("missing key configuration: {0}")]
    MissingKeyConfiguration(String),

    /// The stored blob is not valid base64 or is shorter than the fixed header.
    #[error("malformed blob: {0}")]
    MalformedBlob(String),

    /// AEAD tag verification failed: tampering, wrong key, or corruption.
    ///
    /// Carries no detail so that callers cannot distinguish the cause.
    #[error("authentication failed")]
    AuthenticationFailure,

    /// The value could not be rendered to its logical type's text form.
    #[error("cannot serialize {logical_type} value: {reason}")]
    SerializationFailure {
        logical_type: LogicalType,
        reason: String,
    },

    /// The text does not match the grammar of the expected logical type.
    #[error("cannot deserialize {logical_type} value: {reason}")]
    DeserializationFailure {
        logical_type: LogicalType,
        reason: String,
    },

    /// The AEAD primitive refused to encrypt (plaintext beyond GCM's length limit).
    #[error("aead operation failed")]
    CipherFailure,
}

impl CodecError {
    /// Shorthand for a [`CodecError::SerializationFailure`].
    pub fn serialization(logical_type: LogicalType, reason: impl Into<String>) -> Self {
        CodecError::SerializationFailure {
            logical_type,
            reason: reason.into(),
        }
    }

    /// Shorthand for a [`CodecError::DeserializationFailure`].
    pub fn deserialization(logical_type: LogicalType, reason: impl Into<String>) -> Self {
        CodecError::DeserializationFailure {
            logical_type,
            reason: reason.into(),
        }
    }

    /// Short snake_case code, safe to put in logs and metrics labels.
    pub fn code(&self) -> &'static str {
        match self {
            CodecError::MissingKeyConfiguration(_) => "missing_key_configuration",
            CodecError::MalformedBlob(_) => "malformed_blob",
            CodecError::AuthenticationFailure => "authentication_failure",
            CodecError::SerializationFailure { .. } => "serialization_failure",
            CodecError::DeserializationFailure { .. } => "deserialization_failure",
            CodecError::CipherFailure => "cipher_failure",
        }
    }

    /// Returns `true` for errors that must abort process startup.
    pub fn is_fatal(&self) -> bool {
        matches!(self, CodecError::MissingKeyConfiguration(_))
    }
}

/// Direction of a column codec call, used in error messages.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ColumnOp {
    /// Typed value → stored blob.
    Encode,
    /// Stored blob → typed value.
    Decode,
}

impl fmt::Display for ColumnOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ColumnOp::Encode => f.write_str("encode"),
            ColumnOp::Decode => f.write_str("decode"),
        }
    }
}

/// The single error kind storage-layer callers see from a column codec.
///
/// Wraps whichever stage failed together with the column it failed on.
#[derive(Debug, Clone, PartialEq, Error)]
#[error("failed to {op} column '{column}': {source}")]
pub struct ColumnCodecError {
    /// Name of the column the value belongs to.
    pub column: String,
    /// Whether the failure happened while writing or reading.
    pub op: ColumnOp,
    /// The stage error that caused the failure.
    #[source]
    pub source: CodecError,
}

impl ColumnCodecError {
    /// Wrap `source` with the identity of `column`.
    pub fn new(column: impl Into<String>, op: ColumnOp, source: CodecError) -> Self {
        Self {
            column: column.into(),
            op,
            source,
        }
    }

    /// The underlying stage error.
    pub fn kind(&self) -> &CodecError {
        &self.source
    }
}
