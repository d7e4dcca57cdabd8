//! `fieldseal`: typed, authenticated encryption of individual column values.
//!
//! Write path: typed value → [`serializer`] → UTF-8 text → [`crypto`] → base64 blob.
//! Read path: the same steps in reverse, with AEAD tag verification before any
//! plaintext is released.
//!
//! Layers, leaf first:
//! 1. [`crypto`]: SHA-256 key derivation and AES-256-GCM blobs.
//! 2. [`serializer`]: canonical text form per [`LogicalType`].
//! 3. [`column`]: one codec per `(column, type)` binding, single error kind.
//! 4. [`table`]: schema-driven row encode/decode over a text-only store.
//!
//! Every operation is synchronous and stateless apart from the immutable key,
//! so codecs can be shared across threads without locking.

pub mod column;
pub mod config;
pub mod crypto;
pub mod serializer;
pub mod table;

pub use column::{decode_column, encode_column, ColumnBinding, ColumnCodec};
pub use common::{CodecError, ColumnCodecError, JsonValue, LogicalType, TypedValue};
pub use config::Config;
pub use crypto::{EncodedBlob, EncryptionKey, FieldCipher};
pub use table::{EncryptedTable, MemoryRowStore, Row, RowCodec, RowStore, TableError, TableSchema};
