//! Common value types and errors shared across `fieldseal` crates.

pub mod error;
pub mod json;
pub mod types;

pub use error::{CodecError, ColumnCodecError, ColumnOp};
pub use json::JsonValue;
pub use types::{LogicalType, TypedValue, UnknownLogicalType};
