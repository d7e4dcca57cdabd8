//! Table schemas with encrypted columns, and row-level encode/decode on top
//! of a [`RowStore`].
//!
//! # Responsibilities
//!
//! - Hold the `(column name, logical type)` bindings of one table.
//! - Encode a typed [`Row`] into a [`StoredRow`] of opaque text cells, and back.
//! - Drive a [`RowStore`] so that callers only ever handle typed values.
//!
//! A failure in any column aborts the whole row; nothing partial is written
//! or returned.

pub mod store;

pub use store::{MemoryRowStore, RowId, RowStore, StoreError, StoredRow};

use std::collections::{BTreeMap, HashSet};

use common::{ColumnCodecError, TypedValue};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

use crate::column::{ColumnBinding, ColumnCodec};
use crate::crypto::FieldCipher;

/// One logical row: column name → typed value.
pub type Row = BTreeMap<String, TypedValue>;

/// Errors from the table layer.
#[derive(Debug, Error)]
pub enum TableError {
    /// The schema text could not be parsed.
    #[error("invalid table schema: {0}")]
    InvalidSchema(String),

    /// Two bindings in one schema share a name.
    #[error("duplicate column '{0}' in table schema")]
    DuplicateColumn(String),

    /// A row mentions a column the schema does not define.
    #[error("column '{column}' is not part of table '{table}'")]
    UnknownColumn { table: String, column: String },

    /// A single column failed to encode or decode.
    #[error(transparent)]
    Column(#[from] ColumnCodecError),

    /// The backing store failed.
    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Name and encrypted columns of one table.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    pub columns: Vec<ColumnBinding>,
}

impl TableSchema {
    /// Parse a schema definition such as
    /// `{"name":"data","columns":[{"name":"name","type":"varchar"}]}`.
    pub fn from_json(text: &str) -> Result<Self, TableError> {
        serde_json::from_str(text).map_err(|e| TableError::InvalidSchema(e.to_string()))
    }
}

/// Per-column codecs for one table.
#[derive(Debug, Clone)]
pub struct RowCodec {
    table: String,
    columns: BTreeMap<String, ColumnCodec>,
}

impl RowCodec {
    /// Build one [`ColumnCodec`] per binding, all sharing `cipher`.
    ///
    /// # Errors
    ///
    /// Returns [`TableError::DuplicateColumn`] if a column name repeats.
    pub fn new(schema: &TableSchema, cipher: &FieldCipher) -> Result<Self, TableError> {
        Self::build(schema, cipher, false)
    }

    /// Like [`RowCodec::new`], with every column's name authenticated as
    /// associated data (see [`ColumnCodec::bind_column_identity`]).
    pub fn with_column_identity(
        schema: &TableSchema,
        cipher: &FieldCipher,
    ) -> Result<Self, TableError> {
        Self::build(schema, cipher, true)
    }

    fn build(schema: &TableSchema, cipher: &FieldCipher, bind: bool) -> Result<Self, TableError> {
        let mut seen = HashSet::new();
        let mut columns = BTreeMap::new();
        for binding in &schema.columns {
            if !seen.insert(binding.name.as_str()) {
                return Err(TableError::DuplicateColumn(binding.name.clone()));
            }
            let mut codec = ColumnCodec::new(binding.clone(), cipher.clone());
            if bind {
                codec = codec.bind_column_identity();
            }
            columns.insert(binding.name.clone(), codec);
        }
        Ok(Self {
            table: schema.name.clone(),
            columns,
        })
    }

    /// Encode every present column. Absent columns are skipped.
    pub fn encode_row(&self, row: &Row) -> Result<StoredRow, TableError> {
        let mut stored = StoredRow::new();
        for (column, value) in row {
            let cell = self.codec(column)?.encode(value)?;
            stored.insert(column.clone(), cell);
        }
        Ok(stored)
    }

    /// Decode every present cell. Absent columns are skipped.
    pub fn decode_row(&self, stored: &StoredRow) -> Result<Row, TableError> {
        let mut row = Row::new();
        for (column, cell) in stored {
            let value = self.codec(column)?.decode(cell)?;
            row.insert(column.clone(), value);
        }
        Ok(row)
    }

    fn codec(&self, column: &str) -> Result<&ColumnCodec, TableError> {
        self.columns
            .get(column)
            .ok_or_else(|| TableError::UnknownColumn {
                table: self.table.clone(),
                column: column.to_owned(),
            })
    }
}

/// A table whose listed columns are encrypted at rest in `S`.
#[derive(Debug)]
pub struct EncryptedTable<S> {
    codec: RowCodec,
    store: S,
}

impl<S: RowStore> EncryptedTable<S> {
    pub fn new(codec: RowCodec, store: S) -> Self {
        Self { codec, store }
    }

    /// Encrypt and persist `row`.
    pub fn insert(&self, row: &Row) -> Result<RowId, TableError> {
        let stored = self.codec.encode_row(row)?;
        let id = self.store.insert(stored)?;
        debug!(table = %self.codec.table, id, "row inserted");
        Ok(id)
    }

    /// Every row, decrypted.
    pub fn list(&self) -> Result<Vec<(RowId, Row)>, TableError> {
        self.store
            .scan()?
            .into_iter()
            .map(|(id, stored)| Ok((id, self.codec.decode_row(&stored)?)))
            .collect()
    }

    /// Every row exactly as stored: ciphertext only.
    pub fn list_raw(&self) -> Result<Vec<(RowId, StoredRow)>, TableError> {
        Ok(self.store.scan()?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::crypto::{EncryptionKey, KEY_LEN};
    use chrono::{TimeZone, Utc};
    use common::LogicalType;
    use std::sync::Arc;
    use store::MockRowStore;

    const SCHEMA: &str = r#"{
        "name": "data",
        "columns": [
            {"name": "name", "type": "varchar"},
            {"name": "createdAt", "type": "date"},
            {"name": "isEncrypted", "type": "boolean"}
        ]
    }"#;

    fn cipher() -> FieldCipher {
        FieldCipher::new(Arc::new(EncryptionKey::from_bytes([9u8; KEY_LEN])))
    }

    fn sample_row() -> Row {
        Row::from([
            ("name".to_owned(), TypedValue::ShortText("Alice".into())),
            (
                "createdAt".to_owned(),
                TypedValue::Timestamp(Utc.with_ymd_and_hms(2024, 1, 15, 10, 30, 0).unwrap()),
            ),
            ("isEncrypted".to_owned(), TypedValue::Boolean(true)),
        ])
    }

    fn table() -> EncryptedTable<MemoryRowStore> {
        let schema = TableSchema::from_json(SCHEMA).unwrap();
        EncryptedTable::new(RowCodec::new(&schema, &cipher()).unwrap(), MemoryRowStore::new())
    }

    #[test]
    fn schema_parses_legacy_type_names() {
        let schema = TableSchema::from_json(SCHEMA).unwrap();
        assert_eq!(schema.columns.len(), 3);
        assert_eq!(schema.columns[0].logical_type, LogicalType::ShortText);
        assert_eq!(schema.columns[1].logical_type, LogicalType::Timestamp);
    }

    #[test]
    fn invalid_schema_rejected() {
        assert!(matches!(
            TableSchema::from_json(r#"{"name":"t","columns":[{"name":"x","type":"uuid"}]}"#),
            Err(TableError::InvalidSchema(_))
        ));
    }

    #[test]
    fn duplicate_columns_rejected() {
        let schema = TableSchema {
            name: "t".into(),
            columns: vec![
                ColumnBinding::new("x", LogicalType::Text),
                ColumnBinding::new("x", LogicalType::Integer),
            ],
        };
        assert!(matches!(
            RowCodec::new(&schema, &cipher()),
            Err(TableError::DuplicateColumn(c)) if c == "x"
        ));
    }

    #[test]
    fn insert_then_list_round_trips() {
        let table = table();
        let id = table.insert(&sample_row()).unwrap();
        let rows = table.list().unwrap();
        assert_eq!(rows, vec![(id, sample_row())]);
    }

    #[test]
    fn raw_listing_holds_only_ciphertext() {
        let table = table();
        table.insert(&sample_row()).unwrap();
        let raw = table.list_raw().unwrap();
        let (_, stored) = &raw[0];
        assert_eq!(stored.len(), 3);
        assert!(!stored["name"].contains("Alice"));
        assert_ne!(stored["isEncrypted"], "true");
        assert!(!stored["createdAt"].contains("2024"));
    }

    #[test]
    fn absent_columns_are_skipped() {
        let table = table();
        let partial = Row::from([("isEncrypted".to_owned(), TypedValue::Boolean(false))]);
        table.insert(&partial).unwrap();
        assert_eq!(table.list().unwrap()[0].1, partial);
    }

    #[test]
    fn unknown_column_rejected_before_storage() {
        let mut store = MockRowStore::new();
        store.expect_insert().never();
        let schema = TableSchema::from_json(SCHEMA).unwrap();
        let table = EncryptedTable::new(RowCodec::new(&schema, &cipher()).unwrap(), store);

        let row = Row::from([("ssn".to_owned(), TypedValue::Text("123".into()))]);
        assert!(matches!(
            table.insert(&row),
            Err(TableError::UnknownColumn { column, .. }) if column == "ssn"
        ));
    }

    #[test]
    fn wrong_type_aborts_whole_row() {
        let mut store = MockRowStore::new();
        store.expect_insert().never();
        let schema = TableSchema::from_json(SCHEMA).unwrap();
        let table = EncryptedTable::new(RowCodec::new(&schema, &cipher()).unwrap(), store);

        let mut row = sample_row();
        row.insert("isEncrypted".into(), TypedValue::Text("yes".into()));
        let err = table.insert(&row).unwrap_err();
        assert!(err.to_string().contains("isEncrypted"), "{err}");
    }

    #[test]
    fn store_errors_propagate() {
        let mut store = MockRowStore::new();
        store
            .expect_insert()
            .times(1)
            .returning(|_| Err(StoreError::Unavailable("disk full".into())));
        let schema = TableSchema::from_json(SCHEMA).unwrap();
        let table = EncryptedTable::new(RowCodec::new(&schema, &cipher()).unwrap(), store);

        assert!(matches!(
            table.insert(&sample_row()),
            Err(TableError::Store(StoreError::Unavailable(_)))
        ));
    }

    #[test]
    fn corrupted_cell_fails_listing() {
        let mut store = MockRowStore::new();
        store.expect_scan().returning(|| {
            Ok(vec![(
                1,
                StoredRow::from([("name".to_owned(), "AAAA".to_owned())]),
            )])
        });
        let schema = TableSchema::from_json(SCHEMA).unwrap();
        let table = EncryptedTable::new(RowCodec::new(&schema, &cipher()).unwrap(), store);

        match table.list() {
            Err(TableError::Column(e)) => {
                assert_eq!(e.column, "name");
                assert_eq!(e.kind().code(), "malformed_blob");
            }
            other => panic!("expected a column error, got {other:?}"),
        }
    }

    #[test]
    fn column_identity_binding_detects_swapped_cells() {
        let schema = TableSchema::from_json(SCHEMA).unwrap();
        let codec = RowCodec::with_column_identity(&schema, &cipher()).unwrap();
        let store = MemoryRowStore::new();
        let table = EncryptedTable::new(codec.clone(), store.clone());
        table.insert(&sample_row()).unwrap();

        let (_, mut stored) = store.scan().unwrap().remove(0);
        let name = stored["name"].clone();
        stored.insert("isEncrypted".into(), name);
        assert!(codec.decode_row(&stored).is_err());
    }
}
