//! [`RowStore`]: the opaque-text storage contract, plus an in-memory store.

use std::{
    collections::BTreeMap,
    sync::{Arc, RwLock, RwLockReadGuard},
};

use thiserror::Error;

/// One persisted row: column name → opaque stored text.
pub type StoredRow = BTreeMap<String, String>;

/// Identifier assigned by the store on insert.
pub type RowId = u64;

/// Errors surfaced by a storage backend.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StoreError {
    /// The backend cannot currently serve the request.
    #[error("store unavailable: {0}")]
    Unavailable(String),
}

/// What the codec needs from a table engine: persist and return text cells.
///
/// Implementations never see typed values or plaintext; they must treat
/// every cell as an opaque string.
#[cfg_attr(test, mockall::automock)]
pub trait RowStore: Send + Sync {
    /// Persist a row and return its new identifier.
    fn insert(&self, row: StoredRow) -> Result<RowId, StoreError>;

    /// Return every row in insertion order.
    fn scan(&self) -> Result<Vec<(RowId, StoredRow)>, StoreError>;
}

/// Process-local [`RowStore`] backed by a vector.
///
/// Cloning shares the same underlying rows.
#[derive(Clone, Debug, Default)]
pub struct MemoryRowStore {
    rows: Arc<RwLock<Vec<StoredRow>>>,
}

impl MemoryRowStore {
    /// Create a new, empty [`MemoryRowStore`].
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of rows stored.
    pub fn len(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.len())
    }

    /// Return `true` if no rows are stored.
    pub fn is_empty(&self) -> Result<bool, StoreError> {
        Ok(self.len()? == 0)
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, Vec<StoredRow>>, StoreError> {
        self.rows.read().map_err(|_| poisoned())
    }
}

fn poisoned() -> StoreError {
    StoreError::Unavailable("row lock poisoned".into())
}

impl RowStore for MemoryRowStore {
    fn insert(&self, row: StoredRow) -> Result<RowId, StoreError> {
        let mut rows = self.rows.write().map_err(|_| poisoned())?;
        rows.push(row);
        Ok(rows.len() as RowId)
    }

    fn scan(&self) -> Result<Vec<(RowId, StoredRow)>, StoreError> {
        let rows = self.read()?;
        Ok(rows
            .iter()
            .enumerate()
            .map(|(i, row)| (i as RowId + 1, row.clone()))
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(cell: &str) -> StoredRow {
        StoredRow::from([("name".to_owned(), cell.to_owned())])
    }

    #[test]
    fn initially_empty() {
        let store = MemoryRowStore::new();
        assert!(store.is_empty().unwrap());
        assert!(store.scan().unwrap().is_empty());
    }

    #[test]
    fn ids_start_at_one_and_follow_insertion_order() {
        let store = MemoryRowStore::new();
        assert_eq!(store.insert(row("a")).unwrap(), 1);
        assert_eq!(store.insert(row("b")).unwrap(), 2);
        let rows = store.scan().unwrap();
        assert_eq!(rows, vec![(1, row("a")), (2, row("b"))]);
    }

    #[test]
    fn clones_share_rows() {
        let store = MemoryRowStore::new();
        let other = store.clone();
        store.insert(row("a")).unwrap();
        assert_eq!(other.len().unwrap(), 1);
    }

    #[test]
    fn poisoned_lock_is_reported_not_hidden() {
        let store = MemoryRowStore::new();
        store.insert(row("a")).unwrap();
        let shared = store.clone();
        let _ = std::thread::spawn(move || {
            let _guard = shared.rows.write().unwrap();
            panic!("poison the row lock");
        })
        .join();

        assert!(matches!(store.len(), Err(StoreError::Unavailable(_))));
        assert!(store.is_empty().is_err());
        assert!(store.scan().is_err());
        assert!(store.insert(row("b")).is_err());
    }
}
