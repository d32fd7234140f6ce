//! In-memory store engine for testing.

use crate::error::StorageResult;
use crate::memtable::{MemTable, SharedTable, TableCursor};
use crate::store::{BatchOp, KvCursor, KvStore, ReadOptions, ScanRange};
use async_trait::async_trait;
use bytes::Bytes;

/// An in-memory ordered store.
///
/// This engine keeps every entry in memory and is suitable for:
/// - Unit tests
/// - Integration tests
/// - Ephemeral storages that don't need persistence
///
/// # Example
///
/// ```rust,ignore
/// use bytes::Bytes;
/// use stampdb_storage::{KvStore, MemoryStore, ReadOptions};
///
/// let store = MemoryStore::new();
/// store.put("obj1/name".into(), Bytes::from("1.alice")).await?;
/// let value = store.get("obj1/name", ReadOptions::default()).await?;
/// assert_eq!(value, Some(Bytes::from("1.alice")));
/// ```
#[derive(Debug)]
pub struct MemoryStore {
    table: SharedTable,
}

impl MemoryStore {
    /// Creates a new empty store.
    #[must_use]
    pub fn new() -> Self {
        Self {
            table: MemTable::shared(),
        }
    }

    /// Returns the number of stored keys.
    #[must_use]
    pub fn len(&self) -> usize {
        self.table.read().len()
    }

    /// Returns true if the store holds no keys.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::new()
    }
}

#[async_trait]
impl KvStore for MemoryStore {
    async fn get(&self, key: &str, _options: ReadOptions) -> StorageResult<Option<Bytes>> {
        let table = self.table.read();
        table.ensure_open()?;
        Ok(table.get(key))
    }

    async fn put(&self, key: String, value: Bytes) -> StorageResult<()> {
        let mut table = self.table.write();
        table.ensure_open()?;
        table.apply(BatchOp::Put { key, value });
        Ok(())
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        let mut table = self.table.write();
        table.ensure_open()?;
        table.apply(BatchOp::delete(key));
        Ok(())
    }

    async fn batch(&self, ops: Vec<BatchOp>) -> StorageResult<()> {
        // A single write guard makes the batch atomic to readers.
        let mut table = self.table.write();
        table.ensure_open()?;
        for op in ops {
            table.apply(op);
        }
        Ok(())
    }

    async fn scan(
        &self,
        range: ScanRange,
        _options: ReadOptions,
    ) -> StorageResult<Box<dyn KvCursor + 'static>> {
        self.table.read().ensure_open()?;
        Ok(Box::new(TableCursor::new(self.table.clone(), range)))
    }

    async fn close(&self) -> StorageResult<()> {
        self.table.write().close();
        Ok(())
    }
}
