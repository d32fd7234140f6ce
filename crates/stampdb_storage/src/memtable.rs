//! Ordered in-memory index shared by the store engines.

use crate::error::{StorageError, StorageResult};
use crate::store::{BatchOp, KvCursor, KvEntry, ScanRange};
use async_trait::async_trait;
use bytes::Bytes;
use parking_lot::RwLock;
use std::collections::BTreeMap;
use std::ops::Bound;
use std::sync::Arc;

/// The ordered key index behind both engines.
#[derive(Debug, Default)]
pub(crate) struct MemTable {
    entries: BTreeMap<String, Bytes>,
    closed: bool,
}

pub(crate) type SharedTable = Arc<RwLock<MemTable>>;

impl MemTable {
    pub(crate) fn shared() -> SharedTable {
        Arc::new(RwLock::new(Self::default()))
    }

    pub(crate) fn ensure_open(&self) -> StorageResult<()> {
        if self.closed {
            return Err(StorageError::Closed);
        }
        Ok(())
    }

    pub(crate) fn get(&self, key: &str) -> Option<Bytes> {
        self.entries.get(key).cloned()
    }

    pub(crate) fn apply(&mut self, op: BatchOp) {
        match op {
            BatchOp::Put { key, value } => {
                self.entries.insert(key, value);
            }
            BatchOp::Delete { key } => {
                self.entries.remove(&key);
            }
        }
    }

    pub(crate) fn len(&self) -> usize {
        self.entries.len()
    }

    pub(crate) fn iter(&self) -> impl Iterator<Item = (&String, &Bytes)> {
        self.entries.iter()
    }

    pub(crate) fn close(&mut self) {
        self.closed = true;
    }

    /// Returns the first entry inside `range` strictly after `after`.
    fn next_after(&self, range: &ScanRange, after: Option<&str>) -> Option<KvEntry> {
        if let (Some(gte), Some(lte)) = (range.gte.as_deref(), range.lte.as_deref()) {
            if gte > lte {
                return None;
            }
        }
        let lower = match (after, range.gte.as_deref()) {
            (Some(last), _) => Bound::Excluded(last),
            (None, Some(gte)) => Bound::Included(gte),
            (None, None) => Bound::Unbounded,
        };
        let upper = match range.lte.as_deref() {
            Some(lte) => Bound::Included(lte),
            None => Bound::Unbounded,
        };
        self.entries
            .range::<str, _>((lower, upper))
            .next()
            .map(|(key, value)| KvEntry::new(key.clone(), value.clone()))
    }
}

/// A cursor that re-seeks the shared index after the last yielded key.
///
/// The cursor holds no lock between calls, so writers are never blocked by
/// a slow consumer. Entries written behind the cursor position are not seen.
pub(crate) struct TableCursor {
    table: SharedTable,
    range: ScanRange,
    last: Option<String>,
    done: bool,
}

impl TableCursor {
    pub(crate) fn new(table: SharedTable, range: ScanRange) -> Self {
        Self {
            table,
            range,
            last: None,
            done: false,
        }
    }
}

#[async_trait]
impl KvCursor for TableCursor {
    async fn next(&mut self) -> StorageResult<Option<KvEntry>> {
        if self.done {
            return Ok(None);
        }
        let entry = {
            let table = self.table.read();
            table.ensure_open()?;
            table.next_after(&self.range, self.last.as_deref())
        };
        match entry {
            Some(entry) => {
                self.last = Some(entry.key.clone());
                Ok(Some(entry))
            }
            None => {
                self.done = true;
                Ok(None)
            }
        }
    }

    fn destroy(&mut self) {
        self.done = true;
    }
}
