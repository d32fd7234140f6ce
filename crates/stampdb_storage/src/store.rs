//! Store engine trait definitions.

use crate::error::StorageResult;
use async_trait::async_trait;
use bytes::Bytes;

/// A single key/value pair yielded by a scan.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KvEntry {
    /// The record key.
    pub key: String,
    /// The raw stored value.
    pub value: Bytes,
}

impl KvEntry {
    /// Creates a new entry.
    pub fn new(key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}

/// Inclusive key bounds for a range scan.
///
/// Absent bounds are unbounded. Keys compare bytewise, which for UTF-8
/// text is the same as comparing code points.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScanRange {
    /// Lowest key included in the scan.
    pub gte: Option<String>,
    /// Highest key included in the scan.
    pub lte: Option<String>,
}

impl ScanRange {
    /// A range covering the whole store.
    #[must_use]
    pub fn all() -> Self {
        Self::default()
    }

    /// A range between two inclusive bounds.
    pub fn between(gte: impl Into<String>, lte: impl Into<String>) -> Self {
        Self {
            gte: Some(gte.into()),
            lte: Some(lte.into()),
        }
    }

    /// Returns true if `key` falls inside the range.
    #[must_use]
    pub fn contains(&self, key: &str) -> bool {
        let above = self.gte.as_deref().map_or(true, |gte| key >= gte);
        let below = self.lte.as_deref().map_or(true, |lte| key <= lte);
        above && below
    }
}

/// Options for read operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReadOptions {
    /// Whether blocks touched by this read should be kept in the engine's
    /// read cache. Bulk scans pass `false` to avoid evicting hot data.
    pub fill_cache: bool,
}

impl Default for ReadOptions {
    fn default() -> Self {
        Self { fill_cache: true }
    }
}

impl ReadOptions {
    /// Read options that bypass the read cache.
    #[must_use]
    pub const fn skip_cache() -> Self {
        Self { fill_cache: false }
    }
}

/// A single operation inside an atomic batch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum BatchOp {
    /// Insert or overwrite a key.
    Put {
        /// The key to write.
        key: String,
        /// The value to store.
        value: Bytes,
    },
    /// Remove a key. Removing an absent key is a no-op.
    Delete {
        /// The key to remove.
        key: String,
    },
}

impl BatchOp {
    /// Creates a put operation.
    pub fn put(key: impl Into<String>, value: impl Into<Bytes>) -> Self {
        Self::Put {
            key: key.into(),
            value: value.into(),
        }
    }

    /// Creates a delete operation.
    pub fn delete(key: impl Into<String>) -> Self {
        Self::Delete { key: key.into() }
    }

    /// Returns the key this operation targets.
    #[must_use]
    pub fn key(&self) -> &str {
        match self {
            Self::Put { key, .. } | Self::Delete { key } => key,
        }
    }
}

/// A streaming cursor over the entries of a range scan, in key order.
#[async_trait]
pub trait KvCursor: Send {
    /// Returns the next entry, or `None` once the range is exhausted or the
    /// cursor was destroyed.
    async fn next(&mut self) -> StorageResult<Option<KvEntry>>;

    /// Stops the scan early. Every later call to [`KvCursor::next`]
    /// returns `Ok(None)`.
    fn destroy(&mut self);
}

/// An ordered key-value store.
///
/// Stores are the black box underneath the record layer. They know nothing
/// about stamps, categories or payload encodings.
///
/// # Invariants
///
/// - At most one value exists per key; `put` overwrites.
/// - A `put` is visible to a `get` issued after its future resolves.
/// - `batch` applies all of its operations or none of them.
/// - Scans yield entries in ascending key order.
#[async_trait]
pub trait KvStore: Send + Sync {
    /// Reads the value stored under `key`.
    ///
    /// Returns `Ok(None)` when the key is absent.
    async fn get(&self, key: &str, options: ReadOptions) -> StorageResult<Option<Bytes>>;

    /// Writes `value` under `key`, replacing any previous value.
    async fn put(&self, key: String, value: Bytes) -> StorageResult<()>;

    /// Removes `key`. Removing an absent key succeeds.
    async fn delete(&self, key: &str) -> StorageResult<()>;

    /// Applies `ops` atomically.
    async fn batch(&self, ops: Vec<BatchOp>) -> StorageResult<()>;

    /// Opens a cursor over every entry inside `range`.
    async fn scan(
        &self,
        range: ScanRange,
        options: ReadOptions,
    ) -> StorageResult<Box<dyn KvCursor + 'static>>;

    /// Releases the store. Later operations fail with
    /// [`StorageError::Closed`](crate::StorageError::Closed).
    async fn close(&self) -> StorageResult<()>;
}
