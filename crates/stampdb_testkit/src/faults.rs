//! Fault injection for store engines.
//!
//! [`FaultyFactory`] wraps every store it opens in a [`FaultyStore`]. Faults
//! are armed at runtime through a shared [`Faults`] handle, so a test can
//! populate a storage normally and then make its next scan or write fail.

use async_trait::async_trait;
use bytes::Bytes;
use stampdb_storage::{
    BatchOp, EngineFactory, EngineKind, KvCursor, KvEntry, KvStore, LogOptions, ReadOptions,
    ScanRange, StorageError, StorageResult, StoreFactory,
};
use std::path::Path;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;

const DISARMED: usize = usize::MAX;

/// Runtime fault switches shared by a factory and its stores.
#[derive(Debug)]
pub struct Faults {
    scan_error_after: AtomicUsize,
    fail_writes: AtomicBool,
    entries_yielded: AtomicUsize,
}

impl Default for Faults {
    fn default() -> Self {
        Self {
            scan_error_after: AtomicUsize::new(DISARMED),
            fail_writes: AtomicBool::new(false),
            entries_yielded: AtomicUsize::new(0),
        }
    }
}

impl Faults {
    /// Creates a disarmed handle.
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Makes every subsequent cursor fail after yielding `entries` entries.
    pub fn fail_scans_after(&self, entries: usize) {
        self.scan_error_after.store(entries, Ordering::SeqCst);
    }

    /// Makes puts, deletes and batches fail.
    pub fn fail_writes(&self, value: bool) {
        self.fail_writes.store(value, Ordering::SeqCst);
    }

    /// Disarms every fault.
    pub fn reset(&self) {
        self.scan_error_after.store(DISARMED, Ordering::SeqCst);
        self.fail_writes.store(false, Ordering::SeqCst);
    }

    /// Total entries yielded by all cursors so far.
    pub fn entries_yielded(&self) -> usize {
        self.entries_yielded.load(Ordering::SeqCst)
    }

    fn check_write(&self, op: &str) -> StorageResult<()> {
        if self.fail_writes.load(Ordering::SeqCst) {
            Err(StorageError::injected(format!("{op} failure")))
        } else {
            Ok(())
        }
    }
}

/// A store that fails on demand.
pub struct FaultyStore {
    inner: Arc<dyn KvStore>,
    faults: Arc<Faults>,
}

impl FaultyStore {
    /// Wraps `inner`.
    pub fn new(inner: Arc<dyn KvStore>, faults: Arc<Faults>) -> Self {
        Self { inner, faults }
    }
}

#[async_trait]
impl KvStore for FaultyStore {
    async fn get(&self, key: &str, options: ReadOptions) -> StorageResult<Option<Bytes>> {
        self.inner.get(key, options).await
    }

    async fn put(&self, key: String, value: Bytes) -> StorageResult<()> {
        self.faults.check_write("put")?;
        self.inner.put(key, value).await
    }

    async fn delete(&self, key: &str) -> StorageResult<()> {
        self.faults.check_write("delete")?;
        self.inner.delete(key).await
    }

    async fn batch(&self, ops: Vec<BatchOp>) -> StorageResult<()> {
        self.faults.check_write("batch")?;
        self.inner.batch(ops).await
    }

    async fn scan(
        &self,
        range: ScanRange,
        options: ReadOptions,
    ) -> StorageResult<Box<dyn KvCursor + 'static>> {
        let inner = self.inner.scan(range, options).await?;
        Ok(Box::new(FaultyCursor {
            inner,
            faults: Arc::clone(&self.faults),
            yielded: 0,
        }))
    }

    async fn close(&self) -> StorageResult<()> {
        self.inner.close().await
    }
}

struct FaultyCursor {
    inner: Box<dyn KvCursor>,
    faults: Arc<Faults>,
    yielded: usize,
}

#[async_trait]
impl KvCursor for FaultyCursor {
    async fn next(&mut self) -> StorageResult<Option<KvEntry>> {
        if self.yielded >= self.faults.scan_error_after.load(Ordering::SeqCst) {
            return Err(StorageError::injected("scan failure"));
        }
        let entry = self.inner.next().await?;
        if entry.is_some() {
            self.yielded += 1;
            self.faults.entries_yielded.fetch_add(1, Ordering::SeqCst);
        }
        Ok(entry)
    }

    fn destroy(&mut self) {
        self.inner.destroy();
    }
}

/// Opens stores through an [`EngineFactory`] and wraps them in
/// [`FaultyStore`].
pub struct FaultyFactory {
    inner: EngineFactory,
    faults: Arc<Faults>,
}

impl FaultyFactory {
    /// Creates a factory over `kind` sharing `faults`.
    pub fn new(kind: EngineKind, faults: Arc<Faults>) -> Self {
        Self {
            inner: EngineFactory::new(kind, LogOptions::default()),
            faults,
        }
    }
}

#[async_trait]
impl StoreFactory for FaultyFactory {
    async fn open(&self, path: &Path) -> StorageResult<Arc<dyn KvStore>> {
        let inner = self.inner.open(path).await?;
        Ok(Arc::new(FaultyStore::new(inner, Arc::clone(&self.faults))))
    }
}
