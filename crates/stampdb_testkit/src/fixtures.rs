//! Test fixtures and storage helpers.
//!
//! Provides temp-dir backed storages that clean up after themselves, and
//! helpers to populate them.

use stampdb_codec::{Address, RecordLayout, StampedValue};
use stampdb_core::{Config, EngineKind, Storage};
use stampdb_storage::StoreFactory;
use std::path::PathBuf;
use std::sync::Arc;
use tempfile::TempDir;

/// A test storage with automatic cleanup.
pub struct TestStorage {
    /// The storage instance.
    pub storage: Storage,
    /// The temporary directory (kept alive to prevent cleanup).
    _temp_dir: Option<TempDir>,
}

impl TestStorage {
    /// Creates an in-memory storage with the canonical layout.
    pub async fn memory() -> Self {
        Self::memory_with(RecordLayout::Shared).await
    }

    /// Creates an in-memory storage with `layout`.
    pub async fn memory_with(layout: RecordLayout) -> Self {
        let storage = Storage::open(Config::in_memory().layout(layout))
            .await
            .expect("Failed to open in-memory storage");
        Self {
            storage,
            _temp_dir: None,
        }
    }

    /// Creates a log-backed storage in a fresh temp directory.
    pub async fn file() -> Self {
        Self::file_with(RecordLayout::Shared).await
    }

    /// Creates a log-backed storage with `layout` in a fresh temp directory.
    pub async fn file_with(layout: RecordLayout) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = Config::new(temp_dir.path().join("store")).layout(layout);
        let storage = Storage::open(config)
            .await
            .expect("Failed to open file storage");
        Self {
            storage,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Creates a storage whose partitions come from `factory`, rooted in a
    /// fresh temp directory.
    pub async fn with_factory(layout: RecordLayout, factory: Arc<dyn StoreFactory>) -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp directory");
        let config = Config::new(temp_dir.path().join("store"))
            .layout(layout)
            .engine(EngineKind::Log);
        let storage = Storage::with_factory(config, factory)
            .await
            .expect("Failed to open storage with factory");
        Self {
            storage,
            _temp_dir: Some(temp_dir),
        }
    }

    /// Returns the storage root if file-based, None if in-memory.
    pub fn path(&self) -> Option<PathBuf> {
        self._temp_dir.as_ref().map(|d| d.path().join("store"))
    }
}

impl std::ops::Deref for TestStorage {
    type Target = Storage;

    fn deref(&self) -> &Self::Target {
        &self.storage
    }
}

/// Builds `objects` objects named `obj0..`, each with a root record and
/// `fields` nested fields. Stamps increase in creation order.
pub fn sample_objects(objects: usize, fields: usize) -> Vec<(Address, StampedValue)> {
    let mut stamp = 0u64;
    let mut records = Vec::with_capacity(objects * (fields + 1));
    for o in 0..objects {
        let owner = format!("obj{o}");
        stamp += 1;
        records.push((
            Address::direct(owner.clone(), None),
            StampedValue::new(stamp, "Object"),
        ));
        for f in 0..fields {
            stamp += 1;
            let path = format!("field{f}");
            records.push((
                Address::direct(owner.clone(), Some(&path)),
                StampedValue::new(stamp, format!("value-{o}-{f}").as_str()),
            ));
        }
    }
    records
}

/// Stores [`sample_objects`] into `storage` and returns what was written.
pub async fn seed_objects(
    storage: &Storage,
    objects: usize,
    fields: usize,
) -> Vec<(Address, StampedValue)> {
    let records = sample_objects(objects, fields);
    storage
        .store_many(records.clone())
        .await
        .expect("Failed to seed objects");
    records
}

/// Runs a test with a temporary in-memory storage.
pub async fn with_temp_storage<F, Fut, R>(f: F) -> R
where
    F: FnOnce(TestStorage) -> Fut,
    Fut: std::future::Future<Output = R>,
{
    f(TestStorage::memory().await).await
}
