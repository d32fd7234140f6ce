//! Storage configuration.

use stampdb_codec::RecordLayout;
use stampdb_storage::{EngineKind, LogOptions, ReadOptions};
use std::path::PathBuf;

/// Default number of records between two progress signals.
pub const DEFAULT_PROGRESS_INTERVAL: u64 = 1000;

/// Configuration for opening a [`Storage`](crate::Storage).
///
/// One configuration is shared by every partition the storage opens.
#[derive(Debug, Clone)]
pub struct Config {
    /// Root directory. Partitions live in subdirectories.
    pub path: PathBuf,

    /// Key and partition layout.
    pub layout: RecordLayout,

    /// Store engine backing each partition.
    pub engine: EngineKind,

    /// Whether reads may warm store caches. Off by default so that bulk
    /// scans do not evict hot data.
    pub fill_cache: bool,

    /// Whether to create the root directory when it is missing. Partition
    /// directories under an existing root are always created on demand.
    pub create_if_missing: bool,

    /// Whether to sync the log on every write.
    pub sync_on_write: bool,

    /// Records between two progress signals (0 disables them).
    pub progress_interval: u64,

    /// Tag attached to events this storage writes back into the model.
    /// Generated per storage when unset.
    pub reflection_tag: Option<String>,
}

impl Config {
    /// Creates a configuration rooted at `path` with default values.
    #[must_use]
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            layout: RecordLayout::Shared,
            engine: EngineKind::Log,
            fill_cache: false,
            create_if_missing: true,
            sync_on_write: false,
            progress_interval: DEFAULT_PROGRESS_INTERVAL,
            reflection_tag: None,
        }
    }

    /// Creates a configuration for an ephemeral in-memory storage.
    #[must_use]
    pub fn in_memory() -> Self {
        Self::new(std::env::temp_dir().join("stampdb-memory")).engine(EngineKind::Memory)
    }

    /// Sets the record layout.
    #[must_use]
    pub const fn layout(mut self, layout: RecordLayout) -> Self {
        self.layout = layout;
        self
    }

    /// Sets the store engine.
    #[must_use]
    pub const fn engine(mut self, engine: EngineKind) -> Self {
        self.engine = engine;
        self
    }

    /// Sets whether reads fill store caches.
    #[must_use]
    pub const fn fill_cache(mut self, value: bool) -> Self {
        self.fill_cache = value;
        self
    }

    /// Sets whether to create missing directories.
    #[must_use]
    pub const fn create_if_missing(mut self, value: bool) -> Self {
        self.create_if_missing = value;
        self
    }

    /// Sets whether to sync on every write.
    #[must_use]
    pub const fn sync_on_write(mut self, value: bool) -> Self {
        self.sync_on_write = value;
        self
    }

    /// Sets the progress interval.
    #[must_use]
    pub const fn progress_interval(mut self, records: u64) -> Self {
        self.progress_interval = records;
        self
    }

    /// Sets the reflection tag.
    #[must_use]
    pub fn reflection_tag(mut self, tag: impl Into<String>) -> Self {
        self.reflection_tag = Some(tag.into());
        self
    }

    pub(crate) const fn log_options(&self) -> LogOptions {
        // The root check happens when the storage opens.
        LogOptions {
            create_if_missing: true,
            sync_on_write: self.sync_on_write,
        }
    }

    pub(crate) const fn read_options(&self) -> ReadOptions {
        ReadOptions {
            fill_cache: self.fill_cache,
        }
    }
}
