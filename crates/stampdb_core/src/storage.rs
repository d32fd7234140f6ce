//! Storage facade.

use crate::config::Config;
use crate::error::{CoreError, CoreResult};
use crate::events::{filter_reflected, ApplySummary, MutationEvent, SourceId};
use crate::lifecycle::PartitionSet;
use crate::progress::{Progress, ProgressFeed};
use crate::resolve::{ExactMatcher, KeyPathResolver, PathResolver, ValueMatcher};
use crate::stats::{StatsSnapshot, StorageStats};
use stampdb_codec::{
    Address, Category, KeyBounds, KeyCodec, Partition, RecordLayout, StampedValue,
};
use stampdb_storage::{EngineFactory, KvCursor, KvEntry, KvStore, ScanRange, StoreFactory};
use std::io;
use std::path::Path;
use std::sync::mpsc::Receiver;
use std::sync::Arc;
use tracing::{debug, trace};

/// The stamped record store of one model.
///
/// `Storage` routes records to partitions by category, reconstructs objects
/// with range scans, searches, and exports. Partitions are opened on first
/// use.
///
/// # Opening
///
/// ```rust,ignore
/// use stampdb_core::{Config, Storage};
/// use stampdb_codec::{Address, StampedValue};
///
/// let storage = Storage::open(Config::new("data/model")).await?;
/// storage.store_raw(&Address::direct("obj1", Some("name")), &StampedValue::new(1u64, "Ada")).await?;
/// let object = storage.load_object("obj1", None).await?;
/// storage.close().await?;
/// ```
pub struct Storage {
    pub(crate) config: Config,
    pub(crate) codec: KeyCodec,
    pub(crate) partitions: PartitionSet,
    pub(crate) stats: StorageStats,
    pub(crate) progress: ProgressFeed,
    pub(crate) source: SourceId,
    pub(crate) resolver: Arc<dyn KeyPathResolver>,
    pub(crate) matcher: Arc<dyn ValueMatcher>,
}

impl Storage {
    /// Opens a storage with the engine selected by `config`.
    ///
    /// # Errors
    ///
    /// Fails if the root directory is missing and `create_if_missing` is
    /// off, or cannot be created.
    pub async fn open(config: Config) -> CoreResult<Self> {
        let factory = EngineFactory::new(config.engine, config.log_options());
        Self::with_factory(config, Arc::new(factory)).await
    }

    /// Opens a storage whose partitions are created by `factory`.
    ///
    /// # Errors
    ///
    /// As [`Storage::open`].
    pub async fn with_factory(config: Config, factory: Arc<dyn StoreFactory>) -> CoreResult<Self> {
        if config.engine == stampdb_storage::EngineKind::Log {
            if config.create_if_missing {
                tokio::fs::create_dir_all(&config.path).await?;
            } else if !tokio::fs::try_exists(&config.path).await? {
                return Err(CoreError::Io(io::Error::new(
                    io::ErrorKind::NotFound,
                    format!("storage root does not exist: {}", config.path.display()),
                )));
            }
        }

        let source = match &config.reflection_tag {
            Some(tag) => SourceId::new(tag.clone()),
            None => SourceId::generate(),
        };
        debug!(
            path = %config.path.display(),
            layout = ?config.layout,
            engine = ?config.engine,
            "opened storage"
        );
        Ok(Self {
            codec: KeyCodec::new(config.layout),
            partitions: PartitionSet::new(
                config.path.clone(),
                factory,
                config.engine == stampdb_storage::EngineKind::Log,
            ),
            stats: StorageStats::new(),
            progress: ProgressFeed::new(),
            source,
            resolver: Arc::new(PathResolver),
            matcher: Arc::new(ExactMatcher),
            config,
        })
    }

    /// Replaces the key-path resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Arc<dyn KeyPathResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// Replaces the value matcher used by searches.
    #[must_use]
    pub fn with_matcher(mut self, matcher: Arc<dyn ValueMatcher>) -> Self {
        self.matcher = matcher;
        self
    }

    /// Returns the configuration.
    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Returns the record layout.
    pub fn layout(&self) -> RecordLayout {
        self.codec.layout()
    }

    /// Returns the storage root.
    pub fn path(&self) -> &Path {
        self.partitions.root()
    }

    /// Returns the tag attached to reflected events.
    pub fn source_id(&self) -> &SourceId {
        &self.source
    }

    /// Returns a snapshot of the operation counters.
    pub fn stats(&self) -> StatsSnapshot {
        self.stats.snapshot()
    }

    /// Subscribes to progress signals of loaders and exports.
    pub fn subscribe_progress(&self) -> Receiver<Progress> {
        self.progress.subscribe()
    }

    /// Returns true if `partition` has been opened.
    pub async fn is_partition_open(&self, partition: Partition) -> bool {
        self.partitions.is_open(partition).await
    }

    /// Closes every opened partition. Untouched partitions stay unopened.
    /// The storage may be used again afterwards; partitions reopen lazily.
    ///
    /// # Errors
    ///
    /// Returns the first close failure after attempting all partitions.
    pub async fn close(&self) -> CoreResult<()> {
        self.partitions.close().await?;
        debug!(path = %self.path().display(), "closed storage");
        Ok(())
    }

    /// Closes the storage and deletes everything under its root. The next
    /// access starts from a fresh empty store at the same path. In-memory
    /// storages drop their stores and never touch the filesystem.
    ///
    /// # Errors
    ///
    /// Fails if a partition cannot be closed or the root cannot be recreated.
    pub async fn clear(&self) -> CoreResult<()> {
        self.partitions.clear().await
    }

    /// Closes the storage, removes its root and releases the handle.
    ///
    /// # Errors
    ///
    /// Fails if a partition cannot be closed or the root cannot be removed.
    pub async fn destroy(self) -> CoreResult<()> {
        self.partitions.destroy().await?;
        debug!(path = %self.path().display(), "dropped storage");
        Ok(())
    }

    /// Persists model mutation events as one atomic write per partition.
    ///
    /// Events tagged with this storage's own [`SourceId`] were produced by
    /// [`Storage::reflect`] and are dropped.
    ///
    /// # Errors
    ///
    /// Fails with `InvalidAddress` before any write if an event address is
    /// malformed, or with `WriteFailure`.
    pub async fn apply_events(&self, events: Vec<MutationEvent>) -> CoreResult<ApplySummary> {
        let (events, skipped) = filter_reflected(events, &self.source);
        if skipped > 0 {
            debug!(skipped, source = %self.source, "dropped reflected events");
        }
        let stored = events.len();
        let records = events.into_iter().map(|e| (e.address, e.value)).collect();
        self.store_many(records).await?;
        Ok(ApplySummary { stored, skipped })
    }

    /// Turns stored records into events for write-back into the model,
    /// tagged so that [`Storage::apply_events`] ignores them.
    pub fn reflect<I>(&self, records: I) -> Vec<MutationEvent>
    where
        I: IntoIterator<Item = (Address, StampedValue)>,
    {
        records
            .into_iter()
            .map(|(address, value)| {
                MutationEvent::new(address, value).with_source(self.source.clone())
            })
            .collect()
    }

    /// Starts a scan of `partition`, optionally bounded.
    pub(crate) async fn scan(
        &self,
        partition: Partition,
        bounds: Option<&KeyBounds>,
    ) -> CoreResult<RecordScan<'_>> {
        let store = self.partitions.get(partition).await?;
        let range = match bounds {
            Some(b) => ScanRange::between(b.gte.clone(), b.lte.clone()),
            None => ScanRange::all(),
        };
        trace!(%partition, ?range, "starting scan");
        self.stats.record_scan();
        let cursor = store
            .scan(range, self.config.read_options())
            .await
            .map_err(|source| self.fail(CoreError::Scan { source }))?;
        Ok(RecordScan {
            storage: self,
            partition,
            cursor,
        })
    }

    /// Counts a failure and passes it through.
    pub(crate) fn fail(&self, err: CoreError) -> CoreError {
        self.stats.record_error();
        err
    }

    /// Decodes a stamped store value of `category`, attributing failures to
    /// `key`.
    pub(crate) fn decode_value(
        &self,
        category: Category,
        key: &str,
        value: &[u8],
    ) -> CoreResult<StampedValue> {
        StampedValue::decode_for(category, value)
            .map_err(|reason| self.fail(CoreError::corrupt_record(key, reason)))
    }
}

impl std::fmt::Debug for Storage {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Storage")
            .field("path", &self.config.path)
            .field("layout", &self.config.layout)
            .field("engine", &self.config.engine)
            .field("source", &self.source)
            .finish_non_exhaustive()
    }
}

/// A running scan over one partition.
pub(crate) struct RecordScan<'a> {
    storage: &'a Storage,
    partition: Partition,
    cursor: Box<dyn KvCursor>,
}

impl RecordScan<'_> {
    pub(crate) fn partition(&self) -> Partition {
        self.partition
    }

    /// Yields the next entry. Store failures become `Scan` errors.
    pub(crate) async fn next(&mut self) -> CoreResult<Option<KvEntry>> {
        match self.cursor.next().await {
            Ok(Some(entry)) => {
                self.storage.stats.record_scanned();
                Ok(Some(entry))
            }
            Ok(None) => Ok(None),
            Err(source) => {
                self.cursor.destroy();
                Err(self.storage.fail(CoreError::Scan { source }))
            }
        }
    }

    /// Stops the scan early.
    pub(crate) fn destroy(&mut self) {
        trace!(partition = %self.partition, "scan destroyed early");
        self.cursor.destroy();
    }
}
