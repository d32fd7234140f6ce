//! Lazily opened partition handles.

use crate::error::CoreResult;
use stampdb_codec::Partition;
use stampdb_storage::{KvStore, StoreFactory};
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::Mutex;
use tracing::{debug, warn};

const PARTITION_COUNT: usize = 5;

type Slot = Mutex<Option<Arc<dyn KvStore>>>;

/// The partition stores of one storage.
///
/// Each partition is opened on first use and kept until [`close`]. Closing
/// only touches partitions that were opened.
///
/// [`close`]: PartitionSet::close
pub(crate) struct PartitionSet {
    root: PathBuf,
    factory: Arc<dyn StoreFactory>,
    /// Whether partitions live under `root`. Memory engines never touch it.
    on_disk: bool,
    slots: [Slot; PARTITION_COUNT],
}

const fn slot_index(partition: Partition) -> usize {
    match partition {
        Partition::Records => 0,
        Partition::Direct => 1,
        Partition::Computed => 2,
        Partition::Reduced => 3,
        Partition::Custom => 4,
    }
}

impl PartitionSet {
    pub(crate) fn new(root: PathBuf, factory: Arc<dyn StoreFactory>, on_disk: bool) -> Self {
        Self {
            root,
            factory,
            on_disk,
            slots: Default::default(),
        }
    }

    pub(crate) fn root(&self) -> &Path {
        &self.root
    }

    /// Returns the store for `partition`, opening it if needed.
    pub(crate) async fn get(&self, partition: Partition) -> CoreResult<Arc<dyn KvStore>> {
        let mut slot = self.slots[slot_index(partition)].lock().await;
        if let Some(store) = slot.as_ref() {
            return Ok(Arc::clone(store));
        }
        let path = self.root.join(partition.dir_name());
        debug!(%partition, path = %path.display(), "opening partition");
        let store = self.factory.open(&path).await?;
        *slot = Some(Arc::clone(&store));
        Ok(store)
    }

    /// Returns true if `partition` is currently open.
    pub(crate) async fn is_open(&self, partition: Partition) -> bool {
        self.slots[slot_index(partition)].lock().await.is_some()
    }

    /// Closes every opened partition and resets its slot.
    ///
    /// All partitions are closed even if one fails; the first error is
    /// returned.
    pub(crate) async fn close(&self) -> CoreResult<()> {
        let mut first_error = None;
        for slot in &self.slots {
            let Some(store) = slot.lock().await.take() else {
                continue;
            };
            if let Err(err) = store.close().await {
                warn!(error = %err, "failed to close partition");
                first_error.get_or_insert(err);
            }
        }
        match first_error {
            Some(err) => Err(err.into()),
            None => Ok(()),
        }
    }

    /// Closes all partitions and empties the storage root.
    ///
    /// The root is recreated so that partitions can be reopened even when
    /// the storage was opened without `create_if_missing`. Memory-backed
    /// sets only drop their stores.
    pub(crate) async fn clear(&self) -> CoreResult<()> {
        self.close().await?;
        if !self.on_disk {
            return Ok(());
        }
        self.remove_root().await?;
        tokio::fs::create_dir_all(&self.root).await?;
        debug!(path = %self.root.display(), "cleared storage root");
        Ok(())
    }

    /// Closes all partitions and removes the storage root for good.
    pub(crate) async fn destroy(&self) -> CoreResult<()> {
        self.close().await?;
        if self.on_disk {
            self.remove_root().await?;
            debug!(path = %self.root.display(), "removed storage root");
        }
        Ok(())
    }

    async fn remove_root(&self) -> CoreResult<()> {
        match tokio::fs::remove_dir_all(&self.root).await {
            Ok(()) => Ok(()),
            Err(err) if err.kind() == io::ErrorKind::NotFound => Ok(()),
            Err(err) => Err(err.into()),
        }
    }
}
