//! Store construction.

use crate::error::StorageResult;
use crate::log::{LogOptions, LogStore};
use crate::memory::MemoryStore;
use crate::store::KvStore;
use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

/// Which engine backs newly opened stores.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum EngineKind {
    /// Persistent [`LogStore`].
    #[default]
    Log,
    /// Ephemeral [`MemoryStore`]. The path is ignored and every open
    /// yields an empty store.
    Memory,
}

/// Opens stores on behalf of the record layer.
///
/// The record layer creates one store per partition directory, lazily and at
/// most once per handle lifetime. Implement this trait to plug in another
/// engine or to wrap stores (fault injection, metrics).
#[async_trait]
pub trait StoreFactory: Send + Sync {
    /// Opens (creating if needed) the store living at `path`.
    async fn open(&self, path: &Path) -> StorageResult<Arc<dyn KvStore>>;
}

/// The default factory, dispatching on [`EngineKind`].
#[derive(Debug, Clone, Copy, Default)]
pub struct EngineFactory {
    kind: EngineKind,
    options: LogOptions,
}

impl EngineFactory {
    /// Creates a factory for `kind` with the given log options.
    #[must_use]
    pub const fn new(kind: EngineKind, options: LogOptions) -> Self {
        Self { kind, options }
    }

    /// Returns the engine this factory builds.
    #[must_use]
    pub const fn kind(&self) -> EngineKind {
        self.kind
    }
}

#[async_trait]
impl StoreFactory for EngineFactory {
    async fn open(&self, path: &Path) -> StorageResult<Arc<dyn KvStore>> {
        match self.kind {
            EngineKind::Memory => Ok(Arc::new(MemoryStore::new())),
            EngineKind::Log => Ok(Arc::new(LogStore::open(path, self.options).await?)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::ReadOptions;
    use bytes::Bytes;
    use tempfile::tempdir;

    #[tokio::test]
    async fn log_factory_creates_directory() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("computed");
        let factory = EngineFactory::new(EngineKind::Log, LogOptions::default());

        let store = factory.open(&path).await.unwrap();
        store.put("k".into(), Bytes::from("1.v")).await.unwrap();
        assert!(path.join("data.log").exists());
    }

    #[tokio::test]
    async fn memory_factory_ignores_path() {
        let factory = EngineFactory::new(EngineKind::Memory, LogOptions::default());
        let store = factory.open(Path::new("/nonexistent/anywhere")).await.unwrap();
        assert!(store.get("k", ReadOptions::default()).await.unwrap().is_none());
    }
}
