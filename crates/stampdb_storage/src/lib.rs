//! # stampdb Storage
//!
//! Ordered key-value store engines for stampdb.
//!
//! This crate provides the lowest-level storage abstraction for stampdb.
//! Stores are **opaque ordered maps** from text keys to byte values - they
//! do not interpret stamps, categories or payloads.
//!
//! ## Design Principles
//!
//! - Stores offer point get/put/delete, atomic batches and range cursors
//! - Scans yield entries in key order and can be destroyed early
//! - Must be `Send + Sync` for shared access
//! - The record layer owns all key and value interpretation
//!
//! ## Available Engines
//!
//! - [`MemoryStore`] - For testing and ephemeral storage
//! - [`LogStore`] - For persistent storage using an append-only log
//!
//! ## Example
//!
//! ```rust,ignore
//! use stampdb_storage::{KvStore, MemoryStore, ReadOptions, ScanRange};
//!
//! let store = MemoryStore::new();
//! store.put("obj1".into(), "1.value".into()).await?;
//! let mut cursor = store.scan(ScanRange::between("obj1", "obj1/\u{10FFFF}"), ReadOptions::skip_cache()).await?;
//! while let Some(entry) = cursor.next().await? {
//!     println!("{} = {:?}", entry.key, entry.value);
//! }
//! ```

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod error;
mod factory;
mod log;
mod memory;
mod memtable;
mod store;

pub use error::{StorageError, StorageResult};
pub use factory::{EngineFactory, EngineKind, StoreFactory};
pub use log::{LogOptions, LogStore};
pub use memory::MemoryStore;
pub use store::{BatchOp, KvCursor, KvEntry, KvStore, ReadOptions, ScanRange};
