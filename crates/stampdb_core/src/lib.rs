//! # stampdb Core
//!
//! Persistence layer mapping an object-graph model onto an ordered
//! key-value store.
//!
//! This crate provides:
//! - Category routing of stamped records to partitions ([`Storage::get_raw`],
//!   [`Storage::store_raw`], [`Storage::store_many`])
//! - Range loading of objects, reduced namespaces and whole stores
//! - Streaming search with early termination
//! - Export into another storage, including migration between layouts
//! - Lazy partition lifecycle with close, clear and destroy
//! - A write-back filter for model mutation events
//!
//! Key and value encoding lives in `stampdb_codec`; store engines live in
//! `stampdb_storage`.

#![deny(unsafe_code)]
#![warn(missing_docs)]

mod config;
mod error;
mod events;
mod export;
mod lifecycle;
mod loader;
mod progress;
mod resolve;
mod router;
mod search;
mod stats;
mod storage;

pub use config::{Config, DEFAULT_PROGRESS_INTERVAL};
pub use error::{CoreError, CoreResult, ErrorKind};
pub use events::{ApplySummary, MutationEvent, SourceId};
pub use export::ExportSummary;
pub use loader::{KeyedRecord, RecordMap};
pub use progress::{Operation, Progress, ProgressFeed};
pub use resolve::{ExactMatcher, KeyPathResolver, PathResolver, ValueMatcher};
pub use search::{KeyPathFilter, SearchOutcome};
pub use stats::{StatsSnapshot, StorageStats};
pub use storage::Storage;

pub use stampdb_codec::{Address, Category, Payload, RecordLayout, Stamp, StampedValue};
pub use stampdb_storage::EngineKind;
