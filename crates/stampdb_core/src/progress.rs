//! Progress signals for long-running scans.
//!
//! Loaders and the export pipeline emit a [`Progress`] every
//! `progress_interval` records read, so callers can report liveness without
//! waiting for the final result.
//!
//! ```rust,ignore
//! let progress = storage.subscribe_progress();
//! std::thread::spawn(move || {
//!     while let Ok(p) = progress.recv() {
//!         println!("{:?}: {} records", p.operation, p.processed);
//!     }
//! });
//! storage.export_all(&destination).await?;
//! ```

use parking_lot::RwLock;
use std::sync::mpsc::{self, Receiver, Sender};

/// Operation reporting progress.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operation {
    /// `load_object`.
    LoadObject,
    /// `load_all` and `load_all_by_stamp`.
    LoadAll,
    /// `load_reduced_object`.
    LoadReduced,
    /// `load_object_ids`.
    LoadObjectIds,
    /// `export_all`.
    Export,
}

/// A liveness signal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Progress {
    /// Operation in flight.
    pub operation: Operation,
    /// Records read so far by that operation.
    pub processed: u64,
}

/// Distributes progress signals to subscribers.
#[derive(Debug, Default)]
pub struct ProgressFeed {
    subscribers: RwLock<Vec<Sender<Progress>>>,
}

impl ProgressFeed {
    /// Creates a feed without subscribers.
    pub fn new() -> Self {
        Self::default()
    }

    /// Subscribes to future signals.
    pub fn subscribe(&self) -> Receiver<Progress> {
        let (tx, rx) = mpsc::channel();
        self.subscribers.write().push(tx);
        rx
    }

    /// Sends `progress` to every live subscriber, dropping disconnected ones.
    pub fn emit(&self, progress: Progress) {
        let mut subscribers = self.subscribers.write();
        subscribers.retain(|tx| tx.send(progress).is_ok());
    }

    /// Returns the number of live subscribers.
    pub fn subscriber_count(&self) -> usize {
        self.subscribers.read().len()
    }

    pub(crate) fn ticker(&self, operation: Operation, interval: u64) -> ProgressTicker<'_> {
        ProgressTicker {
            feed: self,
            operation,
            interval,
            processed: 0,
        }
    }
}

/// Counts records for one operation and emits every `interval` records.
pub(crate) struct ProgressTicker<'a> {
    feed: &'a ProgressFeed,
    operation: Operation,
    interval: u64,
    processed: u64,
}

impl ProgressTicker<'_> {
    pub(crate) fn tick(&mut self) {
        self.processed += 1;
        if self.interval != 0 && self.processed % self.interval == 0 {
            self.feed.emit(Progress {
                operation: self.operation,
                processed: self.processed,
            });
        }
    }

    pub(crate) fn processed(&self) -> u64 {
        self.processed
    }
}
