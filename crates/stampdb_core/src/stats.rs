//! Storage statistics.
//!
//! # Usage
//!
//! ```rust,ignore
//! let storage = Storage::open(Config::new("db")).await?;
//! storage.load_all().await?;
//!
//! let stats = storage.stats();
//! println!("Scans: {}", stats.scans);
//! println!("Records scanned: {}", stats.records_scanned);
//! ```

use std::sync::atomic::{AtomicU64, Ordering};

/// Operation counters of one storage.
///
/// All counters are atomic and monotonically increasing.
#[derive(Debug, Default)]
pub struct StorageStats {
    /// Point reads.
    reads: AtomicU64,
    /// Records written, counting each record of a batch.
    writes: AtomicU64,
    /// Point deletes.
    deletes: AtomicU64,
    /// Range scans started.
    scans: AtomicU64,
    /// Records yielded by scans.
    records_scanned: AtomicU64,
    /// Failed operations.
    errors: AtomicU64,
}

impl StorageStats {
    /// Creates a new stats instance.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn record_read(&self) {
        self.reads.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_writes(&self, count: u64) {
        self.writes.fetch_add(count, Ordering::Relaxed);
    }

    pub(crate) fn record_delete(&self) {
        self.deletes.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_scan(&self) {
        self.scans.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_scanned(&self) {
        self.records_scanned.fetch_add(1, Ordering::Relaxed);
    }

    pub(crate) fn record_error(&self) {
        self.errors.fetch_add(1, Ordering::Relaxed);
    }

    /// Returns the number of point reads.
    pub fn reads(&self) -> u64 {
        self.reads.load(Ordering::Relaxed)
    }

    /// Returns the number of records written.
    pub fn writes(&self) -> u64 {
        self.writes.load(Ordering::Relaxed)
    }

    /// Returns the number of deletes.
    pub fn deletes(&self) -> u64 {
        self.deletes.load(Ordering::Relaxed)
    }

    /// Returns the number of scans started.
    pub fn scans(&self) -> u64 {
        self.scans.load(Ordering::Relaxed)
    }

    /// Returns the number of records yielded by scans.
    pub fn records_scanned(&self) -> u64 {
        self.records_scanned.load(Ordering::Relaxed)
    }

    /// Returns the number of failed operations.
    pub fn errors(&self) -> u64 {
        self.errors.load(Ordering::Relaxed)
    }

    /// Returns a snapshot of all counters.
    pub fn snapshot(&self) -> StatsSnapshot {
        StatsSnapshot {
            reads: self.reads(),
            writes: self.writes(),
            deletes: self.deletes(),
            scans: self.scans(),
            records_scanned: self.records_scanned(),
            errors: self.errors(),
        }
    }
}

/// A point-in-time copy of [`StorageStats`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StatsSnapshot {
    /// Point reads.
    pub reads: u64,
    /// Records written.
    pub writes: u64,
    /// Deletes.
    pub deletes: u64,
    /// Scans started.
    pub scans: u64,
    /// Records yielded by scans.
    pub records_scanned: u64,
    /// Failed operations.
    pub errors: u64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_stats_are_zero() {
        let stats = StorageStats::new();
        assert_eq!(stats.snapshot(), StatsSnapshot::default());
    }

    #[test]
    fn record_operations() {
        let stats = StorageStats::new();
        stats.record_read();
        stats.record_writes(3);
        stats.record_scan();
        stats.record_scanned();
        stats.record_scanned();
        stats.record_error();

        let snap = stats.snapshot();
        assert_eq!(snap.reads, 1);
        assert_eq!(snap.writes, 3);
        assert_eq!(snap.scans, 1);
        assert_eq!(snap.records_scanned, 2);
        assert_eq!(snap.errors, 1);
    }

    #[test]
    fn concurrent_updates() {
        use std::sync::Arc;
        use std::thread;

        let stats = Arc::new(StorageStats::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let s = Arc::clone(&stats);
                thread::spawn(move || {
                    for _ in 0..100 {
                        s.record_scanned();
                    }
                })
            })
            .collect();
        for h in handles {
            h.join().unwrap();
        }
        assert_eq!(stats.records_scanned(), 800);
    }
}
