//! Mutation events exchanged with the object-graph model.
//!
//! The model emits a [`MutationEvent`] for every property change. The
//! storage persists those events and, when it loads records back, turns them
//! into events tagged with its own [`SourceId`]. Events carrying that tag are
//! dropped on the way in, which breaks the store → model → store loop.

use stampdb_codec::{Address, StampedValue};
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};

static NEXT_TAG: AtomicU64 = AtomicU64::new(1);

/// Identifies the origin of a mutation event.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct SourceId(String);

impl SourceId {
    /// Creates a source id.
    pub fn new(tag: impl Into<String>) -> Self {
        Self(tag.into())
    }

    /// Generates a tag unique within this process.
    #[must_use]
    pub fn generate() -> Self {
        let n = NEXT_TAG.fetch_add(1, Ordering::Relaxed);
        Self(format!("stampdb-{}-{n}", std::process::id()))
    }

    /// Returns the tag text.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for SourceId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A property change of the model.
#[derive(Debug, Clone, PartialEq)]
pub struct MutationEvent {
    /// Where the value lives.
    pub address: Address,
    /// Stamp and payload.
    pub value: StampedValue,
    /// Origin of the change, `None` for local model edits.
    pub source: Option<SourceId>,
}

impl MutationEvent {
    /// Creates an event without a source.
    pub fn new(address: Address, value: StampedValue) -> Self {
        Self {
            address,
            value,
            source: None,
        }
    }

    /// Sets the source.
    #[must_use]
    pub fn with_source(mut self, source: SourceId) -> Self {
        self.source = Some(source);
        self
    }

    /// Returns true if this event originated from `source`.
    #[must_use]
    pub fn is_from(&self, source: &SourceId) -> bool {
        self.source.as_ref() == Some(source)
    }
}

/// Outcome of [`Storage::apply_events`](crate::Storage::apply_events).
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ApplySummary {
    /// Events persisted.
    pub stored: usize,
    /// Reflected events dropped.
    pub skipped: usize,
}

/// Splits `events` into those to persist and the count of reflected ones.
pub(crate) fn filter_reflected(
    events: Vec<MutationEvent>,
    own: &SourceId,
) -> (Vec<MutationEvent>, usize) {
    let total = events.len();
    let kept: Vec<_> = events.into_iter().filter(|e| !e.is_from(own)).collect();
    let skipped = total - kept.len();
    (kept, skipped)
}
