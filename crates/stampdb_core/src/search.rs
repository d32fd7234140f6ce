//! Streaming predicate search with early termination.
//!
//! Searches hand each matching record to a predicate as it is read. When the
//! predicate returns `true` the cursor is destroyed and nothing further is
//! read, so existence checks stop at the first hit. If the scan fails
//! midway, records already handed to the predicate stay observed.

use crate::error::CoreResult;
use crate::storage::Storage;
use stampdb_codec::{Category, StampedValue};

/// Restricts a direct search by resolved key path.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum KeyPathFilter {
    /// Every direct record.
    #[default]
    Any,
    /// Only object root records (no resolvable key path).
    Unresolved,
    /// Only records resolving to this key path.
    Is(String),
}

impl KeyPathFilter {
    fn admits(&self, resolved: Option<&str>) -> bool {
        match self {
            KeyPathFilter::Any => true,
            KeyPathFilter::Unresolved => resolved.is_none(),
            KeyPathFilter::Is(path) => resolved == Some(path.as_str()),
        }
    }
}

impl From<&str> for KeyPathFilter {
    fn from(path: &str) -> Self {
        KeyPathFilter::Is(path.to_owned())
    }
}

/// How a search ended.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct SearchOutcome {
    /// Records handed to the predicate.
    pub visited: u64,
    /// Whether the predicate stopped the scan.
    pub stopped_early: bool,
}

impl Storage {
    /// Searches direct records.
    ///
    /// `predicate` receives the raw key and the decoded record of every
    /// record passing `key_path` and `value`. Returning `true` stops the
    /// search.
    ///
    /// # Errors
    ///
    /// `Scan` or `CorruptRecord`. Predicate calls made before the error are
    /// not undone.
    pub async fn search<F>(
        &self,
        key_path: KeyPathFilter,
        value: Option<&str>,
        mut predicate: F,
    ) -> CoreResult<SearchOutcome>
    where
        F: FnMut(&str, &StampedValue) -> bool + Send,
    {
        let partition = self.codec.partition(Category::Direct);
        let mut outcome = SearchOutcome::default();

        let mut scan = self.scan(partition, None).await?;
        while let Some(entry) = scan.next().await? {
            if self.codec.classify(partition, &entry.key) != Category::Direct {
                continue;
            }
            let resolved = self.resolver.resolve_key_path(&entry.key);
            if !key_path.admits(resolved.as_deref()) {
                continue;
            }
            let record = self.decode_value(Category::Direct, &entry.key, &entry.value)?;
            if let Some(expected) = value {
                let address = self.codec.decode(partition, &entry.key)?;
                if !self.matcher.matches_direct(
                    &address.ns,
                    address.path(),
                    &record.payload,
                    expected,
                ) {
                    continue;
                }
            }
            outcome.visited += 1;
            if predicate(&entry.key, &record) {
                scan.destroy();
                outcome.stopped_early = true;
                break;
            }
        }
        Ok(outcome)
    }

    /// Searches computed records, optionally restricted to one computed
    /// property.
    ///
    /// With `key_path` the scan covers only that property's contiguous key
    /// range. `predicate` receives the owning object id. Returning `true`
    /// stops the search.
    ///
    /// # Errors
    ///
    /// `Scan` or `CorruptRecord`.
    pub async fn search_computed<F>(
        &self,
        key_path: Option<&str>,
        value: Option<&str>,
        mut predicate: F,
    ) -> CoreResult<SearchOutcome>
    where
        F: FnMut(&str, &StampedValue) -> bool + Send,
    {
        let partition = self.codec.partition(Category::Computed);
        let bounds = self.codec.computed_bounds(key_path);
        let mut outcome = SearchOutcome::default();

        let mut scan = self.scan(partition, bounds.as_ref()).await?;
        while let Some(entry) = scan.next().await? {
            if self.codec.classify(partition, &entry.key) != Category::Computed {
                continue;
            }
            let address = self.codec.decode(partition, &entry.key)?;
            let record = self.decode_value(Category::Computed, &entry.key, &entry.value)?;
            if let Some(expected) = value {
                if !self.matcher.matches_computed(&record.payload, expected) {
                    continue;
                }
            }
            outcome.visited += 1;
            if predicate(&address.ns, &record) {
                scan.destroy();
                outcome.stopped_early = true;
                break;
            }
        }
        Ok(outcome)
    }
}
