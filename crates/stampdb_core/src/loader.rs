//! Range loading of objects, reduced namespaces and whole stores.
//!
//! Every loader collects into a local result and only returns it once the
//! scan has ended. A failing scan or a corrupt record discards whatever was
//! collected.

use crate::error::CoreResult;
use crate::progress::Operation;
use crate::storage::Storage;
use stampdb_codec::{Address, Category, Stamp, StampedValue};
use std::collections::{BTreeMap, HashSet};
use tracing::debug;

/// Records keyed by raw store key.
pub type RecordMap = BTreeMap<String, StampedValue>;

/// A record with its raw key, as returned by ordered loaders.
#[derive(Debug, Clone, PartialEq)]
pub struct KeyedRecord {
    /// Raw store key.
    pub key: String,
    /// Decoded record.
    pub value: StampedValue,
}

impl Storage {
    /// Loads the direct records of one object: the root record `owner` and
    /// every record below `owner/`. Siblings sharing a textual prefix such
    /// as `owner10` are never included.
    ///
    /// With `key_paths`, a nested record is kept only if its resolved key
    /// path is in the set. The root record is always kept.
    ///
    /// # Errors
    ///
    /// `InvalidAddress` for a malformed owner, `Scan` or `CorruptRecord`
    /// while reading.
    pub async fn load_object(
        &self,
        owner: &str,
        key_paths: Option<&HashSet<String>>,
    ) -> CoreResult<RecordMap> {
        self.codec.validate(&Address::direct(owner, None))?;
        let partition = self.codec.partition(Category::Direct);
        let bounds = self.codec.object_bounds(owner);
        let mut ticker = self
            .progress
            .ticker(Operation::LoadObject, self.config.progress_interval);
        let mut result = RecordMap::new();

        let mut scan = self.scan(partition, Some(&bounds)).await?;
        while let Some(entry) = scan.next().await? {
            ticker.tick();
            if !self.codec.is_within(Category::Direct, owner, &entry.key) {
                continue;
            }
            if let Some(allowed) = key_paths {
                if entry.key != owner {
                    let resolved = self.resolver.resolve_key_path(&entry.key);
                    if !resolved.is_some_and(|path| allowed.contains(&path)) {
                        continue;
                    }
                }
            }
            let value = self.decode_value(Category::Direct, &entry.key, &entry.value)?;
            result.insert(entry.key, value);
        }
        Ok(result)
    }

    /// Loads every direct record of the store.
    ///
    /// # Errors
    ///
    /// `Scan` or `CorruptRecord`.
    pub async fn load_all(&self) -> CoreResult<RecordMap> {
        let mut result = RecordMap::new();
        self.for_each_direct(Operation::LoadAll, |key, value| {
            result.insert(key, value);
        })
        .await?;
        debug!(records = result.len(), "loaded all direct records");
        Ok(result)
    }

    /// Loads every direct record ordered by ascending stamp, ties broken by
    /// key. This is the order in which records must be replayed into the
    /// model; scans themselves run in key order.
    ///
    /// # Errors
    ///
    /// `Scan` or `CorruptRecord`.
    pub async fn load_all_by_stamp(&self) -> CoreResult<Vec<KeyedRecord>> {
        let mut records = Vec::new();
        self.for_each_direct(Operation::LoadAll, |key, value| {
            records.push(KeyedRecord { key, value });
        })
        .await?;
        // Scan order is key order and the sort is stable.
        records.sort_by_key(|r| r.value.stamp);
        Ok(records)
    }

    /// Loads the records of one reduced namespace: `ns` itself and every
    /// record below `ns/`.
    ///
    /// With `key_paths`, a record is kept only if its path is in the set;
    /// the root record has no path and is then dropped.
    ///
    /// # Errors
    ///
    /// `InvalidAddress`, `Scan` or `CorruptRecord`.
    pub async fn load_reduced_object(
        &self,
        ns: &str,
        key_paths: Option<&HashSet<String>>,
    ) -> CoreResult<RecordMap> {
        self.codec.validate(&Address::reduced(ns, None))?;
        let partition = self.codec.partition(Category::Reduced);
        let bounds = self.codec.reduced_bounds(ns);
        let mut ticker = self
            .progress
            .ticker(Operation::LoadReduced, self.config.progress_interval);
        let mut result = RecordMap::new();

        let mut scan = self.scan(partition, Some(&bounds)).await?;
        while let Some(entry) = scan.next().await? {
            ticker.tick();
            if !self.codec.is_within(Category::Reduced, ns, &entry.key) {
                continue;
            }
            if let Some(allowed) = key_paths {
                let address = self.codec.decode(scan.partition(), &entry.key)?;
                if !address.path().is_some_and(|path| allowed.contains(path)) {
                    continue;
                }
            }
            let value = self.decode_value(Category::Reduced, &entry.key, &entry.value)?;
            result.insert(entry.key, value);
        }
        Ok(result)
    }

    /// Returns the id of every object owning direct records, ordered by the
    /// stamp of its root record. Objects without a root record have stamp 0.
    ///
    /// # Errors
    ///
    /// `Scan` or `CorruptRecord`.
    pub async fn load_object_ids(&self) -> CoreResult<Vec<(String, Stamp)>> {
        let partition = self.codec.partition(Category::Direct);
        let mut ticker = self
            .progress
            .ticker(Operation::LoadObjectIds, self.config.progress_interval);
        let mut ids: BTreeMap<String, Stamp> = BTreeMap::new();

        let mut scan = self.scan(partition, None).await?;
        while let Some(entry) = scan.next().await? {
            ticker.tick();
            if self.codec.classify(partition, &entry.key) != Category::Direct {
                continue;
            }
            let address = self.codec.decode(partition, &entry.key)?;
            if address.path.is_none() {
                let value = self.decode_value(Category::Direct, &entry.key, &entry.value)?;
                ids.insert(address.ns, value.stamp);
            } else {
                ids.entry(address.ns).or_default();
            }
        }

        let mut ids: Vec<_> = ids.into_iter().collect();
        ids.sort_by_key(|(_, stamp)| *stamp);
        Ok(ids)
    }

    async fn for_each_direct<F>(&self, operation: Operation, mut visit: F) -> CoreResult<()>
    where
        F: FnMut(String, StampedValue) + Send,
    {
        let partition = self.codec.partition(Category::Direct);
        let mut ticker = self
            .progress
            .ticker(operation, self.config.progress_interval);

        let mut scan = self.scan(partition, None).await?;
        while let Some(entry) = scan.next().await? {
            ticker.tick();
            if self.codec.classify(partition, &entry.key) != Category::Direct {
                continue;
            }
            let value = self.decode_value(Category::Direct, &entry.key, &entry.value)?;
            visit(entry.key, value);
        }
        Ok(())
    }
}
