//! Cross-crate integration test helpers.
//!
//! [`IntegrationHarness`] mirrors every write into an in-process model so a
//! test can check that the storage returns exactly what was last written.

use crate::fixtures::TestStorage;
use stampdb_codec::{Address, Category, RecordLayout, StampedValue};
use std::collections::HashMap;

/// A test harness for integration testing.
pub struct IntegrationHarness {
    /// The storage under test.
    pub storage: TestStorage,
    /// Last value written per address.
    records: HashMap<Address, StampedValue>,
}

impl IntegrationHarness {
    /// Creates a harness over an in-memory storage.
    pub async fn new() -> Self {
        Self::over(TestStorage::memory().await)
    }

    /// Creates a harness over a log-backed storage with `layout`.
    pub async fn file(layout: RecordLayout) -> Self {
        Self::over(TestStorage::file_with(layout).await)
    }

    /// Creates a harness over an existing fixture.
    pub fn over(storage: TestStorage) -> Self {
        Self {
            storage,
            records: HashMap::new(),
        }
    }

    /// Stores a record and tracks it.
    pub async fn store(&mut self, address: Address, value: StampedValue) {
        self.storage
            .store_raw(&address, &value)
            .await
            .expect("Failed to store record");
        self.records.insert(address, value);
    }

    /// Stores a batch and tracks every record in order.
    pub async fn store_many(&mut self, records: Vec<(Address, StampedValue)>) {
        self.storage
            .store_many(records.clone())
            .await
            .expect("Failed to store batch");
        self.records.extend(records);
    }

    /// Deletes a reduced record and stops tracking it.
    pub async fn delete_reduced(&mut self, ns: &str, path: Option<&str>) {
        self.storage
            .delete_reduced(ns, path)
            .await
            .expect("Failed to delete reduced record");
        self.records.remove(&Address::reduced(ns, path));
    }

    /// Reads a record and checks it against the tracked value.
    pub async fn get_and_verify(&self, address: &Address) -> Option<StampedValue> {
        let actual = self
            .storage
            .get_raw(address)
            .await
            .expect("Failed to read record");
        assert_eq!(
            actual.as_ref(),
            self.records.get(address),
            "Record mismatch for {address}"
        );
        actual
    }

    /// Checks every tracked record, then checks that the direct records
    /// returned by `load_all` are exactly the tracked direct records.
    pub async fn verify_all(&self) {
        for (address, expected) in &self.records {
            let actual = self
                .storage
                .get_raw(address)
                .await
                .expect("Failed to read record");
            assert_eq!(
                actual.as_ref(),
                Some(expected),
                "Record mismatch for {address}"
            );
        }

        let loaded = self.storage.load_all().await.expect("Failed to load all");
        let direct = self
            .records
            .keys()
            .filter(|a| a.category == Category::Direct)
            .count();
        assert_eq!(loaded.len(), direct, "load_all returned a different set");
    }

    /// Returns the count of tracked records.
    pub fn tracked_count(&self) -> usize {
        self.records.len()
    }
}
