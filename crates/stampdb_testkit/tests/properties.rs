//! End-to-end properties of the storage layer.

use proptest::prelude::*;
use stampdb_codec::{Address, RecordLayout, StampedValue};
use stampdb_core::{ErrorKind, KeyPathFilter, MutationEvent, SourceId};
use stampdb_storage::EngineKind;
use stampdb_testkit::prelude::*;
use std::sync::Arc;

#[tokio::test]
async fn later_write_replaces_earlier() {
    init_tracing();
    let storage = TestStorage::file().await;
    let address = Address::computed("obj1", "size");

    storage
        .store_raw(&address, &StampedValue::new(5u64, "old"))
        .await
        .unwrap();
    // A lower stamp still wins: ordering is the caller's concern.
    storage
        .store_raw(&address, &StampedValue::new(3u64, "new"))
        .await
        .unwrap();

    let record = storage.get_raw(&address).await.unwrap().unwrap();
    assert_eq!(record, StampedValue::new(3u64, "new"));
}

#[tokio::test]
async fn object_load_excludes_prefix_siblings() {
    for layout in [RecordLayout::Shared, RecordLayout::Partitioned] {
        let storage = TestStorage::memory_with(layout).await;
        storage
            .store_many(vec![
                (Address::direct("obj1", None), StampedValue::new(1u64, "Object")),
                (
                    Address::direct("obj1", Some("a")),
                    StampedValue::new(2u64, "x"),
                ),
                (Address::direct("obj10", None), StampedValue::new(3u64, "Object")),
                (
                    Address::direct("obj10", Some("a")),
                    StampedValue::new(4u64, "y"),
                ),
                (Address::direct("obj1.x", None), StampedValue::new(5u64, "Object")),
            ])
            .await
            .unwrap();

        let loaded = storage.load_object("obj1", None).await.unwrap();
        let keys: Vec<_> = loaded.keys().cloned().collect();
        assert_eq!(keys, vec!["obj1".to_string(), "obj1/a".to_string()]);
    }
}

#[tokio::test]
async fn search_stops_on_first_match() {
    let faults = Faults::new();
    let factory = Arc::new(FaultyFactory::new(EngineKind::Memory, Arc::clone(&faults)));
    let storage = TestStorage::with_factory(RecordLayout::Shared, factory).await;
    seed_objects(&storage, 5, 2).await;
    let before = faults.entries_yielded();

    let mut seen = Vec::new();
    let outcome = storage
        .search(KeyPathFilter::Any, None, |key, _| {
            seen.push(key.to_owned());
            true
        })
        .await
        .unwrap();

    assert_eq!(outcome.visited, 1);
    assert!(outcome.stopped_early);
    assert_eq!(seen, vec!["obj0".to_string()]);
    assert_eq!(faults.entries_yielded() - before, 1);
}

#[tokio::test]
async fn export_migrates_partitioned_to_shared() {
    let source = TestStorage::file_with(RecordLayout::Partitioned).await;
    let records = vec![
        (Address::direct("obj1", None), StampedValue::new(1u64, "Object")),
        (
            Address::direct("obj1", Some("tags")),
            StampedValue::new(2u64, "[a, 1"),
        ),
        (
            Address::computed("obj1", "size"),
            StampedValue::new(3u64, "2"),
        ),
        (
            Address::reduced("totals", Some("sum")),
            StampedValue::new(4u64, "9"),
        ),
    ];
    source.store_many(records.clone()).await.unwrap();
    source.store_custom("schema", "v3").await.unwrap();

    let destination = TestStorage::file_with(RecordLayout::Shared).await;
    let summary = source.export_all(&destination).await.unwrap();

    assert_eq!(summary.direct, 2);
    assert_eq!(summary.computed, 1);
    assert_eq!(summary.reduced, 1);
    assert_eq!(summary.custom, 1);
    for (address, value) in &records {
        let copied = destination.get_raw(address).await.unwrap();
        assert_eq!(copied.as_ref(), Some(value), "mismatch for {address}");
    }
    let schema = destination.get_custom("schema").await.unwrap().unwrap();
    assert_eq!(&schema[..], b"v3");
}

#[tokio::test]
async fn export_larger_than_write_window() {
    let source = TestStorage::memory().await;
    seed_objects(&source, 400, 3).await;
    let destination = TestStorage::file().await;

    let summary = source.export_all(&destination).await.unwrap();
    assert_eq!(summary.direct, 1600);
    assert_eq!(
        destination.load_all().await.unwrap(),
        source.load_all().await.unwrap()
    );
}

#[tokio::test]
async fn export_fails_on_destination_write_failure() {
    let source = TestStorage::memory().await;
    seed_objects(&source, 3, 1).await;
    let faults = Faults::new();
    let factory = Arc::new(FaultyFactory::new(EngineKind::Memory, Arc::clone(&faults)));
    let destination = TestStorage::with_factory(RecordLayout::Shared, factory).await;

    faults.fail_writes(true);
    let err = source.export_all(&destination).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WriteFailure);
}

#[tokio::test]
async fn export_stops_when_source_scan_fails() {
    let faults = Faults::new();
    let factory = Arc::new(FaultyFactory::new(EngineKind::Memory, Arc::clone(&faults)));
    let source = TestStorage::with_factory(RecordLayout::Shared, factory).await;
    seed_objects(&source, 4, 1).await;
    let destination = TestStorage::memory().await;

    faults.fail_scans_after(5);
    let err = source.export_all(&destination).await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ScanError);
}

#[tokio::test]
async fn clear_resets_to_empty_and_stays_usable() {
    let storage = TestStorage::file().await;
    seed_objects(&storage, 3, 1).await;
    assert_eq!(storage.load_all().await.unwrap().len(), 6);

    storage.clear().await.unwrap();
    assert!(storage.load_all().await.unwrap().is_empty());

    let address = Address::direct("fresh", None);
    storage
        .store_raw(&address, &StampedValue::new(1u64, "Object"))
        .await
        .unwrap();
    assert!(storage.get_raw(&address).await.unwrap().is_some());
}

#[tokio::test]
async fn scan_failure_rejects_whole_load() {
    let faults = Faults::new();
    let factory = Arc::new(FaultyFactory::new(EngineKind::Log, Arc::clone(&faults)));
    let storage = TestStorage::with_factory(RecordLayout::Shared, factory).await;
    seed_objects(&storage, 4, 1).await;

    faults.fail_scans_after(3);
    let err = storage.load_all().await.unwrap_err();
    assert_eq!(err.kind(), ErrorKind::ScanError);
    assert_eq!(faults.entries_yielded(), 3);
    assert!(storage.stats().errors >= 1);

    faults.reset();
    assert_eq!(storage.load_all().await.unwrap().len(), 8);
}

#[tokio::test]
async fn write_failure_names_the_key() {
    let faults = Faults::new();
    let factory = Arc::new(FaultyFactory::new(EngineKind::Memory, Arc::clone(&faults)));
    let storage = TestStorage::with_factory(RecordLayout::Shared, factory).await;

    faults.fail_writes(true);
    let err = storage
        .store_raw(
            &Address::reduced("totals", Some("sum")),
            &StampedValue::new(1u64, "1"),
        )
        .await
        .unwrap_err();
    assert_eq!(err.kind(), ErrorKind::WriteFailure);
    assert_eq!(err.key(), Some("_totals/sum"));
}

#[tokio::test]
async fn reflected_events_are_not_written_back() {
    let storage = TestStorage::memory().await;
    let loaded = vec![(
        Address::direct("obj1", Some("name")),
        StampedValue::new(1u64, "from-store"),
    )];

    let mut events = storage.reflect(loaded);
    events.push(
        MutationEvent::new(
            Address::direct("obj2", Some("name")),
            StampedValue::new(2u64, "from-peer"),
        )
        .with_source(SourceId::new("peer")),
    );

    let summary = storage.apply_events(events).await.unwrap();
    assert_eq!(summary.stored, 1);
    assert_eq!(summary.skipped, 1);
    assert!(storage
        .get_raw(&Address::direct("obj1", Some("name")))
        .await
        .unwrap()
        .is_none());
    assert!(storage
        .get_raw(&Address::direct("obj2", Some("name")))
        .await
        .unwrap()
        .is_some());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(32))]

    #[test]
    fn stored_records_read_back(records in records_strategy(24)) {
        let rt = tokio::runtime::Runtime::new().unwrap();
        rt.block_on(async {
            for layout in [RecordLayout::Shared, RecordLayout::Partitioned] {
                let mut harness =
                    IntegrationHarness::over(TestStorage::memory_with(layout).await);
                harness.store_many(records.clone()).await;
                harness.verify_all().await;
            }
        });
    }
}
