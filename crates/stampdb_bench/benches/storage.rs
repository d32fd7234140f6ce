//! Storage layer benchmarks: routing, loading and search.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use stampdb_bench::generate_objects;
use stampdb_codec::{Address, RecordLayout};
use stampdb_core::{Config, KeyPathFilter, Storage};
use tempfile::TempDir;
use tokio::runtime::Runtime;

fn populated(rt: &Runtime, layout: RecordLayout, objects: usize) -> Storage {
    rt.block_on(async {
        let storage = Storage::open(Config::in_memory().layout(layout))
            .await
            .unwrap();
        storage
            .store_many(generate_objects(objects, 8, 64))
            .await
            .unwrap();
        storage
    })
}

/// Benchmark batched writes through category routing.
fn bench_store_many(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("store_many");
    group.sample_size(20);

    for objects in [10usize, 100].iter() {
        let records = generate_objects(*objects, 8, 64);
        group.throughput(Throughput::Elements(records.len() as u64));
        group.bench_with_input(BenchmarkId::from_parameter(objects), &records, |b, records| {
            let temp_dir = TempDir::new().unwrap();
            let storage = rt
                .block_on(Storage::open(Config::new(temp_dir.path().join("store"))))
                .unwrap();
            b.to_async(&rt).iter(|| {
                let records = records.clone();
                let storage = &storage;
                async move { storage.store_many(records).await.unwrap() }
            });
        });
    }

    group.finish();
}

/// Benchmark point reads.
fn bench_get_raw(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let storage = populated(&rt, RecordLayout::Shared, 1000);
    let storage = &storage;
    let address = &Address::direct("obj000500", Some("field3"));

    c.bench_function("get_raw", |b| {
        b.to_async(&rt).iter(|| async move {
            black_box(storage.get_raw(black_box(address)).await.unwrap());
        });
    });
}

/// Benchmark loading a single object out of a large store.
fn bench_load_object(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("load_object");

    for layout in [RecordLayout::Shared, RecordLayout::Partitioned] {
        let storage = &populated(&rt, layout, 1000);
        group.bench_function(format!("{layout:?}"), |b| {
            b.to_async(&rt).iter(|| async move {
                black_box(storage.load_object("obj000500", None).await.unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark full loads.
fn bench_load_all(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let mut group = c.benchmark_group("load_all");
    group.sample_size(20);

    for objects in [100usize, 1000].iter() {
        let storage = &populated(&rt, RecordLayout::Shared, *objects);
        group.throughput(Throughput::Elements((*objects * 9) as u64));
        group.bench_function(BenchmarkId::from_parameter(objects), |b| {
            b.to_async(&rt).iter(|| async move {
                black_box(storage.load_all().await.unwrap());
            });
        });
    }

    group.finish();
}

/// Benchmark a search that never matches, forcing a full scan.
fn bench_search(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let storage = &populated(&rt, RecordLayout::Shared, 1000);

    c.bench_function("search_full_scan", |b| {
        b.to_async(&rt).iter(|| async move {
            let outcome = storage
                .search(KeyPathFilter::from("field3"), Some("missing"), |_, _| false)
                .await
                .unwrap();
            black_box(outcome);
        });
    });
}

criterion_group!(
    benches,
    bench_store_many,
    bench_get_raw,
    bench_load_object,
    bench_load_all,
    bench_search,
);

criterion_main!(benches);
