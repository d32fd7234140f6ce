//! Store engine benchmarks.

use bytes::Bytes;
use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use stampdb_bench::payload;
use stampdb_storage::{
    BatchOp, KvStore, LogOptions, LogStore, MemoryStore, ReadOptions, ScanRange,
};
use tempfile::TempDir;
use tokio::runtime::Runtime;

fn runtime() -> Runtime {
    Runtime::new().unwrap()
}

/// Benchmark single puts on both engines.
fn bench_put(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("put");

    for size in [64, 1024].iter() {
        let value = Bytes::from(payload(*size));
        group.throughput(Throughput::Bytes(*size as u64));

        group.bench_with_input(BenchmarkId::new("memory", size), &value, |b, value| {
            let store = MemoryStore::new();
            let mut n = 0u64;
            b.to_async(&rt).iter(|| {
                n += 1;
                let key = format!("obj{n:08}");
                let value = value.clone();
                let store = &store;
                async move { store.put(key, value).await.unwrap() }
            });
        });

        group.bench_with_input(BenchmarkId::new("log", size), &value, |b, value| {
            let temp_dir = TempDir::new().unwrap();
            let store = rt
                .block_on(LogStore::open(temp_dir.path(), LogOptions::default()))
                .unwrap();
            let mut n = 0u64;
            b.to_async(&rt).iter(|| {
                n += 1;
                let key = format!("obj{n:08}");
                let value = value.clone();
                let store = &store;
                async move { store.put(key, value).await.unwrap() }
            });
        });
    }

    group.finish();
}

/// Benchmark batched writes, the path `store_many` takes.
fn bench_batch(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("batch");
    group.sample_size(20);

    for count in [16usize, 256].iter() {
        group.throughput(Throughput::Elements(*count as u64));
        group.bench_with_input(BenchmarkId::new("log", count), count, |b, &count| {
            let temp_dir = TempDir::new().unwrap();
            let store = rt
                .block_on(LogStore::open(temp_dir.path(), LogOptions::default()))
                .unwrap();
            let value = payload(128);
            b.to_async(&rt).iter(|| {
                let ops = (0..count)
                    .map(|i| BatchOp::put(format!("obj{i:08}"), value.clone()))
                    .collect();
                let store = &store;
                async move { store.batch(ops).await.unwrap() }
            });
        });
    }

    group.finish();
}

/// Benchmark range scans over a populated memory store.
fn bench_scan(c: &mut Criterion) {
    let rt = runtime();
    let mut group = c.benchmark_group("scan");

    let store = MemoryStore::new();
    rt.block_on(async {
        let ops = (0..10_000)
            .map(|i| BatchOp::put(format!("obj{i:08}"), payload(64)))
            .collect();
        store.batch(ops).await.unwrap();
    });

    for width in [10usize, 1000].iter() {
        group.throughput(Throughput::Elements(*width as u64));
        group.bench_with_input(BenchmarkId::from_parameter(width), width, |b, &width| {
            let range = ScanRange::between("obj00005000", format!("obj{:08}", 5000 + width - 1));
            b.to_async(&rt).iter(|| {
                let range = range.clone();
                let store = &store;
                async move {
                    let mut cursor = store.scan(range, ReadOptions::default()).await.unwrap();
                    let mut seen = 0;
                    while let Some(entry) = cursor.next().await.unwrap() {
                        black_box(entry);
                        seen += 1;
                    }
                    black_box(seen)
                }
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_put, bench_batch, bench_scan);

criterion_main!(benches);
