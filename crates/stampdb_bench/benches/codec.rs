//! Key and value codec benchmarks.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use serde_json::json;
use stampdb_bench::payload;
use stampdb_codec::{decode_raw, Address, KeyCodec, Partition, RecordLayout, StampedValue};

/// Benchmark key encoding for each category.
fn bench_encode_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("encode_key");
    let codec = KeyCodec::new(RecordLayout::Shared);

    let addresses = [
        ("direct_root", Address::direct("obj000042", None)),
        ("direct_nested", Address::direct("obj000042", Some("a/b/c"))),
        ("computed", Address::computed("obj000042", "children/size")),
        ("reduced", Address::reduced("totals", Some("count"))),
    ];
    for (name, address) in &addresses {
        group.bench_function(*name, |b| {
            b.iter(|| {
                let key = codec.encode(black_box(address)).unwrap();
                black_box(key);
            });
        });
    }

    group.finish();
}

/// Benchmark key decoding, which scans run once per record.
fn bench_decode_key(c: &mut Criterion) {
    let mut group = c.benchmark_group("decode_key");
    let codec = KeyCodec::new(RecordLayout::Shared);

    for key in ["obj000042", "obj000042/a/b/c", "=children/size:obj000042", "_totals/count"] {
        group.bench_with_input(BenchmarkId::from_parameter(key), key, |b, key| {
            b.iter(|| {
                let address = codec.decode(Partition::Records, black_box(key)).unwrap();
                black_box(address);
            });
        });
    }

    group.finish();
}

/// Benchmark stamped value encoding and decoding across payload sizes.
fn bench_stamped_value(c: &mut Criterion) {
    let mut group = c.benchmark_group("stamped_value");

    for size in [16, 256, 4096].iter() {
        let value = StampedValue::new(1_700_000_000u64, payload(*size).as_str());
        let encoded = value.encode();
        group.throughput(Throughput::Bytes(encoded.len() as u64));

        group.bench_with_input(BenchmarkId::new("encode", size), &value, |b, value| {
            b.iter(|| black_box(value.encode()));
        });
        group.bench_with_input(BenchmarkId::new("decode", size), &encoded, |b, encoded| {
            b.iter(|| black_box(StampedValue::decode(black_box(encoded)).unwrap()));
        });
        group.bench_with_input(BenchmarkId::new("split", size), &encoded, |b, encoded| {
            b.iter(|| black_box(decode_raw(black_box(encoded.as_bytes())).unwrap()));
        });
    }

    group.finish();
}

/// Benchmark array payload decoding.
fn bench_array_payload(c: &mut Criterion) {
    let mut group = c.benchmark_group("array_payload");

    for len in [4usize, 64, 512].iter() {
        let items: Vec<_> = (0..*len).map(|i| json!(format!("obj{i:06}"))).collect();
        let encoded = StampedValue::new(7u64, items).encode();
        group.bench_with_input(BenchmarkId::from_parameter(len), &encoded, |b, encoded| {
            b.iter(|| black_box(StampedValue::decode(black_box(encoded)).unwrap()));
        });
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_encode_key,
    bench_decode_key,
    bench_stamped_value,
    bench_array_payload,
);

criterion_main!(benches);
