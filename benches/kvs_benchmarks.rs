// SPDX-License-Identifier: PMPL-1.0-or-later
//! Performance benchmarks for the KVS client over the in-memory wire client

use std::sync::Arc;
use std::time::Duration;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use tokio::runtime::Runtime;

use kvs_core::{
    MetricsBackend, MetricsConfig, PrometheusSink, Record, Records, StorageBackend,
};
use kvs_dynamodb::attribute::{decode_record, encode_record};
use kvs_dynamodb::{DynamoDbBackend, DynamoDbBuilder, InMemoryAttributeClient};

fn adapter(latency: Option<Duration>) -> DynamoDbBackend<InMemoryAttributeClient> {
    let mut client = InMemoryAttributeClient::new();
    if let Some(latency) = latency {
        client = client.with_latency(latency);
    }
    DynamoDbBuilder::new()
        .container_name("bench")
        .build_with(Arc::new(client))
        .unwrap()
}

// ============================================================================
// Attribute Mapping Benchmarks
// ============================================================================

fn bench_attribute_mapping(c: &mut Criterion) {
    let json = r#"{"id":1,"name":"John Doe","tags":["a","b","c"]}"#.to_string();

    let mut group = c.benchmark_group("attribute");

    group.bench_function("encode_record", |b| {
        b.iter(|| black_box(encode_record("user:1", json.clone(), Some(1_900_000_000))))
    });

    group.bench_function("decode_record", |b| {
        let item = encode_record("user:1", json.clone(), Some(1_900_000_000));
        b.iter(|| black_box(decode_record(item.clone()).unwrap()))
    });

    group.finish();
}

// ============================================================================
// Point Read Benchmarks
// ============================================================================

fn bench_point_reads(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let backend = adapter(None);
    rt.block_on(async {
        backend
            .save("hot", Some(Record::new("hot", &"value", None)))
            .await
            .unwrap();
    });

    let mut group = c.benchmark_group("get");

    group.bench_function("single", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(backend.get("hot").await.unwrap()) });
    });

    let sink = Arc::new(PrometheusSink::new(MetricsConfig::default()).unwrap());
    let metered = MetricsBackend::new(adapter(None), sink);
    group.bench_function("metered_miss", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(metered.get("cold").await.is_err()) });
    });

    group.finish();
}

fn bench_coalesced_reads(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let backend = adapter(Some(Duration::from_micros(200)));
    rt.block_on(async {
        backend
            .save("hot", Some(Record::new("hot", &"value", None)))
            .await
            .unwrap();
    });

    let mut group = c.benchmark_group("coalesced_get");

    for readers in [1usize, 8, 64] {
        group.throughput(Throughput::Elements(readers as u64));
        group.bench_with_input(BenchmarkId::from_parameter(readers), &readers, |b, &readers| {
            b.to_async(&rt).iter(|| async {
                let reads = (0..readers).map(|_| backend.get("hot"));
                black_box(futures::future::join_all(reads).await)
            });
        });
    }

    group.finish();
}

// ============================================================================
// Batch Benchmarks
// ============================================================================

fn bench_batches(c: &mut Criterion) {
    let rt = Runtime::new().unwrap();
    let backend = adapter(None);

    let keys: Vec<String> = (0..100).map(|i| format!("user:{}", i)).collect();
    let records: Records = keys
        .iter()
        .map(|k| Record::new(k.clone(), &payload(k), None))
        .collect();
    rt.block_on(async { backend.bulk_save(records.clone()).await.unwrap() });

    let mut group = c.benchmark_group("batch");
    group.throughput(Throughput::Elements(100));

    group.bench_function("bulk_save_100", |b| {
        b.to_async(&rt)
            .iter(|| async { backend.bulk_save(black_box(records.clone())).await.unwrap() });
    });

    let refs: Vec<&str> = keys.iter().map(String::as_str).collect();
    group.bench_function("bulk_get_100", |b| {
        b.to_async(&rt)
            .iter(|| async { black_box(backend.bulk_get(&refs).await.unwrap()) });
    });

    group.finish();
}

fn payload(key: &str) -> Vec<(String, u64)> {
    vec![(key.to_string(), key.len() as u64)]
}

criterion_group!(
    benches,
    bench_attribute_mapping,
    bench_point_reads,
    bench_coalesced_reads,
    bench_batches
);
criterion_main!(benches);
