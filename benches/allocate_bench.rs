//! Benchmarks for identifier allocation
//!
//! Allocation resolves the next sequence number by scanning the kind's
//! collection, so throughput is a function of collection size; the two
//! sizes here bracket typical ledgers.

use criterion::{criterion_group, criterion_main, BenchmarkId, Criterion};
use opsledger::{Config, Document, EntityKind, OpsEngine};
use serde_json::Value;

fn engine_with_parties(count: usize) -> OpsEngine {
    let engine = OpsEngine::new(Config::default());
    let coll = engine
        .store()
        .collection(EntityKind::Party.collection_name());
    let docs: Vec<Document> = (1..=count)
        .map(|n| {
            let mut doc = Document::new();
            doc.insert("cust_id".to_string(), Value::from(format!("CU{n:03}")));
            doc
        })
        .collect();
    coll.insert_many(docs).unwrap();
    engine
}

fn allocation_benchmarks(c: &mut Criterion) {
    let mut group = c.benchmark_group("allocate");

    for size in [100, 10_000] {
        let engine = engine_with_parties(size);
        group.bench_with_input(BenchmarkId::from_parameter(size), &engine, |b, engine| {
            b.iter(|| {
                engine
                    .allocate(EntityKind::Party, &Document::new())
                    .unwrap()
            })
        });
    }

    group.finish();
}

criterion_group!(benches, allocation_benchmarks);
criterion_main!(benches);
