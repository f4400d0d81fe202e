//! Throughput Benchmark for tagkv
//!
//! Measures the client's own overhead (codecs, metadata resolution, lock
//! protocol) against the in-memory backend, so backend latency does not
//! dominate.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tagkv::{Client, MemoryBackend, Options, ValueCodec};
use tokio::runtime::Runtime;

const BUCKET: &str = "bench";
const REGION: &str = "eu-west-1";

#[derive(Serialize, Deserialize)]
struct Session {
    user: String,
    roles: Vec<String>,
    hits: u64,
}

fn runtime() -> Runtime {
    tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap()
}

fn client(rt: &Runtime, enforce: bool) -> Client {
    let mut codec = ValueCodec::new();
    codec.register::<Session>("session").unwrap();
    let backend = Arc::new(MemoryBackend::with_bucket(BUCKET, REGION));
    let options = Options::new(BUCKET, REGION).with_enforce_consistency(enforce);
    rt.block_on(Client::connect_with_codec(options, backend, codec))
        .unwrap()
}

/// Benchmark SET operations
fn bench_set(c: &mut Criterion) {
    let rt = runtime();
    let plain = client(&rt, false);
    let enforced = client(&rt, true);

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        let value = "small_value".to_string();
        b.iter(|| {
            rt.block_on(plain.set(&format!("key:{}", i), &value, 0))
                .unwrap();
            i += 1;
        });
    });

    group.bench_function("set_large", |b| {
        let mut i = 0u64;
        let value = "x".repeat(64 * 1024); // 64KB value
        b.iter(|| {
            rt.block_on(plain.set(&format!("key:{}", i), &value, 0))
                .unwrap();
            i += 1;
        });
    });

    group.bench_function("set_record", |b| {
        let mut i = 0u64;
        let value = Session {
            user: "ariz".into(),
            roles: vec!["admin".into(), "ops".into()],
            hits: 0,
        };
        b.iter(|| {
            rt.block_on(plain.set(&format!("session:{}", i % 1_000), &value, 3600))
                .unwrap();
            i += 1;
        });
    });

    group.bench_function("set_enforced", |b| {
        let mut i = 0u64;
        let value = "small_value".to_string();
        b.iter(|| {
            rt.block_on(enforced.set(&format!("key:{}", i % 1_000), &value, 0))
                .unwrap();
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark GET operations
fn bench_get(c: &mut Criterion) {
    let rt = runtime();
    let client = client(&rt, false);

    // Pre-populate with data
    for i in 0..10_000 {
        rt.block_on(client.set(&format!("key:{}", i), &format!("value:{}", i), 0))
            .unwrap();
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let stored = rt.block_on(client.get::<String>(&format!("key:{}", i % 10_000)));
            black_box(stored.unwrap());
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let missing = rt.block_on(client.get::<String>(&format!("missing:{}", i)));
            black_box(missing.unwrap_err());
            i += 1;
        });
    });

    group.finish();
}

/// Benchmark LOCK/UNLOCK round trips
fn bench_lock(c: &mut Criterion) {
    let rt = runtime();
    let client = client(&rt, true);

    for i in 0..1_000 {
        rt.block_on(client.set(&format!("key:{}", i), &i, 0))
            .unwrap();
    }

    let mut group = c.benchmark_group("lock");
    group.throughput(Throughput::Elements(1));

    group.bench_function("lock_unlock", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i % 1_000);
            rt.block_on(async {
                client.lock(&key).await.unwrap();
                client.unlock(&key).await.unwrap();
            });
            i += 1;
        });
    });

    group.finish();
}

criterion_group!(benches, bench_set, bench_get, bench_lock);

criterion_main!(benches);
