//! Throughput benchmarks for the lazykv store, glob matcher, and RESP parser.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use lazykv::protocol::RespParser;
use lazykv::storage::{expiry_from_ttl, unix_now, GlobPattern, Store, NEVER_EXPIRES};
use std::sync::Arc;
use std::time::Duration;

fn bench_set(c: &mut Criterion) {
    let store = Store::new();

    let mut group = c.benchmark_group("set");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_small", |b| {
        let mut i = 0u64;
        b.iter(|| {
            store.set(format!("key:{}", i), "small_value", NEVER_EXPIRES);
            i += 1;
        });
    });

    group.bench_function("set_overwrite_1kb", |b| {
        let value = "x".repeat(1024);
        let mut i = 0u64;
        b.iter(|| {
            black_box(store.set(format!("key:{}", i % 1_000), value.as_str(), NEVER_EXPIRES));
            i += 1;
        });
    });

    group.bench_function("set_with_ttl", |b| {
        let mut i = 0u64;
        b.iter(|| {
            store.set(format!("ttl:{}", i), "value", expiry_from_ttl(3600));
            i += 1;
        });
    });

    group.finish();
}

fn bench_get(c: &mut Criterion) {
    let store = Store::new();
    for i in 0..100_000 {
        store.set(format!("key:{}", i), format!("value:{}", i), NEVER_EXPIRES);
    }

    let mut group = c.benchmark_group("get");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("key:{}", i % 100_000);
            black_box(store.get(&key));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("missing:{}", i);
            black_box(store.get(&key));
            i += 1;
        });
    });

    // Each miss on a stale key pays for the write-lock eviction path
    group.bench_function("get_expired", |b| {
        let past = unix_now() - 10;
        let mut i = 0u64;
        b.iter(|| {
            let key = format!("stale:{}", i);
            store.set(key.as_str(), "value", past);
            black_box(store.get(&key));
            i += 1;
        });
    });

    group.finish();
}

fn bench_mixed(c: &mut Criterion) {
    let store = Store::new();
    for i in 0..10_000 {
        store.set(format!("key:{}", i), format!("value:{}", i), NEVER_EXPIRES);
    }

    let mut group = c.benchmark_group("mixed");
    group.throughput(Throughput::Elements(1));

    group.bench_function("80_read_20_write", |b| {
        let mut i = 0u64;
        b.iter(|| {
            if i % 5 == 0 {
                store.set(format!("new:{}", i), "value", NEVER_EXPIRES);
            } else {
                black_box(store.get(&format!("key:{}", i % 10_000)));
            }
            i += 1;
        });
    });

    group.finish();
}

fn bench_concurrent(c: &mut Criterion) {
    use std::thread;

    let mut group = c.benchmark_group("concurrent");
    group.measurement_time(Duration::from_secs(10));

    group.bench_function("4_threads_mixed", |b| {
        b.iter(|| {
            let store = Arc::new(Store::new());
            let handles: Vec<_> = (0..4)
                .map(|t| {
                    let store = Arc::clone(&store);
                    thread::spawn(move || {
                        for i in 0..10_000 {
                            let key = format!("key:{}:{}", t, i);
                            store.set(key.as_str(), "value", NEVER_EXPIRES);
                            store.get(&key);
                        }
                    })
                })
                .collect();

            for handle in handles {
                handle.join().unwrap();
            }

            black_box(store.len());
        });
    });

    group.finish();
}

fn bench_keys(c: &mut Criterion) {
    let store = Store::new();
    for i in 0..1_000 {
        store.set(format!("user:{}", i), "user_data", NEVER_EXPIRES);
        store.set(format!("session:{}", i), "session_data", NEVER_EXPIRES);
        store.set(format!("cache:{}", i), "cache_data", NEVER_EXPIRES);
    }

    let mut group = c.benchmark_group("keys");

    group.bench_function("keys_prefix", |b| {
        b.iter(|| black_box(store.keys("user:*")));
    });

    group.bench_function("keys_all", |b| {
        b.iter(|| black_box(store.keys("*")));
    });

    group.bench_function("keys_class", |b| {
        b.iter(|| black_box(store.keys("[cs]*:1?")));
    });

    group.finish();
}

fn bench_glob(c: &mut Criterion) {
    let mut group = c.benchmark_group("glob");

    group.bench_function("compile", |b| {
        b.iter(|| black_box(GlobPattern::compile("user:[a-z0-9]*:?:\\*")));
    });

    let pattern = GlobPattern::compile("*a*b*c*").unwrap();
    let hit = format!("{}a{}b{}c", "x".repeat(40), "y".repeat(40), "z".repeat(40));
    let miss = "x".repeat(120);

    group.bench_function("backtrack_hit", |b| {
        b.iter(|| black_box(pattern.matches(&hit)));
    });

    group.bench_function("backtrack_miss", |b| {
        b.iter(|| black_box(pattern.matches(&miss)));
    });

    group.finish();
}

fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    let set = b"*5\r\n$3\r\nSET\r\n$8\r\nuser:123\r\n$5\r\nalice\r\n$2\r\nEX\r\n$2\r\n60\r\n";
    group.throughput(Throughput::Bytes(set.len() as u64));

    group.bench_function("set_command", |b| {
        let mut parser = RespParser::new();
        b.iter(|| black_box(parser.parse(set)));
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_set,
    bench_get,
    bench_mixed,
    bench_concurrent,
    bench_keys,
    bench_glob,
    bench_parse,
);

criterion_main!(benches);
