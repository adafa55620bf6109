//! Throughput Benchmark for respkv
//!
//! Measures the request path piece by piece: parsing, client-side
//! serialization, the store, the expiry scheduler and full evaluation.

use criterion::{black_box, criterion_group, criterion_main, Criterion, Throughput};
use respkv::commands::Evaluator;
use respkv::protocol::{parse_command, serialize, Parser};
use respkv::storage::{Scheduler, Store, Value};
use std::sync::Arc;
use std::time::Duration;

/// Benchmark request parsing
fn bench_parse(c: &mut Criterion) {
    let mut group = c.benchmark_group("parse");
    group.throughput(Throughput::Elements(1));

    group.bench_function("get", |b| {
        b.iter(|| {
            black_box(parse_command(black_box("*2\r\n$3\r\nGET\r\n$5\r\nmykey\r\n")).unwrap());
        });
    });

    let set = "*6\r\n$3\r\nSET\r\n$5\r\nmykey\r\n:42\r\n$2\r\nEX\r\n:10\r\n$2\r\nNX\r\n";
    group.bench_function("set_with_modifiers", |b| {
        b.iter(|| {
            black_box(parse_command(black_box(set)).unwrap());
        });
    });

    group.bench_function("set_reused_parser", |b| {
        let mut parser = Parser::new(set);
        b.iter(|| {
            parser.reset(set);
            black_box(parser.parse().unwrap());
        });
    });

    let mget = serialize(&format!(
        "MGET {}",
        (0..100)
            .map(|i| format!("key_{}", i))
            .collect::<Vec<_>>()
            .join(" ")
    ))
    .unwrap();
    group.bench_function("mget_100_keys", |b| {
        b.iter(|| {
            black_box(parse_command(mget.clone()).unwrap());
        });
    });

    group.finish();
}

/// Benchmark inline command serialization
fn bench_serialize(c: &mut Criterion) {
    let mut group = c.benchmark_group("serialize");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set_inline", |b| {
        b.iter(|| {
            black_box(serialize(black_box("SET mykey \"some value\" EX 10 NX")).unwrap());
        });
    });

    group.finish();
}

/// Benchmark SET and GET against the store
fn bench_store(c: &mut Criterion) {
    let store = Arc::new(Store::new());

    for i in 0..100_000 {
        store
            .set(&format!("key:{}", i), Value::String(format!("value:{}", i)))
            .unwrap();
    }

    let mut group = c.benchmark_group("store");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set", |b| {
        let mut i = 0u64;
        b.iter(|| {
            store
                .set(&format!("new:{}", i), Value::String("small_value".into()))
                .unwrap();
            i += 1;
        });
    });

    group.bench_function("get_existing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(store.get(&format!("key:{}", i % 100_000)));
            i += 1;
        });
    });

    group.bench_function("get_missing", |b| {
        let mut i = 0u64;
        b.iter(|| {
            black_box(store.get(&format!("missing:{}", i)));
            i += 1;
        });
    });

    // Single counter
    store.set("counter", Value::Int64(0)).unwrap();
    group.bench_function("incr", |b| {
        b.iter(|| {
            black_box(store.incr_by("counter", 1).unwrap());
        });
    });

    group.finish();
}

/// Benchmark concurrent access
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
                            store.set(&key, Value::Int(i)).unwrap();
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

/// Benchmark the expiry scheduler
fn bench_expiry(c: &mut Criterion) {
    let mut group = c.benchmark_group("expiry");
    group.throughput(Throughput::Elements(1));

    group.bench_function("insert", |b| {
        let scheduler = Scheduler::new(|_| true);
        let mut i = 0u64;
        b.iter(|| {
            scheduler.insert(&format!("key:{}", i), (i % 3600) as i64 + 1);
            i += 1;
        });
    });

    group.bench_function("tick_10k_due", |b| {
        b.iter(|| {
            let store = Arc::new(Store::new());
            let target = Arc::clone(&store);
            let scheduler = Scheduler::new(move |key| target.delete(key));

            for i in 0..10_000 {
                let key = format!("key:{}", i);
                store.set(&key, Value::Int(i)).unwrap();
                scheduler.insert(&key, 1);
            }

            black_box(scheduler.tick());
        });
    });

    group.finish();
}

/// Benchmark full evaluation of parsed commands
fn bench_eval(c: &mut Criterion) {
    let evaluator = Evaluator::new();
    let set = parse_command("*3\r\n$3\r\nSET\r\n$5\r\nmykey\r\n$5\r\nvalue\r\n").unwrap();
    let get = parse_command("*2\r\n$3\r\nGET\r\n$5\r\nmykey\r\n").unwrap();

    let mut group = c.benchmark_group("eval");
    group.throughput(Throughput::Elements(1));

    group.bench_function("set", |b| {
        b.iter(|| {
            black_box(evaluator.eval(set.clone()).unwrap());
        });
    });

    group.bench_function("get", |b| {
        b.iter(|| {
            black_box(evaluator.eval(get.clone()).unwrap());
        });
    });

    group.bench_function("parse_and_eval", |b| {
        let frame = "*3\r\n$6\r\nINCRBY\r\n$7\r\ncounter\r\n:5\r\n";
        evaluator
            .eval(parse_command("*3\r\n$3\r\nSET\r\n$7\r\ncounter\r\n:0\r\n").unwrap())
            .unwrap();
        b.iter(|| {
            let cmd = parse_command(black_box(frame)).unwrap();
            black_box(evaluator.eval(cmd).unwrap());
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_parse,
    bench_serialize,
    bench_store,
    bench_concurrent,
    bench_expiry,
    bench_eval,
);

criterion_main!(benches);
