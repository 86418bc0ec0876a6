//! Throughput benchmarks for Huddle.
//!
//! These benchmarks measure the raw operation rate of the registry and router.

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use huddle_bench::{bench_router, drain, populate_room, runtime};
use huddle_core::{Message, Registry};

/// Benchmark registry mutations.
fn bench_registry(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");

    group.bench_function("create_group_chat", |b| {
        let registry = Registry::new();
        let mut i = 0u64;
        b.iter(|| {
            let room = format!("room:{}", i);
            i += 1;
            let _ = registry.create_group_chat(black_box(&room), "owner");
        });
    });

    group.bench_function("join_leave", |b| {
        let registry = Registry::new();
        registry.create_group_chat("lobby", "owner").unwrap();
        b.iter(|| {
            registry.join_group_chat(black_box("lobby"), "guest").unwrap();
            registry.leave_group_chat(black_box("lobby"), "guest").unwrap();
        });
    });

    group.bench_function("list_channels_1000", |b| {
        let registry = Registry::new();
        for i in 0..1000 {
            registry
                .create_group_chat(&format!("room:{}", i), "owner")
                .unwrap();
        }
        b.iter(|| black_box(registry.list_channels()));
    });

    group.finish();
}

/// Benchmark direct message routing.
fn bench_direct(c: &mut Criterion) {
    let mut group = c.benchmark_group("direct");
    let rt = runtime();

    group.bench_function("send_and_drain", |b| {
        let router = bench_router();
        let mut bob = [router.connect("bob")];

        b.iter(|| {
            rt.block_on(router.send_message(Message::to_user("bob", "hello"), "alice"))
                .unwrap();
            drain(&mut bob);
        });
    });

    group.finish();
}

/// Benchmark room fan-out scenarios.
fn bench_fanout(c: &mut Criterion) {
    let mut group = c.benchmark_group("fanout");
    let rt = runtime();

    for size in [10, 100, 1000].iter() {
        group.throughput(Throughput::Elements(*size as u64));
        group.bench_with_input(BenchmarkId::from_parameter(size), size, |b, &size| {
            let router = bench_router();
            let _owner = router.connect("owner");
            let mut members = populate_room(&router, "broadcast", "owner", size);

            b.iter(|| {
                let report = rt
                    .block_on(router.send_message(Message::to_room("broadcast", "x"), "owner"))
                    .unwrap();
                black_box(report);
                drain(&mut members);
            });
        });
    }

    group.finish();
}

criterion_group!(benches, bench_registry, bench_direct, bench_fanout);
criterion_main!(benches);
