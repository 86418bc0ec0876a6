//! Latency benchmarks for Huddle.
//!
//! These benchmarks measure the time from submitting a message to it being
//! readable on the recipient's queue.

use criterion::{black_box, criterion_group, criterion_main, Criterion};
use huddle_bench::{bench_router, populate_room, runtime};
use huddle_core::Message;
use huddle_protocol::{codec, ChannelKind, Frame};
use std::time::Instant;

/// Benchmark round-trip encode/decode latency.
fn bench_codec_roundtrip(c: &mut Criterion) {
    let mut group = c.benchmark_group("codec_roundtrip");

    let frame = Frame::send_message(1, "lobby", ChannelKind::Group, "x".repeat(256));

    group.bench_function("send_message_256B", |b| {
        b.iter(|| {
            let encoded = codec::encode(black_box(&frame)).unwrap();
            codec::decode(black_box(&encoded)).unwrap()
        });
    });

    group.finish();
}

/// Benchmark send + receive latency.
fn bench_delivery_latency(c: &mut Criterion) {
    let mut group = c.benchmark_group("delivery_latency");
    let rt = runtime();

    group.bench_function("direct", |b| {
        b.iter_custom(|iters| {
            let router = bench_router();
            let mut bob = router.connect("bob");

            let start = Instant::now();
            rt.block_on(async {
                for _ in 0..iters {
                    router
                        .send_message(Message::to_user("bob", "ping"), "alice")
                        .await
                        .unwrap();
                    bob.recv().await.unwrap();
                }
            });
            start.elapsed()
        });
    });

    group.bench_function("room_ten_members", |b| {
        b.iter_custom(|iters| {
            let router = bench_router();
            let _owner = router.connect("owner");
            let mut members = populate_room(&router, "lobby", "owner", 10);

            let start = Instant::now();
            rt.block_on(async {
                for _ in 0..iters {
                    router
                        .send_message(Message::to_room("lobby", "ping"), "owner")
                        .await
                        .unwrap();
                    for member in &mut members {
                        member.recv().await.unwrap();
                    }
                }
            });
            start.elapsed()
        });
    });

    group.finish();
}

/// Benchmark membership lookups on a populated registry.
fn bench_membership_lookup(c: &mut Criterion) {
    let mut group = c.benchmark_group("membership_lookup");

    // Setup: 1000 rooms with 10 subscribers each
    let router = bench_router();
    for i in 0..1000 {
        let room = format!("room:{}", i);
        router.create_group_chat(&room, "owner").unwrap();
        for j in 0..10 {
            router
                .join_group_chat(&room, &format!("user:{}:{}", i, j))
                .unwrap();
        }
    }

    group.bench_function("exists", |b| {
        let mut i = 0;
        b.iter(|| {
            let room = format!("room:{}", i % 1000);
            i += 1;
            router.registry().exists(black_box(&room))
        });
    });

    group.bench_function("subscriber_count", |b| {
        let mut i = 0;
        b.iter(|| {
            let room = format!("room:{}", i % 1000);
            i += 1;
            router.registry().subscriber_count(black_box(&room))
        });
    });

    group.finish();
}

criterion_group!(
    benches,
    bench_codec_roundtrip,
    bench_delivery_latency,
    bench_membership_lookup,
);
criterion_main!(benches);
