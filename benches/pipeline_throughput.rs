//! Benchmarks for the pipeline hot path
//!
//! Run with: cargo bench

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion, Throughput};
use flowline::stage::{Sink, Source, Transform};
use flowline::{Boundary, Envelope, Pipeline, StagedWorkers};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

fn bench_boundary_push_pop(c: &mut Criterion) {
    let mut group = c.benchmark_group("boundary_push_pop");
    group.throughput(Throughput::Elements(1));

    group.bench_function("push_try_pop", |b| {
        let boundary = Boundary::new();
        let mut i = 0u64;
        b.iter(|| {
            let mut env = Envelope::with_id(format!("e{i}"));
            env.insert("seq", i as f64);
            boundary.push(black_box(env));
            black_box(boundary.try_pop());
            i = i.wrapping_add(1);
        });
    });

    group.finish();
}

fn bench_envelope_typed_access(c: &mut Criterion) {
    let mut group = c.benchmark_group("envelope_typed_access");

    let mut env = Envelope::with_id("bench");
    env.insert("count", 7);
    env.insert("score", 0.5f32);
    env.insert("label", "person");

    group.bench_function("get_int_hit", |b| {
        b.iter(|| black_box(env.get_int(black_box("count"))))
    });
    group.bench_function("get_int_mismatch", |b| {
        b.iter(|| black_box(env.get_int(black_box("label"))))
    });
    group.bench_function("try_get_float", |b| {
        b.iter(|| black_box(env.try_get_float(black_box("score"))))
    });

    group.finish();
}

fn bench_three_stage_pipeline(c: &mut Criterion) {
    let mut group = c.benchmark_group("three_stage_pipeline");
    group.sample_size(10);
    group.measurement_time(Duration::from_secs(10));

    for count in [1_000u64, 10_000].iter() {
        group.throughput(Throughput::Elements(*count));
        group.bench_with_input(
            BenchmarkId::new("parallel", count),
            count,
            |b, &count| {
                b.iter(|| {
                    let delivered = Arc::new(AtomicU64::new(0));
                    let delivered_inner = delivered.clone();

                    let mut emitted = 0u64;
                    let source = Source::new("src", move |env: &mut Envelope| {
                        if emitted >= count {
                            return false;
                        }
                        env.insert("seq", emitted as f64);
                        emitted += 1;
                        true
                    })
                    .with_max_queue_len(256)
                    .with_poll_interval(Duration::from_micros(50));

                    let transform = Transform::new("pre", |env: &mut Envelope| {
                        let seq = env.try_get_double("seq").unwrap_or(0.0);
                        env.insert("scaled", seq * 2.0);
                        true
                    });
                    let sink = Sink::new("out", move |_: &mut Envelope| {
                        delivered_inner.fetch_add(1, Ordering::Relaxed);
                        true
                    });

                    let (mut pipeline, _monitor) = Pipeline::new(3);
                    let stages: StagedWorkers = vec![
                        vec![Box::new(source)],
                        vec![Box::new(transform)],
                        vec![Box::new(sink)],
                    ];
                    pipeline.run_parallel(stages).unwrap();
                    while delivered.load(Ordering::Relaxed) < count {
                        std::hint::spin_loop();
                    }
                    pipeline.shutdown();
                });
            },
        );
    }

    group.finish();
}

criterion_group!(
    benches,
    bench_boundary_push_pop,
    bench_envelope_typed_access,
    bench_three_stage_pipeline
);
criterion_main!(benches);
