//! Benchmarks for the fixed-timestep step loop
//!
//! Run with: cargo bench --bench step_loop

use std::f64::consts::PI;

use criterion::{black_box, criterion_group, criterion_main, BenchmarkId, Criterion};
use rbsim_core::{
    HostConfig, Quaternion, SimulationHost, SoftwareBackend, Transform, DEFAULT_TIMESTEP,
};

fn drop_scene(settled: bool) -> SimulationHost<SoftwareBackend> {
    let mut host = SimulationHost::new(SoftwareBackend::new(), HostConfig::default());
    host.initialize().unwrap();
    let slab_pose = Transform {
        position: [0.0, 0.0, 0.0],
        orientation: Quaternion::from_axis_angle([1.0, 0.0, 0.0], PI / 16.0),
    };
    host.create_static_actor(slab_pose, [10.0, 1.0, 10.0]).unwrap();
    host.create_dynamic_actor(Transform::from_position(5.0, 10.0, 5.0), 2.0)
        .unwrap();
    if settled {
        // run long enough for the sphere to land and go to sleep
        host.step(600, DEFAULT_TIMESTEP).unwrap();
    }
    host
}

/// Benchmark a single step in the two interesting regimes
fn bench_single_step(c: &mut Criterion) {
    let mut group = c.benchmark_group("Step");

    group.bench_function("free fall", |b| {
        let mut host = drop_scene(false);
        b.iter(|| {
            host.step(1, black_box(DEFAULT_TIMESTEP)).unwrap();
        })
    });

    group.bench_function("resting contact", |b| {
        let mut host = drop_scene(true);
        b.iter(|| {
            host.step(1, black_box(DEFAULT_TIMESTEP)).unwrap();
        })
    });

    group.finish();
}

/// Benchmark batched stepping
fn bench_step_batches(c: &mut Criterion) {
    let mut group = c.benchmark_group("Step Batches");

    for n in [10, 100].iter() {
        group.bench_with_input(BenchmarkId::new("steps", n), n, |b, &n| {
            let mut host = drop_scene(true);
            b.iter(|| {
                host.step(n, black_box(DEFAULT_TIMESTEP)).unwrap();
            })
        });
    }

    group.finish();
}

/// Benchmark scene setup and teardown
fn bench_lifecycle(c: &mut Criterion) {
    let mut group = c.benchmark_group("Lifecycle");

    group.bench_function("initialize and shutdown", |b| {
        b.iter(|| {
            let mut host =
                SimulationHost::new(SoftwareBackend::new(), HostConfig::default());
            host.initialize().unwrap();
            host.shutdown();
            black_box(host.backend().live_resources())
        })
    });

    group.finish();
}

criterion_group!(benches, bench_single_step, bench_step_batches, bench_lifecycle);
criterion_main!(benches);
