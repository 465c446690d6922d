//! Criterion benchmarks for full solver steps.

use criterion::{criterion_group, criterion_main, Criterion};
use pcisph_backend::DeviceProfile;
use pcisph_bench::{reference_scene, stress_scene};
use pcisph_core::SphParams;
use pcisph_engine::{Solver, SolverConfig};

const DT: f32 = SphParams::DEFAULT_TIME_STEP;

fn solver(model: &pcisph_core::ModelInput, device: DeviceProfile) -> Solver {
    let config = SolverConfig {
        device,
        ..SolverConfig::default()
    };
    let mut solver = Solver::new(model, config).unwrap();
    // Warm up: one step so every buffer has been touched.
    solver.step(DT).unwrap();
    solver
}

fn bench_step_reference_serial(c: &mut Criterion) {
    let mut solver = solver(&reference_scene(42), DeviceProfile::Cpu);
    c.bench_function("step_reference_serial", |b| {
        b.iter(|| {
            let frame = solver.step(DT).unwrap();
            std::hint::black_box(&frame);
        });
    });
}

fn bench_step_reference_pooled(c: &mut Criterion) {
    let mut solver = solver(&reference_scene(42), DeviceProfile::Gpu);
    c.bench_function("step_reference_pooled", |b| {
        b.iter(|| {
            let frame = solver.step(DT).unwrap();
            std::hint::black_box(&frame);
        });
    });
}

fn bench_step_stress_pooled(c: &mut Criterion) {
    let mut solver = solver(&stress_scene(42), DeviceProfile::Gpu);
    let mut group = c.benchmark_group("stress");
    group.sample_size(10);
    group.bench_function("step_stress_pooled", |b| {
        b.iter(|| {
            let frame = solver.step(DT).unwrap();
            std::hint::black_box(&frame);
        });
    });
    group.finish();
}

criterion_group!(
    benches,
    bench_step_reference_serial,
    bench_step_reference_pooled,
    bench_step_stress_pooled
);
criterion_main!(benches);
