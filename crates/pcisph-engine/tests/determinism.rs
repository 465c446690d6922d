//! Integration test: repeatable results.
//!
//! Running N steps in one `solve` call must match N single `step` calls
//! on a fresh solver bit for bit. The pooled profile writes each item's
//! own slot only, so it must also agree with itself across runs and
//! with the serial profile.

use pcisph_backend::DeviceProfile;
use pcisph_core::{ModelInput, SphParams};
use pcisph_engine::{Solver, SolverConfig, TimeConfig};
use pcisph_obs::scan_non_finite;
use pcisph_test_utils::fixtures;
use proptest::prelude::*;

const DT: f32 = SphParams::DEFAULT_TIME_STEP;

fn config(device: DeviceProfile) -> SolverConfig {
    SolverConfig {
        device,
        threads: Some(4),
        ..SolverConfig::default()
    }
}

/// Published `(positions, velocities)` after `steps` single steps.
fn stepped(model: &ModelInput, device: DeviceProfile, steps: u32) -> (Vec<f32>, Vec<f32>) {
    let mut solver = Solver::new(model, config(device)).unwrap();
    for _ in 0..steps {
        solver.step(DT).unwrap();
    }
    let snap = solver.snapshot();
    (snap.positions().to_vec(), snap.velocities().to_vec())
}

#[test]
fn one_solve_call_matches_single_steps() {
    let model = fixtures::tank([3, 3, 3], 42);
    let mut batch = Solver::new(&model, SolverConfig::default()).unwrap();
    batch
        .solve(&TimeConfig {
            time_step: DT,
            steps: 8,
        })
        .unwrap();
    let snap = batch.snapshot();

    let (positions, velocities) = stepped(&model, DeviceProfile::Cpu, 8);
    assert_eq!(snap.positions(), &positions[..]);
    assert_eq!(snap.velocities(), &velocities[..]);
}

#[test]
fn pooled_profile_is_repeatable() {
    let model = fixtures::liquid_block([4, 4, 4], 9);
    let a = stepped(&model, DeviceProfile::Gpu, 5);
    let b = stepped(&model, DeviceProfile::Gpu, 5);
    assert_eq!(a, b);
}

#[test]
fn pooled_profile_agrees_with_serial() {
    let model = fixtures::elastic_beam(8);
    let (serial_pos, serial_vel) = stepped(&model, DeviceProfile::Cpu, 5);
    let (pooled_pos, pooled_vel) = stepped(&model, DeviceProfile::Gpu, 5);
    for (s, p) in serial_pos.iter().zip(&pooled_pos) {
        assert!((s - p).abs() <= 1e-6 * s.abs().max(1.0), "{s} vs {p}");
    }
    for (s, p) in serial_vel.iter().zip(&pooled_vel) {
        assert!((s - p).abs() <= 1e-6 * s.abs().max(1.0), "{s} vs {p}");
    }
}

#[test]
fn equal_seeds_give_equal_runs() {
    let a = stepped(&fixtures::liquid_block([3, 2, 3], 77), DeviceProfile::Cpu, 3);
    let b = stepped(&fixtures::liquid_block([3, 2, 3], 77), DeviceProfile::Cpu, 3);
    assert_eq!(a, b);
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(12))]

    #[test]
    fn jittered_tanks_stay_finite_and_inside(
        seed in any::<u64>(),
        nx in 1usize..4,
        ny in 1usize..4,
        nz in 1usize..4,
    ) {
        let model = fixtures::tank([nx, ny, nz], seed);
        let mut solver = Solver::new(&model, SolverConfig::default()).unwrap();
        for _ in 0..3 {
            solver.step(DT).unwrap();
        }
        let snap = solver.snapshot();
        prop_assert!(scan_non_finite(&snap).is_none());
        for i in 0..snap.particle_count() {
            let p = snap.position(i).unwrap();
            prop_assert!(model.bounds.contains([p[0], p[1], p[2]]), "particle {} at {:?}", i, p);
        }
    }
}
