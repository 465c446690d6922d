//! Integration test: all-or-nothing steps and load-time validation.
//!
//! A stage that fails mid-step must leave the published position and
//! velocity exactly as they were, and must not advance the step counter.
//! A stage that writes NaN is not an error: the anomaly is published and
//! left for the caller's non-finite scan to find.

use pcisph_core::{
    BufferId, ConfigurationError, ModelInput, ParticleId, SphParams, StageError, StepError, StepId,
};
use pcisph_engine::{InitError, Solver, SolverConfig};
use pcisph_obs::scan_non_finite;
use pcisph_stage::{GraphError, Segment, Stage};
use pcisph_stages::{standard_schedule, standard_stages};
use pcisph_test_utils::fixtures;
use pcisph_test_utils::stages::{ConstStage, FailingStage};

const DT: f32 = SphParams::DEFAULT_TIME_STEP;

/// The standard step followed by one extra stage after INTEGRATE.
fn with_tail(model: &ModelInput, tail: Box<dyn Stage>) -> Solver {
    let mut stages = standard_stages();
    stages.push(tail);
    let mut schedule = standard_schedule(3, false);
    schedule.push(Segment::Once(stages.len() - 1));
    Solver::with_pipeline(model, SolverConfig::default(), stages, &schedule).unwrap()
}

// ── Stage failure ────────────────────────────────────────────────────

#[test]
fn stage_failure_reports_label_and_reason() {
    let mut solver = with_tail(
        &fixtures::single_particle(),
        Box::new(FailingStage::new("fail_after_one", BufferId::Density, 1)),
    );
    solver.step(DT).unwrap();
    match solver.step(DT) {
        Err(StepError::StageFailed {
            stage,
            reason: StageError::ExecutionFailed { .. },
        }) => assert_eq!(stage, "fail_after_one"),
        other => panic!("expected StageFailed, got {other:?}"),
    }
}

#[test]
fn failed_step_publishes_nothing() {
    let mut solver = with_tail(
        &fixtures::liquid_block([2, 2, 2], 5),
        Box::new(FailingStage::new("fail_after_one", BufferId::Density, 1)),
    );
    let first = solver.step(DT).unwrap();
    let positions = solver.snapshot().positions().to_vec();
    let velocities = solver.snapshot().velocities().to_vec();

    // INTEGRATE has already written staging when the tail fails.
    for _ in 0..3 {
        assert!(solver.step(DT).is_err());
        let snap = solver.snapshot();
        assert_eq!(snap.positions(), &positions[..]);
        assert_eq!(snap.velocities(), &velocities[..]);
        assert_eq!(snap.generation(), 1);
        assert_eq!(solver.current_step(), StepId(1));
        assert_eq!(solver.last_metrics(), &first.metrics);
    }
}

#[test]
fn failure_before_integrate_also_publishes_nothing() {
    // Fails immediately, right after CLEAR.
    let mut stages = standard_stages();
    stages.push(Box::new(FailingStage::new("early", BufferId::Density, 0)));
    let mut schedule = vec![Segment::Once(0), Segment::Once(stages.len() - 1)];
    schedule.extend(standard_schedule(3, false).into_iter().skip(1));
    let model = fixtures::single_particle();
    let mut solver =
        Solver::with_pipeline(&model, SolverConfig::default(), stages, &schedule).unwrap();

    assert!(matches!(
        solver.step(DT),
        Err(StepError::StageFailed { ref stage, .. }) if stage == "early"
    ));
    assert_eq!(solver.snapshot().position(0), Some(model.positions[0]));
    assert_eq!(solver.current_step(), StepId(0));
}

// ── Numerical anomalies ──────────────────────────────────────────────

#[test]
fn nan_is_published_and_found_by_scan() {
    let mut solver = with_tail(
        &fixtures::single_particle(),
        Box::new(ConstStage::new("poison", BufferId::Velocity, f32::NAN)),
    );
    let frame = solver.step(DT).unwrap();
    assert_eq!(frame.step, StepId(1));

    let bad = scan_non_finite(&solver.snapshot()).expect("NaN should be visible");
    assert_eq!(bad.buffer, BufferId::Velocity);
    assert_eq!(bad.particle, ParticleId(0));
    assert!(bad.value.is_nan());
}

// ── Load-time validation ─────────────────────────────────────────────

#[test]
fn unknown_type_tag_is_count_mismatch() {
    let mut model = fixtures::single_particle();
    model.positions.push([1.0, 1.0, 1.0, 9.9]);
    model.velocities.push([0.0; 4]);
    match Solver::new(&model, SolverConfig::default()) {
        Err(InitError::Configuration(ConfigurationError::ParticleCountMismatch {
            particle_count,
            boundary,
            elastic,
            liquid,
        })) => {
            assert_eq!(particle_count, 2);
            assert_eq!(boundary + elastic + liquid, 1);
        }
        other => panic!("expected ParticleCountMismatch, got {:?}", other.err()),
    }
}

#[test]
fn velocity_length_mismatch_rejected() {
    let mut model = fixtures::single_particle();
    model.velocities.clear();
    assert!(matches!(
        Solver::new(&model, SolverConfig::default()).err(),
        Some(InitError::Configuration(ConfigurationError::LengthMismatch { .. }))
    ));
}

#[test]
fn empty_schedule_is_graph_error() {
    let result = Solver::with_pipeline(
        &fixtures::single_particle(),
        SolverConfig::default(),
        standard_stages(),
        &[],
    );
    assert_eq!(result.err(), Some(InitError::Graph(GraphError::EmptyGraph)));
}

// ── Watches ──────────────────────────────────────────────────────────

#[test]
fn watch_index_out_of_bounds_is_configuration_error() {
    let mut solver = Solver::new(&fixtures::single_particle(), SolverConfig::default()).unwrap();
    match solver.watch("particle[1].density") {
        Err(ConfigurationError::WatchIndexOutOfBounds {
            index,
            particle_count,
        }) => assert_eq!((index, particle_count), (1, 1)),
        other => panic!("expected WatchIndexOutOfBounds, got {other:?}"),
    }
    assert!(solver.watches().is_empty());
}

#[test]
fn watches_sample_only_while_started() {
    let mut solver = Solver::new(&fixtures::single_particle(), SolverConfig::default()).unwrap();
    solver.watch("particle[0].position.y").unwrap();
    solver.watch("activation[0]").unwrap();

    assert!(solver.step(DT).unwrap().watches.is_empty());

    solver.start_watching();
    let frame = solver.step(DT).unwrap();
    let y = solver.snapshot().position(0).unwrap()[1];
    assert_eq!(frame.watch("particle[0].position.y"), Some(y));
    assert_eq!(frame.watch("activation[0]"), Some(0.0));

    assert!(solver.unwatch("activation[0]"));
    assert_eq!(solver.step(DT).unwrap().watches.len(), 1);

    solver.stop_watching();
    assert!(solver.step(DT).unwrap().watches.is_empty());
    assert_eq!(solver.watches().len(), 1);
}
