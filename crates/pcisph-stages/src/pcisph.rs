//! The predictor-corrector loop body.
//!
//! ```text
//! PREDICT_POSITIONS ─→ PREDICT_DENSITY ─→ CORRECT_PRESSURE ─→ COMPUTE_PRESSURE_FORCE
//!        ↑                                                             │
//!        └─────────────────────────── × iterations ────────────────────┘
//! ```
//!
//! Each pass predicts where particles would go under the current
//! pressure estimate, measures the density error there, and nudges the
//! pressure by `delta * error`. Neighbor lists from the start of the step
//! are reused for every pass.

use glam::Vec3;
use pcisph_core::{BufferId, BufferSet, StageError, NO_PARTICLE_ID};
use pcisph_stage::{Stage, StageContext, StageDomain, WriteMode};

use crate::kernels::{clamp_position, is_boundary, load3, spiky_gradient, store3};
use crate::names;

/// Tentative positions under the current total acceleration.
///
/// Boundary particles stay where they are. Predictions are clamped into
/// the scene bounds.
#[derive(Clone, Copy, Debug, Default)]
pub struct PredictPositions;

impl Stage for PredictPositions {
    fn name(&self) -> &str {
        names::PREDICT_POSITIONS
    }

    fn domain(&self) -> StageDomain {
        StageDomain::Particles
    }

    fn reads(&self) -> BufferSet {
        [
            BufferId::SortedPosition,
            BufferId::SortedVelocity,
            BufferId::Acceleration,
            BufferId::PressureAcceleration,
        ]
        .into_iter()
        .collect()
    }

    fn writes(&self) -> Vec<(BufferId, WriteMode)> {
        vec![(BufferId::PredictedPosition, WriteMode::Full)]
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let positions = ctx.read_f32(BufferId::SortedPosition)?;
        let velocities = ctx.read_f32(BufferId::SortedVelocity)?;
        let acceleration = ctx.read_f32(BufferId::Acceleration)?;
        let pressure_acceleration = ctx.read_f32(BufferId::PressureAcceleration)?;
        let env = ctx.env();
        let dt = env.coefficients.time_step;
        let scale = env.params.simulation_scale;
        let bounds = env.bounds;
        let exec = ctx.executor();

        let predicted = ctx.writes().f32_mut(BufferId::PredictedPosition)?;
        exec.for_each(predicted, 4, |i, out| {
            let tag = positions[i * 4 + 3];
            out[3] = tag;
            let x = load3(positions, i);
            if is_boundary(tag) {
                store3(out, x);
                return;
            }
            let a = load3(acceleration, i) + load3(pressure_acceleration, i);
            let v = load3(velocities, i) + a * dt;
            store3(out, clamp_position(x + v * (dt / scale), &bounds));
        });
        Ok(())
    }
}

/// Raises each pressure by `delta` times the predicted density excess,
/// flooring at zero.
#[derive(Clone, Copy, Debug, Default)]
pub struct CorrectPressure;

impl Stage for CorrectPressure {
    fn name(&self) -> &str {
        names::CORRECT_PRESSURE
    }

    fn domain(&self) -> StageDomain {
        StageDomain::Particles
    }

    fn reads(&self) -> BufferSet {
        [BufferId::PredictedDensity].into_iter().collect()
    }

    fn writes(&self) -> Vec<(BufferId, WriteMode)> {
        vec![(BufferId::Pressure, WriteMode::Incremental)]
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let predicted = ctx.read_f32(BufferId::PredictedDensity)?;
        let env = ctx.env();
        let delta = env.coefficients.delta;
        let rest = env.params.rest_density;
        let exec = ctx.executor();

        let pressure = ctx.writes().f32_mut(BufferId::Pressure)?;
        exec.for_each(pressure, 1, |i, p| {
            p[0] = (p[0] + delta * (predicted[i] - rest)).max(0.0);
        });
        Ok(())
    }
}

/// Symmetric pressure acceleration from the corrected pressures.
#[derive(Clone, Copy, Debug, Default)]
pub struct ComputePressureForce;

impl Stage for ComputePressureForce {
    fn name(&self) -> &str {
        names::COMPUTE_PRESSURE_FORCE
    }

    fn domain(&self) -> StageDomain {
        StageDomain::Particles
    }

    fn reads(&self) -> BufferSet {
        [
            BufferId::SortedPosition,
            BufferId::NeighborIds,
            BufferId::NeighborDistances,
            BufferId::Density,
            BufferId::Pressure,
        ]
        .into_iter()
        .collect()
    }

    fn writes(&self) -> Vec<(BufferId, WriteMode)> {
        vec![(BufferId::PressureAcceleration, WriteMode::Full)]
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let positions = ctx.read_f32(BufferId::SortedPosition)?;
        let ids = ctx.read_u32(BufferId::NeighborIds)?;
        let distances = ctx.read_f32(BufferId::NeighborDistances)?;
        let density = ctx.read_f32(BufferId::Density)?;
        let pressure = ctx.read_f32(BufferId::Pressure)?;
        let env = ctx.env();
        let c = env.coefficients;
        let mass = env.params.mass;
        let cap = env.neighbor_capacity;
        let exec = ctx.executor();

        let out = ctx.writes().f32_mut(BufferId::PressureAcceleration)?;
        exec.for_each(out, 4, |i, a| {
            a.fill(0.0);
            if is_boundary(positions[i * 4 + 3]) {
                return;
            }
            let pi = load3(positions, i);
            let term_i = pressure[i] / (density[i] * density[i]);
            let mut sum = Vec3::ZERO;
            for k in i * cap..(i + 1) * cap {
                let j = ids[k];
                if j == NO_PARTICLE_ID {
                    break;
                }
                let r = distances[k];
                if r <= 0.0 {
                    continue;
                }
                let j = j as usize;
                let dir = (pi - load3(positions, j)).normalize_or_zero();
                let term_j = pressure[j] / (density[j] * density[j]);
                sum += dir * ((term_i + term_j) * spiky_gradient(&c, r));
            }
            store3(a, sum * -mass);
        });
        Ok(())
    }
}
