//! COMPUTE_DENSITY and PREDICT_DENSITY.
//!
//! Both sum Poly6 weights over the step's neighbor list. The self term
//! is always included, so no particle ever reports zero density.

use pcisph_core::{BufferId, BufferSet, StageError, NO_PARTICLE_ID};
use pcisph_stage::{Stage, StageContext, StageDomain, WriteMode};

use crate::kernels::{load3, poly6, self_density};
use crate::names;

/// Density at the step-start positions from stored neighbor distances.
#[derive(Clone, Copy, Debug, Default)]
pub struct ComputeDensity;

impl Stage for ComputeDensity {
    fn name(&self) -> &str {
        names::COMPUTE_DENSITY
    }

    fn domain(&self) -> StageDomain {
        StageDomain::Particles
    }

    fn reads(&self) -> BufferSet {
        [BufferId::NeighborIds, BufferId::NeighborDistances]
            .into_iter()
            .collect()
    }

    fn writes(&self) -> Vec<(BufferId, WriteMode)> {
        vec![(BufferId::Density, WriteMode::Full)]
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let ids = ctx.read_u32(BufferId::NeighborIds)?;
        let distances = ctx.read_f32(BufferId::NeighborDistances)?;
        let env = ctx.env();
        let c = env.coefficients;
        let mass = env.params.mass;
        let cap = env.neighbor_capacity;
        let exec = ctx.executor();

        let density = ctx.writes().f32_mut(BufferId::Density)?;
        exec.for_each(density, 1, |i, out| {
            let mut sum = 0.0f32;
            for k in i * cap..(i + 1) * cap {
                if ids[k] == NO_PARTICLE_ID {
                    break;
                }
                let r = distances[k];
                sum += poly6(&c, r * r);
            }
            out[0] = self_density(&c, mass) + mass * sum;
        });
        Ok(())
    }
}

/// Density at the predicted positions, over the step-start neighbor list.
#[derive(Clone, Copy, Debug, Default)]
pub struct PredictDensity;

impl Stage for PredictDensity {
    fn name(&self) -> &str {
        names::PREDICT_DENSITY
    }

    fn domain(&self) -> StageDomain {
        StageDomain::Particles
    }

    fn reads(&self) -> BufferSet {
        [BufferId::PredictedPosition, BufferId::NeighborIds]
            .into_iter()
            .collect()
    }

    fn writes(&self) -> Vec<(BufferId, WriteMode)> {
        vec![(BufferId::PredictedDensity, WriteMode::Full)]
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let predicted = ctx.read_f32(BufferId::PredictedPosition)?;
        let ids = ctx.read_u32(BufferId::NeighborIds)?;
        let env = ctx.env();
        let c = env.coefficients;
        let mass = env.params.mass;
        let scale = env.params.simulation_scale;
        let cap = env.neighbor_capacity;
        let exec = ctx.executor();

        let density = ctx.writes().f32_mut(BufferId::PredictedDensity)?;
        exec.for_each(density, 1, |i, out| {
            let pi = load3(predicted, i);
            let mut sum = 0.0f32;
            for &j in &ids[i * cap..(i + 1) * cap] {
                if j == NO_PARTICLE_ID {
                    break;
                }
                let r2 = (load3(predicted, j as usize) - pi).length_squared() * scale * scale;
                sum += poly6(&c, r2);
            }
            out[0] = self_density(&c, mass) + mass * sum;
        });
        Ok(())
    }
}
