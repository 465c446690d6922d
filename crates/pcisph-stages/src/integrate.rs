//! INTEGRATE: advance the staging generation of position and velocity.

use pcisph_core::{BufferId, BufferSet, StageError};
use pcisph_stage::{Stage, StageContext, StageDomain, WriteMode};

use crate::kernels::{is_boundary, load3, reflect, store3};
use crate::names;

/// Semi-implicit Euler over the total acceleration, scattered back to
/// original particle order.
///
/// Output index `o` is the original particle; its sorted slot comes
/// from `ParticleIndexBack`. Positions leaving the scene bounds are
/// clamped and the offending velocity components reflected with
/// `damping`. Boundary particles are copied unchanged. Type tags in the
/// `w` lanes are preserved.
#[derive(Clone, Copy, Debug, Default)]
pub struct Integrate;

impl Stage for Integrate {
    fn name(&self) -> &str {
        names::INTEGRATE
    }

    fn domain(&self) -> StageDomain {
        StageDomain::Particles
    }

    fn reads(&self) -> BufferSet {
        [
            BufferId::Position,
            BufferId::Velocity,
            BufferId::SortedPosition,
            BufferId::SortedVelocity,
            BufferId::Acceleration,
            BufferId::PressureAcceleration,
            BufferId::ParticleIndexBack,
        ]
        .into_iter()
        .collect()
    }

    fn writes(&self) -> Vec<(BufferId, WriteMode)> {
        vec![
            (BufferId::Position, WriteMode::Full),
            (BufferId::Velocity, WriteMode::Full),
        ]
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let published_pos = ctx.read_f32(BufferId::Position)?;
        let published_vel = ctx.read_f32(BufferId::Velocity)?;
        let sorted_pos = ctx.read_f32(BufferId::SortedPosition)?;
        let sorted_vel = ctx.read_f32(BufferId::SortedVelocity)?;
        let acceleration = ctx.read_f32(BufferId::Acceleration)?;
        let pressure_acceleration = ctx.read_f32(BufferId::PressureAcceleration)?;
        let back = ctx.read_u32(BufferId::ParticleIndexBack)?;
        let env = ctx.env();
        let dt = env.coefficients.time_step;
        let scale = env.params.simulation_scale;
        let damping = env.params.damping;
        let bounds = env.bounds;
        let exec = ctx.executor();

        let (positions, velocities) = ctx
            .writes()
            .f32_pair_mut(BufferId::Position, BufferId::Velocity)?;
        exec.for_each_pair(positions, 4, velocities, 4, |o, p, v| {
            let src = o * 4;
            if is_boundary(published_pos[src + 3]) {
                p.copy_from_slice(&published_pos[src..src + 4]);
                v.copy_from_slice(&published_vel[src..src + 4]);
                return;
            }
            let i = back[o] as usize;
            let a = load3(acceleration, i) + load3(pressure_acceleration, i);
            let vel = load3(sorted_vel, i) + a * dt;
            let pos = load3(sorted_pos, i) + vel * (dt / scale);
            let (pos, vel) = reflect(pos, vel, &bounds, damping);
            store3(p, pos);
            store3(v, vel);
            p[3] = sorted_pos[i * 4 + 3];
            v[3] = sorted_vel[i * 4 + 3];
        });
        Ok(())
    }
}
