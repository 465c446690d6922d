//! COMPUTE_FORCES_INIT_PRESSURE and COMPUTE_ELASTIC_FORCES.

use glam::Vec3;
use pcisph_core::{BufferId, BufferSet, StageError, NO_PARTICLE_ID};
use pcisph_stage::{Stage, StageContext, StageDomain, WriteMode};

use crate::kernels::{is_boundary, load3, store3, viscosity_laplacian};
use crate::names;

/// Non-pressure acceleration (viscosity plus gravity), the initial
/// pressure estimate, and a zeroed pressure acceleration.
///
/// Initial pressure is `stiffness * max(density - rest_density, 0)`.
/// Boundary particles get zero acceleration.
#[derive(Clone, Copy, Debug, Default)]
pub struct ComputeForcesInitPressure;

impl Stage for ComputeForcesInitPressure {
    fn name(&self) -> &str {
        names::COMPUTE_FORCES_INIT_PRESSURE
    }

    fn domain(&self) -> StageDomain {
        StageDomain::Particles
    }

    fn reads(&self) -> BufferSet {
        [
            BufferId::SortedPosition,
            BufferId::SortedVelocity,
            BufferId::Density,
            BufferId::NeighborIds,
            BufferId::NeighborDistances,
        ]
        .into_iter()
        .collect()
    }

    fn writes(&self) -> Vec<(BufferId, WriteMode)> {
        vec![
            (BufferId::Acceleration, WriteMode::Full),
            (BufferId::Pressure, WriteMode::Full),
            (BufferId::PressureAcceleration, WriteMode::Full),
        ]
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let positions = ctx.read_f32(BufferId::SortedPosition)?;
        let velocities = ctx.read_f32(BufferId::SortedVelocity)?;
        let density = ctx.read_f32(BufferId::Density)?;
        let ids = ctx.read_u32(BufferId::NeighborIds)?;
        let distances = ctx.read_f32(BufferId::NeighborDistances)?;
        let env = ctx.env();
        let params = env.params;
        let c = env.coefficients;
        let cap = env.neighbor_capacity;
        let gravity = Vec3::from(params.gravity);
        let exec = ctx.executor();

        ctx.writes()
            .f32_mut(BufferId::PressureAcceleration)?
            .fill(0.0);

        let (acceleration, pressure) = ctx
            .writes()
            .f32_pair_mut(BufferId::Acceleration, BufferId::Pressure)?;
        exec.for_each_pair(acceleration, 4, pressure, 1, |i, a, p| {
            let rho_i = density[i];
            p[0] = params.stiffness * (rho_i - params.rest_density).max(0.0);

            a.fill(0.0);
            if is_boundary(positions[i * 4 + 3]) {
                return;
            }
            let vi = load3(velocities, i);
            let mut viscous = Vec3::ZERO;
            for k in i * cap..(i + 1) * cap {
                let j = ids[k];
                if j == NO_PARTICLE_ID {
                    break;
                }
                let j = j as usize;
                viscous += (load3(velocities, j) - vi)
                    * (viscosity_laplacian(&c, distances[k]) / density[j]);
            }
            let accel = viscous * (params.viscosity * params.mass / rho_i) + gravity;
            store3(a, accel);
        });
        Ok(())
    }
}

/// Spring and muscle acceleration of elastic particles, added into the
/// non-pressure acceleration.
///
/// Each connection pulls its owner toward the partner with
/// `elasticity * stiffness * (distance - rest)` plus
/// `activation[bundle] * muscle_acceleration`. A bundle with no
/// activation slot of its own reads slot 0.
#[derive(Clone, Copy, Debug, Default)]
pub struct ComputeElasticForces;

impl Stage for ComputeElasticForces {
    fn name(&self) -> &str {
        names::COMPUTE_ELASTIC_FORCES
    }

    fn domain(&self) -> StageDomain {
        StageDomain::Particles
    }

    fn reads(&self) -> BufferSet {
        [
            BufferId::SortedPosition,
            BufferId::ParticleIndex,
            BufferId::ParticleIndexBack,
            BufferId::ElasticIndex,
            BufferId::ElasticConnections,
            BufferId::Activation,
        ]
        .into_iter()
        .collect()
    }

    fn writes(&self) -> Vec<(BufferId, WriteMode)> {
        vec![(BufferId::Acceleration, WriteMode::Incremental)]
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let positions = ctx.read_f32(BufferId::SortedPosition)?;
        let index = ctx.read_u32(BufferId::ParticleIndex)?;
        let back = ctx.read_u32(BufferId::ParticleIndexBack)?;
        let elastic_index = ctx.read_u32(BufferId::ElasticIndex)?;
        let connections = ctx.read_f32(BufferId::ElasticConnections)?;
        let activation = ctx.read_f32(BufferId::Activation)?;
        let env = ctx.env();
        let params = env.params;
        let scale = params.simulation_scale;
        let cap = env.neighbor_capacity;
        let exec = ctx.executor();

        let acceleration = ctx.writes().f32_mut(BufferId::Acceleration)?;
        exec.for_each(acceleration, 4, |i, a| {
            let slot = elastic_index[index[i] as usize];
            if slot == NO_PARTICLE_ID {
                return;
            }
            let pi = load3(positions, i);
            let mut pull = Vec3::ZERO;
            let block = slot as usize * cap * 4;
            for conn in connections[block..block + cap * 4].chunks_exact(4) {
                if conn[0] < 0.0 {
                    break;
                }
                let Some(&j) = back.get(conn[0] as usize) else {
                    continue;
                };
                let d = (load3(positions, j as usize) - pi) * scale;
                let len = d.length();
                if len <= 0.0 {
                    continue;
                }
                let (rest, stiffness, bundle) = (conn[1], conn[2], conn[3] as usize);
                let signal = activation
                    .get(bundle)
                    .or_else(|| activation.first())
                    .copied()
                    .unwrap_or(0.0);
                let magnitude = params.elasticity * stiffness * (len - rest)
                    + signal * params.muscle_acceleration;
                pull += d / len * magnitude;
            }
            a[0] += pull.x;
            a[1] += pull.y;
            a[2] += pull.z;
        });
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::Harness;
    use pcisph_core::ParticleKind::{Boundary, Elastic, Liquid};
    use pcisph_core::{ElasticConnection, ParticleId};

    #[test]
    fn isolated_particle_feels_only_gravity() {
        let mut h = Harness::new([20.0; 3], &[([10.0, 10.0, 10.0], Liquid)]);
        h.run_through(names::COMPUTE_FORCES_INIT_PRESSURE);
        let a = h.f32s(BufferId::Acceleration);
        assert_eq!(&a[..3], &h.params.gravity);
        // Self density is far below rest density: no pressure.
        assert_eq!(h.f32s(BufferId::Pressure), vec![0.0]);
        assert_eq!(h.f32s(BufferId::PressureAcceleration), vec![0.0; 4]);
    }

    #[test]
    fn boundary_particles_get_no_acceleration() {
        let mut h = Harness::new(
            [20.0; 3],
            &[([10.0, 10.0, 10.0], Boundary), ([10.5, 10.0, 10.0], Liquid)],
        );
        h.run_through(names::COMPUTE_FORCES_INIT_PRESSURE);
        let back = h.u32s(BufferId::ParticleIndexBack);
        let a = h.f32s(BufferId::Acceleration);
        let b = back[0] as usize;
        assert_eq!(&a[b * 4..b * 4 + 4], &[0.0; 4]);
    }

    #[test]
    fn viscosity_drags_toward_neighbor_velocity() {
        let mut h = Harness::new(
            [20.0; 3],
            &[([10.0, 10.0, 10.0], Liquid), ([11.0, 10.0, 10.0], Liquid)],
        );
        h.params.gravity = [0.0; 3];
        h.set_velocity(1, [0.0, 1.0, 0.0]);
        h.run_through(names::COMPUTE_FORCES_INIT_PRESSURE);
        let back = h.u32s(BufferId::ParticleIndexBack);
        let a = h.f32s(BufferId::Acceleration);
        let i0 = back[0] as usize;
        let i1 = back[1] as usize;
        assert!(a[i0 * 4 + 1] > 0.0);
        assert!(a[i1 * 4 + 1] < 0.0);
    }

    fn spring(rest: f32) -> Harness {
        let mut h = Harness::with_connections(
            [20.0; 3],
            &[([10.0, 10.0, 10.0], Elastic), ([12.0, 10.0, 10.0], Elastic)],
            &[ElasticConnection {
                particle: ParticleId(0),
                partner: ParticleId(1),
                rest_distance: rest,
                stiffness: 1.0,
                bundle: 0,
            }],
        );
        h.params.gravity = [0.0; 3];
        h.params.viscosity = 0.0;
        h
    }

    fn owner_accel_x(h: &Harness) -> f32 {
        let back = h.u32s(BufferId::ParticleIndexBack);
        h.f32s(BufferId::Acceleration)[back[0] as usize * 4]
    }

    #[test]
    fn stretched_spring_pulls_owner_toward_partner() {
        let mut h = spring(1.0);
        h.run_through(names::COMPUTE_ELASTIC_FORCES);
        assert!(owner_accel_x(&h) > 0.0);
        // Only the owner carries the connection.
        let back = h.u32s(BufferId::ParticleIndexBack);
        assert_eq!(h.f32s(BufferId::Acceleration)[back[1] as usize * 4], 0.0);
    }

    #[test]
    fn compressed_spring_pushes_owner_away() {
        let mut h = spring(4.0);
        h.run_through(names::COMPUTE_ELASTIC_FORCES);
        assert!(owner_accel_x(&h) < 0.0);
    }

    #[test]
    fn activation_adds_contraction() {
        let mut relaxed = spring(2.0);
        relaxed.run_through(names::COMPUTE_ELASTIC_FORCES);
        assert!(owner_accel_x(&relaxed).abs() < 1e-3);

        let mut active = spring(2.0);
        active.arena.set_activation(&[1.0]).unwrap();
        active.run_through(names::COMPUTE_ELASTIC_FORCES);
        let expected = active.params.muscle_acceleration;
        assert!((owner_accel_x(&active) - expected).abs() < 1e-2);
    }
}
