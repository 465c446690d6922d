//! Reusable scenes.
//!
//! Every fixture uses the default smoothing radius (3.34 scene units)
//! and keeps its particles well inside the bounding box. Random jitter
//! comes from a seeded ChaCha8 stream, so equal seeds give equal scenes.

use pcisph_core::{ElasticConnection, ModelInput, ParticleId, ParticleKind, SceneBounds};
use rand_chacha::rand_core::{RngCore, SeedableRng};
use rand_chacha::ChaCha8Rng;

/// Lattice spacing of liquid fixtures: half the default smoothing radius.
pub const SPACING: f32 = 1.67;

/// One liquid particle in the middle of a 20-unit box.
pub fn single_particle() -> ModelInput {
    let mut model = ModelInput::new(SceneBounds::new([0.0; 3], [20.0; 3]));
    model.push_particle([10.0, 10.0, 10.0], ParticleKind::Liquid);
    model
}

/// A jittered block of `dims` liquid particles, resting 2 units above the
/// floor of a box sized to hold it with room to fall and spread.
pub fn liquid_block(dims: [usize; 3], seed: u64) -> ModelInput {
    let mut model = ModelInput::new(block_bounds(dims));
    push_block(&mut model, dims, [2.0, 2.0, 2.0], seed);
    model
}

/// [`liquid_block`] on top of a one-layer boundary floor covering the
/// whole box.
pub fn tank(dims: [usize; 3], seed: u64) -> ModelInput {
    let bounds = block_bounds(dims);
    let mut model = ModelInput::new(bounds);
    let [nx, _, nz] = lattice_count(&bounds);
    for ix in 0..nx {
        for iz in 0..nz {
            let p = [ix as f32 * SPACING, 0.0, iz as f32 * SPACING];
            model.push_particle(p, ParticleKind::Boundary);
        }
    }
    push_block(&mut model, dims, [2.0, 2.0 + SPACING, 2.0], seed);
    model
}

/// A straight row of `length` elastic particles along x, each joined to
/// its successor by a spring at rest length, all driven by bundle 0.
pub fn elastic_beam(length: usize) -> ModelInput {
    let spacing = 1.0;
    let extent = length as f32 * spacing + 8.0;
    let mut model = ModelInput::new(SceneBounds::new([0.0; 3], [extent, 20.0, 20.0]));
    for i in 0..length {
        model.push_particle([4.0 + i as f32 * spacing, 10.0, 10.0], ParticleKind::Elastic);
    }
    for i in 1..length {
        let (a, b) = (ParticleId(i as u32 - 1), ParticleId(i as u32));
        for (particle, partner) in [(a, b), (b, a)] {
            model.connections.push(ElasticConnection {
                particle,
                partner,
                rest_distance: spacing,
                stiffness: 1.0,
                bundle: 0,
            });
        }
    }
    model.bundle_count = 1;
    model
}

/// A boundary particle with two liquid particles at exactly its
/// coordinates, plus one well-separated liquid particle.
pub fn degenerate_overlap() -> ModelInput {
    let mut model = ModelInput::new(SceneBounds::new([0.0; 3], [20.0; 3]));
    model.push_particle([5.0, 5.0, 5.0], ParticleKind::Boundary);
    model.push_particle([5.0, 5.0, 5.0], ParticleKind::Liquid);
    model.push_particle([5.0, 5.0, 5.0], ParticleKind::Liquid);
    model.push_particle([15.0, 15.0, 15.0], ParticleKind::Liquid);
    model
}

fn block_bounds(dims: [usize; 3]) -> SceneBounds {
    let size = dims.map(|n| n as f32 * SPACING);
    SceneBounds::new(
        [0.0; 3],
        [size[0] * 2.0 + 4.0, size[1] + 8.0, size[2] * 2.0 + 4.0],
    )
}

fn lattice_count(bounds: &SceneBounds) -> [usize; 3] {
    bounds.extent().map(|e| (e / SPACING).floor() as usize + 1)
}

fn push_block(model: &mut ModelInput, dims: [usize; 3], origin: [f32; 3], seed: u64) {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    let mut jitter = || (rng.next_u32() as f32 / u32::MAX as f32 - 0.5) * 0.1 * SPACING;
    for ix in 0..dims[0] {
        for iy in 0..dims[1] {
            for iz in 0..dims[2] {
                let p = [
                    origin[0] + ix as f32 * SPACING + jitter(),
                    origin[1] + iy as f32 * SPACING + jitter(),
                    origin[2] + iz as f32 * SPACING + jitter(),
                ];
                model.push_particle(p, ParticleKind::Liquid);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fixtures_validate() {
        for model in [
            single_particle(),
            liquid_block([4, 4, 4], 1),
            tank([3, 2, 3], 2),
            elastic_beam(5),
            degenerate_overlap(),
        ] {
            let counts = model.validate().unwrap();
            assert_eq!(counts.total, model.particle_count());
            assert!(model
                .positions
                .iter()
                .all(|p| model.bounds.contains([p[0], p[1], p[2]])));
        }
    }

    #[test]
    fn seeds_are_reproducible() {
        assert_eq!(liquid_block([3, 3, 3], 9), liquid_block([3, 3, 3], 9));
        assert_ne!(liquid_block([3, 3, 3], 9), liquid_block([3, 3, 3], 10));
    }

    #[test]
    fn beam_connections_pair_up() {
        let beam = elastic_beam(4);
        assert_eq!(beam.connections.len(), 6);
        assert_eq!(beam.validate().unwrap().elastic, 4);
    }
}
