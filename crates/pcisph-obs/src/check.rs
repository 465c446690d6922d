//! Sanity checks the solver leaves to its caller.

use std::fmt;

use indexmap::IndexMap;
use pcisph_arena::Snapshot;
use pcisph_core::{BufferId, ModelInput, ParticleId, ParticleKind};

/// First non-finite value found in a snapshot.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct NonFinite {
    /// Buffer holding the value.
    pub buffer: BufferId,
    /// Original particle it belongs to.
    pub particle: ParticleId,
    /// The value itself (NaN or ±∞).
    pub value: f32,
}

impl fmt::Display for NonFinite {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "non-finite {} {} for {}",
            self.buffer, self.value, self.particle
        )
    }
}

/// Scan position, velocity, density and pressure for NaN or infinity.
///
/// Particles are visited in original order; within a particle the
/// buffers are checked in that order. `None` means everything is finite.
pub fn scan_non_finite(snapshot: &Snapshot<'_>) -> Option<NonFinite> {
    let hit = |buffer, i: usize, value: f32| {
        (!value.is_finite()).then_some(NonFinite {
            buffer,
            particle: ParticleId(i as u32),
            value,
        })
    };
    (0..snapshot.particle_count()).find_map(|i| {
        let lanes = |v: Option<[f32; 4]>| v.into_iter().flat_map(|v| v.into_iter().take(3));
        lanes(snapshot.position(i))
            .find_map(|x| hit(BufferId::Position, i, x))
            .or_else(|| lanes(snapshot.velocity(i)).find_map(|x| hit(BufferId::Velocity, i, x)))
            .or_else(|| snapshot.density(i).and_then(|x| hit(BufferId::Density, i, x)))
            .or_else(|| snapshot.pressure(i).and_then(|x| hit(BufferId::Pressure, i, x)))
    })
}

/// A non-boundary particle sitting exactly on a boundary particle.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Overlap {
    /// The mobile particle.
    pub particle: ParticleId,
    /// The boundary particle it coincides with.
    pub boundary: ParticleId,
}

/// Non-boundary particles whose coordinates equal a boundary
/// particle's bit for bit (`-0.0` and `0.0` count as equal).
///
/// Such scenes are degenerate: the coincident pair has zero separation
/// and no defined direction.
pub fn overlapping_particles(model: &ModelInput) -> Vec<Overlap> {
    let key = |p: &[f32; 4]| [p[0] + 0.0, p[1] + 0.0, p[2] + 0.0].map(f32::to_bits);
    let is_boundary = |p: &[f32; 4]| ParticleKind::from_tag(p[3]) == Some(ParticleKind::Boundary);

    let mut walls: IndexMap<[u32; 3], ParticleId> = IndexMap::new();
    for (i, p) in model.positions.iter().enumerate() {
        if is_boundary(p) {
            walls.entry(key(p)).or_insert(ParticleId(i as u32));
        }
    }
    model
        .positions
        .iter()
        .enumerate()
        .filter(|(_, p)| !is_boundary(p))
        .filter_map(|(i, p)| {
            walls.get(&key(p)).map(|&boundary| Overlap {
                particle: ParticleId(i as u32),
                boundary,
            })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcisph_arena::{ArenaConfig, ParticleArena};
    use pcisph_test_utils::fixtures;

    fn arena(positions: &[[f32; 4]]) -> ParticleArena {
        let mut arena = ParticleArena::new();
        arena
            .allocate(ArenaConfig::new(positions.len(), 1))
            .unwrap();
        let velocities: Vec<[f32; 4]> = positions.iter().map(|p| [0.0, 0.0, 0.0, p[3]]).collect();
        arena.load(positions, &velocities).unwrap();
        arena
    }

    #[test]
    fn finite_snapshot_is_clean() {
        let l = ParticleKind::LIQUID_TAG;
        let arena = arena(&[[1.0, 2.0, 3.0, l], [4.0, 5.0, 6.0, l]]);
        assert_eq!(scan_non_finite(&arena.snapshot()), None);
    }

    #[test]
    fn reports_first_non_finite_lane() {
        let l = ParticleKind::LIQUID_TAG;
        let arena = arena(&[[1.0, 2.0, 3.0, l], [4.0, f32::INFINITY, f32::NAN, l]]);
        let found = scan_non_finite(&arena.snapshot()).unwrap();
        assert_eq!(found.buffer, BufferId::Position);
        assert_eq!(found.particle, ParticleId(1));
        assert_eq!(found.value, f32::INFINITY);
        assert!(found.to_string().contains("position"));
    }

    #[test]
    fn flags_particles_on_boundary_coordinates() {
        let model = fixtures::degenerate_overlap();
        let overlaps = overlapping_particles(&model);
        assert_eq!(overlaps.len(), 2);
        assert!(overlaps.iter().all(|o| o.boundary == ParticleId(0)));
        assert_eq!(overlaps[1].particle, ParticleId(2));
    }

    #[test]
    fn separated_scene_has_no_overlaps() {
        let model = fixtures::tank([3, 3, 3], 7);
        assert!(overlapping_particles(&model).is_empty());
    }

    #[test]
    fn signed_zero_counts_as_overlap() {
        let mut model = ModelInput::new(pcisph_core::SceneBounds::new([-1.0; 3], [1.0; 3]));
        model.push_particle([0.0, 0.0, 0.0], ParticleKind::Boundary);
        model.push_particle([-0.0, 0.0, 0.0], ParticleKind::Liquid);
        assert_eq!(overlapping_particles(&model).len(), 1);
    }
}
