//! Per-step particle report.

use pcisph_arena::Snapshot;
use pcisph_core::{ParticleId, ParticleKind};

/// Scattered position and velocity of every non-boundary particle after
/// a step, in original order.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ParticleReport {
    /// Publishes since load when the report was taken.
    pub generation: u64,
    /// Original ids of the reported particles.
    pub ids: Vec<ParticleId>,
    /// `(x, y, z, tag)` per reported particle.
    pub positions: Vec<[f32; 4]>,
    /// `(x, y, z, echo)` per reported particle.
    pub velocities: Vec<[f32; 4]>,
}

impl ParticleReport {
    /// Copy the non-boundary particles out of `snapshot`.
    pub fn capture(snapshot: &Snapshot<'_>) -> Self {
        let count = snapshot.counts().non_boundary();
        let mut report = Self {
            generation: snapshot.generation(),
            ids: Vec::with_capacity(count),
            positions: Vec::with_capacity(count),
            velocities: Vec::with_capacity(count),
        };
        for i in 0..snapshot.particle_count() {
            if snapshot.kind(i) == Some(ParticleKind::Boundary) {
                continue;
            }
            if let (Some(p), Some(v)) = (snapshot.position(i), snapshot.velocity(i)) {
                report.ids.push(ParticleId(i as u32));
                report.positions.push(p);
                report.velocities.push(v);
            }
        }
        report
    }

    /// Number of reported particles.
    pub fn len(&self) -> usize {
        self.ids.len()
    }

    /// Whether nothing was reported.
    pub fn is_empty(&self) -> bool {
        self.ids.is_empty()
    }

    /// `(id, position, velocity)` triples.
    pub fn iter(&self) -> impl Iterator<Item = (ParticleId, &[f32; 4], &[f32; 4])> + '_ {
        self.ids
            .iter()
            .zip(&self.positions)
            .zip(&self.velocities)
            .map(|((&id, p), v)| (id, p, v))
    }
}
