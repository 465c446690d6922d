//! Read-only views of the published generation.

use indexmap::IndexMap;
use pcisph_core::{BufferId, ParticleCounts, ParticleKind};

use crate::arena::ParticleArena;
use crate::data::BufferData;

/// Owned copy of every allocated buffer, in catalogue order.
pub type BufferCapture = IndexMap<BufferId, BufferData>;

/// Borrowed view of the last published step, or of the staged one
/// (see [`ParticleArena::preview`]).
///
/// Position and velocity are in original particle order. Density and
/// pressure live in cell-sorted order inside the arena; the accessors
/// here map an original index through the back permutation.
#[derive(Clone, Copy, Debug)]
pub struct Snapshot<'a> {
    arena: &'a ParticleArena,
    staged: bool,
}

impl<'a> Snapshot<'a> {
    pub(crate) fn new(arena: &'a ParticleArena, staged: bool) -> Self {
        Self { arena, staged }
    }

    fn f32s(&self, id: BufferId) -> &'a [f32] {
        self.arena
            .view(id, self.staged)
            .ok()
            .and_then(BufferData::as_f32)
            .unwrap_or(&[])
    }

    fn u32s(&self, id: BufferId) -> &'a [u32] {
        self.arena
            .view(id, self.staged)
            .ok()
            .and_then(BufferData::as_u32)
            .unwrap_or(&[])
    }

    /// Number of particles.
    pub fn particle_count(&self) -> usize {
        self.positions().len() / 4
    }

    /// Per-kind counts from load.
    pub fn counts(&self) -> ParticleCounts {
        self.arena.counts()
    }

    /// Publishes since load, counting the staged one for a preview.
    pub fn generation(&self) -> u64 {
        self.arena.generation() + u64::from(self.staged)
    }

    /// Flat `(x, y, z, tag)` array.
    pub fn positions(&self) -> &'a [f32] {
        self.f32s(BufferId::Position)
    }

    /// Flat `(x, y, z, echo)` array.
    pub fn velocities(&self) -> &'a [f32] {
        self.f32s(BufferId::Velocity)
    }

    /// Position of original particle `i`.
    pub fn position(&self, i: usize) -> Option<[f32; 4]> {
        vec4(self.positions(), i)
    }

    /// Velocity of original particle `i`.
    pub fn velocity(&self, i: usize) -> Option<[f32; 4]> {
        vec4(self.velocities(), i)
    }

    /// Kind of original particle `i`.
    pub fn kind(&self, i: usize) -> Option<ParticleKind> {
        self.position(i).and_then(|p| ParticleKind::from_tag(p[3]))
    }

    /// Sorted slot of original particle `i`.
    pub fn sorted_slot(&self, i: usize) -> Option<usize> {
        self.u32s(BufferId::ParticleIndexBack)
            .get(i)
            .map(|&s| s as usize)
    }

    /// Density of original particle `i` from the last step.
    pub fn density(&self, i: usize) -> Option<f32> {
        let slot = self.sorted_slot(i)?;
        self.f32s(BufferId::Density).get(slot).copied()
    }

    /// Pressure of original particle `i` from the last step.
    pub fn pressure(&self, i: usize) -> Option<f32> {
        let slot = self.sorted_slot(i)?;
        self.f32s(BufferId::Pressure).get(slot).copied()
    }

    /// Current activation signal, one value per bundle slot.
    pub fn activation(&self) -> &'a [f32] {
        self.f32s(BufferId::Activation)
    }
}

fn vec4(flat: &[f32], i: usize) -> Option<[f32; 4]> {
    flat.get(i * 4..i * 4 + 4)
        .map(|v| [v[0], v[1], v[2], v[3]])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ArenaConfig;

    fn arena() -> ParticleArena {
        let mut arena = ParticleArena::new();
        arena.allocate(ArenaConfig::new(2, 4)).unwrap();
        arena
            .load(
                &[
                    [1.0, 2.0, 3.0, ParticleKind::LIQUID_TAG],
                    [4.0, 5.0, 6.0, ParticleKind::BOUNDARY_TAG],
                ],
                &[[0.5, 0.0, 0.0, ParticleKind::LIQUID_TAG], [0.0; 4]],
            )
            .unwrap();
        arena
    }

    #[test]
    fn reads_original_order_vectors() {
        let arena = arena();
        let snap = arena.snapshot();
        assert_eq!(snap.particle_count(), 2);
        assert_eq!(snap.position(1), Some([4.0, 5.0, 6.0, ParticleKind::BOUNDARY_TAG]));
        assert_eq!(snap.velocity(0).map(|v| v[0]), Some(0.5));
        assert_eq!(snap.kind(1), Some(ParticleKind::Boundary));
        assert_eq!(snap.position(2), None);
    }

    #[test]
    fn density_follows_back_permutation() {
        let mut arena = arena();
        let mut back = arena.checkout(BufferId::ParticleIndexBack, false).unwrap();
        back.as_u32_mut().unwrap().copy_from_slice(&[1, 0]);
        arena.checkin(BufferId::ParticleIndexBack, back);
        let mut density = arena.checkout(BufferId::Density, false).unwrap();
        density.as_f32_mut().unwrap().copy_from_slice(&[10.0, 20.0]);
        arena.checkin(BufferId::Density, density);

        let snap = arena.snapshot();
        assert_eq!(snap.density(0), Some(20.0));
        assert_eq!(snap.density(1), Some(10.0));
        assert_eq!(snap.pressure(0), Some(0.0));
    }

    #[test]
    fn unallocated_arena_reads_empty() {
        let arena = ParticleArena::new();
        let snap = arena.snapshot();
        assert_eq!(snap.particle_count(), 0);
        assert!(snap.activation().is_empty());
        assert_eq!(snap.density(0), None);
    }
}
