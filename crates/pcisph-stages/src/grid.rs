//! Spatial index stages: CLEAR, HASH, SORT, SORT_POST_PASS, INDEX and
//! INDEX_POST_PASS.
//!
//! ```text
//! CLEAR ─→ HASH ─→ [barrier] SORT ─→ SORT_POST_PASS ─→ INDEX ─→ [barrier] INDEX_POST_PASS
//! ```

use std::sync::{Mutex, PoisonError};

use pcisph_core::{BufferId, BufferSet, StageError, NO_CELL_ID};
use pcisph_grid::{first_particle_in_cell, fix_bucket_table, inverse_permutation, sort_by_cell};
use pcisph_stage::{Stage, StageContext, StageDomain, WriteMode};

use crate::kernels::load3;
use crate::names;

/// Resets every bucket-table entry to [`NO_CELL_ID`].
#[derive(Clone, Copy, Debug, Default)]
pub struct Clear;

impl Stage for Clear {
    fn name(&self) -> &str {
        names::CLEAR
    }

    fn domain(&self) -> StageDomain {
        StageDomain::Cells
    }

    fn reads(&self) -> BufferSet {
        BufferSet::empty()
    }

    fn writes(&self) -> Vec<(BufferId, WriteMode)> {
        vec![(BufferId::GridCellIndex, WriteMode::Full)]
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let exec = ctx.executor();
        let table = ctx.writes().u32_mut(BufferId::GridCellIndex)?;
        exec.for_each(table, 1, |_, entry| entry[0] = NO_CELL_ID);
        Ok(())
    }
}

/// Hashes each particle to its cell and seeds the identity permutation.
#[derive(Clone, Copy, Debug, Default)]
pub struct Hash;

impl Stage for Hash {
    fn name(&self) -> &str {
        names::HASH
    }

    fn domain(&self) -> StageDomain {
        StageDomain::Particles
    }

    fn reads(&self) -> BufferSet {
        [BufferId::Position].into_iter().collect()
    }

    fn writes(&self) -> Vec<(BufferId, WriteMode)> {
        vec![
            (BufferId::ParticleCell, WriteMode::Full),
            (BufferId::ParticleIndex, WriteMode::Full),
        ]
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let positions = ctx.read_f32(BufferId::Position)?;
        let grid = ctx.env().grid;
        let exec = ctx.executor();
        let (cells, index) = ctx
            .writes()
            .u32_pair_mut(BufferId::ParticleCell, BufferId::ParticleIndex)?;
        exec.for_each_pair(cells, 1, index, 1, |i, cell, original| {
            cell[0] = grid.hash(load3(positions, i).to_array()).0;
            original[0] = i as u32;
        });
        Ok(())
    }
}

/// Host-side sort of the `(cell, particle)` pairs by cell.
///
/// The pair scratch lives with the stage and keeps its capacity between
/// steps.
#[derive(Debug, Default)]
pub struct Sort {
    scratch: Mutex<Vec<(u32, u32)>>,
}

impl Sort {
    /// A sort stage with an empty scratch buffer.
    pub fn new() -> Self {
        Self::default()
    }
}

impl Stage for Sort {
    fn name(&self) -> &str {
        names::SORT
    }

    fn domain(&self) -> StageDomain {
        StageDomain::Host
    }

    fn reads(&self) -> BufferSet {
        BufferSet::empty()
    }

    fn writes(&self) -> Vec<(BufferId, WriteMode)> {
        vec![
            (BufferId::ParticleCell, WriteMode::Incremental),
            (BufferId::ParticleIndex, WriteMode::Incremental),
        ]
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let (cells, index) = ctx
            .writes()
            .u32_pair_mut(BufferId::ParticleCell, BufferId::ParticleIndex)?;
        let mut scratch = self.scratch.lock().unwrap_or_else(PoisonError::into_inner);
        sort_by_cell(cells, index, &mut scratch);
        Ok(())
    }
}

/// Builds the back permutation and gathers position and velocity into
/// sorted order.
#[derive(Clone, Copy, Debug, Default)]
pub struct SortPostPass;

impl Stage for SortPostPass {
    fn name(&self) -> &str {
        names::SORT_POST_PASS
    }

    fn domain(&self) -> StageDomain {
        StageDomain::Particles
    }

    fn reads(&self) -> BufferSet {
        [BufferId::ParticleIndex, BufferId::Position, BufferId::Velocity]
            .into_iter()
            .collect()
    }

    fn writes(&self) -> Vec<(BufferId, WriteMode)> {
        vec![
            (BufferId::ParticleIndexBack, WriteMode::Full),
            (BufferId::SortedPosition, WriteMode::Full),
            (BufferId::SortedVelocity, WriteMode::Full),
        ]
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let index = ctx.read_u32(BufferId::ParticleIndex)?;
        let positions = ctx.read_f32(BufferId::Position)?;
        let velocities = ctx.read_f32(BufferId::Velocity)?;
        let exec = ctx.executor();

        if let Some(&bad) = index.iter().find(|&&o| o as usize >= index.len()) {
            return Err(StageError::ExecutionFailed {
                reason: format!("sort permutation entry {bad} out of range"),
            });
        }
        inverse_permutation(index, ctx.writes().u32_mut(BufferId::ParticleIndexBack)?);

        let (sorted_pos, sorted_vel) = ctx
            .writes()
            .f32_pair_mut(BufferId::SortedPosition, BufferId::SortedVelocity)?;
        exec.for_each_pair(sorted_pos, 4, sorted_vel, 4, |i, p, v| {
            let o = index[i] as usize * 4;
            p.copy_from_slice(&positions[o..o + 4]);
            v.copy_from_slice(&velocities[o..o + 4]);
        });
        Ok(())
    }
}

/// Records, per cell, the first sorted particle in it.
#[derive(Clone, Copy, Debug, Default)]
pub struct Index;

impl Stage for Index {
    fn name(&self) -> &str {
        names::INDEX
    }

    fn domain(&self) -> StageDomain {
        StageDomain::Cells
    }

    fn reads(&self) -> BufferSet {
        [BufferId::ParticleCell].into_iter().collect()
    }

    fn writes(&self) -> Vec<(BufferId, WriteMode)> {
        vec![(BufferId::GridCellIndex, WriteMode::Full)]
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let sorted_cells = ctx.read_u32(BufferId::ParticleCell)?;
        let exec = ctx.executor();
        let table = ctx.writes().u32_mut(BufferId::GridCellIndex)?;
        exec.for_each(table, 1, |cell, entry| {
            entry[0] = first_particle_in_cell(sorted_cells, cell as u32);
        });
        Ok(())
    }
}

/// Forward-fills empty cells into the fixed bucket table on the host.
#[derive(Clone, Copy, Debug, Default)]
pub struct IndexPostPass;

impl Stage for IndexPostPass {
    fn name(&self) -> &str {
        names::INDEX_POST_PASS
    }

    fn domain(&self) -> StageDomain {
        StageDomain::Host
    }

    fn reads(&self) -> BufferSet {
        [BufferId::GridCellIndex].into_iter().collect()
    }

    fn writes(&self) -> Vec<(BufferId, WriteMode)> {
        vec![(BufferId::GridCellIndexFixed, WriteMode::Full)]
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let table = ctx.read_u32(BufferId::GridCellIndex)?;
        let particle_count = ctx.env().counts.total as u32;
        let fixed = ctx.writes().u32_mut(BufferId::GridCellIndexFixed)?;
        if fixed.len() != table.len() {
            return Err(StageError::ExecutionFailed {
                reason: format!(
                    "bucket tables disagree in length ({} vs {})",
                    table.len(),
                    fixed.len()
                ),
            });
        }
        fixed.copy_from_slice(table);
        fix_bucket_table(fixed, particle_count);
        Ok(())
    }
}
