//! FIND_NEIGHBORS.

use std::sync::atomic::{AtomicUsize, Ordering};

use pcisph_core::{BufferId, BufferSet, StageError};
use pcisph_grid::NeighborQuery;
use pcisph_stage::{Stage, StageContext, StageDomain, WriteMode};

use crate::names;

/// Fills each sorted particle's fixed-capacity neighbor list from the
/// 27-cell stencil around it.
///
/// Lists that hit capacity are truncated and counted; the count is
/// reported through [`StageContext::note_truncated`].
#[derive(Clone, Copy, Debug, Default)]
pub struct FindNeighbors;

impl Stage for FindNeighbors {
    fn name(&self) -> &str {
        names::FIND_NEIGHBORS
    }

    fn domain(&self) -> StageDomain {
        StageDomain::Particles
    }

    fn reads(&self) -> BufferSet {
        [BufferId::SortedPosition, BufferId::GridCellIndexFixed]
            .into_iter()
            .collect()
    }

    fn writes(&self) -> Vec<(BufferId, WriteMode)> {
        vec![
            (BufferId::NeighborIds, WriteMode::Full),
            (BufferId::NeighborDistances, WriteMode::Full),
        ]
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let env = ctx.env();
        let query = NeighborQuery {
            geometry: env.grid,
            bucket_table: ctx.read_u32(BufferId::GridCellIndexFixed)?,
            sorted_positions: ctx.read_f32(BufferId::SortedPosition)?,
            radius: env.params.h,
            simulation_scale: env.params.simulation_scale,
        };
        let capacity = env.neighbor_capacity;
        let exec = ctx.executor();
        let truncated = AtomicUsize::new(0);

        let (ids, distances) = ctx
            .writes()
            .u32_f32_mut(BufferId::NeighborIds, BufferId::NeighborDistances)?;
        exec.for_each_pair(ids, capacity, distances, capacity, |i, ids, distances| {
            if query.scan(i, ids, distances).truncated {
                truncated.fetch_add(1, Ordering::Relaxed);
            }
        });

        ctx.note_truncated(truncated.into_inner());
        Ok(())
    }
}
