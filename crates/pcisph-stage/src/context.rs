//! Execution context passed to stages.
//!
//! [`StageContext`] splits buffer access the same way the arena does:
//! declared reads come from the published generation through a shared
//! borrow of the arena, declared writes are owned buffers checked out
//! into a [`WriteSet`]. Because the two never alias, a stage can hold
//! read slices while it fills its outputs.

use pcisph_arena::{BufferData, ParticleArena};
use pcisph_backend::Executor;
use pcisph_core::{
    BufferId, BufferSet, KernelCoefficients, ParticleCounts, SceneBounds, SphParams, StageError,
};
use pcisph_grid::GridGeometry;

/// Per-step constants shared by every stage.
#[derive(Clone, Debug)]
pub struct StepEnv<'a> {
    /// Physical parameters.
    pub params: &'a SphParams,
    /// Coefficients derived for this step's `dt`.
    pub coefficients: KernelCoefficients,
    /// Lattice of the spatial index.
    pub grid: &'a GridGeometry,
    /// Scene bounding box, scene units.
    pub bounds: SceneBounds,
    /// Per-kind particle counts.
    pub counts: ParticleCounts,
    /// Neighbor slots per particle.
    pub neighbor_capacity: usize,
    /// Correction pass index for stages inside the iterative loop, else 0.
    pub iteration: u32,
}

/// Buffers checked out for one stage invocation.
#[derive(Debug, Default)]
pub struct WriteSet {
    entries: Vec<(BufferId, BufferData)>,
}

impl WriteSet {
    /// An empty set.
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a checked-out buffer.
    pub fn insert(&mut self, id: BufferId, data: BufferData) {
        self.entries.push((id, data));
    }

    /// Ids held, in insertion order.
    pub fn ids(&self) -> impl Iterator<Item = BufferId> + '_ {
        self.entries.iter().map(|(id, _)| *id)
    }

    /// Number of buffers held.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether no buffers are held.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Hand every buffer back, emptying the set.
    pub fn drain(&mut self) -> impl Iterator<Item = (BufferId, BufferData)> + '_ {
        self.entries.drain(..)
    }

    /// Shared view of a held buffer.
    pub fn get(&self, id: BufferId) -> Option<&BufferData> {
        self.entries.iter().find(|(b, _)| *b == id).map(|(_, d)| d)
    }

    fn get_mut(&mut self, id: BufferId) -> Result<&mut BufferData, StageError> {
        self.entries
            .iter_mut()
            .find(|(b, _)| *b == id)
            .map(|(_, d)| d)
            .ok_or(StageError::BufferNotWritable { buffer: id })
    }

    fn pair_mut(
        &mut self,
        a: BufferId,
        b: BufferId,
    ) -> Result<(&mut BufferData, &mut BufferData), StageError> {
        let mut first = None;
        let mut second = None;
        for (id, data) in self.entries.iter_mut() {
            if *id == a && first.is_none() {
                first = Some(data);
            } else if *id == b && second.is_none() {
                second = Some(data);
            }
        }
        match (first, second) {
            (Some(x), Some(y)) => Ok((x, y)),
            (None, _) => Err(StageError::BufferNotWritable { buffer: a }),
            (_, None) => Err(StageError::BufferNotWritable { buffer: b }),
        }
    }

    /// Float output `id`.
    pub fn f32_mut(&mut self, id: BufferId) -> Result<&mut [f32], StageError> {
        self.get_mut(id)?
            .as_f32_mut()
            .ok_or(StageError::BufferNotWritable { buffer: id })
    }

    /// Index output `id`.
    pub fn u32_mut(&mut self, id: BufferId) -> Result<&mut [u32], StageError> {
        self.get_mut(id)?
            .as_u32_mut()
            .ok_or(StageError::BufferNotWritable { buffer: id })
    }

    /// Two float outputs at once.
    pub fn f32_pair_mut(
        &mut self,
        a: BufferId,
        b: BufferId,
    ) -> Result<(&mut [f32], &mut [f32]), StageError> {
        let (x, y) = self.pair_mut(a, b)?;
        let x = x
            .as_f32_mut()
            .ok_or(StageError::BufferNotWritable { buffer: a })?;
        let y = y
            .as_f32_mut()
            .ok_or(StageError::BufferNotWritable { buffer: b })?;
        Ok((x, y))
    }

    /// Two index outputs at once.
    pub fn u32_pair_mut(
        &mut self,
        a: BufferId,
        b: BufferId,
    ) -> Result<(&mut [u32], &mut [u32]), StageError> {
        let (x, y) = self.pair_mut(a, b)?;
        let x = x
            .as_u32_mut()
            .ok_or(StageError::BufferNotWritable { buffer: a })?;
        let y = y
            .as_u32_mut()
            .ok_or(StageError::BufferNotWritable { buffer: b })?;
        Ok((x, y))
    }

    /// An index output and a float output at once.
    pub fn u32_f32_mut(
        &mut self,
        a: BufferId,
        b: BufferId,
    ) -> Result<(&mut [u32], &mut [f32]), StageError> {
        let (x, y) = self.pair_mut(a, b)?;
        let x = x
            .as_u32_mut()
            .ok_or(StageError::BufferNotWritable { buffer: a })?;
        let y = y
            .as_f32_mut()
            .ok_or(StageError::BufferNotWritable { buffer: b })?;
        Ok((x, y))
    }
}

/// Execution context passed to each stage's `run()`.
pub struct StageContext<'a> {
    arena: &'a ParticleArena,
    readable: BufferSet,
    writes: &'a mut WriteSet,
    executor: &'a Executor,
    env: &'a StepEnv<'a>,
    truncated: usize,
}

impl<'a> StageContext<'a> {
    /// Construct a context. Typically called by the solver.
    pub fn new(
        arena: &'a ParticleArena,
        readable: BufferSet,
        writes: &'a mut WriteSet,
        executor: &'a Executor,
        env: &'a StepEnv<'a>,
    ) -> Self {
        Self {
            arena,
            readable,
            writes,
            executor,
            env,
            truncated: 0,
        }
    }

    fn check_readable(&self, id: BufferId) -> Result<(), StageError> {
        if self.readable.contains(id) {
            Ok(())
        } else {
            Err(StageError::BufferNotReadable { buffer: id })
        }
    }

    /// Published float buffer `id`. Must be a declared read.
    pub fn read_f32(&self, id: BufferId) -> Result<&'a [f32], StageError> {
        self.check_readable(id)?;
        Ok(self.arena.read_f32(id)?)
    }

    /// Published index buffer `id`. Must be a declared read.
    pub fn read_u32(&self, id: BufferId) -> Result<&'a [u32], StageError> {
        self.check_readable(id)?;
        Ok(self.arena.read_u32(id)?)
    }

    /// Declared outputs.
    pub fn writes(&mut self) -> &mut WriteSet {
        self.writes
    }

    /// Executor kernel bodies fan out on.
    pub fn executor(&self) -> &'a Executor {
        self.executor
    }

    /// Per-step constants.
    pub fn env(&self) -> &'a StepEnv<'a> {
        self.env
    }

    /// Record particles whose neighbor list was cut at capacity.
    pub fn note_truncated(&mut self, count: usize) {
        self.truncated += count;
    }

    /// Truncated neighbor lists recorded during this invocation.
    pub fn truncated(&self) -> usize {
        self.truncated
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pcisph_arena::ArenaConfig;
    use pcisph_core::ParticleKind;

    fn fixture() -> (ParticleArena, GridGeometry, SphParams) {
        let mut arena = ParticleArena::new();
        arena.allocate(ArenaConfig::new(2, 4)).unwrap();
        let tag = ParticleKind::LIQUID_TAG;
        arena
            .load(&[[1.0, 0.0, 0.0, tag], [2.0, 0.0, 0.0, tag]], &[[0.0; 4]; 2])
            .unwrap();
        let bounds = SceneBounds::new([0.0; 3], [4.0; 3]);
        let grid = GridGeometry::new(&bounds, 4.0).unwrap();
        (arena, grid, SphParams::default())
    }

    fn env<'a>(params: &'a SphParams, grid: &'a GridGeometry) -> StepEnv<'a> {
        StepEnv {
            params,
            coefficients: params.coefficients(SphParams::DEFAULT_TIME_STEP).unwrap(),
            grid,
            bounds: SceneBounds::new([0.0; 3], [4.0; 3]),
            counts: ParticleCounts::default(),
            neighbor_capacity: 4,
            iteration: 0,
        }
    }

    #[test]
    fn reads_published_and_writes_owned() {
        let (mut arena, grid, params) = fixture();
        let env = env(&params, &grid);
        let mut writes = WriteSet::new();
        writes.insert(
            BufferId::Density,
            arena.checkout(BufferId::Density, false).unwrap(),
        );
        {
            let exec = Executor::Serial;
            let mut ctx = StageContext::new(
                &arena,
                [BufferId::Position].into_iter().collect(),
                &mut writes,
                &exec,
                &env,
            );
            let pos = ctx.read_f32(BufferId::Position).unwrap();
            let out = ctx.writes().f32_mut(BufferId::Density).unwrap();
            out[0] = pos[0];
            out[1] = pos[4];
        }
        for (id, data) in writes.drain() {
            arena.checkin(id, data);
        }
        assert_eq!(arena.read_f32(BufferId::Density).unwrap(), &[1.0, 2.0]);
    }

    #[test]
    fn undeclared_read_rejected() {
        let (arena, grid, params) = fixture();
        let env = env(&params, &grid);
        let mut writes = WriteSet::new();
        let exec = Executor::Serial;
        let ctx = StageContext::new(&arena, BufferSet::empty(), &mut writes, &exec, &env);
        assert_eq!(
            ctx.read_f32(BufferId::Position).unwrap_err(),
            StageError::BufferNotReadable {
                buffer: BufferId::Position
            }
        );
    }

    #[test]
    fn reading_a_checked_out_buffer_fails() {
        let (mut arena, grid, params) = fixture();
        let env = env(&params, &grid);
        let mut writes = WriteSet::new();
        writes.insert(
            BufferId::Pressure,
            arena.checkout(BufferId::Pressure, false).unwrap(),
        );
        let exec = Executor::Serial;
        let ctx = StageContext::new(
            &arena,
            [BufferId::Pressure].into_iter().collect(),
            &mut writes,
            &exec,
            &env,
        );
        assert!(matches!(
            ctx.read_f32(BufferId::Pressure),
            Err(StageError::BufferNotReadable { .. })
        ));
    }

    #[test]
    fn pair_access_checks_element_types() {
        let (mut arena, _, _) = fixture();
        let mut writes = WriteSet::new();
        for id in [BufferId::NeighborIds, BufferId::NeighborDistances] {
            writes.insert(id, arena.checkout(id, false).unwrap());
        }
        let (ids, dists) = writes
            .u32_f32_mut(BufferId::NeighborIds, BufferId::NeighborDistances)
            .unwrap();
        assert_eq!(ids.len(), dists.len());
        assert!(writes
            .f32_pair_mut(BufferId::NeighborIds, BufferId::NeighborDistances)
            .is_err());
        assert_eq!(
            writes.f32_mut(BufferId::Velocity).unwrap_err(),
            StageError::BufferNotWritable {
                buffer: BufferId::Velocity
            }
        );
    }
}
