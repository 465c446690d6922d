//! A small scene loaded into an arena, for driving stages in tests.

use pcisph_arena::{ArenaConfig, ParticleArena};
use pcisph_backend::Executor;
use pcisph_core::{
    BufferId, ElasticConnection, KernelCoefficients, ParticleCounts, ParticleKind, SceneBounds,
    SphParams, DEFAULT_NEIGHBOR_CAPACITY,
};
use pcisph_grid::GridGeometry;
use pcisph_stage::{run_stage, Segment, Stage, StageOutcome, StepEnv};

use crate::pipeline::{standard_schedule, standard_stages};

pub(crate) struct Harness {
    pub arena: ParticleArena,
    pub grid: GridGeometry,
    pub params: SphParams,
    pub bounds: SceneBounds,
    pub capacity: usize,
    pub counts: ParticleCounts,
    positions: Vec<[f32; 4]>,
    velocities: Vec<[f32; 4]>,
}

impl Harness {
    pub fn new(max: [f32; 3], particles: &[([f32; 3], ParticleKind)]) -> Self {
        Self::build(max, particles, DEFAULT_NEIGHBOR_CAPACITY, &[])
    }

    pub fn with_capacity(
        max: [f32; 3],
        particles: &[([f32; 3], ParticleKind)],
        capacity: usize,
    ) -> Self {
        Self::build(max, particles, capacity, &[])
    }

    pub fn with_connections(
        max: [f32; 3],
        particles: &[([f32; 3], ParticleKind)],
        connections: &[ElasticConnection],
    ) -> Self {
        Self::build(max, particles, DEFAULT_NEIGHBOR_CAPACITY, connections)
    }

    fn build(
        max: [f32; 3],
        particles: &[([f32; 3], ParticleKind)],
        capacity: usize,
        connections: &[ElasticConnection],
    ) -> Self {
        let params = SphParams::default();
        let bounds = SceneBounds::new([0.0; 3], max);
        let grid = GridGeometry::new(&bounds, params.h).unwrap();
        let positions: Vec<[f32; 4]> = particles
            .iter()
            .map(|&([x, y, z], kind)| [x, y, z, kind.tag()])
            .collect();
        let velocities: Vec<[f32; 4]> = positions.iter().map(|p| [0.0, 0.0, 0.0, p[3]]).collect();
        let elastic = particles
            .iter()
            .filter(|(_, kind)| *kind == ParticleKind::Elastic)
            .count();

        let mut arena = ParticleArena::new();
        arena
            .allocate(ArenaConfig {
                particle_count: particles.len(),
                cell_count: grid.cell_count(),
                elastic_count: elastic,
                bundle_count: 1,
                neighbor_capacity: capacity,
            })
            .unwrap();
        let counts = arena.load(&positions, &velocities).unwrap();
        arena
            .load_connections(connections, params.simulation_scale)
            .unwrap();

        Self {
            arena,
            grid,
            params,
            bounds,
            capacity,
            counts,
            positions,
            velocities,
        }
    }

    /// Overwrite one particle's velocity in both generations.
    pub fn set_velocity(&mut self, particle: usize, v: [f32; 3]) {
        let w = self.velocities[particle][3];
        self.velocities[particle] = [v[0], v[1], v[2], w];
        self.arena.load(&self.positions, &self.velocities).unwrap();
    }

    pub fn coefficients(&self) -> KernelCoefficients {
        self.params
            .coefficients(SphParams::DEFAULT_TIME_STEP)
            .unwrap()
    }

    pub fn run(&mut self, stage: &dyn Stage) -> StageOutcome {
        self.run_at(stage, 0)
    }

    fn run_at(&mut self, stage: &dyn Stage, iteration: u32) -> StageOutcome {
        let env = StepEnv {
            params: &self.params,
            coefficients: self.coefficients(),
            grid: &self.grid,
            bounds: self.bounds,
            counts: self.counts,
            neighbor_capacity: self.capacity,
            iteration,
        };
        run_stage(stage, &mut self.arena, &Executor::Serial, &env)
            .unwrap_or_else(|e| panic!("stage '{}' failed: {e}", stage.name()))
    }

    /// Run the standard schedule with a single correction pass, stopping
    /// after the first stage called `last`.
    pub fn run_through(&mut self, last: &str) -> StageOutcome {
        let stages = standard_stages();
        let mut total = StageOutcome::default();
        for segment in standard_schedule(1, self.counts.elastic > 0) {
            let body = match segment {
                Segment::Once(index) => vec![index],
                Segment::Repeat { body, .. } => body,
            };
            for index in body {
                let stage = stages[index].as_ref();
                total.truncated += self.run_at(stage, 0).truncated;
                if stage.name() == last {
                    return total;
                }
            }
        }
        panic!("no stage named '{last}'");
    }

    pub fn f32s(&self, id: BufferId) -> Vec<f32> {
        self.arena.read_f32(id).unwrap().to_vec()
    }

    pub fn u32s(&self, id: BufferId) -> Vec<u32> {
        self.arena.read_u32(id).unwrap().to_vec()
    }

    /// Contents of the writable generation, where integration lands.
    pub fn staging(&mut self, id: BufferId) -> Vec<f32> {
        let data = self.arena.checkout(id, false).unwrap();
        let values = data.as_f32().unwrap().to_vec();
        self.arena.checkin(id, data);
        values
    }
}
