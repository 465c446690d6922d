//! The step orchestrator.
//!
//! [`Solver`] owns the arena, the validated [`ExecutionPlan`] and the
//! compute backend, and runs one plan per [`step`](Solver::step):
//!
//! ```text
//! step(dt)
//!   ├─ 1. Derive kernel coefficients for dt
//!   ├─ 2. For each plan node, in order:
//!   │     ├─ device node → dispatch over the rounded work size
//!   │     ├─ host node   → wait on its barrier events, run inline
//!   │     └─ (checkpoints) drain the queue, map and capture every buffer
//!   ├─ 3. Drain the device queue
//!   ├─ 4. Map and read the staged state: report, watch samples
//!   └─ 5. Publish the staging position/velocity generation
//! ```
//!
//! A failure in 1–4 abandons the staging generation. Nothing is
//! published, the step counter does not advance and the previous
//! metrics are kept.

use std::time::Instant;

use pcisph_arena::{ArenaConfig, ParticleArena, Snapshot};
use pcisph_backend::{
    create_backend, global_work_size, BufferHandle, BufferUsage, ComputeBackend, DispatchError,
    Executor, KernelHandle, MapAccess,
};
use pcisph_core::{
    BackendError, BufferId, BufferSet, ConfigurationError, EventId, ModelInput, ParticleCounts,
    SceneBounds, StageError, StepError, StepId,
};
use pcisph_grid::GridGeometry;
use pcisph_obs::{resolve, ParticleReport, WatchList, WatchPath};
use pcisph_stage::{
    run_stage, validate_graph, ExecutionPlan, Segment, Stage, StageDomain, StageOutcome, StepEnv,
};
use pcisph_stages::{names, standard_schedule, standard_stages};

use crate::checkpoint::{Checkpoint, CheckpointLog};
use crate::config::{InitError, SolverConfig, TimeConfig};
use crate::frame::StepFrame;
use crate::metrics::StepMetrics;

/// A loaded scene plus everything needed to advance it.
///
/// # Example
///
/// ```ignore
/// let mut solver = Solver::new(&model, SolverConfig::default())?;
/// let frames = solver.solve(&TimeConfig { time_step: 5e-4, steps: 10 })?;
/// ```
pub struct Solver {
    config: SolverConfig,
    bounds: SceneBounds,
    grid: GridGeometry,
    arena: ParticleArena,
    stages: Vec<Box<dyn Stage>>,
    plan: ExecutionPlan,
    backend: Box<dyn ComputeBackend>,
    /// Device allocation per allocated arena buffer, in catalogue order.
    buffers: Vec<BufferHandle>,
    /// Kernel per stage index; `None` for host stages.
    kernels: Vec<Option<KernelHandle>>,
    watches: WatchList,
    checkpoints: CheckpointLog,
    current_step: StepId,
    last_metrics: StepMetrics,
}

impl Solver {
    /// Load `model` and build the standard step.
    ///
    /// The elastic-force stage is scheduled only when the model has
    /// elastic particles.
    pub fn new(model: &ModelInput, config: SolverConfig) -> Result<Self, InitError> {
        let counts = model.validate()?;
        let schedule = standard_schedule(config.pcisph_iterations, counts.elastic > 0);
        Self::with_pipeline(model, config, standard_stages(), &schedule)
    }

    /// Load `model` and run `stages` according to `schedule`.
    ///
    /// Validation order: configuration, model, grid, arena layout, step
    /// graph, then the backend: buffers, initial upload and program.
    /// Nothing is left half-built on failure.
    ///
    /// The grid geometry is derived here once. Bounds and `h` are fixed
    /// for the lifetime of a solver, so every step would derive the same
    /// lattice.
    pub fn with_pipeline(
        model: &ModelInput,
        config: SolverConfig,
        stages: Vec<Box<dyn Stage>>,
        schedule: &[Segment],
    ) -> Result<Self, InitError> {
        config.validate()?;
        let counts = model.validate()?;
        let grid = GridGeometry::new(&model.bounds, config.params.h)?;

        let mut arena = ParticleArena::new();
        arena.allocate(ArenaConfig {
            particle_count: counts.total,
            cell_count: grid.cell_count(),
            elastic_count: counts.elastic,
            bundle_count: model.bundle_count as usize,
            neighbor_capacity: config.neighbor_capacity,
        })?;

        let plan = validate_graph(&stages, schedule, &arena.allocated())?;

        let mut backend = create_backend(config.device, config.threads)?;
        let mut buffers = Vec::with_capacity(arena.allocated().len());
        for id in arena.allocated().iter() {
            let bytes = arena.read(id)?.bytes();
            buffers.push(backend.allocate_buffer(id, bytes, host_usage(id))?);
        }
        let uploads: Vec<BufferHandle> = buffers
            .iter()
            .copied()
            .filter(|h| host_usage(h.buffer) == BufferUsage::HostReadWrite)
            .collect();
        mapped(backend.as_mut(), &uploads, MapAccess::Write, || {
            arena.load(&model.positions, &model.velocities)?;
            arena.load_connections(&model.connections, config.params.simulation_scale)
        })??;

        let mut kernel_names: Vec<&str> = Vec::new();
        for stage in stages.iter().filter(|s| s.domain().is_device()) {
            if !kernel_names.contains(&stage.name()) {
                kernel_names.push(stage.name());
            }
        }
        let mut kernels = vec![None; stages.len()];
        if !kernel_names.is_empty() {
            let program = backend.compile_program(&kernel_names)?;
            for (slot, stage) in kernels.iter_mut().zip(&stages) {
                if stage.domain().is_device() {
                    *slot = Some(backend.create_kernel(program, stage.name())?);
                }
            }
        }

        tracing::info!(
            device = %backend.name(),
            profile = %config.device,
            particles = counts.total,
            boundary = counts.boundary,
            elastic = counts.elastic,
            liquid = counts.liquid,
            grid = ?grid.dims(),
            buffers = buffers.len(),
            nodes = plan.len(),
            "solver initialised"
        );

        Ok(Self {
            config,
            bounds: model.bounds,
            grid,
            arena,
            stages,
            plan,
            backend,
            buffers,
            kernels,
            watches: WatchList::new(),
            checkpoints: CheckpointLog::new(),
            current_step: StepId(0),
            last_metrics: StepMetrics::default(),
        })
    }

    // ── Stepping ───────────────────────────────────────────────────

    /// Advance one step of `time_step` seconds.
    ///
    /// The frame is read from the staged generation before it is
    /// published, so a failure while reading it back also leaves the
    /// published state untouched.
    pub fn step(&mut self, time_step: f32) -> Result<StepFrame, StepError> {
        let start = Instant::now();
        let step = self.current_step.next();
        let mut metrics = self.run_plan(step, time_step)?;

        let staged = self.arena.preview();
        let watches = &self.watches;
        let (report, samples) =
            mapped(self.backend.as_mut(), &self.buffers, MapAccess::Read, || {
                (ParticleReport::capture(&staged), watches.sample(&staged))
            })?;
        let samples = samples?;

        self.arena.publish();
        self.current_step = step;

        metrics.memory_bytes = self.arena.memory_bytes();
        metrics.total_us = start.elapsed().as_micros() as u64;
        if metrics.neighbor_overflow > 0 {
            tracing::warn!(
                step = step.0,
                particles = metrics.neighbor_overflow,
                capacity = self.config.neighbor_capacity,
                "neighbor lists truncated at capacity"
            );
        }
        tracing::debug!(
            step = step.0,
            total_us = metrics.total_us,
            barrier_waits = metrics.barrier_waits,
            "step complete"
        );
        self.last_metrics = metrics.clone();
        Ok(StepFrame {
            step,
            report,
            watches: samples,
            metrics,
        })
    }

    /// Advance `time.steps` steps, one frame per step.
    ///
    /// Stops at the first failing step. Steps completed before it stay
    /// published; their frames are dropped with the error.
    pub fn solve(&mut self, time: &TimeConfig) -> Result<Vec<StepFrame>, StepError> {
        time.validate()?;
        (0..time.steps).map(|_| self.step(time.time_step)).collect()
    }

    /// Run every plan node for `step`, leaving the results staged.
    fn run_plan(&mut self, step: StepId, time_step: f32) -> Result<StepMetrics, StepError> {
        let coefficients = self.config.params.coefficients(time_step)?;
        let counts = self.arena.counts();
        let cells = self.grid.cell_count();

        let mut events: Vec<Option<EventId>> = vec![None; self.plan.len()];
        let mut metrics = StepMetrics::default();
        // Buffers written so far this step; checkpoints read these from
        // the staging generation.
        let mut staged = BufferSet::empty();

        for (n, node) in self.plan.nodes().iter().enumerate() {
            let stage_start = Instant::now();
            let stage = self.stages[node.stage].as_ref();
            let env = StepEnv {
                params: &self.config.params,
                coefficients,
                grid: &self.grid,
                bounds: self.bounds,
                counts,
                neighbor_capacity: self.config.neighbor_capacity,
                iteration: node.iteration,
            };
            let failed = |reason: StageError| StepError::StageFailed {
                stage: node.label.clone(),
                reason,
            };

            let work = match node.domain {
                StageDomain::Particles => counts.total,
                // The bucket table carries a trailing sentinel.
                StageDomain::Cells => cells + 1,
                StageDomain::Host => 0,
            };
            let outcome = match self.kernels[node.stage] {
                Some(kernel) => {
                    let arena = &mut self.arena;
                    let mut outcome = StageOutcome::default();
                    let event = self
                        .backend
                        .dispatch(kernel, global_work_size(work), &mut |exec: &Executor| {
                            outcome = run_stage(stage, arena, exec, &env)?;
                            Ok(())
                        })
                        .map_err(|e| match e {
                            DispatchError::Backend(e) => StepError::Backend(e),
                            DispatchError::Stage(reason) => failed(reason),
                        })?;
                    events[n] = Some(event);
                    metrics.dispatches += 1;
                    outcome
                }
                None => {
                    for event in node.barrier.iter().filter_map(|&b| events[b]) {
                        self.backend.wait(event)?;
                    }
                    if node.has_barrier() {
                        metrics.barrier_waits += 1;
                    }
                    run_stage(stage, &mut self.arena, &Executor::Serial, &env).map_err(failed)?
                }
            };

            metrics.neighbor_overflow += outcome.truncated;
            if stage.name() == names::CORRECT_PRESSURE {
                metrics.pcisph_iterations += 1;
            }
            staged = staged.union(&node.writes.keys().copied().collect::<BufferSet>());
            if self.config.record_checkpoints {
                self.backend.drain_queue()?;
                let arena = &self.arena;
                let buffers = mapped(self.backend.as_mut(), &self.buffers, MapAccess::Read, || {
                    arena.capture(&staged)
                })?;
                self.checkpoints.push(step, &node.label, buffers);
            }

            let us = stage_start.elapsed().as_micros() as u64;
            tracing::trace!(stage = %node.label, work = global_work_size(work), us, "stage complete");
            metrics.stage_us.push((node.label.clone(), us));
        }

        self.backend.drain_queue()?;
        Ok(metrics)
    }

    // ── Inputs between steps ───────────────────────────────────────

    /// Overwrite the activation signal, one value per bundle slot.
    pub fn set_activation(&mut self, values: &[f32]) -> Result<(), StepError> {
        let target: Vec<BufferHandle> = self
            .buffers
            .iter()
            .copied()
            .filter(|h| h.buffer == BufferId::Activation)
            .collect();
        let arena = &mut self.arena;
        mapped(self.backend.as_mut(), &target, MapAccess::Write, || {
            arena.set_activation(values)
        })??;
        Ok(())
    }

    /// Register a watch path.
    ///
    /// The path is parsed and resolved against the current state right
    /// away, so an index past the end fails here with
    /// [`ConfigurationError::WatchIndexOutOfBounds`] rather than later.
    pub fn watch(&mut self, path: &str) -> Result<(), ConfigurationError> {
        let target = WatchPath::parse(path)?.target()?;
        resolve(&target, &self.arena.snapshot())?;
        self.watches.add(path)?;
        Ok(())
    }

    /// Drop a watch path. Returns whether it was registered.
    pub fn unwatch(&mut self, path: &str) -> bool {
        self.watches.remove(path)
    }

    /// Drop every watch path.
    pub fn clear_watches(&mut self) {
        self.watches.clear();
    }

    /// Sample watches into every following frame.
    pub fn start_watching(&mut self) {
        self.watches.start();
    }

    /// Stop sampling. Paths stay registered.
    pub fn stop_watching(&mut self) {
        self.watches.stop();
    }

    // ── Accessors ──────────────────────────────────────────────────

    /// Published state.
    ///
    /// Between steps the queue is drained and no buffer is mapped, so
    /// the host copy is coherent without a map.
    pub fn snapshot(&self) -> Snapshot<'_> {
        self.arena.snapshot()
    }

    /// Non-boundary particles of the published state.
    pub fn report(&self) -> ParticleReport {
        ParticleReport::capture(&self.arena.snapshot())
    }

    /// Registered watches.
    pub fn watches(&self) -> &WatchList {
        &self.watches
    }

    /// Captured checkpoints. Empty unless
    /// [`SolverConfig::record_checkpoints`] is set.
    pub fn checkpoints(&self) -> &CheckpointLog {
        &self.checkpoints
    }

    /// Hand over the captured checkpoints, emptying the log.
    pub fn take_checkpoints(&mut self) -> Vec<Checkpoint> {
        self.checkpoints.take()
    }

    /// Per-kind particle counts.
    pub fn counts(&self) -> ParticleCounts {
        self.arena.counts()
    }

    /// The validated step plan.
    pub fn plan(&self) -> &ExecutionPlan {
        &self.plan
    }

    /// Lattice of the spatial index.
    pub fn grid(&self) -> &GridGeometry {
        &self.grid
    }

    /// Configuration the solver was built with.
    pub fn config(&self) -> &SolverConfig {
        &self.config
    }

    /// Name of the compute device.
    pub fn device_name(&self) -> &str {
        self.backend.name()
    }

    /// Id of the last published step; `StepId(0)` right after load.
    pub fn current_step(&self) -> StepId {
        self.current_step
    }

    /// Metrics from the most recent successful step.
    pub fn last_metrics(&self) -> &StepMetrics {
        &self.last_metrics
    }
}

/// Host access each arena buffer needs on the device.
fn host_usage(id: BufferId) -> BufferUsage {
    match id {
        BufferId::Position
        | BufferId::Velocity
        | BufferId::ElasticIndex
        | BufferId::ElasticConnections
        | BufferId::Activation => BufferUsage::HostReadWrite,
        _ => BufferUsage::HostRead,
    }
}

/// Map `buffers` for `access`, run `f`, then unmap them again.
///
/// Mappings already taken are released before a map failure is returned.
fn mapped<T>(
    backend: &mut dyn ComputeBackend,
    buffers: &[BufferHandle],
    access: MapAccess,
    f: impl FnOnce() -> T,
) -> Result<T, BackendError> {
    let mut mappings = Vec::with_capacity(buffers.len());
    for &buffer in buffers {
        match backend.map_buffer(buffer, access) {
            Ok(mapping) => mappings.push(mapping),
            Err(e) => {
                for mapping in mappings {
                    backend.unmap(mapping)?;
                }
                return Err(e);
            }
        }
    }
    let value = f();
    for mapping in mappings {
        backend.unmap(mapping)?;
    }
    Ok(value)
}
