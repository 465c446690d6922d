//! The [`Stage`] trait, [`StageDomain`] and [`WriteMode`].

use crate::context::StageContext;
use pcisph_core::{BufferId, BufferSet, StageError};

/// What a stage's global work size is counted over.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageDomain {
    /// One work item per particle.
    Particles,
    /// One work item per grid cell.
    Cells,
    /// Runs on the host after the device work it depends on has finished.
    Host,
}

impl StageDomain {
    /// Whether stages of this domain run on the compute device.
    pub fn is_device(self) -> bool {
        !matches!(self, Self::Host)
    }
}

/// Write initialisation strategy for a buffer.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum WriteMode {
    /// The stage overwrites every element.
    Full,
    /// The stage updates some elements in place. A double-buffered
    /// buffer is seeded from the published generation first.
    Incremental,
}

/// One kernel of the step pipeline.
///
/// # Contract
///
/// - `run()` is deterministic given its declared reads.
/// - `&self`: stages are stateless; all state lives in the buffer set.
/// - `reads()` and `writes()` are consulted once, when the plan is built.
///
/// # Object safety
///
/// The solver stores stages as `Vec<Box<dyn Stage>>`.
pub trait Stage: Send + Sync + 'static {
    /// Kernel name, unique within a pipeline.
    fn name(&self) -> &str;

    /// Work domain.
    fn domain(&self) -> StageDomain;

    /// Buffers read through the published view.
    fn reads(&self) -> BufferSet;

    /// Buffers written, with their initialisation mode.
    fn writes(&self) -> Vec<(BufferId, WriteMode)>;

    /// Execute one invocation.
    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError>;
}
