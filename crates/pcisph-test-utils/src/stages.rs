//! Stage doubles for orchestrator tests.
//!
//! - [`ConstStage`]: fills one buffer with a constant (Full mode, no reads).
//! - [`FailingStage`]: fails deterministically after N calls.

use std::sync::atomic::{AtomicUsize, Ordering};

use pcisph_core::{BufferId, BufferSet, ElementType, StageError};
use pcisph_stage::{Stage, StageContext, StageDomain, WriteMode};

/// Writes `value` into every element of a float buffer.
///
/// Useful for injecting NaN into the staging generation, or for checking
/// that downstream stages see a write.
pub struct ConstStage {
    pub name: String,
    pub output: BufferId,
    pub value: f32,
}

impl ConstStage {
    pub fn new(name: impl Into<String>, output: BufferId, value: f32) -> Self {
        Self {
            name: name.into(),
            output,
            value,
        }
    }
}

impl Stage for ConstStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn domain(&self) -> StageDomain {
        StageDomain::Particles
    }

    fn reads(&self) -> BufferSet {
        BufferSet::empty()
    }

    fn writes(&self) -> Vec<(BufferId, WriteMode)> {
        vec![(self.output, WriteMode::Full)]
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        if self.output.element() != ElementType::F32 {
            return Err(StageError::BufferNotWritable {
                buffer: self.output,
            });
        }
        ctx.writes().f32_mut(self.output)?.fill(self.value);
        Ok(())
    }
}

/// Succeeds `succeed_count` times, then fails on every call.
///
/// On success the output is filled with the call index. Uses an
/// `AtomicUsize` counter so the stage stays `Sync`.
pub struct FailingStage {
    pub name: String,
    pub output: BufferId,
    pub succeed_count: usize,
    call_count: AtomicUsize,
}

impl FailingStage {
    pub fn new(name: impl Into<String>, output: BufferId, succeed_count: usize) -> Self {
        Self {
            name: name.into(),
            output,
            succeed_count,
            call_count: AtomicUsize::new(0),
        }
    }

    /// How many times `run()` has been called.
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl Stage for FailingStage {
    fn name(&self) -> &str {
        &self.name
    }

    fn domain(&self) -> StageDomain {
        StageDomain::Particles
    }

    fn reads(&self) -> BufferSet {
        BufferSet::empty()
    }

    fn writes(&self) -> Vec<(BufferId, WriteMode)> {
        vec![(self.output, WriteMode::Full)]
    }

    fn run(&self, ctx: &mut StageContext<'_>) -> Result<(), StageError> {
        let n = self.call_count.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_count {
            return Err(StageError::ExecutionFailed {
                reason: format!(
                    "deliberate failure after {} successful calls",
                    self.succeed_count
                ),
            });
        }
        if let Ok(output) = ctx.writes().f32_mut(self.output) {
            output.fill(n as f32);
        }
        Ok(())
    }
}
