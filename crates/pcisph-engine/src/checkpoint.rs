//! Debug capture of every buffer after every stage.

use pcisph_arena::{BufferCapture, BufferData};
use pcisph_core::{BufferId, StepId};

/// All buffers as they stood after one stage node.
#[derive(Clone, Debug, PartialEq)]
pub struct Checkpoint {
    /// Step the capture belongs to.
    pub step: StepId,
    /// Label of the node that had just finished.
    pub stage: String,
    /// Every allocated buffer as the next node would see it: staged
    /// position and velocity once this step has written them, published
    /// otherwise.
    pub buffers: BufferCapture,
}

impl Checkpoint {
    /// One buffer of the capture.
    pub fn buffer(&self, id: BufferId) -> Option<&BufferData> {
        self.buffers.get(&id)
    }
}

/// List of checkpoints in capture order, append-only until drained with
/// [`take`](Self::take).
///
/// Entries are never mutated after they are pushed. A failed step keeps
/// the entries it captured before the failure.
#[derive(Clone, Debug, Default)]
pub struct CheckpointLog {
    entries: Vec<Checkpoint>,
}

impl CheckpointLog {
    /// An empty log.
    pub fn new() -> Self {
        Self::default()
    }

    pub(crate) fn push(&mut self, step: StepId, stage: &str, buffers: BufferCapture) {
        self.entries.push(Checkpoint {
            step,
            stage: stage.to_string(),
            buffers,
        });
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been captured.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries in capture order.
    pub fn iter(&self) -> impl Iterator<Item = &Checkpoint> + '_ {
        self.entries.iter()
    }

    /// Entries captured during `step`.
    pub fn for_step(&self, step: StepId) -> impl Iterator<Item = &Checkpoint> + '_ {
        self.entries.iter().filter(move |c| c.step == step)
    }

    /// Most recent entry for the node labelled `stage`.
    pub fn latest(&self, stage: &str) -> Option<&Checkpoint> {
        self.entries.iter().rev().find(|c| c.stage == stage)
    }

    /// Hand the entries to the caller, leaving the log empty.
    pub fn take(&mut self) -> Vec<Checkpoint> {
        std::mem::take(&mut self.entries)
    }
}
