//! Per-step performance metrics.
//!
//! [`StepMetrics`] captures timing and dispatch counts for a single step.

/// Timing and dispatch metrics collected during a single step.
///
/// All durations are in microseconds. The solver fills these after each
/// successful `step()`; a failed step leaves the previous metrics in place.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct StepMetrics {
    /// Wall-clock time for the entire step, in microseconds.
    pub total_us: u64,
    /// Per-node execution times: `(label, microseconds)`, in plan order.
    pub stage_us: Vec<(String, u64)>,
    /// Host waits at barrier nodes.
    pub barrier_waits: u32,
    /// Kernel dispatches issued to the backend.
    pub dispatches: u32,
    /// Particles whose neighbor list was cut at capacity.
    pub neighbor_overflow: usize,
    /// Predictor-corrector passes executed.
    pub pcisph_iterations: u32,
    /// Memory held by the arena after the step, in bytes.
    pub memory_bytes: usize,
}

impl StepMetrics {
    /// Time recorded for the node labelled `label`.
    pub fn stage(&self, label: &str) -> Option<u64> {
        self.stage_us
            .iter()
            .find(|(l, _)| l == label)
            .map(|&(_, us)| us)
    }
}
