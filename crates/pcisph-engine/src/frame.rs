//! What a completed step hands back to the caller.

use pcisph_core::StepId;
use pcisph_obs::{ParticleReport, WatchSample};

use crate::metrics::StepMetrics;

/// Result of one successful step.
#[derive(Clone, Debug, PartialEq)]
pub struct StepFrame {
    /// Id of the state this frame describes.
    pub step: StepId,
    /// Scattered state of every non-boundary particle.
    pub report: ParticleReport,
    /// Active watch values, empty while sampling is stopped.
    pub watches: Vec<WatchSample>,
    /// Timing and dispatch counts.
    pub metrics: StepMetrics,
}

impl StepFrame {
    /// Sampled value of `path`, if it was watched.
    pub fn watch(&self, path: &str) -> Option<f32> {
        self.watches
            .iter()
            .find(|s| s.path == path)
            .map(|s| s.value)
    }
}
