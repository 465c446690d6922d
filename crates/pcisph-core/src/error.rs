//! Error types for the PCISPH step pipeline.
//!
//! Organized by subsystem: configuration (model load, parameters, watch
//! paths), compute backend, individual stage bodies, and the step as a
//! whole. Numerical anomalies (NaN/Inf in results) are deliberately not
//! represented here; they are a caller-observable condition.

use std::error::Error;
use std::fmt;

use crate::buffer::BufferId;
use crate::id::EventId;

/// Invalid input detected before any kernel runs.
///
/// Always fatal and never retried.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigurationError {
    /// Boundary, elastic and liquid counts do not add up to the particle
    /// count (unknown type tags fall out of all three).
    ParticleCountMismatch {
        /// Total particles in the model.
        particle_count: usize,
        /// Particles tagged boundary.
        boundary: usize,
        /// Particles tagged elastic.
        elastic: usize,
        /// Particles tagged liquid.
        liquid: usize,
    },
    /// Two inputs that must agree in length do not.
    LengthMismatch {
        /// What was being compared.
        what: &'static str,
        /// Required length.
        expected: usize,
        /// Supplied length.
        actual: usize,
    },
    /// The scene bounding box is empty, inverted or non-finite.
    InvalidBounds {
        /// Description of the problem.
        reason: String,
    },
    /// A physical or solver parameter is out of range.
    InvalidParameter {
        /// Parameter name.
        name: &'static str,
        /// Description of the problem.
        reason: String,
    },
    /// An elastic connection is malformed.
    InvalidConnection {
        /// Position of the connection in the model's list.
        index: usize,
        /// Description of the problem.
        reason: String,
    },
    /// A watch path selects a particle past the end of the buffers.
    WatchIndexOutOfBounds {
        /// The requested index.
        index: usize,
        /// Number of slots that exist.
        particle_count: usize,
    },
    /// A watch path does not parse or names an unknown quantity.
    InvalidWatchPath {
        /// The offending path.
        path: String,
        /// Description of the problem.
        reason: String,
    },
    /// An activation signal does not match the bundle slot count.
    ActivationLengthMismatch {
        /// Number of activation slots.
        expected: usize,
        /// Number of values supplied.
        actual: usize,
    },
}

impl fmt::Display for ConfigurationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ParticleCountMismatch {
                particle_count,
                boundary,
                elastic,
                liquid,
            } => write!(
                f,
                "particle type counts (boundary {boundary}, elastic {elastic}, \
                 liquid {liquid}) do not sum to particle count {particle_count}"
            ),
            Self::LengthMismatch {
                what,
                expected,
                actual,
            } => write!(f, "{what}: expected {expected} entries, got {actual}"),
            Self::InvalidBounds { reason } => write!(f, "invalid scene bounds: {reason}"),
            Self::InvalidParameter { name, reason } => {
                write!(f, "invalid parameter '{name}': {reason}")
            }
            Self::InvalidConnection { index, reason } => {
                write!(f, "invalid elastic connection #{index}: {reason}")
            }
            Self::WatchIndexOutOfBounds {
                index,
                particle_count,
            } => write!(
                f,
                "watch index {index} out of bounds for {particle_count} slots"
            ),
            Self::InvalidWatchPath { path, reason } => {
                write!(f, "invalid watch path '{path}': {reason}")
            }
            Self::ActivationLengthMismatch { expected, actual } => write!(
                f,
                "activation signal has {actual} values, expected {expected}"
            ),
        }
    }
}

impl Error for ConfigurationError {}

/// Failures of the compute backend.
///
/// Device state after any of these is untrustworthy, so the core never
/// retries them.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum BackendError {
    /// The requested device could not be brought up.
    DeviceUnavailable {
        /// Requested device profile, e.g. `"gpu"`.
        profile: String,
        /// Backend diagnostic.
        reason: String,
    },
    /// Program compilation failed.
    ProgramBuildFailed {
        /// Backend diagnostic.
        reason: String,
    },
    /// A kernel name is not part of the compiled program.
    KernelNotFound {
        /// The requested kernel name.
        name: String,
    },
    /// `wait` was called with an event this backend never issued.
    UnknownEvent {
        /// The unknown event.
        event: EventId,
    },
    /// A buffer could not be mapped for host access.
    MapFailed {
        /// The buffer being mapped.
        buffer: BufferId,
        /// Backend diagnostic.
        reason: String,
    },
}

impl fmt::Display for BackendError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::DeviceUnavailable { profile, reason } => {
                write!(f, "{profile} device unavailable: {reason}")
            }
            Self::ProgramBuildFailed { reason } => write!(f, "program build failed: {reason}"),
            Self::KernelNotFound { name } => write!(f, "kernel '{name}' not found in program"),
            Self::UnknownEvent { event } => write!(f, "unknown {event}"),
            Self::MapFailed { buffer, reason } => {
                write!(f, "mapping buffer '{buffer}' failed: {reason}")
            }
        }
    }
}

impl Error for BackendError {}

/// Errors from an individual stage body.
///
/// Wrapped in [`StepError::StageFailed`] by the orchestrator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StageError {
    /// The stage read a buffer it did not declare, or one that is not
    /// allocated.
    BufferNotReadable {
        /// The buffer.
        buffer: BufferId,
    },
    /// The stage wrote a buffer it did not declare.
    BufferNotWritable {
        /// The buffer.
        buffer: BufferId,
    },
    /// The stage body failed.
    ExecutionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
}

impl fmt::Display for StageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::BufferNotReadable { buffer } => write!(f, "buffer '{buffer}' is not readable"),
            Self::BufferNotWritable { buffer } => write!(f, "buffer '{buffer}' is not writable"),
            Self::ExecutionFailed { reason } => write!(f, "execution failed: {reason}"),
        }
    }
}

impl Error for StageError {}

/// Errors from a solver step.
///
/// Any of these aborts the rest of the step. The published particle
/// state is left as it was before the step began.
#[derive(Clone, Debug, PartialEq)]
pub enum StepError {
    /// A stage returned an error.
    StageFailed {
        /// Label of the failing stage node.
        stage: String,
        /// The underlying stage error.
        reason: StageError,
    },
    /// The compute backend failed.
    Backend(BackendError),
    /// Inputs to the step were invalid.
    Configuration(ConfigurationError),
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::StageFailed { stage, reason } => write!(f, "stage '{stage}' failed: {reason}"),
            Self::Backend(e) => write!(f, "backend: {e}"),
            Self::Configuration(e) => write!(f, "configuration: {e}"),
        }
    }
}

impl Error for StepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::StageFailed { reason, .. } => Some(reason),
            Self::Backend(e) => Some(e),
            Self::Configuration(e) => Some(e),
        }
    }
}

impl From<BackendError> for StepError {
    fn from(e: BackendError) -> Self {
        Self::Backend(e)
    }
}

impl From<ConfigurationError> for StepError {
    fn from(e: ConfigurationError) -> Self {
        Self::Configuration(e)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn count_mismatch_message_lists_all_counts() {
        let err = ConfigurationError::ParticleCountMismatch {
            particle_count: 10,
            boundary: 2,
            elastic: 3,
            liquid: 4,
        };
        let msg = err.to_string();
        assert!(msg.contains("boundary 2"));
        assert!(msg.contains("elastic 3"));
        assert!(msg.contains("liquid 4"));
        assert!(msg.contains("10"));
    }

    #[test]
    fn step_error_exposes_source() {
        let err = StepError::StageFailed {
            stage: "integrate".into(),
            reason: StageError::BufferNotWritable {
                buffer: BufferId::Position,
            },
        };
        let source = err.source().map(|s| s.to_string());
        assert_eq!(source.as_deref(), Some("buffer 'position' is not writable"));
    }

    #[test]
    fn conversions_wrap() {
        let step: StepError = BackendError::MapFailed {
            buffer: BufferId::Density,
            reason: "busy".into(),
        }
        .into();
        assert!(matches!(
            step,
            StepError::Backend(BackendError::MapFailed {
                buffer: BufferId::Density,
                ..
            })
        ));
        let step: StepError = ConfigurationError::ActivationLengthMismatch {
            expected: 1,
            actual: 2,
        }
        .into();
        assert!(matches!(step, StepError::Configuration(_)));
    }
}
