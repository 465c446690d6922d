//! Arena-specific error types.

use std::error::Error;
use std::fmt;

use pcisph_core::{BufferId, StageError};

/// Errors that can occur during arena operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum ArenaError {
    /// `allocate()` has not been called yet.
    NotAllocated,
    /// The buffer is not part of the current layout (e.g. elastic
    /// connections in a scene without elastic particles).
    BufferMissing {
        /// The missing buffer.
        buffer: BufferId,
    },
    /// The buffer is checked out for writing by the running stage.
    BufferInUse {
        /// The busy buffer.
        buffer: BufferId,
    },
    /// Requested access does not match the buffer's element type.
    ElementMismatch {
        /// The buffer accessed with the wrong type.
        buffer: BufferId,
    },
    /// The arena configuration is invalid.
    InvalidConfig {
        /// Description of the problem.
        reason: String,
    },
}

impl fmt::Display for ArenaError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NotAllocated => write!(f, "arena buffers have not been allocated"),
            Self::BufferMissing { buffer } => write!(f, "buffer '{buffer}' is not allocated"),
            Self::BufferInUse { buffer } => {
                write!(f, "buffer '{buffer}' is checked out by the running stage")
            }
            Self::ElementMismatch { buffer } => {
                write!(f, "buffer '{buffer}' accessed with the wrong element type")
            }
            Self::InvalidConfig { reason } => write!(f, "invalid arena config: {reason}"),
        }
    }
}

impl Error for ArenaError {}

impl From<ArenaError> for StageError {
    fn from(e: ArenaError) -> Self {
        match e {
            ArenaError::BufferMissing { buffer }
            | ArenaError::BufferInUse { buffer }
            | ArenaError::ElementMismatch { buffer } => StageError::BufferNotReadable { buffer },
            other => StageError::ExecutionFailed {
                reason: other.to_string(),
            },
        }
    }
}
