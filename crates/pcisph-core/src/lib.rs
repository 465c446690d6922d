//! Core types for the PCISPH step pipeline.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by every other crate in the workspace: typed
//! identifiers, the buffer catalogue, particle kinds, physical parameters,
//! the model input handed over by an external loader, and the error
//! taxonomy.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod buffer;
pub mod error;
pub mod id;
pub mod model;
pub mod params;
pub mod particle;

pub use buffer::{BufferId, BufferSet, ElementType, Extent};
pub use error::{BackendError, ConfigurationError, StageError, StepError};
pub use id::{CellId, EventId, ParticleId, StepId};
pub use model::{ElasticConnection, ModelInput, SceneBounds};
pub use params::{
    KernelCoefficients, SphParams, DEFAULT_NEIGHBOR_CAPACITY, DEFAULT_PCISPH_ITERATIONS,
    NO_CELL_ID, NO_PARTICLE_ID, WORK_GROUP_SIZE,
};
pub use particle::{ParticleCounts, ParticleKind};
