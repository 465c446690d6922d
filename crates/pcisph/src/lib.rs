//! PCISPH: a predictive-corrective incompressible SPH fluid solver.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all PCISPH sub-crates. For most users, adding `pcisph` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use pcisph::prelude::*;
//!
//! // A 20-unit box with one liquid particle in the middle.
//! let mut model = ModelInput::new(SceneBounds::new([0.0; 3], [20.0; 3]));
//! model.push_particle([10.0, 10.0, 10.0], ParticleKind::Liquid);
//!
//! let mut solver = Solver::new(&model, SolverConfig::default()).unwrap();
//! solver.watch("particle[0].position.y").unwrap();
//! solver.start_watching();
//!
//! let frames = solver
//!     .solve(&TimeConfig { time_step: SphParams::DEFAULT_TIME_STEP, steps: 3 })
//!     .unwrap();
//! assert_eq!(frames.len(), 3);
//! assert_eq!(solver.current_step(), StepId(3));
//! assert!(frames[2].watch("particle[0].position.y").unwrap() < 10.0);
//! assert!(scan_non_finite(&solver.snapshot()).is_none());
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `pcisph-core` | IDs, buffer catalogue, parameters, model input, errors |
//! | [`arena`] | `pcisph-arena` | Double-buffered particle arena and `Snapshot` |
//! | [`grid`] | `pcisph-grid` | Cell hashing, bucket table and neighbor search |
//! | [`backend`] | `pcisph-backend` | Compute backend trait, host backends, executor |
//! | [`stage`] | `pcisph-stage` | Stage trait and step-graph validation |
//! | [`stages`] | `pcisph-stages` | The standard stages and SPH kernels |
//! | [`obs`] | `pcisph-obs` | Particle reports, watch paths, sanity checks |
//! | [`engine`] | `pcisph-engine` | `Solver`, configuration, metrics, checkpoints |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, parameters, and errors (`pcisph-core`).
pub use pcisph_core as types;

/// Particle storage (`pcisph-arena`).
///
/// Most users only need [`arena::Snapshot`], which is also in the
/// [`prelude`].
pub use pcisph_arena as arena;

/// Spatial index and neighbor search (`pcisph-grid`).
pub use pcisph_grid as grid;

/// Compute backends (`pcisph-backend`).
///
/// [`backend::DeviceProfile`] selects between the serial and the pooled
/// host backend.
pub use pcisph_backend as backend;

/// Stage trait and graph validation (`pcisph-stage`).
///
/// The [`stage::Stage`] trait is the extension point for custom pipelines
/// run through [`engine::Solver::with_pipeline`].
pub use pcisph_stage as stage;

/// The standard step stages (`pcisph-stages`).
pub use pcisph_stages as stages;

/// Result surface (`pcisph-obs`).
pub use pcisph_obs as obs;

/// The step orchestrator (`pcisph-engine`).
pub use pcisph_engine as engine;

/// Common imports for typical solver usage.
///
/// ```rust
/// use pcisph::prelude::*;
/// ```
pub mod prelude {
    // Model and parameters
    pub use pcisph_core::{
        ElasticConnection, ModelInput, ParticleId, ParticleKind, SceneBounds, SphParams, StepId,
    };

    // Errors
    pub use pcisph_core::{BackendError, ConfigurationError, StageError, StepError};

    // Arena
    pub use pcisph_arena::Snapshot;

    // Backend
    pub use pcisph_backend::DeviceProfile;

    // Observation
    pub use pcisph_obs::{overlapping_particles, scan_non_finite, ParticleReport, WatchSample};

    // Engine
    pub use pcisph_engine::{InitError, Solver, SolverConfig, StepFrame, StepMetrics, TimeConfig};
}
