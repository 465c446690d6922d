//! Solver configuration, validation, and initialisation errors.
//!
//! [`SolverConfig`] is the builder input for [`Solver::new`](crate::Solver::new).
//! [`validate()`](SolverConfig::validate) checks the numeric ranges at
//! startup; the solver constructor then validates the model and the step
//! graph itself.

use std::error::Error;
use std::fmt;

use pcisph_arena::ArenaError;
use pcisph_backend::DeviceProfile;
use pcisph_core::{
    BackendError, ConfigurationError, SphParams, DEFAULT_NEIGHBOR_CAPACITY,
    DEFAULT_PCISPH_ITERATIONS,
};
use pcisph_stage::GraphError;

// ── SolverConfig ───────────────────────────────────────────────────

/// Everything a solver needs besides the model.
#[derive(Clone, Debug, PartialEq)]
pub struct SolverConfig {
    /// Physical parameters.
    pub params: SphParams,
    /// Predictor-corrector passes per step. Default: 3.
    pub pcisph_iterations: u32,
    /// Neighbor-list slots per particle. Default: 32.
    pub neighbor_capacity: usize,
    /// Compute device class. Default: [`DeviceProfile::Cpu`].
    pub device: DeviceProfile,
    /// Worker threads for the data-parallel profile. `None` = one per core.
    pub threads: Option<usize>,
    /// Copy every buffer after every stage into the checkpoint log.
    /// Default: false.
    pub record_checkpoints: bool,
}

impl Default for SolverConfig {
    fn default() -> Self {
        Self {
            params: SphParams::default(),
            pcisph_iterations: DEFAULT_PCISPH_ITERATIONS,
            neighbor_capacity: DEFAULT_NEIGHBOR_CAPACITY,
            device: DeviceProfile::Cpu,
            threads: None,
            record_checkpoints: false,
        }
    }
}

impl SolverConfig {
    /// Check parameter ranges. Does not look at the model.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        self.params.validate()?;
        if self.pcisph_iterations == 0 {
            return Err(ConfigurationError::InvalidParameter {
                name: "pcisph_iterations",
                reason: "at least one correction pass is required".into(),
            });
        }
        if self.neighbor_capacity == 0 {
            return Err(ConfigurationError::InvalidParameter {
                name: "neighbor_capacity",
                reason: "must be at least 1".into(),
            });
        }
        if self.threads == Some(0) {
            return Err(ConfigurationError::InvalidParameter {
                name: "threads",
                reason: "an explicit thread count must be at least 1".into(),
            });
        }
        Ok(())
    }
}

// ── TimeConfig ─────────────────────────────────────────────────────

/// How far [`Solver::solve`](crate::Solver::solve) advances.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct TimeConfig {
    /// Step size, seconds. Default: [`SphParams::DEFAULT_TIME_STEP`].
    pub time_step: f32,
    /// Number of steps. Default: 1.
    pub steps: u32,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            time_step: SphParams::DEFAULT_TIME_STEP,
            steps: 1,
        }
    }
}

impl TimeConfig {
    /// Check that the step size is usable.
    pub fn validate(&self) -> Result<(), ConfigurationError> {
        if !self.time_step.is_finite() || self.time_step <= 0.0 {
            return Err(ConfigurationError::InvalidParameter {
                name: "time_step",
                reason: format!("must be finite and positive, got {}", self.time_step),
            });
        }
        Ok(())
    }
}

// ── InitError ──────────────────────────────────────────────────────

/// Errors from [`Solver::new`](crate::Solver::new).
#[derive(Debug, PartialEq)]
pub enum InitError {
    /// The model or the configuration is invalid.
    Configuration(ConfigurationError),
    /// The compute device could not be set up.
    Backend(BackendError),
    /// The step graph does not validate.
    Graph(GraphError),
    /// The buffer layout could not be allocated.
    Arena(ArenaError),
}

impl fmt::Display for InitError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Configuration(e) => write!(f, "configuration: {e}"),
            Self::Backend(e) => write!(f, "backend: {e}"),
            Self::Graph(e) => write!(f, "step graph: {e}"),
            Self::Arena(e) => write!(f, "arena: {e}"),
        }
    }
}

impl Error for InitError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Configuration(e) => Some(e),
            Self::Backend(e) => Some(e),
            Self::Graph(e) => Some(e),
            Self::Arena(e) => Some(e),
        }
    }
}

impl From<ConfigurationError> for InitError {
    fn from(e: ConfigurationError) -> Self {
        Self::Configuration(e)
    }
}

impl From<BackendError> for InitError {
    fn from(e: BackendError) -> Self {
        Self::Backend(e)
    }
}

impl From<GraphError> for InitError {
    fn from(e: GraphError) -> Self {
        Self::Graph(e)
    }
}

impl From<ArenaError> for InitError {
    fn from(e: ArenaError) -> Self {
        Self::Arena(e)
    }
}
