//! Step orchestrator for the PCISPH pipeline.
//!
//! Provides [`Solver`], which loads a [`ModelInput`](pcisph_core::ModelInput),
//! validates the stage graph once, and then advances the scene one
//! all-or-nothing step at a time on the selected compute backend.
//! Every successful step yields a [`StepFrame`] with the particle report,
//! sampled watches and [`StepMetrics`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod checkpoint;
pub mod config;
pub mod frame;
pub mod metrics;
pub mod solver;

pub use checkpoint::{Checkpoint, CheckpointLog};
pub use config::{InitError, SolverConfig, TimeConfig};
pub use frame::StepFrame;
pub use metrics::StepMetrics;
pub use solver::Solver;
