//! The PCISPH step, one [`Stage`](pcisph_stage::Stage) per state.
//!
//! # Step order
//!
//! ```text
//! clear → hash → ‖ sort → sort_post_pass → index → ‖ index_post_pass
//!   → find_neighbors → compute_density → compute_forces_init_pressure
//!   → [compute_elastic_forces]
//!   → (predict_positions → predict_density → correct_pressure
//!        → compute_pressure_force) × iterations
//!   → integrate
//! ```
//!
//! `‖` marks a host stage that waits for the device work before it.
//! Everything else is data-parallel over particles or cells.
//!
//! Grid-facing stages work in scene units. Densities, forces and the
//! kernel functions in [`kernels`] work in metres via
//! `simulation_scale`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod density;
pub mod forces;
pub mod grid;
pub mod integrate;
pub mod kernels;
pub mod names;
pub mod neighbors;
pub mod pcisph;
pub mod pipeline;

#[cfg(test)]
mod testing;

pub use density::{ComputeDensity, PredictDensity};
pub use forces::{ComputeElasticForces, ComputeForcesInitPressure};
pub use grid::{Clear, Hash, Index, IndexPostPass, Sort, SortPostPass};
pub use integrate::Integrate;
pub use neighbors::FindNeighbors;
pub use pcisph::{ComputePressureForce, CorrectPressure, PredictPositions};
pub use pipeline::{standard_schedule, standard_stages, ELASTIC_STAGE};
