//! The particle buffer set as a double-buffered arena.
//!
//! # Architecture
//!
//! ```text
//! ParticleArena
//! ├── slot[BufferId] × 20   (one per buffer id; generation A of position/velocity)
//! ├── slot[extra]   × 2     (generation B of position/velocity)
//! └── b_is_staging          (which generation of position/velocity is writable)
//! ```
//!
//! Position and velocity alternate between "published" (read by every
//! stage and by observers) and "staging" (written by integration). On
//! [`ParticleArena::publish`] the roles swap by index; no data is copied.
//! Every other buffer is per-step scratch, sized once and reused in place.
//!
//! A step that fails before `publish()` simply abandons its staging
//! generation, so observers never see a half-finished step.
//!
//! All allocations are zero-initialised `Vec<f32>` / `Vec<u32>`.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod arena;
pub mod config;
pub mod data;
pub mod error;
pub mod snapshot;

pub use arena::ParticleArena;
pub use config::ArenaConfig;
pub use data::BufferData;
pub use error::ArenaError;
pub use snapshot::{BufferCapture, Snapshot};
