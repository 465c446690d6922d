//! What a solver exposes after each step.
//!
//! - [`ParticleReport`]: scattered position and velocity of every
//!   non-boundary particle.
//! - [`WatchPath`] / [`WatchList`]: named scalar lookups such as
//!   `particle[12].velocity.y`, parsed once and resolved against a
//!   [`Snapshot`](pcisph_arena::Snapshot) by a pure function.
//! - [`scan_non_finite`] and [`overlapping_particles`]: checks the
//!   solver itself never performs. NaN in the result is the caller's
//!   call to make.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod check;
pub mod path;
pub mod report;
pub mod watch;

pub use check::{overlapping_particles, scan_non_finite, NonFinite, Overlap};
pub use path::{resolve, Axis, PathSegment, Quantity, WatchPath, WatchTarget};
pub use report::ParticleReport;
pub use watch::{WatchList, WatchSample};
