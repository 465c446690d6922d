//! Spatial indexing for the PCISPH step pipeline.
//!
//! Particles are hashed into a uniform lattice whose cell size equals the
//! smoothing radius, stably sorted by cell, and bucketed through a
//! forward-filled table so that any cell, empty or not, resolves to a
//! valid particle range. The neighbor finder scans the 3×3×3 block of
//! cells around each particle and fills a fixed-capacity list.
//!
//! Everything here is a pure function over flat slices. Stages in
//! `pcisph-stages` call these per work item; the host-side passes
//! ([`sort_by_cell`], [`fix_bucket_table`], [`inverse_permutation`]) run
//! whole-slice.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod geometry;
pub mod index;
pub mod neighbor;

pub use geometry::GridGeometry;
pub use index::{
    build_bucket_table, first_particle_in_cell, fix_bucket_table, inverse_permutation,
    sort_by_cell,
};
pub use neighbor::{NeighborQuery, NeighborScan, EMPTY_DISTANCE};
