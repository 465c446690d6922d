//! Benchmark scenes and utilities for the PCISPH solver.
//!
//! Provides pre-built scenes for benchmarking:
//!
//! - [`reference_scene`]: ~1.2K liquid particles over a boundary floor
//! - [`stress_scene`]: ~9K liquid particles over a boundary floor
//! - [`IndexedScene`]: a scene hashed and sorted once, ready for
//!   neighbor-search benchmarks

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use pcisph_core::{ConfigurationError, ModelInput, SphParams};
use pcisph_grid::{build_bucket_table, sort_by_cell, GridGeometry, NeighborQuery};
use pcisph_test_utils::fixtures;

/// A 12×8×12 liquid block in a tank.
pub fn reference_scene(seed: u64) -> ModelInput {
    fixtures::tank([12, 8, 12], seed)
}

/// A 24×16×24 liquid block in a tank.
pub fn stress_scene(seed: u64) -> ModelInput {
    fixtures::tank([24, 16, 24], seed)
}

/// Per-particle cell ids of `model` on `geometry`.
pub fn hash_all(model: &ModelInput, geometry: &GridGeometry) -> Vec<u32> {
    model
        .positions
        .iter()
        .map(|p| geometry.hash([p[0], p[1], p[2]]).0)
        .collect()
}

/// A scene with its spatial index built once.
pub struct IndexedScene {
    /// Lattice over the scene bounds.
    pub geometry: GridGeometry,
    /// Forward-filled bucket table.
    pub bucket_table: Vec<u32>,
    /// Positions in cell order, stride 4.
    pub sorted_positions: Vec<f32>,
    /// Physical parameters used for the cutoff.
    pub params: SphParams,
}

impl IndexedScene {
    /// Hash, sort and tabulate `model` with default parameters.
    pub fn build(model: &ModelInput) -> Result<Self, ConfigurationError> {
        let params = SphParams::default();
        let geometry = GridGeometry::new(&model.bounds, params.h)?;
        let mut cells = hash_all(model, &geometry);
        let mut order: Vec<u32> = (0..cells.len() as u32).collect();
        sort_by_cell(&mut cells, &mut order, &mut Vec::new());
        let bucket_table = build_bucket_table(&cells, geometry.cell_count());
        let sorted_positions = order
            .iter()
            .flat_map(|&o| model.positions[o as usize])
            .collect();
        Ok(Self {
            geometry,
            bucket_table,
            sorted_positions,
            params,
        })
    }

    /// Number of particles.
    pub fn particle_count(&self) -> usize {
        self.sorted_positions.len() / 4
    }

    /// Neighbor query over the indexed scene.
    pub fn query(&self) -> NeighborQuery<'_> {
        NeighborQuery {
            geometry: &self.geometry,
            bucket_table: &self.bucket_table,
            sorted_positions: &self.sorted_positions,
            radius: self.params.h,
            simulation_scale: self.params.simulation_scale,
        }
    }
}
