//! Fixed-capacity neighbor search over the bucketed grid.

use pcisph_core::NO_PARTICLE_ID;

use crate::geometry::GridGeometry;

/// Marker stored in empty distance slots.
pub const EMPTY_DISTANCE: f32 = -1.0;

/// Read-only inputs of the FIND_NEIGHBORS stage.
///
/// `sorted_positions` holds `(x, y, z, tag)` per sorted particle and
/// `bucket_table` is the forward-filled table of length
/// `cell_count + 1`.
#[derive(Clone, Copy, Debug)]
pub struct NeighborQuery<'a> {
    /// Lattice the table was built on.
    pub geometry: &'a GridGeometry,
    /// Forward-filled bucket table.
    pub bucket_table: &'a [u32],
    /// Cell-sorted positions, stride 4.
    pub sorted_positions: &'a [f32],
    /// Cutoff in scene units.
    pub radius: f32,
    /// Factor applied to stored distances.
    pub simulation_scale: f32,
}

/// Outcome of scanning one particle.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct NeighborScan {
    /// Slots filled.
    pub found: usize,
    /// Whether at least one neighbor was dropped for lack of capacity.
    pub truncated: bool,
}

impl NeighborQuery<'_> {
    /// Position of sorted particle `i`.
    #[inline]
    fn position(&self, i: usize) -> [f32; 3] {
        let p = &self.sorted_positions[i * 4..i * 4 + 3];
        [p[0], p[1], p[2]]
    }

    /// Fill the neighbor list of sorted particle `i`.
    ///
    /// `ids` and `distances` are that particle's slots; their length is
    /// the capacity. Candidates are visited in stencil order, then in
    /// ascending sorted index within a cell, and the first `capacity`
    /// matches are kept. Unused slots hold `NO_PARTICLE_ID` and
    /// [`EMPTY_DISTANCE`].
    pub fn scan(&self, i: usize, ids: &mut [u32], distances: &mut [f32]) -> NeighborScan {
        ids.fill(NO_PARTICLE_ID);
        distances.fill(EMPTY_DISTANCE);
        let capacity = ids.len().min(distances.len());
        let r2 = self.radius * self.radius;
        let pi = self.position(i);
        let mut scan = NeighborScan::default();

        for cell in self.geometry.stencil(self.geometry.cell_coords(pi)) {
            let c = cell.0 as usize;
            let start = self.bucket_table[c] as usize;
            let end = self.bucket_table[c + 1] as usize;
            for j in start..end {
                if j == i {
                    continue;
                }
                let pj = self.position(j);
                let d = [pj[0] - pi[0], pj[1] - pi[1], pj[2] - pi[2]];
                let d2 = d[0] * d[0] + d[1] * d[1] + d[2] * d[2];
                if d2.is_nan() || d2 >= r2 {
                    continue;
                }
                if scan.found == capacity {
                    scan.truncated = true;
                    return scan;
                }
                ids[scan.found] = j as u32;
                distances[scan.found] = d2.sqrt() * self.simulation_scale;
                scan.found += 1;
            }
        }
        scan
    }
}
