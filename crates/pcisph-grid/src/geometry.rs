//! Lattice geometry: dimensions, hashing and the 27-cell stencil.

use pcisph_core::{CellId, ConfigurationError, SceneBounds};

/// A uniform 3D lattice laid over the scene bounding box.
///
/// Cell count per axis is `ceil(extent / cell_size) + 1`. Cells are
/// linearised x-fastest: `ix + iy * nx + iz * nx * ny`.
#[derive(Clone, Debug, PartialEq)]
pub struct GridGeometry {
    min: [f32; 3],
    cell_size: f32,
    inv_cell_size: f32,
    dims: [u32; 3],
}

impl GridGeometry {
    /// Derive the lattice for `bounds` with cells of edge `cell_size`.
    ///
    /// Fails if the bounds are invalid, the cell size is not positive, or
    /// the cell count does not fit a `u32` index with room for the
    /// trailing sentinel.
    pub fn new(bounds: &SceneBounds, cell_size: f32) -> Result<Self, ConfigurationError> {
        bounds.validate()?;
        if !cell_size.is_finite() || cell_size <= 0.0 {
            return Err(ConfigurationError::InvalidParameter {
                name: "h",
                reason: format!("cell size must be finite and positive, got {cell_size}"),
            });
        }
        let extent = bounds.extent();
        let mut dims = [1u32; 3];
        for axis in 0..3 {
            let cells = (extent[axis] / cell_size).ceil() + 1.0;
            if cells >= u32::MAX as f32 {
                return Err(ConfigurationError::InvalidBounds {
                    reason: format!("axis {axis} needs {cells} cells"),
                });
            }
            dims[axis] = cells as u32;
        }
        let total = u64::from(dims[0]) * u64::from(dims[1]) * u64::from(dims[2]);
        if total >= u64::from(u32::MAX) {
            return Err(ConfigurationError::InvalidBounds {
                reason: format!("grid of {total} cells exceeds the u32 index space"),
            });
        }
        Ok(Self {
            min: bounds.min,
            cell_size,
            inv_cell_size: 1.0 / cell_size,
            dims,
        })
    }

    /// Cells per axis.
    pub fn dims(&self) -> [u32; 3] {
        self.dims
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.dims.iter().map(|&d| d as usize).product()
    }

    /// Cell edge length in scene units.
    pub fn cell_size(&self) -> f32 {
        self.cell_size
    }

    /// Integer cell coordinates of `p`, clamped into the lattice.
    #[inline]
    pub fn cell_coords(&self, p: [f32; 3]) -> [u32; 3] {
        let mut out = [0u32; 3];
        for axis in 0..3 {
            let f = ((p[axis] - self.min[axis]) * self.inv_cell_size).floor();
            let hi = (self.dims[axis] - 1) as f32;
            // NaN fails both comparisons and lands in cell 0.
            out[axis] = if f > 0.0 { f.min(hi) as u32 } else { 0 };
        }
        out
    }

    /// Linear index of integer cell coordinates.
    #[inline]
    pub fn linear(&self, c: [u32; 3]) -> CellId {
        CellId(c[0] + c[1] * self.dims[0] + c[2] * self.dims[0] * self.dims[1])
    }

    /// Cell id of position `p`.
    #[inline]
    pub fn hash(&self, p: [f32; 3]) -> CellId {
        self.linear(self.cell_coords(p))
    }

    /// The up-to-27 cells of the 3×3×3 block centred on `c`, in scan order
    /// (`dz`, then `dy`, then `dx`, each `-1..=1`). Cells off the lattice
    /// are skipped.
    pub fn stencil(&self, c: [u32; 3]) -> impl Iterator<Item = CellId> + '_ {
        let dims = self.dims;
        (-1i64..=1).flat_map(move |dz| {
            (-1i64..=1).flat_map(move |dy| {
                (-1i64..=1).filter_map(move |dx| {
                    let x = i64::from(c[0]) + dx;
                    let y = i64::from(c[1]) + dy;
                    let z = i64::from(c[2]) + dz;
                    let inside = x >= 0
                        && y >= 0
                        && z >= 0
                        && x < i64::from(dims[0])
                        && y < i64::from(dims[1])
                        && z < i64::from(dims[2]);
                    inside.then(|| self.linear([x as u32, y as u32, z as u32]))
                })
            })
        })
    }
}
