//! Bounds-checked addressing of cells in a logical grid.

// Grid extents are far below i64::MAX
#![allow(clippy::cast_possible_wrap)]

use crate::types::CellCoord;

/// Dimensions of a logical cell grid.
///
/// Cells are numbered `k * (nx * ny) + j * nx + i`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct GridDims {
    /// Cells along x.
    pub nx: usize,
    /// Cells along y.
    pub ny: usize,
    /// Cells along z (1 for 2D grids).
    pub nz: usize,
}

impl GridDims {
    /// Create grid dimensions.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_mir::{CellCoord, GridDims};
    ///
    /// let dims = GridDims::new(3, 2, 1);
    /// assert_eq!(dims.cell_count(), 6);
    /// assert_eq!(dims.linear(CellCoord::new(2, 1, 0)), Some(5));
    /// assert_eq!(dims.linear(CellCoord::new(3, 0, 0)), None);
    /// ```
    #[must_use]
    pub const fn new(nx: usize, ny: usize, nz: usize) -> Self {
        Self { nx, ny, nz }
    }

    /// Total number of cells.
    #[must_use]
    pub const fn cell_count(&self) -> usize {
        self.nx * self.ny * self.nz
    }

    /// Whether a coordinate lies inside the grid.
    #[must_use]
    pub const fn contains(&self, cell: CellCoord) -> bool {
        cell.i < self.nx && cell.j < self.ny && cell.k < self.nz
    }

    /// Linear id of a cell, or `None` if it is outside the grid.
    #[must_use]
    pub const fn linear(&self, cell: CellCoord) -> Option<usize> {
        if self.contains(cell) {
            Some(cell.k * (self.nx * self.ny) + cell.j * self.nx + cell.i)
        } else {
            None
        }
    }

    /// Logical coordinate of a linear cell id.
    #[must_use]
    pub const fn coord(&self, id: usize) -> CellCoord {
        let i = id % self.nx;
        let j = (id / self.nx) % self.ny;
        let k = id / (self.nx * self.ny);
        CellCoord { i, j, k }
    }

    /// Linear id of the cell at a signed offset from `cell`, if inside the grid.
    #[must_use]
    pub fn offset(&self, cell: CellCoord, delta: [i64; 3]) -> Option<usize> {
        let i = usize::try_from(cell.i as i64 + delta[0]).ok()?;
        let j = usize::try_from(cell.j as i64 + delta[1]).ok()?;
        let k = usize::try_from(cell.k as i64 + delta[2]).ok()?;
        self.linear(CellCoord::new(i, j, k))
    }

    /// Iterate over all cell coordinates in linear-id order.
    pub fn iter(&self) -> impl Iterator<Item = CellCoord> + '_ {
        (0..self.nz).flat_map(move |k| {
            (0..self.ny).flat_map(move |j| (0..self.nx).map(move |i| CellCoord::new(i, j, k)))
        })
    }
}
