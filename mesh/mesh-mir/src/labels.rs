//! Per-cell material labels at voxel resolution.

// Fine-grid extents are far below i64::MAX
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]
#![allow(clippy::cast_possible_truncation)]

use crate::error::{MirError, MirResult};
use crate::grid::GridDims;
use crate::types::{CellCoord, MaterialId, Resolution};

/// Material labels of one original cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CellLabel {
    /// A single-material cell. No voxel array is allocated.
    Clean(MaterialId),
    /// A mixed cell with one label per voxel slot.
    Mixed(Box<[MaterialId]>),
}

impl CellLabel {
    /// Whether this cell is mixed.
    #[must_use]
    pub const fn is_mixed(&self) -> bool {
        matches!(self, Self::Mixed(_))
    }
}

/// Result of sampling the global fine label grid.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Sample {
    /// The coordinate lies outside the domain.
    Outside,
    /// The coordinate lies in a clean cell with this material.
    Clean(MaterialId),
    /// The coordinate lies in a mixed cell voxel with this label.
    Voxel(MaterialId),
}

/// Labels for every cell of the grid.
///
/// Clean cells store one material id; mixed cells own `DX*DY*DZ` labels.
/// After initial assignment, labels of a mixed cell are only ever
/// permuted, so its per-material counts never change.
#[derive(Debug, Clone)]
pub struct VoxelLabelGrid {
    dims: GridDims,
    resolution: Resolution,
    cells: Vec<CellLabel>,
    mixed_cells: Vec<usize>,
}

impl VoxelLabelGrid {
    /// Build the label grid from per-cell material ids.
    ///
    /// A negative id marks a mixed cell; its voxel array is allocated and
    /// zero-filled, ready for assignment. Mixed cells are registered in
    /// linear-id order.
    ///
    /// # Errors
    ///
    /// Returns [`MirError::InvalidResolution`] if a resolution component is
    /// zero, [`MirError::MaterialCountMismatch`] if `cell_materials` does
    /// not cover the grid, and [`MirError::Allocation`] if a voxel array
    /// cannot be allocated.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_mir::{GridDims, Resolution, VoxelLabelGrid};
    ///
    /// let dims = GridDims::new(2, 1, 1);
    /// let grid = VoxelLabelGrid::build(dims, Resolution::new(4, 4, 1), &[0, -1])?;
    /// assert_eq!(grid.mixed_cells(), &[1]);
    /// assert_eq!(grid.voxels(1).map(<[u32]>::len), Some(16));
    /// # Ok::<(), mesh_mir::MirError>(())
    /// ```
    pub fn build(
        dims: GridDims,
        resolution: Resolution,
        cell_materials: &[i32],
    ) -> MirResult<Self> {
        if cell_materials.len() != dims.cell_count() {
            return Err(MirError::MaterialCountMismatch {
                expected: dims.cell_count(),
                actual: cell_materials.len(),
            });
        }

        let voxel_count = resolution.voxel_count();
        if voxel_count == 0 {
            return Err(MirError::InvalidResolution([
                resolution.dx,
                resolution.dy,
                resolution.dz,
            ]));
        }
        let mut cells = Vec::new();
        cells
            .try_reserve_exact(cell_materials.len())
            .map_err(|source| MirError::Allocation {
                what: "cell label table",
                source,
            })?;
        let mut mixed_cells = Vec::new();

        for (id, &material) in cell_materials.iter().enumerate() {
            if material >= 0 {
                cells.push(CellLabel::Clean(material as MaterialId));
                continue;
            }

            let mut labels: Vec<MaterialId> = Vec::new();
            labels
                .try_reserve_exact(voxel_count)
                .map_err(|source| MirError::Allocation {
                    what: "voxel labels",
                    source,
                })?;
            labels.resize(voxel_count, 0);
            cells.push(CellLabel::Mixed(labels.into_boxed_slice()));
            mixed_cells.push(id);
        }

        Ok(Self {
            dims,
            resolution,
            cells,
            mixed_cells,
        })
    }

    /// Cell dimensions of the grid.
    #[must_use]
    pub const fn dims(&self) -> GridDims {
        self.dims
    }

    /// Voxel resolution of mixed cells.
    #[must_use]
    pub const fn resolution(&self) -> Resolution {
        self.resolution
    }

    /// Labels of a cell.
    #[must_use]
    pub fn label(&self, cell: usize) -> Option<&CellLabel> {
        self.cells.get(cell)
    }

    /// Linear ids of all mixed cells, in linear-id order.
    #[must_use]
    pub fn mixed_cells(&self) -> &[usize] {
        &self.mixed_cells
    }

    /// Whether a cell is mixed. Out-of-range ids are not mixed.
    #[must_use]
    pub fn is_mixed(&self, cell: usize) -> bool {
        self.cells.get(cell).is_some_and(CellLabel::is_mixed)
    }

    /// Material of a clean cell.
    #[must_use]
    pub fn clean_material(&self, cell: usize) -> Option<MaterialId> {
        match self.cells.get(cell)? {
            CellLabel::Clean(m) => Some(*m),
            CellLabel::Mixed(_) => None,
        }
    }

    /// Voxel labels of a mixed cell.
    #[must_use]
    pub fn voxels(&self, cell: usize) -> Option<&[MaterialId]> {
        match self.cells.get(cell)? {
            CellLabel::Mixed(labels) => Some(labels),
            CellLabel::Clean(_) => None,
        }
    }

    /// Mutable voxel labels of a mixed cell.
    pub fn voxels_mut(&mut self, cell: usize) -> Option<&mut [MaterialId]> {
        match self.cells.get_mut(cell)? {
            CellLabel::Mixed(labels) => Some(labels),
            CellLabel::Clean(_) => None,
        }
    }

    /// Exchange the labels of two voxel slots inside one mixed cell.
    ///
    /// Does nothing for clean cells or out-of-range slots.
    pub fn swap(&mut self, cell: usize, a: usize, b: usize) {
        if let Some(labels) = self.voxels_mut(cell) {
            if a < labels.len() && b < labels.len() {
                labels.swap(a, b);
            }
        }
    }

    /// Number of voxels carrying each material in a mixed cell.
    #[must_use]
    pub fn material_counts(&self, cell: usize, material_count: usize) -> Option<Vec<usize>> {
        let labels = self.voxels(cell)?;
        let mut counts = vec![0; material_count];
        for &label in labels {
            if let Some(count) = counts.get_mut(label as usize) {
                *count += 1;
            }
        }
        Some(counts)
    }

    /// Extent of the fine index space `(DX*nx, DY*ny, DZ*nz)`.
    #[must_use]
    pub const fn fine_extent(&self) -> (usize, usize, usize) {
        (
            self.resolution.dx * self.dims.nx,
            self.resolution.dy * self.dims.ny,
            self.resolution.dz * self.dims.nz,
        )
    }

    /// Fine coordinate of the `(0, 0, 0)` corner of a cell.
    #[must_use]
    pub const fn cell_base(&self, cell: usize) -> (usize, usize, usize) {
        self.resolution.base(self.dims.coord(cell))
    }

    /// Sample the global fine label grid at `(gx, gy, gz)`.
    pub(crate) fn sample(&self, gx: i64, gy: i64, gz: i64) -> Sample {
        let (fx, fy, fz) = self.fine_extent();
        if gx < 0
            || gy < 0
            || gz < 0
            || gx >= fx as i64
            || gy >= fy as i64
            || gz >= fz as i64
        {
            return Sample::Outside;
        }

        let (gx, gy, gz) = (gx as usize, gy as usize, gz as usize);
        let res = self.resolution;
        let cell = CellCoord::new(gx / res.dx, gy / res.dy, gz / res.dz);
        let Some(id) = self.dims.linear(cell) else {
            return Sample::Outside;
        };

        match &self.cells[id] {
            CellLabel::Clean(m) => Sample::Clean(*m),
            CellLabel::Mixed(labels) => {
                Sample::Voxel(labels[res.slot(gx % res.dx, gy % res.dy, gz % res.dz)])
            }
        }
    }
}
