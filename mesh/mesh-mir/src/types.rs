//! Core value types shared by every reconstruction stage.

// Fine-grid coordinates fit in u32 for any grid that fits in memory
#![allow(clippy::cast_possible_truncation)]

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

/// Material identifier.
pub type MaterialId = u32;

/// Logical coordinate of a cell in the original grid.
///
/// `k` is always 0 for 2D grids.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub struct CellCoord {
    /// Index along x.
    pub i: usize,
    /// Index along y.
    pub j: usize,
    /// Index along z.
    pub k: usize,
}

impl CellCoord {
    /// Create a cell coordinate.
    #[must_use]
    pub const fn new(i: usize, j: usize, k: usize) -> Self {
        Self { i, j, k }
    }
}

/// Logical coordinate of a node in the fine index space.
///
/// Corner `(0, 0, 0)` of cell `(i, j, k)` is `(DX*i, DY*j, DZ*k)`. Keys are
/// compared structurally and used only for node deduplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct NodeKey {
    /// Fine index along x.
    pub i: u32,
    /// Fine index along y.
    pub j: u32,
    /// Fine index along z.
    pub k: u32,
}

impl NodeKey {
    /// Create a key from fine coordinates.
    #[must_use]
    pub const fn new(i: usize, j: usize, k: usize) -> Self {
        Self {
            i: i as u32,
            j: j as u32,
            k: k as u32,
        }
    }

    /// The key `n` fine steps further along `axis`.
    #[must_use]
    pub const fn offset(self, axis: usize, n: usize) -> Self {
        let n = n as u32;
        match axis {
            0 => Self { i: self.i + n, ..self },
            1 => Self { j: self.j + n, ..self },
            _ => Self { k: self.k + n, ..self },
        }
    }

    /// The key one fine step further along `axis`.
    #[must_use]
    pub const fn step(self, axis: usize) -> Self {
        self.offset(axis, 1)
    }
}

/// Voxel resolution of a mixed cell (`DX`, `DY`, `DZ`).
///
/// Voxel slots are numbered `x + DX * (y + DY * z)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Resolution {
    /// Voxels along x.
    pub dx: usize,
    /// Voxels along y.
    pub dy: usize,
    /// Voxels along z (1 for 2D grids).
    pub dz: usize,
}

impl Resolution {
    /// Create a resolution.
    #[must_use]
    pub const fn new(dx: usize, dy: usize, dz: usize) -> Self {
        Self { dx, dy, dz }
    }

    /// Number of voxels per mixed cell.
    #[must_use]
    pub const fn voxel_count(&self) -> usize {
        self.dx * self.dy * self.dz
    }

    /// Voxel count along one axis (0 = x, 1 = y, 2 = z).
    #[must_use]
    pub const fn along(&self, axis: usize) -> usize {
        match axis {
            0 => self.dx,
            1 => self.dy,
            _ => self.dz,
        }
    }

    /// Slot index of local voxel `(x, y, z)`.
    #[must_use]
    pub const fn slot(&self, x: usize, y: usize, z: usize) -> usize {
        x + self.dx * (y + self.dy * z)
    }

    /// Local voxel coordinate of a slot index.
    #[must_use]
    pub const fn slot_coords(&self, slot: usize) -> (usize, usize, usize) {
        let x = slot % self.dx;
        let y = (slot / self.dx) % self.dy;
        let z = slot / (self.dx * self.dy);
        (x, y, z)
    }

    /// Fine coordinate of the `(0, 0, 0)` corner of a cell.
    #[must_use]
    pub const fn base(&self, cell: CellCoord) -> (usize, usize, usize) {
        (self.dx * cell.i, self.dy * cell.j, self.dz * cell.k)
    }
}

/// Type tag of an emitted or original mesh cell.
///
/// Corner ordering follows the VTK convention for each type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub enum CellType {
    /// Three-node triangle.
    Triangle,
    /// Four-node quadrilateral, counter-clockwise.
    Quad,
    /// Four-node tetrahedron.
    Tetra,
    /// Five-node pyramid, base first and apex last.
    Pyramid,
    /// Eight-node hexahedron, bottom face then top face.
    Hexahedron,
}

impl CellType {
    /// Number of nodes referenced by a cell of this type.
    #[must_use]
    pub const fn node_count(self) -> usize {
        match self {
            Self::Triangle => 3,
            Self::Quad | Self::Tetra => 4,
            Self::Pyramid => 5,
            Self::Hexahedron => 8,
        }
    }

    /// Whether this is a volumetric cell type.
    #[must_use]
    pub const fn is_3d(self) -> bool {
        matches!(self, Self::Tetra | Self::Pyramid | Self::Hexahedron)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn slot_round_trip_covers_all_voxels() {
        let res = Resolution::new(3, 4, 2);
        assert_eq!(res.voxel_count(), 24);
        for slot in 0..res.voxel_count() {
            let (x, y, z) = res.slot_coords(slot);
            assert!(x < 3 && y < 4 && z < 2);
            assert_eq!(res.slot(x, y, z), slot);
        }
    }

    #[test]
    fn base_scales_by_resolution() {
        let res = Resolution::new(4, 2, 3);
        assert_eq!(res.base(CellCoord::new(1, 2, 3)), (4, 4, 9));
    }

    #[test]
    fn node_key_step() {
        let key = NodeKey::new(1, 2, 3);
        assert_eq!(key.step(0), NodeKey::new(2, 2, 3));
        assert_eq!(key.step(1), NodeKey::new(1, 3, 3));
        assert_eq!(key.step(2), NodeKey::new(1, 2, 4));
        assert_eq!(key.offset(0, 3), NodeKey::new(4, 2, 3));
    }

    #[test]
    fn cell_type_node_counts() {
        assert_eq!(CellType::Triangle.node_count(), 3);
        assert_eq!(CellType::Quad.node_count(), 4);
        assert_eq!(CellType::Tetra.node_count(), 4);
        assert_eq!(CellType::Pyramid.node_count(), 5);
        assert_eq!(CellType::Hexahedron.node_count(), 8);
        assert!(!CellType::Quad.is_3d());
        assert!(CellType::Pyramid.is_3d());
    }
}
