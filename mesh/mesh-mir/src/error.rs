//! Error types for material interface reconstruction.

use std::collections::TryReserveError;

use thiserror::Error;

use crate::types::NodeKey;

/// Result type for reconstruction operations.
pub type MirResult<T> = Result<T, MirError>;

/// Errors that can occur during material interface reconstruction.
///
/// Every error is terminal: a reconstruction that fails produces no output.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum MirError {
    /// An axis has too few coordinates to define any cell.
    #[error("axis {axis} needs at least {minimum} coordinates, got {actual}")]
    AxisTooShort {
        /// Axis name (`x`, `y` or `z`).
        axis: char,
        /// Minimum number of coordinates.
        minimum: usize,
        /// Number of coordinates provided.
        actual: usize,
    },

    /// Axis coordinates are not strictly increasing (grid is not rectilinear).
    #[error("axis {axis} is not strictly increasing at index {index}")]
    NonRectilinear {
        /// Axis name (`x`, `y` or `z`).
        axis: char,
        /// Index of the first offending coordinate.
        index: usize,
    },

    /// Number of cells in the connectivity does not match the grid.
    #[error("expected {expected} cells, got {actual}")]
    CellCountMismatch {
        /// Cell count implied by the grid dimensions.
        expected: usize,
        /// Cell count provided.
        actual: usize,
    },

    /// A cell has the wrong number of corner nodes.
    #[error("cell {cell} has {actual} nodes, expected {expected}")]
    InvalidCellNodes {
        /// Cell id.
        cell: usize,
        /// Expected corner count (4 in 2D, 8 in 3D).
        expected: usize,
        /// Corner count provided.
        actual: usize,
    },

    /// A cell references a node outside the original point range.
    #[error("cell {cell} references node {node} (mesh has {point_count} points)")]
    NodeOutOfBounds {
        /// Cell id.
        cell: usize,
        /// Offending node id.
        node: u32,
        /// Number of original points.
        point_count: usize,
    },

    /// The material field has no materials.
    #[error("material field has no materials")]
    NoMaterials,

    /// The material id array does not cover every cell.
    #[error("material field covers {actual} cells, mesh has {expected}")]
    MaterialCountMismatch {
        /// Cell count of the mesh.
        expected: usize,
        /// Length of the material id array.
        actual: usize,
    },

    /// A clean cell uses a material id outside `0..material_count`.
    #[error("cell {cell} uses material {material} (field has {material_count} materials)")]
    MaterialOutOfRange {
        /// Cell id.
        cell: usize,
        /// Offending material id.
        material: i32,
        /// Number of materials in the field.
        material_count: usize,
    },

    /// A mixed cell has no volume-fraction vector.
    #[error("mixed cell {0} has no volume fractions")]
    MissingVolumeFractions(usize),

    /// A volume-fraction vector is malformed.
    #[error("invalid volume fractions for cell {cell}: {reason}")]
    InvalidVolumeFractions {
        /// Cell id.
        cell: usize,
        /// Description of the problem.
        reason: String,
    },

    /// Voxel resolution has a zero component.
    #[error("voxel resolution must be positive, got {0:?}")]
    InvalidResolution([usize; 3]),

    /// Neighbor window radius is zero on every axis, leaving no neighbors.
    #[error("neighborhood radius must be positive on some axis, got {0:?}")]
    InvalidNeighborhood([usize; 3]),

    /// Temperature is negative or not finite.
    #[error("annealing temperature must be finite and >= 0, got {0}")]
    InvalidTemperature(f64),

    /// Annealing budget is negative or not finite.
    #[error("annealing time must be finite and >= 0 seconds, got {0}")]
    InvalidAnnealingTime(f64),

    /// A buffer could not be allocated.
    #[error("failed to allocate {what}")]
    Allocation {
        /// Which buffer failed.
        what: &'static str,
        /// Underlying allocator error.
        #[source]
        source: TryReserveError,
    },

    /// A fine node expected in the dedup map was never created.
    #[error("internal error: fine node {key:?} was never created")]
    MissingNode {
        /// The fine-grid key that was looked up.
        key: NodeKey,
    },

    /// A face centroid was referenced before it was created.
    #[error("internal error: face {face} of cell {cell} has no centroid")]
    MissingCentroid {
        /// Cell id.
        cell: usize,
        /// Face index (0..6).
        face: usize,
    },

    /// A labeled cell has no counterpart in the original mesh.
    #[error("internal error: cell {0} has no original connectivity")]
    MissingCell(usize),

    /// A face index outside the hexahedron's six faces.
    #[error("internal error: face index {0} out of range")]
    InvalidFace(usize),

    /// An edge index outside the hexahedron's twelve edges.
    #[error("internal error: edge index {0} out of range")]
    InvalidEdge(usize),
}

impl MirError {
    /// Returns `true` for errors that indicate a defect in the stitcher
    /// rather than bad input.
    #[must_use]
    pub const fn is_internal(&self) -> bool {
        matches!(
            self,
            Self::MissingNode { .. }
                | Self::MissingCentroid { .. }
                | Self::MissingCell(_)
                | Self::InvalidFace(_)
                | Self::InvalidEdge(_)
        )
    }
}
