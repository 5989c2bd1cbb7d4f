//! Emission of zones, nodes and connectivity from a frozen label grid.
//!
//! Stitching runs in two passes. The node pass inserts the fine corner
//! lattice of every mixed cell into a dedup map keyed by [`NodeKey`]; nodes
//! on an original cell corner alias the original mesh node. The zone pass
//! then visits cells in linear-id order:
//!
//! - clean cells are passed through with their original connectivity;
//! - mixed cells emit one quad or hexahedron per voxel;
//! - cleanish cells are re-meshed so that their boundary matches the fine
//!   nodes of every mixed neighbor (a triangle fan in 2D, pyramids and
//!   tetrahedra around a centroid in 3D).
//!
//! Because every fine node is created before any cleanish cell looks it
//! up, the result does not depend on the order in which neighbors appear.

// Node ids are stored as u32 like the original connectivity
#![allow(clippy::cast_possible_truncation)]

mod classify;
mod cleanish2d;
mod cleanish3d;
mod discretize;

pub use classify::{CellClass, classify};

use hashbrown::HashMap;
use nalgebra::Point3;
use smallvec::SmallVec;
use tracing::debug;

use crate::error::{MirError, MirResult};
use crate::input::{MaterialField, MeshInput, OriginalCell};
use crate::labels::VoxelLabelGrid;
use crate::result::{ReconstructedCoord, ReconstructedZone};
use crate::types::{CellType, MaterialId, NodeKey};

/// Raw stitcher output.
#[derive(Debug, Clone, Default)]
pub struct StitchOutput {
    /// Emitted zones.
    pub zones: Vec<ReconstructedZone>,
    /// Emitted new nodes.
    pub coords: Vec<ReconstructedCoord>,
    /// Flat node-id list.
    pub connectivity: Vec<u32>,
    /// Cells passed through unchanged.
    pub clean_cells: usize,
    /// Cells re-meshed against a mixed neighbor.
    pub cleanish_cells: usize,
    /// Cells discretized into voxels.
    pub mixed_cells: usize,
}

/// Builds the reconstructed mesh from a label grid.
pub struct MeshStitcher<'a> {
    mesh: &'a MeshInput,
    labels: &'a VoxelLabelGrid,
    three_d: bool,
    out: StitchOutput,
    nodes: HashMap<NodeKey, u32>,
    face_centroids: HashMap<(usize, usize), u32>,
}

impl<'a> MeshStitcher<'a> {
    /// Create a stitcher over `labels` for the given original mesh.
    #[must_use]
    pub fn new(mesh: &'a MeshInput, labels: &'a VoxelLabelGrid) -> Self {
        Self {
            mesh,
            labels,
            three_d: mesh.is_3d(),
            out: StitchOutput::default(),
            nodes: HashMap::new(),
            face_centroids: HashMap::new(),
        }
    }

    /// Run both passes and return the emitted mesh.
    ///
    /// # Errors
    ///
    /// Returns an internal error if the geometric case analysis references
    /// a fine node or face centroid that was never created.
    pub fn stitch(mut self) -> MirResult<StitchOutput> {
        let labels = self.labels;
        let classes = classify(labels, self.three_d);

        for &cell in labels.mixed_cells() {
            self.insert_cell_lattice(cell)?;
        }
        debug!(fine_nodes = self.nodes.len(), "Inserted mixed-cell lattices");

        for (cell, class) in classes.into_iter().enumerate() {
            match class {
                CellClass::Clean => {
                    let mat = labels.clean_material(cell).unwrap_or_default();
                    self.pass_through(cell, mat)?;
                    self.out.clean_cells += 1;
                }
                CellClass::Mixed => {
                    self.emit_voxels(cell)?;
                    self.out.mixed_cells += 1;
                }
                CellClass::Cleanish => {
                    if self.three_d {
                        self.stitch_cleanish_3d(cell)?;
                    } else {
                        self.stitch_cleanish_2d(cell)?;
                    }
                    self.out.cleanish_cells += 1;
                }
            }
        }

        debug!(
            clean = self.out.clean_cells,
            cleanish = self.out.cleanish_cells,
            mixed = self.out.mixed_cells,
            face_centroids = self.face_centroids.len(),
            "Stitched zones"
        );
        Ok(self.out)
    }

    fn original(&self, cell: usize) -> MirResult<&'a OriginalCell> {
        let cells: &'a [OriginalCell] = self.mesh.cells();
        cells.get(cell).ok_or(MirError::MissingCell(cell))
    }

    fn pass_through(&mut self, cell: usize, mat: MaterialId) -> MirResult<()> {
        let original = self.original(cell)?;
        self.push_zone(cell, mat, original.cell_type, &original.nodes);
        Ok(())
    }

    fn push_zone(&mut self, cell: usize, mat: MaterialId, cell_type: CellType, nodes: &[u32]) {
        let start = self.out.connectivity.len();
        self.out.connectivity.extend_from_slice(nodes);
        self.out.zones.push(ReconstructedZone {
            origzone: cell,
            mat,
            cell_type,
            node_range: start..self.out.connectivity.len(),
            mix_index: None,
        });
    }

    /// Append a new node and return its global id.
    fn push_coord(
        &mut self,
        cell: usize,
        position: Point3<f64>,
        weights: SmallVec<[f64; 8]>,
    ) -> u32 {
        let id = (self.mesh.point_count() + self.out.coords.len()) as u32;
        self.out.coords.push(ReconstructedCoord {
            position,
            weights,
            origzone: cell,
        });
        id
    }

    fn node(&self, key: NodeKey) -> MirResult<u32> {
        self.nodes
            .get(&key)
            .copied()
            .ok_or(MirError::MissingNode { key })
    }

    /// Fine key of an original cell corner given its unit offsets.
    fn corner_key(&self, cell: usize, offset: [usize; 3]) -> NodeKey {
        let res = self.labels.resolution();
        let (bx, by, bz) = self.labels.cell_base(cell);
        NodeKey::new(
            bx + offset[0] * res.dx,
            by + offset[1] * res.dy,
            bz + offset[2] * res.dz,
        )
    }
}

/// Pass every cell through unchanged.
///
/// Mixed cells get the synthetic material id `material_count`.
#[must_use]
pub fn pass_through_all(mesh: &MeshInput, materials: &MaterialField) -> StitchOutput {
    let mixed_material = materials.material_count() as MaterialId;
    let mut out = StitchOutput::default();

    for (cell, (original, &material)) in mesh
        .cells()
        .iter()
        .zip(materials.cell_materials())
        .enumerate()
    {
        let mat = if material < 0 {
            out.mixed_cells += 1;
            mixed_material
        } else {
            out.clean_cells += 1;
            material.unsigned_abs()
        };

        let start = out.connectivity.len();
        out.connectivity.extend_from_slice(&original.nodes);
        out.zones.push(ReconstructedZone {
            origzone: cell,
            mat,
            cell_type: original.cell_type,
            node_range: start..out.connectivity.len(),
            mix_index: None,
        });
    }
    out
}
