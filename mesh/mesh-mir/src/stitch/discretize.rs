//! Voxel lattices and sub-cell zones of mixed cells.

// Voxel counts per axis are small
#![allow(clippy::cast_precision_loss)]

use smallvec::SmallVec;

use super::MeshStitcher;
use crate::error::MirResult;
use crate::tables::{HEX_CORNERS, QUAD_CORNERS, hex_corner, quad_corner};
use crate::types::{CellType, NodeKey};

/// Multilinear weights of a point with parametric coordinates `t` against
/// the cell corners, in corner order.
pub(crate) fn multilinear_weights(t: [f64; 3], three_d: bool) -> SmallVec<[f64; 8]> {
    let factor = |offset: usize, t: f64| if offset == 1 { t } else { 1.0 - t };
    if three_d {
        HEX_CORNERS
            .iter()
            .map(|&[ox, oy, oz]| factor(ox, t[0]) * factor(oy, t[1]) * factor(oz, t[2]))
            .collect()
    } else {
        QUAD_CORNERS
            .iter()
            .map(|&[ox, oy]| factor(ox, t[0]) * factor(oy, t[1]))
            .collect()
    }
}

impl MeshStitcher<'_> {
    /// Insert the `(DX+1) x (DY+1) (x (DZ+1))` corner lattice of a mixed
    /// cell. Existing keys are kept (first writer wins).
    pub(super) fn insert_cell_lattice(&mut self, cell: usize) -> MirResult<()> {
        let original = self.original(cell)?;
        let res = self.labels.resolution();
        let coord = self.labels.dims().coord(cell);
        let (bx, by, bz) = self.labels.cell_base(cell);
        let z_steps = if self.three_d { res.dz } else { 0 };

        for z in 0..=z_steps {
            for y in 0..=res.dy {
                for x in 0..=res.dx {
                    let key = NodeKey::new(bx + x, by + y, bz + z);
                    if self.nodes.contains_key(&key) {
                        continue;
                    }

                    let on_x = x == 0 || x == res.dx;
                    let on_y = y == 0 || y == res.dy;
                    let on_z = !self.three_d || z == 0 || z == res.dz;
                    let id = if on_x && on_y && on_z {
                        let (ox, oy, oz) = (
                            usize::from(x == res.dx),
                            usize::from(y == res.dy),
                            usize::from(self.three_d && z == res.dz),
                        );
                        let corner = if self.three_d {
                            hex_corner(ox, oy, oz)
                        } else {
                            quad_corner(ox, oy)
                        };
                        original.nodes[corner]
                    } else {
                        let t = [
                            x as f64 / res.dx as f64,
                            y as f64 / res.dy as f64,
                            if self.three_d { z as f64 / res.dz as f64 } else { 0.0 },
                        ];
                        let position = self.mesh.grid().position(coord, t);
                        let weights = multilinear_weights(t, self.three_d);
                        self.push_coord(cell, position, weights)
                    };
                    self.nodes.insert(key, id);
                }
            }
        }
        Ok(())
    }

    /// Emit one quad (2D) or hexahedron (3D) per voxel, labeled with the
    /// voxel's material.
    pub(super) fn emit_voxels(&mut self, cell: usize) -> MirResult<()> {
        let labels = self.labels;
        let Some(voxels) = labels.voxels(cell) else {
            return Ok(());
        };
        let res = labels.resolution();
        let (bx, by, bz) = labels.cell_base(cell);

        for (slot, &mat) in voxels.iter().enumerate() {
            let (x, y, z) = res.slot_coords(slot);
            let (x, y, z) = (bx + x, by + y, bz + z);

            let mut nodes: SmallVec<[u32; 8]> = SmallVec::new();
            if self.three_d {
                for &[ox, oy, oz] in &HEX_CORNERS {
                    nodes.push(self.node(NodeKey::new(x + ox, y + oy, z + oz))?);
                }
                self.push_zone(cell, mat, CellType::Hexahedron, &nodes);
            } else {
                for &[ox, oy] in &QUAD_CORNERS {
                    nodes.push(self.node(NodeKey::new(x + ox, y + oy, z))?);
                }
                self.push_zone(cell, mat, CellType::Quad, &nodes);
            }
        }
        Ok(())
    }
}
