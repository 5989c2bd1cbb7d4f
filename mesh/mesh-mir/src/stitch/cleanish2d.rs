//! Triangle-fan stitching of planar cleanish cells.

// Fine coordinates are far below i64::MAX
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_sign_loss)]

use smallvec::SmallVec;

use super::MeshStitcher;
use crate::error::MirResult;
use crate::tables::{QUAD_CORNERS, QUAD_EDGES};
use crate::types::{CellType, NodeKey};

impl MeshStitcher<'_> {
    /// Re-mesh a clean quad as a fan of triangles around its centroid.
    ///
    /// The boundary ring walks the four edges counter-clockwise. An edge
    /// shared with a mixed cell contributes every fine node from its start
    /// corner up to (not including) its end corner; any other edge
    /// contributes only its start corner.
    pub(super) fn stitch_cleanish_2d(&mut self, cell: usize) -> MirResult<()> {
        let original = self.original(cell)?;
        let labels = self.labels;
        let dims = labels.dims();
        let coord = dims.coord(cell);
        let mat = labels.clean_material(cell).unwrap_or_default();

        let centroid = self.push_coord(
            cell,
            self.mesh.grid().position(coord, [0.5, 0.5, 0.0]),
            SmallVec::from_slice(&[0.25; 4]),
        );

        let res = labels.resolution();
        let mut ring: SmallVec<[u32; 32]> = SmallVec::new();
        for edge in &QUAD_EDGES {
            let neighbor = dims.offset(coord, [edge.neighbor[0], edge.neighbor[1], 0]);
            if !neighbor.is_some_and(|n| labels.is_mixed(n)) {
                ring.push(original.nodes[edge.start]);
                continue;
            }

            let [sx, sy] = QUAD_CORNERS[edge.start];
            let [ex, ey] = QUAD_CORNERS[edge.end];
            let start = self.corner_key(cell, [sx, sy, 0]);
            let end = self.corner_key(cell, [ex, ey, 0]);
            let step_x = (i64::from(end.i) - i64::from(start.i)).signum();
            let step_y = (i64::from(end.j) - i64::from(start.j)).signum();
            let steps = if step_x == 0 { res.dy } else { res.dx };

            for s in 0..steps as i64 {
                let key = NodeKey {
                    i: (i64::from(start.i) + s * step_x) as u32,
                    j: (i64::from(start.j) + s * step_y) as u32,
                    k: start.k,
                };
                ring.push(self.node(key)?);
            }
        }

        for n in 0..ring.len() {
            let next = ring[(n + 1) % ring.len()];
            self.push_zone(cell, mat, CellType::Triangle, &[ring[n], next, centroid]);
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use crate::grid::GridDims;
    use crate::input::{MeshInput, RectilinearGrid};
    use crate::labels::VoxelLabelGrid;
    use crate::stitch::MeshStitcher;
    use crate::types::{CellType, Resolution};

    #[test]
    fn ring_follows_the_mixed_edge() {
        // Cell 0 clean, cell 1 mixed on its +x side
        let mesh = MeshInput::structured(RectilinearGrid::uniform(2, 1, 0).unwrap());
        let labels =
            VoxelLabelGrid::build(GridDims::new(2, 1, 1), Resolution::new(4, 4, 1), &[0, -1])
                .unwrap();
        let out = MeshStitcher::new(&mesh, &labels).stitch().unwrap();

        let triangles: Vec<_> = out
            .zones
            .iter()
            .filter(|z| z.origzone == 0)
            .collect();
        assert_eq!(triangles.len(), 7);
        assert!(triangles.iter().all(|z| z.cell_type == CellType::Triangle));

        let ring: Vec<u32> = triangles
            .iter()
            .map(|z| out.connectivity[z.node_range.start])
            .collect();
        let cell = &mesh.cells()[0].nodes;
        assert_eq!(ring[0], cell[0]);
        assert_eq!(ring[1], cell[1]);
        assert_eq!(ring[5], cell[2]);
        assert_eq!(ring[6], cell[3]);
        // Interior nodes of the shared edge are new
        for &node in &ring[2..5] {
            assert!(node as usize >= mesh.point_count());
        }
        assert_eq!(out.cleanish_cells, 1);
    }

    #[test]
    fn ring_on_lower_edge_starts_at_corner_zero() {
        // Cell 1 (top) clean, cell 0 (bottom) mixed: the shared edge is
        // cell 1's bottom edge, walked from corner 0 to corner 1
        let mesh = MeshInput::structured(RectilinearGrid::uniform(1, 2, 0).unwrap());
        let labels =
            VoxelLabelGrid::build(GridDims::new(1, 2, 1), Resolution::new(3, 2, 1), &[-1, 0])
                .unwrap();
        let out = MeshStitcher::new(&mesh, &labels).stitch().unwrap();

        let ring: Vec<u32> = out
            .zones
            .iter()
            .filter(|z| z.origzone == 1)
            .map(|z| out.connectivity[z.node_range.start])
            .collect();
        // 3 nodes along the bottom edge plus the other 3 corners
        assert_eq!(ring.len(), 6);
        assert_eq!(ring[0], mesh.cells()[1].nodes[0]);
        assert_eq!(ring[3], mesh.cells()[1].nodes[1]);
    }
}
