//! Pyramid and tetrahedron stitching of volumetric cleanish cells.
//!
//! A cleanish hexahedron is split around a new cell centroid. Each of its
//! six faces ends up in one of three states:
//!
//! - **discretized**: the neighbor across the face is mixed, so the face is
//!   tiled with the neighbor's fine quads and one pyramid is emitted per
//!   fine quad;
//! - **needs a centroid**: some edge of the face carries fine nodes of a
//!   mixed cell, so the face is fanned from a face centroid with one
//!   tetrahedron per boundary segment;
//! - **plain**: one pyramid on the four original corners.
//!
//! Face centroids on interior faces are shared with the cell across the
//! face through a map keyed by the ordered pair of cell ids.

use smallvec::SmallVec;

use super::MeshStitcher;
use crate::error::{MirError, MirResult};
use crate::tables::{HEX_CORNERS, HEX_EDGES, HEX_FACES};
use crate::types::{CellType, MaterialId};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum FaceState {
    Plain,
    Discretized,
    NeedsCentroid,
}

/// Boundary segment `a -> b` of a face, in the face's inward loop order.
#[derive(Debug, Clone, Copy)]
struct Segment {
    face: usize,
    a: u32,
    b: u32,
}

impl MeshStitcher<'_> {
    pub(super) fn stitch_cleanish_3d(&mut self, cell: usize) -> MirResult<()> {
        let original = self.original(cell)?;
        let labels = self.labels;
        let dims = labels.dims();
        let coord = dims.coord(cell);
        let mat = labels.clean_material(cell).unwrap_or_default();
        let res = labels.resolution();

        let centroid = self.push_coord(
            cell,
            self.mesh.grid().position(coord, [0.5; 3]),
            SmallVec::from_slice(&[0.125; 8]),
        );

        let mut faces = [FaceState::Plain; 6];
        let mut neighbors = [None; 6];
        for (f, face) in HEX_FACES.iter().enumerate() {
            neighbors[f] = dims.offset(coord, face.neighbor);
            if neighbors[f].is_some_and(|n| labels.is_mixed(n)) {
                faces[f] = FaceState::Discretized;
                self.emit_face_pyramids(cell, mat, f, centroid)?;
            }
        }

        // Small segments come from refined edges, big ones from coarse edges
        let mut small: SmallVec<[Segment; 32]> = SmallVec::new();
        let mut big: SmallVec<[Segment; 32]> = SmallVec::new();
        for (e, edge) in HEX_EDGES.iter().enumerate() {
            let start = self.corner_key(cell, HEX_CORNERS[edge.start]);
            let refined =
                res.along(edge.axis) > 1 && self.nodes.contains_key(&start.step(edge.axis));
            let chain = if refined {
                self.edge_chain(cell, e)?
            } else {
                SmallVec::from_slice(&[original.nodes[edge.start], original.nodes[edge.end]])
            };

            for &(face, forward) in &edge.faces {
                if faces[face] == FaceState::Discretized {
                    continue;
                }
                let target = if refined {
                    faces[face] = FaceState::NeedsCentroid;
                    &mut small
                } else {
                    &mut big
                };
                for pair in chain.windows(2) {
                    let (a, b) = if forward {
                        (pair[0], pair[1])
                    } else {
                        (pair[1], pair[0])
                    };
                    target.push(Segment { face, a, b });
                }
            }
        }

        let mut face_centers = [None; 6];
        for f in 0..HEX_FACES.len() {
            if faces[f] == FaceState::NeedsCentroid {
                face_centers[f] = Some(self.face_centroid(cell, f, neighbors[f])?);
            }
        }

        for seg in &small {
            let center = face_centers[seg.face].ok_or(MirError::MissingCentroid {
                cell,
                face: seg.face,
            })?;
            self.push_zone(cell, mat, CellType::Tetra, &[seg.a, seg.b, center, centroid]);
        }
        // Coarse edges of a plain face are covered by its pyramid below
        for seg in &big {
            if let Some(center) = face_centers[seg.face] {
                self.push_zone(cell, mat, CellType::Tetra, &[seg.a, seg.b, center, centroid]);
            }
        }
        for (face, state) in HEX_FACES.iter().zip(faces) {
            if state == FaceState::Plain {
                let [c0, c1, c2, c3] = face.corners;
                let base = [
                    original.nodes[c0],
                    original.nodes[c1],
                    original.nodes[c2],
                    original.nodes[c3],
                    centroid,
                ];
                self.push_zone(cell, mat, CellType::Pyramid, &base);
            }
        }
        Ok(())
    }

    /// Tile face `f` with the fine quads of the mixed cell across it and
    /// emit one pyramid per quad with apex `apex`.
    fn emit_face_pyramids(
        &mut self,
        cell: usize,
        mat: MaterialId,
        f: usize,
        apex: u32,
    ) -> MirResult<()> {
        let face = HEX_FACES.get(f).ok_or(MirError::InvalidFace(f))?;
        let res = self.labels.resolution();
        let origin = self.corner_key(cell, HEX_CORNERS[face.corners[0]]);
        let at = |a: usize, b: usize| origin.offset(face.u, a).offset(face.v, b);

        for b in 0..res.along(face.v) {
            for a in 0..res.along(face.u) {
                let nodes = [
                    self.node(at(a, b))?,
                    self.node(at(a + 1, b))?,
                    self.node(at(a + 1, b + 1))?,
                    self.node(at(a, b + 1))?,
                    apex,
                ];
                self.push_zone(cell, mat, CellType::Pyramid, &nodes);
            }
        }
        Ok(())
    }

    /// Nodes along edge `e` from its start corner to its end corner.
    fn edge_chain(&self, cell: usize, e: usize) -> MirResult<SmallVec<[u32; 16]>> {
        let edge = HEX_EDGES.get(e).ok_or(MirError::InvalidEdge(e))?;
        let original = self.original(cell)?;
        let steps = self.labels.resolution().along(edge.axis);
        let start = self.corner_key(cell, HEX_CORNERS[edge.start]);

        let mut chain = SmallVec::new();
        chain.push(original.nodes[edge.start]);
        for s in 1..steps {
            chain.push(self.node(start.offset(edge.axis, s))?);
        }
        chain.push(original.nodes[edge.end]);
        Ok(chain)
    }

    /// Centroid node of face `f`, shared with the cell across the face.
    fn face_centroid(&mut self, cell: usize, f: usize, neighbor: Option<usize>) -> MirResult<u32> {
        let face = HEX_FACES.get(f).ok_or(MirError::InvalidFace(f))?;
        let key = neighbor.map(|n| (cell.min(n), cell.max(n)));
        if let Some(&id) = key.and_then(|k| self.face_centroids.get(&k)) {
            return Ok(id);
        }

        let mut t = [0.0; 3];
        let mut weights: SmallVec<[f64; 8]> = SmallVec::from_elem(0.0, 8);
        for &c in &face.corners {
            for (axis, &offset) in HEX_CORNERS[c].iter().enumerate() {
                if offset == 1 {
                    t[axis] += 0.25;
                }
            }
            weights[c] = 0.25;
        }

        let coord = self.labels.dims().coord(cell);
        let position = self.mesh.grid().position(coord, t);
        let id = self.push_coord(cell, position, weights);
        if let Some(key) = key {
            self.face_centroids.insert(key, id);
        }
        Ok(id)
    }
}
