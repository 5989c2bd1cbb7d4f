//! Static topology tables for quads and hexahedra.
//!
//! # Corner numbering
//!
//! Corners follow the VTK convention. For a quad, corner `c` sits at
//! [`QUAD_CORNERS`]`[c]` in unit-cell coordinates, counter-clockwise from
//! the origin. For a hexahedron, corners 0..4 are the bottom (`z = 0`) quad
//! in the same order and corners 4..8 the top (`z = 1`) quad:
//!
//! ```text
//!        7--------6
//!       /|       /|
//!      4--------5 |
//!      | 3------|-2
//!      |/       |/
//!      0--------1
//! ```
//!
//! # Face orientation
//!
//! Each [`HexFace`] lists its corners so that the right-hand normal of the
//! loop points *into* the cell. A pyramid built on such a base with its
//! apex inside the cell, and a tetrahedron `(a, b, face_center, apex)` with
//! `a -> b` following the loop, both have positive volume.

/// Unit-cell offsets of the four quad corners.
pub const QUAD_CORNERS: [[usize; 2]; 4] = [[0, 0], [1, 0], [1, 1], [0, 1]];

/// Unit-cell offsets of the eight hexahedron corners.
pub const HEX_CORNERS: [[usize; 3]; 8] = [
    [0, 0, 0],
    [1, 0, 0],
    [1, 1, 0],
    [0, 1, 0],
    [0, 0, 1],
    [1, 0, 1],
    [1, 1, 1],
    [0, 1, 1],
];

/// One edge of a quad, traversed counter-clockwise.
#[derive(Debug, Clone, Copy)]
pub struct QuadEdge {
    /// Corner the edge starts at.
    pub start: usize,
    /// Corner the edge ends at.
    pub end: usize,
    /// Offset `(di, dj)` of the cell across this edge.
    pub neighbor: [i64; 2],
}

/// The four quad edges in ring order.
pub const QUAD_EDGES: [QuadEdge; 4] = [
    QuadEdge { start: 0, end: 1, neighbor: [0, -1] },
    QuadEdge { start: 1, end: 2, neighbor: [1, 0] },
    QuadEdge { start: 2, end: 3, neighbor: [0, 1] },
    QuadEdge { start: 3, end: 0, neighbor: [-1, 0] },
];

/// One face of a hexahedron.
#[derive(Debug, Clone, Copy)]
pub struct HexFace {
    /// Corners in inward-normal order; `corners[0]` is the face's minimum
    /// corner, `corners[1]` lies along `u`, `corners[3]` along `v`.
    pub corners: [usize; 4],
    /// Offset `(di, dj, dk)` of the cell across this face.
    pub neighbor: [i64; 3],
    /// First in-face axis (0 = x, 1 = y, 2 = z).
    pub u: usize,
    /// Second in-face axis; `u x v` points into the cell.
    pub v: usize,
}

/// The six hexahedron faces: -x, +x, -y, +y, -z, +z.
pub const HEX_FACES: [HexFace; 6] = [
    HexFace { corners: [0, 3, 7, 4], neighbor: [-1, 0, 0], u: 1, v: 2 },
    HexFace { corners: [1, 5, 6, 2], neighbor: [1, 0, 0], u: 2, v: 1 },
    HexFace { corners: [0, 4, 5, 1], neighbor: [0, -1, 0], u: 2, v: 0 },
    HexFace { corners: [3, 2, 6, 7], neighbor: [0, 1, 0], u: 0, v: 2 },
    HexFace { corners: [0, 1, 2, 3], neighbor: [0, 0, -1], u: 0, v: 1 },
    HexFace { corners: [4, 7, 6, 5], neighbor: [0, 0, 1], u: 1, v: 0 },
];

/// One edge of a hexahedron together with its two incident faces.
#[derive(Debug, Clone, Copy)]
pub struct HexEdge {
    /// Corner with the smaller coordinate along `axis`.
    pub start: usize,
    /// Corner with the larger coordinate along `axis`.
    pub end: usize,
    /// Axis the edge runs along.
    pub axis: usize,
    /// Incident faces, each with `true` when the face loop runs
    /// `start -> end` and `false` when it runs `end -> start`.
    pub faces: [(usize, bool); 2],
}

/// The twelve hexahedron edges: four along x, four along y, four along z
/// (grouped by bottom, top, vertical as in VTK).
pub const HEX_EDGES: [HexEdge; 12] = [
    HexEdge { start: 0, end: 1, axis: 0, faces: [(2, false), (4, true)] },
    HexEdge { start: 1, end: 2, axis: 1, faces: [(1, false), (4, true)] },
    HexEdge { start: 3, end: 2, axis: 0, faces: [(3, true), (4, false)] },
    HexEdge { start: 0, end: 3, axis: 1, faces: [(0, true), (4, false)] },
    HexEdge { start: 4, end: 5, axis: 0, faces: [(2, true), (5, false)] },
    HexEdge { start: 5, end: 6, axis: 1, faces: [(1, true), (5, false)] },
    HexEdge { start: 7, end: 6, axis: 0, faces: [(3, false), (5, true)] },
    HexEdge { start: 4, end: 7, axis: 1, faces: [(0, false), (5, true)] },
    HexEdge { start: 0, end: 4, axis: 2, faces: [(0, false), (2, true)] },
    HexEdge { start: 1, end: 5, axis: 2, faces: [(1, true), (2, false)] },
    HexEdge { start: 2, end: 6, axis: 2, faces: [(1, false), (3, true)] },
    HexEdge { start: 3, end: 7, axis: 2, faces: [(0, true), (3, false)] },
];

/// Face-incident neighbor offsets of a quad (4-connected).
pub const NEIGHBORS_2D: [[i64; 3]; 4] = [[0, -1, 0], [1, 0, 0], [0, 1, 0], [-1, 0, 0]];

/// All 26 offsets of the 3x3x3 neighborhood, center excluded.
pub fn neighbors_3d() -> impl Iterator<Item = [i64; 3]> {
    (-1..=1_i64).flat_map(|dk| {
        (-1..=1_i64).flat_map(move |dj| {
            (-1..=1_i64)
                .filter(move |&di| di != 0 || dj != 0 || dk != 0)
                .map(move |di| [di, dj, dk])
        })
    })
}

/// Corner index of a quad from its unit offsets.
#[must_use]
pub const fn quad_corner(ox: usize, oy: usize) -> usize {
    match (ox, oy) {
        (0, 0) => 0,
        (1, 0) => 1,
        (1, 1) => 2,
        _ => 3,
    }
}

/// Corner index of a hexahedron from its unit offsets.
#[must_use]
pub const fn hex_corner(ox: usize, oy: usize, oz: usize) -> usize {
    quad_corner(ox, oy) + 4 * oz
}

#[cfg(test)]
mod tests {
    use super::*;
    use nalgebra::Vector3;

    #[allow(clippy::cast_precision_loss)]
    fn corner(c: usize) -> Vector3<f64> {
        let [x, y, z] = HEX_CORNERS[c];
        Vector3::new(x as f64, y as f64, z as f64)
    }

    #[test]
    fn corner_index_inverts_offsets() {
        for (c, &[x, y, z]) in HEX_CORNERS.iter().enumerate() {
            assert_eq!(hex_corner(x, y, z), c);
        }
        for (c, &[x, y]) in QUAD_CORNERS.iter().enumerate() {
            assert_eq!(quad_corner(x, y), c);
        }
    }

    #[test]
    fn face_loops_point_inward() {
        let center = Vector3::new(0.5, 0.5, 0.5);
        for face in &HEX_FACES {
            let p0 = corner(face.corners[0]);
            let p1 = corner(face.corners[1]);
            let p2 = corner(face.corners[2]);
            let normal = (p1 - p0).cross(&(p2 - p1));
            let face_center = (0..4).map(|n| corner(face.corners[n])).sum::<Vector3<f64>>() / 4.0;
            assert!(normal.dot(&(center - face_center)) > 0.0);

            // Neighbor offset points out of the face
            #[allow(clippy::cast_precision_loss)]
            let out = Vector3::new(
                face.neighbor[0] as f64,
                face.neighbor[1] as f64,
                face.neighbor[2] as f64,
            );
            assert!(normal.dot(&out) < 0.0);
        }
    }

    #[test]
    fn face_axes_match_corners() {
        for face in &HEX_FACES {
            let origin = HEX_CORNERS[face.corners[0]];
            let along_u = HEX_CORNERS[face.corners[1]];
            let along_v = HEX_CORNERS[face.corners[3]];
            for axis in 0..3 {
                let du = along_u[axis] - origin[axis];
                let dv = along_v[axis] - origin[axis];
                assert_eq!(du, usize::from(axis == face.u));
                assert_eq!(dv, usize::from(axis == face.v));
            }
        }
    }

    #[test]
    fn edge_orientation_matches_face_loops() {
        for edge in &HEX_EDGES {
            let a = HEX_CORNERS[edge.start];
            let b = HEX_CORNERS[edge.end];
            assert_eq!(b[edge.axis], a[edge.axis] + 1);

            for &(f, forward) in &edge.faces {
                let loop_ = HEX_FACES[f].corners;
                let runs = |from: usize, to: usize| {
                    (0..4).any(|n| loop_[n] == from && loop_[(n + 1) % 4] == to)
                };
                assert_eq!(runs(edge.start, edge.end), forward);
                assert_eq!(runs(edge.end, edge.start), !forward);
            }
        }
    }

    #[test]
    fn every_face_has_four_edges() {
        let mut count = [0usize; 6];
        for edge in &HEX_EDGES {
            for &(f, _) in &edge.faces {
                count[f] += 1;
            }
        }
        assert_eq!(count, [4; 6]);
    }

    #[test]
    fn neighborhood_3d_has_26_offsets() {
        let offsets: Vec<_> = neighbors_3d().collect();
        assert_eq!(offsets.len(), 26);
        assert!(!offsets.contains(&[0, 0, 0]));
    }
}
