//! Reconstruction output records.

use std::fmt;
use std::ops::Range;

use nalgebra::{Point3, Vector3};
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use smallvec::SmallVec;

use crate::anneal::AnnealStats;
use crate::types::{CellType, MaterialId};

/// One emitted single-material mesh cell.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReconstructedZone {
    /// Linear id of the original cell this zone came from.
    pub origzone: usize,
    /// Material of the zone. In clean-zones-only mode mixed cells carry
    /// the synthetic id `material_count`.
    pub mat: MaterialId,
    /// Cell type of the zone.
    pub cell_type: CellType,
    /// Range of this zone's node ids in [`Reconstruction::connectivity`].
    pub node_range: Range<usize>,
    /// Index into a mixed-variable buffer. Never set by the reconstruction
    /// itself; reserved for output assembly.
    pub mix_index: Option<usize>,
}

/// One emitted node that is not part of the original mesh.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReconstructedCoord {
    /// Position of the node.
    pub position: Point3<f64>,
    /// Multilinear interpolation weights against the original corner nodes
    /// of `origzone`, in corner order. Sums to 1.
    pub weights: SmallVec<[f64; 8]>,
    /// Original cell the weights refer to.
    pub origzone: usize,
}

/// Summary counters of one reconstruction.
#[derive(Debug, Clone, Copy, Default, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct ReconstructionStats {
    /// Clean cells passed through unchanged.
    pub clean_cells: usize,
    /// Clean cells re-meshed to stitch against a mixed neighbor.
    pub cleanish_cells: usize,
    /// Mixed cells discretized into voxels.
    pub mixed_cells: usize,
    /// Annealing counters.
    pub anneal: AnnealStats,
    /// Largest `|vf[m] - count[m] / N|` over all mixed cells and materials.
    pub max_fraction_error: f64,
}

/// Result of a material interface reconstruction.
///
/// Node ids below `original_point_count` refer to the original mesh points;
/// id `original_point_count + n` refers to `coords[n]`.
#[derive(Debug, Clone, Default)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct Reconstruction {
    /// Emitted zones, in emission order.
    pub zones: Vec<ReconstructedZone>,
    /// Emitted new nodes.
    pub coords: Vec<ReconstructedCoord>,
    /// Flat node-id list referenced by each zone's `node_range`.
    pub connectivity: Vec<u32>,
    /// Number of points in the original mesh.
    pub original_point_count: usize,
    /// Summary counters.
    pub stats: ReconstructionStats,
}

impl Reconstruction {
    /// Node ids of a zone.
    #[must_use]
    pub fn zone_nodes(&self, zone: usize) -> Option<&[u32]> {
        let range = self.zones.get(zone)?.node_range.clone();
        self.connectivity.get(range)
    }

    /// Total number of nodes (original plus new).
    #[must_use]
    pub fn node_count(&self) -> usize {
        self.original_point_count + self.coords.len()
    }

    /// Position of a node, looking original ids up in `original_points`.
    #[must_use]
    pub fn node_position(&self, node: u32, original_points: &[Point3<f64>]) -> Option<Point3<f64>> {
        let node = node as usize;
        if node < self.original_point_count {
            original_points.get(node).copied()
        } else {
            self.coords
                .get(node - self.original_point_count)
                .map(|c| c.position)
        }
    }

    /// Number of zones carrying material `mat`.
    #[must_use]
    pub fn zones_of_material(&self, mat: MaterialId) -> usize {
        self.zones.iter().filter(|z| z.mat == mat).count()
    }

    /// Signed area (2D types) or volume (3D types) of a zone.
    ///
    /// Correctly oriented zones have a positive measure.
    #[must_use]
    pub fn zone_measure(&self, zone: usize, original_points: &[Point3<f64>]) -> Option<f64> {
        let cell_type = self.zones.get(zone)?.cell_type;
        let nodes = self.zone_nodes(zone)?;
        let p: SmallVec<[Point3<f64>; 8]> = nodes
            .iter()
            .map(|&n| self.node_position(n, original_points))
            .collect::<Option<_>>()?;
        if p.len() != cell_type.node_count() {
            return None;
        }

        let measure = match cell_type {
            CellType::Triangle | CellType::Quad => polygon_area(&p),
            CellType::Tetra => tet_volume(p[0], p[1], p[2], p[3]),
            CellType::Pyramid => {
                tet_volume(p[0], p[1], p[2], p[4]) + tet_volume(p[0], p[2], p[3], p[4])
            }
            CellType::Hexahedron => [[1, 2], [2, 3], [3, 7], [7, 4], [4, 5], [5, 1]]
                .iter()
                .map(|&[a, b]| tet_volume(p[0], p[a], p[b], p[6]))
                .sum(),
        };
        Some(measure)
    }
}

fn polygon_area(p: &[Point3<f64>]) -> f64 {
    let n = p.len();
    let twice: f64 = (0..n)
        .map(|i| {
            let a = p[i];
            let b = p[(i + 1) % n];
            a.x.mul_add(b.y, -(b.x * a.y))
        })
        .sum();
    0.5 * twice
}

fn tet_volume(a: Point3<f64>, b: Point3<f64>, c: Point3<f64>, d: Point3<f64>) -> f64 {
    let ab: Vector3<f64> = b - a;
    let ac: Vector3<f64> = c - a;
    let ad: Vector3<f64> = d - a;
    ab.cross(&ac).dot(&ad) / 6.0
}

impl fmt::Display for Reconstruction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Reconstruction: {} zones, {} new nodes ({} clean, {} cleanish, {} mixed cells), \
             {} swaps accepted, max fraction error {:.4}",
            self.zones.len(),
            self.coords.len(),
            self.stats.clean_cells,
            self.stats.cleanish_cells,
            self.stats.mixed_cells,
            self.stats.anneal.accepted,
            self.stats.max_fraction_error,
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[allow(clippy::cast_precision_loss)]
    fn unit_cube_points() -> Vec<Point3<f64>> {
        crate::tables::HEX_CORNERS
            .iter()
            .map(|&[x, y, z]| Point3::new(x as f64, y as f64, z as f64))
            .collect()
    }

    fn single_zone(cell_type: CellType, nodes: Vec<u32>, point_count: usize) -> Reconstruction {
        Reconstruction {
            zones: vec![ReconstructedZone {
                origzone: 0,
                mat: 0,
                cell_type,
                node_range: 0..nodes.len(),
                mix_index: None,
            }],
            coords: Vec::new(),
            connectivity: nodes,
            original_point_count: point_count,
            stats: ReconstructionStats::default(),
        }
    }

    #[test]
    fn hexahedron_measure_is_unit_volume() {
        let points = unit_cube_points();
        let recon = single_zone(CellType::Hexahedron, (0..8).collect(), 8);
        assert_relative_eq!(recon.zone_measure(0, &points).unwrap(), 1.0, epsilon = 1e-12);
    }

    #[test]
    fn quad_measure_is_ccw_area() {
        let points = unit_cube_points();
        let recon = single_zone(CellType::Quad, vec![0, 1, 2, 3], 8);
        assert_relative_eq!(recon.zone_measure(0, &points).unwrap(), 1.0);

        let reversed = single_zone(CellType::Quad, vec![3, 2, 1, 0], 8);
        assert_relative_eq!(reversed.zone_measure(0, &points).unwrap(), -1.0);
    }

    #[test]
    fn pyramid_on_inward_face_is_positive() {
        let mut points = unit_cube_points();
        points.push(Point3::new(0.5, 0.5, 0.5));
        let recon = single_zone(CellType::Pyramid, vec![0, 1, 2, 3, 8], 9);
        assert_relative_eq!(recon.zone_measure(0, &points).unwrap(), 1.0 / 6.0, epsilon = 1e-12);
    }

    #[test]
    fn node_position_resolves_new_nodes() {
        let points = unit_cube_points();
        let mut recon = single_zone(CellType::Quad, vec![0, 1, 8, 3], 8);
        recon.coords.push(ReconstructedCoord {
            position: Point3::new(2.0, 2.0, 0.0),
            weights: SmallVec::from_slice(&[1.0]),
            origzone: 0,
        });
        assert_eq!(recon.node_count(), 9);
        assert_eq!(recon.node_position(8, &points), Some(Point3::new(2.0, 2.0, 0.0)));
        assert_eq!(recon.node_position(9, &points), None);
        assert_eq!(recon.zone_nodes(0), Some(&[0, 1, 8, 3][..]));
        assert_eq!(recon.zones_of_material(0), 1);
        assert_eq!(recon.zones_of_material(1), 0);
    }

    #[test]
    fn display_summarizes() {
        let recon = single_zone(CellType::Quad, vec![0, 1, 2, 3], 4);
        let text = recon.to_string();
        assert!(text.contains("1 zones"));
        assert!(text.contains("0 new nodes"));
    }
}
