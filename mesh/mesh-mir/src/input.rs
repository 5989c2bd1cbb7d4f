//! Input model: rectilinear geometry, original connectivity and materials.

// Point and cell counts don't overflow in practice
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_sign_loss)]

use hashbrown::HashMap;
use nalgebra::Point3;
use smallvec::SmallVec;

use crate::error::{MirError, MirResult};
use crate::grid::GridDims;
use crate::tables::{HEX_CORNERS, QUAD_CORNERS};
use crate::types::{CellCoord, CellType};

/// How far above 1.0 a volume-fraction vector may sum before it is rejected.
pub const FRACTION_SUM_TOLERANCE: f64 = 1e-6;

/// Node coordinates of a rectilinear grid, one array per axis.
///
/// A grid with a single z coordinate is two-dimensional.
#[derive(Debug, Clone, PartialEq)]
pub struct RectilinearGrid {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
}

impl RectilinearGrid {
    /// Create a grid from per-axis node coordinates.
    ///
    /// # Errors
    ///
    /// Returns [`MirError::AxisTooShort`] if x or y has fewer than two
    /// coordinates or z is empty, and [`MirError::NonRectilinear`] if any
    /// axis is not strictly increasing.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_mir::RectilinearGrid;
    ///
    /// let grid = RectilinearGrid::new(vec![0.0, 1.0, 2.0], vec![0.0, 1.0], vec![0.0, 0.5])?;
    /// assert!(grid.is_3d());
    /// assert_eq!(grid.dims().cell_count(), 2);
    /// # Ok::<(), mesh_mir::MirError>(())
    /// ```
    pub fn new(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> MirResult<Self> {
        check_axis('x', &x, 2)?;
        check_axis('y', &y, 2)?;
        check_axis('z', &z, 1)?;
        Ok(Self { x, y, z })
    }

    /// Create a 2D grid lying in the `z = 0` plane.
    ///
    /// # Errors
    ///
    /// Same as [`RectilinearGrid::new`].
    pub fn planar(x: Vec<f64>, y: Vec<f64>) -> MirResult<Self> {
        Self::new(x, y, vec![0.0])
    }

    /// Create a grid with unit spacing and `nx * ny * nz` cells.
    ///
    /// Pass `nz = 0` for a 2D grid.
    ///
    /// # Errors
    ///
    /// Returns an error if `nx` or `ny` is zero.
    #[allow(clippy::cast_precision_loss)]
    pub fn uniform(nx: usize, ny: usize, nz: usize) -> MirResult<Self> {
        let axis = |n: usize| (0..=n).map(|v| v as f64).collect::<Vec<_>>();
        Self::new(axis(nx), axis(ny), axis(nz))
    }

    /// Whether the grid is three-dimensional.
    #[must_use]
    pub fn is_3d(&self) -> bool {
        self.z.len() > 1
    }

    /// Cell dimensions of the grid.
    #[must_use]
    pub fn dims(&self) -> GridDims {
        GridDims::new(self.x.len() - 1, self.y.len() - 1, (self.z.len() - 1).max(1))
    }

    /// Node coordinates along one axis (0 = x, 1 = y, 2 = z).
    #[must_use]
    pub fn axis(&self, axis: usize) -> &[f64] {
        match axis {
            0 => &self.x,
            1 => &self.y,
            _ => &self.z,
        }
    }

    /// Position of a point inside `cell` given its parametric coordinates
    /// in `[0, 1]^3`. The z parameter is ignored for 2D grids.
    #[must_use]
    pub fn position(&self, cell: CellCoord, t: [f64; 3]) -> Point3<f64> {
        let lerp = |axis: &[f64], index: usize, t: f64| {
            if index + 1 < axis.len() {
                t.mul_add(axis[index + 1] - axis[index], axis[index])
            } else {
                axis[index]
            }
        };
        Point3::new(
            lerp(&self.x, cell.i, t[0]),
            lerp(&self.y, cell.j, t[1]),
            lerp(&self.z, cell.k, t[2]),
        )
    }

    /// Number of nodes in the grid.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.x.len() * self.y.len() * self.z.len()
    }

    /// Id of node `(i, j, k)` in structured order.
    #[must_use]
    pub fn point_id(&self, i: usize, j: usize, k: usize) -> u32 {
        (i + self.x.len() * (j + self.y.len() * k)) as u32
    }

    /// All node positions in structured order (x fastest).
    #[must_use]
    pub fn points(&self) -> Vec<Point3<f64>> {
        let mut points = Vec::with_capacity(self.point_count());
        for &z in &self.z {
            for &y in &self.y {
                for &x in &self.x {
                    points.push(Point3::new(x, y, z));
                }
            }
        }
        points
    }

    /// Total extent (area in 2D, volume in 3D) of the grid.
    #[must_use]
    pub fn measure(&self) -> f64 {
        let span = |axis: &[f64]| axis[axis.len() - 1] - axis[0];
        let area = span(&self.x) * span(&self.y);
        if self.is_3d() { area * span(&self.z) } else { area }
    }
}

fn check_axis(axis: char, values: &[f64], minimum: usize) -> MirResult<()> {
    if values.len() < minimum {
        return Err(MirError::AxisTooShort {
            axis,
            minimum,
            actual: values.len(),
        });
    }
    if let Some(index) = values.iter().position(|v| !v.is_finite()) {
        return Err(MirError::NonRectilinear { axis, index });
    }
    if let Some(index) = values.windows(2).position(|w| w[1] <= w[0]) {
        return Err(MirError::NonRectilinear {
            axis,
            index: index + 1,
        });
    }
    Ok(())
}

/// Connectivity of one original cell.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OriginalCell {
    /// Corner node ids in VTK quad/hexahedron order.
    pub nodes: SmallVec<[u32; 8]>,
    /// Cell type tag carried through for pass-through zones.
    pub cell_type: CellType,
}

impl OriginalCell {
    /// Create a cell from its corner node ids.
    #[must_use]
    pub fn new(nodes: &[u32], cell_type: CellType) -> Self {
        Self {
            nodes: SmallVec::from_slice(nodes),
            cell_type,
        }
    }
}

/// The original mesh: geometry, per-cell connectivity and point count.
#[derive(Debug, Clone)]
pub struct MeshInput {
    grid: RectilinearGrid,
    cells: Vec<OriginalCell>,
    point_count: usize,
}

impl MeshInput {
    /// Create a mesh input from explicit connectivity.
    ///
    /// Cells are listed in linear-id order and their corners in VTK order.
    ///
    /// # Errors
    ///
    /// Returns an error if the cell count does not match the grid, a cell
    /// has the wrong number of corners, or a node id is out of range.
    pub fn new(
        grid: RectilinearGrid,
        cells: Vec<OriginalCell>,
        point_count: usize,
    ) -> MirResult<Self> {
        let expected = grid.dims().cell_count();
        if cells.len() != expected {
            return Err(MirError::CellCountMismatch {
                expected,
                actual: cells.len(),
            });
        }

        let corners = if grid.is_3d() { 8 } else { 4 };
        for (id, cell) in cells.iter().enumerate() {
            if cell.nodes.len() != corners {
                return Err(MirError::InvalidCellNodes {
                    cell: id,
                    expected: corners,
                    actual: cell.nodes.len(),
                });
            }
            if let Some(&node) = cell.nodes.iter().find(|&&n| n as usize >= point_count) {
                return Err(MirError::NodeOutOfBounds {
                    cell: id,
                    node,
                    point_count,
                });
            }
        }

        Ok(Self {
            grid,
            cells,
            point_count,
        })
    }

    /// Build the standard structured connectivity for a rectilinear grid.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_mir::{MeshInput, RectilinearGrid};
    ///
    /// let grid = RectilinearGrid::uniform(2, 1, 0)?;
    /// let mesh = MeshInput::structured(grid);
    /// assert_eq!(mesh.cells().len(), 2);
    /// assert_eq!(mesh.point_count(), 6);
    /// assert_eq!(mesh.cells()[1].nodes.as_slice(), &[1, 2, 5, 4]);
    /// # Ok::<(), mesh_mir::MirError>(())
    /// ```
    #[must_use]
    pub fn structured(grid: RectilinearGrid) -> Self {
        let dims = grid.dims();
        let three_d = grid.is_3d();

        let cells = dims
            .iter()
            .map(|c| {
                if three_d {
                    let nodes: SmallVec<[u32; 8]> = HEX_CORNERS
                        .iter()
                        .map(|&[ox, oy, oz]| grid.point_id(c.i + ox, c.j + oy, c.k + oz))
                        .collect();
                    OriginalCell {
                        nodes,
                        cell_type: CellType::Hexahedron,
                    }
                } else {
                    let nodes: SmallVec<[u32; 8]> = QUAD_CORNERS
                        .iter()
                        .map(|&[ox, oy]| grid.point_id(c.i + ox, c.j + oy, 0))
                        .collect();
                    OriginalCell {
                        nodes,
                        cell_type: CellType::Quad,
                    }
                }
            })
            .collect();

        let point_count = grid.point_count();
        Self {
            grid,
            cells,
            point_count,
        }
    }

    /// The rectilinear geometry.
    #[must_use]
    pub fn grid(&self) -> &RectilinearGrid {
        &self.grid
    }

    /// Per-cell connectivity in linear-id order.
    #[must_use]
    pub fn cells(&self) -> &[OriginalCell] {
        &self.cells
    }

    /// Number of points in the original mesh.
    #[must_use]
    pub fn point_count(&self) -> usize {
        self.point_count
    }

    /// Whether the mesh is three-dimensional.
    #[must_use]
    pub fn is_3d(&self) -> bool {
        self.grid.is_3d()
    }
}

/// Per-cell material assignment.
///
/// Clean cells carry a material id `>= 0`; a negative id marks a mixed cell
/// whose composition is looked up in the volume-fraction table.
#[derive(Debug, Clone, Default)]
pub struct MaterialField {
    material_count: usize,
    cell_materials: Vec<i32>,
    volume_fractions: HashMap<usize, Vec<f64>>,
}

impl MaterialField {
    /// Create a field from per-cell material ids.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_mir::MaterialField;
    ///
    /// let field = MaterialField::new(2, vec![0, -1])
    ///     .with_volume_fractions(1, vec![0.5, 0.5]);
    /// assert!(field.is_mixed(1));
    /// assert_eq!(field.volume_fractions(1), Some(&[0.5, 0.5][..]));
    /// ```
    #[must_use]
    pub fn new(material_count: usize, cell_materials: Vec<i32>) -> Self {
        Self {
            material_count,
            cell_materials,
            volume_fractions: HashMap::new(),
        }
    }

    /// Attach volume fractions to a mixed cell (builder pattern).
    #[must_use]
    pub fn with_volume_fractions(mut self, cell: usize, fractions: Vec<f64>) -> Self {
        self.set_volume_fractions(cell, fractions);
        self
    }

    /// Attach volume fractions to a mixed cell.
    pub fn set_volume_fractions(&mut self, cell: usize, fractions: Vec<f64>) {
        self.volume_fractions.insert(cell, fractions);
    }

    /// Number of materials present in the mesh.
    #[must_use]
    pub fn material_count(&self) -> usize {
        self.material_count
    }

    /// Raw per-cell material ids.
    #[must_use]
    pub fn cell_materials(&self) -> &[i32] {
        &self.cell_materials
    }

    /// Whether a cell is mixed.
    #[must_use]
    pub fn is_mixed(&self, cell: usize) -> bool {
        self.cell_materials.get(cell).is_some_and(|&m| m < 0)
    }

    /// Volume fractions of a mixed cell.
    #[must_use]
    pub fn volume_fractions(&self, cell: usize) -> Option<&[f64]> {
        self.volume_fractions.get(&cell).map(Vec::as_slice)
    }

    /// Number of mixed cells.
    #[must_use]
    pub fn mixed_count(&self) -> usize {
        self.cell_materials.iter().filter(|&&m| m < 0).count()
    }

    /// Check the field against a mesh with `cell_count` cells.
    ///
    /// # Errors
    ///
    /// Returns an error if there are no materials, the id array has the
    /// wrong length, a clean id is out of range, or a mixed cell's volume
    /// fractions are missing, have the wrong length, contain a negative or
    /// non-finite value, sum to zero, or sum to more than one.
    pub fn validate(&self, cell_count: usize) -> MirResult<()> {
        if self.material_count == 0 {
            return Err(MirError::NoMaterials);
        }
        if self.cell_materials.len() != cell_count {
            return Err(MirError::MaterialCountMismatch {
                expected: cell_count,
                actual: self.cell_materials.len(),
            });
        }

        for (cell, &material) in self.cell_materials.iter().enumerate() {
            if material >= 0 {
                if material as usize >= self.material_count {
                    return Err(MirError::MaterialOutOfRange {
                        cell,
                        material,
                        material_count: self.material_count,
                    });
                }
                continue;
            }

            let fractions = self
                .volume_fractions(cell)
                .ok_or(MirError::MissingVolumeFractions(cell))?;
            self.check_fractions(cell, fractions)?;
        }
        Ok(())
    }

    fn check_fractions(&self, cell: usize, fractions: &[f64]) -> MirResult<()> {
        let invalid = |reason: String| MirError::InvalidVolumeFractions { cell, reason };

        if fractions.len() != self.material_count {
            return Err(invalid(format!(
                "expected {} fractions, got {}",
                self.material_count,
                fractions.len()
            )));
        }
        if let Some(bad) = fractions.iter().find(|f| !f.is_finite() || **f < 0.0) {
            return Err(invalid(format!("fraction {bad} is negative or not finite")));
        }

        let sum: f64 = fractions.iter().sum();
        if sum <= 0.0 {
            return Err(invalid("fractions sum to zero".to_string()));
        }
        if sum > 1.0 + FRACTION_SUM_TOLERANCE {
            return Err(invalid(format!("fractions sum to {sum}")));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn rejects_non_monotonic_axis() {
        let err = RectilinearGrid::planar(vec![0.0, 1.0, 1.0], vec![0.0, 1.0]).unwrap_err();
        assert!(matches!(err, MirError::NonRectilinear { axis: 'x', index: 2 }));

        let err = RectilinearGrid::planar(vec![0.0, 1.0], vec![0.0, f64::NAN]).unwrap_err();
        assert!(matches!(err, MirError::NonRectilinear { axis: 'y', .. }));
    }

    #[test]
    fn rejects_short_axis() {
        let err = RectilinearGrid::planar(vec![0.0], vec![0.0, 1.0]).unwrap_err();
        assert!(matches!(err, MirError::AxisTooShort { axis: 'x', .. }));
    }

    #[test]
    fn planar_grid_is_2d() {
        let grid = RectilinearGrid::uniform(3, 2, 0).unwrap();
        assert!(!grid.is_3d());
        assert_eq!(grid.dims(), GridDims::new(3, 2, 1));
        assert_eq!(grid.point_count(), 12);
        assert_relative_eq!(grid.measure(), 6.0);
    }

    #[test]
    fn position_interpolates_within_cell() {
        let grid =
            RectilinearGrid::new(vec![0.0, 2.0, 6.0], vec![1.0, 3.0], vec![0.0, 1.0]).unwrap();
        let p = grid.position(CellCoord::new(1, 0, 0), [0.25, 0.5, 1.0]);
        assert_relative_eq!(p.x, 3.0);
        assert_relative_eq!(p.y, 2.0);
        assert_relative_eq!(p.z, 1.0);
    }

    #[test]
    fn structured_hex_connectivity() {
        let grid = RectilinearGrid::uniform(1, 1, 1).unwrap();
        let mesh = MeshInput::structured(grid);
        assert_eq!(mesh.cells()[0].nodes.as_slice(), &[0, 1, 3, 2, 4, 5, 7, 6]);
        assert_eq!(mesh.cells()[0].cell_type, CellType::Hexahedron);

        let points = mesh.grid().points();
        for (c, &node) in mesh.cells()[0].nodes.iter().enumerate() {
            let [ox, oy, oz] = HEX_CORNERS[c];
            let p = points[node as usize];
            #[allow(clippy::cast_precision_loss)]
            let expected = Point3::new(ox as f64, oy as f64, oz as f64);
            assert_relative_eq!(p, expected);
        }
    }

    #[test]
    fn mesh_input_validates_connectivity() {
        let grid = RectilinearGrid::uniform(1, 1, 0).unwrap();
        let err = MeshInput::new(grid.clone(), vec![], 4).unwrap_err();
        assert!(matches!(err, MirError::CellCountMismatch { .. }));

        let cell = OriginalCell::new(&[0, 1, 3], CellType::Quad);
        let err = MeshInput::new(grid.clone(), vec![cell], 4).unwrap_err();
        assert!(matches!(err, MirError::InvalidCellNodes { expected: 4, .. }));

        let cell = OriginalCell::new(&[0, 1, 3, 9], CellType::Quad);
        let err = MeshInput::new(grid, vec![cell], 4).unwrap_err();
        assert!(matches!(err, MirError::NodeOutOfBounds { node: 9, .. }));
    }

    #[test]
    fn material_field_validation() {
        let ok = MaterialField::new(2, vec![0, -1]).with_volume_fractions(1, vec![0.3, 0.7]);
        assert!(ok.validate(2).is_ok());
        assert_eq!(ok.mixed_count(), 1);

        let missing = MaterialField::new(2, vec![0, -1]);
        assert!(matches!(
            missing.validate(2),
            Err(MirError::MissingVolumeFractions(1))
        ));

        let out_of_range = MaterialField::new(2, vec![2, 0]);
        assert!(matches!(
            out_of_range.validate(2),
            Err(MirError::MaterialOutOfRange { material: 2, .. })
        ));

        let negative = MaterialField::new(2, vec![-1]).with_volume_fractions(0, vec![-0.1, 1.0]);
        assert!(matches!(
            negative.validate(1),
            Err(MirError::InvalidVolumeFractions { .. })
        ));

        let overfull = MaterialField::new(2, vec![-1]).with_volume_fractions(0, vec![0.8, 0.8]);
        assert!(overfull.validate(1).is_err());

        let wrong_len = MaterialField::new(3, vec![-1]).with_volume_fractions(0, vec![1.0]);
        assert!(wrong_len.validate(1).is_err());

        assert!(matches!(
            MaterialField::new(0, vec![]).validate(0),
            Err(MirError::NoMaterials)
        ));
    }

    #[test]
    fn under_normalized_fractions_are_accepted() {
        let field = MaterialField::new(2, vec![-1]).with_volume_fractions(0, vec![0.4, 0.4]);
        assert!(field.validate(1).is_ok());
    }
}
