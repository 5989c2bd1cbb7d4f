//! Cell classification for stitching.

use crate::grid::GridDims;
use crate::labels::VoxelLabelGrid;
use crate::tables::{NEIGHBORS_2D, neighbors_3d};
use crate::types::CellCoord;

/// How the stitcher treats a cell.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CellClass {
    /// Clean cell with no mixed neighbor, passed through unchanged.
    Clean,
    /// Clean cell bordering at least one mixed cell.
    Cleanish,
    /// Mixed cell, discretized into voxels.
    Mixed,
}

/// Classify every cell of the label grid, in linear-id order.
///
/// A clean cell is cleanish if any 4-connected (2D) or 26-connected (3D)
/// neighbor is mixed.
#[must_use]
pub fn classify(labels: &VoxelLabelGrid, three_d: bool) -> Vec<CellClass> {
    let dims = labels.dims();
    dims.iter()
        .enumerate()
        .map(|(id, cell)| {
            if labels.is_mixed(id) {
                CellClass::Mixed
            } else if has_mixed_neighbor(labels, dims, cell, three_d) {
                CellClass::Cleanish
            } else {
                CellClass::Clean
            }
        })
        .collect()
}

fn has_mixed_neighbor(
    labels: &VoxelLabelGrid,
    dims: GridDims,
    cell: CellCoord,
    three_d: bool,
) -> bool {
    let mixed = |delta: [i64; 3]| {
        dims.offset(cell, delta)
            .is_some_and(|id| labels.is_mixed(id))
    };
    if three_d {
        neighbors_3d().any(mixed)
    } else {
        NEIGHBORS_2D.into_iter().any(mixed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Resolution;

    #[test]
    fn planar_diagonal_is_not_cleanish() {
        // 3x3 with the center mixed
        let mut materials = vec![0; 9];
        materials[4] = -1;
        let labels =
            VoxelLabelGrid::build(GridDims::new(3, 3, 1), Resolution::new(2, 2, 1), &materials)
                .unwrap();
        let classes = classify(&labels, false);

        assert_eq!(classes[4], CellClass::Mixed);
        for id in [1, 3, 5, 7] {
            assert_eq!(classes[id], CellClass::Cleanish);
        }
        for id in [0, 2, 6, 8] {
            assert_eq!(classes[id], CellClass::Clean);
        }
    }

    #[test]
    fn volumetric_corner_neighbor_is_cleanish() {
        // 3x3x3 with the center mixed: every other cell touches it
        let mut materials = vec![1; 27];
        materials[13] = -1;
        let labels =
            VoxelLabelGrid::build(GridDims::new(3, 3, 3), Resolution::new(2, 2, 2), &materials)
                .unwrap();
        let classes = classify(&labels, true);

        assert_eq!(classes.iter().filter(|&&c| c == CellClass::Cleanish).count(), 26);
        assert_eq!(classes[13], CellClass::Mixed);
    }

    #[test]
    fn far_cells_stay_clean() {
        let labels =
            VoxelLabelGrid::build(GridDims::new(4, 1, 1), Resolution::new(2, 2, 1), &[-1, 0, 0, 0])
                .unwrap();
        assert_eq!(
            classify(&labels, false),
            vec![CellClass::Mixed, CellClass::Cleanish, CellClass::Clean, CellClass::Clean]
        );
    }
}
