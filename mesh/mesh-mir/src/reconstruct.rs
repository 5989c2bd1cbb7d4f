//! End-to-end reconstruction pipeline.

// Voxel counts are far below 2^52
#![allow(clippy::cast_precision_loss)]

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::{debug, info, warn};

use crate::anneal::{AnnealStats, AnnealingOptimizer};
use crate::assign::assign_labels;
use crate::error::MirResult;
use crate::input::{MaterialField, MeshInput};
use crate::kernel::NeighborKernel;
use crate::labels::VoxelLabelGrid;
use crate::params::MirParams;
use crate::result::{Reconstruction, ReconstructionStats};
use crate::stitch::{MeshStitcher, StitchOutput, pass_through_all};

/// Reconstruct single-material zones from a mesh with mixed cells.
///
/// The generator is seeded from `params.seed`, or from entropy when no
/// seed is set.
///
/// # Errors
///
/// Returns an error if the parameters or material field are invalid, a
/// buffer cannot be allocated, or stitching hits an internal invariant
/// violation. No partial output is returned.
///
/// # Example
///
/// ```
/// use mesh_mir::{reconstruct, MaterialField, MeshInput, MirParams, RectilinearGrid};
///
/// let mesh = MeshInput::structured(RectilinearGrid::uniform(2, 1, 0)?);
/// let materials = MaterialField::new(2, vec![0, -1])
///     .with_volume_fractions(1, vec![0.5, 0.5]);
/// let params = MirParams::quick().with_seed(7);
///
/// let result = reconstruct(&mesh, &materials, &params)?;
/// assert_eq!(result.stats.mixed_cells, 1);
/// assert_eq!(result.zones_of_material(1), 8);
/// # Ok::<(), mesh_mir::MirError>(())
/// ```
pub fn reconstruct(
    mesh: &MeshInput,
    materials: &MaterialField,
    params: &MirParams,
) -> MirResult<Reconstruction> {
    let mut rng = match params.seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    reconstruct_with_rng(mesh, materials, params, &mut rng)
}

/// Reconstruct with a caller-provided random generator.
///
/// `params.seed` is ignored.
///
/// # Errors
///
/// Same as [`reconstruct`].
pub fn reconstruct_with_rng<R: Rng + ?Sized>(
    mesh: &MeshInput,
    materials: &MaterialField,
    params: &MirParams,
    rng: &mut R,
) -> MirResult<Reconstruction> {
    params.validate()?;
    let dims = mesh.grid().dims();
    materials.validate(dims.cell_count())?;
    let three_d = mesh.is_3d();

    info!(
        cells = dims.cell_count(),
        mixed = materials.mixed_count(),
        materials = materials.material_count(),
        three_d,
        "Starting material interface reconstruction"
    );

    if params.clean_zones_only {
        let out = pass_through_all(mesh, materials);
        let result = assemble(mesh, out, AnnealStats::default(), 0.0);
        info!(zones = result.zones.len(), "Passed through clean zones only");
        return Ok(result);
    }

    let kernel = NeighborKernel::new(params.neighborhood_for(three_d))?;
    let resolution = params.resolution_for(three_d);
    let mut labels = VoxelLabelGrid::build(dims, resolution, materials.cell_materials())?;
    debug!(
        mixed_cells = labels.mixed_cells().len(),
        voxels_per_cell = resolution.voxel_count(),
        "Built voxel label grid"
    );

    assign_labels(&mut labels, materials, rng)?;

    let budget = params.annealing_budget();
    if labels.mixed_cells().is_empty() && !budget.is_zero() {
        warn!("Annealing budget set but the mesh has no mixed cells");
    }
    let anneal = AnnealingOptimizer::new(&mut labels, &kernel, params.temperature, rng)
        .with_compare_clean_materials(params.compare_clean_materials)
        .run(budget);

    let error = max_fraction_error(&labels, materials);
    let out = MeshStitcher::new(mesh, &labels).stitch()?;
    let result = assemble(mesh, out, anneal, error);

    info!(
        zones = result.zones.len(),
        new_nodes = result.coords.len(),
        accepted_swaps = anneal.accepted,
        max_fraction_error = error,
        "Reconstruction complete"
    );
    Ok(result)
}

/// Largest deviation between requested and realized volume fractions.
fn max_fraction_error(labels: &VoxelLabelGrid, materials: &MaterialField) -> f64 {
    let voxel_count = labels.resolution().voxel_count() as f64;
    labels
        .mixed_cells()
        .iter()
        .filter_map(|&cell| {
            let fractions = materials.volume_fractions(cell)?;
            let counts = labels.material_counts(cell, materials.material_count())?;
            fractions
                .iter()
                .zip(counts)
                .map(|(&vf, count)| (vf - count as f64 / voxel_count).abs())
                .reduce(f64::max)
        })
        .fold(0.0, f64::max)
}

fn assemble(
    mesh: &MeshInput,
    out: StitchOutput,
    anneal: AnnealStats,
    max_fraction_error: f64,
) -> Reconstruction {
    Reconstruction {
        zones: out.zones,
        coords: out.coords,
        connectivity: out.connectivity,
        original_point_count: mesh.point_count(),
        stats: ReconstructionStats {
            clean_cells: out.clean_cells,
            cleanish_cells: out.cleanish_cells,
            mixed_cells: out.mixed_cells,
            anneal,
            max_fraction_error,
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::MirError;
    use crate::input::RectilinearGrid;
    use crate::types::CellType;
    use approx::assert_relative_eq;

    fn two_cells() -> (MeshInput, MaterialField) {
        let mesh = MeshInput::structured(RectilinearGrid::uniform(2, 1, 0).unwrap());
        let materials =
            MaterialField::new(2, vec![0, -1]).with_volume_fractions(1, vec![0.5, 0.5]);
        (mesh, materials)
    }

    #[test]
    fn seeded_runs_are_reproducible() {
        let (mesh, materials) = two_cells();
        let params = MirParams::quick().with_seed(3);
        let a = reconstruct(&mesh, &materials, &params).unwrap();
        let b = reconstruct(&mesh, &materials, &params).unwrap();
        assert_eq!(a.zones, b.zones);
        assert_eq!(a.connectivity, b.connectivity);
    }

    #[test]
    fn exact_fractions_have_no_error() {
        let (mesh, materials) = two_cells();
        let result = reconstruct(&mesh, &materials, &MirParams::quick().with_seed(1)).unwrap();
        assert_relative_eq!(result.stats.max_fraction_error, 0.0);
        assert_eq!(result.stats.anneal.batches, 0);
    }

    #[test]
    fn rounding_error_is_reported() {
        let mesh = MeshInput::structured(RectilinearGrid::uniform(1, 1, 0).unwrap());
        let materials = MaterialField::new(2, vec![-1]).with_volume_fractions(0, vec![0.3, 0.7]);
        let params = MirParams::quick().with_resolution(4, 4, 1).with_seed(1);
        let result = reconstruct(&mesh, &materials, &params).unwrap();

        // Targets are 5 and 11 of 16
        assert_relative_eq!(result.stats.max_fraction_error, 0.0125, epsilon = 1e-12);
    }

    #[test]
    fn clean_zones_only_skips_discretization() {
        let (mesh, materials) = two_cells();
        let params = MirParams::new().with_clean_zones_only(true);
        let result = reconstruct(&mesh, &materials, &params).unwrap();

        assert_eq!(result.zones.len(), 2);
        assert!(result.coords.is_empty());
        assert_eq!(result.zones[1].mat, 2);
        assert!(result.zones.iter().all(|z| z.cell_type == CellType::Quad));
    }

    #[test]
    fn invalid_input_is_rejected_before_work() {
        let (mesh, _) = two_cells();
        let missing = MaterialField::new(2, vec![0, -1]);
        assert!(matches!(
            reconstruct(&mesh, &missing, &MirParams::quick()),
            Err(MirError::MissingVolumeFractions(1))
        ));

        let (mesh, materials) = two_cells();
        assert!(matches!(
            reconstruct(&mesh, &materials, &MirParams::quick().with_temperature(-0.5)),
            Err(MirError::InvalidTemperature(_))
        ));

        // A z-only window is empty on a planar grid
        assert!(matches!(
            reconstruct(&mesh, &materials, &MirParams::quick().with_neighborhood(0, 0, 2)),
            Err(MirError::InvalidNeighborhood([0, 0, 0]))
        ));
    }
}
