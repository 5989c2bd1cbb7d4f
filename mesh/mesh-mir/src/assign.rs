//! Initial voxel labeling from volume fractions.
//!
//! Each mixed cell receives exactly `floor(N * vf[m])` voxels of material
//! `m` (`N = DX*DY*DZ`), with the rounding remainder going to a single
//! material. Voxels are filled in slot order by sampling without
//! replacement from the remaining per-material budget, so the realized
//! counts always equal the targets.

// Voxel counts are small and fractions are in [0, 1]
#![allow(clippy::cast_possible_truncation)]
#![allow(clippy::cast_precision_loss)]
#![allow(clippy::cast_sign_loss)]

use rand::Rng;
use tracing::debug;

use crate::error::{MirError, MirResult};
use crate::input::MaterialField;
use crate::labels::VoxelLabelGrid;
use crate::types::MaterialId;

/// Per-material voxel targets for one mixed cell.
///
/// The remainder `N - sum(floor(N * vf))` goes to the first material with a
/// nonzero floor count. When every floor count is zero the remainder goes
/// to the material with the largest fraction instead, so the targets
/// always sum to `N`.
///
/// # Example
///
/// ```
/// use mesh_mir::target_counts;
///
/// assert_eq!(target_counts(&[0.5, 0.5], 16), vec![8, 8]);
/// assert_eq!(target_counts(&[0.3, 0.7], 16), vec![5, 11]);
/// assert_eq!(target_counts(&[0.01, 0.02], 16), vec![0, 16]);
/// ```
#[must_use]
pub fn target_counts(fractions: &[f64], voxel_count: usize) -> Vec<usize> {
    let mut targets: Vec<usize> = fractions
        .iter()
        .map(|&vf| (voxel_count as f64 * vf).floor().max(0.0) as usize)
        .collect();
    if targets.is_empty() {
        return targets;
    }

    let total: usize = targets.iter().sum();
    let receiver = targets.iter().position(|&t| t > 0).unwrap_or_else(|| {
        fractions
            .iter()
            .enumerate()
            .fold(0, |best, (m, &vf)| if vf > fractions[best] { m } else { best })
    });

    if total <= voxel_count {
        targets[receiver] += voxel_count - total;
    } else {
        // Fractions summing a hair over 1.0 can overshoot; trim in order
        let mut excess = total - voxel_count;
        for target in &mut targets {
            let cut = excess.min(*target);
            *target -= cut;
            excess -= cut;
            if excess == 0 {
                break;
            }
        }
    }
    targets
}

/// Fill one mixed cell's labels so that material `m` appears exactly
/// `targets[m]` times.
///
/// Slots are visited in order; each draws `r` uniformly from the number of
/// labels still to place and picks the material whose cumulative remaining
/// budget first reaches `r`.
pub fn assign_cell<R: Rng + ?Sized>(labels: &mut [MaterialId], targets: &[usize], rng: &mut R) {
    let mut counts = vec![0usize; targets.len()];
    let mut remaining: usize = targets.iter().sum();

    for label in labels.iter_mut() {
        if remaining == 0 {
            break;
        }
        let r = remaining as f64 * rng.r#gen::<f64>();

        let mut cdf = 0.0;
        let mut chosen = None;
        for (m, (&target, &count)) in targets.iter().zip(&counts).enumerate() {
            let left = target - count;
            cdf += left as f64;
            if left > 0 && cdf >= r {
                chosen = Some(m);
                break;
            }
        }
        // Rounding in `r` can leave the walk one short; fall back to the
        // last material with budget left
        let m = chosen.or_else(|| (0..targets.len()).rev().find(|&m| targets[m] > counts[m]));
        let Some(m) = m else { break };

        *label = m as MaterialId;
        counts[m] += 1;
        remaining -= 1;
    }
}

/// Assign initial labels to every mixed cell of the grid.
///
/// Cells are processed in the grid's mixed-cell order, which makes the
/// result reproducible for a seeded generator.
///
/// # Errors
///
/// Returns [`MirError::MissingVolumeFractions`] if a mixed cell has no
/// volume fractions in `materials`.
pub fn assign_labels<R: Rng + ?Sized>(
    grid: &mut VoxelLabelGrid,
    materials: &MaterialField,
    rng: &mut R,
) -> MirResult<()> {
    let voxel_count = grid.resolution().voxel_count();
    let mixed: Vec<usize> = grid.mixed_cells().to_vec();

    for &cell in &mixed {
        let fractions = materials
            .volume_fractions(cell)
            .ok_or(MirError::MissingVolumeFractions(cell))?;
        let targets = target_counts(fractions, voxel_count);
        if let Some(labels) = grid.voxels_mut(cell) {
            assign_cell(labels, &targets, rng);
        }
    }

    debug!(cells = mixed.len(), voxels_per_cell = voxel_count, "Assigned initial voxel labels");
    Ok(())
}
