//! Label smoothing by annealing voxel swaps inside mixed cells.
//!
//! Each proposal swaps two differently-labeled voxels of one mixed cell and
//! is accepted or rejected from the change in a neighborhood-disagreement
//! energy. Swaps never cross cells, so per-cell material counts are
//! invariant.

// Fine coordinates are far below i64::MAX
#![allow(clippy::cast_possible_wrap)]

use std::time::{Duration, Instant};

use rand::Rng;
#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::kernel::NeighborKernel;
use crate::labels::{Sample, VoxelLabelGrid};
use crate::types::MaterialId;

/// Number of proposed swaps between deadline checks.
pub const SWAPS_PER_BATCH: usize = 1000;

/// Attempts at finding two differently-labeled voxels before giving up.
pub(crate) const MAX_PAIR_ATTEMPTS: usize = 10;

/// Relative tolerance under which two energies count as a tie.
pub(crate) const TIE_TOLERANCE: f64 = 1e-12;

/// Counters collected while annealing.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct AnnealStats {
    /// Completed batches of [`SWAPS_PER_BATCH`] proposals.
    pub batches: usize,
    /// Proposals that found a differently-labeled pair.
    pub proposed: usize,
    /// Proposals that were accepted and applied.
    pub accepted: usize,
    /// Iterations skipped because no differing pair was found.
    pub skipped: usize,
}

impl AnnealStats {
    /// Fraction of evaluated proposals that were accepted.
    #[must_use]
    #[allow(clippy::cast_precision_loss)]
    pub fn acceptance_rate(&self) -> f64 {
        if self.proposed == 0 {
            0.0
        } else {
            self.accepted as f64 / self.proposed as f64
        }
    }
}

/// Outcome of one proposal.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum SwapOutcome {
    /// The swap was applied.
    Accepted,
    /// The swap was evaluated and rejected.
    Rejected,
    /// No differently-labeled pair was found.
    Skipped,
}

/// Decide whether to accept a swap that moves the energy from `e0` to `e1`.
///
/// Improving swaps are always accepted. With a positive temperature a
/// worsening swap is accepted with probability `exp(-(e1 - e0) / T)`. At
/// zero temperature only exact ties are accepted, with probability 0.5.
pub fn accept_swap<R: Rng + ?Sized>(e0: f64, e1: f64, temperature: f64, rng: &mut R) -> bool {
    let delta = e1 - e0;
    let tolerance = TIE_TOLERANCE * e0.abs().max(e1.abs()).max(1.0);

    if delta < -tolerance {
        true
    } else if temperature > 0.0 {
        rng.r#gen::<f64>() < (-delta.max(0.0) / temperature).exp()
    } else if delta.abs() <= tolerance {
        rng.gen_bool(0.5)
    } else {
        false
    }
}

/// Smooths mixed-cell labels of a [`VoxelLabelGrid`] in place.
///
/// [`AnnealingOptimizer::run`] checks its deadline only between batches,
/// so a run may overshoot the budget by up to one batch.
pub struct AnnealingOptimizer<'a, R: Rng + ?Sized> {
    grid: &'a mut VoxelLabelGrid,
    kernel: &'a NeighborKernel,
    temperature: f64,
    compare_clean_materials: bool,
    rng: &'a mut R,
    stats: AnnealStats,
}

impl<'a, R: Rng + ?Sized> AnnealingOptimizer<'a, R> {
    /// Create an optimizer over `grid`.
    pub fn new(
        grid: &'a mut VoxelLabelGrid,
        kernel: &'a NeighborKernel,
        temperature: f64,
        rng: &'a mut R,
    ) -> Self {
        Self {
            grid,
            kernel,
            temperature,
            compare_clean_materials: false,
            rng,
            stats: AnnealStats::default(),
        }
    }

    /// Compare against clean neighbors' real materials (builder pattern).
    #[must_use]
    pub fn with_compare_clean_materials(mut self, enable: bool) -> Self {
        self.compare_clean_materials = enable;
        self
    }

    /// Counters collected so far.
    #[must_use]
    pub const fn stats(&self) -> AnnealStats {
        self.stats
    }

    /// Run batches until `budget` has elapsed.
    ///
    /// A zero budget performs no batches. Grids without mixed cells
    /// return immediately.
    pub fn run(&mut self, budget: Duration) -> AnnealStats {
        if self.grid.mixed_cells().is_empty() {
            return self.stats;
        }

        let start = Instant::now();
        while start.elapsed() < budget {
            self.run_batch();
        }

        debug!(
            batches = self.stats.batches,
            proposed = self.stats.proposed,
            accepted = self.stats.accepted,
            skipped = self.stats.skipped,
            elapsed_ms = start.elapsed().as_millis(),
            "Annealing finished"
        );
        self.stats
    }

    /// Propose [`SWAPS_PER_BATCH`] swaps.
    pub fn run_batch(&mut self) {
        if self.grid.mixed_cells().is_empty() {
            return;
        }
        for _ in 0..SWAPS_PER_BATCH {
            self.propose_swap();
        }
        self.stats.batches += 1;
    }

    /// Propose, evaluate and possibly apply one swap.
    pub(crate) fn propose_swap(&mut self) -> SwapOutcome {
        let mixed = self.grid.mixed_cells();
        if mixed.is_empty() {
            return SwapOutcome::Skipped;
        }
        let cell = mixed[self.rng.gen_range(0..mixed.len())];

        let Some(labels) = self.grid.voxels(cell) else {
            return SwapOutcome::Skipped;
        };
        let n = labels.len();
        if n == 0 {
            return SwapOutcome::Skipped;
        }

        let mut pair = None;
        for _ in 0..MAX_PAIR_ATTEMPTS {
            let r = self.rng.gen_range(0..n);
            let r2 = self.rng.gen_range(0..n);
            if labels[r] != labels[r2] {
                pair = Some((r, r2));
                break;
            }
        }
        let Some((r, r2)) = pair else {
            self.stats.skipped += 1;
            return SwapOutcome::Skipped;
        };

        let (e0, e1) = self.swap_energies(cell, r, r2);
        self.stats.proposed += 1;

        if accept_swap(e0, e1, self.temperature, self.rng) {
            self.grid.swap(cell, r, r2);
            self.stats.accepted += 1;
            SwapOutcome::Accepted
        } else {
            SwapOutcome::Rejected
        }
    }

    /// Energies `(current, swapped)` of exchanging slots `r` and `r2`.
    #[must_use]
    pub(crate) fn swap_energies(&self, cell: usize, r: usize, r2: usize) -> (f64, f64) {
        let Some(labels) = self.grid.voxels(cell) else {
            return (0.0, 0.0);
        };
        let first = labels[r];
        let second = labels[r2];

        let res = self.grid.resolution();
        let base = self.grid.cell_base(cell);
        let global = |slot: usize| {
            let local = res.slot_coords(slot);
            [
                (base.0 + local.0) as i64,
                (base.1 + local.1) as i64,
                (base.2 + local.2) as i64,
            ]
        };
        let p1 = global(r);
        let p2 = global(r2);

        let mut current = 0.0;
        let mut swapped = 0.0;
        for tap in self.kernel.taps() {
            let s1 = self.grid.sample(p1[0] + tap.dx, p1[1] + tap.dy, p1[2] + tap.dz);
            let s2 = self.grid.sample(p2[0] + tap.dx, p2[1] + tap.dy, p2[2] + tap.dz);

            if self.disagrees(s1, first) {
                current += tap.weight;
            }
            if self.disagrees(s2, second) {
                current += tap.weight;
            }
            if self.disagrees(s1, second) {
                swapped += tap.weight;
            }
            if self.disagrees(s2, first) {
                swapped += tap.weight;
            }
        }
        (current, swapped)
    }

    fn disagrees(&self, sample: Sample, label: MaterialId) -> bool {
        match sample {
            Sample::Outside => true,
            Sample::Clean(m) => !self.compare_clean_materials || m != label,
            Sample::Voxel(m) => m != label,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::grid::GridDims;
    use crate::types::Resolution;
    use approx::assert_relative_eq;
    use rand::SeedableRng;
    use rand::rngs::StdRng;

    fn single_cell(labels: &[MaterialId], dx: usize, dy: usize) -> VoxelLabelGrid {
        let mut grid =
            VoxelLabelGrid::build(GridDims::new(1, 1, 1), Resolution::new(dx, dy, 1), &[-1])
                .unwrap();
        grid.voxels_mut(0).unwrap().copy_from_slice(labels);
        grid
    }

    #[test]
    fn improving_swaps_are_always_accepted() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..100 {
            assert!(accept_swap(5.0, 4.0, 0.0, &mut rng));
            assert!(accept_swap(5.0, 4.0, 10.0, &mut rng));
        }
    }

    #[test]
    fn zero_temperature_rejects_worse_swaps() {
        let mut rng = StdRng::seed_from_u64(0);
        for _ in 0..100 {
            assert!(!accept_swap(4.0, 5.0, 0.0, &mut rng));
        }
    }

    #[test]
    fn zero_temperature_ties_accept_half_the_time() {
        let mut rng = StdRng::seed_from_u64(1234);
        let trials: u32 = 20_000;
        let accepted = (0..trials)
            .filter(|_| accept_swap(3.0, 3.0, 0.0, &mut rng))
            .count();
        #[allow(clippy::cast_precision_loss)]
        let ratio = accepted as f64 / f64::from(trials);
        assert!((ratio - 0.5).abs() < 0.02, "tie acceptance ratio {ratio}");
    }

    #[test]
    fn positive_temperature_follows_boltzmann_factor() {
        let mut rng = StdRng::seed_from_u64(5);
        let trials: u32 = 20_000;
        let accepted = (0..trials)
            .filter(|_| accept_swap(1.0, 2.0, 1.0, &mut rng))
            .count();
        #[allow(clippy::cast_precision_loss)]
        let ratio = accepted as f64 / f64::from(trials);
        assert!((ratio - (-1.0_f64).exp()).abs() < 0.02);
    }

    #[test]
    fn swap_energy_prefers_grouped_labels() {
        // 0 1 / 1 0 checkerboard: swapping slot 1 with slot 0 keeps the
        // checkerboard, swapping 1 with 3 makes a row of equal labels
        let grid = single_cell(&[0, 1, 1, 0], 2, 2);
        let kernel = NeighborKernel::new([1, 1, 0]).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let mut grid = grid;
        let optimizer = AnnealingOptimizer::new(&mut grid, &kernel, 0.0, &mut rng);

        let (e0, e1) = optimizer.swap_energies(0, 1, 3);
        assert!(e1 < e0);
    }

    #[test]
    fn clean_neighbors_are_placeholders_by_default() {
        // A mixed cell next to a clean cell of material 1
        let mut grid =
            VoxelLabelGrid::build(GridDims::new(2, 1, 1), Resolution::new(2, 1, 1), &[-1, 1])
                .unwrap();
        grid.voxels_mut(0).unwrap().copy_from_slice(&[1, 0]);
        let kernel = NeighborKernel::new([1, 0, 0]).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        let optimizer = AnnealingOptimizer::new(&mut grid, &kernel, 0.0, &mut rng);
        let (placeholder_e0, placeholder_e1) = optimizer.swap_energies(0, 0, 1);

        let optimizer = optimizer.with_compare_clean_materials(true);
        let (e0, e1) = optimizer.swap_energies(0, 0, 1);

        // Material 0 disagrees with the clean cell either way, so only the
        // swapped energy sees the real material
        assert_relative_eq!(e0, placeholder_e0);
        assert_relative_eq!(placeholder_e1 - e1, 1.0);
    }

    #[test]
    fn zero_budget_runs_no_batches() {
        let mut grid = single_cell(&[0, 1, 0, 1], 2, 2);
        let before = grid.voxels(0).unwrap().to_vec();
        let kernel = NeighborKernel::new([1, 1, 0]).unwrap();
        let mut rng = StdRng::seed_from_u64(0);

        let stats = AnnealingOptimizer::new(&mut grid, &kernel, 0.0, &mut rng).run(Duration::ZERO);
        assert_eq!(stats, AnnealStats::default());
        assert_eq!(grid.voxels(0).unwrap(), before.as_slice());
    }

    #[test]
    fn batches_preserve_material_counts() {
        let mut grid = VoxelLabelGrid::build(
            GridDims::new(2, 2, 1),
            Resolution::new(4, 4, 1),
            &[-1, 0, -1, -1],
        )
        .unwrap();
        let mut rng = StdRng::seed_from_u64(11);
        for &cell in &[0, 2, 3] {
            let labels = grid.voxels_mut(cell).unwrap();
            for (n, label) in labels.iter_mut().enumerate() {
                *label = MaterialId::try_from(n % 3).unwrap();
            }
        }
        let before: Vec<_> = [0, 2, 3]
            .iter()
            .map(|&c| grid.material_counts(c, 3).unwrap())
            .collect();

        let kernel = NeighborKernel::new([2, 2, 0]).unwrap();
        let mut optimizer = AnnealingOptimizer::new(&mut grid, &kernel, 0.3, &mut rng);
        for _ in 0..5 {
            optimizer.run_batch();
        }
        let stats = optimizer.stats();
        assert_eq!(stats.batches, 5);
        assert!(stats.accepted > 0);
        assert_eq!(stats.proposed + stats.skipped, 5 * SWAPS_PER_BATCH);

        let after: Vec<_> = [0, 2, 3]
            .iter()
            .map(|&c| grid.material_counts(c, 3).unwrap())
            .collect();
        assert_eq!(before, after);
    }

    #[test]
    fn uniform_cell_skips_every_proposal() {
        let mut grid = single_cell(&[2, 2, 2, 2], 2, 2);
        let kernel = NeighborKernel::new([1, 1, 0]).unwrap();
        let mut rng = StdRng::seed_from_u64(3);
        let mut optimizer = AnnealingOptimizer::new(&mut grid, &kernel, 0.0, &mut rng);
        assert_eq!(optimizer.propose_swap(), SwapOutcome::Skipped);
        assert_eq!(optimizer.stats().skipped, 1);
    }

    #[test]
    fn short_budget_terminates() {
        let mut grid = single_cell(&[0, 1, 0, 1], 2, 2);
        let kernel = NeighborKernel::new([1, 1, 0]).unwrap();
        let mut rng = StdRng::seed_from_u64(0);
        let stats = AnnealingOptimizer::new(&mut grid, &kernel, 0.0, &mut rng)
            .run(Duration::from_millis(5));
        assert!(stats.batches >= 1);
    }
}
