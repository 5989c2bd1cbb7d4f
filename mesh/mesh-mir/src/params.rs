//! Reconstruction parameters.

use std::time::Duration;

#[cfg(feature = "serde")]
use serde::{Deserialize, Serialize};

use crate::error::{MirError, MirResult};
use crate::types::Resolution;

/// Parameters for discrete material interface reconstruction.
#[derive(Debug, Clone, PartialEq)]
#[cfg_attr(feature = "serde", derive(Serialize, Deserialize))]
pub struct MirParams {
    /// Voxels per mixed cell along each axis (`DX`, `DY`, `DZ`).
    /// `DZ` is ignored for 2D grids.
    pub resolution: [usize; 3],

    /// Radius of the annealing neighbor window along each axis
    /// (`NX`, `NY`, `NZ`). `NZ` is ignored for 2D grids.
    pub neighborhood: [usize; 3],

    /// Wall-clock budget for annealing, in seconds.
    pub annealing_time: f64,

    /// Annealing temperature. Zero accepts only improving swaps and
    /// breaks exact ties with a coin flip.
    pub temperature: f64,

    /// Pass every cell through unchanged; mixed cells get the synthetic
    /// "mixed" material id (`material_count`).
    pub clean_zones_only: bool,

    /// Seed for the random generator; `None` seeds from entropy.
    pub seed: Option<u64>,

    /// Compare annealing energy against a clean neighbor's real material.
    /// When `false`, clean neighbors act as a placeholder that never
    /// matches any voxel label.
    pub compare_clean_materials: bool,
}

impl Default for MirParams {
    fn default() -> Self {
        Self {
            resolution: [4, 4, 4],
            neighborhood: [2, 2, 2],
            annealing_time: 0.25,
            temperature: 0.0,
            clean_zones_only: false,
            seed: None,
            compare_clean_materials: false,
        }
    }
}

impl MirParams {
    /// Create new parameters with default values.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Parameters that skip annealing entirely.
    #[must_use]
    pub fn quick() -> Self {
        Self {
            annealing_time: 0.0,
            ..Self::default()
        }
    }

    /// Parameters for fine, well-smoothed interfaces.
    #[must_use]
    pub fn high_quality() -> Self {
        Self {
            resolution: [8, 8, 8],
            annealing_time: 2.0,
            ..Self::default()
        }
    }

    /// Set the same voxel resolution on every axis.
    #[must_use]
    pub const fn with_uniform_resolution(mut self, n: usize) -> Self {
        self.resolution = [n, n, n];
        self
    }

    /// Set the per-axis voxel resolution.
    #[must_use]
    pub const fn with_resolution(mut self, dx: usize, dy: usize, dz: usize) -> Self {
        self.resolution = [dx, dy, dz];
        self
    }

    /// Set the per-axis neighbor window radius.
    #[must_use]
    pub const fn with_neighborhood(mut self, nx: usize, ny: usize, nz: usize) -> Self {
        self.neighborhood = [nx, ny, nz];
        self
    }

    /// Set the annealing budget in seconds.
    #[must_use]
    pub const fn with_annealing_time(mut self, seconds: f64) -> Self {
        self.annealing_time = seconds;
        self
    }

    /// Set the annealing temperature.
    #[must_use]
    pub const fn with_temperature(mut self, temperature: f64) -> Self {
        self.temperature = temperature;
        self
    }

    /// Enable or disable clean-zones-only output.
    #[must_use]
    pub const fn with_clean_zones_only(mut self, enable: bool) -> Self {
        self.clean_zones_only = enable;
        self
    }

    /// Seed the random generator.
    #[must_use]
    pub const fn with_seed(mut self, seed: u64) -> Self {
        self.seed = Some(seed);
        self
    }

    /// Enable or disable comparing against clean neighbors' materials.
    #[must_use]
    pub const fn with_compare_clean_materials(mut self, enable: bool) -> Self {
        self.compare_clean_materials = enable;
        self
    }

    /// Check parameter ranges.
    ///
    /// # Errors
    ///
    /// Returns an error if a resolution component is zero, or the
    /// temperature or annealing time is negative or not finite.
    pub fn validate(&self) -> MirResult<()> {
        if self.resolution.contains(&0) {
            return Err(MirError::InvalidResolution(self.resolution));
        }
        if !self.temperature.is_finite() || self.temperature < 0.0 {
            return Err(MirError::InvalidTemperature(self.temperature));
        }
        if !self.annealing_time.is_finite() || self.annealing_time < 0.0 {
            return Err(MirError::InvalidAnnealingTime(self.annealing_time));
        }
        Ok(())
    }

    /// Effective voxel resolution for a 2D or 3D grid.
    #[must_use]
    pub const fn resolution_for(&self, three_d: bool) -> Resolution {
        let [dx, dy, dz] = self.resolution;
        Resolution::new(dx, dy, if three_d { dz } else { 1 })
    }

    /// Effective kernel radius for a 2D or 3D grid.
    #[must_use]
    pub const fn neighborhood_for(&self, three_d: bool) -> [usize; 3] {
        let [nx, ny, nz] = self.neighborhood;
        [nx, ny, if three_d { nz } else { 0 }]
    }

    /// Annealing budget as a duration. Call after [`MirParams::validate`].
    #[must_use]
    pub fn annealing_budget(&self) -> Duration {
        Duration::try_from_secs_f64(self.annealing_time).unwrap_or(Duration::ZERO)
    }
}
