//! Inverse-distance neighbor weights for the annealing energy.

// Kernel radii are tiny
#![allow(clippy::cast_possible_wrap)]
#![allow(clippy::cast_precision_loss)]

use crate::error::{MirError, MirResult};

/// One nonzero kernel entry: offset and weight.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) struct KernelTap {
    /// Offset along x.
    pub dx: i64,
    /// Offset along y.
    pub dy: i64,
    /// Offset along z.
    pub dz: i64,
    /// Inverse-distance weight.
    pub weight: f64,
}

/// Precomputed weights over the window `[-NX,NX] x [-NY,NY] x [-NZ,NZ]`.
///
/// Each weight is `1 / |offset|`; the center weight is 0. Immutable once
/// built.
#[derive(Debug, Clone)]
pub struct NeighborKernel {
    radius: [usize; 3],
    weights: Vec<f64>,
    taps: Vec<KernelTap>,
}

impl NeighborKernel {
    /// Build a kernel with the given per-axis radius.
    ///
    /// # Errors
    ///
    /// Returns [`MirError::InvalidNeighborhood`] if every radius is zero, and
    /// [`MirError::Allocation`] if the weight table cannot be allocated.
    ///
    /// # Example
    ///
    /// ```
    /// use mesh_mir::NeighborKernel;
    ///
    /// let kernel = NeighborKernel::new([1, 1, 0])?;
    /// assert_eq!(kernel.len(), 9);
    /// assert_eq!(kernel.weight(0, 0, 0), 0.0);
    /// # Ok::<(), mesh_mir::MirError>(())
    /// ```
    pub fn new(radius: [usize; 3]) -> MirResult<Self> {
        if radius == [0; 3] {
            return Err(MirError::InvalidNeighborhood(radius));
        }
        let [nx, ny, nz] = radius;
        let len = (2 * nx + 1) * (2 * ny + 1) * (2 * nz + 1);

        let mut weights = Vec::new();
        weights
            .try_reserve_exact(len)
            .map_err(|source| MirError::Allocation {
                what: "neighbor kernel",
                source,
            })?;
        let mut taps = Vec::new();
        taps.try_reserve_exact(len)
            .map_err(|source| MirError::Allocation {
                what: "neighbor kernel",
                source,
            })?;

        let (nx, ny, nz) = (nx as i64, ny as i64, nz as i64);
        for dz in -nz..=nz {
            for dy in -ny..=ny {
                for dx in -nx..=nx {
                    let dist_sq = (dx * dx + dy * dy + dz * dz) as f64;
                    let weight = if dist_sq > 0.0 { 1.0 / dist_sq.sqrt() } else { 0.0 };
                    weights.push(weight);
                    if weight > 0.0 {
                        taps.push(KernelTap { dx, dy, dz, weight });
                    }
                }
            }
        }

        Ok(Self {
            radius,
            weights,
            taps,
        })
    }

    /// Per-axis radius of the window.
    #[must_use]
    pub const fn radius(&self) -> [usize; 3] {
        self.radius
    }

    /// Number of window positions, including the center.
    #[must_use]
    pub fn len(&self) -> usize {
        self.weights.len()
    }

    /// Whether the kernel has no entries.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }

    /// Weight at an offset, or 0 outside the window.
    #[must_use]
    pub fn weight(&self, dx: i64, dy: i64, dz: i64) -> f64 {
        let [nx, ny, nz] = self.radius.map(|r| r as i64);
        if dx.abs() > nx || dy.abs() > ny || dz.abs() > nz {
            return 0.0;
        }
        let row = 2 * nx + 1;
        let plane = row * (2 * ny + 1);
        let index = (dz + nz) * plane + (dy + ny) * row + (dx + nx);
        usize::try_from(index)
            .ok()
            .and_then(|i| self.weights.get(i))
            .copied()
            .unwrap_or(0.0)
    }

    /// Entries with nonzero weight.
    pub(crate) fn taps(&self) -> &[KernelTap] {
        &self.taps
    }
}
