//! Discrete material interface reconstruction on rectilinear grids.
//!
//! Some cells of a rectilinear mesh are *mixed*: instead of one material
//! they carry a vector of per-material volume fractions. This crate turns
//! such a mesh into an explicit mesh in which every zone holds exactly one
//! material, the composition of each mixed cell is reproduced as closely as
//! the voxel resolution allows, and the new geometry connects conformingly
//! to the untouched clean cells around it.
//!
//! # Features
//!
//! - **Exact-count voxel labeling**: every mixed cell is split into
//!   `DX x DY x DZ` voxels whose labels reproduce the floored volume
//!   fractions exactly
//! - **Annealing**: label swaps inside a mixed cell reduce a
//!   neighborhood-disagreement energy for a wall-clock budget, turning
//!   salt-and-pepper noise into coherent material blobs
//! - **Stitching**: clean cells bordering mixed cells are re-meshed as
//!   triangle fans (2D) or pyramids and tetrahedra (3D) that match the
//!   fine voxel nodes
//! - **Interpolation weights**: every new node carries multilinear weights
//!   against its original cell's corners for point-data transfer
//!
//! # Layer 0 Crate
//!
//! This is a Layer 0 crate with **zero Bevy dependencies**.
//!
//! # Example
//!
//! ```
//! use mesh_mir::{reconstruct, CellType, MaterialField, MeshInput, MirParams, RectilinearGrid};
//!
//! // Two quads; the right one is half material 0, half material 1
//! let mesh = MeshInput::structured(RectilinearGrid::uniform(2, 1, 0)?);
//! let materials = MaterialField::new(2, vec![0, -1])
//!     .with_volume_fractions(1, vec![0.5, 0.5]);
//!
//! let params = MirParams::new()
//!     .with_uniform_resolution(4)
//!     .with_annealing_time(0.01)
//!     .with_seed(42);
//! let result = reconstruct(&mesh, &materials, &params)?;
//!
//! // 16 voxel quads for the mixed cell, 7 fan triangles for its neighbor
//! let quads = result.zones.iter().filter(|z| z.cell_type == CellType::Quad).count();
//! assert_eq!(quads, 16);
//! assert_eq!(result.zones.len(), 23);
//! println!("{result}");
//! # Ok::<(), mesh_mir::MirError>(())
//! ```
//!
//! # Pipeline
//!
//! 1. Build a [`VoxelLabelGrid`]: clean cells keep one material id, mixed
//!    cells own `DX*DY*DZ` labels
//! 2. Fill each mixed cell by sampling without replacement from its target
//!    counts ([`assign_labels`])
//! 3. Swap labels inside mixed cells until the budget runs out
//!    ([`AnnealingOptimizer`]); per-cell counts never change
//! 4. Emit zones and nodes ([`MeshStitcher`])

// Safety: Deny unwrap/expect in library code. Tests may use them (workspace warns).
#![cfg_attr(not(test), deny(clippy::unwrap_used, clippy::expect_used))]
#![warn(missing_docs)]
#![warn(clippy::all)]
#![warn(clippy::pedantic)]

mod anneal;
mod assign;
mod error;
mod grid;
mod input;
mod kernel;
mod labels;
mod params;
mod reconstruct;
mod result;
mod stitch;
mod tables;
mod types;

// Re-export main types and functions
pub use anneal::{AnnealStats, AnnealingOptimizer, SWAPS_PER_BATCH, accept_swap};
pub use assign::{assign_cell, assign_labels, target_counts};
pub use error::{MirError, MirResult};
pub use grid::GridDims;
pub use input::{FRACTION_SUM_TOLERANCE, MaterialField, MeshInput, OriginalCell, RectilinearGrid};
pub use kernel::NeighborKernel;
pub use labels::{CellLabel, VoxelLabelGrid};
pub use params::MirParams;
pub use reconstruct::{reconstruct, reconstruct_with_rng};
pub use result::{Reconstruction, ReconstructedCoord, ReconstructedZone, ReconstructionStats};
pub use stitch::{CellClass, MeshStitcher, StitchOutput, classify, pass_through_all};
pub use types::{CellCoord, CellType, MaterialId, NodeKey, Resolution};
