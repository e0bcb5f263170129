//! Region-overlap engine for the DiFuMo atlas site
//!
//! This crate holds the pure numerical part of the pipeline. Atlases are
//! handled as [`RegionMap`]s: sparse matrices with one row per region and
//! one column per in-mask voxel. The [`overlaps`] function compares two
//! region maps and ranks, for each query region, the target regions it
//! covers.
//!
//! Everything that touches files (NIfTI decoding, label tables, fetching)
//! lives in `difumo-engine`; this crate only sees volumes already in memory.
//!
//! # Example
//!
//! ```rust
//! use difumo_core::{overlaps, RegionMap};
//!
//! let queries = RegionMap::from_dense_rows(&[vec![1.0, 1.0, 0.0, 0.0]]).unwrap();
//! let targets = RegionMap::from_dense_rows(&[vec![1.0, 0.0, 0.0, 0.0]]).unwrap();
//!
//! let report = overlaps(&queries, Some(&targets)).unwrap();
//! assert_eq!(report.intersection.get(0, 0), 1.0);
//! assert_eq!(report.target_size, vec![1.0]);
//! assert_eq!(report.best(0).map(|hit| hit.target), Some(0));
//! ```

#![warn(missing_docs)]

pub mod cut_coords;
pub mod error;
pub mod grid;
pub mod labels;
pub mod masker;
pub mod overlap;
pub mod region_map;

// Re-export key types
pub use cut_coords::find_xyz_cut_coords;
pub use error::{CoreError, Result};
pub use grid::{resample, resample_nearest, Affine, Interpolation, Volume, VolumeStack, VoxelGrid};
pub use labels::{labels_img_to_binary, BinarizedLabels};
pub use masker::Masker;
pub use overlap::{overlaps, DenseMatrix, OverlapReport, RankedOverlap};
pub use region_map::{RegionMap, RegionRow};
