//! Error types for the numerical core

use thiserror::Error;

/// Errors raised by region-map construction, grid maths and overlaps
#[derive(Error, Debug, Clone, PartialEq)]
pub enum CoreError {
    /// Query and target region maps do not share a voxel dimension
    #[error("shape mismatch: queries have {queries} voxels but targets have {targets}")]
    ShapeMismatch {
        /// Voxel count of the query map
        queries: usize,
        /// Voxel count of the target map
        targets: usize,
    },

    /// A sparse entry points past the last voxel
    #[error("region {row} references voxel {voxel}, outside 0..{n_voxels}")]
    VoxelOutOfRange {
        /// Region (row) index
        row: usize,
        /// Offending voxel index
        voxel: usize,
        /// Number of voxels in the map
        n_voxels: usize,
    },

    /// A weight is NaN or infinite
    #[error("region {row} has a non-finite weight at voxel {voxel}")]
    NonFiniteWeight {
        /// Region (row) index
        row: usize,
        /// Voxel index carrying the weight
        voxel: usize,
    },

    /// A buffer does not have the length its shape implies
    #[error("{what}: expected {expected} values, got {actual}")]
    LengthMismatch {
        /// What was being built
        what: &'static str,
        /// Expected number of values
        expected: usize,
        /// Actual number of values
        actual: usize,
    },

    /// The voxel-to-world affine cannot be inverted
    #[error("affine is singular (determinant {determinant})")]
    SingularAffine {
        /// Determinant of the linear part
        determinant: f64,
    },

    /// A volume is not sampled on the grid a masker expects
    #[error("grid mismatch: expected shape {expected:?}, got {actual:?}")]
    GridMismatch {
        /// Shape of the reference grid
        expected: [usize; 3],
        /// Shape of the volume that was passed
        actual: [usize; 3],
    },

    /// A label value present in the image has no entry in the name table
    #[error("label value {value} has no name (table has {available} entries)")]
    MissingLabelName {
        /// Label value found in the image
        value: i64,
        /// Number of names in the table
        available: usize,
    },

    /// A volume index past the end of a 4-D stack
    #[error("volume {index} out of range for a stack of {n_volumes}")]
    VolumeOutOfRange {
        /// Requested volume
        index: usize,
        /// Number of volumes in the stack
        n_volumes: usize,
    },
}

/// Result type for core operations
pub type Result<T> = std::result::Result<T, CoreError>;
