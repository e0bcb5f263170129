//! Layered error types
//!
//! Each engine module owns a focused error enum; [`EngineError`] gathers
//! them for the pipelines that cross module boundaries.

use crate::fetcher::FetchError;
use crate::label_table::LabelTableError;
use crate::nifti::NiftiError;
use crate::reference::ReferenceError;
use crate::registry::RegistryError;
use difumo_core::CoreError;
use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Engine-level errors
#[derive(Error, Debug)]
pub enum EngineError {
    /// Numerical core error
    #[error("core error: {0}")]
    Core(#[from] CoreError),

    /// Image decoding or encoding error
    #[error(transparent)]
    Nifti(#[from] NiftiError),

    /// Unknown dimension or resolution
    #[error(transparent)]
    Registry(#[from] RegistryError),

    /// Download or cache error
    #[error(transparent)]
    Fetch(#[from] FetchError),

    /// Label table error
    #[error(transparent)]
    LabelTable(#[from] LabelTableError),

    /// Reference atlas error
    #[error(transparent)]
    Reference(#[from] ReferenceError),

    /// Filesystem error outside the codecs
    #[error("I/O error on {path}: {source}")]
    Io {
        /// Path being accessed
        path: PathBuf,
        /// Underlying error
        #[source]
        source: io::Error,
    },

    /// An overlap table could not be parsed
    #[error("malformed table {origin}: {reason}")]
    Table {
        /// File or description of the input
        origin: String,
        /// What went wrong
        reason: String,
    },

    /// Inputs that do not fit together
    #[error("invalid input: {0}")]
    InvalidInput(String),
}

impl EngineError {
    /// Wrap an I/O error with the path it concerns
    pub fn io(path: impl Into<PathBuf>) -> impl FnOnce(io::Error) -> EngineError {
        let path = path.into();
        move |source| EngineError::Io { path, source }
    }
}

/// Result type for engine operations
pub type Result<T> = std::result::Result<T, EngineError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_wrapped_messages_stay_readable() {
        let err: EngineError = RegistryError::InvalidDimension {
            requested: 10,
            valid: "64, 128".to_string(),
        }
        .into();
        assert_eq!(
            err.to_string(),
            "requested dimension=10 is not available; valid options: 64, 128"
        );

        let err: EngineError = CoreError::ShapeMismatch {
            queries: 3,
            targets: 4,
        }
        .into();
        assert!(err.to_string().starts_with("core error:"));
    }

    #[test]
    fn test_io_helper_keeps_path() {
        let err = EngineError::io("site/index.md")(io::Error::new(
            io::ErrorKind::PermissionDenied,
            "denied",
        ));
        assert!(err.to_string().contains("site/index.md"));
    }
}
