//! Atlas I/O, labeling pipelines and site generation for DiFuMo
//!
//! This crate sits between the numerical core and the command line: it
//! reads and writes NIfTI images, keeps a local cache of the published
//! dictionaries, parses reference label tables, runs the overlap pipelines
//! and renders the static site.

#![warn(missing_docs)]

pub mod delimited;
pub mod error;
pub mod fetcher;
pub mod label_table;
pub mod labeling;
pub mod nifti;
pub mod reference;
pub mod registry;
pub mod site;
pub mod tables;

// Re-export key types
pub use error::{EngineError, Result};
pub use fetcher::{default_data_dir, DatasetCache, DifumoFiles, Downloader, FetchError};
pub use label_table::{DifumoLabels, LabelFormat, LabelTableError};
pub use labeling::{
    label_regions, masker_for, relate_dimensions, tissue_composition, DifumoAtlas,
    RELATED_PER_DIMENSION,
};
pub use reference::{LoadedReference, ReferenceAtlas, ReferenceError, ReferenceSource};
pub use registry::{AtlasRegistry, RegistryError, RegistryTable, DIMENSIONS, RESOLUTIONS};
pub use site::{ComponentPage, DimensionContent, SiteGenerator};
pub use tables::{LabelsTable, RelatedTable, TissueTable};

#[cfg(feature = "fetch")]
pub use fetcher::HttpDownloader;

// Re-export from core for convenience
pub use difumo_core::{Masker, Volume, VolumeStack, VoxelGrid};
