//! Atlas registry
//!
//! Maps DiFuMo dimensions to their remote identifiers and archive layout.
//! The table is a plain value handed to [`AtlasRegistry::new`], so tests and
//! mirrors can swap in their own identifiers.

use serde::{Deserialize, Serialize};
use std::fmt::Display;
use std::path::PathBuf;
use thiserror::Error;

/// Dimensions published for DiFuMo
pub const DIMENSIONS: [u32; 5] = [64, 128, 256, 512, 1024];

/// Resolutions (mm) published for DiFuMo
pub const RESOLUTIONS: [u32; 2] = [2, 3];

/// Public address of the generated site
pub const SITE_BASE_URL: &str = "https://parietal-inria.github.io/DiFuMo";

/// Download endpoint pattern for OSF file ids
const OSF_DOWNLOAD: &str = "https://osf.io/{id}/download";

/// Errors raised for unknown dimensions or resolutions
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RegistryError {
    /// Dimension not in the table
    #[error("requested dimension={requested} is not available; valid options: {valid}")]
    InvalidDimension {
        /// Requested dimension
        requested: u32,
        /// Valid dimensions, comma separated
        valid: String,
    },

    /// Resolution not in the table
    #[error("requested resolution_mm={requested} is not available; valid options: {valid}")]
    InvalidResolution {
        /// Requested resolution
        requested: u32,
        /// Valid resolutions, comma separated
        valid: String,
    },
}

/// Remote identifiers for one dimension
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DimensionEntry {
    /// Number of components
    pub dimension: u32,
    /// OSF id of the zip archive holding maps and labels
    pub archive_id: String,
    /// OSF id linked from the index page
    pub index_download_id: String,
    /// OSF id of the all-components display image
    pub display_map_id: String,
}

impl DimensionEntry {
    fn new(dimension: u32, archive: &str, index: &str, display: &str) -> Self {
        Self {
            dimension,
            archive_id: archive.to_string(),
            index_download_id: index.to_string(),
            display_map_id: display.to_string(),
        }
    }
}

/// Configuration table behind the registry
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RegistryTable {
    /// One entry per published dimension, ascending
    pub entries: Vec<DimensionEntry>,
    /// Published resolutions in mm
    pub resolutions: Vec<u32>,
    /// OSF id of the dataset README
    pub readme_id: String,
    /// OSF id of the resampling script
    pub resample_script_id: String,
    /// Address the site is served from
    pub base_url: String,
}

impl Default for RegistryTable {
    fn default() -> Self {
        Self {
            entries: vec![
                DimensionEntry::new(64, "pqu9r", "6fjqa", "vfhk8"),
                DimensionEntry::new(128, "wjvd5", "zw6ua", "hwc4b"),
                DimensionEntry::new(256, "3vrct", "tku4r", "ynqu9"),
                DimensionEntry::new(512, "9b76y", "2hsjk", "xcb9g"),
                DimensionEntry::new(1024, "34792", "wa894", "pxvw2"),
            ],
            resolutions: RESOLUTIONS.to_vec(),
            readme_id: "u5xhn".to_string(),
            resample_script_id: "ezr37".to_string(),
            base_url: SITE_BASE_URL.to_string(),
        }
    }
}

/// Lookup over a [`RegistryTable`]
#[derive(Debug, Clone, Default)]
pub struct AtlasRegistry {
    table: RegistryTable,
}

fn join_values<T: Display>(values: impl Iterator<Item = T>) -> String {
    values.map(|v| v.to_string()).collect::<Vec<_>>().join(", ")
}

fn osf_url(id: &str) -> String {
    OSF_DOWNLOAD.replace("{id}", id)
}

impl AtlasRegistry {
    /// Build a registry over `table`
    pub fn new(table: RegistryTable) -> Self {
        Self { table }
    }

    /// Replace the site base URL
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.table.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Published dimensions, in table order
    pub fn dimensions(&self) -> Vec<u32> {
        self.table.entries.iter().map(|e| e.dimension).collect()
    }

    /// Published resolutions
    pub fn resolutions(&self) -> &[u32] {
        &self.table.resolutions
    }

    /// Entry for `dimension`
    pub fn entry(&self, dimension: u32) -> Result<&DimensionEntry, RegistryError> {
        self.table
            .entries
            .iter()
            .find(|e| e.dimension == dimension)
            .ok_or_else(|| RegistryError::InvalidDimension {
                requested: dimension,
                valid: join_values(self.table.entries.iter().map(|e| e.dimension)),
            })
    }

    /// Validate a dimension and resolution pair
    pub fn check(&self, dimension: u32, resolution_mm: u32) -> Result<(), RegistryError> {
        self.entry(dimension)?;
        if !self.table.resolutions.contains(&resolution_mm) {
            return Err(RegistryError::InvalidResolution {
                requested: resolution_mm,
                valid: join_values(self.table.resolutions.iter()),
            });
        }
        Ok(())
    }

    /// Archive download URL
    pub fn archive_url(&self, dimension: u32) -> Result<String, RegistryError> {
        Ok(osf_url(&self.entry(dimension)?.archive_id))
    }

    /// Download link shown on the index page
    pub fn index_download_url(&self, dimension: u32) -> Result<String, RegistryError> {
        Ok(osf_url(&self.entry(dimension)?.index_download_id))
    }

    /// Download link of the all-components display image
    pub fn display_map_url(&self, dimension: u32) -> Result<String, RegistryError> {
        Ok(osf_url(&self.entry(dimension)?.display_map_id))
    }

    /// README download URL
    pub fn readme_url(&self) -> String {
        osf_url(&self.table.readme_id)
    }

    /// Resampling script download URL
    pub fn resample_script_url(&self) -> String {
        osf_url(&self.table.resample_script_id)
    }

    /// Site base URL, without trailing slash
    pub fn base_url(&self) -> &str {
        &self.table.base_url
    }

    /// Archive-relative path of the label CSV
    pub fn labels_path(&self, dimension: u32) -> Result<PathBuf, RegistryError> {
        self.entry(dimension)?;
        Ok(PathBuf::from(dimension.to_string()).join(format!("labels_{dimension}_dictionary.csv")))
    }

    /// Archive-relative path of the maps image at `resolution_mm`
    pub fn maps_path(&self, dimension: u32, resolution_mm: u32) -> Result<PathBuf, RegistryError> {
        self.check(dimension, resolution_mm)?;
        let root = PathBuf::from(dimension.to_string());
        Ok(if resolution_mm == 3 {
            root.join("3mm").join("resampled_maps.nii.gz")
        } else {
            root.join("maps.nii.gz")
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_table_covers_all_dimensions() {
        let registry = AtlasRegistry::default();
        assert_eq!(registry.dimensions(), DIMENSIONS.to_vec());
        assert_eq!(registry.resolutions(), &RESOLUTIONS);
    }

    #[test]
    fn test_urls() {
        let registry = AtlasRegistry::default();
        assert_eq!(
            registry.archive_url(64).unwrap(),
            "https://osf.io/pqu9r/download"
        );
        assert_eq!(
            registry.index_download_url(1024).unwrap(),
            "https://osf.io/wa894/download"
        );
        assert_eq!(
            registry.display_map_url(256).unwrap(),
            "https://osf.io/ynqu9/download"
        );
        assert_eq!(registry.readme_url(), "https://osf.io/u5xhn/download");
        assert_eq!(
            registry.resample_script_url(),
            "https://osf.io/ezr37/download"
        );
    }

    #[test]
    fn test_archive_paths() {
        let registry = AtlasRegistry::default();
        assert_eq!(
            registry.maps_path(128, 2).unwrap(),
            PathBuf::from("128/maps.nii.gz")
        );
        assert_eq!(
            registry.maps_path(128, 3).unwrap(),
            PathBuf::from("128/3mm/resampled_maps.nii.gz")
        );
        assert_eq!(
            registry.labels_path(512).unwrap(),
            PathBuf::from("512/labels_512_dictionary.csv")
        );
    }

    #[test]
    fn test_invalid_values_name_valid_set() {
        let registry = AtlasRegistry::default();

        let err = registry.entry(100).unwrap_err();
        assert_eq!(
            err.to_string(),
            "requested dimension=100 is not available; valid options: 64, 128, 256, 512, 1024"
        );

        let err = registry.check(64, 1).unwrap_err();
        assert!(matches!(err, RegistryError::InvalidResolution { requested: 1, .. }));
        assert!(err.to_string().contains("2, 3"));
    }

    #[test]
    fn test_custom_table_and_base_url() {
        let table = RegistryTable {
            entries: vec![DimensionEntry::new(8, "aaaaa", "bbbbb", "ccccc")],
            ..RegistryTable::default()
        };
        let registry = AtlasRegistry::new(table).with_base_url("http://localhost:8000/");

        assert_eq!(registry.dimensions(), vec![8]);
        assert_eq!(registry.base_url(), "http://localhost:8000");
        assert!(registry.entry(64).is_err());
    }
}
