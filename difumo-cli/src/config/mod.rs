//! Configuration module

use crate::error::CliError;
use anyhow::{Context, Result};
use difumo_engine::registry::SITE_BASE_URL;
use difumo_engine::{LabelFormat, ReferenceAtlas, ReferenceSource};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

/// CLI configuration structure
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct CliConfig {
    /// Dataset cache configuration
    #[serde(default)]
    pub data: DataConfig,

    /// Site output configuration
    #[serde(default)]
    pub site: SiteConfig,

    /// Brain mask used for overlaps
    #[serde(default)]
    pub mask: MaskConfig,

    /// Tissue probability maps
    #[serde(default)]
    pub tissue: TissueConfig,

    /// Reference atlases by name
    #[serde(default)]
    pub atlases: BTreeMap<String, AtlasConfig>,

    /// Performance configuration
    #[serde(default)]
    pub performance: PerformanceConfig,
}

/// Dataset cache configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct DataConfig {
    /// Data directory (default: `$NILEARN_DATA` or `~/nilearn_data`)
    pub dir: Option<PathBuf>,

    /// Resolution of the maps in mm
    pub resolution: u32,
}

impl Default for DataConfig {
    fn default() -> Self {
        Self {
            dir: None,
            resolution: 2,
        }
    }
}

/// Site output configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct SiteConfig {
    /// Directory pages are written under
    pub root: PathBuf,

    /// Address the site is served from
    pub base_url: String,

    /// Directory holding the overlap tables
    pub tables: PathBuf,
}

impl Default for SiteConfig {
    fn default() -> Self {
        Self {
            root: PathBuf::from("."),
            base_url: SITE_BASE_URL.to_string(),
            tables: PathBuf::from("tables"),
        }
    }
}

/// Brain mask configuration
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct MaskConfig {
    /// Mask image; the support of the DiFuMo maps when unset
    pub path: Option<PathBuf>,
}

/// Tissue probability maps
#[derive(Debug, Clone, Deserialize, Serialize, Default, PartialEq)]
pub struct TissueConfig {
    /// Grey matter
    pub gm: Option<PathBuf>,
    /// White matter
    pub wm: Option<PathBuf>,
    /// Cerebrospinal fluid
    pub csf: Option<PathBuf>,
}

/// Files of one reference atlas
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct AtlasConfig {
    /// Integer label image
    pub maps: PathBuf,

    /// Label names file
    #[serde(default)]
    pub labels: Option<PathBuf>,

    /// Label names layout (defaults per atlas)
    #[serde(default)]
    pub format: Option<LabelFormat>,
}

/// Performance-related configuration
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
#[serde(default)]
pub struct PerformanceConfig {
    /// Number of worker threads (0 = auto)
    pub worker_threads: usize,

    /// Download timeout in seconds
    pub download_timeout_secs: u64,
}

impl Default for PerformanceConfig {
    fn default() -> Self {
        Self {
            worker_threads: 0,
            download_timeout_secs: 300,
        }
    }
}

impl CliConfig {
    /// Load a TOML configuration file
    pub fn load(path: &Path) -> Result<Self> {
        let text = std::fs::read_to_string(path)
            .with_context(|| format!("Failed to read config file {}", path.display()))?;
        let config: CliConfig = toml::from_str(&text)
            .with_context(|| format!("Failed to parse config file {}", path.display()))?;
        log::debug!("loaded configuration from {}", path.display());
        Ok(config)
    }

    /// Load `path` if given, defaults otherwise
    pub fn load_or_default(path: Option<&Path>) -> Result<Self> {
        match path {
            Some(path) => Self::load(path),
            None => Ok(Self::default()),
        }
    }

    /// Configured reference atlases, in catalogue order
    pub fn reference_sources(&self) -> Result<Vec<(ReferenceAtlas, ReferenceSource)>> {
        let mut sources = Vec::with_capacity(self.atlases.len());
        for (name, atlas_config) in &self.atlases {
            let atlas: ReferenceAtlas = name
                .parse()
                .map_err(|e| CliError::ConfigError(format!("[atlases.{name}]: {e}")))?;
            sources.push((
                atlas,
                ReferenceSource {
                    maps: atlas_config.maps.clone(),
                    labels: atlas_config.labels.clone(),
                    format: atlas_config.format.unwrap_or_else(|| atlas.default_format()),
                },
            ));
        }
        sources.sort_by_key(|(atlas, _)| *atlas);
        Ok(sources)
    }

    /// Problems that would stop a command, empty when the file is usable
    pub fn problems(&self) -> Vec<String> {
        let mut problems = Vec::new();
        let mut check_file = |what: String, path: &Path| {
            if !path.is_file() {
                problems.push(format!("{what}: {} does not exist", path.display()));
            }
        };

        if let Some(mask) = &self.mask.path {
            check_file("[mask] path".to_string(), mask);
        }
        for (tissue, path) in [
            ("gm", &self.tissue.gm),
            ("wm", &self.tissue.wm),
            ("csf", &self.tissue.csf),
        ] {
            if let Some(path) = path {
                check_file(format!("[tissue] {tissue}"), path);
            }
        }

        for (name, atlas) in &self.atlases {
            check_file(format!("[atlases.{name}] maps"), &atlas.maps);
            if let Some(labels) = &atlas.labels {
                check_file(format!("[atlases.{name}] labels"), labels);
            }
        }

        for (name, atlas) in &self.atlases {
            match name.parse::<ReferenceAtlas>() {
                Err(e) => problems.push(format!("[atlases.{name}]: {e}")),
                Ok(reference) => {
                    let format = atlas.format.unwrap_or_else(|| reference.default_format());
                    if format.needs_file() && atlas.labels.is_none() {
                        problems.push(format!(
                            "[atlases.{name}]: format '{format}' needs a labels file"
                        ));
                    }
                }
            }
        }

        if !difumo_engine::RESOLUTIONS.contains(&self.data.resolution) {
            problems.push(format!(
                "[data] resolution {} is not one of {:?}",
                self.data.resolution,
                difumo_engine::RESOLUTIONS
            ));
        }
        problems
    }
}
