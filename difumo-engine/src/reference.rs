//! Reference atlases
//!
//! Anatomical and functional parcellations DiFuMo components are labeled
//! against. Files live wherever the local installation keeps them (FSL,
//! nilearn data), so each atlas is paired with a [`ReferenceSource`] from
//! configuration.

use crate::error::Result;
use crate::label_table::{load_label_names, LabelFormat};
use crate::nifti;
use difumo_core::Volume;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use thiserror::Error;

/// Errors raised for reference atlases
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ReferenceError {
    /// Name not in the catalogue
    #[error("atlas name '{name}' is not valid; provide one of: {valid}")]
    UnknownAtlas {
        /// Name given
        name: String,
        /// Accepted names
        valid: String,
    },

    /// No files configured for the atlas
    #[error("no source configured for reference atlas '{0}'")]
    MissingSource(String),
}

/// Reference atlases known to the labeling pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReferenceAtlas {
    /// Harvard-Oxford cortical and subcortical atlas
    HarvardOxford,
    /// Destrieux sulcal-gyral atlas
    Destrieux,
    /// Diedrichsen cerebellar atlas
    Diedrichsen,
    /// Juelich histological atlas
    Juelich,
    /// JHU white-matter atlas
    Jhu,
    /// MIST multi-resolution parcellation
    Mist,
    /// Yeo 2011 seven networks
    #[serde(rename = "yeo_networks7")]
    YeoNetworks7,
    /// Yeo 2011 seventeen networks
    #[serde(rename = "yeo_networks17")]
    YeoNetworks17,
}

impl ReferenceAtlas {
    /// Catalogue order, also the column order of label tables
    pub const ALL: [ReferenceAtlas; 8] = [
        ReferenceAtlas::HarvardOxford,
        ReferenceAtlas::Destrieux,
        ReferenceAtlas::Diedrichsen,
        ReferenceAtlas::Juelich,
        ReferenceAtlas::Jhu,
        ReferenceAtlas::Mist,
        ReferenceAtlas::YeoNetworks7,
        ReferenceAtlas::YeoNetworks17,
    ];

    /// Identifier used in configuration and table headers
    pub fn name(&self) -> &'static str {
        match self {
            ReferenceAtlas::HarvardOxford => "harvard_oxford",
            ReferenceAtlas::Destrieux => "destrieux",
            ReferenceAtlas::Diedrichsen => "diedrichsen",
            ReferenceAtlas::Juelich => "juelich",
            ReferenceAtlas::Jhu => "jhu",
            ReferenceAtlas::Mist => "mist",
            ReferenceAtlas::YeoNetworks7 => "yeo_networks7",
            ReferenceAtlas::YeoNetworks17 => "yeo_networks17",
        }
    }

    /// Name shown on pages
    pub fn alias(&self) -> &'static str {
        match self {
            ReferenceAtlas::HarvardOxford => "Harvard Oxford",
            ReferenceAtlas::Destrieux => "Destrieux",
            ReferenceAtlas::Diedrichsen => "Diedrichsen",
            ReferenceAtlas::Juelich => "Juelich",
            ReferenceAtlas::Jhu => "JHU",
            ReferenceAtlas::Mist => "BASC",
            ReferenceAtlas::YeoNetworks7 => "Yeo 7 networks",
            ReferenceAtlas::YeoNetworks17 => "Yeo 17 networks",
        }
    }

    /// Label format the atlas usually ships with
    pub fn default_format(&self) -> LabelFormat {
        match self {
            ReferenceAtlas::HarvardOxford
            | ReferenceAtlas::Diedrichsen
            | ReferenceAtlas::Juelich
            | ReferenceAtlas::Jhu => LabelFormat::FslXml,
            ReferenceAtlas::Destrieux => LabelFormat::Text,
            ReferenceAtlas::Mist => LabelFormat::MistCsv,
            ReferenceAtlas::YeoNetworks7 => LabelFormat::Yeo7,
            ReferenceAtlas::YeoNetworks17 => LabelFormat::Yeo17,
        }
    }

    /// Parse a list of names, keeping order and rejecting unknown ones
    pub fn parse_list<S: AsRef<str>>(names: &[S]) -> std::result::Result<Vec<Self>, ReferenceError> {
        names.iter().map(|n| n.as_ref().parse()).collect()
    }
}

impl fmt::Display for ReferenceAtlas {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

impl FromStr for ReferenceAtlas {
    type Err = ReferenceError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        ReferenceAtlas::ALL
            .into_iter()
            .find(|atlas| atlas.name() == s)
            .ok_or_else(|| ReferenceError::UnknownAtlas {
                name: s.to_string(),
                valid: ReferenceAtlas::ALL.map(|a| a.name()).join(", "),
            })
    }
}

/// Where to find an atlas on disk
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReferenceSource {
    /// Integer label image
    pub maps: PathBuf,
    /// Label names file, unless the format is built in
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<PathBuf>,
    /// Layout of the label names
    pub format: LabelFormat,
}

/// A reference atlas read into memory
#[derive(Debug, Clone)]
pub struct LoadedReference {
    /// Which atlas
    pub atlas: ReferenceAtlas,
    /// Label image
    pub labels_img: Volume,
    /// Name per label value
    pub names: Vec<String>,
}

impl LoadedReference {
    /// Read the label image and names for `atlas`
    pub fn load(atlas: ReferenceAtlas, source: &ReferenceSource) -> Result<Self> {
        let labels_img = nifti::read_volume(&source.maps)?;
        let names = load_label_names(source.format, source.labels.as_deref())?;
        log::debug!(
            "loaded reference atlas {atlas}: {} names from {}",
            names.len(),
            source.maps.display()
        );
        Ok(Self {
            atlas,
            labels_img,
            names,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_names_and_aliases() {
        assert_eq!("mist".parse::<ReferenceAtlas>().unwrap().alias(), "BASC");
        assert_eq!(ReferenceAtlas::HarvardOxford.alias(), "Harvard Oxford");
        for atlas in ReferenceAtlas::ALL {
            assert_eq!(atlas.name().parse::<ReferenceAtlas>().unwrap(), atlas);
        }
    }

    #[test]
    fn test_unknown_atlas_lists_valid_names() {
        let err = ReferenceAtlas::parse_list(&["jhu", "aal"]).unwrap_err();
        assert_eq!(
            err.to_string(),
            "atlas name 'aal' is not valid; provide one of: harvard_oxford, destrieux, \
             diedrichsen, juelich, jhu, mist, yeo_networks7, yeo_networks17"
        );
    }

    #[test]
    fn test_default_formats() {
        assert_eq!(ReferenceAtlas::Mist.default_format(), LabelFormat::MistCsv);
        assert_eq!(ReferenceAtlas::YeoNetworks17.default_format(), LabelFormat::Yeo17);
        assert!(ReferenceAtlas::Juelich.default_format().needs_file());
    }
}
