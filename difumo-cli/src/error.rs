//! Error handling for the CLI application

use std::fmt;

/// CLI-specific errors
#[derive(Debug)]
pub enum CliError {
    /// File not found or inaccessible
    FileNotFound(String),
    /// Invalid file pattern
    InvalidPattern(String),
    /// Configuration error
    ConfigError(String),
    /// A dictionary is needed but has not been fetched
    MissingDataset(u32),
    /// A tissue probability map is not configured
    MissingTissueMap(&'static str),
}

impl fmt::Display for CliError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CliError::FileNotFound(path) => write!(f, "File not found: {path}"),
            CliError::InvalidPattern(pattern) => write!(f, "Invalid file pattern: {pattern}"),
            CliError::ConfigError(msg) => write!(f, "Configuration error: {msg}"),
            CliError::MissingDataset(dimension) => write!(
                f,
                "DiFuMo {dimension} is not in the data directory; run `difumo-site fetch -d {dimension}` first"
            ),
            CliError::MissingTissueMap(tissue) => write!(
                f,
                "No {tissue} map configured; set [tissue] in the config file or pass --{}",
                tissue.to_lowercase()
            ),
        }
    }
}

impl std::error::Error for CliError {}

/// Result type alias for CLI operations
pub type CliResult<T> = Result<T, anyhow::Error>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_file_not_found_error_display() {
        let error = CliError::FileNotFound("mask.nii.gz".to_string());
        assert_eq!(error.to_string(), "File not found: mask.nii.gz");
    }

    #[test]
    fn test_config_error_display() {
        let error = CliError::ConfigError("unknown atlas 'aal'".to_string());
        assert_eq!(error.to_string(), "Configuration error: unknown atlas 'aal'");
    }

    #[test]
    fn test_missing_dataset_suggests_fetch() {
        let error = CliError::MissingDataset(128);
        assert!(error.to_string().contains("difumo-site fetch -d 128"));
    }

    #[test]
    fn test_missing_tissue_names_flag() {
        let error = CliError::MissingTissueMap("CSF");
        assert!(error.to_string().ends_with("--csf"));
    }

    #[test]
    fn test_error_trait_implementation() {
        let error = CliError::InvalidPattern("[".to_string());
        let _: &dyn std::error::Error = &error;
        assert!(format!("{error:?}").contains("InvalidPattern"));
    }
}
