//! Image pattern resolution using glob

use crate::error::CliError;
use anyhow::{Context, Result};
use glob::glob;
use std::path::PathBuf;

/// Resolve image patterns to existing NIfTI files
pub fn resolve_patterns(patterns: &[String]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();

    for pattern in patterns {
        let paths = glob(pattern).map_err(|_| CliError::InvalidPattern(pattern.clone()))?;

        for path_result in paths {
            let path = path_result.with_context(|| format!("Error resolving pattern: {pattern}"))?;

            if path.is_file() && is_nifti(&path) {
                files.push(path);
            } else if path.is_file() {
                log::debug!("skipping {}: not a NIfTI file", path.display());
            }
        }
    }

    if files.is_empty() {
        anyhow::bail!("No NIfTI images found matching the provided patterns");
    }

    files.sort();
    files.dedup();

    Ok(files)
}

fn is_nifti(path: &std::path::Path) -> bool {
    let name = path
        .file_name()
        .map(|n| n.to_string_lossy().to_lowercase())
        .unwrap_or_default();
    name.ends_with(".nii") || name.ends_with(".nii.gz")
}
