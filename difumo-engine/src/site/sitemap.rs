//! Sitemap listing

use crate::error::{EngineError, Result};
use std::path::{Path, PathBuf};

fn glob_paths(root: &Path, pattern: &str) -> Result<Vec<PathBuf>> {
    let root_text = root.to_string_lossy();
    let full = format!(
        "{}/{pattern}",
        glob::Pattern::escape(root_text.trim_end_matches('/'))
    );
    let paths = glob::glob(&full)
        .map_err(|e| EngineError::InvalidInput(format!("bad sitemap pattern {full}: {e}")))?;

    let mut found = Vec::new();
    for entry in paths {
        match entry {
            Ok(path) => found.push(path),
            Err(e) => log::warn!("skipping unreadable path: {e}"),
        }
    }
    Ok(found)
}

/// Site-relative entries: component pages plus top-level pages as `.html`
pub fn collect_entries(root: &Path) -> Result<Vec<String>> {
    let relative = |path: &Path| -> String {
        path.strip_prefix(root)
            .unwrap_or(path)
            .components()
            .map(|c| c.as_os_str().to_string_lossy().into_owned())
            .collect::<Vec<_>>()
            .join("/")
    };

    let mut entries: Vec<String> = glob_paths(root, "*/html/*.html")?
        .iter()
        .map(|p| relative(p))
        .collect();
    entries.extend(
        glob_paths(root, "*.md")?
            .iter()
            .map(|p| relative(&p.with_extension("html"))),
    );
    entries.sort();
    entries.dedup();
    Ok(entries)
}

/// Write `assets/sitemap.txt` under `root`, returning the entries
pub fn write_sitemap(root: &Path, base_url: Option<&str>) -> Result<Vec<String>> {
    let entries = collect_entries(root)?;
    let lines: Vec<String> = match base_url {
        Some(base) => entries
            .iter()
            .map(|e| format!("{}/{e}", base.trim_end_matches('/')))
            .collect(),
        None => entries.clone(),
    };

    let path = root.join("assets").join("sitemap.txt");
    let assets = root.join("assets");
    std::fs::create_dir_all(&assets).map_err(EngineError::io(&assets))?;
    let mut text = lines.join("\n");
    text.push('\n');
    std::fs::write(&path, text).map_err(EngineError::io(&path))?;
    log::info!("sitemap lists {} pages", entries.len());
    Ok(lines)
}
