//! Table output

use anyhow::{Context, Result};
use serde::Serialize;
use std::fs;
use std::path::{Path, PathBuf};

/// Supported table formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, clap::ValueEnum)]
pub enum OutputFormat {
    /// Comma-separated values, as read by the site generator
    Csv,
    /// Pretty-printed JSON
    Json,
}

impl OutputFormat {
    /// File extension for this format
    pub fn extension(&self) -> &'static str {
        match self {
            OutputFormat::Csv => "csv",
            OutputFormat::Json => "json",
        }
    }
}

/// A table the CLI can write in any [`OutputFormat`]
pub trait TableOutput: Serialize {
    /// Write the delimited form
    fn write_csv(&self, path: &Path) -> difumo_engine::Result<()>;
}

impl TableOutput for difumo_engine::LabelsTable {
    fn write_csv(&self, path: &Path) -> difumo_engine::Result<()> {
        self.write(path)
    }
}

impl TableOutput for difumo_engine::RelatedTable {
    fn write_csv(&self, path: &Path) -> difumo_engine::Result<()> {
        self.write(path)
    }
}

impl TableOutput for difumo_engine::TissueTable {
    fn write_csv(&self, path: &Path) -> difumo_engine::Result<()> {
        self.write(path)
    }
}

/// Path of `{dimension}_{kind}` under `dir`
pub fn table_path(dir: &Path, dimension: u32, kind: &str, format: OutputFormat) -> PathBuf {
    dir.join(format!("{dimension}_{kind}.{}", format.extension()))
}

/// Write `table` to `path` in `format`
pub fn write_table<T: TableOutput>(table: &T, path: &Path, format: OutputFormat) -> Result<()> {
    match format {
        OutputFormat::Csv => table
            .write_csv(path)
            .with_context(|| format!("Failed to write {}", path.display()))?,
        OutputFormat::Json => {
            if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
                fs::create_dir_all(parent)
                    .with_context(|| format!("Failed to create {}", parent.display()))?;
            }
            let json = serde_json::to_string_pretty(table)?;
            fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?;
        }
    }
    log::info!("wrote {}", path.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use difumo_engine::tables::RelatedRow;
    use difumo_engine::RelatedTable;
    use tempfile::TempDir;

    fn table() -> RelatedTable {
        RelatedTable {
            rows: vec![RelatedRow {
                dimension: 64,
                component: 1,
                identified: 3,
                overlap_against: 128,
                label: "Cuneus".to_string(),
            }],
        }
    }

    #[test]
    fn test_table_path() {
        let path = table_path(Path::new("tables"), 64, "related", OutputFormat::Json);
        assert_eq!(path, PathBuf::from("tables/64_related.json"));
    }

    #[test]
    fn test_json_output() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("out/64_related.json");
        write_table(&table(), &path, OutputFormat::Json).unwrap();

        let value: serde_json::Value =
            serde_json::from_str(&fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(value["rows"][0]["label"], "Cuneus");
        assert_eq!(value["rows"][0]["overlap_against"], 128);
    }

    #[test]
    fn test_csv_output_reads_back() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("64_related.csv");
        write_table(&table(), &path, OutputFormat::Csv).unwrap();
        assert_eq!(RelatedTable::read(&path).unwrap(), table());
    }
}
