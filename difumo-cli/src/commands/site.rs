//! Site command implementation

use super::DatasetArgs;
use crate::context::AppContext;
use crate::error::CliError;
use crate::output::{table_path, OutputFormat};
use anyhow::{Context, Result};
use clap::Args;
use difumo_engine::label_table::read_difumo_labels;
use difumo_engine::{DimensionContent, LabelsTable, RelatedTable, SiteGenerator};
use std::path::{Path, PathBuf};

/// Arguments for the site command
#[derive(Debug, Args)]
pub struct SiteArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Site root (overrides [site] root)
    #[arg(short, long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Directory with the overlap tables (overrides [site] tables)
    #[arg(short, long, value_name = "DIR")]
    pub tables: Option<PathBuf>,

    /// Write absolute URLs to the sitemap
    #[arg(long)]
    pub absolute: bool,
}

fn read_optional<T>(path: &Path, read: impl FnOnce(&Path) -> difumo_engine::Result<T>) -> Result<Option<T>> {
    if !path.is_file() {
        log::info!("{} not found, skipping", path.display());
        return Ok(None);
    }
    read(path)
        .map(Some)
        .with_context(|| format!("Failed to read {}", path.display()))
}

impl SiteArgs {
    /// Execute the site command
    pub fn execute(&self, context: &AppContext) -> Result<()> {
        let dimensions = self.dimensions(context)?;
        let root = self.root.clone().unwrap_or_else(|| context.config.site.root.clone());
        let tables = self
            .tables
            .clone()
            .unwrap_or_else(|| context.config.site.tables.clone());

        let generator = SiteGenerator::new(&root, context.registry().clone());
        generator.write_index()?;

        let mut pages = 0;
        for &dimension in &dimensions {
            let content = self.content(context, dimension, &tables)?;
            pages += generator.write_dimension(&content)?;
        }
        let sitemap = generator.write_sitemap(self.absolute)?;

        println!(
            "✓ Wrote {pages} component pages for {} dimension(s) under {}",
            dimensions.len(),
            root.display()
        );
        println!("  Sitemap: {} entries", sitemap.len());
        Ok(())
    }

    /// Requested dimensions, or every dimension whose labels are cached
    fn dimensions(&self, context: &AppContext) -> Result<Vec<u32>> {
        if !self.dataset.dimensions.is_empty() {
            return context.dimensions(&self.dataset.dimensions);
        }

        let mut available = Vec::new();
        for dimension in context.registry().dimensions() {
            let files = context.cache().locate(dimension, context.resolution())?;
            if files.labels.is_file() {
                available.push(dimension);
            } else {
                log::warn!("DiFuMo {dimension} labels not fetched, skipping");
            }
        }
        if available.is_empty() {
            return Err(CliError::MissingDataset(difumo_engine::DIMENSIONS[0]).into());
        }
        Ok(available)
    }

    fn content(&self, context: &AppContext, dimension: u32, tables: &Path) -> Result<DimensionContent> {
        let files = context.cache().locate(dimension, context.resolution())?;
        if !files.labels.is_file() {
            return Err(CliError::MissingDataset(dimension).into());
        }
        let names = read_difumo_labels(&files.labels)
            .with_context(|| format!("Failed to read {}", files.labels.display()))?;

        Ok(DimensionContent {
            dimension,
            names: names.names().to_vec(),
            labels: read_optional(&table_path(tables, dimension, "labels", OutputFormat::Csv), LabelsTable::read)?,
            related: read_optional(&table_path(tables, dimension, "related", OutputFormat::Csv), RelatedTable::read)?,
        })
    }
}
