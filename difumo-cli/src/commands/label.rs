//! Label command implementation

use super::{for_each_dimension, DatasetArgs};
use crate::context::AppContext;
use crate::output::{table_path, write_table, OutputFormat};
use anyhow::Result;
use clap::Args;
use difumo_engine::{label_regions, masker_for};
use std::path::PathBuf;

/// Arguments for the label command
#[derive(Debug, Args)]
pub struct LabelArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Reference atlases to use (default: every configured atlas)
    #[arg(short, long, value_name = "NAME", value_delimiter = ',')]
    pub atlas: Vec<String>,

    /// Output directory (default: [site] tables)
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Output format
    #[arg(short, long, value_enum, default_value = "csv")]
    pub format: OutputFormat,

    /// Process dimensions in parallel
    #[arg(short, long)]
    pub parallel: bool,
}

impl LabelArgs {
    /// Execute the label command
    pub fn execute(&self, context: &AppContext, quiet: bool) -> Result<()> {
        let dimensions = context.dimensions(&self.dataset.dimensions)?;
        let references = context.load_references(&self.atlas)?;
        if references.is_empty() {
            anyhow::bail!(
                "No reference atlases configured; add [atlases.<name>] sections to the config file"
            );
        }
        let mask = context.load_mask()?;
        let output_dir = self
            .output
            .clone()
            .unwrap_or_else(|| context.config.site.tables.clone());

        log::info!(
            "labeling {} dimension(s) against {} atlas(es)",
            dimensions.len(),
            references.len()
        );

        let written = for_each_dimension(context, &dimensions, self.parallel, quiet, |dimension| {
            let atlas = context.load_atlas(dimension)?;
            let masker = masker_for(&[&atlas], mask.as_ref())?;
            let table = label_regions(&atlas, &masker, &references)?;
            let path = table_path(&output_dir, dimension, "labels", self.format);
            write_table(&table, &path, self.format)?;
            Ok(path)
        })?;

        if !quiet {
            for path in written {
                println!("✓ {}", path.display());
            }
        }
        Ok(())
    }
}
