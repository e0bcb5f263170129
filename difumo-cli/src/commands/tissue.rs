//! Tissue command implementation

use super::{for_each_dimension, DatasetArgs};
use crate::context::AppContext;
use crate::error::CliError;
use crate::output::{table_path, write_table, OutputFormat};
use anyhow::{Context, Result};
use clap::Args;
use difumo_engine::{nifti, tissue_composition, Volume};
use std::path::{Path, PathBuf};

/// Arguments for the tissue command
#[derive(Debug, Args)]
pub struct TissueArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Grey matter probability map (overrides [tissue] gm)
    #[arg(long, value_name = "FILE")]
    pub gm: Option<PathBuf>,

    /// White matter probability map (overrides [tissue] wm)
    #[arg(long, value_name = "FILE")]
    pub wm: Option<PathBuf>,

    /// Cerebrospinal fluid probability map (overrides [tissue] csf)
    #[arg(long, value_name = "FILE")]
    pub csf: Option<PathBuf>,

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

fn read_tissue(tissue: &'static str, flag: Option<&Path>, configured: Option<&Path>) -> Result<Volume> {
    let path = flag
        .or(configured)
        .ok_or(CliError::MissingTissueMap(tissue))?;
    nifti::read_volume(path).with_context(|| format!("Failed to read {tissue} map {}", path.display()))
}

impl TissueArgs {
    /// Execute the tissue command
    pub fn execute(&self, context: &AppContext, quiet: bool) -> Result<()> {
        let dimensions = context.dimensions(&self.dataset.dimensions)?;
        let configured = &context.config.tissue;
        let gm = read_tissue("GM", self.gm.as_deref(), configured.gm.as_deref())?;
        let wm = read_tissue("WM", self.wm.as_deref(), configured.wm.as_deref())?;
        let csf = read_tissue("CSF", self.csf.as_deref(), configured.csf.as_deref())?;
        let output_dir = self
            .output
            .clone()
            .unwrap_or_else(|| context.config.site.tables.clone());

        let written = for_each_dimension(context, &dimensions, self.parallel, quiet, |dimension| {
            let atlas = context.load_atlas(dimension)?;
            let table = tissue_composition(&atlas, &gm, &wm, &csf)?;
            let path = table_path(&output_dir, dimension, "tissue", self.format);
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
