//! CLI command implementations

use crate::context::AppContext;
use crate::progress::ProgressReporter;
use anyhow::Result;
use clap::{Args, Subcommand};
use rayon::prelude::*;
use std::path::PathBuf;

pub mod fetch;
pub mod generate_config;
pub mod label;
pub mod list;
pub mod relate;
pub mod resample;
pub mod site;
pub mod sitemap;
pub mod tissue;
pub mod validate;

/// Available CLI commands
#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Download DiFuMo dictionaries into the data directory
    Fetch(fetch::FetchArgs),

    /// Label every component with the best-matching reference region
    Label(label::LabelArgs),

    /// Find related components across dimensions
    Relate(relate::RelateArgs),

    /// Measure grey matter, white matter and CSF content of components
    Tissue(tissue::TissueArgs),

    /// Write the Markdown and HTML pages of the site
    Site(site::SiteArgs),

    /// Write assets/sitemap.txt for an existing site
    Sitemap(sitemap::SitemapArgs),

    /// Resample images onto the grid of a reference image
    Resample(resample::ResampleArgs),

    /// Write a commented configuration template
    GenerateConfig(generate_config::GenerateConfigArgs),

    /// Check a configuration file
    Validate(validate::ValidateArgs),

    /// List available components
    List {
        #[command(subcommand)]
        subcommand: ListCommands,
    },
}

/// List subcommands
#[derive(Debug, Subcommand)]
pub enum ListCommands {
    /// List published dictionary dimensions
    Dimensions,

    /// List supported reference atlases
    Atlases,
}

/// Dimension selection and dataset location, shared by data commands
#[derive(Debug, Clone, Default, Args)]
pub struct DatasetArgs {
    /// Dimensions to process (default: all)
    #[arg(short, long = "dimension", value_name = "DIM", value_delimiter = ',')]
    pub dimensions: Vec<u32>,

    /// Data directory (overrides [data] dir)
    #[arg(long, value_name = "DIR")]
    pub data_dir: Option<PathBuf>,
}

/// Run `task` once per dimension, on the worker pool when `parallel` is set
///
/// Results keep the order of `dimensions`.
pub(crate) fn for_each_dimension<T, F>(
    context: &AppContext,
    dimensions: &[u32],
    parallel: bool,
    quiet: bool,
    task: F,
) -> Result<Vec<T>>
where
    T: Send,
    F: Fn(u32) -> Result<T> + Sync,
{
    let mut progress = ProgressReporter::new(quiet);
    progress.init(dimensions.len() as u64, "dimensions");

    let run = |dimension: u32| {
        progress.started(&format!("DiFuMo {dimension}"));
        let result = task(dimension);
        progress.completed(&format!("DiFuMo {dimension}"));
        result
    };

    let results = if parallel && dimensions.len() > 1 {
        context
            .thread_pool()?
            .install(|| dimensions.par_iter().map(|&d| run(d)).collect::<Result<Vec<_>>>())
    } else {
        dimensions.iter().map(|&d| run(d)).collect::<Result<Vec<_>>>()
    };

    progress.finish();
    results
}
