//! Relate command implementation

use super::{for_each_dimension, DatasetArgs};
use crate::context::AppContext;
use crate::output::{table_path, write_table, OutputFormat};
use anyhow::Result;
use clap::Args;
use difumo_engine::{masker_for, relate_dimensions, DifumoAtlas, RELATED_PER_DIMENSION};
use std::path::PathBuf;

/// Arguments for the relate command
#[derive(Debug, Args)]
pub struct RelateArgs {
    #[command(flatten)]
    pub dataset: DatasetArgs,

    /// Dimensions to search for related components (default: all)
    #[arg(long, value_name = "DIM", value_delimiter = ',')]
    pub against: Vec<u32>,

    /// Related components kept per dimension
    #[arg(short = 'n', long, default_value_t = RELATED_PER_DIMENSION)]
    pub per_dimension: usize,

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

impl RelateArgs {
    /// Execute the relate command
    pub fn execute(&self, context: &AppContext, quiet: bool) -> Result<()> {
        let dimensions = context.dimensions(&self.dataset.dimensions)?;
        let against = context.dimensions(&self.against)?;
        let mask = context.load_mask()?;
        let output_dir = self
            .output
            .clone()
            .unwrap_or_else(|| context.config.site.tables.clone());

        let targets = against
            .iter()
            .map(|&dimension| context.load_atlas(dimension))
            .collect::<Result<Vec<DifumoAtlas>>>()?;
        let target_refs: Vec<&DifumoAtlas> = targets.iter().collect();

        let written = for_each_dimension(context, &dimensions, self.parallel, quiet, |dimension| {
            let loaded;
            let query = match targets.iter().find(|t| t.dimension == dimension) {
                Some(atlas) => atlas,
                None => {
                    loaded = context.load_atlas(dimension)?;
                    &loaded
                }
            };
            let mut atlases = vec![query];
            atlases.extend(target_refs.iter().copied());
            let masker = masker_for(&atlases, mask.as_ref())?;
            let table = relate_dimensions(query, &target_refs, &masker, self.per_dimension)?;
            let path = table_path(&output_dir, dimension, "related", self.format);
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
