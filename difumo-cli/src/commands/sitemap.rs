//! Sitemap command implementation

use crate::context::AppContext;
use anyhow::Result;
use clap::Args;
use difumo_engine::SiteGenerator;
use std::path::PathBuf;

/// Arguments for the sitemap command
#[derive(Debug, Args)]
pub struct SitemapArgs {
    /// Site root (overrides [site] root)
    #[arg(short, long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Write absolute URLs under [site] base_url
    #[arg(long)]
    pub absolute: bool,
}

impl SitemapArgs {
    /// Execute the sitemap command
    pub fn execute(&self, context: &AppContext) -> Result<()> {
        let root = self.root.clone().unwrap_or_else(|| context.config.site.root.clone());
        if !root.is_dir() {
            anyhow::bail!("Site root {} does not exist", root.display());
        }

        let entries = SiteGenerator::new(&root, context.registry().clone()).write_sitemap(self.absolute)?;
        println!("✓ {} entries written to {}", entries.len(), root.join("assets/sitemap.txt").display());
        Ok(())
    }
}
