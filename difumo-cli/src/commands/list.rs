//! List command implementation

use super::ListCommands;
use anyhow::Result;
use difumo_engine::{AtlasRegistry, LabelFormat, ReferenceAtlas};

impl ListCommands {
    /// Execute the list command
    pub fn execute(&self) -> Result<()> {
        match self {
            ListCommands::Dimensions => {
                let registry = AtlasRegistry::default();
                println!("Available dimensions:");
                for dimension in registry.dimensions() {
                    println!("  {:<6} {}", dimension, registry.archive_url(dimension)?);
                }
                println!();
                println!("Resolutions (mm): {:?}", registry.resolutions());
            }
            ListCommands::Atlases => {
                println!("Reference atlases:");
                for atlas in ReferenceAtlas::ALL {
                    println!(
                        "  {:<16} {:<16} labels: {}",
                        atlas.name(),
                        atlas.alias(),
                        atlas.default_format()
                    );
                }
                println!();
                let formats: Vec<_> = LabelFormat::ALL.iter().map(|f| f.name()).collect();
                println!("Label formats: {}", formats.join(", "));
            }
        }
        Ok(())
    }
}
