//! Validate command implementation

use crate::config::CliConfig;
use anyhow::Result;
use clap::Args;
use std::path::Path;

/// Arguments for the validate command
#[derive(Debug, Args)]
pub struct ValidateArgs {
    /// Also load every reference atlas and its label names
    #[arg(long)]
    pub deep: bool,
}

impl ValidateArgs {
    /// Execute the validate command against the `-c/--config` file
    pub fn execute(&self, config_path: Option<&Path>) -> Result<()> {
        let Some(path) = config_path else {
            anyhow::bail!("No configuration file given; pass -c/--config");
        };

        println!("Validating configuration: {}", path.display());

        let config = match CliConfig::load(path) {
            Ok(config) => config,
            Err(e) => {
                println!("✗ Configuration is invalid!");
                println!("  Error: {e:#}");
                return Err(anyhow::anyhow!("Validation failed: {e}"));
            }
        };

        let mut problems = config.problems();
        if self.deep && problems.is_empty() {
            problems.extend(deep_problems(&config));
        }

        if problems.is_empty() {
            println!("✓ Configuration is valid!");
            println!("  Reference atlases: {}", config.atlases.len());
            println!("  Site root: {}", config.site.root.display());
            Ok(())
        } else {
            println!("✗ Configuration is invalid!");
            for problem in &problems {
                println!("  {problem}");
            }
            Err(anyhow::anyhow!("Validation failed: {} problem(s)", problems.len()))
        }
    }
}

/// Load every configured atlas, reporting failures
fn deep_problems(config: &CliConfig) -> Vec<String> {
    let sources = match config.reference_sources() {
        Ok(sources) => sources,
        Err(e) => return vec![e.to_string()],
    };
    sources
        .iter()
        .filter_map(|(atlas, source)| {
            difumo_engine::LoadedReference::load(*atlas, source)
                .err()
                .map(|e| format!("[atlases.{atlas}]: {e}"))
        })
        .collect()
}
