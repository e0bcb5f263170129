//! Top-level argument parser

use crate::commands::Commands;
use crate::config::CliConfig;
use crate::context::AppContext;
use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;

/// Build and maintain the DiFuMo atlas website
#[derive(Debug, Parser)]
#[command(name = "difumo-site", version, about, long_about = None)]
pub struct Cli {
    /// Configuration file
    #[arg(short, long, global = true, value_name = "FILE", env = "DIFUMO_SITE_CONFIG")]
    pub config: Option<PathBuf>,

    /// Suppress progress and log output
    #[arg(short, long, global = true)]
    pub quiet: bool,

    /// Increase verbosity
    #[arg(short, long, global = true, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Command to run
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Run the selected command
    pub fn execute(&self) -> Result<()> {
        self.init_logging();
        log::debug!("Arguments: {self:?}");

        match &self.command {
            Commands::Fetch(args) => args.execute(&self.context(args.dataset.data_dir.clone())?, self.quiet),
            Commands::Label(args) => args.execute(&self.context(args.dataset.data_dir.clone())?, self.quiet),
            Commands::Relate(args) => args.execute(&self.context(args.dataset.data_dir.clone())?, self.quiet),
            Commands::Tissue(args) => args.execute(&self.context(args.dataset.data_dir.clone())?, self.quiet),
            Commands::Site(args) => args.execute(&self.context(args.dataset.data_dir.clone())?),
            Commands::Sitemap(args) => args.execute(&self.context(None)?),
            Commands::Resample(args) => args.execute(self.quiet),
            Commands::GenerateConfig(args) => args.execute(),
            Commands::Validate(args) => args.execute(self.config.as_deref()),
            Commands::List { subcommand } => subcommand.execute(),
        }
    }

    fn context(&self, data_dir: Option<PathBuf>) -> Result<AppContext> {
        let config = CliConfig::load_or_default(self.config.as_deref())?;
        Ok(AppContext::new(config, data_dir))
    }

    /// Initialize logging based on verbosity level
    fn init_logging(&self) {
        if self.quiet {
            return;
        }

        let log_level = match self.verbose {
            0 => "warn",
            1 => "info",
            2 => "debug",
            _ => "trace",
        };

        // A second initialisation (tests) keeps the first logger
        let _ = env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
            .try_init();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_global_flags_after_subcommand() {
        let cli = Cli::try_parse_from(["difumo-site", "list", "dimensions", "-vv", "-q"]).unwrap();
        assert_eq!(cli.verbose, 2);
        assert!(cli.quiet);
    }

    #[test]
    fn test_config_flag() {
        let cli =
            Cli::try_parse_from(["difumo-site", "-c", "difumo.toml", "sitemap", "--absolute"]).unwrap();
        assert_eq!(cli.config, Some(PathBuf::from("difumo.toml")));
        assert!(matches!(cli.command, Commands::Sitemap(ref args) if args.absolute));
    }

    #[test]
    fn test_unknown_subcommand_fails() {
        assert!(Cli::try_parse_from(["difumo-site", "plot"]).is_err());
    }
}
