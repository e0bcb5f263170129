use clap::Parser;
use difumo_cli::{Cli, CliResult};

fn main() -> CliResult<()> {
    Cli::parse().execute()
}
