//! DiFuMo site CLI library
//!
//! This library provides the command-line interface that fetches the DiFuMo
//! dictionaries, computes their overlap tables and writes the atlas website.

pub mod cli;
pub mod commands;
pub mod config;
pub mod context;
pub mod error;
pub mod input;
pub mod output;
pub mod progress;

pub use cli::Cli;
pub use error::{CliError, CliResult};
