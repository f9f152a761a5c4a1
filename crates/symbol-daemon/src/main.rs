//! Symbol index command line tool
//!
//! Runs one indexing pass over a directory and prints the picker records.
//!
//! # Usage
//!
//! ```bash
//! symbol-index index <ROOT> [--output FILE] [--include PAT]... [--exclude PAT]...
//! symbol-index config
//! ```
//!
//! # Configuration
//!
//! Configuration is loaded in order (later sources override earlier):
//! 1. Built-in defaults
//! 2. Config file (~/.config/symbol-index/config.toml)
//! 3. Environment variables (SYMBOL_INDEX_*)
//! 4. CLI flags

use anyhow::Result;
use clap::Parser;

use symbol_daemon::{init_logging, load_settings, run_index, show_config, Cli, Commands};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    let settings = load_settings(cli.config.as_deref(), cli.log_level.as_deref())?;
    init_logging(&settings.log_level)?;

    match cli.command {
        Commands::Index {
            root,
            output,
            include,
            exclude,
        } => {
            run_index(settings, &root, output.as_deref(), include, exclude).await?;
        }
        Commands::Config => {
            print!("{}", show_config(&settings)?);
        }
    }

    Ok(())
}
