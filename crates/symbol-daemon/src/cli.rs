//! CLI argument parsing for the symbol index.
//!
//! CLI flags override all other config sources.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

/// Symbol Index
///
/// Background file and symbol indexer for workspace pickers.
#[derive(Parser, Debug)]
#[command(name = "symbol-index")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Path to config file (overrides default ~/.config/symbol-index/config.toml)
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    /// Set log level (trace, debug, info, warn, error)
    #[arg(short, long, global = true)]
    pub log_level: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

/// Commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Index a directory and print its picker records as JSON
    Index {
        /// Workspace root to index
        root: PathBuf,

        /// Write the records to this file instead of stdout
        #[arg(short, long)]
        output: Option<PathBuf>,

        /// Include glob, repeatable (replaces the configured include list)
        #[arg(long)]
        include: Vec<String>,

        /// Exclude glob, repeatable (added to the configured exclude list)
        #[arg(long)]
        exclude: Vec<String>,
    },

    /// Print the effective configuration as TOML
    Config,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_cli_index_minimal() {
        let cli = Cli::parse_from(["symbol-index", "index", "/ws"]);
        match cli.command {
            Commands::Index {
                root,
                output,
                include,
                exclude,
            } => {
                assert_eq!(root, PathBuf::from("/ws"));
                assert!(output.is_none());
                assert!(include.is_empty());
                assert!(exclude.is_empty());
            }
            _ => panic!("Expected Index command"),
        }
    }

    #[test]
    fn test_cli_index_with_patterns() {
        let cli = Cli::parse_from([
            "symbol-index",
            "index",
            "/ws",
            "--include",
            "src/**/*.ts",
            "--include",
            "lib/**/*.ts",
            "--exclude",
            "**/*.test.ts",
            "-o",
            "out.json",
        ]);
        match cli.command {
            Commands::Index {
                output,
                include,
                exclude,
                ..
            } => {
                assert_eq!(include, vec!["src/**/*.ts", "lib/**/*.ts"]);
                assert_eq!(exclude, vec!["**/*.test.ts"]);
                assert_eq!(output, Some(PathBuf::from("out.json")));
            }
            _ => panic!("Expected Index command"),
        }
    }

    #[test]
    fn test_cli_with_config() {
        let cli = Cli::parse_from(["symbol-index", "--config", "/path/to/config.toml", "config"]);
        assert_eq!(cli.config, Some("/path/to/config.toml".to_string()));
        assert!(matches!(cli.command, Commands::Config));
    }

    #[test]
    fn test_cli_with_log_level() {
        let cli = Cli::parse_from(["symbol-index", "index", "/ws", "--log-level", "debug"]);
        assert_eq!(cli.log_level, Some("debug".to_string()));
    }
}
