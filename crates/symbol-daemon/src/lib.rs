//! Symbol index CLI library exports.
//!
//! # Modules
//!
//! - `cli`: Command-line argument parsing with clap
//! - `commands`: Command implementations (index, config)

pub mod cli;
pub mod commands;

pub use cli::{Cli, Commands};
pub use commands::{init_logging, load_settings, run_index, show_config};
