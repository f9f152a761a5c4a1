//! Error types for the symbol index.

use thiserror::Error;

/// Errors raised while building or loading shared types.
#[derive(Debug, Error)]
pub enum TypesError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}

impl From<config::ConfigError> for TypesError {
    fn from(err: config::ConfigError) -> Self {
        TypesError::Config(err.to_string())
    }
}
