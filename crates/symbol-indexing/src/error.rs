//! Error types for the indexing pipeline.

use thiserror::Error;

/// Errors that can occur in the indexing pipeline
#[derive(Error, Debug)]
pub enum IndexingError {
    /// Walking a workspace folder failed
    #[error("Enumeration error: {0}")]
    Enumeration(String),

    /// An include/exclude glob could not be compiled
    #[error("Invalid pattern '{pattern}': {message}")]
    Pattern { pattern: String, message: String },

    /// A blocking helper task panicked or was cancelled
    #[error("Task join error: {0}")]
    Join(#[from] tokio::task::JoinError),
}

impl From<walkdir::Error> for IndexingError {
    fn from(err: walkdir::Error) -> Self {
        IndexingError::Enumeration(err.to_string())
    }
}
