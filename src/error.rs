// asp_migrator/src/error.rs
// Defines custom error types for the asp_migrator crate.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum MigratorError {
    #[error("Failed to parse {path}: {source}")]
    ConfigParse {
        path:   PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("Invalid configuration in {path}: {reason}")]
    ConfigValidation { path: PathBuf, reason: String },
    #[error("Not authenticated with the streaming platform: {0}")]
    Authentication(String),
    #[error("Failed to create connection '{name}': {detail}")]
    ConnectionCreation { name: String, detail: String },
    #[error("Failed to create topic '{name}': {detail}")]
    TopicCreation { name: String, detail: String },
    #[error("Failed to create stream processor '{name}': {detail}")]
    ProcessorCreation { name: String, detail: String },
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Other error: {0}")]
    Other(String),
}

impl MigratorError {
    /// Authentication failures poison the shared session, so the bulk run
    /// stops instead of failing every remaining item the same way.
    pub fn aborts_run(&self) -> bool {
        matches!(self, MigratorError::Authentication(_))
    }

    pub fn validation(path: impl Into<PathBuf>, reason: impl Into<String>) -> Self {
        MigratorError::ConfigValidation {
            path:   path.into(),
            reason: reason.into(),
        }
    }
}

pub type Result<T> = std::result::Result<T, MigratorError>;
