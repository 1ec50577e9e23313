//! Error types for the comparison tool

use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for comparison operations
pub type Result<T> = std::result::Result<T, EvalError>;

#[derive(Error, Debug)]
pub enum EvalError {
    /// Input file could not be read
    #[error("Failed to read {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Input file is not valid JSON
    #[error("Invalid JSON in {path}: {source}")]
    InvalidJson {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid threshold {0}: must be between 0.0 and 1.0")]
    InvalidThreshold(f64),

    /// Report could not be written
    #[error("Failed to write report: {0}")]
    Report(String),
}
