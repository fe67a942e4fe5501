//! Error types for the cleanup module.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CleanupError {
    /// The file to delete does not exist.
    #[error("File not found: {path}")]
    NotFound { path: PathBuf },

    /// The path is a directory, not a file.
    #[error("Not a file: {path}")]
    NotAFile { path: PathBuf },

    /// A configuration update was rejected.
    #[error("Invalid cleanup configuration: {0}")]
    InvalidConfig(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}
