//! Error types for the layout module.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while preparing the library directories.
#[derive(Debug, Error)]
pub enum LayoutError {
    /// A library directory could not be created.
    #[error("Failed to create directory: {path}")]
    DirectoryCreationFailed {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// A library path exists but is not a directory.
    #[error("Not a directory: {path}")]
    NotADirectory { path: PathBuf },
}

impl LayoutError {
    /// Creates a directory creation error.
    pub fn create_failed(path: PathBuf, source: std::io::Error) -> Self {
        Self::DirectoryCreationFailed { path, source }
    }
}
