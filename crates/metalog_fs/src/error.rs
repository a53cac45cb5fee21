//! Error types for filesystem operations.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type for filesystem operations.
pub type FsResult<T> = Result<T, FsError>;

/// Errors that can occur during filesystem operations.
#[derive(Debug, Error)]
pub enum FsError {
    /// An I/O error occurred.
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// A path that was expected to exist does not.
    #[error("path not found: {path}")]
    NotFound {
        /// The missing path.
        path: PathBuf,
    },

    /// An append to a file failed.
    #[error("append of {len} bytes to {path} failed: {source}")]
    AppendFailed {
        /// The file being appended to.
        path: PathBuf,
        /// Number of bytes in the failed append.
        len: usize,
        /// Underlying I/O error.
        source: io::Error,
    },
}

impl FsError {
    /// Creates a not-found error.
    pub fn not_found(path: impl Into<PathBuf>) -> Self {
        Self::NotFound { path: path.into() }
    }
}
