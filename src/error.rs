//! Error types for temporary file management.

use std::path::PathBuf;

/// Result type for temporary file operations.
pub type Result<T> = std::result::Result<T, TempFileError>;

/// Errors that can occur while managing temporary files.
///
/// Construction and save-path failures are surfaced to callers; cleanup-path
/// failures are logged and swallowed inside the manager and never reach this
/// type at a call site.
#[derive(Debug, thiserror::Error)]
pub enum TempFileError {
    /// I/O operation failed while reading or writing file content
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// The backend could not be initialized or the temp directory prepared
    #[error("Storage unavailable: {directory:?} - {reason}")]
    StorageUnavailable { directory: String, reason: String },

    /// Path validation failed - potential namespace escape
    #[error("Path validation failed: {path:?} - {reason}")]
    PathValidation { path: PathBuf, reason: String },

    /// Fetching a remote resource failed
    #[error("Download failed: {url} - {reason}")]
    Download { url: String, reason: String },

    /// No backend is configured under the requested disk name
    #[error("Unknown storage disk: {name:?}")]
    UnknownDisk { name: String },

    /// Configuration error
    #[error("Configuration error: {message}")]
    Configuration { message: String },
}
