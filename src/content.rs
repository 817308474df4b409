//! Content sources accepted by [`save`](crate::manager::TempFileManager::save).

use crate::filename;
use std::fmt;
use std::path::{Path, PathBuf};
use tokio::io::AsyncRead;

/// Handle to a file uploaded by a client: where it currently sits on disk and
/// the name the client declared for it.
#[derive(Debug, Clone)]
pub struct UploadedFile {
    source: PathBuf,
    original_name: String,
}

impl UploadedFile {
    pub fn new<P: Into<PathBuf>, S: Into<String>>(source: P, original_name: S) -> Self {
        Self {
            source: source.into(),
            original_name: original_name.into(),
        }
    }

    /// Location of the uploaded payload on the local filesystem.
    pub fn source(&self) -> &Path {
        &self.source
    }

    /// The client-declared file name. Untrusted input.
    pub fn original_name(&self) -> &str {
        &self.original_name
    }

    /// Extension of the client-declared file name, when one exists.
    pub fn extension(&self) -> Option<&str> {
        filename::split_name(&self.original_name).1
    }
}

/// Content to persist as a temporary file.
///
/// Callers hand over whichever shape they have - raw bytes, an upload handle,
/// or a readable byte stream - and the manager dispatches on the variant; no
/// caller-side branching required.
pub enum TempFileContent {
    /// An in-memory byte payload
    Bytes(Vec<u8>),
    /// A client upload, ingested via the backend's file-ingestion path
    Upload(UploadedFile),
    /// A readable byte stream, fully drained before writing
    Stream(Box<dyn AsyncRead + Send + Unpin>),
}

impl TempFileContent {
    /// Wrap a readable byte stream.
    pub fn stream<R: AsyncRead + Send + Unpin + 'static>(reader: R) -> Self {
        Self::Stream(Box::new(reader))
    }
}

impl fmt::Debug for TempFileContent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bytes(bytes) => f.debug_tuple("Bytes").field(&bytes.len()).finish(),
            Self::Upload(file) => f.debug_tuple("Upload").field(file).finish(),
            Self::Stream(_) => f.write_str("Stream(..)"),
        }
    }
}

impl From<Vec<u8>> for TempFileContent {
    fn from(bytes: Vec<u8>) -> Self {
        Self::Bytes(bytes)
    }
}

impl From<&[u8]> for TempFileContent {
    fn from(bytes: &[u8]) -> Self {
        Self::Bytes(bytes.to_vec())
    }
}

impl From<&str> for TempFileContent {
    fn from(text: &str) -> Self {
        Self::Bytes(text.as_bytes().to_vec())
    }
}

impl From<String> for TempFileContent {
    fn from(text: String) -> Self {
        Self::Bytes(text.into_bytes())
    }
}

impl From<UploadedFile> for TempFileContent {
    fn from(file: UploadedFile) -> Self {
        Self::Upload(file)
    }
}
