//! Storage backend abstraction and the local filesystem implementation.

use crate::content::UploadedFile;
use crate::error::{Result, TempFileError};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::path::{Component, Path, PathBuf};
use std::sync::Arc;
use tokio::fs;

/// Capability surface the manager requires from a byte store.
///
/// Paths are disk-relative strings (`temp/report.pdf`); [`path`](Self::path)
/// resolves them to absolute locations. All fallible operations surface
/// failures as [`TempFileError`].
#[async_trait]
pub trait StorageBackend: Send + Sync {
    /// Whether an entry exists at the given relative path.
    async fn exists(&self, path: &str) -> Result<bool>;

    /// Create a directory (and any missing parents). Idempotent.
    async fn make_directory(&self, path: &str) -> Result<()>;

    /// Write a byte payload at the given relative path.
    async fn put(&self, path: &str, contents: &[u8]) -> Result<()>;

    /// Ingest an uploaded file into `directory` under `name`.
    async fn put_file(&self, directory: &str, file: &UploadedFile, name: &str) -> Result<()>;

    /// Read the full contents of a file.
    async fn read(&self, path: &str) -> Result<Vec<u8>>;

    /// Delete a file.
    async fn delete(&self, path: &str) -> Result<()>;

    /// List the regular files directly inside `directory`, as disk-relative
    /// paths. A missing directory lists as empty.
    async fn files(&self, directory: &str) -> Result<Vec<String>>;

    /// Last modification time of a file.
    async fn last_modified(&self, path: &str) -> Result<DateTime<Utc>>;

    /// Resolve a relative path to its absolute location on this disk.
    ///
    /// Purely lexical; performs no I/O and no validation.
    fn path(&self, relative: &str) -> PathBuf;
}

/// Local filesystem disk rooted at a base directory.
///
/// Every relative path is validated before use: empty paths, absolute paths,
/// null bytes and `..` components are rejected, so operations cannot escape
/// the disk root.
#[derive(Debug, Clone)]
pub struct LocalDisk {
    root: PathBuf,
}

impl LocalDisk {
    pub fn new<P: Into<PathBuf>>(root: P) -> Self {
        Self { root: root.into() }
    }

    /// Root directory of this disk.
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, relative: &str) -> Result<PathBuf> {
        if relative.is_empty() {
            return Err(TempFileError::PathValidation {
                path: PathBuf::from(relative),
                reason: "path cannot be empty".to_string(),
            });
        }
        if relative.contains('\0') {
            return Err(TempFileError::PathValidation {
                path: PathBuf::from(relative),
                reason: "path contains null bytes".to_string(),
            });
        }

        let candidate = Path::new(relative);
        if candidate.is_absolute() {
            return Err(TempFileError::PathValidation {
                path: candidate.to_path_buf(),
                reason: "absolute paths not allowed - use paths relative to the disk root"
                    .to_string(),
            });
        }
        if candidate
            .components()
            .any(|c| matches!(c, Component::ParentDir))
        {
            return Err(TempFileError::PathValidation {
                path: candidate.to_path_buf(),
                reason: "parent directory components not allowed".to_string(),
            });
        }

        Ok(self.root.join(candidate))
    }
}

#[async_trait]
impl StorageBackend for LocalDisk {
    async fn exists(&self, path: &str) -> Result<bool> {
        let full = self.resolve(path)?;
        Ok(fs::try_exists(&full).await?)
    }

    async fn make_directory(&self, path: &str) -> Result<()> {
        let full = self.resolve(path)?;
        fs::create_dir_all(&full).await?;
        Ok(())
    }

    async fn put(&self, path: &str, contents: &[u8]) -> Result<()> {
        let full = self.resolve(path)?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::write(&full, contents).await?;
        Ok(())
    }

    async fn put_file(&self, directory: &str, file: &UploadedFile, name: &str) -> Result<()> {
        let full = self.resolve(&format!("{directory}/{name}"))?;
        if let Some(parent) = full.parent() {
            fs::create_dir_all(parent).await?;
        }
        fs::copy(file.source(), &full).await?;
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<Vec<u8>> {
        let full = self.resolve(path)?;
        Ok(fs::read(&full).await?)
    }

    async fn delete(&self, path: &str) -> Result<()> {
        let full = self.resolve(path)?;
        fs::remove_file(&full).await?;
        Ok(())
    }

    async fn files(&self, directory: &str) -> Result<Vec<String>> {
        let full = self.resolve(directory)?;
        if !full.is_dir() {
            return Ok(Vec::new());
        }

        let prefix = directory.trim_end_matches('/');
        let mut entries = fs::read_dir(&full).await?;
        let mut files = Vec::new();

        while let Some(entry) = entries.next_entry().await? {
            let file_type = entry.file_type().await?;
            if !file_type.is_file() {
                continue;
            }
            if let Some(name) = entry.file_name().to_str() {
                files.push(format!("{prefix}/{name}"));
            }
        }

        Ok(files)
    }

    async fn last_modified(&self, path: &str) -> Result<DateTime<Utc>> {
        let full = self.resolve(path)?;
        let metadata = fs::metadata(&full).await?;
        let modified = metadata.modified()?;
        Ok(DateTime::from(modified))
    }

    fn path(&self, relative: &str) -> PathBuf {
        self.root.join(relative)
    }
}

/// Named storage backends, looked up by the manager at construction time.
///
/// The original system resolved disks through a process-global facade; here the
/// registry is built explicitly from configuration and passed to whoever needs
/// it.
#[derive(Clone, Default)]
pub struct DiskRegistry {
    disks: HashMap<String, Arc<dyn StorageBackend>>,
}

impl DiskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry of [`LocalDisk`]s from the configured disk table.
    pub fn from_config(config: &crate::config::Config) -> Self {
        let mut registry = Self::new();
        for (name, disk) in &config.disks {
            registry.insert(name, Arc::new(LocalDisk::new(&disk.root)));
        }
        registry
    }

    pub fn insert<S: Into<String>>(&mut self, name: S, backend: Arc<dyn StorageBackend>) {
        self.disks.insert(name.into(), backend);
    }

    /// Look up a backend by name.
    pub fn get(&self, name: &str) -> Result<Arc<dyn StorageBackend>> {
        self.disks
            .get(name)
            .cloned()
            .ok_or_else(|| TempFileError::UnknownDisk {
                name: name.to_string(),
            })
    }
}
