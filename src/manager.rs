//! Core temp file manager implementation.

use crate::{
    config::Config,
    content::{TempFileContent, UploadedFile},
    error::{Result, TempFileError},
    filename,
    storage::{DiskRegistry, StorageBackend},
};

use chrono::Utc;
use std::{
    path::{Path, PathBuf},
    sync::Arc,
    time::Duration,
};
use tokio::{io::AsyncReadExt, sync::RwLock};
use tracing::{debug, error, info, warn};

/// Connect/read timeout for remote fetches.
const DOWNLOAD_TIMEOUT: Duration = Duration::from_secs(30);

/// Manages transient files inside one directory of a storage backend.
///
/// The manager sanitizes and uniquifies file names on save, tracks every file
/// it creates in an in-process registry, and sweeps the directory for entries
/// older than the configured age. Save-path failures are surfaced to the
/// caller; cleanup is best-effort and never fails.
///
/// Cloning is cheap and clones share the registry, so one manager can be
/// handed to several tasks.
#[derive(Clone)]
pub struct TempFileManager {
    temp_directory: String,
    max_file_age: chrono::Duration,
    disk: Arc<dyn StorageBackend>,
    registered: Arc<RwLock<Vec<PathBuf>>>,
}

impl TempFileManager {
    /// Construct a manager from configuration, resolving the configured disk
    /// name against the registry.
    ///
    /// # Errors
    /// Returns [`TempFileError::UnknownDisk`] for an unconfigured disk name and
    /// [`TempFileError::StorageUnavailable`] if the temp directory cannot be
    /// prepared.
    pub async fn new(config: &Config, disks: &DiskRegistry) -> Result<Self> {
        let disk = disks.get(&config.disk)?;
        Self::with_backend(&config.directory, config.max_age(), disk).await
    }

    /// Construct a manager on an explicit backend.
    ///
    /// Ensures the temp directory exists; a no-op when it is already present.
    ///
    /// # Errors
    /// Returns [`TempFileError::StorageUnavailable`] if the existence check or
    /// directory creation fails.
    pub async fn with_backend(
        directory: &str,
        max_age: chrono::Duration,
        disk: Arc<dyn StorageBackend>,
    ) -> Result<Self> {
        let present = disk
            .exists(directory)
            .await
            .map_err(|e| TempFileError::StorageUnavailable {
                directory: directory.to_string(),
                reason: e.to_string(),
            })?;
        if !present {
            disk.make_directory(directory)
                .await
                .map_err(|e| TempFileError::StorageUnavailable {
                    directory: directory.to_string(),
                    reason: e.to_string(),
                })?;
        }

        debug!("Temp file manager ready - directory: {directory:?}, max age: {max_age}");

        Ok(Self {
            temp_directory: directory.to_string(),
            max_file_age: max_age,
            disk,
            registered: Arc::new(RwLock::new(Vec::new())),
        })
    }

    /// Directory inside the backend where this manager keeps its files.
    pub fn temp_directory(&self) -> &str {
        &self.temp_directory
    }

    /// Predict the absolute path `filename` would resolve to in the temp
    /// directory, without creating anything.
    ///
    /// An explicit `extension` takes precedence over one embedded in
    /// `filename`.
    pub fn temp_path(&self, filename: &str, extension: Option<&str>) -> PathBuf {
        let (stem, embedded) = filename::split_name(filename);
        let relative = match extension.or(embedded) {
            Some(ext) if !ext.is_empty() => {
                format!("{}/{stem}.{ext}", self.temp_directory)
            }
            _ => format!("{}/{stem}", self.temp_directory),
        };
        self.disk.path(&relative)
    }

    /// Save content to a new temporary file and register it for cleanup.
    ///
    /// When `filename` is omitted a 32-character unguessable name is generated,
    /// carrying `extension` if one is supplied. The name is sanitized and then
    /// uniquified against the temp directory before the content is persisted.
    ///
    /// Returns the absolute path of the created file. On failure nothing is
    /// registered.
    ///
    /// # Errors
    /// Returns an error if uniquification or the backend write fails.
    pub async fn save<C: Into<TempFileContent>>(
        &self,
        content: C,
        filename: Option<&str>,
        extension: Option<&str>,
    ) -> Result<PathBuf> {
        let desired = match filename {
            Some(name) => name.to_string(),
            None => filename::random_name(extension),
        };
        let safe = filename::sanitize(&desired);

        let absolute = match self.persist(content.into(), &safe).await {
            Ok(absolute) => absolute,
            Err(e) => {
                error!("Failed to save temporary file {safe:?}: {e}");
                return Err(e);
            }
        };

        self.register(absolute.clone()).await;
        debug!("Saved temporary file: {}", absolute.display());

        Ok(absolute)
    }

    /// Uniquify `safe` against the temp directory and write the content there.
    async fn persist(&self, content: TempFileContent, safe: &str) -> Result<PathBuf> {
        let unique = filename::uniquify(self.disk.as_ref(), &self.temp_directory, safe).await?;
        let relative = format!("{}/{unique}", self.temp_directory);

        match content {
            TempFileContent::Bytes(bytes) => {
                self.disk.put(&relative, &bytes).await?;
            }
            TempFileContent::Stream(mut reader) => {
                let mut buffer = Vec::new();
                reader.read_to_end(&mut buffer).await?;
                self.disk.put(&relative, &buffer).await?;
            }
            TempFileContent::Upload(file) => {
                self.disk
                    .put_file(&self.temp_directory, &file, &unique)
                    .await?;
            }
        }

        Ok(self.disk.path(&relative))
    }

    /// Save an uploaded file, deriving the name from the handle's declared
    /// original name when `filename` is not supplied.
    ///
    /// # Errors
    /// Propagates [`save`](Self::save) failures.
    pub async fn save_uploaded_file(
        &self,
        file: UploadedFile,
        filename: Option<&str>,
    ) -> Result<PathBuf> {
        let name = match filename {
            Some(name) => name.to_string(),
            None => file.original_name().to_string(),
        };
        self.save(file, Some(&name), None).await
    }

    /// Fetch a resource over HTTP(S) and save it as a temporary file.
    ///
    /// The file name defaults to the last component of the URL path, then to a
    /// random name when the path has none. No file is registered if the fetch
    /// fails.
    ///
    /// # Errors
    /// Returns [`TempFileError::Download`] on transport errors or non-2xx
    /// responses, and propagates [`save`](Self::save) failures.
    pub async fn save_from_url(&self, url: &str, filename: Option<&str>) -> Result<PathBuf> {
        let client = reqwest::Client::builder()
            .timeout(DOWNLOAD_TIMEOUT)
            .user_agent(concat!("temp-file-manager/", env!("CARGO_PKG_VERSION")))
            .build()
            .map_err(|e| TempFileError::Download {
                url: url.to_string(),
                reason: format!("failed to build HTTP client: {e}"),
            })?;

        let response = client
            .get(url)
            .send()
            .await
            .map_err(|e| TempFileError::Download {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        if !response.status().is_success() {
            return Err(TempFileError::Download {
                url: url.to_string(),
                reason: format!("HTTP {}", response.status()),
            });
        }

        let bytes = response
            .bytes()
            .await
            .map_err(|e| TempFileError::Download {
                url: url.to_string(),
                reason: e.to_string(),
            })?;

        let derived = match filename {
            Some(name) => Some(name.to_string()),
            None => url_basename(url),
        };

        self.save(bytes.to_vec(), derived.as_deref(), None).await
    }

    /// Register an absolute path for cleanup. Idempotent; empty paths are
    /// ignored.
    ///
    /// No existence check is performed - a path may be registered before, or
    /// independent of, its creation.
    pub async fn register<P: Into<PathBuf>>(&self, path: P) {
        let path = path.into();
        if path.as_os_str().is_empty() {
            return;
        }
        let mut registry = self.registered.write().await;
        if !registry.contains(&path) {
            registry.push(path);
        }
    }

    /// Snapshot of the currently registered paths.
    pub async fn registered_files(&self) -> Vec<PathBuf> {
        self.registered.read().await.clone()
    }

    /// Best-effort removal of registered files. Never fails.
    ///
    /// With a path, removes exactly that file and drops it from the registry
    /// whether or not the backend delete succeeded, so a permanently failing
    /// delete is not retried forever. Without a path, attempts removal of
    /// every registered file and clears the registry unconditionally.
    pub async fn cleanup(&self, path: Option<&Path>) {
        match path {
            Some(path) => {
                self.remove_file(path).await;
                self.registered.write().await.retain(|p| p != path);
            }
            None => {
                let files = std::mem::take(&mut *self.registered.write().await);
                for file in files {
                    self.remove_file(&file).await;
                }
            }
        }
    }

    /// Sweep the temp directory, deleting entries whose modification time
    /// precedes `now - max_age`. Returns the number of files removed.
    ///
    /// Per-file errors and listing errors are logged and suppressed; a single
    /// failure does not abort the rest of the pass.
    pub async fn cleanup_old_files(&self) -> usize {
        let files = match self.disk.files(&self.temp_directory).await {
            Ok(files) => files,
            Err(e) => {
                warn!(
                    "Failed to list temp directory {:?} for age sweep: {e}",
                    self.temp_directory
                );
                return 0;
            }
        };

        let threshold = Utc::now() - self.max_file_age;
        let mut removed = 0usize;

        for file in files {
            let modified = match self.disk.last_modified(&file).await {
                Ok(modified) => modified,
                Err(e) => {
                    warn!("Failed to read modification time of {file:?}: {e}");
                    continue;
                }
            };
            if modified >= threshold {
                continue;
            }
            match self.disk.delete(&file).await {
                Ok(()) => {
                    debug!("Removed stale temp file: {file}");
                    removed += 1;
                }
                Err(e) => {
                    warn!("Failed to remove stale temp file {file:?}: {e}");
                }
            }
        }

        if removed > 0 {
            info!("Age sweep removed {removed} stale temp files");
        }
        removed
    }

    /// Translate an absolute path back to a disk-relative one and delete it if
    /// it still exists. All errors are logged and swallowed.
    async fn remove_file(&self, path: &Path) {
        let root = self.disk.path("");
        let relative = match path.strip_prefix(&root) {
            Ok(relative) => relative.to_string_lossy().into_owned(),
            Err(_) => {
                warn!(
                    "Registered path {} is outside the disk root {}, skipping",
                    path.display(),
                    root.display()
                );
                return;
            }
        };

        match self.disk.exists(&relative).await {
            Ok(true) => {
                if let Err(e) = self.disk.delete(&relative).await {
                    warn!("Failed to remove temporary file {relative:?}: {e}");
                }
            }
            Ok(false) => {}
            Err(e) => {
                warn!("Failed to check temporary file {relative:?}: {e}");
            }
        }
    }
}

/// Scoped cleanup for a manager's registered files.
///
/// Call [`close`](Self::close) for deterministic teardown; if the guard is
/// dropped instead, a best-effort cleanup task is spawned on the current
/// runtime. Either way cleanup runs on every exit path and never panics the
/// caller's shutdown.
pub struct CleanupGuard {
    manager: Option<TempFileManager>,
}

impl CleanupGuard {
    pub fn new(manager: TempFileManager) -> Self {
        Self {
            manager: Some(manager),
        }
    }

    /// Access the guarded manager.
    pub fn manager(&self) -> &TempFileManager {
        // The option is only vacated by close() and drop, which both consume self.
        self.manager
            .as_ref()
            .unwrap_or_else(|| unreachable!("guard accessed after close"))
    }

    /// Clean up all registered files now.
    pub async fn close(mut self) {
        if let Some(manager) = self.manager.take() {
            manager.cleanup(None).await;
        }
    }
}

impl Drop for CleanupGuard {
    fn drop(&mut self) {
        if let Some(manager) = self.manager.take() {
            if let Ok(handle) = tokio::runtime::Handle::try_current() {
                handle.spawn(async move {
                    manager.cleanup(None).await;
                });
            } else {
                warn!("No runtime available at guard drop; temp files left for the age sweep");
            }
        }
    }
}

fn url_basename(url: &str) -> Option<String> {
    let parsed = url::Url::parse(url).ok()?;
    parsed
        .path_segments()
        .and_then(|segments| segments.rev().find(|segment| !segment.is_empty()))
        .map(|segment| segment.to_string())
}
