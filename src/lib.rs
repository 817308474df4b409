//! # Temp File Manager
//!
//! A file-lifecycle manager for transient files: stores uploaded or downloaded
//! content under a dedicated temp directory, tracks the files it created so
//! they can be cleaned up deterministically, and sweeps the directory for
//! stale files left behind by crashed or aborted processes.
//!
//! The core is storage-agnostic: the manager talks to a [`StorageBackend`]
//! trait object, with [`LocalDisk`] as the bundled filesystem implementation
//! and [`DiskRegistry`] mapping configured disk names to backend instances.
//!
//! ## Features
//!
//! - **Filename sanitization**: user-supplied names reduced to a safe
//!   `[A-Za-z0-9._-]` basename, never empty
//! - **Uniquification**: colliding names suffixed `_1`, `_2`, ... until free
//! - **Ownership tracking**: every saved file registered for cleanup
//! - **Age sweep**: files older than the configured maximum removed in one pass
//! - **Polymorphic content**: raw bytes, upload handles and byte streams via
//!   [`TempFileContent`]
//! - **Remote ingestion**: `save_from_url` fetches over HTTP(S) with a timeout
//! - **Best-effort cleanup**: cleanup paths log and swallow errors, never
//!   failing a caller's shutdown
//!
//! ## Basic Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use temp_file_manager::{LocalDisk, TempFileManager};
//!
//! # async fn example() -> temp_file_manager::Result<()> {
//! let disk = Arc::new(LocalDisk::new("./storage"));
//! let manager =
//!     TempFileManager::with_backend("temp", chrono::Duration::hours(10), disk).await?;
//!
//! // Save some bytes under a sanitized, collision-free name
//! let path = manager.save("report body", Some("Q3 report.pdf"), None).await?;
//!
//! // Remove it again, dropping it from the registry
//! manager.cleanup(Some(&path)).await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Scoped Cleanup
//!
//! ```no_run
//! use temp_file_manager::{CleanupGuard, Config, DiskRegistry, TempFileManager};
//!
//! # async fn example() -> temp_file_manager::Result<()> {
//! let config = Config::default();
//! let disks = DiskRegistry::from_config(&config);
//! let manager = TempFileManager::new(&config, &disks).await?;
//!
//! let guard = CleanupGuard::new(manager);
//! guard.manager().save("scratch data", None, Some("tmp")).await?;
//! // Every file saved through the guard is removed here, on every exit path.
//! guard.close().await;
//! # Ok(())
//! # }
//! ```
//!
//! ## Known Limitation
//!
//! Uniquification is a check-then-use sequence: two writers racing on the same
//! desired name in the same directory can observe the same free slot. The temp
//! area assumes a single process per manager instance; concurrent processes
//! sharing a directory will not corrupt each other's files, but may briefly
//! contend on a name.

pub mod config;
pub mod content;
pub mod error;
pub mod filename;
pub mod manager;
pub mod storage;

pub use config::{Config, DiskConfig};
pub use content::{TempFileContent, UploadedFile};
pub use error::{Result, TempFileError};
pub use manager::{CleanupGuard, TempFileManager};
pub use storage::{DiskRegistry, LocalDisk, StorageBackend};
