//! Configuration for the temp file manager.

use crate::error::{Result, TempFileError};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::path::{Path, PathBuf};

/// Manager configuration, loadable from a TOML file.
///
/// All fields have defaults, so an empty file (or no file at all) yields a
/// working configuration: a `temp` directory on a `local` disk rooted at
/// `./storage`, with a ten hour retention window.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Directory inside the disk where temporary files live
    pub directory: String,
    /// Files older than this many hours are eligible for the age sweep
    pub max_age_hours: u64,
    /// Name of the disk the manager writes to
    pub disk: String,
    /// Named disks and their local roots
    pub disks: HashMap<String, DiskConfig>,
}

/// Per-disk settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DiskConfig {
    /// Filesystem root the disk's relative paths resolve against
    pub root: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        let mut disks = HashMap::new();
        disks.insert(
            "local".to_string(),
            DiskConfig {
                root: PathBuf::from("./storage"),
            },
        );

        Self {
            directory: "temp".to_string(),
            max_age_hours: 10,
            disk: "local".to_string(),
            disks,
        }
    }
}

impl Config {
    /// Load configuration from a TOML file.
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let contents =
            std::fs::read_to_string(path).map_err(|e| TempFileError::Configuration {
                message: format!("failed to read {}: {e}", path.display()),
            })?;

        toml::from_str(&contents).map_err(|e| TempFileError::Configuration {
            message: format!("failed to parse {}: {e}", path.display()),
        })
    }

    /// Retention window as a duration.
    pub fn max_age(&self) -> chrono::Duration {
        chrono::Duration::hours(self.max_age_hours as i64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_recognized_options() {
        let config = Config::default();
        assert_eq!(config.directory, "temp");
        assert_eq!(config.max_age_hours, 10);
        assert_eq!(config.disk, "local");
        assert_eq!(
            config.disks.get("local").map(|d| d.root.clone()),
            Some(PathBuf::from("./storage"))
        );
    }

    #[test]
    fn partial_toml_fills_in_defaults() {
        let config: Config = toml::from_str("max_age_hours = 48").unwrap();
        assert_eq!(config.max_age_hours, 48);
        assert_eq!(config.directory, "temp");
        assert_eq!(config.disk, "local");
    }

    #[test]
    fn load_from_missing_file_is_a_configuration_error() {
        let err = Config::load_from_file("/nonexistent/temp-files.toml").unwrap_err();
        assert!(matches!(
            err,
            crate::error::TempFileError::Configuration { .. }
        ));
    }

    #[test]
    fn max_age_converts_hours() {
        let config = Config {
            max_age_hours: 1,
            ..Config::default()
        };
        assert_eq!(config.max_age(), chrono::Duration::hours(1));
    }
}
