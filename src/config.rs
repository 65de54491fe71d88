use crate::catalog::VersionCatalog;
use crate::history::DEFAULT_HISTORY_CAPACITY;
use crate::url::DEFAULT_SHARE_BASE;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_PASSAGE_COLUMNS: u32 = 2;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },

    #[error("failed to parse {path}: {source}")]
    Parse {
        path: PathBuf,
        source: serde_json::Error,
    },
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case", default)]
pub struct StepConfig {
    pub passage_columns: u32,
    pub history_capacity: usize,
    pub share_base_url: String,
    /// Appends the `debug` flag to every generated search URL.
    pub debug: bool,
    pub store_path: Option<PathBuf>,
    pub catalog_path: Option<PathBuf>,
}

impl Default for StepConfig {
    fn default() -> Self {
        Self {
            passage_columns: DEFAULT_PASSAGE_COLUMNS,
            history_capacity: DEFAULT_HISTORY_CAPACITY,
            share_base_url: DEFAULT_SHARE_BASE.to_string(),
            debug: false,
            store_path: None,
            catalog_path: None,
        }
    }
}

fn read(path: &Path) -> Result<String, ConfigError> {
    fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })
}

impl StepConfig {
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        serde_json::from_str(&read(path)?).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// The configured version catalog, or the built-in one when none is set.
    pub fn load_catalog(&self) -> Result<VersionCatalog, ConfigError> {
        let Some(path) = &self.catalog_path else {
            return Ok(VersionCatalog::builtin().clone());
        };
        VersionCatalog::from_json(&read(path)?).map_err(|source| ConfigError::Parse {
            path: path.clone(),
            source,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    #[test]
    fn partial_file_keeps_defaults() {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        write!(file, r#"{{"passage_columns": 3, "debug": true}}"#).unwrap();

        let config = StepConfig::from_file(file.path()).unwrap();
        assert_eq!(config.passage_columns, 3);
        assert!(config.debug);
        assert_eq!(config.history_capacity, DEFAULT_HISTORY_CAPACITY);
        assert_eq!(config.share_base_url, DEFAULT_SHARE_BASE);
    }

    #[test]
    fn missing_catalog_file_is_reported() {
        let config = StepConfig {
            catalog_path: Some(PathBuf::from("/nonexistent/versions.json")),
            ..StepConfig::default()
        };
        assert!(matches!(config.load_catalog(), Err(ConfigError::Read { .. })));
        assert!(!StepConfig::default().load_catalog().unwrap().is_empty());
    }
}
