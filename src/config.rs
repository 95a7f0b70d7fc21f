use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_CONFIG_FILE, DEFAULT_DATA_DIR, DEFAULT_EXPORT_FILE_NAME, DEFAULT_LOG_DIR,
    DEFAULT_PRINT_QUEUE_FILE,
};
use crate::error::{InventoryError, Result};

/// Where session state, logs, exports and print requests go.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct Config {
    pub data_dir: PathBuf,
    pub log_dir: PathBuf,
    pub export_file_name: String,
    /// Relative paths resolve against `data_dir`
    pub print_queue_file: PathBuf,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from(DEFAULT_DATA_DIR),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            export_file_name: DEFAULT_EXPORT_FILE_NAME.to_string(),
            print_queue_file: PathBuf::from(DEFAULT_PRINT_QUEUE_FILE),
        }
    }
}

impl Config {
    /// Load from `path`, or from `inventory_stager.toml` when no path is
    /// given. A missing default file yields the defaults; a missing explicit
    /// file is an error. `INVENTORY_DATA_DIR` and `INVENTORY_LOG_DIR`
    /// override the file.
    pub fn load(path: Option<&Path>) -> Result<Self> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => {
                let default_path = Path::new(DEFAULT_CONFIG_FILE);
                if default_path.exists() {
                    Self::from_file(default_path)?
                } else {
                    Self::default()
                }
            }
        };

        if let Ok(dir) = std::env::var("INVENTORY_DATA_DIR") {
            if !dir.trim().is_empty() {
                config.data_dir = PathBuf::from(dir);
            }
        }
        if let Ok(dir) = std::env::var("INVENTORY_LOG_DIR") {
            if !dir.trim().is_empty() {
                config.log_dir = PathBuf::from(dir);
            }
        }
        Ok(config)
    }

    pub fn from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            InventoryError::Config(format!(
                "Failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;
        Self::from_toml(&content)
    }

    pub fn from_toml(content: &str) -> Result<Self> {
        let config: Config = toml::from_str(content)?;
        if config.export_file_name.trim().is_empty() {
            return Err(InventoryError::Config("export_file_name must not be empty".to_string()));
        }
        Ok(config)
    }

    pub fn print_queue_path(&self) -> PathBuf {
        self.data_dir.join(&self.print_queue_file)
    }
}
