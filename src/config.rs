use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::{
    DEFAULT_BACKUP_DIR, DEFAULT_INPUT_FILE, DEFAULT_LOG_DIR, DEFAULT_OUTLIER_CAP,
    DEFAULT_OUTPUT_FILE,
};
use crate::error::{CleanerError, Result};

/// Settings for a single cleaning run
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CleanerConfig {
    pub input: PathBuf,
    pub output: PathBuf,
    pub backup_dir: PathBuf,
    pub log_dir: PathBuf,
    /// Drop rows whose unit price is exactly zero
    pub remove_zero_price: bool,
    /// Drop rows that repeat an earlier row
    pub deduplicate: bool,
    /// Quantile in (0, 1) used to cap unit prices
    pub outlier_cap: f64,
}

/// The subset of the configuration the cleaning stage needs
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CleanOptions {
    pub remove_zero_price: bool,
    pub deduplicate: bool,
    pub outlier_cap: f64,
}

impl Default for CleanerConfig {
    fn default() -> Self {
        Self {
            input: PathBuf::from(DEFAULT_INPUT_FILE),
            output: PathBuf::from(DEFAULT_OUTPUT_FILE),
            backup_dir: PathBuf::from(DEFAULT_BACKUP_DIR),
            log_dir: PathBuf::from(DEFAULT_LOG_DIR),
            remove_zero_price: true,
            deduplicate: true,
            outlier_cap: DEFAULT_OUTLIER_CAP,
        }
    }
}

impl Default for CleanOptions {
    fn default() -> Self {
        CleanerConfig::default().clean_options()
    }
}

impl CleanerConfig {
    /// Load a configuration file; missing keys fall back to defaults
    pub fn load(config_path: &Path) -> Result<Self> {
        let config_content = fs::read_to_string(config_path).map_err(|e| {
            CleanerError::Config(format!(
                "Failed to read config file '{}': {}",
                config_path.display(),
                e
            ))
        })?;

        let config: CleanerConfig = toml::from_str(&config_content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !(self.outlier_cap > 0.0 && self.outlier_cap < 1.0) {
            return Err(CleanerError::Config(format!(
                "outlier_cap must be strictly between 0 and 1, got {}",
                self.outlier_cap
            )));
        }
        Ok(())
    }

    pub fn clean_options(&self) -> CleanOptions {
        CleanOptions {
            remove_zero_price: self.remove_zero_price,
            deduplicate: self.deduplicate,
            outlier_cap: self.outlier_cap,
        }
    }
}
