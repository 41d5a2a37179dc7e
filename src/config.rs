use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use thiserror::Error;

use crate::utils;

/// Current configuration version
pub const CURRENT_CONFIG_VERSION: u32 = 1;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_storage_path")]
    pub storage_path: String,
    /// `tracing` filter directive used when `RUST_LOG` is unset
    #[serde(default = "default_log_level")]
    pub log_level: String,
    /// chrono format string for due dates in listings
    #[serde(default = "default_date_format")]
    pub date_format: String,
    #[serde(default = "default_config_version")]
    pub config_version: Option<u32>,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            storage_path: default_storage_path(),
            log_level: default_log_level(),
            date_format: default_date_format(),
            config_version: Some(CURRENT_CONFIG_VERSION),
        }
    }
}

// Default value functions
fn default_storage_path() -> String {
    // This is a fallback - actual profile will be determined at load time
    Config::default_storage_path_for_profile(utils::Profile::Prod)
}

fn default_log_level() -> String {
    "warn".to_string()
}

fn default_date_format() -> String {
    "%Y-%m-%d".to_string()
}

fn default_config_version() -> Option<u32> {
    Some(CURRENT_CONFIG_VERSION)
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config directory: {0}")]
    ConfigDirError(String),
    #[error("Failed to read config file: {0}")]
    ReadError(String),
    #[error("Failed to parse TOML: {0}")]
    ParseError(#[from] toml::de::Error),
    #[error("Failed to write config file: {0}")]
    WriteError(String),
}

impl Config {
    /// Load configuration for `profile`, creating the default file if missing
    pub fn load_with_profile(profile: utils::Profile) -> Result<Self, ConfigError> {
        let config_path = Self::get_config_path(profile)?;
        Self::load_from_path(&config_path, profile)
    }

    /// Load configuration from an explicit file, creating it if missing.
    /// A storage path left out of the file defaults to the profile's data dir.
    pub fn load_from_path(config_path: &Path, profile: utils::Profile) -> Result<Self, ConfigError> {
        if config_path.exists() {
            let contents = fs::read_to_string(config_path)
                .map_err(|e| ConfigError::ReadError(e.to_string()))?;
            let mut config: Config = toml::from_str(&contents)?;
            if !contents.contains("storage_path") {
                config.storage_path = Self::default_storage_path_for_profile(profile);
            }
            Ok(config)
        } else {
            let mut config = Config {
                storage_path: Self::default_storage_path_for_profile(profile),
                ..Config::default()
            };
            if let Err(e) = config.save_to_path(config_path) {
                tracing::error!(path = %config_path.display(), error = %e, "failed to save config file");
                return Err(e);
            }
            Ok(config)
        }
    }

    pub fn save_to_path(&mut self, config_path: &Path) -> Result<(), ConfigError> {
        // Ensure config version is set before saving
        self.config_version = Some(CURRENT_CONFIG_VERSION);

        // Create parent directory if it doesn't exist
        if let Some(parent) = config_path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| ConfigError::WriteError(e.to_string()))?;
        }

        let toml_string = toml::to_string_pretty(self)
            .map_err(|e| ConfigError::WriteError(format!("Failed to serialize config: {}", e)))?;

        fs::write(config_path, toml_string)
            .map_err(|e| ConfigError::WriteError(e.to_string()))?;

        Ok(())
    }

    /// Get the path to the config file
    pub fn get_config_path(profile: utils::Profile) -> Result<PathBuf, ConfigError> {
        let config_dir = utils::get_config_dir(profile)
            .ok_or_else(|| ConfigError::ConfigDirError("Could not determine config directory".to_string()))?;
        Ok(config_dir.join("config.toml"))
    }

    /// Get default storage path for a specific profile
    fn default_storage_path_for_profile(profile: utils::Profile) -> String {
        if let Some(data_dir) = utils::get_data_dir(profile) {
            data_dir.join("todo.db").to_string_lossy().to_string()
        } else {
            match profile {
                utils::Profile::Dev => "~/.local/share/todo-dev/todo.db".to_string(),
                utils::Profile::Prod => "~/.local/share/todo/todo.db".to_string(),
            }
        }
    }

    /// Get the expanded storage path (with ~ expansion)
    pub fn get_storage_path(&self) -> PathBuf {
        utils::expand_path(&self.storage_path)
    }
}
