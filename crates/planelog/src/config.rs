//! Configuration management for planelog.
//!
//! This module provides configuration loading and validation using figment,
//! supporting TOML config files, environment variables, and defaults.

use std::path::PathBuf;

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::snapshot::{LoadOptions, LoadOrder, DEFAULT_FILE_PATTERN};

/// Default configuration file name.
const CONFIG_FILE_NAME: &str = "config.toml";

/// Configuration directory name.
const CONFIG_DIR_NAME: &str = "planelog";

/// Default directory the decoder writes history snapshots to.
const DEFAULT_SNAPSHOT_DIR: &str = "/var/run/dump1090-fa";

/// Default store location, relative to the working directory.
const DEFAULT_DATABASE_PATH: &str = "./data/plane_observations.db";

/// Application configuration.
///
/// Configuration is loaded from (in order of precedence, highest first):
/// 1. Environment variables (prefixed with `PLANELOG_`)
/// 2. TOML config file at `~/.config/planelog/config.toml`
/// 3. Default values
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Snapshot ingest configuration.
    pub ingest: IngestConfig,
    /// Storage configuration.
    pub storage: StorageConfig,
}

/// Snapshot ingest configuration.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestConfig {
    /// Directory holding decoder snapshot files.
    pub snapshot_dir: PathBuf,
    /// Glob matched against snapshot file names.
    pub file_pattern: String,
    /// Abort on the first malformed snapshot instead of skipping it.
    pub strict: bool,
    /// Order in which snapshots are processed.
    pub load_order: LoadOrder,
}

/// Storage-related configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageConfig {
    /// Path to the database file.
    /// Defaults to `./data/plane_observations.db`
    pub database_path: Option<PathBuf>,
}

impl Default for IngestConfig {
    fn default() -> Self {
        Self {
            snapshot_dir: PathBuf::from(DEFAULT_SNAPSHOT_DIR),
            file_pattern: DEFAULT_FILE_PATTERN.to_string(),
            strict: false,
            load_order: LoadOrder::default(),
        }
    }
}

impl Config {
    /// Load configuration from all sources.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load configuration with an optional custom config path.
    ///
    /// # Errors
    ///
    /// Returns an error if configuration loading or parsing fails.
    pub fn load_from(config_path: Option<PathBuf>) -> Result<Self> {
        let config_file = config_path.unwrap_or_else(Self::default_config_path);

        let figment = Figment::new()
            .merge(Serialized::defaults(Config::default()))
            .merge(Toml::file(&config_file))
            .merge(Env::prefixed("PLANELOG_").split("__"));

        let config: Config = figment.extract()?;
        config.validate()?;
        Ok(config)
    }

    /// Get the default configuration file path.
    #[must_use]
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from(".config"))
            .join(CONFIG_DIR_NAME)
            .join(CONFIG_FILE_NAME)
    }

    /// Validate the configuration.
    ///
    /// # Errors
    ///
    /// Returns an error if any configuration values are invalid.
    pub fn validate(&self) -> Result<()> {
        if self.ingest.file_pattern.trim().is_empty() {
            return Err(Error::ConfigValidation {
                message: "file_pattern must not be empty".to_string(),
            });
        }

        if glob::Pattern::new(&self.ingest.file_pattern).is_err() {
            return Err(Error::ConfigValidation {
                message: format!("invalid file_pattern: {}", self.ingest.file_pattern),
            });
        }

        if self.ingest.file_pattern.contains('/') {
            return Err(Error::ConfigValidation {
                message: "file_pattern matches file names and must not contain '/'".to_string(),
            });
        }

        Ok(())
    }

    /// Get the database path, resolving defaults if not set.
    #[must_use]
    pub fn database_path(&self) -> PathBuf {
        self.storage
            .database_path
            .clone()
            .unwrap_or_else(|| PathBuf::from(DEFAULT_DATABASE_PATH))
    }

    /// Snapshot loading options derived from the ingest section.
    #[must_use]
    pub fn load_options(&self) -> LoadOptions {
        LoadOptions {
            pattern: self.ingest.file_pattern.clone(),
            strict: self.ingest.strict,
            order: self.ingest.load_order,
        }
    }
}
