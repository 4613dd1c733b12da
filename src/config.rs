//! Application configuration management.
//!
//! Settings are layered with figment, later layers winning:
//!
//! 1. Built-in defaults
//! 2. A TOML file (`--config`, or `config.toml` in the platform config dir)
//! 3. Environment variables prefixed with `FSINDEX_`
//! 4. Command-line flags, applied by the binary after loading

use directories::ProjectDirs;
use figment::providers::{Env, Format, Serialized, Toml};
use figment::Figment;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use crate::checkpoint::CheckpointStore;
use crate::indexer::{
    IndexerConfig, DEFAULT_CHECKPOINT_INTERVAL, DEFAULT_LARGE_FILE_THRESHOLD,
    DEFAULT_THROUGHPUT_WINDOW, DEFAULT_WORKERS,
};
use crate::scanner::DEFAULT_CHUNK_SIZE;

/// Prefix of environment variables read into the configuration.
pub const ENV_PREFIX: &str = "FSINDEX_";

/// Errors that can occur while loading or saving configuration.
#[derive(thiserror::Error, Debug)]
pub enum ConfigError {
    /// An explicitly requested config file does not exist.
    #[error("Config file not found: {0}")]
    NotFound(PathBuf),

    /// A layer could not be parsed or has the wrong types.
    #[error("Invalid configuration: {0}")]
    Figment(#[from] Box<figment::Error>),

    /// A value is out of range.
    #[error("Invalid value for '{field}': {reason}")]
    Invalid {
        /// Name of the offending setting
        field: &'static str,
        /// What is wrong with it
        reason: &'static str,
    },

    /// The configuration could not be written as TOML.
    #[error("Failed to serialize config: {0}")]
    Serialize(#[from] toml::ser::Error),

    /// Reading or writing the config file failed.
    #[error("Config I/O error for {path}: {source}")]
    Io {
        /// File involved
        path: PathBuf,
        /// The underlying I/O error
        #[source]
        source: std::io::Error,
    },
}

/// Application configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    /// Checkpoint file; the platform data directory when unset.
    pub checkpoint_path: Option<PathBuf>,
    /// Number of indexing worker threads.
    pub workers: usize,
    /// Seconds between periodic checkpoints.
    pub checkpoint_interval_secs: u64,
    /// Number of previous checkpoints to keep as backups.
    pub backups: usize,
    /// Follow symbolic links while indexing.
    pub follow_symlinks: bool,
    /// Read chunk size for hashing, in bytes.
    pub chunk_size: usize,
    /// Completions per throughput sample.
    pub throughput_window: usize,
    /// Files at least this large report per-chunk progress.
    pub large_file_threshold: u64,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            checkpoint_path: None,
            workers: DEFAULT_WORKERS,
            checkpoint_interval_secs: DEFAULT_CHECKPOINT_INTERVAL.as_secs(),
            backups: 2,
            follow_symlinks: false,
            chunk_size: DEFAULT_CHUNK_SIZE,
            throughput_window: DEFAULT_THROUGHPUT_WINDOW,
            large_file_threshold: DEFAULT_LARGE_FILE_THRESHOLD,
        }
    }
}

impl Config {
    /// Load the configuration.
    ///
    /// An explicit `path` must exist. Without one, `config.toml` in the
    /// platform config directory is used if present.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if a layer cannot be parsed or a value is
    /// out of range.
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        match path {
            Some(path) if !path.exists() => Err(ConfigError::NotFound(path.to_path_buf())),
            Some(path) => Self::load_from_path(Some(path)),
            None => {
                let default = Self::config_path().filter(|p| p.exists());
                if let Some(p) = &default {
                    log::debug!("Using config file {}", p.display());
                }
                Self::load_from_path(default.as_deref())
            }
        }
    }

    /// Load defaults, then `path` (if any), then the environment.
    ///
    /// # Errors
    ///
    /// See [`Config::load`].
    pub fn load_from_path(path: Option<&Path>) -> Result<Self, ConfigError> {
        let config: Self = Self::figment(path).extract().map_err(Box::new)?;
        config.validate()?;
        Ok(config)
    }

    /// The layered figment without extraction, for callers adding layers.
    #[must_use]
    pub fn figment(path: Option<&Path>) -> Figment {
        let mut figment = Figment::from(Serialized::defaults(Self::default()));
        if let Some(path) = path {
            figment = figment.merge(Toml::file(path));
        }
        figment.merge(Env::prefixed(ENV_PREFIX))
    }

    /// Reject values the indexer cannot run with.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError::Invalid`] naming the first bad setting.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let zero = |field| ConfigError::Invalid {
            field,
            reason: "must be greater than zero",
        };
        if self.workers == 0 {
            return Err(zero("workers"));
        }
        if self.chunk_size == 0 {
            return Err(zero("chunk_size"));
        }
        if self.throughput_window == 0 {
            return Err(zero("throughput_window"));
        }
        if self.checkpoint_interval_secs == 0 {
            return Err(zero("checkpoint_interval_secs"));
        }
        Ok(())
    }

    /// Write the configuration as TOML.
    ///
    /// # Errors
    ///
    /// Returns [`ConfigError`] if serialization or writing fails.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|source| ConfigError::Io {
                path: parent.to_path_buf(),
                source,
            })?;
        }

        let content = toml::to_string_pretty(self)?;
        fs::write(path, content).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Get the default platform-specific configuration path.
    #[must_use]
    pub fn config_path() -> Option<PathBuf> {
        ProjectDirs::from("com", "fsindex", "fsindex").map(|d| d.config_dir().join("config.toml"))
    }

    /// The checkpoint store described by this configuration.
    ///
    /// # Errors
    ///
    /// Fails if no checkpoint path is set and the platform data directory
    /// cannot be determined.
    pub fn checkpoint_store(&self) -> anyhow::Result<CheckpointStore> {
        let path = match &self.checkpoint_path {
            Some(path) => path.clone(),
            None => CheckpointStore::default_path()?,
        };
        Ok(CheckpointStore::new(path).with_backups(self.backups))
    }

    /// Indexer settings derived from this configuration.
    #[must_use]
    pub fn indexer_config(&self) -> IndexerConfig {
        IndexerConfig::default()
            .with_workers(self.workers)
            .with_checkpoint_interval(Duration::from_secs(self.checkpoint_interval_secs))
            .with_throughput_window(self.throughput_window)
            .with_large_file_threshold(self.large_file_threshold)
            .with_chunk_size(self.chunk_size)
            .with_follow_symlinks(self.follow_symlinks)
    }
}
