//! Configuration for atlas-raftstore
//!
//! Centralized configuration with sensible defaults.

use std::path::PathBuf;

use crate::codec::TimeFormat;
use crate::error::{Result, StoreError};
use crate::log_store::DEFAULT_DELETE_BATCH_SIZE;

/// Main configuration for a RaftStore instance
#[derive(Debug, Clone)]
pub struct Config {
    // -------------------------------------------------------------------------
    // Storage Configuration
    // -------------------------------------------------------------------------
    /// Root directory for the database file
    /// Internal structure:
    ///   {data_dir}/
    ///     └── raft.redb        (single ordered keyspace: logs + conf)
    pub data_dir: PathBuf,

    /// Skip fsync when committing write transactions.
    /// Unsafe: committed entries can be lost on power failure.
    pub no_sync: bool,

    /// Page cache size handed to the engine (in bytes)
    pub cache_size: usize,

    // -------------------------------------------------------------------------
    // Log Store Configuration
    // -------------------------------------------------------------------------
    /// Timestamp layout used when encoding log records.
    /// Decoding accepts both layouts regardless of this setting.
    pub time_format: TimeFormat,

    /// Max keys deleted per transaction by `delete_range`
    pub delete_batch_size: usize,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("./raftstore_data"),
            no_sync: false,
            cache_size: 64 * 1024 * 1024, // 64 MB
            time_format: TimeFormat::Legacy,
            delete_batch_size: DEFAULT_DELETE_BATCH_SIZE,
        }
    }
}

impl Config {
    /// Create a new config builder
    pub fn builder() -> ConfigBuilder {
        ConfigBuilder::default()
    }

    /// Reject settings the store cannot run with
    pub fn validate(&self) -> Result<()> {
        if self.delete_batch_size == 0 {
            return Err(StoreError::Config(
                "delete_batch_size must be at least 1".to_string(),
            ));
        }
        if self.cache_size == 0 {
            return Err(StoreError::Config(
                "cache_size must be greater than zero".to_string(),
            ));
        }
        Ok(())
    }
}

/// Builder for Config
#[derive(Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    /// Set the data directory (root for all storage)
    pub fn data_dir(mut self, path: impl Into<PathBuf>) -> Self {
        self.config.data_dir = path.into();
        self
    }

    /// Skip fsync on commit
    pub fn no_sync(mut self, no_sync: bool) -> Self {
        self.config.no_sync = no_sync;
        self
    }

    /// Set the engine cache size (in bytes)
    pub fn cache_size(mut self, size: usize) -> Self {
        self.config.cache_size = size;
        self
    }

    /// Set the timestamp layout used when encoding log records
    pub fn time_format(mut self, format: TimeFormat) -> Self {
        self.config.time_format = format;
        self
    }

    /// Force the current timestamp layout when `true`, the legacy one otherwise
    pub fn use_new_time_format(self, enabled: bool) -> Self {
        let format = if enabled {
            TimeFormat::Current
        } else {
            TimeFormat::Legacy
        };
        self.time_format(format)
    }

    /// Set the number of keys deleted per `delete_range` transaction
    pub fn delete_batch_size(mut self, size: usize) -> Self {
        self.config.delete_batch_size = size;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}
