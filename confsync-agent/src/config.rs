//! Configuration loading for the agent.
//!
//! The agent itself is configured from a TOML file (storage backend,
//! channel, update policy, timeouts), distinct from the remote JSON blob
//! it synchronizes.

use crate::channel::{FunctionChannel, SubscriptionChannel, UpdateChannel, WebhookChannel};
use crate::store::{FileRegionStorage, FileStorage, MemoryStorage, StorageBackend};
use confsync_core::{Timings, UpdatePolicy};
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Root configuration for the agent.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct AgentConfig {
    /// Storage backend configuration.
    #[serde(default)]
    pub storage: StorageConfig,
    /// Update channel configuration. Absent means local-only operation.
    pub channel: Option<ChannelConfig>,
    /// Update cadence and timeouts.
    #[serde(default)]
    pub update: UpdateConfig,
}

/// Storage backend configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    /// Backend kind (default: memory).
    #[serde(default)]
    pub kind: StorageKind,
    /// File path, required for the file and region backends.
    pub path: Option<PathBuf>,
    /// Byte offset of the record window, used by the region backend
    /// (default: 0).
    #[serde(default)]
    pub offset: usize,
    /// Payload capacity in bytes (default: 512).
    #[serde(default = "default_capacity")]
    pub capacity: u16,
}

/// The closed set of storage backends.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum StorageKind {
    /// Retained-memory storage.
    #[default]
    Memory,
    /// Single-file storage.
    File,
    /// Fixed window at an offset inside a file, for media shared with
    /// other subsystems.
    Region,
}

/// Update channel configuration.
#[derive(Debug, Clone, Deserialize)]
pub struct ChannelConfig {
    /// Channel kind.
    pub kind: ChannelKind,
    /// Function name, topic, or webhook event, depending on the kind.
    pub name: String,
}

/// The closed set of update channels.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChannelKind {
    /// Remote-callable function.
    Function,
    /// Topic subscription.
    Subscription,
    /// Request/response webhook.
    Webhook,
}

/// Update cadence and timeouts.
#[derive(Debug, Clone, Deserialize)]
pub struct UpdateConfig {
    /// Fetch cadence: 0 = only while empty, negative = every restart,
    /// positive = periodic seconds.
    #[serde(default)]
    pub interval_secs: i64,
    /// Grace period after connectivity before the first fetch
    /// (default: 2000).
    #[serde(default = "default_wait_after_connected_ms")]
    pub wait_after_connected_ms: u64,
    /// In-flight fetch timeout (default: 60000).
    #[serde(default = "default_update_timeout_ms")]
    pub update_timeout_ms: u64,
}

fn default_capacity() -> u16 {
    512
}

fn default_wait_after_connected_ms() -> u64 {
    2000
}

fn default_update_timeout_ms() -> u64 {
    60_000
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            kind: StorageKind::Memory,
            path: None,
            offset: 0,
            capacity: default_capacity(),
        }
    }
}

impl Default for UpdateConfig {
    fn default() -> Self {
        Self {
            interval_secs: 0,
            wait_after_connected_ms: default_wait_after_connected_ms(),
            update_timeout_ms: default_update_timeout_ms(),
        }
    }
}

impl AgentConfig {
    /// Load configuration from a TOML file.
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or parsed.
    pub fn from_file(path: &std::path::Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })
    }

    /// The update policy expressed by `interval_secs`.
    pub fn policy(&self) -> UpdatePolicy {
        UpdatePolicy::from_raw_secs(self.update.interval_secs)
    }

    /// The channel timings expressed by the update section.
    pub fn timings(&self) -> Timings {
        Timings {
            wait_after_connected: Duration::from_millis(self.update.wait_after_connected_ms),
            update_timeout: Duration::from_millis(self.update.update_timeout_ms),
        }
    }
}

impl StorageConfig {
    /// Build the configured storage backend.
    pub fn build(&self) -> Result<Box<dyn StorageBackend>, ConfigError> {
        match self.kind {
            StorageKind::Memory => Ok(Box::new(MemoryStorage::new())),
            StorageKind::File => {
                let path = self.path.clone().ok_or(ConfigError::MissingPath)?;
                Ok(Box::new(FileStorage::new(path)))
            }
            StorageKind::Region => {
                let path = self.path.clone().ok_or(ConfigError::MissingPath)?;
                Ok(Box::new(FileRegionStorage::new(path, self.offset)))
            }
        }
    }
}

impl ChannelConfig {
    /// Build the configured channel with the given timings.
    pub fn build(&self, timings: Timings) -> Box<dyn UpdateChannel> {
        match self.kind {
            ChannelKind::Function => {
                Box::new(FunctionChannel::new(&self.name).with_timings(timings))
            }
            ChannelKind::Subscription => {
                Box::new(SubscriptionChannel::new(&self.name).with_timings(timings))
            }
            ChannelKind::Webhook => Box::new(WebhookChannel::new(&self.name).with_timings(timings)),
        }
    }
}

/// Configuration error types.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// Failed to read the configuration file.
    #[error("failed to read config file {path}: {source}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying I/O error.
        source: std::io::Error,
    },
    /// Failed to parse the configuration file.
    #[error("failed to parse config file {path}: {source}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// Underlying TOML parse error.
        source: toml::de::Error,
    },
    /// The file and region backends need a path.
    #[error("file-backed storage requires a path")]
    MissingPath,
}
