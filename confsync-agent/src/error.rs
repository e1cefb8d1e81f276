//! Error types for confsync-agent.

use confsync_types::RecordError;

/// Main error type for agent operations.
#[derive(Debug, thiserror::Error)]
pub enum AgentError {
    /// Store error.
    #[error("store error: {0}")]
    Store(#[from] StoreError),

    /// Channel error.
    #[error("channel error: {0}")]
    Channel(#[from] ChannelError),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(#[from] crate::config::ConfigError),
}

/// Configuration store errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The payload does not fit the record capacity. The prior payload is
    /// retained untouched.
    #[error(transparent)]
    Record(#[from] RecordError),

    /// The backing medium could not be read.
    #[error("failed to load record: {0}")]
    Load(#[source] std::io::Error),

    /// The durability write failed. The in-memory view has already been
    /// updated and parsed; only persistence is affected, so the update may
    /// be lost at the next restart.
    #[error("failed to persist record: {0}")]
    Persist(#[source] std::io::Error),
}

/// Update channel errors.
#[derive(Debug, thiserror::Error)]
pub enum ChannelError {
    /// Remote-function registration failed.
    #[error("function registration failed: {0}")]
    Register(String),

    /// Topic subscription failed.
    #[error("subscribe failed: {0}")]
    Subscribe(String),

    /// Publishing the fetch request failed.
    #[error("publish failed: {0}")]
    Publish(String),
}
