//! # confsync-agent
//!
//! Configuration-synchronization agent for constrained, intermittently-
//! connected devices.
//!
//! The agent keeps a small JSON configuration blob current by periodically
//! fetching it from a remote backend, validates and persists it across
//! power cycles, and notifies application code when fresh configuration is
//! available. Unreliable connectivity, bounded storage, and transport
//! failures all degrade to "keep using last-known-good configuration and
//! try again later".
//!
//! ## Architecture
//!
//! ```text
//! Application → SyncEngine → UpdateChannel → CloudBackend → network
//!                   ↓              ↓
//!              confsync-core   ConfigStore → StorageBackend
//!           (pure state machine)
//! ```
//!
//! The engine is single-threaded and cooperative: call [`SyncEngine::tick`]
//! from the host main loop at high frequency. No call blocks; every wait is
//! a deadline checked on a later tick. Channel completions land in a shared
//! inbox and are observed at tick boundaries.
//!
//! ## Example
//!
//! ```ignore
//! use confsync_agent::{
//!     ConfigStore, FileStorage, FunctionChannel, SyncEngine, SystemClock, UpdatePolicy,
//! };
//!
//! let store = ConfigStore::new(Box::new(FileStorage::new("/data/config.bin")), 512);
//! let mut engine = SyncEngine::new(store, SystemClock::new())
//!     .with_channel(Box::new(FunctionChannel::new("setConfig")), backend)
//!     .with_policy(UpdatePolicy::Once)
//!     .with_listener(|| println!("fresh configuration"));
//!
//! engine.setup()?;
//! loop {
//!     engine.tick();
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod channel;
pub mod clock;
pub mod config;
pub mod engine;
pub mod error;
pub mod json;
pub mod store;

pub use channel::{
    ChannelEvent, CloudBackend, FunctionChannel, Inbox, MockCloud, PayloadHandler,
    SubscriptionChannel, UpdateChannel, WebhookChannel,
};
pub use clock::{FakeClock, HostClock, SystemClock};
pub use config::{AgentConfig, ConfigError};
pub use engine::SyncEngine;
pub use error::{AgentError, ChannelError, StoreError};
pub use json::{value_at_index, value_for_key};
pub use store::{ConfigStore, FileRegionStorage, FileStorage, MemoryStorage, StorageBackend};

// The pure layers, re-exported for application code.
pub use confsync_core::{EngineState, FetchOutcome, Timings, UpdatePolicy};
pub use confsync_types::{ConfigRecord, RecordError};
