//! The synchronization engine driver.
//!
//! [`SyncEngine`] wires the pure state machine from `confsync-core` to the
//! real world: it owns the store, the update channel, and the host clock,
//! drains the channel inbox, and interprets the actions the machine
//! produces.
//!
//! The engine is constructed once, configured with `with_*` methods, set
//! up, and then ticked from the host main loop until process exit. There
//! is no shutdown; a device runs until it loses power.

use crate::channel::{ChannelEvent, CloudBackend, Inbox, UpdateChannel};
use crate::clock::HostClock;
use crate::error::{AgentError, StoreError};
use crate::store::ConfigStore;
use confsync_core::{Action, EngineState, FetchOutcome, TickInput, Timings, UpdatePolicy};
use serde_json::Value;

/// The configuration-synchronization engine.
///
/// Single-threaded and cooperative: every wait is a deadline checked on a
/// later [`SyncEngine::tick`], so a tick always returns promptly.
pub struct SyncEngine<C: HostClock> {
    store: ConfigStore,
    clock: C,
    channel: Option<Box<dyn UpdateChannel>>,
    backend: Option<Box<dyn CloudBackend>>,
    policy: UpdatePolicy,
    timings: Timings,
    listener: Option<Box<dyn FnMut()>>,
    inbox: Inbox,
    state: Option<EngineState>,
    outcome: FetchOutcome,
}

impl<C: HostClock> SyncEngine<C> {
    /// Create an engine over a store and host clock.
    ///
    /// Without a channel the engine only serves locally stored
    /// configuration; the state machine stays disarmed.
    pub fn new(store: ConfigStore, clock: C) -> Self {
        Self {
            store,
            clock,
            channel: None,
            backend: None,
            policy: UpdatePolicy::default(),
            timings: Timings::default(),
            listener: None,
            inbox: Inbox::new(),
            state: None,
            outcome: FetchOutcome::Idle,
        }
    }

    /// Attach the update channel and the host backend it talks through.
    pub fn with_channel(
        mut self,
        channel: Box<dyn UpdateChannel>,
        backend: Box<dyn CloudBackend>,
    ) -> Self {
        self.timings = channel.timings();
        self.channel = Some(channel);
        self.backend = Some(backend);
        self
    }

    /// Set the update policy (default: fetch once while empty).
    pub fn with_policy(mut self, policy: UpdatePolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Register the notification listener, invoked whenever fresh
    /// configuration becomes available - after the initial load and after
    /// every accepted update, never before.
    ///
    /// A rejected payload (oversized, for instance) does not fire the
    /// listener: the stored view did not change, so there is nothing to
    /// reread. This is intentional; do not "fix" it to fire on every
    /// delivery.
    pub fn with_listener(mut self, listener: impl FnMut() + 'static) -> Self {
        self.listener = Some(Box::new(listener));
        self
    }

    /// Load the store and wire the channel. Call exactly once, after all
    /// `with_*` configuration.
    pub fn setup(&mut self) -> Result<(), AgentError> {
        self.store.setup()?;

        if let (Some(channel), Some(backend)) = (self.channel.as_mut(), self.backend.as_mut()) {
            channel.setup(backend.as_mut(), &self.inbox)?;
            // The state machine only runs with a channel attached; there
            // is nothing for it to drive otherwise.
            self.state = Some(EngineState::new());
        }
        Ok(())
    }

    /// Advance the engine. Call at high frequency from the host main
    /// loop; never blocks.
    pub fn tick(&mut self) {
        self.drain_inbox();

        let Some(state) = self.state else {
            return;
        };

        let input = TickInput {
            record: self.store.record(),
            connected: self.clock.is_connected(),
            clock_valid: self.clock.is_clock_valid(),
            now_secs: self.clock.now_secs(),
            monotonic_ms: self.clock.monotonic_ms(),
            outcome: self.outcome,
        };
        let (next, actions) = state.tick(self.policy, &self.timings, &input);

        if next != state {
            tracing::debug!(from = ?state, to = ?next, "engine transition");
        }
        self.state = Some(next);

        for action in actions {
            self.apply(action);
        }
    }

    fn drain_inbox(&mut self) {
        while let Some(event) = self.inbox.pop() {
            match event {
                ChannelEvent::Payload(payload) => {
                    // Errors are absorbed: a rejected payload keeps the
                    // last-known-good configuration.
                    let _ = self.update_data(&payload);
                }
                ChannelEvent::Failed => self.update_data_failed(),
            }
        }
    }

    fn apply(&mut self, action: Action) {
        match action {
            Action::NotifyData => self.notify(),
            Action::SetLastChecked { at } => self.store.set_last_checked_at(at),
            Action::BeginFetch => {
                tracing::info!("starting configuration fetch");
                self.outcome = FetchOutcome::InProgress;
                if let (Some(channel), Some(backend)) =
                    (self.channel.as_mut(), self.backend.as_mut())
                {
                    if let Err(e) = channel.start_update(backend.as_mut()) {
                        tracing::warn!("fetch request failed: {e}");
                        self.outcome = FetchOutcome::Failure;
                    }
                }
            }
            Action::MarkFetchTimedOut => {
                tracing::warn!("configuration fetch timed out");
                self.outcome = FetchOutcome::TimedOut;
            }
        }
    }

    /// Apply a configuration payload.
    ///
    /// Normally called by draining the channel inbox, but host code may
    /// call it directly (an unsolicited push); the listener fires
    /// regardless of engine state, and an in-flight fetch is resolved by
    /// the updated outcome flag.
    pub fn update_data(&mut self, payload: &str) -> Result<(), StoreError> {
        tracing::info!(len = payload.len(), "configuration update received");
        self.outcome = FetchOutcome::Success;

        let result = self.store.update_data(payload);
        match &result {
            Ok(()) => self.notify(),
            Err(StoreError::Persist(e)) => {
                // In-memory view already updated and parsed; only the
                // durability write failed.
                tracing::warn!("update applied but not persisted: {e}");
                self.notify();
            }
            Err(e) => tracing::warn!("configuration update rejected: {e}"),
        }
        result
    }

    /// Report that the in-flight fetch failed. The store is untouched.
    pub fn update_data_failed(&mut self) {
        tracing::info!("configuration update failed");
        self.outcome = FetchOutcome::Failure;
    }

    fn notify(&mut self) {
        if let Some(listener) = self.listener.as_mut() {
            listener();
        }
    }

    /// True iff the store holds a non-empty payload.
    pub fn has_data(&self) -> bool {
        self.store.has_data()
    }

    /// The top-level parsed JSON value.
    pub fn json(&self) -> Option<&Value> {
        self.store.json()
    }

    /// Look up a key in the top-level object.
    pub fn value(&self, key: &str) -> Option<&Value> {
        self.store.value(key)
    }

    /// Integer value for a top-level key.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.store.get_i64(key)
    }

    /// Boolean value for a top-level key.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.store.get_bool(key)
    }

    /// Float value for a top-level key.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.store.get_f64(key)
    }

    /// String value for a top-level key.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.store.get_str(key)
    }

    /// The underlying store.
    pub fn store(&self) -> &ConfigStore {
        &self.store
    }

    /// Current state tag, if the state machine is armed.
    pub fn state(&self) -> Option<EngineState> {
        self.state
    }

    /// Result tag of the most recent fetch attempt.
    pub fn outcome(&self) -> FetchOutcome {
        self.outcome
    }
}
