//! Update channels - the pluggable transport layer.
//!
//! A channel is how fresh configuration reaches the device. One
//! implementation is active at a time, selected at configuration time:
//!
//! - [`FunctionChannel`] registers a named remote-callable endpoint; the
//!   backend pushes configuration by invoking it. The device cannot
//!   initiate a fetch.
//! - [`SubscriptionChannel`] subscribes to a topic; any message on it is
//!   a completed payload. The device cannot initiate a fetch.
//! - [`WebhookChannel`] combines publish and subscribe: a fetch publishes
//!   a request and the response arrives on a device-scoped topic.
//!
//! Completion reporting is one-directional: handlers push
//! [`ChannelEvent`]s into a shared [`Inbox`] which the engine drains at
//! tick boundaries. The engine never polls a channel for status beyond
//! its own timeout bookkeeping.

mod mock;

pub use mock::MockCloud;

use crate::error::ChannelError;
use confsync_core::Timings;
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};

/// Callback invoked by the host when a payload arrives for a registered
/// function or subscribed topic.
pub type PayloadHandler = Box<dyn FnMut(&str) + Send>;

/// Host transport primitives consumed by the channels.
pub trait CloudBackend {
    /// The device identity used to scope response topics.
    fn device_id(&self) -> String;

    /// Register a named remote-callable function.
    fn register(&mut self, name: &str, handler: PayloadHandler) -> Result<(), ChannelError>;

    /// Subscribe to a topic.
    fn subscribe(&mut self, topic: &str, handler: PayloadHandler) -> Result<(), ChannelError>;

    /// Publish a payload on a topic.
    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), ChannelError>;
}

/// Completion events pushed by channel handlers.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChannelEvent {
    /// A payload arrived, by whatever variant-specific mechanism.
    Payload(String),
    /// The channel detected an explicit failure.
    Failed,
}

/// Shared queue between channel handlers and the engine.
///
/// Handlers may fire at arbitrary points between ticks; their effects are
/// observed only when the engine drains the inbox at the next tick, which
/// keeps the engine's view consistent at tick boundaries.
#[derive(Clone, Default)]
pub struct Inbox {
    inner: Arc<Mutex<VecDeque<ChannelEvent>>>,
}

impl Inbox {
    /// Create an empty inbox.
    pub fn new() -> Self {
        Self::default()
    }

    /// Queue a completed payload.
    pub fn push_payload(&self, payload: impl Into<String>) {
        self.inner
            .lock()
            .unwrap()
            .push_back(ChannelEvent::Payload(payload.into()));
    }

    /// Queue an explicit failure.
    pub fn push_failure(&self) {
        self.inner.lock().unwrap().push_back(ChannelEvent::Failed);
    }

    /// Take the oldest queued event.
    pub fn pop(&self) -> Option<ChannelEvent> {
        self.inner.lock().unwrap().pop_front()
    }
}

/// A pluggable update transport.
pub trait UpdateChannel {
    /// Wire the channel to the host backend. Handlers installed here push
    /// into `inbox`.
    fn setup(&mut self, backend: &mut dyn CloudBackend, inbox: &Inbox) -> Result<(), ChannelError>;

    /// Initiate a fetch. A no-op for channels where the backend initiates.
    fn start_update(&mut self, backend: &mut dyn CloudBackend) -> Result<(), ChannelError>;

    /// The channel's timing knobs.
    fn timings(&self) -> Timings;
}

/// Update via a named remote-callable function.
///
/// A good choice when a server pushes per-device configuration and wants
/// delivery confirmation.
#[derive(Debug, Clone)]
pub struct FunctionChannel {
    name: String,
    timings: Timings,
}

impl FunctionChannel {
    /// Create a channel registering the given function name.
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            timings: Timings::default(),
        }
    }

    /// Override the default timings.
    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }
}

impl UpdateChannel for FunctionChannel {
    fn setup(&mut self, backend: &mut dyn CloudBackend, inbox: &Inbox) -> Result<(), ChannelError> {
        let inbox = inbox.clone();
        backend.register(
            &self.name,
            Box::new(move |payload| inbox.push_payload(payload)),
        )
    }

    fn start_update(&mut self, _backend: &mut dyn CloudBackend) -> Result<(), ChannelError> {
        // The device cannot initiate; it is called.
        Ok(())
    }

    fn timings(&self) -> Timings {
        self.timings
    }
}

/// Update via a topic subscription.
///
/// A good choice for updating a fleet at once when devices are generally
/// online.
#[derive(Debug, Clone)]
pub struct SubscriptionChannel {
    topic: String,
    timings: Timings,
}

impl SubscriptionChannel {
    /// Create a channel subscribed to the given topic.
    pub fn new(topic: impl Into<String>) -> Self {
        Self {
            topic: topic.into(),
            timings: Timings::default(),
        }
    }

    /// Override the default timings.
    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }
}

impl UpdateChannel for SubscriptionChannel {
    fn setup(&mut self, backend: &mut dyn CloudBackend, inbox: &Inbox) -> Result<(), ChannelError> {
        let inbox = inbox.clone();
        backend.subscribe(
            &self.topic,
            Box::new(move |payload| inbox.push_payload(payload)),
        )
    }

    fn start_update(&mut self, _backend: &mut dyn CloudBackend) -> Result<(), ChannelError> {
        Ok(())
    }

    fn timings(&self) -> Timings {
        self.timings
    }
}

/// Update via request/response over publish + subscribe.
///
/// `start_update` publishes a request on the event topic; the response
/// arrives on a device-scoped topic derived from the device identity.
#[derive(Debug, Clone)]
pub struct WebhookChannel {
    event: String,
    timings: Timings,
}

impl WebhookChannel {
    /// Create a channel requesting on the given event name.
    pub fn new(event: impl Into<String>) -> Self {
        Self {
            event: event.into(),
            timings: Timings::default(),
        }
    }

    /// Override the default timings.
    pub fn with_timings(mut self, timings: Timings) -> Self {
        self.timings = timings;
        self
    }

    /// The device-scoped topic the response arrives on.
    pub fn response_topic(&self, device_id: &str) -> String {
        format!("{}/hook-response/{}/", device_id, self.event)
    }
}

impl UpdateChannel for WebhookChannel {
    fn setup(&mut self, backend: &mut dyn CloudBackend, inbox: &Inbox) -> Result<(), ChannelError> {
        let topic = self.response_topic(&backend.device_id());
        let inbox = inbox.clone();
        backend.subscribe(&topic, Box::new(move |payload| inbox.push_payload(payload)))
    }

    fn start_update(&mut self, backend: &mut dyn CloudBackend) -> Result<(), ChannelError> {
        tracing::info!(event = %self.event, "publishing configuration request");
        backend.publish(&self.event, "")
    }

    fn timings(&self) -> Timings {
        self.timings
    }
}
