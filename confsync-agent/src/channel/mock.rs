//! Mock cloud backend for testing.
//!
//! Records registrations, subscriptions, and publishes; lets tests invoke
//! registered functions and deliver topic messages as the backend would.

use super::{CloudBackend, PayloadHandler};
use crate::error::ChannelError;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Mock cloud backend.
///
/// Clones share state, so a test keeps one handle for verification while
/// the engine owns another.
#[derive(Clone, Default)]
pub struct MockCloud {
    inner: Arc<Mutex<MockCloudInner>>,
}

#[derive(Default)]
struct MockCloudInner {
    device_id: Option<String>,
    functions: HashMap<String, PayloadHandler>,
    subscriptions: HashMap<String, PayloadHandler>,
    published: Vec<(String, String)>,
    fail_next_publish: Option<String>,
}

impl MockCloud {
    /// Create a new mock backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the device identity (default: `mock-device`).
    pub fn with_device_id(self, device_id: impl Into<String>) -> Self {
        self.inner.lock().unwrap().device_id = Some(device_id.into());
        self
    }

    /// Invoke a registered function as the backend would.
    ///
    /// Returns false if no function with that name is registered.
    pub fn invoke_function(&self, name: &str, arg: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.functions.get_mut(name) {
            Some(handler) => {
                handler(arg);
                true
            }
            None => false,
        }
    }

    /// Deliver a message on a subscribed topic.
    ///
    /// Returns false if nothing is subscribed to the topic.
    pub fn deliver(&self, topic: &str, payload: &str) -> bool {
        let mut inner = self.inner.lock().unwrap();
        match inner.subscriptions.get_mut(topic) {
            Some(handler) => {
                handler(payload);
                true
            }
            None => false,
        }
    }

    /// Names of all registered functions.
    pub fn registered_functions(&self) -> Vec<String> {
        let mut names: Vec<_> = self
            .inner
            .lock()
            .unwrap()
            .functions
            .keys()
            .cloned()
            .collect();
        names.sort();
        names
    }

    /// All subscribed topics.
    pub fn subscribed_topics(&self) -> Vec<String> {
        let mut topics: Vec<_> = self
            .inner
            .lock()
            .unwrap()
            .subscriptions
            .keys()
            .cloned()
            .collect();
        topics.sort();
        topics
    }

    /// All published (topic, payload) pairs, in order.
    pub fn published(&self) -> Vec<(String, String)> {
        self.inner.lock().unwrap().published.clone()
    }

    /// Cause the next publish() to fail with the given error.
    pub fn fail_next_publish(&self, error: &str) {
        self.inner.lock().unwrap().fail_next_publish = Some(error.to_string());
    }
}

impl CloudBackend for MockCloud {
    fn device_id(&self) -> String {
        self.inner
            .lock()
            .unwrap()
            .device_id
            .clone()
            .unwrap_or_else(|| "mock-device".to_string())
    }

    fn register(&mut self, name: &str, handler: PayloadHandler) -> Result<(), ChannelError> {
        self.inner
            .lock()
            .unwrap()
            .functions
            .insert(name.to_string(), handler);
        Ok(())
    }

    fn subscribe(&mut self, topic: &str, handler: PayloadHandler) -> Result<(), ChannelError> {
        self.inner
            .lock()
            .unwrap()
            .subscriptions
            .insert(topic.to_string(), handler);
        Ok(())
    }

    fn publish(&mut self, topic: &str, payload: &str) -> Result<(), ChannelError> {
        let mut inner = self.inner.lock().unwrap();
        if let Some(error) = inner.fail_next_publish.take() {
            return Err(ChannelError::Publish(error));
        }
        inner.published.push((topic.to_string(), payload.to_string()));
        Ok(())
    }
}
