//! Retained-memory storage backend.
//!
//! The device analog is battery-backed RAM: contents survive restarts of
//! the application but live in ordinary memory. The buffer is shared
//! through an `Arc`, so a clone sees the same bytes - tests use this to
//! simulate a power cycle by building a fresh store over a clone.

use crate::error::StoreError;
use crate::store::StorageBackend;
use std::sync::{Arc, Mutex};

/// In-memory storage backend. Persistence always succeeds.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    inner: Arc<Mutex<Vec<u8>>>,
}

impl MemoryStorage {
    /// Create an empty backend.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the stored bytes (test helper for corruption scenarios).
    pub fn fill(&self, bytes: Vec<u8>) {
        *self.inner.lock().unwrap() = bytes;
    }

    /// A copy of the stored bytes.
    pub fn snapshot(&self) -> Vec<u8> {
        self.inner.lock().unwrap().clone()
    }
}

impl StorageBackend for MemoryStorage {
    fn load(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        let stored = self.inner.lock().unwrap();
        let n = stored.len().min(buf.len());
        buf[..n].copy_from_slice(&stored[..n]);
        Ok(n)
    }

    fn persist(&mut self, buf: &[u8]) -> Result<(), StoreError> {
        *self.inner.lock().unwrap() = buf.to_vec();
        Ok(())
    }
}
