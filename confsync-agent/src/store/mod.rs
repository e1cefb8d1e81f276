//! The persistent configuration store.
//!
//! [`ConfigStore`] owns the record image and its parsed JSON tree, and
//! delegates durability to a [`StorageBackend`]. Structural validation of
//! the stored record is separate from JSON parsing, so the store recovers
//! from any garbage in the backing medium without per-backend special
//! cases.

mod file;
mod memory;
mod region;

pub use file::FileStorage;
pub use memory::MemoryStorage;
pub use region::FileRegionStorage;

use crate::error::StoreError;
use crate::json;
use confsync_types::ConfigRecord;
use serde_json::Value;

/// A byte-level record storage medium.
///
/// Backends move whole record images: retained RAM, an EEPROM-style
/// region, or a file all look the same from here.
pub trait StorageBackend {
    /// Read the stored image into `buf`. Returns the number of bytes read;
    /// 0 means nothing stored yet. A short read is treated as an invalid
    /// record by the caller.
    fn load(&mut self, buf: &mut [u8]) -> std::io::Result<usize>;

    /// Write the full record image durably.
    fn persist(&mut self, buf: &[u8]) -> Result<(), StoreError>;
}

/// Persistent configuration store: record + parsed tree + backend.
pub struct ConfigStore {
    backend: Box<dyn StorageBackend>,
    record: ConfigRecord,
    parsed: Option<Value>,
}

impl ConfigStore {
    /// Create a store over a backend with the given payload capacity.
    ///
    /// Call [`ConfigStore::setup`] exactly once before any other
    /// operation.
    pub fn new(backend: Box<dyn StorageBackend>, capacity: u16) -> Self {
        Self {
            backend,
            record: ConfigRecord::new(capacity),
            parsed: None,
        }
    }

    /// Load, validate, and parse the stored record.
    ///
    /// A record that fails the structural check is silently replaced by
    /// the canonical empty record; only a genuine read error surfaces.
    pub fn setup(&mut self) -> Result<(), StoreError> {
        let capacity = self.record.capacity();
        let mut buf = vec![0u8; self.record.total_len()];
        let n = self.backend.load(&mut buf).map_err(StoreError::Load)?;

        self.record = ConfigRecord::from_bytes(&buf[..n], capacity);
        self.parse();
        tracing::debug!(has_data = self.has_data(), "configuration store loaded");
        Ok(())
    }

    fn parse(&mut self) {
        self.parsed = self
            .record
            .payload_str()
            .and_then(|text| serde_json::from_str(text).ok());
    }

    /// True iff the payload is non-empty.
    pub fn has_data(&self) -> bool {
        self.record.has_payload()
    }

    /// The top-level parsed JSON value, if the payload parsed.
    pub fn json(&self) -> Option<&Value> {
        self.parsed.as_ref()
    }

    /// Look up a key in the top-level object. Absent when the key is
    /// missing or the payload failed to parse; never fails.
    pub fn value(&self, key: &str) -> Option<&Value> {
        json::value_for_key(self.json()?, key)
    }

    /// Integer value for a top-level key.
    pub fn get_i64(&self, key: &str) -> Option<i64> {
        self.value(key)?.as_i64()
    }

    /// Boolean value for a top-level key.
    pub fn get_bool(&self, key: &str) -> Option<bool> {
        self.value(key)?.as_bool()
    }

    /// Float value for a top-level key.
    pub fn get_f64(&self, key: &str) -> Option<f64> {
        self.value(key)?.as_f64()
    }

    /// String value for a top-level key.
    pub fn get_str(&self, key: &str) -> Option<&str> {
        self.value(key)?.as_str()
    }

    /// Replace the payload, reparse, and persist.
    ///
    /// Rejects payloads exceeding the record capacity, leaving the prior
    /// payload untouched. Reparsing happens before the durability write,
    /// so the in-memory view reflects the accepted payload even when
    /// persistence fails.
    pub fn update_data(&mut self, payload: &str) -> Result<(), StoreError> {
        self.record.set_payload(payload.as_bytes())?;
        self.parse();
        self.save()
    }

    /// Write the current record image through the backend.
    pub fn save(&mut self) -> Result<(), StoreError> {
        self.backend.persist(&self.record.to_bytes())
    }

    /// The current record (header fields and payload).
    pub fn record(&self) -> &ConfigRecord {
        &self.record
    }

    /// Timestamp of the last fetch attempt.
    pub fn last_checked_at(&self) -> i64 {
        self.record.last_checked_at()
    }

    /// Stamp the last fetch attempt. In-memory only; written out with the
    /// next save.
    pub fn set_last_checked_at(&mut self, at: i64) {
        self.record.set_last_checked_at(at);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use confsync_types::RecordError;

    const CAP: u16 = 128;

    fn memory_store() -> (ConfigStore, MemoryStorage) {
        let storage = MemoryStorage::new();
        let store = ConfigStore::new(Box::new(storage.clone()), CAP);
        (store, storage)
    }

    #[test]
    fn setup_on_empty_backend_yields_empty_store() {
        let (mut store, _) = memory_store();
        store.setup().unwrap();

        assert!(!store.has_data());
        assert!(store.json().is_none());
    }

    #[test]
    fn setup_on_garbage_yields_empty_store() {
        let (mut store, storage) = memory_store();
        storage.fill(vec![0x5A; 400]);

        store.setup().unwrap();
        assert!(!store.has_data());
    }

    #[test]
    fn update_parses_and_persists() {
        let (mut store, storage) = memory_store();
        store.setup().unwrap();

        store.update_data(r#"{"interval": 30, "label": "pump"}"#).unwrap();

        assert!(store.has_data());
        assert_eq!(store.get_i64("interval"), Some(30));
        assert_eq!(store.get_str("label"), Some("pump"));

        // Power cycle: a fresh store over the same bytes sees the payload.
        let mut reloaded = ConfigStore::new(Box::new(storage), CAP);
        reloaded.setup().unwrap();
        assert_eq!(reloaded.get_i64("interval"), Some(30));
    }

    #[test]
    fn update_is_idempotent() {
        let (mut store, storage) = memory_store();
        store.setup().unwrap();

        store.update_data(r#"{"a":1}"#).unwrap();
        let first = storage.snapshot();
        store.update_data(r#"{"a":1}"#).unwrap();

        assert_eq!(storage.snapshot(), first);
        assert_eq!(store.get_i64("a"), Some(1));
    }

    #[test]
    fn oversized_payload_keeps_prior_config() {
        let (mut store, _) = memory_store();
        store.setup().unwrap();
        store.update_data(r#"{"a":1}"#).unwrap();

        let oversized = "x".repeat(CAP as usize);
        let err = store.update_data(&oversized).unwrap_err();

        assert!(matches!(
            err,
            StoreError::Record(RecordError::PayloadTooLarge { .. })
        ));
        assert_eq!(store.get_i64("a"), Some(1));
    }

    #[test]
    fn boundary_payload_fits() {
        let (mut store, _) = memory_store();
        store.setup().unwrap();

        let payload = "y".repeat(CAP as usize - 1);
        store.update_data(&payload).unwrap();
        assert!(store.has_data());
    }

    #[test]
    fn unparseable_payload_reads_as_absent() {
        let (mut store, _) = memory_store();
        store.setup().unwrap();

        store.update_data("not json at all").unwrap();

        assert!(store.has_data());
        assert!(store.json().is_none());
        assert_eq!(store.value("anything"), None);
    }

    #[test]
    fn typed_getters_coerce_expected_types() {
        let (mut store, _) = memory_store();
        store.setup().unwrap();
        store
            .update_data(r#"{"n": 7, "b": true, "f": 2.5, "s": "hi"}"#)
            .unwrap();

        assert_eq!(store.get_i64("n"), Some(7));
        assert_eq!(store.get_bool("b"), Some(true));
        assert_eq!(store.get_f64("f"), Some(2.5));
        assert_eq!(store.get_str("s"), Some("hi"));
        assert_eq!(store.get_i64("s"), None);
    }

    #[test]
    fn last_checked_survives_save_and_reload() {
        let (mut store, storage) = memory_store();
        store.setup().unwrap();

        store.set_last_checked_at(1_700_000_123);
        store.update_data(r#"{"a":1}"#).unwrap();

        let mut reloaded = ConfigStore::new(Box::new(storage), CAP);
        reloaded.setup().unwrap();
        assert_eq!(reloaded.last_checked_at(), 1_700_000_123);
    }

    #[test]
    fn capacity_change_invalidates_stored_record() {
        let (mut store, storage) = memory_store();
        store.setup().unwrap();
        store.update_data(r#"{"a":1}"#).unwrap();

        let mut resized = ConfigStore::new(Box::new(storage), CAP * 2);
        resized.setup().unwrap();
        assert!(!resized.has_data());
    }
}
