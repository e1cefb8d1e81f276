//! The persisted configuration record.
//!
//! A record is a fixed-size image: a 24-byte header followed by
//! `payload_capacity` bytes of NUL-terminated configuration text. The
//! header carries magic bytes and the sizes the record was created with,
//! so a decoder can tell a real record from uninitialized storage or from
//! a record written by an older layout.
//!
//! Layout (little-endian):
//!
//! ```text
//! offset  size  field
//!      0     4  magic            RECORD_MAGIC (0x7251dd53)
//!      4     1  header_size      HEADER_SIZE, detects layout drift
//!      5     1  flags            currently always 0
//!      6     2  payload_capacity capacity this record was created with
//!      8     8  last_checked_at  backend-epoch seconds of last fetch
//!     16     4  reserved         always 0
//!     20     4  reserved         always 0
//!     24     N  payload          NUL-terminated text, N = payload_capacity
//! ```

use thiserror::Error;

/// Magic bytes identifying an initialized record.
pub const RECORD_MAGIC: u32 = 0x7251_dd53;

/// Size of the record header in bytes.
pub const HEADER_SIZE: usize = 24;

/// Record-level errors.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum RecordError {
    /// Payload does not fit the record's declared capacity.
    ///
    /// The payload must leave room for its NUL terminator, so the maximum
    /// accepted length is `capacity - 1`.
    #[error("payload too large: {len} bytes (capacity: {capacity})")]
    PayloadTooLarge {
        /// Length of the rejected payload.
        len: usize,
        /// Declared capacity of the record.
        capacity: u16,
    },
}

/// A fixed-capacity configuration record.
///
/// The in-memory form keeps only the variable fields; magic, header size,
/// and the reserved words are materialized on encode and checked on decode.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConfigRecord {
    capacity: u16,
    last_checked_at: i64,
    payload: Vec<u8>,
}

impl ConfigRecord {
    /// Create the canonical empty record for the given payload capacity.
    pub fn new(capacity: u16) -> Self {
        Self {
            capacity,
            last_checked_at: 0,
            payload: Vec::new(),
        }
    }

    /// Decode a record image.
    ///
    /// Never fails: any structural mismatch (short buffer, wrong magic,
    /// wrong header size, capacity that differs from `capacity`) yields the
    /// canonical empty record instead. The prior contents are discarded,
    /// which is the deterministic recovery path for uninitialized storage
    /// and layout version changes.
    pub fn from_bytes(buf: &[u8], capacity: u16) -> Self {
        let total = HEADER_SIZE + capacity as usize;
        if buf.len() < total {
            return Self::new(capacity);
        }

        let magic = u32::from_le_bytes([buf[0], buf[1], buf[2], buf[3]]);
        let header_size = buf[4];
        let declared_capacity = u16::from_le_bytes([buf[6], buf[7]]);

        if magic != RECORD_MAGIC
            || header_size as usize != HEADER_SIZE
            || declared_capacity != capacity
        {
            return Self::new(capacity);
        }

        let last_checked_at = i64::from_le_bytes([
            buf[8], buf[9], buf[10], buf[11], buf[12], buf[13], buf[14], buf[15],
        ]);

        // Payload runs to the first NUL; a full region with no NUL would
        // violate the terminator invariant, so the last byte is ignored.
        let region = &buf[HEADER_SIZE..total];
        let len = region
            .iter()
            .position(|&b| b == 0)
            .unwrap_or(capacity.saturating_sub(1) as usize);

        Self {
            capacity,
            last_checked_at,
            payload: region[..len].to_vec(),
        }
    }

    /// Encode the record into its fixed-size image.
    ///
    /// The payload region is zero-filled past the payload, so the text is
    /// always NUL-terminated and stale bytes never leak into storage.
    pub fn to_bytes(&self) -> Vec<u8> {
        let mut buf = vec![0u8; self.total_len()];
        buf[0..4].copy_from_slice(&RECORD_MAGIC.to_le_bytes());
        buf[4] = HEADER_SIZE as u8;
        // flags at offset 5 stays 0
        buf[6..8].copy_from_slice(&self.capacity.to_le_bytes());
        buf[8..16].copy_from_slice(&self.last_checked_at.to_le_bytes());
        // reserved words at 16..24 stay 0
        buf[HEADER_SIZE..HEADER_SIZE + self.payload.len()].copy_from_slice(&self.payload);
        buf
    }

    /// Replace the payload.
    ///
    /// Rejects payloads that do not leave room for the NUL terminator.
    /// On rejection the prior payload is left untouched.
    pub fn set_payload(&mut self, payload: &[u8]) -> Result<(), RecordError> {
        if payload.len() >= self.capacity as usize {
            return Err(RecordError::PayloadTooLarge {
                len: payload.len(),
                capacity: self.capacity,
            });
        }
        self.payload = payload.to_vec();
        Ok(())
    }

    /// The payload as raw bytes.
    pub fn payload(&self) -> &[u8] {
        &self.payload
    }

    /// The payload as text, if it is valid UTF-8.
    pub fn payload_str(&self) -> Option<&str> {
        std::str::from_utf8(&self.payload).ok()
    }

    /// True if the payload is non-empty.
    pub fn has_payload(&self) -> bool {
        !self.payload.is_empty()
    }

    /// Timestamp (backend-epoch seconds) of the last fetch attempt.
    pub fn last_checked_at(&self) -> i64 {
        self.last_checked_at
    }

    /// Record the time of a fetch attempt.
    pub fn set_last_checked_at(&mut self, at: i64) {
        self.last_checked_at = at;
    }

    /// The payload capacity this record was created with.
    pub fn capacity(&self) -> u16 {
        self.capacity
    }

    /// Total encoded size: header plus payload capacity.
    pub fn total_len(&self) -> usize {
        HEADER_SIZE + self.capacity as usize
    }

    /// Reset to the canonical empty form, keeping the capacity.
    pub fn clear(&mut self) {
        self.last_checked_at = 0;
        self.payload.clear();
    }
}
