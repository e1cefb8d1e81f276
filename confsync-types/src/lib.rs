//! # confsync-types
//!
//! Persisted record layout for the confsync configuration agent.
//!
//! This crate defines [`ConfigRecord`], the header+payload structure that
//! survives power cycles in retained memory, an EEPROM-style region, or a
//! file. The layout is byte-exact and backend-agnostic: storage backends
//! move whole record images around without interpreting them.
//!
//! Decoding never fails. A record image that does not pass the structural
//! check (magic, header size, declared capacity) is replaced by the
//! canonical empty record, which recovers deterministically from
//! uninitialized storage, layout version changes, and corruption.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod record;

pub use record::{ConfigRecord, RecordError, HEADER_SIZE, RECORD_MAGIC};
