//! # confsync-core
//!
//! Pure logic for the confsync configuration agent (no I/O, instant tests).
//!
//! This crate implements the synchronization state machine without any
//! clock, storage, or transport access. Each tick takes a snapshot of the
//! outside world as input and produces a new state plus a list of actions
//! to execute.
//!
//! ## Design Philosophy
//!
//! All modules in this crate are **pure** - they take input and produce
//! output without side effects. This enables:
//! - Instant unit tests (no mocks, no timers)
//! - Deterministic behavior (same input → same output)
//! - Easy reasoning about state transitions
//!
//! The actual I/O (persisting records, starting fetches, firing the
//! notification listener) is performed by `confsync-agent`, which
//! interprets the actions produced here.

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod engine;
pub mod policy;

pub use engine::{Action, EngineState, TickInput, Timings, RECHECK_INTERVAL};
pub use policy::{FetchOutcome, UpdatePolicy};
