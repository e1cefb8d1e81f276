//! Host connectivity and clock primitives.
//!
//! The engine asks the host two questions ("are we online?", "is the
//! clock synchronized?") and reads two times (wall clock for the record
//! timestamp, monotonic milliseconds for deadlines). Everything else
//! about the host runtime stays outside this crate.

use std::sync::{Arc, Mutex};
use std::time::{Duration, Instant, SystemTime, UNIX_EPOCH};

/// Connectivity and clock source.
pub trait HostClock {
    /// True when the backend is reachable.
    fn is_connected(&self) -> bool;

    /// True when the wall clock has been synchronized.
    fn is_clock_valid(&self) -> bool;

    /// Wall-clock time in backend-epoch seconds.
    fn now_secs(&self) -> i64;

    /// Monotonic milliseconds since some fixed origin.
    fn monotonic_ms(&self) -> u64;
}

/// Host clock backed by the system clock.
///
/// Reports always-connected and always-valid: on hosts with a network
/// stack and NTP both are established before the process runs.
#[derive(Debug, Clone)]
pub struct SystemClock {
    started: Instant,
}

impl SystemClock {
    /// Create a clock with its monotonic origin at construction time.
    pub fn new() -> Self {
        Self {
            started: Instant::now(),
        }
    }
}

impl Default for SystemClock {
    fn default() -> Self {
        Self::new()
    }
}

impl HostClock for SystemClock {
    fn is_connected(&self) -> bool {
        true
    }

    fn is_clock_valid(&self) -> bool {
        true
    }

    fn now_secs(&self) -> i64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0)
    }

    fn monotonic_ms(&self) -> u64 {
        self.started.elapsed().as_millis() as u64
    }
}

/// Scriptable clock for tests.
///
/// Clones share state, so a test keeps one handle to advance time while
/// the engine holds another.
#[derive(Debug, Clone)]
pub struct FakeClock {
    inner: Arc<Mutex<FakeClockInner>>,
}

#[derive(Debug)]
struct FakeClockInner {
    connected: bool,
    clock_valid: bool,
    // Wall clock in milliseconds so sub-second advances accumulate
    // instead of truncating away.
    wall_ms: i64,
    monotonic_ms: u64,
}

impl FakeClock {
    /// Create a connected, clock-valid fake at the given wall time.
    pub fn new(now_secs: i64) -> Self {
        Self {
            inner: Arc::new(Mutex::new(FakeClockInner {
                connected: true,
                clock_valid: true,
                wall_ms: now_secs * 1000,
                monotonic_ms: 0,
            })),
        }
    }

    /// Set connectivity.
    pub fn set_connected(&self, connected: bool) {
        self.inner.lock().unwrap().connected = connected;
    }

    /// Set clock validity.
    pub fn set_clock_valid(&self, valid: bool) {
        self.inner.lock().unwrap().clock_valid = valid;
    }

    /// Set the wall-clock time.
    pub fn set_now_secs(&self, now_secs: i64) {
        self.inner.lock().unwrap().wall_ms = now_secs * 1000;
    }

    /// Advance both clocks, at millisecond resolution.
    pub fn advance(&self, by: Duration) {
        let mut inner = self.inner.lock().unwrap();
        inner.monotonic_ms += by.as_millis() as u64;
        inner.wall_ms += by.as_millis() as i64;
    }
}

impl HostClock for FakeClock {
    fn is_connected(&self) -> bool {
        self.inner.lock().unwrap().connected
    }

    fn is_clock_valid(&self) -> bool {
        self.inner.lock().unwrap().clock_valid
    }

    fn now_secs(&self) -> i64 {
        self.inner.lock().unwrap().wall_ms.div_euclid(1000)
    }

    fn monotonic_ms(&self) -> u64 {
        self.inner.lock().unwrap().monotonic_ms
    }
}
