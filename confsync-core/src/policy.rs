//! Update policy and fetch outcome tags.

use std::time::Duration;

/// How often the engine triggers a configuration fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UpdatePolicy {
    /// Fetch only while the store is empty. Once configuration exists,
    /// never fetch again (until it is wiped or the policy changes).
    Once,
    /// Fetch once per process start, regardless of store state.
    AtRestart,
    /// Fetch whenever the last check is older than the interval.
    Every(Duration),
}

impl UpdatePolicy {
    /// Map the raw sentinel encoding used in configuration files:
    /// `0` = once, negative = at-restart, positive = periodic seconds.
    pub fn from_raw_secs(raw: i64) -> Self {
        match raw {
            0 => Self::Once,
            n if n < 0 => Self::AtRestart,
            n => Self::Every(Duration::from_secs(n as u64)),
        }
    }

    /// The periodic interval in seconds, or `None` for the one-shot
    /// policies.
    pub fn interval_secs(&self) -> Option<i64> {
        match self {
            Self::Every(interval) => Some(interval.as_secs() as i64),
            _ => None,
        }
    }
}

impl Default for UpdatePolicy {
    fn default() -> Self {
        Self::Once
    }
}

/// Result tag of the most recent fetch attempt.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum FetchOutcome {
    /// No fetch has been attempted yet.
    #[default]
    Idle,
    /// A fetch was started and has not completed.
    InProgress,
    /// The last fetch delivered a payload.
    Success,
    /// The channel reported an explicit failure.
    Failure,
    /// No response arrived within the update timeout.
    ///
    /// Retried on the same cadence as [`FetchOutcome::Failure`]; the
    /// distinct tag exists for observability.
    TimedOut,
}
