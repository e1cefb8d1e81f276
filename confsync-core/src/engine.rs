//! Synchronization state machine - NO I/O, just state transitions.
//!
//! The machine decides *when* to fetch fresh configuration. It never
//! touches the store, the channel, or a clock directly: every tick takes a
//! [`TickInput`] snapshot and returns the next state plus the actions the
//! driver must execute.
//!
//! There is no terminal state. After the initial connect phase the machine
//! loops through WaitToUpdate / StartUpdate / WaitUpdateComplete for the
//! rest of the process lifetime.

use crate::policy::{FetchOutcome, UpdatePolicy};
use confsync_types::ConfigRecord;
use std::time::Duration;

/// How often WaitToUpdate re-evaluates the periodic policy.
pub const RECHECK_INTERVAL: Duration = Duration::from_secs(10);

/// Per-channel timing knobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Timings {
    /// Grace period after connectivity is established before the first
    /// fetch is trusted. Compensates for registration races on the
    /// backend side.
    pub wait_after_connected: Duration,
    /// How long an in-flight fetch may run before it is treated as
    /// timed out.
    pub update_timeout: Duration,
}

impl Default for Timings {
    fn default() -> Self {
        Self {
            wait_after_connected: Duration::from_millis(2000),
            update_timeout: Duration::from_millis(60_000),
        }
    }
}

/// Snapshot of the outside world for one tick.
#[derive(Debug, Clone, Copy)]
pub struct TickInput<'a> {
    /// The current persisted record (payload presence and last-check time
    /// drive the transitions).
    pub record: &'a ConfigRecord,
    /// True when the host reports backend connectivity.
    pub connected: bool,
    /// True when the host clock has been synchronized.
    pub clock_valid: bool,
    /// Wall-clock time in backend-epoch seconds.
    pub now_secs: i64,
    /// Monotonic milliseconds since process start.
    pub monotonic_ms: u64,
    /// Result tag of the most recent fetch attempt.
    pub outcome: FetchOutcome,
}

/// Actions to be executed by the driver.
///
/// These are instructions, not side effects. The driver interprets them
/// and performs the actual I/O.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Action {
    /// Fire the notification listener: configuration is available.
    NotifyData,
    /// Stamp the record's last-check time.
    SetLastChecked {
        /// Backend-epoch seconds to record.
        at: i64,
    },
    /// Mark the outcome in-progress and ask the channel to start a fetch.
    BeginFetch,
    /// The in-flight fetch exceeded the update timeout.
    MarkFetchTimedOut,
}

/// Engine state tag. One transition at most per tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EngineState {
    /// Setup complete, nothing observed yet.
    Start,
    /// Waiting for connectivity and a valid clock.
    WaitConnected,
    /// Connected; sitting out the post-connect grace period.
    WaitAfterConnected {
        /// Monotonic time at which connectivity was observed.
        since_ms: u64,
    },
    /// Steady state between fetches.
    WaitToUpdate {
        /// Monotonic time of the last policy check.
        since_ms: u64,
    },
    /// A fetch fires on the next tick.
    StartUpdate,
    /// A fetch is in flight.
    WaitUpdateComplete {
        /// Monotonic time the fetch was started.
        since_ms: u64,
    },
}

impl EngineState {
    /// Create a new state machine in the Start state.
    pub fn new() -> Self {
        Self::Start
    }

    /// Advance the machine by one tick.
    ///
    /// Pure function: the caller executes the returned actions. Waits are
    /// expressed as "return the same state until the deadline passes", so
    /// a tick never blocks.
    pub fn tick(
        self,
        policy: UpdatePolicy,
        timings: &Timings,
        input: &TickInput<'_>,
    ) -> (Self, Vec<Action>) {
        match self {
            Self::Start => {
                let actions = if input.record.has_payload() {
                    vec![Action::NotifyData]
                } else {
                    vec![]
                };
                (Self::WaitConnected, actions)
            }

            Self::WaitConnected => {
                if input.connected && input.clock_valid {
                    (
                        Self::WaitAfterConnected {
                            since_ms: input.monotonic_ms,
                        },
                        vec![],
                    )
                } else {
                    (self, vec![])
                }
            }

            Self::WaitAfterConnected { since_ms } => {
                if elapsed(input.monotonic_ms, since_ms) < timings.wait_after_connected {
                    return (self, vec![]);
                }
                if !input.record.has_payload() || policy == UpdatePolicy::AtRestart {
                    (Self::StartUpdate, vec![])
                } else {
                    (
                        Self::WaitToUpdate {
                            since_ms: input.monotonic_ms,
                        },
                        vec![],
                    )
                }
            }

            Self::WaitToUpdate { since_ms } => {
                if elapsed(input.monotonic_ms, since_ms) < RECHECK_INTERVAL {
                    return (self, vec![]);
                }
                let due = match policy.interval_secs() {
                    Some(interval) if input.clock_valid => {
                        input.now_secs - input.record.last_checked_at() > interval
                    }
                    _ => false,
                };
                if due {
                    (Self::StartUpdate, vec![])
                } else {
                    // Not due; arm the next 10-second check.
                    (
                        Self::WaitToUpdate {
                            since_ms: input.monotonic_ms,
                        },
                        vec![],
                    )
                }
            }

            Self::StartUpdate => (
                Self::WaitUpdateComplete {
                    since_ms: input.monotonic_ms,
                },
                vec![
                    Action::SetLastChecked { at: input.now_secs },
                    Action::BeginFetch,
                ],
            ),

            Self::WaitUpdateComplete { since_ms } => match input.outcome {
                FetchOutcome::InProgress => {
                    if elapsed(input.monotonic_ms, since_ms) > timings.update_timeout {
                        (
                            Self::WaitToUpdate {
                                since_ms: input.monotonic_ms,
                            },
                            vec![Action::MarkFetchTimedOut],
                        )
                    } else {
                        (self, vec![])
                    }
                }
                // Success, failure, or timeout already recorded: back to
                // the steady-state loop either way.
                _ => (
                    Self::WaitToUpdate {
                        since_ms: input.monotonic_ms,
                    },
                    vec![],
                ),
            },
        }
    }

    /// True while a fetch is in flight.
    pub fn is_fetching(&self) -> bool {
        matches!(self, Self::WaitUpdateComplete { .. })
    }
}

impl Default for EngineState {
    fn default() -> Self {
        Self::new()
    }
}

fn elapsed(now_ms: u64, since_ms: u64) -> Duration {
    Duration::from_millis(now_ms.saturating_sub(since_ms))
}

#[cfg(test)]
mod tests {
    use super::*;

    const CAP: u16 = 256;

    fn empty_record() -> ConfigRecord {
        ConfigRecord::new(CAP)
    }

    fn filled_record() -> ConfigRecord {
        let mut record = ConfigRecord::new(CAP);
        record.set_payload(br#"{"k":1}"#).unwrap();
        record
    }

    fn input<'a>(record: &'a ConfigRecord, monotonic_ms: u64) -> TickInput<'a> {
        TickInput {
            record,
            connected: true,
            clock_valid: true,
            now_secs: 1_700_000_000,
            monotonic_ms,
            outcome: FetchOutcome::Idle,
        }
    }

    #[test]
    fn start_without_data_does_not_notify() {
        let record = empty_record();
        let (state, actions) =
            EngineState::new().tick(UpdatePolicy::Once, &Timings::default(), &input(&record, 0));

        assert_eq!(state, EngineState::WaitConnected);
        assert!(actions.is_empty());
    }

    #[test]
    fn start_with_data_notifies() {
        let record = filled_record();
        let (state, actions) =
            EngineState::new().tick(UpdatePolicy::Once, &Timings::default(), &input(&record, 0));

        assert_eq!(state, EngineState::WaitConnected);
        assert_eq!(actions, vec![Action::NotifyData]);
    }

    #[test]
    fn wait_connected_holds_until_online_and_clock_valid() {
        let record = empty_record();
        let timings = Timings::default();

        let mut offline = input(&record, 0);
        offline.connected = false;
        let (state, _) = EngineState::WaitConnected.tick(UpdatePolicy::Once, &timings, &offline);
        assert_eq!(state, EngineState::WaitConnected);

        let mut no_clock = input(&record, 0);
        no_clock.clock_valid = false;
        let (state, _) = EngineState::WaitConnected.tick(UpdatePolicy::Once, &timings, &no_clock);
        assert_eq!(state, EngineState::WaitConnected);

        let (state, _) =
            EngineState::WaitConnected.tick(UpdatePolicy::Once, &timings, &input(&record, 500));
        assert_eq!(state, EngineState::WaitAfterConnected { since_ms: 500 });
    }

    #[test]
    fn grace_period_is_respected() {
        let record = empty_record();
        let timings = Timings::default();
        let state = EngineState::WaitAfterConnected { since_ms: 0 };

        let (state, _) = state.tick(UpdatePolicy::Once, &timings, &input(&record, 1999));
        assert_eq!(state, EngineState::WaitAfterConnected { since_ms: 0 });

        let (state, _) = state.tick(UpdatePolicy::Once, &timings, &input(&record, 2000));
        assert_eq!(state, EngineState::StartUpdate);
    }

    #[test]
    fn grace_period_with_data_goes_to_steady_state() {
        let record = filled_record();
        let state = EngineState::WaitAfterConnected { since_ms: 0 };

        let (state, _) = state.tick(
            UpdatePolicy::Once,
            &Timings::default(),
            &input(&record, 2000),
        );
        assert_eq!(state, EngineState::WaitToUpdate { since_ms: 2000 });
    }

    #[test]
    fn at_restart_fetches_even_with_data() {
        let record = filled_record();
        let state = EngineState::WaitAfterConnected { since_ms: 0 };

        let (state, _) = state.tick(
            UpdatePolicy::AtRestart,
            &Timings::default(),
            &input(&record, 2000),
        );
        assert_eq!(state, EngineState::StartUpdate);
    }

    #[test]
    fn start_update_stamps_and_begins_fetch() {
        let record = filled_record();
        let (state, actions) = EngineState::StartUpdate.tick(
            UpdatePolicy::Once,
            &Timings::default(),
            &input(&record, 5000),
        );

        assert_eq!(state, EngineState::WaitUpdateComplete { since_ms: 5000 });
        assert_eq!(
            actions,
            vec![
                Action::SetLastChecked { at: 1_700_000_000 },
                Action::BeginFetch,
            ]
        );
    }

    #[test]
    fn wait_to_update_checks_only_every_ten_seconds() {
        let mut record = filled_record();
        record.set_last_checked_at(1_700_000_000 - 7200);
        let state = EngineState::WaitToUpdate { since_ms: 0 };
        let policy = UpdatePolicy::Every(Duration::from_secs(3600));

        let (state, _) = state.tick(policy, &Timings::default(), &input(&record, 9_999));
        assert_eq!(state, EngineState::WaitToUpdate { since_ms: 0 });

        let (state, _) = state.tick(policy, &Timings::default(), &input(&record, 10_000));
        assert_eq!(state, EngineState::StartUpdate);
    }

    #[test]
    fn wait_to_update_rearms_when_not_due() {
        let mut record = filled_record();
        record.set_last_checked_at(1_700_000_000 - 100);
        let state = EngineState::WaitToUpdate { since_ms: 0 };
        let policy = UpdatePolicy::Every(Duration::from_secs(3600));

        let (state, _) = state.tick(policy, &Timings::default(), &input(&record, 10_000));
        assert_eq!(state, EngineState::WaitToUpdate { since_ms: 10_000 });
    }

    #[test]
    fn stale_check_triggers_periodic_fetch() {
        // lastCheckedAt = now - 3700 with an hourly policy: due.
        let mut record = filled_record();
        record.set_last_checked_at(1_700_000_000 - 3700);
        let state = EngineState::WaitToUpdate { since_ms: 0 };

        let (state, actions) = state.tick(
            UpdatePolicy::Every(Duration::from_secs(3600)),
            &Timings::default(),
            &input(&record, 10_000),
        );
        assert_eq!(state, EngineState::StartUpdate);
        assert!(actions.is_empty());
    }

    #[test]
    fn one_shot_policies_never_leave_steady_state() {
        let mut record = filled_record();
        record.set_last_checked_at(0); // Arbitrarily stale
        let timings = Timings::default();

        for policy in [UpdatePolicy::Once, UpdatePolicy::AtRestart] {
            let state = EngineState::WaitToUpdate { since_ms: 0 };
            let (state, _) = state.tick(policy, &timings, &input(&record, 60_000));
            assert_eq!(state, EngineState::WaitToUpdate { since_ms: 60_000 });
        }
    }

    #[test]
    fn periodic_check_requires_valid_clock() {
        let mut record = filled_record();
        record.set_last_checked_at(0);
        let state = EngineState::WaitToUpdate { since_ms: 0 };

        let mut no_clock = input(&record, 10_000);
        no_clock.clock_valid = false;
        let (state, _) = state.tick(
            UpdatePolicy::Every(Duration::from_secs(60)),
            &Timings::default(),
            &no_clock,
        );
        assert_eq!(state, EngineState::WaitToUpdate { since_ms: 10_000 });
    }

    #[test]
    fn in_flight_fetch_waits_until_timeout() {
        let record = filled_record();
        let timings = Timings::default();
        let state = EngineState::WaitUpdateComplete { since_ms: 0 };

        let mut in_flight = input(&record, 59_999);
        in_flight.outcome = FetchOutcome::InProgress;
        let (state, actions) = state.tick(UpdatePolicy::Once, &timings, &in_flight);
        assert_eq!(state, EngineState::WaitUpdateComplete { since_ms: 0 });
        assert!(actions.is_empty());

        let mut late = input(&record, 60_001);
        late.outcome = FetchOutcome::InProgress;
        let (state, actions) = state.tick(UpdatePolicy::Once, &timings, &late);
        assert_eq!(state, EngineState::WaitToUpdate { since_ms: 60_001 });
        assert_eq!(actions, vec![Action::MarkFetchTimedOut]);
    }

    #[test]
    fn completed_fetch_returns_to_steady_state() {
        let record = filled_record();
        let timings = Timings::default();

        for outcome in [
            FetchOutcome::Success,
            FetchOutcome::Failure,
            FetchOutcome::TimedOut,
        ] {
            let state = EngineState::WaitUpdateComplete { since_ms: 0 };
            let mut done = input(&record, 100);
            done.outcome = outcome;
            let (state, actions) = state.tick(UpdatePolicy::Once, &timings, &done);
            assert_eq!(state, EngineState::WaitToUpdate { since_ms: 100 });
            assert!(actions.is_empty());
        }
    }

    #[test]
    fn empty_store_once_policy_fetches_exactly_once() {
        // Scenario: empty store, policy ONCE, connectivity at t=0. The
        // machine must reach StartUpdate at t ≈ wait_after_connected and
        // then stay in the steady-state loop.
        let record = empty_record();
        let timings = Timings::default();
        let policy = UpdatePolicy::Once;
        let mut state = EngineState::new();
        let mut fetches = 0;

        let mut now_ms: u64 = 0;
        let mut outcome = FetchOutcome::Idle;
        for _ in 0..100_000 {
            let mut tick_input = input(&record, now_ms);
            tick_input.outcome = outcome;
            let (next, actions) = state.tick(policy, &timings, &tick_input);
            for action in &actions {
                match action {
                    Action::BeginFetch => {
                        fetches += 1;
                        assert!(now_ms >= 2000, "fetch before grace period at {now_ms}ms");
                        outcome = FetchOutcome::Failure; // Fetch never answered
                    }
                    Action::NotifyData => panic!("no data to notify about"),
                    _ => {}
                }
            }
            state = next;
            now_ms += 10;
        }

        assert_eq!(fetches, 1);
        assert!(matches!(state, EngineState::WaitToUpdate { .. }));
    }

    #[test]
    fn restart_with_data_once_policy_never_fetches() {
        let record = filled_record();
        let timings = Timings::default();
        let mut state = EngineState::new();
        let mut notified = false;

        let mut now_ms: u64 = 0;
        for _ in 0..10_000 {
            let (next, actions) = state.tick(UpdatePolicy::Once, &timings, &input(&record, now_ms));
            for action in &actions {
                match action {
                    Action::BeginFetch => panic!("ONCE policy must not refetch existing data"),
                    Action::NotifyData => notified = true,
                    _ => {}
                }
            }
            state = next;
            now_ms += 10;
        }

        assert!(notified, "listener must fire for data loaded at startup");
    }

    #[test]
    fn timed_out_fetch_never_notifies() {
        // Scenario: fetch issued, channel never responds. After the update
        // timeout the outcome becomes timed-out and the machine returns to
        // WaitToUpdate without a NotifyData action.
        let record = empty_record();
        let timings = Timings::default();
        let mut state = EngineState::StartUpdate;
        let mut outcome = FetchOutcome::Idle;
        let mut timed_out = false;

        let mut now_ms: u64 = 10_000;
        for _ in 0..10_000 {
            let mut tick_input = input(&record, now_ms);
            tick_input.outcome = outcome;
            let (next, actions) = state.tick(UpdatePolicy::Once, &timings, &tick_input);
            for action in &actions {
                match action {
                    Action::BeginFetch => outcome = FetchOutcome::InProgress,
                    Action::MarkFetchTimedOut => {
                        outcome = FetchOutcome::TimedOut;
                        timed_out = true;
                    }
                    Action::NotifyData => panic!("timeout must not notify"),
                    Action::SetLastChecked { .. } => {}
                }
            }
            state = next;
            now_ms += 100;
        }

        assert!(timed_out);
        assert!(matches!(state, EngineState::WaitToUpdate { .. }));
    }

    #[test]
    fn is_fetching_helper() {
        assert!(!EngineState::Start.is_fetching());
        assert!(!EngineState::WaitToUpdate { since_ms: 0 }.is_fetching());
        assert!(EngineState::WaitUpdateComplete { since_ms: 0 }.is_fetching());
    }
}
