//! The synchronizing clock service.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use chrono::{DateTime, Utc};
use rollcall_core::clock::MonotonicClock;
use rollcall_core::time_source::{TimeSource, TimeSourceError};
use rollcall_core::timezone::Timezone;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use crate::config::ClockSyncConfig;
use crate::domain::countdown::TimeRemaining;
use crate::domain::state::{ClockState, Reconciled, TickStatus};
use crate::error::ClockError;

/// Result of one `synchronize` call.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SyncOutcome {
    /// The response became the new anchor.
    Applied {
        /// Issuance number of this sync.
        seq: u64,
    },
    /// The sync failed; the previous estimate is kept.
    Failed {
        /// Issuance number of this sync.
        seq: u64,
        /// Why it failed.
        error: TimeSourceError,
    },
    /// A newer sync settled first; this completion was discarded.
    Stale {
        /// Issuance number of this sync.
        seq: u64,
    },
}

/// Keeps a drift-corrected estimate of the current time.
///
/// Sync failures never propagate: they are recorded in the state and the
/// last good estimate stays in use.
pub struct ClockSync {
    state: Mutex<ClockState>,
    time_source: Arc<dyn TimeSource>,
    clock: Arc<dyn MonotonicClock>,
    sync_timeout: Duration,
    snapshots: watch::Sender<TickStatus>,
}

impl ClockSync {
    /// Creates an unsynchronized clock.
    #[must_use]
    pub fn new(
        time_source: Arc<dyn TimeSource>,
        clock: Arc<dyn MonotonicClock>,
        timezone: Timezone,
        sync_timeout: Duration,
    ) -> Self {
        let state = ClockState::new(timezone);
        let (snapshots, _) = watch::channel(state.snapshot(clock.now_millis()));
        Self {
            state: Mutex::new(state),
            time_source,
            clock,
            sync_timeout,
            snapshots,
        }
    }

    /// Creates an unsynchronized clock from configuration.
    #[must_use]
    pub fn from_config(
        time_source: Arc<dyn TimeSource>,
        clock: Arc<dyn MonotonicClock>,
        config: &ClockSyncConfig,
    ) -> Self {
        Self::new(time_source, clock, config.timezone, config.sync_timeout)
    }

    fn lock(&self) -> MutexGuard<'_, ClockState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Returns a copy of the current state.
    #[must_use]
    pub fn state(&self) -> ClockState {
        self.lock().clone()
    }

    /// Subscribes to the snapshots published by `tick` and applied syncs.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<TickStatus> {
        self.snapshots.subscribe()
    }

    /// Queries the trusted time source and reconciles the answer.
    ///
    /// The issuance number is taken before the request goes out; a
    /// completion older than an already-settled sync is discarded. Timeouts
    /// take the same path as network errors.
    #[instrument(skip(self))]
    pub async fn synchronize(&self) -> SyncOutcome {
        let (seq, timezone) = {
            let mut state = self.lock();
            (state.begin_sync(), state.timezone())
        };
        debug!(seq, %timezone, "sync issued");

        let result = tokio::time::timeout(
            self.sync_timeout,
            self.time_source.current_time(timezone),
        )
        .await
        .unwrap_or(Err(TimeSourceError::Timeout))
        .and_then(|time| ClockState::check_anchor(&time).map(|()| time));
        let local_now = self.clock.now_millis();

        let (outcome, status) = {
            let mut state = self.lock();
            let outcome = match result {
                Ok(time) => {
                    let server_time = time.timestamp;
                    match state.apply_sync(seq, time, local_now) {
                        Reconciled::Applied => {
                            info!(seq, %server_time, "sync applied");
                            SyncOutcome::Applied { seq }
                        }
                        _ => SyncOutcome::Stale { seq },
                    }
                }
                Err(error) => match state.record_failure(seq, error.clone()) {
                    Reconciled::FailureRecorded => {
                        warn!(
                            seq,
                            error = %error,
                            consecutive_failures = state.consecutive_failures(),
                            "sync failed; keeping last estimate"
                        );
                        SyncOutcome::Failed { seq, error }
                    }
                    _ => SyncOutcome::Stale { seq },
                },
            };
            (outcome, state.snapshot(local_now))
        };

        match &outcome {
            SyncOutcome::Stale { seq } => {
                debug!(seq, last_issued = self.lock().last_issued(), "stale sync discarded");
            }
            _ => {
                self.snapshots.send_replace(status);
            }
        }
        outcome
    }

    /// Recomputes the displayed time from the anchor. No I/O.
    ///
    /// Before the first successful sync this is a no-op that reports
    /// [`TickStatus::NotSynchronized`].
    pub fn tick(&self) -> TickStatus {
        let status = self.lock().snapshot(self.clock.now_millis());
        if matches!(status, TickStatus::Synchronized(_)) {
            self.snapshots.send_replace(status.clone());
        }
        status
    }

    /// Estimated current time, or `None` before the first successful sync.
    #[must_use]
    pub fn estimated_time(&self) -> Option<DateTime<Utc>> {
        self.lock().estimated_time(self.clock.now_millis())
    }

    /// Time left until the RFC 3339 timestamp `target`.
    ///
    /// # Errors
    ///
    /// Returns `ClockError::InvalidTarget` if `target` is not RFC 3339.
    pub fn time_remaining_until(&self, target: &str) -> Result<TimeRemaining, ClockError> {
        let target = DateTime::parse_from_rfc3339(target)
            .map_err(|e| ClockError::InvalidTarget {
                value: target.to_owned(),
                reason: e.to_string(),
            })?
            .with_timezone(&Utc);
        Ok(self
            .lock()
            .time_remaining_until(target, self.clock.now_millis()))
    }

    /// Switches the display timezone and resynchronizes immediately.
    pub async fn change_timezone(&self, timezone: Timezone) -> SyncOutcome {
        self.lock().set_timezone(timezone);
        info!(%timezone, "timezone changed");
        self.synchronize().await
    }
}

impl std::fmt::Debug for ClockSync {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ClockSync")
            .field("state", &*self.lock())
            .field("sync_timeout", &self.sync_timeout)
            .finish_non_exhaustive()
    }
}
