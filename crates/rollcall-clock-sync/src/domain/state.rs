//! Clock state and its reconciliation rules.
//!
//! Every sync is tagged with an issuance sequence number when it starts.
//! Completions are reconciled by that number, never by arrival order, so a
//! slow response cannot roll the estimate back past a newer one.

use std::collections::BTreeMap;

use chrono::{DateTime, TimeDelta, Utc};
use rollcall_core::time_source::{ServerTime, TimeSourceError};
use rollcall_core::timezone::Timezone;

use super::countdown::TimeRemaining;

/// Display pattern for the estimated time.
pub const DISPLAY_FORMAT: &str = "%d/%m/%Y %H:%M:%S";

/// Upper bound on failures remembered since the last anchor.
const MAX_TRACKED_FAILURES: usize = 1024;

/// An anchor must stay representable this many days either side of it.
const INTERPOLATION_HORIZON_DAYS: i64 = 36_500;

/// The pair of readings taken at the last applied sync.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncAnchor {
    /// Issuance number of the sync that produced this anchor.
    pub seq: u64,
    /// Server time returned by the trusted source.
    pub server_time: DateTime<Utc>,
    /// Local monotonic reading when the response resolved.
    pub local_millis: i64,
    /// The source's pre-formatted display string.
    pub server_display: String,
}

/// What the reconciliation did with a completion.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Reconciled {
    /// A success replaced the anchor.
    Applied,
    /// A failure was recorded as the latest sync error.
    FailureRecorded,
    /// A newer sync already settled; the completion was discarded.
    Stale,
}

/// Process-wide clock state. Only `ClockSync` mutates it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockState {
    anchor: Option<SyncAnchor>,
    timezone: Timezone,
    /// Failures issued after the anchor, keyed by issuance number.
    failures: BTreeMap<u64, TimeSourceError>,
    last_issued: u64,
}

impl ClockState {
    /// Creates an unsynchronized state.
    #[must_use]
    pub fn new(timezone: Timezone) -> Self {
        Self {
            anchor: None,
            timezone,
            failures: BTreeMap::new(),
            last_issued: 0,
        }
    }

    /// The last applied anchor, if any.
    #[must_use]
    pub fn anchor(&self) -> Option<&SyncAnchor> {
        self.anchor.as_ref()
    }

    /// Timezone used for display.
    #[must_use]
    pub fn timezone(&self) -> Timezone {
        self.timezone
    }

    /// Changes the display timezone. The anchor is timezone-independent.
    pub fn set_timezone(&mut self, timezone: Timezone) {
        self.timezone = timezone;
    }

    /// The most recently issued failure newer than the anchor.
    #[must_use]
    pub fn last_sync_error(&self) -> Option<&TimeSourceError> {
        self.failures.last_key_value().map(|(_, err)| err)
    }

    /// Number of failed syncs issued after the anchor.
    #[must_use]
    pub fn consecutive_failures(&self) -> u32 {
        u32::try_from(self.failures.len()).unwrap_or(u32::MAX)
    }

    /// Issuance number of the most recently started sync.
    #[must_use]
    pub fn last_issued(&self) -> u64 {
        self.last_issued
    }

    /// Allocates the issuance number for a sync about to start.
    pub fn begin_sync(&mut self) -> u64 {
        self.last_issued += 1;
        self.last_issued
    }

    fn anchor_seq(&self) -> u64 {
        self.anchor.as_ref().map_or(0, |a| a.seq)
    }

    /// Checks that an anchor at `time` can be interpolated without leaving
    /// the representable date range.
    ///
    /// # Errors
    ///
    /// Returns `TimeSourceError::MalformedResponse` for a server time too
    /// close to the ends of the range.
    pub fn check_anchor(time: &ServerTime) -> Result<(), TimeSourceError> {
        let horizon = TimeDelta::days(INTERPOLATION_HORIZON_DAYS);
        let server_time = time.timestamp;
        if server_time.checked_add_signed(horizon).is_some()
            && server_time.checked_sub_signed(horizon).is_some()
        {
            Ok(())
        } else {
            Err(TimeSourceError::MalformedResponse(format!(
                "server time {server_time} is out of range"
            )))
        }
    }

    /// Reconciles a successful sync issued as `seq`. A server time that
    /// fails [`ClockState::check_anchor`] is recorded as a failure instead.
    pub fn apply_sync(&mut self, seq: u64, time: ServerTime, local_millis: i64) -> Reconciled {
        if seq <= self.anchor_seq() {
            return Reconciled::Stale;
        }
        if let Err(error) = Self::check_anchor(&time) {
            return self.record_failure(seq, error);
        }
        self.anchor = Some(SyncAnchor {
            seq,
            server_time: time.timestamp,
            local_millis,
            server_display: time.formatted,
        });
        // Failures issued before this sync are superseded by it.
        self.failures = self.failures.split_off(&(seq + 1));
        Reconciled::Applied
    }

    /// Reconciles a failed sync issued as `seq`. The anchor is kept.
    pub fn record_failure(&mut self, seq: u64, error: TimeSourceError) -> Reconciled {
        if seq <= self.anchor_seq() {
            return Reconciled::Stale;
        }
        self.failures.insert(seq, error);
        while self.failures.len() > MAX_TRACKED_FAILURES {
            self.failures.pop_first();
        }
        Reconciled::FailureRecorded
    }

    /// Estimated current time for the local reading `local_now`. `None`
    /// when unsynchronized or when the result is not representable.
    #[must_use]
    pub fn estimated_time(&self, local_now: i64) -> Option<DateTime<Utc>> {
        let anchor = self.anchor.as_ref()?;
        let elapsed = TimeDelta::try_milliseconds(local_now.saturating_sub(anchor.local_millis))?;
        anchor.server_time.checked_add_signed(elapsed)
    }

    /// Time left until `target` at the local reading `local_now`.
    #[must_use]
    pub fn time_remaining_until(&self, target: DateTime<Utc>, local_now: i64) -> TimeRemaining {
        match self.estimated_time(local_now) {
            Some(now) => TimeRemaining::between(now, target),
            None => TimeRemaining::NotSynchronized,
        }
    }

    /// Snapshot for display at the local reading `local_now`.
    #[must_use]
    pub fn snapshot(&self, local_now: i64) -> TickStatus {
        let (Some(anchor), Some(now)) = (self.anchor.as_ref(), self.estimated_time(local_now))
        else {
            return TickStatus::NotSynchronized {
                timezone: self.timezone,
                last_sync_error: self.last_sync_error().cloned(),
            };
        };
        TickStatus::Synchronized(ClockSnapshot {
            now,
            display: self.timezone.format(now, DISPLAY_FORMAT),
            timezone: self.timezone,
            synced_at: anchor.server_time,
            server_display: anchor.server_display.clone(),
            last_sync_error: self.last_sync_error().cloned(),
            consecutive_failures: self.consecutive_failures(),
        })
    }
}

/// What consumers read on every tick.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TickStatus {
    /// No sync has succeeded yet.
    NotSynchronized {
        /// Timezone that will be used once synchronized.
        timezone: Timezone,
        /// Latest failure, if any sync has been attempted.
        last_sync_error: Option<TimeSourceError>,
    },
    /// A trustworthy estimate is available.
    Synchronized(ClockSnapshot),
}

impl TickStatus {
    /// The estimated time, if synchronized.
    #[must_use]
    pub fn now(&self) -> Option<DateTime<Utc>> {
        match self {
            Self::Synchronized(snapshot) => Some(snapshot.now),
            Self::NotSynchronized { .. } => None,
        }
    }
}

/// Estimated time plus the sync health a UI needs to render it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockSnapshot {
    /// Estimated current time.
    pub now: DateTime<Utc>,
    /// `now` formatted in `timezone`.
    pub display: String,
    /// Display timezone.
    pub timezone: Timezone,
    /// Server time of the anchor.
    pub synced_at: DateTime<Utc>,
    /// The source's display string at the anchor.
    pub server_display: String,
    /// Latest failure since the anchor, if any.
    pub last_sync_error: Option<TimeSourceError>,
    /// Failed syncs since the anchor.
    pub consecutive_failures: u32,
}

impl ClockSnapshot {
    /// Whether failures have piled up past `threshold`, so the UI should
    /// warn that the displayed time may be stale.
    #[must_use]
    pub fn is_degraded(&self, threshold: u32) -> bool {
        self.consecutive_failures >= threshold
    }
}
