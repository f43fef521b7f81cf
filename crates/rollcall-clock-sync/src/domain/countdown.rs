//! Time remaining until a deadline.

use chrono::{DateTime, Utc};

/// A positive amount of time left before a deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Countdown {
    /// Milliseconds left; always greater than zero.
    pub total_ms: i64,
    /// Human-readable form, e.g. `"8h 30min 34s"`.
    pub formatted: String,
}

/// Result of asking how long until a deadline.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TimeRemaining {
    /// No successful sync yet; there is no trustworthy "now" to compare with.
    NotSynchronized,
    /// The deadline is now or in the past.
    Elapsed,
    /// The deadline is in the future.
    Remaining(Countdown),
}

impl TimeRemaining {
    /// Computes the time between `now` and `target`.
    #[must_use]
    pub fn between(now: DateTime<Utc>, target: DateTime<Utc>) -> Self {
        let total_ms = (target - now).num_milliseconds();
        if total_ms <= 0 {
            return Self::Elapsed;
        }
        Self::Remaining(Countdown {
            total_ms,
            formatted: format_countdown(total_ms),
        })
    }
}

/// Formats a positive duration as `"{h}h {m}min {s}s"`. Hours are not
/// folded into days; the sub-second remainder is dropped.
#[must_use]
pub fn format_countdown(total_ms: i64) -> String {
    let total_secs = total_ms.max(0) / 1000;
    let hours = total_secs / 3600;
    let minutes = (total_secs % 3600) / 60;
    let seconds = total_secs % 60;
    format!("{hours}h {minutes}min {seconds}s")
}
