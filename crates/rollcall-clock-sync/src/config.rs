//! Clock synchronization settings.

use std::time::Duration;

use rollcall_core::error::CoreError;
use rollcall_core::timezone::Timezone;

/// Timing and display settings for [`crate::ClockSync`] and its driver.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClockSyncConfig {
    /// How often the displayed time is recomputed.
    pub tick_interval: Duration,
    /// How often the clock is resynchronized with the time source.
    pub resync_interval: Duration,
    /// Upper bound on one time source request.
    pub sync_timeout: Duration,
    /// Initial display timezone.
    pub timezone: Timezone,
    /// Consecutive failures after which the clock counts as degraded.
    pub failure_threshold: u32,
}

impl Default for ClockSyncConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(1),
            resync_interval: Duration::from_secs(5 * 60),
            sync_timeout: Duration::from_secs(10),
            timezone: Timezone::default(),
            failure_threshold: 3,
        }
    }
}

impl ClockSyncConfig {
    /// Reads the settings from the process environment.
    ///
    /// # Errors
    ///
    /// See [`ClockSyncConfig::from_lookup`].
    pub fn from_env() -> Result<Self, CoreError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Reads the settings through `lookup`, falling back to the defaults
    /// for anything unset.
    ///
    /// # Errors
    ///
    /// Returns `CoreError::Configuration` for a non-positive or non-numeric
    /// value, or `CoreError::InvalidTimezone` for an unknown timezone.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, CoreError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let millis = |key: &str, default: Duration| -> Result<Duration, CoreError> {
            lookup(key).map_or(Ok(default), |raw| {
                positive(key, &raw).map(Duration::from_millis)
            })
        };

        let timezone = match lookup("ROLLCALL_CLOCK_TIMEZONE") {
            Some(raw) => Timezone::try_new(&raw)?,
            None => defaults.timezone,
        };
        let failure_threshold = match lookup("ROLLCALL_CLOCK_FAILURE_THRESHOLD") {
            Some(raw) => u32::try_from(positive("ROLLCALL_CLOCK_FAILURE_THRESHOLD", &raw)?)
                .map_err(|e| CoreError::Configuration(e.to_string()))?,
            None => defaults.failure_threshold,
        };

        Ok(Self {
            tick_interval: millis("ROLLCALL_CLOCK_TICK_MS", defaults.tick_interval)?,
            resync_interval: millis("ROLLCALL_CLOCK_RESYNC_MS", defaults.resync_interval)?,
            sync_timeout: millis("ROLLCALL_CLOCK_SYNC_TIMEOUT_MS", defaults.sync_timeout)?,
            timezone,
            failure_threshold,
        })
    }
}

fn positive(key: &str, raw: &str) -> Result<u64, CoreError> {
    raw.trim()
        .parse::<u64>()
        .ok()
        .filter(|value| *value > 0)
        .ok_or_else(|| {
            CoreError::Configuration(format!("{key} must be a positive integer, got '{raw}'"))
        })
}
