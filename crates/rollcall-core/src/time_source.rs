//! Trusted time source port.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::timezone::Timezone;

/// Server time as reported by the trusted source.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerTime {
    /// Current instant, carried on the wire as epoch milliseconds.
    #[serde(with = "chrono::serde::ts_milliseconds")]
    pub timestamp: DateTime<Utc>,
    /// Pre-formatted display string in the requested timezone.
    pub formatted: String,
    /// Timezone the display string was rendered in.
    pub timezone: Timezone,
}

/// Failure to obtain the time from the trusted source.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum TimeSourceError {
    /// The source could not be reached.
    #[error("network error: {0}")]
    Network(String),

    /// The source did not answer in time.
    #[error("time source timed out")]
    Timeout,

    /// The source answered with a body that is not a time payload.
    #[error("malformed time response: {0}")]
    MalformedResponse(String),

    /// The source rejected the timezone identifier.
    #[error("invalid timezone: {0}")]
    InvalidTimezone(String),

    /// The source answered with an application-level failure.
    #[error("time source rejected the request ({status}): {message}")]
    Rejected {
        /// HTTP status.
        status: u16,
        /// Message from the failure envelope.
        message: String,
    },

    /// The source is misconfigured on the client side (unknown API group,
    /// invalid URL). Retrying does not help.
    #[error("time source misconfigured: {0}")]
    Configuration(String),

    /// The underlying request was cancelled.
    #[error("time request cancelled")]
    Cancelled,
}

/// Port for querying the trusted time source.
#[async_trait]
pub trait TimeSource: Send + Sync {
    /// Fetches the current time rendered for `timezone`.
    async fn current_time(&self, timezone: Timezone) -> Result<ServerTime, TimeSourceError>;
}
