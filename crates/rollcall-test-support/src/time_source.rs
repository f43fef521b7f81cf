//! Test time sources — scripted and gated `TimeSource` implementations.

use std::collections::VecDeque;
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use rollcall_core::time_source::{ServerTime, TimeSource, TimeSourceError};
use rollcall_core::timezone::Timezone;
use tokio::sync::{Notify, oneshot};

/// Build a `ServerTime` for the given epoch milliseconds.
///
/// # Panics
///
/// Panics if `millis` is outside chrono's representable range.
#[must_use]
pub fn server_time_at(millis: i64, timezone: Timezone) -> ServerTime {
    let timestamp = Utc.timestamp_millis_opt(millis).unwrap();
    ServerTime {
        timestamp,
        formatted: timezone.format(timestamp, "%d/%m/%Y %H:%M:%S"),
        timezone,
    }
}

/// A time source that replays a fixed script of results in order and
/// records the timezone of every request. Once the script is exhausted,
/// every call fails with a network error.
#[derive(Debug, Default)]
pub struct ScriptedTimeSource {
    script: Mutex<VecDeque<Result<ServerTime, TimeSourceError>>>,
    requests: Mutex<Vec<Timezone>>,
}

impl ScriptedTimeSource {
    /// Create a source that will answer with `script`, one entry per call.
    #[must_use]
    pub fn new(script: Vec<Result<ServerTime, TimeSourceError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Returns the timezones requested so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn requests(&self) -> Vec<Timezone> {
        self.requests.lock().unwrap().clone()
    }
}

#[async_trait]
impl TimeSource for ScriptedTimeSource {
    async fn current_time(&self, timezone: Timezone) -> Result<ServerTime, TimeSourceError> {
        self.requests.lock().unwrap().push(timezone);
        self.script
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or_else(|| Err(TimeSourceError::Network("script exhausted".into())))
    }
}

type Reply = oneshot::Sender<Result<ServerTime, TimeSourceError>>;

/// A time source whose calls stay in flight until the test answers them,
/// in any order. Used to reorder completions relative to issuance.
#[derive(Debug, Default)]
pub struct GatedTimeSource {
    replies: Mutex<Vec<Option<Reply>>>,
    arrived: Notify,
}

impl GatedTimeSource {
    /// Create a gated source with no calls in flight.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of calls received so far.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn calls(&self) -> usize {
        self.replies.lock().unwrap().len()
    }

    /// Wait until at least `count` calls have arrived.
    pub async fn wait_for_calls(&self, count: usize) {
        loop {
            let notified = self.arrived.notified();
            if self.calls() >= count {
                return;
            }
            notified.await;
        }
    }

    /// Answer the `index`-th call (zero-based, in arrival order).
    ///
    /// # Panics
    ///
    /// Panics if that call has not arrived or was already answered.
    pub fn respond(&self, index: usize, result: Result<ServerTime, TimeSourceError>) {
        let reply = self.replies.lock().unwrap()[index]
            .take()
            .expect("call already answered");
        // The caller may have given up on the call; that is fine.
        let _ = reply.send(result);
    }
}

#[async_trait]
impl TimeSource for GatedTimeSource {
    async fn current_time(&self, _timezone: Timezone) -> Result<ServerTime, TimeSourceError> {
        let (tx, rx) = oneshot::channel();
        self.replies.lock().unwrap().push(Some(tx));
        self.arrived.notify_waiters();
        rx.await
            .unwrap_or_else(|_| Err(TimeSourceError::Network("gate dropped".into())))
    }
}
