//! Owner-side tracking of outstanding requests.
//!
//! A UI component (or any other owner) registers every handle it creates.
//! Dropping the tracker, which happens when the owner goes away, cancels
//! everything still pending so no late result is applied.

use std::sync::{Mutex, PoisonError};

use tracing::debug;

use crate::request::{CancellableRequest, Canceller};

#[derive(Debug)]
struct Tracked {
    key: Option<String>,
    canceller: Canceller,
}

/// Tracks the requests created by one owner.
#[derive(Debug, Default)]
pub struct RequestTracker {
    entries: Mutex<Vec<Tracked>>,
}

impl RequestTracker {
    /// Creates an empty tracker.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Registers `request` without a key. Settled entries are forgotten on
    /// every registration, so the list stays bounded by what is in flight.
    pub fn track(&self, request: &CancellableRequest) {
        let mut entries = self.lock();
        entries.retain(|entry| !entry.canceller.is_settled());
        entries.push(Tracked {
            key: None,
            canceller: request.canceller(),
        });
    }

    /// Registers `request` under `key`, cancelling any earlier request
    /// tracked under the same key.
    pub fn supersede(&self, key: impl Into<String>, request: &CancellableRequest) {
        let key = key.into();
        let mut entries = self.lock();
        entries.retain(|entry| {
            if entry.canceller.is_settled() {
                false
            } else if entry.key.as_deref() == Some(key.as_str()) {
                debug!(request_id = %entry.canceller.id(), key = %key, "request superseded");
                entry.canceller.cancel();
                false
            } else {
                true
            }
        });
        entries.push(Tracked {
            key: Some(key),
            canceller: request.canceller(),
        });
    }

    /// Forgets settled requests. Returns how many were removed.
    pub fn prune(&self) -> usize {
        let mut entries = self.lock();
        let before = entries.len();
        entries.retain(|entry| !entry.canceller.is_settled());
        before - entries.len()
    }

    /// Number of tracked requests still pending.
    #[must_use]
    pub fn outstanding(&self) -> usize {
        self.lock()
            .iter()
            .filter(|entry| !entry.canceller.is_settled())
            .count()
    }

    /// Number of entries currently held, settled or not.
    #[must_use]
    pub fn tracked(&self) -> usize {
        self.lock().len()
    }

    /// Cancels and forgets every tracked request.
    pub fn cancel_all(&self) {
        let drained: Vec<Tracked> = self.lock().drain(..).collect();
        for entry in drained {
            entry.canceller.cancel();
        }
    }

    fn lock(&self) -> std::sync::MutexGuard<'_, Vec<Tracked>> {
        self.entries.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for RequestTracker {
    fn drop(&mut self) {
        self.cancel_all();
    }
}
