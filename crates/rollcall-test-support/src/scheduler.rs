//! Manual scheduler — runs repeating tasks against virtual time.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use rollcall_core::clock::MonotonicClock;
use rollcall_core::scheduler::{RepeatingTask, Scheduler, TaskHandle};
use tokio_util::sync::CancellationToken;

use crate::clock::ManualClock;

struct Entry {
    period_ms: i64,
    next_due: i64,
    task: RepeatingTask,
    token: CancellationToken,
}

/// A scheduler whose time only moves through [`ManualScheduler::advance`].
///
/// Virtual time is read from and written to the shared [`ManualClock`], so
/// a task running at its due instant observes that instant on the clock.
pub struct ManualScheduler {
    clock: Arc<ManualClock>,
    entries: Mutex<Vec<Entry>>,
}

impl ManualScheduler {
    /// Create a scheduler driving `clock`.
    #[must_use]
    pub fn new(clock: Arc<ManualClock>) -> Self {
        Self {
            clock,
            entries: Mutex::new(Vec::new()),
        }
    }

    /// Number of tasks that have not been cancelled.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub fn active_tasks(&self) -> usize {
        self.entries
            .lock()
            .unwrap()
            .iter()
            .filter(|e| !e.token.is_cancelled())
            .count()
    }

    /// Advance virtual time by `by`, running every task that falls due in
    /// order of due time. Each run is awaited before the next one starts.
    ///
    /// # Panics
    ///
    /// Panics if the internal mutex is poisoned.
    pub async fn advance(&self, by: Duration) {
        let target = self.clock.now_millis() + millis(by);
        loop {
            // Only the future is created under the lock; it is awaited after.
            let next = {
                let mut entries = self.entries.lock().unwrap();
                entries.retain(|e| !e.token.is_cancelled());
                let due = entries
                    .iter()
                    .enumerate()
                    .filter(|(_, e)| e.next_due <= target)
                    .min_by_key(|(_, e)| e.next_due)
                    .map(|(i, _)| i);
                due.map(|i| {
                    let entry = &mut entries[i];
                    self.clock.set(entry.next_due);
                    entry.next_due += entry.period_ms;
                    (entry.task)()
                })
            };
            match next {
                Some(run) => run.await,
                None => break,
            }
        }
        self.clock.set(target);
    }
}

impl Scheduler for ManualScheduler {
    fn every(&self, period: Duration, task: RepeatingTask) -> TaskHandle {
        let token = CancellationToken::new();
        let period_ms = millis(period).max(1);
        self.entries.lock().unwrap().push(Entry {
            period_ms,
            next_due: self.clock.now_millis() + period_ms,
            task,
            token: token.clone(),
        });
        TaskHandle::new(token)
    }
}

fn millis(duration: Duration) -> i64 {
    i64::try_from(duration.as_millis()).unwrap_or(i64::MAX)
}
