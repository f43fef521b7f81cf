//! Repeating-task scheduler abstraction.
//!
//! Periodic work (clock ticks, resynchronization) is registered through a
//! [`Scheduler`] instead of raw timers so tests can drive virtual time.

use std::future::Future;
use std::pin::Pin;
use std::time::Duration;

use tokio_util::sync::CancellationToken;

/// Future produced by one run of a repeating task.
pub type TaskFuture = Pin<Box<dyn Future<Output = ()> + Send + 'static>>;

/// A task body invoked once per period.
pub type RepeatingTask = Box<dyn FnMut() -> TaskFuture + Send + 'static>;

/// Runs tasks on a fixed period until their handle is cancelled.
pub trait Scheduler: Send + Sync {
    /// Schedules `task` to run every `period`, first run one period from now.
    fn every(&self, period: Duration, task: RepeatingTask) -> TaskHandle;
}

/// Cancel handle for a scheduled task. Dropping the handle cancels the task.
#[derive(Debug)]
pub struct TaskHandle {
    token: CancellationToken,
}

impl TaskHandle {
    /// Wraps a cancellation token owned by the scheduler's task loop.
    #[must_use]
    pub fn new(token: CancellationToken) -> Self {
        Self { token }
    }

    /// Stops future runs. Idempotent.
    pub fn cancel(&self) {
        self.token.cancel();
    }

    /// Returns `true` once the task has been cancelled.
    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.token.is_cancelled()
    }
}

impl Drop for TaskHandle {
    fn drop(&mut self) {
        self.token.cancel();
    }
}

/// Scheduler backed by `tokio::time::interval` on the current runtime.
///
/// Cancelling the handle also abandons a run that is still in progress.
#[derive(Debug, Clone, Copy, Default)]
pub struct TokioScheduler;

impl Scheduler for TokioScheduler {
    fn every(&self, period: Duration, mut task: RepeatingTask) -> TaskHandle {
        let token = CancellationToken::new();
        let child = token.clone();
        tokio::spawn(async move {
            let start = tokio::time::Instant::now() + period;
            let mut interval = tokio::time::interval_at(start, period);
            interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);
            loop {
                tokio::select! {
                    biased;
                    () = child.cancelled() => break,
                    _ = interval.tick() => {}
                }
                // A run in progress is dropped as soon as the handle is cancelled.
                tokio::select! {
                    biased;
                    () = child.cancelled() => break,
                    () = task() => {}
                }
            }
        });
        TaskHandle::new(token)
    }
}
