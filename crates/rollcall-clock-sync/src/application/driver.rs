//! Lifecycle of a [`ClockSync`]: initial sync, periodic ticks and resyncs.

use std::sync::Arc;

use rollcall_core::scheduler::{RepeatingTask, Scheduler, TaskHandle};
use tracing::info;

use super::clock_sync::ClockSync;
use crate::config::ClockSyncConfig;

/// Owns the repeating tasks that keep a [`ClockSync`] fresh. Dropping the
/// driver (or calling [`ClockSyncDriver::teardown`]) stops both tasks.
#[derive(Debug)]
pub struct ClockSyncDriver {
    clock: Arc<ClockSync>,
    tick_task: TaskHandle,
    resync_task: TaskHandle,
}

impl ClockSyncDriver {
    /// Synchronizes once, then schedules `tick` every tick interval and
    /// `synchronize` every resync interval.
    pub async fn start(
        clock: Arc<ClockSync>,
        scheduler: &dyn Scheduler,
        config: &ClockSyncConfig,
    ) -> Self {
        clock.synchronize().await;
        clock.tick();

        let tick_task = scheduler.every(config.tick_interval, tick_task(&clock));
        let resync_task = scheduler.every(config.resync_interval, resync_task(&clock));
        info!(
            tick_ms = config.tick_interval.as_millis(),
            resync_ms = config.resync_interval.as_millis(),
            "clock sync started"
        );

        Self {
            clock,
            tick_task,
            resync_task,
        }
    }

    /// The driven clock.
    #[must_use]
    pub fn clock(&self) -> &Arc<ClockSync> {
        &self.clock
    }

    /// Returns `true` while both tasks are scheduled.
    #[must_use]
    pub fn is_running(&self) -> bool {
        !self.tick_task.is_cancelled() && !self.resync_task.is_cancelled()
    }

    /// Stops ticking and resynchronizing.
    pub fn teardown(self) {
        self.tick_task.cancel();
        self.resync_task.cancel();
        info!("clock sync stopped");
    }
}

fn tick_task(clock: &Arc<ClockSync>) -> RepeatingTask {
    let clock = Arc::clone(clock);
    Box::new(move || {
        let clock = Arc::clone(&clock);
        Box::pin(async move {
            clock.tick();
        })
    })
}

fn resync_task(clock: &Arc<ClockSync>) -> RepeatingTask {
    let clock = Arc::clone(clock);
    Box::new(move || {
        let clock = Arc::clone(&clock);
        Box::pin(async move {
            clock.synchronize().await;
            clock.tick();
        })
    })
}
