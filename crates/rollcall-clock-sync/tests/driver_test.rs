use std::sync::Arc;
use std::time::Duration;

use rollcall_clock_sync::{ClockSync, ClockSyncConfig, ClockSyncDriver, TickStatus};
use rollcall_core::scheduler::TokioScheduler;
use rollcall_core::time_source::{ServerTime, TimeSourceError};
use rollcall_core::timezone::Timezone;
use rollcall_test_support::{
    GatedTimeSource, ManualClock, ManualScheduler, ScriptedTimeSource, server_time_at,
};

struct Harness {
    clock: Arc<ManualClock>,
    scheduler: ManualScheduler,
    source: Arc<ScriptedTimeSource>,
    config: ClockSyncConfig,
}

fn harness(script: Vec<Result<ServerTime, TimeSourceError>>) -> Harness {
    let clock = Arc::new(ManualClock::new(0));
    Harness {
        scheduler: ManualScheduler::new(Arc::clone(&clock)),
        clock,
        source: Arc::new(ScriptedTimeSource::new(script)),
        config: ClockSyncConfig::default(),
    }
}

impl Harness {
    fn clock_sync(&self) -> Arc<ClockSync> {
        Arc::new(ClockSync::from_config(
            self.source.clone(),
            self.clock.clone(),
            &self.config,
        ))
    }
}

fn millis(status: &TickStatus) -> Option<i64> {
    status.now().map(|t| t.timestamp_millis())
}

#[tokio::test]
async fn test_start_synchronizes_immediately() {
    let h = harness(vec![Ok(server_time_at(1_000_000, Timezone::default()))]);

    let driver = ClockSyncDriver::start(h.clock_sync(), &h.scheduler, &h.config).await;

    assert!(driver.is_running());
    assert_eq!(h.source.requests().len(), 1);
    assert_eq!(
        driver.clock().estimated_time().map(|t| t.timestamp_millis()),
        Some(1_000_000)
    );
    assert_eq!(h.scheduler.active_tasks(), 2);
}

#[tokio::test]
async fn test_ticks_publish_interpolated_time() {
    let h = harness(vec![Ok(server_time_at(1_000_000, Timezone::default()))]);
    let driver = ClockSyncDriver::start(h.clock_sync(), &h.scheduler, &h.config).await;
    let updates = driver.clock().subscribe();

    h.scheduler.advance(Duration::from_secs(3)).await;

    assert_eq!(millis(&updates.borrow()), Some(1_003_000));
    // Ticks never hit the time source.
    assert_eq!(h.source.requests().len(), 1);
}

#[tokio::test]
async fn test_resync_interval_replaces_anchor() {
    let h = harness(vec![
        Ok(server_time_at(1_000_000, Timezone::default())),
        Ok(server_time_at(2_000_000_000, Timezone::default())),
    ]);
    let driver = ClockSyncDriver::start(h.clock_sync(), &h.scheduler, &h.config).await;

    h.scheduler.advance(Duration::from_secs(299)).await;
    assert_eq!(h.source.requests().len(), 1);

    h.scheduler.advance(Duration::from_secs(1)).await;
    assert_eq!(h.source.requests().len(), 2);
    assert_eq!(
        driver.clock().estimated_time().map(|t| t.timestamp_millis()),
        Some(2_000_000_000)
    );
    assert_eq!(driver.clock().state().anchor().map(|a| a.local_millis), Some(300_000));
}

#[tokio::test]
async fn test_failed_resync_keeps_estimate_running() {
    let h = harness(vec![
        Ok(server_time_at(1_000_000, Timezone::default())),
        Err(TimeSourceError::Network("connection reset".into())),
    ]);
    let driver = ClockSyncDriver::start(h.clock_sync(), &h.scheduler, &h.config).await;

    h.scheduler.advance(Duration::from_secs(301)).await;

    let clock = driver.clock();
    assert_eq!(
        clock.estimated_time().map(|t| t.timestamp_millis()),
        Some(1_301_000)
    );
    assert_eq!(clock.state().consecutive_failures(), 1);
    match clock.tick() {
        TickStatus::Synchronized(snapshot) => {
            assert_eq!(snapshot.consecutive_failures, 1);
            assert!(!snapshot.is_degraded(h.config.failure_threshold));
        }
        other @ TickStatus::NotSynchronized { .. } => panic!("expected synchronized, got {other:?}"),
    }
}

#[tokio::test]
async fn test_start_without_sync_stays_unsynchronized() {
    let h = harness(vec![Err(TimeSourceError::Timeout)]);
    let driver = ClockSyncDriver::start(h.clock_sync(), &h.scheduler, &h.config).await;
    let updates = driver.clock().subscribe();

    h.scheduler.advance(Duration::from_secs(10)).await;

    assert!(matches!(
        *updates.borrow(),
        TickStatus::NotSynchronized {
            last_sync_error: Some(TimeSourceError::Timeout),
            ..
        }
    ));
}

#[tokio::test]
async fn test_teardown_stops_both_tasks() {
    let h = harness(vec![Ok(server_time_at(1_000_000, Timezone::default()))]);
    let driver = ClockSyncDriver::start(h.clock_sync(), &h.scheduler, &h.config).await;
    let clock = Arc::clone(driver.clock());

    driver.teardown();
    h.scheduler.advance(Duration::from_secs(600)).await;

    assert_eq!(h.scheduler.active_tasks(), 0);
    assert_eq!(h.source.requests().len(), 1);
    // The estimate itself still works; it is only no longer pushed.
    assert_eq!(
        clock.estimated_time().map(|t| t.timestamp_millis()),
        Some(1_600_000)
    );
}

#[tokio::test]
async fn test_dropping_driver_stops_tasks() {
    let h = harness(vec![Ok(server_time_at(1_000_000, Timezone::default()))]);
    let driver = ClockSyncDriver::start(h.clock_sync(), &h.scheduler, &h.config).await;

    drop(driver);

    assert_eq!(h.scheduler.active_tasks(), 0);
}

#[tokio::test(start_paused = true)]
async fn test_teardown_abandons_resync_in_flight() {
    let source = Arc::new(GatedTimeSource::new());
    let clock = Arc::new(ClockSync::new(
        source.clone(),
        Arc::new(ManualClock::new(0)),
        Timezone::default(),
        Duration::from_secs(10),
    ));
    let config = ClockSyncConfig {
        resync_interval: Duration::from_secs(60),
        ..ClockSyncConfig::default()
    };
    let answer_first = async {
        source.wait_for_calls(1).await;
        source.respond(0, Ok(server_time_at(1_000_000, Timezone::default())));
    };
    let (driver, ()) = tokio::join!(
        ClockSyncDriver::start(Arc::clone(&clock), &TokioScheduler, &config),
        answer_first
    );

    // The resync goes out at 60 s and stays in flight.
    source.wait_for_calls(2).await;
    driver.teardown();
    source.respond(1, Ok(server_time_at(9_000_000, Timezone::default())));
    tokio::time::sleep(Duration::from_secs(5)).await;

    assert_eq!(clock.state().anchor().map(|a| a.seq), Some(1));
    assert_eq!(clock.state().last_issued(), 2);
}
