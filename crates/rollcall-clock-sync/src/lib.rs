//! Rollcall Clock Sync — a drift-corrected estimate of "now".
//!
//! The estimate is anchored on the last successful answer from a trusted
//! time source and interpolated with the local monotonic clock in between:
//! `now = server_time_at_sync + (local_now - local_time_at_sync)`. It never
//! falls back to the device's wall clock, which may be wrong.

pub mod application;
pub mod config;
pub mod domain;
pub mod error;
pub mod infrastructure;

pub use application::clock_sync::{ClockSync, SyncOutcome};
pub use application::driver::ClockSyncDriver;
pub use config::ClockSyncConfig;
pub use domain::countdown::{Countdown, TimeRemaining};
pub use domain::state::{ClockSnapshot, ClockState, SyncAnchor, TickStatus};
pub use error::ClockError;
pub use infrastructure::api_time_source::ApiTimeSource;
