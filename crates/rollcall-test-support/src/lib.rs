//! Shared test doubles and utilities for the Rollcall client core.

mod clock;
mod rng;
mod scheduler;
mod time_source;
mod transport;

pub use clock::{FixedClock, ManualClock};
pub use rng::{MockRng, SequenceRng};
pub use scheduler::ManualScheduler;
pub use time_source::{GatedTimeSource, ScriptedTimeSource, server_time_at};
pub use transport::{GatedTransport, PendingTransport, StubTransport};
