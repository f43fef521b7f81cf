//! Rollcall Core — shared abstractions.
//!
//! This crate defines the traits and value types that the clock
//! synchronization and request layers depend on. It performs no network
//! I/O itself; transports and time sources are ports implemented elsewhere.

pub mod clock;
pub mod envelope;
pub mod error;
pub mod rng;
pub mod scheduler;
pub mod time_source;
pub mod timezone;
pub mod transport;
