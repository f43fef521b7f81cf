//! Domain model for clock synchronization.

pub mod countdown;
pub mod state;
