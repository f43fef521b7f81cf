//! Application services: the synchronizing clock and its scheduler driver.

pub mod clock_sync;
pub mod driver;
