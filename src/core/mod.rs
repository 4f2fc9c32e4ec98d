//! Scheduler internals: the public handle, the loop driver, single-iteration
//! execution, and the watchdog.

mod driver;
mod runner;
mod scheduler;
mod watchdog;

pub use scheduler::Scheduler;
pub use watchdog::Watchdog;
