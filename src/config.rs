//! # Scheduler configuration.
//!
//! Provides [`Config`], the immutable per-run settings of a
//! [`Scheduler`](crate::Scheduler).
//!
//! Two timing ceilings guard every iteration:
//! - `max_iteration_time` — the hard deadline, never controllable by the
//!   handler;
//! - `watchdog_time` — the soft deadline, which the handler may touch or
//!   stop; it defaults to `max_iteration_time` when unset.
//!
//! ## Field semantics
//! - `wait_time`: delay between the end of one iteration and the start of
//!   the next (`0` = back-to-back iterations).
//! - `min_iteration_time`: optional floor; a success faster than this is
//!   reclassified as a failure.
//! - `max_iterations`: optional run-length cap (`None` = run forever).
//! - `max_failures`: cumulative failure threshold for the fatal abort.
//!   Defaults to [`DEFAULT_MAX_FAILURES`].
//! - `bus_capacity`: event bus ring buffer size (min 1; clamped by the Bus).

use std::time::Duration;

use crate::error::ConfigError;

/// Default cumulative failure threshold when none is configured.
pub const DEFAULT_MAX_FAILURES: u64 = 7;

/// Default event bus capacity.
pub const DEFAULT_BUS_CAPACITY: usize = 256;

/// Immutable configuration for a [`Scheduler`](crate::Scheduler) run loop.
///
/// Constructed with the two required timings, then refined with fluent
/// `with_*` helpers:
///
/// ```
/// use std::time::Duration;
/// use watchloop::Config;
///
/// let cfg = Config::new(Duration::from_secs(1), Duration::from_secs(30))
///     .with_watchdog_time(Duration::from_secs(5))
///     .with_max_iterations(100)
///     .with_max_failures(3);
///
/// assert!(cfg.validate().is_ok());
/// assert_eq!(cfg.effective_watchdog_time(), Duration::from_secs(5));
/// ```
#[derive(Clone, Debug)]
pub struct Config {
    /// Delay inserted between the end of one iteration and the start of the
    /// next.
    pub wait_time: Duration,

    /// Hard ceiling on one iteration's wall-clock duration. The handler
    /// cannot disable or extend it.
    pub max_iteration_time: Duration,

    /// Optional floor below which a successful completion is reclassified as
    /// a failure.
    pub min_iteration_time: Option<Duration>,

    /// Deadline of the stoppable/touchable watchdog timer. Defaults to
    /// [`Config::max_iteration_time`] when `None`.
    pub watchdog_time: Option<Duration>,

    /// If set, the run terminates normally after this many iterations.
    pub max_iterations: Option<u64>,

    /// Cumulative failure count at which the run aborts fatally.
    pub max_failures: u64,

    /// Capacity of the lifecycle event bus ring buffer.
    pub bus_capacity: usize,
}

impl Config {
    /// Creates a configuration with the two required timings and defaults
    /// for everything else.
    pub fn new(wait_time: Duration, max_iteration_time: Duration) -> Self {
        Self {
            wait_time,
            max_iteration_time,
            min_iteration_time: None,
            watchdog_time: None,
            max_iterations: None,
            max_failures: DEFAULT_MAX_FAILURES,
            bus_capacity: DEFAULT_BUS_CAPACITY,
        }
    }

    /// Sets the minimum iteration duration floor.
    pub fn with_min_iteration_time(mut self, min: Duration) -> Self {
        self.min_iteration_time = Some(min);
        self
    }

    /// Overrides the soft watchdog deadline.
    pub fn with_watchdog_time(mut self, watchdog: Duration) -> Self {
        self.watchdog_time = Some(watchdog);
        self
    }

    /// Caps the run at the given number of iterations.
    pub fn with_max_iterations(mut self, max: u64) -> Self {
        self.max_iterations = Some(max);
        self
    }

    /// Sets the cumulative failure threshold for the fatal abort.
    pub fn with_max_failures(mut self, max: u64) -> Self {
        self.max_failures = max;
        self
    }

    /// Sets the event bus ring buffer capacity.
    pub fn with_bus_capacity(mut self, capacity: usize) -> Self {
        self.bus_capacity = capacity;
        self
    }

    /// Resolves the effective soft deadline: the explicit `watchdog_time`,
    /// or `max_iteration_time` when unset.
    #[inline]
    pub fn effective_watchdog_time(&self) -> Duration {
        self.watchdog_time.unwrap_or(self.max_iteration_time)
    }

    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }

    /// Validates the configuration.
    ///
    /// Checked by [`Scheduler::new`](crate::Scheduler::new); exposed so
    /// callers assembling configs from external sources can fail early.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.max_iteration_time.is_zero() {
            return Err(ConfigError::ZeroMaxIterationTime);
        }
        if matches!(self.watchdog_time, Some(d) if d.is_zero()) {
            return Err(ConfigError::ZeroWatchdogTime);
        }
        if matches!(self.min_iteration_time, Some(d) if d.is_zero()) {
            return Err(ConfigError::ZeroMinIterationTime);
        }
        if self.max_iterations == Some(0) {
            return Err(ConfigError::ZeroMaxIterations);
        }
        if self.max_failures == 0 {
            return Err(ConfigError::ZeroMaxFailures);
        }
        Ok(())
    }
}
