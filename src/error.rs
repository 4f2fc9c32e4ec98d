//! Error types used by the watchloop runtime and handlers.
//!
//! This module defines the full failure taxonomy:
//!
//! - [`HandlerError`] — an error returned by handler code itself.
//! - [`IterationError`] — the per-iteration classification (handler failure,
//!   hard deadline, watchdog expiry, too-quick completion).
//! - [`RuntimeError`] — errors raised by the scheduler runtime (double start,
//!   fatal abort after too many failures).
//! - [`ConfigError`] — configuration validation failures.
//!
//! Error types provide `as_label()` helpers returning short stable
//! snake_case identifiers for logs and metrics.

use std::time::Duration;
use thiserror::Error;

/// # Error produced by handler code.
///
/// An opaque, message-carrying error: the scheduler never inspects it, it is
/// classified as [`IterationError::Handler`] and passed through to the
/// `IterationFailure` (and possibly the fatal `Error`) event unchanged.
///
/// # Example
/// ```
/// use watchloop::HandlerError;
///
/// let err = HandlerError::new("queue unreachable");
/// assert_eq!(err.to_string(), "queue unreachable");
///
/// let err: HandlerError = "uhoh".into();
/// assert_eq!(err.to_string(), "uhoh");
/// ```
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("{message}")]
pub struct HandlerError {
    message: String,
}

impl HandlerError {
    /// Creates a handler error from any displayable message.
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            message: message.into(),
        }
    }

    /// Wraps an arbitrary error value, keeping only its display form.
    pub fn from_err(err: impl std::fmt::Display) -> Self {
        Self {
            message: err.to_string(),
        }
    }
}

impl From<String> for HandlerError {
    fn from(message: String) -> Self {
        Self { message }
    }
}

impl From<&str> for HandlerError {
    fn from(message: &str) -> Self {
        Self {
            message: message.to_string(),
        }
    }
}

/// # Classification of a failed iteration.
///
/// Every failed iteration is classified into exactly one of these variants
/// and carried on the `IterationFailure` event. Crossing the cumulative
/// failure threshold promotes the last classification into the fatal `Error`
/// event and a [`RuntimeError::Aborted`] outcome.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum IterationError {
    /// The handler itself returned an error; the message is passed through
    /// unchanged.
    #[error("{0}")]
    Handler(#[from] HandlerError),

    /// The iteration ran longer than the hard ceiling. The handler cannot
    /// disable or extend this deadline.
    #[error("iteration exceeded maximum allowed time ({limit:?})")]
    MaxTimeExceeded {
        /// The configured `max_iteration_time`.
        limit: Duration,
    },

    /// The soft deadline elapsed without the handler calling
    /// `Watchdog::touch` or `Watchdog::stop`.
    #[error("watchdog exceeded ({limit:?} without liveness signal)")]
    WatchdogExpired {
        /// The effective watchdog timeout.
        limit: Duration,
    },

    /// The handler completed successfully but faster than the configured
    /// `min_iteration_time` floor.
    #[error("iteration completed too quickly ({elapsed:?} < {min:?})")]
    TooQuick {
        /// Measured iteration duration.
        elapsed: Duration,
        /// The configured floor.
        min: Duration,
    },
}

impl IterationError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    ///
    /// # Example
    /// ```
    /// use std::time::Duration;
    /// use watchloop::IterationError;
    ///
    /// let err = IterationError::MaxTimeExceeded { limit: Duration::from_secs(3) };
    /// assert_eq!(err.as_label(), "iteration_max_time_exceeded");
    /// ```
    pub fn as_label(&self) -> &'static str {
        match self {
            IterationError::Handler(_) => "iteration_handler_failed",
            IterationError::MaxTimeExceeded { .. } => "iteration_max_time_exceeded",
            IterationError::WatchdogExpired { .. } => "iteration_watchdog_expired",
            IterationError::TooQuick { .. } => "iteration_too_quick",
        }
    }
}

/// # Errors produced by the scheduler runtime.
///
/// [`RuntimeError::Aborted`] is the consumable face of the fatal-abort
/// contract: it is returned from `Scheduler::stop` and `Scheduler::join`
/// when the run crossed its failure threshold.
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    /// `start()` was called while a run was already in flight.
    #[error("scheduler is already running")]
    AlreadyRunning,

    /// The run aborted fatally: the cumulative failure count reached the
    /// configured threshold. `cause` is the failure that crossed the line.
    #[error("aborted after {failures} failures (threshold {threshold}): {cause}")]
    Aborted {
        /// Cumulative failures at abort time.
        failures: u64,
        /// The configured `max_failures`.
        threshold: u64,
        /// The classified failure that triggered the abort.
        #[source]
        cause: IterationError,
    },
}

impl RuntimeError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            RuntimeError::AlreadyRunning => "runtime_already_running",
            RuntimeError::Aborted { .. } => "runtime_aborted",
        }
    }
}

/// # Configuration validation failures.
///
/// Returned by `Config::validate` (and therefore `Scheduler::new`).
#[non_exhaustive]
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ConfigError {
    /// `max_iteration_time` must be positive.
    #[error("max_iteration_time must be greater than zero")]
    ZeroMaxIterationTime,

    /// `watchdog_time`, when set, must be positive.
    #[error("watchdog_time must be greater than zero when set")]
    ZeroWatchdogTime,

    /// `min_iteration_time`, when set, must be positive.
    #[error("min_iteration_time must be greater than zero when set")]
    ZeroMinIterationTime,

    /// `max_iterations`, when set, must be positive (`None` means unbounded).
    #[error("max_iterations must be greater than zero when set")]
    ZeroMaxIterations,

    /// `max_failures` must be positive; a threshold of zero could never admit
    /// a single iteration.
    #[error("max_failures must be greater than zero")]
    ZeroMaxFailures,
}
