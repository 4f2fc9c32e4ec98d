//! # Lifecycle events emitted by the scheduler.
//!
//! The [`EventKind`] enum is the fixed vocabulary of state transitions a run
//! can report; there are no dynamic event names. The [`Event`] struct carries
//! metadata: a global sequence number, a wall-clock timestamp, the iteration
//! index, the classified error on failures, and the handler's result on
//! successes.
//!
//! ## Ordering guarantees
//! Within one run, emission order is deterministic and total:
//!
//! ```text
//! Started
//!   ┌─► IterationStart
//!   │       ├─► IterationSuccess | IterationFailure
//!   │       └─► IterationComplete ──┐ (repeat)
//!   └──────────────────────────────┘
//! Completed | Error   (at most one; Error wins when both apply)
//! Stopped
//! ```
//!
//! Each event also carries a globally unique sequence number (`seq`) that
//! increases monotonically; use it to restore order when events from several
//! schedulers interleave.

use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

use crate::error::IterationError;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of scheduler lifecycle events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    /// A run began (`start()` accepted).
    ///
    /// Sets: `at`, `seq`.
    Started,

    /// An iteration is about to invoke the handler.
    ///
    /// Sets: `iteration`, `at`, `seq`.
    IterationStart,

    /// The iteration's handler settled successfully within its deadlines.
    ///
    /// Sets: `iteration`, `value` (handler result), `at`, `seq`.
    IterationSuccess,

    /// The iteration was classified as failed (handler error, hard deadline,
    /// watchdog expiry, or too-quick completion).
    ///
    /// Sets: `iteration`, `error`, `at`, `seq`.
    IterationFailure,

    /// The iteration finished, success or failure. Always follows one of
    /// `IterationSuccess` / `IterationFailure`.
    ///
    /// Sets: `iteration`, `at`, `seq`.
    IterationComplete,

    /// The run reached its configured `max_iterations` and is completing
    /// normally.
    ///
    /// Sets: `iteration`, `at`, `seq`.
    Completed,

    /// Fatal abort: the cumulative failure count reached `max_failures`.
    /// Never emitted for an ordinary per-iteration failure.
    ///
    /// Sets: `error` (the triggering failure), `iteration`, `at`, `seq`.
    Error,

    /// The run halted; no further iteration will start. Terminal for every
    /// run, whatever the reason (explicit stop, completion, fatal abort).
    ///
    /// Sets: `at`, `seq`.
    Stopped,
}

/// A lifecycle event with optional metadata.
///
/// `T` is the handler's output type, present on `IterationSuccess` events.
#[derive(Debug, Clone)]
pub struct Event<T> {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Iteration index (1-based within the run), if applicable.
    pub iteration: Option<u64>,
    /// Classified error, set on `IterationFailure` and the fatal `Error`.
    pub error: Option<IterationError>,
    /// Handler result, set on `IterationSuccess`.
    pub value: Option<T>,
}

impl<T> Event<T> {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            iteration: None,
            error: None,
            value: None,
        }
    }

    /// Attaches the 1-based iteration index.
    #[inline]
    pub fn with_iteration(mut self, iteration: u64) -> Self {
        self.iteration = Some(iteration);
        self
    }

    /// Attaches a classified error.
    #[inline]
    pub fn with_error(mut self, error: IterationError) -> Self {
        self.error = Some(error);
        self
    }

    /// Attaches the handler's result value.
    #[inline]
    pub fn with_value(mut self, value: T) -> Self {
        self.value = Some(value);
        self
    }

    /// True for the two terminal-decision kinds (`Completed` / `Error`).
    #[inline]
    pub fn is_terminal_decision(&self) -> bool {
        matches!(self.kind, EventKind::Completed | EventKind::Error)
    }
}
