//! # Handler abstraction.
//!
//! This module defines [`Handler`], the unit of work a
//! [`Scheduler`](crate::Scheduler) invokes every iteration. A handler
//! receives the iteration's [`Watchdog`] and the run's [`SharedState`], and
//! settles with a result or a [`HandlerError`].
//!
//! Handlers performing long operations should call [`Watchdog::touch`]
//! periodically to prove liveness, or [`Watchdog::stop`] when no soft
//! deadline applies; the hard deadline always stands.

use async_trait::async_trait;

use crate::core::Watchdog;
use crate::error::HandlerError;
use crate::state::SharedState;

/// # Unit of work executed once per iteration.
///
/// `State` is the scratch container persisted across iterations of one run;
/// `Output` is the success value carried on `IterationSuccess` events.
///
/// The scheduler treats a returned `Err` and a never-settling future the
/// same way it treats any other failure: it classifies, counts, and moves
/// on. Handlers are expected to respect the watchdog promptly; they are not
/// forcibly killed (the losing future is dropped at iteration end).
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use watchloop::{Handler, HandlerError, SharedState, Watchdog};
///
/// struct ExpireLeases;
///
/// #[async_trait]
/// impl Handler for ExpireLeases {
///     type State = u64;
///     type Output = u64;
///
///     fn name(&self) -> &str {
///         "expire-leases"
///     }
///
///     async fn run(
///         &self,
///         watchdog: Watchdog,
///         state: SharedState<u64>,
///     ) -> Result<u64, HandlerError> {
///         watchdog.touch();
///         let seen = state.with(|cursor| {
///             *cursor += 1;
///             *cursor
///         });
///         Ok(seen)
///     }
/// }
/// ```
#[async_trait]
pub trait Handler: Send + Sync + 'static {
    /// Scratch state persisted across iterations of one run.
    type State: Default + Send + 'static;

    /// Success value carried on `IterationSuccess` events.
    type Output: Clone + Send + Sync + 'static;

    /// Returns a stable, human-readable handler name for logs.
    ///
    /// The default uses `type_name::<Self>()`, which can be verbose —
    /// override it when possible.
    fn name(&self) -> &str {
        std::any::type_name::<Self>()
    }

    /// Executes one iteration of work.
    ///
    /// The `watchdog` is valid only for this iteration; do not retain it.
    /// The `state` handle refers to the same container on every invocation
    /// within a run.
    async fn run(
        &self,
        watchdog: Watchdog,
        state: SharedState<Self::State>,
    ) -> Result<Self::Output, HandlerError>;
}
