//! # Shared scratch state carried across iterations.
//!
//! [`SharedState`] is the one mutable container a run threads through every
//! handler invocation. It exists purely so handlers can carry accumulated
//! context between iterations (a cursor, a cache, a high-water mark) without
//! external storage.
//!
//! ## Rules
//! - Created fresh (`S::default()`) at every `start()`; one run never
//!   observes another run's state.
//! - The same container instance is handed to every iteration of a run:
//!   mutations made in iteration *n* are visible in iteration *n + 1*.
//! - The scheduler itself never reads or writes it.
//! - Access is serialized by construction: at most one handler invocation is
//!   in flight at a time.

use std::sync::{Arc, Mutex, MutexGuard};

/// Cloneable handle to a run's mutable scratch state.
///
/// Handlers receive a handle each invocation and access the state through
/// [`SharedState::with`]:
///
/// ```
/// use watchloop::SharedState;
///
/// #[derive(Default)]
/// struct Cursor {
///     offset: u64,
/// }
///
/// let state: SharedState<Cursor> = SharedState::fresh();
/// state.with(|s| s.offset = 42);
/// assert_eq!(state.with(|s| s.offset), 42);
/// ```
#[derive(Debug)]
pub struct SharedState<S> {
    inner: Arc<Mutex<S>>,
}

impl<S> Clone for SharedState<S> {
    fn clone(&self) -> Self {
        Self {
            inner: Arc::clone(&self.inner),
        }
    }
}

impl<S: Default> SharedState<S> {
    /// Creates a fresh, empty state container.
    pub fn fresh() -> Self {
        Self {
            inner: Arc::new(Mutex::new(S::default())),
        }
    }
}

impl<S> SharedState<S> {
    /// Runs `f` with exclusive access to the state and returns its result.
    ///
    /// Do not await inside `f`; the lock is synchronous. Handler execution is
    /// serial, so the lock is uncontended in practice.
    pub fn with<R>(&self, f: impl FnOnce(&mut S) -> R) -> R {
        f(&mut self.lock())
    }

    /// Replaces the state wholesale, returning the previous value.
    pub fn replace(&self, value: S) -> S {
        std::mem::replace(&mut *self.lock(), value)
    }

    fn lock(&self) -> MutexGuard<'_, S> {
        // A handler that panicked mid-mutation poisons the mutex; the state
        // is still usable for the remaining iterations.
        self.inner
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
