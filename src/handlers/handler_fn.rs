//! # Function-backed handler (`HandlerFn`)
//!
//! [`HandlerFn`] wraps a closure `F: Fn(Watchdog, SharedState<S>) -> Fut`,
//! producing a fresh future per iteration. Each invocation creates a new
//! future owning its locals; context meant to outlive an iteration belongs
//! in the [`SharedState`] container.

use std::borrow::Cow;
use std::future::Future;
use std::marker::PhantomData;

use async_trait::async_trait;

use crate::core::Watchdog;
use crate::error::HandlerError;
use crate::handlers::Handler;
use crate::state::SharedState;

/// Function-backed handler implementation.
///
/// # Example
/// ```
/// use watchloop::{HandlerError, HandlerFn, SharedState, Watchdog};
///
/// let handler = HandlerFn::new("sweep", |_wd: Watchdog, state: SharedState<u64>| async move {
///     let n = state.with(|count| {
///         *count += 1;
///         *count
///     });
///     Ok::<_, HandlerError>(n)
/// });
/// ```
#[derive(Debug)]
pub struct HandlerFn<S, T, F> {
    name: Cow<'static, str>,
    f: F,
    _marker: PhantomData<fn(SharedState<S>) -> T>,
}

impl<S, T, F> HandlerFn<S, T, F> {
    /// Creates a new function-backed handler.
    pub fn new<Fut>(name: impl Into<Cow<'static, str>>, f: F) -> Self
    where
        F: Fn(Watchdog, SharedState<S>) -> Fut,
        Fut: Future<Output = Result<T, HandlerError>>,
    {
        Self {
            name: name.into(),
            f,
            _marker: PhantomData,
        }
    }
}

#[async_trait]
impl<S, T, F, Fut> Handler for HandlerFn<S, T, F>
where
    F: Fn(Watchdog, SharedState<S>) -> Fut + Send + Sync + 'static, // Fn, not FnMut
    Fut: Future<Output = Result<T, HandlerError>> + Send + 'static,
    S: Default + Send + 'static,
    T: Clone + Send + Sync + 'static,
{
    type State = S;
    type Output = T;

    fn name(&self) -> &str {
        &self.name
    }

    async fn run(
        &self,
        watchdog: Watchdog,
        state: SharedState<Self::State>,
    ) -> Result<Self::Output, HandlerError> {
        (self.f)(watchdog, state).await
    }
}
