//! # Run a single guarded iteration of a handler.
//!
//! This helper drives one invocation of a [`Handler`], racing it against the
//! two independent deadlines and publishing the per-iteration lifecycle
//! [`Event`]s to the [`Bus`].
//!
//! ```text
//!   IterationStart
//!        ▼
//!   handler.run(watchdog, state) ──┬─ settles Ok   ──► min-time check
//!   sleep(max_iteration_time)    ──┼─ fires        ──► MaxTimeExceeded
//!   watchdog.expired()           ──┴─ fires        ──► WatchdogExpired
//!        ▼
//!   IterationSuccess | IterationFailure
//!        ▼
//!   IterationComplete
//! ```
//!
//! The select is biased: a settled handler always wins, and the hard
//! deadline is polled before the watchdog, so when both deadlines land on
//! the same instant (the default, since `watchdog_time` falls back to
//! `max_iteration_time`) the iteration fails with the hard-deadline error.
//! Losing branches are dropped with the iteration; timers do not accumulate
//! across iterations.

use tokio::time::{self, Instant};

use crate::config::Config;
use crate::core::watchdog::Watchdog;
use crate::error::IterationError;
use crate::events::{Bus, Event, EventKind};
use crate::handlers::Handler;
use crate::state::SharedState;

/// Outcome of one guarded iteration.
pub(crate) struct IterationReport<T> {
    /// The classified result.
    pub result: Result<T, IterationError>,
    /// Wall-clock duration of the iteration.
    pub duration: std::time::Duration,
}

/// Executes one iteration: arms the guards, invokes the handler, classifies
/// the outcome, and publishes `IterationStart`, `IterationSuccess` /
/// `IterationFailure`, and `IterationComplete`.
pub(crate) async fn run_once<H: Handler>(
    handler: &H,
    cfg: &Config,
    state: &SharedState<H::State>,
    iteration: u64,
    bus: &Bus<H::Output>,
) -> IterationReport<H::Output> {
    bus.publish(Event::new(EventKind::IterationStart).with_iteration(iteration));

    let hard_limit = cfg.max_iteration_time;
    let soft_limit = cfg.effective_watchdog_time();

    let started = Instant::now();
    let watchdog = Watchdog::arm(soft_limit);
    let hard = time::sleep(hard_limit);
    tokio::pin!(hard);

    let work = handler.run(watchdog.clone(), state.clone());
    tokio::pin!(work);

    let mut result = tokio::select! {
        biased;
        res = &mut work => res.map_err(IterationError::from),
        _ = &mut hard => Err(IterationError::MaxTimeExceeded { limit: hard_limit }),
        _ = watchdog.expired() => Err(IterationError::WatchdogExpired { limit: soft_limit }),
    };

    let duration = started.elapsed();
    if result.is_ok() {
        if let Some(min) = cfg.min_iteration_time {
            if duration < min {
                result = Err(IterationError::TooQuick {
                    elapsed: duration,
                    min,
                });
            }
        }
    }

    match &result {
        Ok(value) => bus.publish(
            Event::new(EventKind::IterationSuccess)
                .with_iteration(iteration)
                .with_value(value.clone()),
        ),
        Err(err) => bus.publish(
            Event::new(EventKind::IterationFailure)
                .with_iteration(iteration)
                .with_error(err.clone()),
        ),
    }
    bus.publish(Event::new(EventKind::IterationComplete).with_iteration(iteration));

    IterationReport { result, duration }
}
