//! # Loop driver: the scheduler's iteration loop and termination policy.
//!
//! [`LoopDriver`] owns one run from the first iteration to the terminal
//! `Stopped` event. For each pass it executes a guarded iteration via
//! [`run_once`], reports to the monitor, updates the shared counters, and
//! applies the termination policy:
//!
//! ```text
//! loop {
//!   ├─► run_once()  (events: IterationStart → Success/Failure → Complete)
//!   ├─► monitor.report(sample)
//!   ├─► failure_count ≥ max_failures ──► Error (fatal) ──► break Err(Aborted)
//!   ├─► iteration_count ≥ max_iterations ──► Completed ──► break Ok
//!   ├─► stop requested ──► break Ok
//!   └─► sleep(wait_time)  (cancellable)
//! }
//! Stopped
//! ```
//!
//! ## Rules
//! - At least one iteration runs per start; the stop check follows the
//!   iteration, never precedes the first one.
//! - The fatal path takes precedence: when the failure threshold and the
//!   iteration cap are crossed by the same iteration, `Error` is emitted and
//!   `Completed` is not.
//! - A fatal `Error` with zero bus receivers panics the loop task instead of
//!   vanishing; `Scheduler::stop`/`join` re-raise the panic.

use std::sync::atomic::{AtomicBool, AtomicU64, Ordering as AtomicOrdering};
use std::sync::Arc;

use tokio::time;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::runner::{run_once, IterationReport};
use crate::error::{IterationError, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::handlers::Handler;
use crate::monitor::{IterationSample, IterationStatus, Monitor};
use crate::state::SharedState;

/// Observable run state shared between the scheduler handle and its loop
/// task. Counters reset on every fresh start and never reset mid-run.
#[derive(Debug, Default)]
pub(crate) struct Counters {
    running: AtomicBool,
    iterations: AtomicU64,
    failures: AtomicU64,
}

impl Counters {
    pub fn new() -> Self {
        Self::default()
    }

    /// Marks a fresh run: counters zeroed, running set.
    pub fn begin_run(&self) {
        self.iterations.store(0, AtomicOrdering::Relaxed);
        self.failures.store(0, AtomicOrdering::Relaxed);
        self.running.store(true, AtomicOrdering::Release);
    }

    pub fn end_run(&self) {
        self.running.store(false, AtomicOrdering::Release);
    }

    pub fn is_running(&self) -> bool {
        self.running.load(AtomicOrdering::Acquire)
    }

    pub fn iterations(&self) -> u64 {
        self.iterations.load(AtomicOrdering::Relaxed)
    }

    pub fn failures(&self) -> u64 {
        self.failures.load(AtomicOrdering::Relaxed)
    }

    fn record_iteration(&self) -> u64 {
        self.iterations.fetch_add(1, AtomicOrdering::Relaxed) + 1
    }

    fn record_failure(&self) -> u64 {
        self.failures.fetch_add(1, AtomicOrdering::Relaxed) + 1
    }
}

/// Drives the iteration loop of one run.
pub(crate) struct LoopDriver<H: Handler> {
    pub cfg: Config,
    pub handler: Arc<H>,
    pub bus: Bus<H::Output>,
    pub monitor: Option<Arc<dyn Monitor>>,
    pub counters: Arc<Counters>,
}

impl<H: Handler> LoopDriver<H> {
    /// Runs until a termination condition or cancellation, then emits
    /// `Stopped`. The returned outcome is what `Scheduler::stop`/`join`
    /// hand to the caller.
    pub async fn run(self, stop: CancellationToken) -> Result<(), RuntimeError> {
        let state: SharedState<H::State> = SharedState::fresh();

        let outcome = loop {
            let iteration = self.counters.iterations() + 1;
            let report =
                run_once(self.handler.as_ref(), &self.cfg, &state, iteration, &self.bus).await;

            self.report_to_monitor(iteration, &report).await;

            let failures = match &report.result {
                Ok(_) => self.counters.failures(),
                Err(_) => self.counters.record_failure(),
            };
            self.counters.record_iteration();

            if let Err(cause) = &report.result {
                if failures >= self.cfg.max_failures {
                    break Err(self.go_fatal(iteration, failures, cause.clone()));
                }
            }

            if let Some(max) = self.cfg.max_iterations {
                if iteration >= max {
                    self.bus
                        .publish(Event::new(EventKind::Completed).with_iteration(iteration));
                    break Ok(());
                }
            }

            if stop.is_cancelled() {
                break Ok(());
            }
            tokio::select! {
                _ = stop.cancelled() => break Ok(()),
                _ = time::sleep(self.cfg.wait_time) => {}
            }
        };

        self.counters.end_run();
        self.bus.publish(Event::new(EventKind::Stopped));
        outcome
    }

    /// Emits the fatal `Error` event and builds the `Aborted` outcome.
    ///
    /// Panics when nobody is subscribed: a permanently-failing background
    /// loop must not die silently.
    fn go_fatal(&self, iteration: u64, failures: u64, cause: IterationError) -> RuntimeError {
        let aborted = RuntimeError::Aborted {
            failures,
            threshold: self.cfg.max_failures,
            cause: cause.clone(),
        };
        if self.bus.receiver_count() == 0 {
            self.counters.end_run();
            panic!("watchloop: fatal error with no subscribers: {aborted}");
        }
        self.bus.publish(
            Event::new(EventKind::Error)
                .with_iteration(iteration)
                .with_error(cause),
        );
        aborted
    }

    async fn report_to_monitor(&self, iteration: u64, report: &IterationReport<H::Output>) {
        let Some(monitor) = &self.monitor else {
            return;
        };
        let sample = match &report.result {
            Ok(_) => IterationSample {
                status: IterationStatus::Success,
                iteration,
                duration: report.duration,
                error: None,
            },
            Err(err) => IterationSample {
                status: IterationStatus::Failure,
                iteration,
                duration: report.duration,
                error: Some(err.to_string()),
            },
        };
        monitor.report(sample).await;
    }
}
