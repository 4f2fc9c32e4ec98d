//! # Scheduler: the public handle around the iteration loop.
//!
//! [`Scheduler`] wires a [`Config`] and a [`Handler`] to a loop task,
//! exposes the lifecycle event stream, and owns the start/stop/join control
//! surface.
//!
//! ## Architecture
//! ```text
//!   Scheduler (handle)                       loop task (spawned)
//!   ├─ start() ── Started ── spawn ────────► LoopDriver::run
//!   ├─ stop()  ── cancel ── join ──┐            │ run_once per iteration
//!   ├─ join()  ──────────── join ──┤            │ Watchdog + hard deadline
//!   ├─ subscribe() ◄── Bus ◄───────┴────────────┘ events
//!   └─ is_running()/iteration_count()/failure_count() ◄── Counters
//! ```
//!
//! ## Lifecycle
//! `Idle → Running → {Completing | Erroring} → Stopped`. Idle and Stopped
//! are equivalent quiescent states: a stopped scheduler can be started
//! again, with fresh counters and fresh scratch state.

use std::sync::Arc;

use tokio::sync::{broadcast, Mutex};
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::config::Config;
use crate::core::driver::{Counters, LoopDriver};
use crate::error::{ConfigError, RuntimeError};
use crate::events::{Bus, Event, EventKind};
use crate::handlers::Handler;
use crate::monitor::Monitor;

/// One in-flight run: its stop signal and loop task.
struct RunGuard {
    token: CancellationToken,
    task: JoinHandle<Result<(), RuntimeError>>,
}

impl Drop for RunGuard {
    fn drop(&mut self) {
        // An abandoned run winds down instead of looping detached forever.
        self.token.cancel();
    }
}

/// Watchdog-guarded iteration scheduler.
///
/// Repeatedly executes a [`Handler`] with two independent timing ceilings
/// per iteration, classifies every outcome, accumulates failures toward a
/// fatal abort, and reports each state transition on a broadcast event bus.
///
/// ## Fatal errors must be observed
/// When the cumulative failure count reaches `max_failures` the run emits
/// the fatal `Error` event and halts; [`Scheduler::stop`] and
/// [`Scheduler::join`] then return [`RuntimeError::Aborted`]. If the fatal
/// event fires while nobody is subscribed to the bus, the loop task panics
/// with the triggering error rather than dropping it — a misconfigured or
/// permanently-failing background loop must not fail silently. Subscribe a
/// receiver (kept alive for the run) or consume the outcome via
/// `stop`/`join`.
///
/// ## Example
/// ```
/// use std::time::Duration;
/// use watchloop::{Config, HandlerError, HandlerFn, Scheduler, SharedState, Watchdog};
///
/// #[tokio::main(flavor = "current_thread")]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let cfg = Config::new(Duration::from_millis(10), Duration::from_secs(5))
///         .with_max_iterations(3);
///
///     let handler = HandlerFn::new("count", |_wd: Watchdog, state: SharedState<u64>| async move {
///         let n = state.with(|count| {
///             *count += 1;
///             *count
///         });
///         Ok::<_, HandlerError>(n)
///     });
///
///     let sched = Scheduler::new(cfg, handler)?;
///     let mut events = sched.subscribe();
///
///     sched.start().await?;
///     sched.join().await?;
///
///     assert_eq!(sched.iteration_count(), 3);
///     while let Ok(ev) = events.try_recv() {
///         println!("{:?} seq={}", ev.kind, ev.seq);
///     }
///     Ok(())
/// }
/// ```
pub struct Scheduler<H: Handler> {
    cfg: Config,
    handler: Arc<H>,
    bus: Bus<H::Output>,
    monitor: Option<Arc<dyn Monitor>>,
    counters: Arc<Counters>,
    run: Mutex<Option<RunGuard>>,
}

impl<H: Handler> Scheduler<H> {
    /// Creates a scheduler from a validated configuration and a handler.
    pub fn new(cfg: Config, handler: H) -> Result<Self, ConfigError> {
        cfg.validate()?;
        let bus = Bus::new(cfg.bus_capacity_clamped());
        Ok(Self {
            cfg,
            handler: Arc::new(handler),
            bus,
            monitor: None,
            counters: Arc::new(Counters::new()),
            run: Mutex::new(None),
        })
    }

    /// Attaches an external metrics/log collaborator, reported to after
    /// every iteration.
    pub fn with_monitor(mut self, monitor: Arc<dyn Monitor>) -> Self {
        self.monitor = Some(monitor);
        self
    }

    /// The configuration this scheduler runs with.
    pub fn config(&self) -> &Config {
        &self.cfg
    }

    /// The handler's name, for logs.
    pub fn handler_name(&self) -> &str {
        self.handler.name()
    }

    /// Creates a new independent receiver for lifecycle events.
    ///
    /// Subscribe before [`Scheduler::start`] to observe the full run,
    /// `Started` included.
    pub fn subscribe(&self) -> broadcast::Receiver<Event<H::Output>> {
        self.bus.subscribe()
    }

    /// True between `start()` and the terminal `Stopped` of that run.
    pub fn is_running(&self) -> bool {
        self.counters.is_running()
    }

    /// Iterations completed so far in the current (or last) run.
    pub fn iteration_count(&self) -> u64 {
        self.counters.iterations()
    }

    /// Classified failures accumulated in the current (or last) run.
    pub fn failure_count(&self) -> u64 {
        self.counters.failures()
    }

    /// Starts the iteration loop.
    ///
    /// Rejects with [`RuntimeError::AlreadyRunning`] if a run is in flight.
    /// Resets the iteration and failure counters, discards the previous
    /// run's scratch state, emits `Started`, and returns without waiting
    /// for the loop — the loop runs until a termination condition or
    /// [`Scheduler::stop`].
    ///
    /// Starting anew discards the outcome of a finished, unconsumed run;
    /// call [`Scheduler::stop`] or [`Scheduler::join`] first if you care.
    pub async fn start(&self) -> Result<(), RuntimeError> {
        let mut run = self.run.lock().await;
        if self.counters.is_running() {
            return Err(RuntimeError::AlreadyRunning);
        }

        self.counters.begin_run();
        self.bus.publish(Event::new(EventKind::Started));

        let token = CancellationToken::new();
        let driver = LoopDriver {
            cfg: self.cfg.clone(),
            handler: Arc::clone(&self.handler),
            bus: self.bus.clone(),
            monitor: self.monitor.clone(),
            counters: Arc::clone(&self.counters),
        };
        let task = tokio::spawn(driver.run(token.clone()));
        *run = Some(RunGuard { token, task });
        Ok(())
    }

    /// Requests termination and waits for the run to wind down.
    ///
    /// Cooperative, not preemptive: an in-flight iteration finishes (or hits
    /// its deadlines) first. Once `stop()` resolves, `Stopped` has been
    /// emitted and no further iteration will start. Returns the run's
    /// outcome: `Ok` for an ordinary or completed run,
    /// [`RuntimeError::Aborted`] if the run had gone fatal. A no-op `Ok(())`
    /// when nothing is running.
    pub async fn stop(&self) -> Result<(), RuntimeError> {
        let guard = self.run.lock().await.take();
        let Some(guard) = guard else {
            return Ok(());
        };
        guard.token.cancel();
        Self::settle(guard).await
    }

    /// Waits for the run to terminate on its own (`max_iterations` reached
    /// or fatal abort) and returns its outcome.
    ///
    /// Never resolves for an unbounded run that keeps succeeding; use
    /// [`Scheduler::stop`] for that.
    pub async fn join(&self) -> Result<(), RuntimeError> {
        let guard = self.run.lock().await.take();
        let Some(guard) = guard else {
            return Ok(());
        };
        Self::settle(guard).await
    }

    async fn settle(mut guard: RunGuard) -> Result<(), RuntimeError> {
        match (&mut guard.task).await {
            Ok(outcome) => outcome,
            // An unobserved fatal error panics the loop task; surface it.
            Err(err) if err.is_panic() => std::panic::resume_unwind(err.into_panic()),
            Err(_) => Ok(()),
        }
    }
}
