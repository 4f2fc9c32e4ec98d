//! # watchloop
//!
//! **watchloop** is a watchdog-guarded iteration scheduler for long-lived
//! background loops: lease reapers, pool provisioners, expiry sweeps — any
//! process that must run possibly slow or hanging work repeatedly and
//! safely.
//!
//! It runs a user-supplied [`Handler`] in a serial loop, enforces two
//! independent timing ceilings per iteration, accumulates failures into a
//! fatal-abort decision, and reports every state transition on a broadcast
//! event bus with a precise, race-free ordering contract.
//!
//! ## Architecture
//! ### Overview
//! ```text
//!     ┌────────────────┐      ┌───────────────────┐
//!     │     Config     │      │      Handler      │
//!     │ (timings, caps)│      │ (user iteration)  │
//!     └───────┬────────┘      └─────────┬─────────┘
//!             ▼                         ▼
//! ┌───────────────────────────────────────────────────────────┐
//! │  Scheduler (loop orchestrator)                            │
//! │  - Bus (broadcast lifecycle events)                       │
//! │  - Counters (running / iterations / failures)             │
//! │  - SharedState (scratch container, one per run)           │
//! └───────┬───────────────────────────────────────┬───────────┘
//!         ▼ per iteration                         ▼
//!     ┌────────────────────────────┐       ┌──────────────┐
//!     │ Watchdog (soft deadline,   │       │   Monitor    │
//!     │ touch/stop by the handler) │       │ (per-iter    │
//!     │ + hard deadline (fixed)    │       │  samples)    │
//!     └────────────────────────────┘       └──────────────┘
//! ```
//!
//! ### Lifecycle
//! ```text
//! start() ──► Started
//!
//! loop {
//!   ├─► IterationStart
//!   ├─► race: handler | hard deadline | watchdog
//!   │       ├─ Ok (≥ min_iteration_time) ──► IterationSuccess(value)
//!   │       └─ failure                   ──► IterationFailure(error)
//!   ├─► IterationComplete, monitor sample
//!   ├─► failures ≥ max_failures   ──► Error (fatal)  ─► exit
//!   ├─► iterations ≥ max_iterations ─► Completed     ─► exit
//!   ├─► stop() requested                             ─► exit
//!   └─► sleep(wait_time)
//! }
//!
//! exit ──► Stopped   (stop()/join() return the run outcome)
//! ```
//!
//! ## Features
//! | Area            | Description                                              | Key types / traits                  |
//! |-----------------|----------------------------------------------------------|-------------------------------------|
//! | **Scheduling**  | Serial iteration loop with wait/ceiling/floor timings.   | [`Scheduler`], [`Config`]           |
//! | **Watchdog**    | Per-iteration soft deadline the handler touches/stops.   | [`Watchdog`]                        |
//! | **Handlers**    | Units of work as traits or closures.                     | [`Handler`], [`HandlerFn`]          |
//! | **Events**      | Fixed-vocabulary lifecycle stream with total ordering.   | [`Event`], [`EventKind`], [`Bus`]   |
//! | **State**       | Mutable scratch container persisted across iterations.   | [`SharedState`]                     |
//! | **Errors**      | Typed failure taxonomy and run outcomes.                 | [`IterationError`], [`RuntimeError`]|
//! | **Monitoring**  | Per-iteration success/failure samples.                   | [`Monitor`], [`IterationSample`]    |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] monitor _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::time::Duration;
//! use watchloop::{Config, EventKind, HandlerError, HandlerFn, Scheduler, SharedState, Watchdog};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let cfg = Config::new(Duration::from_millis(50), Duration::from_secs(5))
//!         .with_max_iterations(2)
//!         .with_max_failures(3);
//!
//!     let handler = HandlerFn::new("sweep", |wd: Watchdog, state: SharedState<u64>| async move {
//!         wd.touch(); // prove liveness before slow work
//!         let swept = state.with(|cursor| {
//!             *cursor += 10;
//!             *cursor
//!         });
//!         Ok::<_, HandlerError>(swept)
//!     });
//!
//!     let sched = Scheduler::new(cfg, handler)?;
//!     let mut events = sched.subscribe();
//!
//!     sched.start().await?;
//!     sched.join().await?;
//!
//!     let last = std::iter::from_fn(|| events.try_recv().ok()).last().unwrap();
//!     assert_eq!(last.kind, EventKind::Stopped);
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod handlers;
mod monitor;
mod state;

// ---- Public re-exports ----

pub use config::{Config, DEFAULT_BUS_CAPACITY, DEFAULT_MAX_FAILURES};
pub use crate::core::{Scheduler, Watchdog};
pub use error::{ConfigError, HandlerError, IterationError, RuntimeError};
pub use events::{Bus, Event, EventKind};
pub use handlers::{Handler, HandlerFn};
pub use monitor::{IterationSample, IterationStatus, Monitor};
pub use state::SharedState;

// Optional: expose a simple built-in logging monitor (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use monitor::LogWriter;
