//! # Per-iteration watchdog: the handler-controllable soft deadline.
//!
//! A [`Watchdog`] is created fresh for every iteration and discarded at
//! iteration end. It exposes the touch/stop control surface to the running
//! handler, while the scheduler internally races the handler against the
//! watchdog's expiry (and against the separate hard deadline, which is a
//! plain timer the handler never sees).
//!
//! ```text
//! Scheduler                       Handler
//!    │  arm(soft deadline)          │
//!    ├──────── Watchdog ───────────►│
//!    │                              ├─ touch()  restart countdown
//!    │◄── expired()  (internal)     ├─ touch()
//!    │                              └─ stop()   disable for the iteration
//! ```
//!
//! ## Rules
//! - `touch()` restarts the countdown from now; long-running handlers call
//!   it periodically to prove liveness.
//! - `stop()` disables the soft deadline for the remainder of the iteration;
//!   a later `touch()` re-arms it (touch is stop-then-start).
//! - Neither call has any effect on the hard deadline.
//! - A `Watchdog` is meaningless outside the iteration that created it; do
//!   not retain it across iterations.

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::watch;
use tokio::time::{self, Instant};

/// Handler-controllable soft-deadline timer for one iteration.
///
/// Cheap to clone; all clones share the same countdown. The countdown is
/// already running when the handler receives the watchdog.
#[derive(Debug, Clone)]
pub struct Watchdog {
    timeout: Duration,
    deadline: Arc<watch::Sender<Option<Instant>>>,
}

impl Watchdog {
    /// Creates a watchdog with the countdown armed at `now + timeout`.
    pub(crate) fn arm(timeout: Duration) -> Self {
        let (tx, _rx) = watch::channel(Some(Instant::now() + timeout));
        Self {
            timeout,
            deadline: Arc::new(tx),
        }
    }

    /// Restarts the countdown from now.
    ///
    /// Re-arms the watchdog even after [`Watchdog::stop`].
    pub fn touch(&self) {
        self.deadline.send_replace(Some(Instant::now() + self.timeout));
    }

    /// Disables the soft deadline for the remainder of the iteration.
    ///
    /// Has no effect on the hard deadline.
    pub fn stop(&self) {
        self.deadline.send_replace(None);
    }

    /// The configured countdown duration.
    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// Resolves when the soft deadline elapses; never resolves while the
    /// watchdog is stopped. Observed only by the scheduler.
    pub(crate) async fn expired(&self) {
        let mut rx = self.deadline.subscribe();
        loop {
            let deadline = *rx.borrow_and_update();
            match deadline {
                Some(at) => {
                    tokio::select! {
                        _ = time::sleep_until(at) => return,
                        _ = rx.changed() => {}
                    }
                }
                None => {
                    if rx.changed().await.is_err() {
                        // Sender gone; cannot expire anymore.
                        std::future::pending::<()>().await;
                    }
                }
            }
        }
    }
}
