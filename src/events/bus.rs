//! # Event bus for broadcasting lifecycle events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that carries
//! the scheduler's lifecycle [`Event`]s to any number of observers (tests,
//! operators, supervising code).
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks or awaits.
//! - **Bounded capacity**: a single ring buffer stores recent events.
//! - **Lag handling**: slow receivers observe `RecvError::Lagged(n)` and
//!   skip the `n` oldest items.
//! - **No persistence**: with zero receivers, published events are dropped —
//!   which is why the scheduler checks [`Bus::receiver_count`] before
//!   publishing the fatal `Error` event (an unobserved fatal must not vanish
//!   silently).

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for scheduler lifecycle events.
///
/// Cheap to clone (holds an `Arc`-backed sender). Each receiver only
/// observes events sent after it subscribed, so subscribe before calling
/// `start()` to see the full run.
#[derive(Debug)]
pub struct Bus<T> {
    tx: broadcast::Sender<Event<T>>,
}

impl<T> Clone for Bus<T> {
    fn clone(&self) -> Self {
        Self {
            tx: self.tx.clone(),
        }
    }
}

impl<T: Clone + Send + 'static> Bus<T> {
    /// Creates a new bus with the given channel capacity (clamped to ≥ 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active receivers; drops it when there are
    /// none.
    pub fn publish(&self, ev: Event<T>) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new independent receiver observing subsequent events.
    pub fn subscribe(&self) -> broadcast::Receiver<Event<T>> {
        self.tx.subscribe()
    }

    /// Number of currently active receivers.
    pub fn receiver_count(&self) -> usize {
        self.tx.receiver_count()
    }
}
