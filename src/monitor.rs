//! # Monitor collaborator for per-iteration health reporting.
//!
//! After every iteration the scheduler reports one [`IterationSample`] to
//! the configured [`Monitor`], so operational dashboards can track loop
//! health. The transport and storage of measurements are owned by the
//! monitoring subsystem; this crate only defines the seam.
//!
//! The `logging` feature ships [`LogWriter`], a stdout demo monitor.

use std::time::Duration;

use async_trait::async_trait;

/// Outcome of one iteration, as reported to the monitor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IterationStatus {
    /// The handler settled successfully within its deadlines and floor.
    Success,
    /// The iteration was classified as failed.
    Failure,
}

impl IterationStatus {
    /// Stable wire-friendly form: `"success"` or `"failure"`.
    pub fn as_str(&self) -> &'static str {
        match self {
            IterationStatus::Success => "success",
            IterationStatus::Failure => "failure",
        }
    }
}

/// One per-iteration measurement.
#[derive(Debug, Clone)]
pub struct IterationSample {
    /// Success or failure.
    pub status: IterationStatus,
    /// 1-based iteration index within the run.
    pub iteration: u64,
    /// Wall-clock duration of the iteration.
    pub duration: Duration,
    /// Display form of the classified error, on failures.
    pub error: Option<String>,
}

/// External metrics/log collaborator.
///
/// Called once after each iteration's `IterationComplete` event, from the
/// scheduler's loop task. Implementations should be quick; a slow monitor
/// delays the next iteration.
#[async_trait]
pub trait Monitor: Send + Sync + 'static {
    /// Records one iteration measurement.
    async fn report(&self, sample: IterationSample);
}

/// Simple stdout logging monitor.
///
/// Enabled via the `logging` feature. Prints one human-readable line per
/// iteration for debugging and demonstration purposes. Not intended for
/// production use — implement a custom [`Monitor`] for structured metrics.
#[cfg(feature = "logging")]
pub struct LogWriter;

#[cfg(feature = "logging")]
#[async_trait]
impl Monitor for LogWriter {
    async fn report(&self, sample: IterationSample) {
        match &sample.error {
            Some(err) => println!(
                "[iteration] n={} status={} duration={:?} err={:?}",
                sample.iteration,
                sample.status.as_str(),
                sample.duration,
                err
            ),
            None => println!(
                "[iteration] n={} status={} duration={:?}",
                sample.iteration,
                sample.status.as_str(),
                sample.duration
            ),
        }
    }
}
