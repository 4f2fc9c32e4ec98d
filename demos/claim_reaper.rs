//! Minimal background-loop demo: a mock claim reaper that sweeps expired
//! task leases every 500ms, touching the watchdog while it works.
//!
//! Run with: `cargo run --example claim_reaper --features logging`

use std::time::Duration;

use watchloop::{Config, EventKind, HandlerError, HandlerFn, Scheduler, SharedState, Watchdog};

#[derive(Default)]
struct ReaperState {
    swept_total: u64,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let cfg = Config::new(Duration::from_millis(500), Duration::from_secs(5))
        .with_watchdog_time(Duration::from_secs(2))
        .with_max_iterations(5)
        .with_max_failures(3);

    let handler = HandlerFn::new(
        "claim-reaper",
        |wd: Watchdog, state: SharedState<ReaperState>| async move {
            // Pretend to scan a page of expired claims.
            tokio::time::sleep(Duration::from_millis(50)).await;
            wd.touch();

            let total = state.with(|s| {
                s.swept_total += 3;
                s.swept_total
            });
            Ok::<_, HandlerError>(total)
        },
    );

    let sched = Scheduler::new(cfg, handler)?;
    let mut events = sched.subscribe();

    #[cfg(feature = "logging")]
    let sched = sched.with_monitor(std::sync::Arc::new(watchloop::LogWriter));

    sched.start().await?;
    sched.join().await?;

    while let Ok(ev) = events.try_recv() {
        if ev.kind == EventKind::IterationSuccess {
            println!("swept so far: {:?}", ev.value);
        }
    }
    println!("reaper finished after {} iterations", sched.iteration_count());
    Ok(())
}
