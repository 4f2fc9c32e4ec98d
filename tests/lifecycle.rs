//! End-to-end lifecycle tests: event ordering, termination policy, deadline
//! classification, and shared-state semantics.
//!
//! All tests run under the paused tokio clock, so every timing below is
//! virtual and deterministic.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::broadcast;
use tokio::time;

use watchloop::{
    Config, Event, EventKind, HandlerError, HandlerFn, IterationError, IterationSample,
    IterationStatus, Monitor, RuntimeError, Scheduler, SharedState, Watchdog,
};

fn ms(n: u64) -> Duration {
    Duration::from_millis(n)
}

/// Drains every buffered event and returns the kinds in emission order.
fn drain_kinds<T: Clone + Send + 'static>(rx: &mut broadcast::Receiver<Event<T>>) -> Vec<EventKind> {
    drain(rx).into_iter().map(|ev| ev.kind).collect()
}

fn drain<T: Clone + Send + 'static>(rx: &mut broadcast::Receiver<Event<T>>) -> Vec<Event<T>> {
    let mut events = Vec::new();
    while let Ok(ev) = rx.try_recv() {
        events.push(ev);
    }
    events
}

/// No two `IterationStart` events without an intervening `IterationComplete`.
fn assert_serial(kinds: &[EventKind]) {
    let mut in_flight = false;
    for kind in kinds {
        match kind {
            EventKind::IterationStart => {
                assert!(!in_flight, "overlapping iterations in {kinds:?}");
                in_flight = true;
            }
            EventKind::IterationComplete => {
                assert!(in_flight, "IterationComplete without start in {kinds:?}");
                in_flight = false;
            }
            _ => {}
        }
    }
    assert!(!in_flight, "run ended mid-iteration in {kinds:?}");
}

#[tokio::test(start_paused = true)]
async fn runs_until_stopped() {
    let count = Arc::new(AtomicU64::new(0));
    let seen = Arc::clone(&count);
    let handler = HandlerFn::new("tick", move |_wd: Watchdog, _state: SharedState<()>| {
        let seen = Arc::clone(&seen);
        async move {
            seen.fetch_add(1, Ordering::Relaxed);
            Ok::<_, HandlerError>(())
        }
    });

    let sched = Scheduler::new(Config::new(ms(1000), ms(3000)), handler).unwrap();
    let mut rx = sched.subscribe();

    sched.start().await.unwrap();
    // Iterations land at t = 0, 1000, 2000, 3000, 4000.
    time::sleep(ms(4500)).await;

    assert_eq!(count.load(Ordering::Relaxed), 5);
    assert_eq!(sched.iteration_count(), 5);
    assert!(sched.is_running());

    sched.stop().await.unwrap();
    assert!(!sched.is_running());

    let kinds = drain_kinds(&mut rx);
    assert_serial(&kinds);
    assert_eq!(kinds.first(), Some(&EventKind::Started));
    assert_eq!(kinds.last(), Some(&EventKind::Stopped));
    assert_eq!(
        kinds
            .iter()
            .filter(|k| **k == EventKind::IterationSuccess)
            .count(),
        5
    );
    assert!(!kinds.contains(&EventKind::Completed));
    assert!(!kinds.contains(&EventKind::Error));
}

#[tokio::test(start_paused = true)]
async fn completes_after_max_iterations() {
    let handler = HandlerFn::new("tick", |_wd: Watchdog, state: SharedState<u64>| async move {
        Ok::<_, HandlerError>(state.with(|n| {
            *n += 1;
            *n
        }))
    });

    let cfg = Config::new(ms(10), ms(3000)).with_max_iterations(5);
    let sched = Scheduler::new(cfg, handler).unwrap();
    let mut rx = sched.subscribe();

    sched.start().await.unwrap();
    sched.join().await.unwrap();

    assert!(!sched.is_running());
    assert_eq!(sched.iteration_count(), 5);
    assert_eq!(sched.failure_count(), 0);

    let events = drain(&mut rx);
    let kinds: Vec<_> = events.iter().map(|ev| ev.kind).collect();
    assert_serial(&kinds);
    assert_eq!(kinds[kinds.len() - 2..], [EventKind::Completed, EventKind::Stopped]);

    // Success events carry the handler's result.
    let values: Vec<_> = events
        .iter()
        .filter(|ev| ev.kind == EventKind::IterationSuccess)
        .map(|ev| ev.value.unwrap())
        .collect();
    assert_eq!(values, vec![1, 2, 3, 4, 5]);
}

#[tokio::test(start_paused = true)]
async fn watchdog_expiry_is_classified_distinctly() {
    let handler = HandlerFn::new("slow", |_wd: Watchdog, _state: SharedState<()>| async {
        time::sleep(ms(2000)).await;
        Ok::<_, HandlerError>(())
    });

    let cfg = Config::new(ms(1000), ms(5000))
        .with_watchdog_time(ms(1000))
        .with_max_failures(1);
    let sched = Scheduler::new(cfg, handler).unwrap();
    let mut rx = sched.subscribe();

    sched.start().await.unwrap();
    let outcome = sched.join().await;

    let Err(RuntimeError::Aborted { failures, cause, .. }) = outcome else {
        panic!("expected fatal abort, got {outcome:?}");
    };
    assert_eq!(failures, 1);
    assert!(matches!(cause, IterationError::WatchdogExpired { .. }));
    assert!(cause.to_string().contains("watchdog exceeded"));
    assert!(!cause.to_string().contains("maximum allowed time"));

    let kinds = drain_kinds(&mut rx);
    assert_eq!(
        kinds,
        vec![
            EventKind::Started,
            EventKind::IterationStart,
            EventKind::IterationFailure,
            EventKind::IterationComplete,
            EventKind::Error,
            EventKind::Stopped,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn hard_deadline_survives_watchdog_stop() {
    let handler = HandlerFn::new("hang", |wd: Watchdog, _state: SharedState<()>| async move {
        wd.stop();
        time::sleep(ms(5000)).await;
        Ok::<_, HandlerError>(())
    });

    let cfg = Config::new(ms(1000), ms(1000)).with_max_failures(1);
    let sched = Scheduler::new(cfg, handler).unwrap();
    let _rx = sched.subscribe();

    sched.start().await.unwrap();
    let outcome = sched.join().await;

    let Err(RuntimeError::Aborted { cause, .. }) = outcome else {
        panic!("expected fatal abort, got {outcome:?}");
    };
    assert!(matches!(cause, IterationError::MaxTimeExceeded { .. }));
    assert!(cause.to_string().contains("maximum allowed time"));
}

#[tokio::test(start_paused = true)]
async fn handler_failure_is_not_fatal_below_threshold() {
    let handler = HandlerFn::new("flaky", |_wd: Watchdog, _state: SharedState<()>| async {
        Err::<(), _>(HandlerError::new("uhoh"))
    });

    let cfg = Config::new(ms(1000), ms(1000)).with_max_failures(100);
    let sched = Scheduler::new(cfg, handler).unwrap();
    let mut rx = sched.subscribe();

    sched.start().await.unwrap();
    time::sleep(ms(100)).await; // one iteration done, loop in wait_time
    sched.stop().await.unwrap();

    assert_eq!(sched.failure_count(), 1);
    let events = drain(&mut rx);
    let failure = events
        .iter()
        .find(|ev| ev.kind == EventKind::IterationFailure)
        .expect("no IterationFailure emitted");
    assert_eq!(failure.error.as_ref().unwrap().to_string(), "uhoh");
    assert!(!events.iter().any(|ev| ev.kind == EventKind::Error));
}

#[tokio::test(start_paused = true)]
async fn fatal_error_carries_handler_message() {
    let handler = HandlerFn::new("broken", |_wd: Watchdog, _state: SharedState<()>| async {
        Err::<(), _>(HandlerError::new("uhoh"))
    });

    let cfg = Config::new(ms(1000), ms(12_000)).with_max_failures(1);
    let sched = Scheduler::new(cfg, handler).unwrap();
    let mut rx = sched.subscribe();

    sched.start().await.unwrap();
    let outcome = sched.join().await;

    let Err(RuntimeError::Aborted {
        failures,
        threshold,
        cause,
    }) = outcome
    else {
        panic!("expected fatal abort, got {outcome:?}");
    };
    assert_eq!((failures, threshold), (1, 1));
    assert_eq!(cause.to_string(), "uhoh");

    let kinds = drain_kinds(&mut rx);
    assert_eq!(
        kinds
            .iter()
            .filter(|k| **k == EventKind::IterationFailure)
            .count(),
        1
    );
    assert_eq!(
        kinds[kinds.len() - 2..],
        [EventKind::Error, EventKind::Stopped]
    );
}

#[tokio::test(start_paused = true)]
async fn too_quick_success_is_a_failure() {
    let handler = HandlerFn::new("hasty", |wd: Watchdog, _state: SharedState<()>| async move {
        wd.stop();
        time::sleep(ms(100)).await;
        Ok::<_, HandlerError>(1u32)
    });

    let cfg = Config::new(ms(1000), ms(12_000))
        .with_min_iteration_time(ms(10_000))
        .with_max_failures(1);
    let sched = Scheduler::new(cfg, handler).unwrap();
    let mut rx = sched.subscribe();

    sched.start().await.unwrap();
    let outcome = sched.join().await;

    let Err(RuntimeError::Aborted { cause, .. }) = outcome else {
        panic!("expected fatal abort, got {outcome:?}");
    };
    assert!(matches!(cause, IterationError::TooQuick { .. }));
    assert!(cause.to_string().contains("too quickly"));

    let kinds = drain_kinds(&mut rx);
    assert!(kinds.contains(&EventKind::IterationFailure));
    assert!(!kinds.contains(&EventKind::IterationSuccess));
}

#[tokio::test(start_paused = true)]
async fn mixed_results_complete_normally() {
    let calls = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&calls);
    let handler = HandlerFn::new("mixed", move |_wd: Watchdog, _state: SharedState<()>| {
        let counter = Arc::clone(&counter);
        async move {
            if counter.fetch_add(1, Ordering::Relaxed) % 2 == 0 {
                Err(HandlerError::new("even, so failing"))
            } else {
                Ok("odd, so working")
            }
        }
    });

    let cfg = Config::new(ms(1000), ms(3000))
        .with_max_iterations(6)
        .with_max_failures(5);
    let sched = Scheduler::new(cfg, handler).unwrap();
    let mut rx = sched.subscribe();

    sched.start().await.unwrap();
    sched.join().await.unwrap();

    assert_eq!(sched.iteration_count(), 6);
    assert_eq!(sched.failure_count(), 3);

    let kinds = drain_kinds(&mut rx);
    let mut expected = vec![EventKind::Started];
    for i in 0..6 {
        expected.push(EventKind::IterationStart);
        expected.push(if i % 2 == 0 {
            EventKind::IterationFailure
        } else {
            EventKind::IterationSuccess
        });
        expected.push(EventKind::IterationComplete);
    }
    expected.push(EventKind::Completed);
    expected.push(EventKind::Stopped);
    assert_eq!(kinds, expected);
}

#[tokio::test(start_paused = true)]
async fn scratch_state_persists_within_a_run_and_resets_between_runs() {
    let observed: Arc<Mutex<Vec<Vec<String>>>> = Arc::new(Mutex::new(Vec::new()));
    let log = Arc::clone(&observed);
    let handler = HandlerFn::new(
        "cursor",
        move |_wd: Watchdog, state: SharedState<Vec<String>>| {
            let log = Arc::clone(&log);
            async move {
                state.with(|items| {
                    log.lock().unwrap().push(items.clone());
                    items.push("x".to_string());
                });
                Ok::<_, HandlerError>(())
            }
        },
    );

    let cfg = Config::new(ms(10), ms(3000))
        .with_max_iterations(2)
        .with_max_failures(1);
    let sched = Scheduler::new(cfg, handler).unwrap();
    let _rx = sched.subscribe();

    sched.start().await.unwrap();
    sched.join().await.unwrap();

    // Second run gets a fresh container.
    sched.start().await.unwrap();
    sched.join().await.unwrap();

    let runs = observed.lock().unwrap();
    assert_eq!(
        *runs,
        vec![
            vec![],
            vec!["x".to_string()],
            vec![],
            vec!["x".to_string()],
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn stop_right_after_start_still_runs_one_iteration() {
    let handler = HandlerFn::new("once", |_wd: Watchdog, _state: SharedState<()>| async {
        Ok::<_, HandlerError>(())
    });

    let sched = Scheduler::new(Config::new(ms(1000), ms(3000)), handler).unwrap();
    let mut rx = sched.subscribe();

    sched.start().await.unwrap();
    sched.stop().await.unwrap();

    let kinds = drain_kinds(&mut rx);
    assert_eq!(
        kinds,
        vec![
            EventKind::Started,
            EventKind::IterationStart,
            EventKind::IterationSuccess,
            EventKind::IterationComplete,
            EventKind::Stopped,
        ]
    );

    // A second stop on an idle scheduler is a no-op.
    sched.stop().await.unwrap();
}

#[tokio::test(start_paused = true)]
async fn single_iteration_cap_emits_completed() {
    let handler = HandlerFn::new("once", |_wd: Watchdog, _state: SharedState<()>| async {
        Ok::<_, HandlerError>(())
    });

    let cfg = Config::new(ms(1000), ms(3000)).with_max_iterations(1);
    let sched = Scheduler::new(cfg, handler).unwrap();
    let mut rx = sched.subscribe();

    sched.start().await.unwrap();
    sched.join().await.unwrap();

    let kinds = drain_kinds(&mut rx);
    assert_eq!(
        kinds,
        vec![
            EventKind::Started,
            EventKind::IterationStart,
            EventKind::IterationSuccess,
            EventKind::IterationComplete,
            EventKind::Completed,
            EventKind::Stopped,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn fatal_takes_precedence_over_completed() {
    let handler = HandlerFn::new("doomed", |_wd: Watchdog, _state: SharedState<()>| async {
        Err::<(), _>(HandlerError::new("hi"))
    });

    // Both the failure threshold and the iteration cap are crossed by the
    // same iteration; the fatal path wins and Completed is never emitted.
    let cfg = Config::new(ms(1000), ms(3000))
        .with_max_iterations(1)
        .with_max_failures(1);
    let sched = Scheduler::new(cfg, handler).unwrap();
    let mut rx = sched.subscribe();

    sched.start().await.unwrap();
    let outcome = sched.join().await;
    assert!(matches!(outcome, Err(RuntimeError::Aborted { .. })));

    let kinds = drain_kinds(&mut rx);
    assert_eq!(
        kinds,
        vec![
            EventKind::Started,
            EventKind::IterationStart,
            EventKind::IterationFailure,
            EventKind::IterationComplete,
            EventKind::Error,
            EventKind::Stopped,
        ]
    );
}

#[tokio::test(start_paused = true)]
async fn unobserved_fatal_panics_the_loop() {
    let handler = HandlerFn::new("silent", |_wd: Watchdog, _state: SharedState<()>| async {
        Err::<(), _>(HandlerError::new("nobody listens"))
    });

    let cfg = Config::new(ms(1000), ms(3000)).with_max_failures(1);
    // No subscriber on purpose.
    let sched = Arc::new(Scheduler::new(cfg, handler).unwrap());

    sched.start().await.unwrap();
    let joiner = Arc::clone(&sched);
    let result = tokio::spawn(async move { joiner.join().await }).await;
    assert!(result.unwrap_err().is_panic());
}

#[tokio::test(start_paused = true)]
async fn double_start_is_rejected() {
    let handler = HandlerFn::new("tick", |_wd: Watchdog, _state: SharedState<()>| async {
        Ok::<_, HandlerError>(())
    });

    let sched = Scheduler::new(Config::new(ms(1000), ms(3000)), handler).unwrap();
    let _rx = sched.subscribe();

    sched.start().await.unwrap();
    assert_eq!(sched.start().await, Err(RuntimeError::AlreadyRunning));
    sched.stop().await.unwrap();

    // Quiescent again: restart is allowed.
    sched.start().await.unwrap();
    sched.stop().await.unwrap();
}

struct Recorder {
    samples: Mutex<Vec<IterationSample>>,
}

#[async_trait::async_trait]
impl Monitor for Recorder {
    async fn report(&self, sample: IterationSample) {
        self.samples.lock().unwrap().push(sample);
    }
}

#[tokio::test(start_paused = true)]
async fn monitor_receives_one_sample_per_iteration() {
    let calls = Arc::new(AtomicU64::new(0));
    let counter = Arc::clone(&calls);
    let handler = HandlerFn::new("mixed", move |_wd: Watchdog, _state: SharedState<()>| {
        let counter = Arc::clone(&counter);
        async move {
            if counter.fetch_add(1, Ordering::Relaxed) == 2 {
                Err(HandlerError::new("hiccup"))
            } else {
                Ok(())
            }
        }
    });

    let recorder = Arc::new(Recorder {
        samples: Mutex::new(Vec::new()),
    });
    let cfg = Config::new(ms(10), ms(3000)).with_max_iterations(5);
    let sched = Scheduler::new(cfg, handler)
        .unwrap()
        .with_monitor(Arc::clone(&recorder) as Arc<dyn Monitor>);
    let _rx = sched.subscribe();

    sched.start().await.unwrap();
    sched.join().await.unwrap();

    let samples = recorder.samples.lock().unwrap();
    assert_eq!(samples.len(), 5);
    let statuses: Vec<_> = samples.iter().map(|s| s.status.as_str()).collect();
    assert_eq!(
        statuses,
        vec!["success", "success", "failure", "success", "success"]
    );
    assert_eq!(samples[2].error.as_deref(), Some("hiccup"));
    assert!(samples
        .iter()
        .enumerate()
        .all(|(i, s)| s.iteration == i as u64 + 1));
    assert!(samples
        .iter()
        .all(|s| s.status == IterationStatus::Success || s.error.is_some()));
}
