use runloop::{
    DispatchTask, DispatchTaskExt, IterationStatus, LoopStatus, ManualTimeProvider,
    RunLoopBackendExecutor, RunLoopBuilder, RunLoopUi, TaskLoop, TimeProvider, Timestamp, once,
};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::thread;
use std::time::Duration;

fn simulated_ui() -> (Arc<RunLoopUi>, Arc<ManualTimeProvider>) {
    let clock = Arc::new(ManualTimeProvider::new());
    let ui = Arc::new(
        RunLoopBuilder::new()
            .name("ui")
            .time_provider(clock.clone())
            .build_ui(),
    );
    (ui, clock)
}

/// Backend that advances the clock by `step` per pass and finishes after `passes` passes.
fn ticking_backend(
    clock: Arc<ManualTimeProvider>,
    step: Duration,
    passes: usize,
    log: Arc<Mutex<Vec<String>>>,
) -> impl FnMut() -> IterationStatus + Send {
    let mut pass = 0;
    move || {
        pass += 1;
        log.lock().unwrap().push(format!("frame {pass}"));
        clock.advance(step);
        if pass >= passes {
            IterationStatus::Done
        } else {
            IterationStatus::Ok
        }
    }
}

fn push(log: &Arc<Mutex<Vec<String>>>, entry: &str) -> impl FnOnce() + Send + 'static {
    let log = log.clone();
    let entry = entry.to_string();
    move || log.lock().unwrap().push(entry)
}

#[test]
fn test_due_tasks_run_before_the_backend_iteration() {
    let (ui, clock) = simulated_ui();
    let log = Arc::new(Mutex::new(Vec::new()));

    ui.post_once(push(&log, "a"));
    ui.post_once(push(&log, "b"));
    ui.post_delayed_once(push(&log, "late"), Duration::from_millis(10));

    ui.set_backend_task(Box::new(ticking_backend(
        clock,
        Duration::from_millis(10),
        2,
        log.clone(),
    )));
    ui.run().unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["a", "b", "frame 1", "late", "frame 2"]
    );
    assert_eq!(ui.status(), LoopStatus::Stopped);
}

#[test]
fn test_delayed_task_waits_for_simulated_deadline() {
    let (ui, clock) = simulated_ui();
    let log = Arc::new(Mutex::new(Vec::new()));

    let handle = ui.post_delayed_once(push(&log, "fired"), Duration::from_millis(50));

    let observed = Arc::new(Mutex::new(Vec::new()));
    {
        let log = log.clone();
        let observed = observed.clone();
        let clock = clock.clone();
        ui.set_backend_task(Box::new(move || {
            observed
                .lock()
                .unwrap()
                .push((clock.now().as_millis(), log.lock().unwrap().len()));
            clock.advance(Duration::from_millis(1));
            if clock.now() > Timestamp::from_millis(51) {
                IterationStatus::Done
            } else {
                IterationStatus::Ok
            }
        }));
    }
    ui.run().unwrap();

    let observed = observed.lock().unwrap();
    // Each entry is (clock during the pass, tasks fired so far).
    assert_eq!(observed[49], (49, 0), "not fired at 49ms");
    assert_eq!(observed[50], (50, 1), "fired during the 50ms pass");
    assert_eq!(log.lock().unwrap().len(), 1);
    assert!(!handle.is_alive());
}

#[test]
fn test_repeating_task_fires_once_per_eligible_pass() {
    let (ui, clock) = simulated_ui();
    let count = Arc::new(AtomicUsize::new(0));
    let log = Arc::new(Mutex::new(Vec::new()));

    let handle = {
        let count = count.clone();
        ui.post_repeating_task(
            Box::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            }),
            3,
            Duration::from_millis(10),
        )
    };

    let seen = Arc::new(Mutex::new(Vec::new()));
    {
        let count = count.clone();
        let seen = seen.clone();
        let mut backend = ticking_backend(clock, Duration::from_millis(10), 4, log);
        ui.set_backend_task(Box::new(move || {
            seen.lock().unwrap().push(count.load(Ordering::SeqCst));
            backend()
        }));
    }
    ui.run().unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![1, 2, 3, 3]);
    assert_eq!(ui.pending_tasks(), 0, "exhausted task leaves the queue");
    assert!(!handle.is_alive());
}

#[test]
fn test_all_eligible_tasks_drain_in_one_pass() {
    let (ui, clock) = simulated_ui();
    let log = Arc::new(Mutex::new(Vec::new()));

    clock.set(Timestamp::from_millis(100));
    for (label, delay) in [("c", 30u64), ("a", 10), ("b", 20), ("d", 40)] {
        ui.post_delayed_once(push(&log, label), Duration::from_millis(delay));
    }
    // Everything except "d" is due at 130ms.
    clock.set(Timestamp::from_millis(130));

    ui.set_backend_task(Box::new(ticking_backend(
        clock,
        Duration::from_millis(10),
        2,
        log.clone(),
    )));
    ui.run().unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["a", "b", "c", "frame 1", "d", "frame 2"]
    );
}

#[test]
fn test_eligibility_uses_one_clock_sample_per_pass() {
    let (ui, clock) = simulated_ui();
    let log = Arc::new(Mutex::new(Vec::new()));

    // The first task moves the clock past the second task's deadline, but
    // the pass keeps using the time sampled when it began.
    {
        let clock = clock.clone();
        let log = log.clone();
        ui.post_once(move || {
            clock.advance(Duration::from_millis(5));
            log.lock().unwrap().push("first".to_string());
        });
    }
    ui.post_delayed_once(push(&log, "second"), Duration::from_millis(5));

    ui.set_backend_task(Box::new(ticking_backend(clock, Duration::ZERO, 2, log.clone())));
    ui.run().unwrap();

    assert_eq!(
        *log.lock().unwrap(),
        vec!["first", "frame 1", "second", "frame 2"]
    );
}

#[test]
fn test_cancelled_task_never_runs() {
    let (ui, clock) = simulated_ui();
    let log = Arc::new(Mutex::new(Vec::new()));

    let handle = ui.post_delayed_once(push(&log, "h"), Duration::from_millis(100));

    {
        let ui_for_cancel = Arc::downgrade(&ui);
        let clock = clock.clone();
        let log = log.clone();
        let mut backend = ticking_backend(clock.clone(), Duration::from_millis(10), 20, log);
        ui.set_backend_task(Box::new(move || {
            if clock.now() == Timestamp::from_millis(10) {
                if let Some(ui) = ui_for_cancel.upgrade() {
                    ui.cancel_task(&handle);
                    ui.cancel_task(&handle);
                }
            }
            backend()
        }));
    }
    ui.run().unwrap();

    assert!(!log.lock().unwrap().iter().any(|entry| entry == "h"));
    assert_eq!(ui.pending_tasks(), 0);
}

#[test]
fn test_backend_done_stops_loop_and_leaves_future_tasks_queued() {
    let (ui, _clock) = simulated_ui();
    let frames = Arc::new(AtomicUsize::new(0));

    ui.post_delayed_once(|| {}, Duration::from_secs(60));
    {
        let frames = frames.clone();
        ui.set_backend_task(Box::new(move || {
            frames.fetch_add(1, Ordering::SeqCst);
            IterationStatus::Done
        }));
    }

    ui.run().unwrap();

    assert_eq!(frames.load(Ordering::SeqCst), 1);
    assert_eq!(ui.status(), LoopStatus::Stopped);
    assert_eq!(ui.pending_tasks(), 1);

    ui.run().unwrap();
    assert_eq!(frames.load(Ordering::SeqCst), 1, "a stopped loop stays stopped");
}

#[test]
fn test_backend_replaced_from_inside_an_iteration() {
    let (ui, _clock) = simulated_ui();
    let log = Arc::new(Mutex::new(Vec::new()));

    {
        let weak_ui = Arc::downgrade(&ui);
        let log = log.clone();
        ui.set_backend_task(Box::new(move || {
            log.lock().unwrap().push("first".to_string());
            if let Some(ui) = weak_ui.upgrade() {
                let log = log.clone();
                ui.set_backend_task(Box::new(move || {
                    log.lock().unwrap().push("second".to_string());
                    IterationStatus::Done
                }));
            }
            IterationStatus::Ok
        }));
    }

    ui.run().unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["first", "second"]);
}

#[test]
fn test_stop_from_task_skips_backend_and_remaining_tasks() {
    let (ui, _clock) = simulated_ui();
    let log = Arc::new(Mutex::new(Vec::new()));

    {
        let weak_ui = Arc::downgrade(&ui);
        ui.post_once(move || {
            if let Some(ui) = weak_ui.upgrade() {
                ui.stop();
            }
        });
    }
    ui.post_once(push(&log, "after stop"));
    ui.set_backend_task(Box::new({
        let log = log.clone();
        move || {
            log.lock().unwrap().push("frame".to_string());
            IterationStatus::Ok
        }
    }));

    ui.run().unwrap();

    assert!(log.lock().unwrap().is_empty());
    assert_eq!(ui.pending_tasks(), 1);
}

#[test]
fn test_without_backend_loop_runs_until_stopped() {
    let ui = Arc::new(RunLoopBuilder::new().name("headless").build_ui());
    let count = Arc::new(AtomicUsize::new(0));

    let driver = {
        let ui = ui.clone();
        thread::spawn(move || ui.run())
    };

    for _ in 0..10 {
        let count = count.clone();
        ui.post_once(move || {
            count.fetch_add(1, Ordering::SeqCst);
        });
    }

    let stopper = ui.clone();
    ui.post_delayed_once(move || stopper.stop(), Duration::from_millis(20));

    driver.join().unwrap().unwrap();

    assert_eq!(count.load(Ordering::SeqCst), 10);
    assert_eq!(ui.status(), LoopStatus::Stopped);
}

#[test]
fn test_stop_from_another_thread() {
    let ui = Arc::new(RunLoopBuilder::new().build_ui());
    let frames = Arc::new(AtomicUsize::new(0));

    {
        let frames = frames.clone();
        ui.set_backend_task(Box::new(move || {
            frames.fetch_add(1, Ordering::SeqCst);
            thread::sleep(Duration::from_millis(1));
            IterationStatus::Ok
        }));
    }

    let stopper = {
        let ui = ui.clone();
        thread::spawn(move || {
            thread::sleep(Duration::from_millis(30));
            ui.stop();
        })
    };

    ui.run().unwrap();
    stopper.join().unwrap();

    assert!(frames.load(Ordering::SeqCst) > 0);
    assert_eq!(ui.status(), LoopStatus::Stopped);
}

#[test]
fn test_zero_times_and_panicking_tasks() {
    let (ui, clock) = simulated_ui();
    let log = Arc::new(Mutex::new(Vec::new()));

    let handle = ui.post_repeating_task(once(|| panic!("never posted")), 0, Duration::ZERO);
    assert!(!handle.is_alive());

    ui.post_once(|| panic!("task failure"));
    ui.post_once(push(&log, "survivor"));

    ui.set_backend_task(Box::new(ticking_backend(clock, Duration::ZERO, 1, log.clone())));
    ui.run().unwrap();

    assert_eq!(*log.lock().unwrap(), vec!["survivor", "frame 1"]);
}

#[test]
fn test_panicking_backend_stops_the_loop_and_stays_registered() {
    let (ui, _clock) = simulated_ui();
    let calls = Arc::new(AtomicUsize::new(0));

    {
        let calls = calls.clone();
        ui.set_backend_task(Box::new(move || -> IterationStatus {
            calls.fetch_add(1, Ordering::SeqCst);
            panic!("frame failed")
        }));
    }

    ui.run().expect("a panicking backend ends the loop without unwinding out of run");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
    assert_eq!(ui.status(), LoopStatus::Stopped);
    assert!(format!("{ui:?}").contains("has_backend_task: true"));

    ui.run().expect("running a stopped loop returns immediately");
    assert_eq!(calls.load(Ordering::SeqCst), 1);
}

#[test]
fn test_repeating_task_cancelled_while_queued_never_runs() {
    let (ui, clock) = simulated_ui();
    let count = Arc::new(AtomicUsize::new(0));

    let handle = {
        let count = count.clone();
        ui.post_repeating_task(
            Box::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            }),
            5,
            Duration::from_millis(10),
        )
    };

    ui.cancel_task(&handle);
    assert_eq!(ui.pending_tasks(), 1, "the cancelled task stays queued");
    assert!(handle.is_alive());

    ui.set_backend_task(Box::new(ticking_backend(
        clock,
        Duration::from_millis(10),
        6,
        Arc::new(Mutex::new(Vec::new())),
    )));
    ui.run().unwrap();

    assert_eq!(count.load(Ordering::SeqCst), 0);
    assert_eq!(ui.pending_tasks(), 0, "the no-op firing is not re-queued");
    assert!(!handle.is_alive());
}
