//! Cooperative run loop sharing its thread with host work.
//!
//! Each pass of [`RunLoopUi::run`]:
//!
//! 1. samples the clock once,
//! 2. fires every task eligible at that sample, re-queueing repeating ones,
//! 3. invokes the registered [`BackendTask`] once, whose [`IterationStatus`]
//!    decides whether another pass follows.
//!
//! There is no blocking wait. The loop only hands control to the backend, so
//! everything due in a pass finishes before that pass's backend iteration.
//!
//! # Suspension point
//!
//! [`TaskLoop::stop`] is observed between task firings and between passes. A
//! task body or backend iteration that never returns keeps the loop from
//! noticing the stop.
//!
//! A panic in a task body is logged and the pass goes on. A panic in the
//! backend is logged and ends the loop as if the backend returned `Done`; the
//! backend stays registered.

use crate::builder::RunLoopBuilder;
use crate::dispatch::{DispatchTask, TaskLoop};
use crate::error::LoopError;
use crate::runtime::backend::{BackendTask, IterationStatus, RunLoopBackendExecutor};
use crate::runtime::queue::TaskQueue;
use crate::runtime::scheduler::{LoopStatus, Scheduler};
use crate::task::{Task, TaskHandle};
use crate::time::TimeProvider;

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread;
use std::time::Duration;

/// Processes tasks on the thread that also drives the host's frame loop.
///
/// Producers on any thread may post and cancel; [`TaskLoop::run`] must be
/// called on the host thread.
///
/// # Example
/// ```ignore
/// let ui = Arc::new(RunLoopBuilder::new().name("ui").build_ui());
///
/// ui.set_backend_task(Box::new(move || {
///     if window.poll_and_draw() { IterationStatus::Ok } else { IterationStatus::Done }
/// }));
///
/// ui.run()?;
/// ```
pub struct RunLoopUi {
    scheduler: Scheduler,
    backend_task: Mutex<Option<Box<dyn BackendTask>>>,
}

impl RunLoopUi {
    /// Creates a loop from its collaborators, under the default name.
    ///
    /// Use [`RunLoopUi::builder`] to name the loop or to get the default
    /// collaborators.
    pub fn new(queue: Box<dyn TaskQueue>, time_provider: Arc<dyn TimeProvider>) -> Self {
        Self::with_name(RunLoopBuilder::DEFAULT_NAME, queue, time_provider)
    }

    pub(crate) fn with_name(
        name: &str,
        queue: Box<dyn TaskQueue>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            scheduler: Scheduler::new(name.to_string(), queue, time_provider),
            backend_task: Mutex::new(None),
        }
    }

    /// Shorthand for [`RunLoopBuilder::new`]; finish with [`RunLoopBuilder::build_ui`].
    pub fn builder() -> RunLoopBuilder {
        RunLoopBuilder::new()
    }

    pub fn name(&self) -> &str {
        self.scheduler.name()
    }

    /// Current lifecycle state.
    pub fn status(&self) -> LoopStatus {
        self.scheduler.status()
    }

    /// Number of queued tasks, cancelled ones included until they are popped.
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending_tasks()
    }

    fn backend_slot(&self) -> MutexGuard<'_, Option<Box<dyn BackendTask>>> {
        self.backend_task
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    /// Fires every task eligible at one clock sample.
    ///
    /// Returns `None` if the loop was stopped part-way, otherwise the number
    /// of firings.
    fn drain_due(&self) -> Option<usize> {
        let now = self.scheduler.now();
        let mut fired = 0;

        loop {
            let mut state = self.scheduler.lock();
            if state.status != LoopStatus::Running {
                return None;
            }

            let Some((task, body)) = state.pop_due(now) else {
                return Some(fired);
            };
            drop(state);

            self.scheduler.fire(task, body, now);
            fired += 1;
        }
    }

    /// Invokes the backend once, outside of every lock.
    ///
    /// The backend is taken out of its slot for the call. If it registers a
    /// replacement meanwhile, the replacement wins. A panicking backend is
    /// reported as [`IterationStatus::Done`].
    fn iterate_backend(&self) -> Option<IterationStatus> {
        let mut backend_task = self.backend_slot().take()?;
        let status = panic::catch_unwind(AssertUnwindSafe(|| backend_task.iterate()))
            .unwrap_or_else(|_| {
                tracing::error!(run_loop = %self.name(), "backend task panicked");
                IterationStatus::Done
            });

        let mut slot = self.backend_slot();
        if slot.is_none() {
            *slot = Some(backend_task);
        }

        Some(status)
    }
}

impl TaskLoop for RunLoopUi {
    fn run(&self) -> Result<(), LoopError> {
        if !self.scheduler.enter_running()? {
            return Ok(());
        }

        while let Some(fired) = self.drain_due() {
            match self.iterate_backend() {
                Some(IterationStatus::Ok) => {}
                Some(IterationStatus::Done) => {
                    tracing::debug!(run_loop = %self.name(), "backend task finished");
                    self.scheduler.stop();
                    break;
                }
                // Nothing else to do this pass; let other threads post.
                None if fired == 0 => thread::yield_now(),
                None => {}
            }
        }

        Ok(())
    }

    fn stop(&self) {
        self.scheduler.stop();
    }
}

impl DispatchTask for RunLoopUi {
    fn post_task(&self, task: Task) -> TaskHandle {
        self.post_delayed_task(task, Duration::ZERO)
    }

    fn post_repeating_task(&self, task: Task, times: usize, period: Duration) -> TaskHandle {
        let now = self.scheduler.now();
        self.scheduler.post(task, times, period, now).0
    }

    fn post_delayed_task(&self, task: Task, delay: Duration) -> TaskHandle {
        let when = self.scheduler.now() + delay;
        self.scheduler.post(task, 1, Duration::ZERO, when).0
    }

    fn cancel_task(&self, handle: &TaskHandle) {
        self.scheduler.cancel(handle);
    }
}

impl RunLoopBackendExecutor for RunLoopUi {
    fn set_backend_task(&self, backend_task: Box<dyn BackendTask>) {
        *self.backend_slot() = Some(backend_task);
    }
}

impl std::fmt::Debug for RunLoopUi {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLoopUi")
            .field("name", &self.name())
            .field("status", &self.status())
            .field("pending_tasks", &self.pending_tasks())
            .field("has_backend_task", &self.backend_slot().is_some())
            .finish()
    }
}
