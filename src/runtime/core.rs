//! Run loop that owns a dedicated thread.
//!
//! The loop blocks in its [`TaskPump`] whenever nothing is due and wakes up at
//! the next deadline, when a producer posts something due sooner, or when it
//! is stopped.

use crate::builder::RunLoopBuilder;
use crate::dispatch::{DispatchTask, TaskLoop};
use crate::error::LoopError;
use crate::runtime::pump::TaskPump;
use crate::runtime::queue::TaskQueue;
use crate::runtime::scheduler::{LoopStatus, Scheduler};
use crate::task::{Task, TaskHandle};
use crate::time::TimeProvider;

use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

/// Processes tasks on a thread of its own.
///
/// Any thread may post or cancel tasks while one thread sits inside
/// [`TaskLoop::run`]. Task bodies run without the loop's lock held, so they
/// can post, cancel or stop freely.
///
/// # Example
/// ```ignore
/// let run_loop = Arc::new(RunLoopBuilder::new().name("filesystem").build());
/// let thread = run_loop.spawn()?;
///
/// run_loop.post_once(|| println!("on the filesystem thread"));
///
/// run_loop.stop();
/// thread.join().unwrap()?;
/// ```
pub struct RunLoop {
    scheduler: Scheduler,
    pump: Arc<dyn TaskPump>,
}

impl RunLoop {
    /// Creates a loop from its collaborators.
    ///
    /// Use [`RunLoop::builder`] to get the default collaborators.
    pub fn new(
        pump: Arc<dyn TaskPump>,
        queue: Box<dyn TaskQueue>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self::with_name(RunLoopBuilder::DEFAULT_NAME, pump, queue, time_provider)
    }

    pub(crate) fn with_name(
        name: &str,
        pump: Arc<dyn TaskPump>,
        queue: Box<dyn TaskQueue>,
        time_provider: Arc<dyn TimeProvider>,
    ) -> Self {
        Self {
            scheduler: Scheduler::new(name.to_string(), queue, time_provider),
            pump,
        }
    }

    /// Shorthand for [`RunLoopBuilder::new`].
    ///
    /// # Example
    /// ```ignore
    /// let run_loop = RunLoop::builder().name("filesystem").build();
    /// ```
    pub fn builder() -> RunLoopBuilder {
        RunLoopBuilder::new()
    }

    /// Name given at construction; also the thread name used by [`RunLoop::spawn`].
    pub fn name(&self) -> &str {
        self.scheduler.name()
    }

    /// Current lifecycle state.
    ///
    /// # Returns
    /// `Running` only while a thread is inside [`TaskLoop::run`] and the loop
    /// has not been stopped.
    pub fn status(&self) -> LoopStatus {
        self.scheduler.status()
    }

    /// Number of queued tasks, cancelled ones included until they are popped.
    pub fn pending_tasks(&self) -> usize {
        self.scheduler.pending_tasks()
    }

    /// Runs the loop on a new OS thread named after the loop.
    ///
    /// The join handle yields the result of [`TaskLoop::run`].
    pub fn spawn(self: &Arc<Self>) -> Result<JoinHandle<Result<(), LoopError>>, LoopError> {
        let run_loop = Arc::clone(self);

        thread::Builder::new()
            .name(self.name().to_string())
            .spawn(move || run_loop.run())
            .map_err(|source| LoopError::Spawn {
                name: self.name().to_string(),
                source,
            })
    }

    fn post(&self, task: Task, times: usize, period: Duration, delay: Duration) -> TaskHandle {
        let when = self.scheduler.now() + delay;
        let (handle, wake) = self.scheduler.post(task, times, period, when);

        if wake {
            self.pump.wake();
        }

        handle
    }
}

impl TaskLoop for RunLoop {
    fn run(&self) -> Result<(), LoopError> {
        if !self.scheduler.enter_running()? {
            return Ok(());
        }

        loop {
            let mut state = self.scheduler.lock();
            if state.status != LoopStatus::Running {
                break;
            }

            let now = self.scheduler.now();
            if let Some((task, body)) = state.pop_due(now) {
                drop(state);
                self.scheduler.fire(task, body, now);
                continue;
            }

            let next_call = state.queue.next_task_call_time();
            state.sleeping = true;
            state.sleeping_until = next_call;
            drop(state);

            let timeout = next_call.map(|at| at.saturating_duration_since(now));
            tracing::trace!(run_loop = %self.name(), ?timeout, "waiting for next task");
            self.pump.wait(timeout);

            self.scheduler.lock().sleeping = false;
        }

        Ok(())
    }

    fn stop(&self) {
        self.scheduler.stop();
        self.pump.wake();
    }
}

impl DispatchTask for RunLoop {
    fn post_task(&self, task: Task) -> TaskHandle {
        self.post_delayed_task(task, Duration::ZERO)
    }

    fn post_repeating_task(&self, task: Task, times: usize, period: Duration) -> TaskHandle {
        self.post(task, times, period, Duration::ZERO)
    }

    fn post_delayed_task(&self, task: Task, delay: Duration) -> TaskHandle {
        self.post(task, 1, Duration::ZERO, delay)
    }

    fn cancel_task(&self, handle: &TaskHandle) {
        self.scheduler.cancel(handle);
    }
}

impl std::fmt::Debug for RunLoop {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("RunLoop")
            .field("name", &self.name())
            .field("status", &self.status())
            .field("pending_tasks", &self.pending_tasks())
            .finish()
    }
}
