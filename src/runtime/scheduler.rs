//! State and firing logic shared by [`RunLoop`] and [`RunLoopUi`].
//!
//! Both loops keep their queue and lifecycle status under one mutex, so a
//! status check and the queue inspection that follows it can never race.
//!
//! [`RunLoop`]: crate::RunLoop
//! [`RunLoopUi`]: crate::RunLoopUi

use crate::error::LoopError;
use crate::runtime::queue::TaskQueue;
use crate::task::{PendingTask, SharedTask, Task, TaskHandle};
use crate::time::{TimeProvider, Timestamp};

use std::panic::{self, AssertUnwindSafe};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

/// Lifecycle of a loop. `Stopped` is terminal.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LoopStatus {
    /// Created, `run` not called yet. Posted tasks are queued.
    Idle,
    /// Inside `run`.
    Running,
    /// Stopped; `run` has returned or returns as soon as it notices.
    Stopped,
}

pub(crate) struct LoopState {
    pub(crate) status: LoopStatus,
    pub(crate) queue: Box<dyn TaskQueue>,
    /// True while the loop is blocked in its pump.
    pub(crate) sleeping: bool,
    /// Deadline the sleeping loop waits for; `None` means until woken.
    pub(crate) sleeping_until: Option<Timestamp>,
}

impl LoopState {
    /// Pops the earliest task if it is eligible at `now` and lends out its body.
    pub(crate) fn pop_due(&mut self, now: Timestamp) -> Option<(SharedTask, Task)> {
        match self.queue.next_task_call_time() {
            Some(next_call) if next_call <= now => {
                let task = self.queue.pop_task()?;
                let body = task.lock().take_task();
                Some((task, body))
            }
            _ => None,
        }
    }

    /// Whether a task due at `next_call` needs the sleeping loop woken up.
    fn should_wake(&self, next_call: Timestamp) -> bool {
        self.sleeping
            && self
                .sleeping_until
                .is_none_or(|sleeping_until| next_call < sleeping_until)
    }
}

pub(crate) struct Scheduler {
    name: String,
    state: Mutex<LoopState>,
    time: Arc<dyn TimeProvider>,
}

impl Scheduler {
    pub(crate) fn new(name: String, queue: Box<dyn TaskQueue>, time: Arc<dyn TimeProvider>) -> Self {
        Self {
            name,
            state: Mutex::new(LoopState {
                status: LoopStatus::Idle,
                queue,
                sleeping: false,
                sleeping_until: None,
            }),
            time,
        }
    }

    pub(crate) fn name(&self) -> &str {
        &self.name
    }

    pub(crate) fn now(&self) -> Timestamp {
        self.time.now()
    }

    /// Task bodies never run under this lock, so poisoning can only come from
    /// a panic inside the scheduler and the state is still consistent.
    pub(crate) fn lock(&self) -> MutexGuard<'_, LoopState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub(crate) fn status(&self) -> LoopStatus {
        self.lock().status
    }

    pub(crate) fn pending_tasks(&self) -> usize {
        self.lock().queue.len()
    }

    /// Moves `Idle` to `Running`.
    ///
    /// Returns `Ok(false)` when the loop was already stopped and `run` should
    /// return right away.
    pub(crate) fn enter_running(&self) -> Result<bool, LoopError> {
        let mut state = self.lock();

        match state.status {
            LoopStatus::Idle => {
                state.status = LoopStatus::Running;
                tracing::debug!(run_loop = %self.name, pending = state.queue.len(), "run loop started");
                Ok(true)
            }
            LoopStatus::Running => {
                tracing::warn!(run_loop = %self.name, "run called on a loop that is already running");
                Err(LoopError::AlreadyRunning {
                    name: self.name.clone(),
                })
            }
            LoopStatus::Stopped => Ok(false),
        }
    }

    /// Moves to `Stopped`. Returns `false` if the loop was already stopped.
    pub(crate) fn stop(&self) -> bool {
        let mut state = self.lock();
        if state.status == LoopStatus::Stopped {
            return false;
        }

        state.status = LoopStatus::Stopped;
        tracing::debug!(run_loop = %self.name, abandoned = state.queue.len(), "run loop stopped");
        true
    }

    /// Queues a new task.
    ///
    /// The second element tells the caller to wake the pump: the task is due
    /// before whatever the sleeping loop is waiting for.
    pub(crate) fn post(
        &self,
        task: Task,
        times: usize,
        period: Duration,
        when: Timestamp,
    ) -> (TaskHandle, bool) {
        if times == 0 {
            tracing::debug!(run_loop = %self.name, "repeating task with zero firings ignored");
            return (TaskHandle::detached(), false);
        }

        let pending = SharedTask::new(PendingTask::new(task, times, period, when));

        let mut state = self.lock();
        let handle = state.queue.add_task(pending);
        let wake = state.should_wake(when);

        tracing::trace!(run_loop = %self.name, next_call = %when, times, "task posted");

        (handle, wake)
    }

    pub(crate) fn cancel(&self, handle: &TaskHandle) {
        let Some(task) = handle.upgrade() else {
            return;
        };

        let _state = self.lock();
        task.lock().cancel();
    }

    /// Runs one firing of `task` with the loop lock released, then re-queues
    /// it if it repeats.
    pub(crate) fn fire(&self, task: SharedTask, mut body: Task, fired_at: Timestamp) {
        tracing::trace!(run_loop = %self.name, %fired_at, "firing task");

        if panic::catch_unwind(AssertUnwindSafe(|| body())).is_err() {
            tracing::error!(run_loop = %self.name, %fired_at, "task panicked");
        }

        let mut state = self.lock();
        let repeat = task.lock().finish_firing(body, fired_at);

        if repeat {
            state.queue.add_task(task);
        }
    }
}
