//! Scheduled units of work and the handles that observe them.
//!
//! A [`PendingTask`] is owned by the queue of the loop it was posted to. The
//! caller only ever receives a [`TaskHandle`], a weak reference that can ask
//! whether the task still exists and can be passed back to
//! [`DispatchTask::cancel_task`].
//!
//! # Ownership
//!
//! ```text
//!   queue ──(Arc)──▶ PendingTask ◀──(Weak)── TaskHandle
//!                        ▲
//!   loop stack frame ─(Arc, while firing)
//! ```
//!
//! Once the queue and the firing loop drop their references, every handle to
//! the task reports `is_alive() == false`.
//!
//! # Cancellation
//!
//! Cancelling swaps the body for a no-op and forces `times` to zero. The task
//! is not searched for and removed: it stays queued until its deadline, is
//! popped, runs the no-op and is discarded.
//!
//! [`DispatchTask::cancel_task`]: crate::DispatchTask::cancel_task

use crate::time::Timestamp;

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use std::time::Duration;

/// The body of a task. Repeating tasks call it once per firing.
pub type Task = Box<dyn FnMut() + Send + 'static>;

/// Wraps a one-shot closure so it can be posted as a [`Task`].
///
/// The closure runs on the first call; later calls do nothing.
pub fn once<F>(f: F) -> Task
where
    F: FnOnce() + Send + 'static,
{
    let mut slot = Some(f);
    Box::new(move || {
        if let Some(f) = slot.take() {
            f();
        }
    })
}

fn noop() -> Task {
    Box::new(|| {})
}

/// Mutable record describing one scheduled unit of work.
pub struct PendingTask {
    /// `None` while the body is lent out to the firing loop.
    task: Option<Task>,
    times: usize,
    period: Duration,
    next_call: Timestamp,
}

impl PendingTask {
    /// Creates a task that fires `times` times, `period` apart, starting at `next_call`.
    pub fn new(task: Task, times: usize, period: Duration, next_call: Timestamp) -> Self {
        Self {
            task: Some(task),
            times,
            period,
            next_call,
        }
    }

    /// Remaining number of firings, including the next one.
    pub fn times(&self) -> usize {
        self.times
    }

    /// Minimum spacing between two firings. Zero for one-shot tasks.
    pub fn period(&self) -> Duration {
        self.period
    }

    /// Earliest time at which the task may fire.
    pub fn next_call(&self) -> Timestamp {
        self.next_call
    }

    /// A task is eligible iff `next_call <= now`.
    pub fn is_eligible(&self, now: Timestamp) -> bool {
        self.next_call <= now
    }

    /// True once the task was cancelled or has no firings left.
    pub fn is_exhausted(&self) -> bool {
        self.times == 0
    }

    pub(crate) fn cancel(&mut self) {
        self.task = Some(noop());
        self.times = 0;
    }

    /// Lends the body to the caller for one firing.
    pub(crate) fn take_task(&mut self) -> Task {
        self.task.take().unwrap_or_else(noop)
    }

    /// Accounts for a firing that started at `fired_at`.
    ///
    /// Returns `true` when another firing is due, in which case `body` is put
    /// back and `next_call` moves to `fired_at + period`. Cancellation during
    /// the firing has already set `times` to zero, so a cancelled body is
    /// never restored.
    pub(crate) fn finish_firing(&mut self, body: Task, fired_at: Timestamp) -> bool {
        if self.times > 1 {
            self.times -= 1;
            self.next_call = fired_at + self.period;
            self.task = Some(body);
            true
        } else {
            self.times = 0;
            false
        }
    }
}

impl fmt::Debug for PendingTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PendingTask")
            .field("times", &self.times)
            .field("period", &self.period)
            .field("next_call", &self.next_call)
            .field("firing", &self.task.is_none())
            .finish()
    }
}

/// Shared ownership of a [`PendingTask`], as stored by a [`TaskQueue`].
///
/// Only queues and the firing loop hold these; callers get [`TaskHandle`]s.
///
/// [`TaskQueue`]: crate::TaskQueue
#[derive(Clone)]
pub struct SharedTask(Arc<Mutex<PendingTask>>);

impl SharedTask {
    /// Takes ownership of `task`. Handles created from the result stay alive
    /// as long as some clone of it does.
    pub fn new(task: PendingTask) -> Self {
        Self(Arc::new(Mutex::new(task)))
    }

    /// Locks the record. Task bodies never run under this lock, so a poisoned
    /// lock can only come from a panic in the scheduler itself and the data
    /// is still consistent.
    pub fn lock(&self) -> MutexGuard<'_, PendingTask> {
        self.0.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn next_call(&self) -> Timestamp {
        self.lock().next_call()
    }

    /// Creates a non-owning handle to this task.
    pub fn handle(&self) -> TaskHandle {
        TaskHandle {
            task: Arc::downgrade(&self.0),
        }
    }
}

impl fmt::Debug for SharedTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_tuple("SharedTask").field(&*self.lock()).finish()
    }
}

/// Non-owning reference to a posted task.
///
/// Holding a handle never keeps the task alive. A default handle refers to no
/// task at all and is never alive.
#[derive(Clone, Default)]
pub struct TaskHandle {
    task: Weak<Mutex<PendingTask>>,
}

impl TaskHandle {
    /// Returns a handle that refers to nothing.
    pub fn detached() -> Self {
        Self::default()
    }

    /// True while the referenced task has not been destroyed.
    pub fn is_alive(&self) -> bool {
        self.task.strong_count() > 0
    }

    pub(crate) fn upgrade(&self) -> Option<SharedTask> {
        self.task.upgrade().map(SharedTask)
    }
}

impl fmt::Debug for TaskHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TaskHandle")
            .field("alive", &self.is_alive())
            .finish()
    }
}
