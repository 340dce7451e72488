//! Capabilities shared by both loop kinds.
//!
//! Producers only need [`DispatchTask`], usually behind an
//! `Arc<dyn DispatchTask>`. The code that owns a loop's thread drives it
//! through [`TaskLoop`].
//!
//! # Example
//!
//! ```ignore
//! use runloop::{DispatchTask, DispatchTaskExt, RunLoopBuilder, TaskLoop};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let worker = Arc::new(RunLoopBuilder::new().name("worker").build());
//! let thread = worker.spawn()?;
//!
//! let dispatcher: Arc<dyn DispatchTask> = worker.clone();
//! let handle = dispatcher.post_delayed_once(|| println!("later"), Duration::from_millis(10));
//! dispatcher.cancel_task(&handle);
//!
//! worker.stop();
//! thread.join().unwrap()?;
//! ```

use crate::error::LoopError;
use crate::task::{Task, TaskHandle, once};

use std::time::Duration;

/// Posting and cancelling work on a loop.
///
/// Every method may be called from any thread, including from inside a task
/// body running on the same loop.
///
/// Tasks fire in non-decreasing deadline order; tasks with equal deadlines
/// fire in the order they were posted.
pub trait DispatchTask: Send + Sync {
    /// Posts a task that is eligible immediately. Same as a zero delay.
    fn post_task(&self, task: Task) -> TaskHandle;

    /// Posts a task that fires `times` times, `period` apart.
    ///
    /// The first firing is eligible at post time. Each following deadline is
    /// computed from the time the previous firing actually started, so delays
    /// under load accumulate instead of being caught up.
    ///
    /// `times == 0` registers nothing and returns a detached handle.
    fn post_repeating_task(&self, task: Task, times: usize, period: Duration) -> TaskHandle;

    /// Posts a one-shot task eligible `delay` from now.
    fn post_delayed_task(&self, task: Task, delay: Duration) -> TaskHandle;

    /// Prevents future firings of the task behind `handle`.
    ///
    /// A firing already in progress runs to completion. Stale handles and
    /// repeated cancellation are silently ignored.
    fn cancel_task(&self, handle: &TaskHandle);
}

/// Convenience methods for posting `FnOnce` closures.
pub trait DispatchTaskExt: DispatchTask {
    /// Posts `f` to run once, as soon as possible.
    ///
    /// # Example
    /// ```ignore
    /// let (tx, rx) = std::sync::mpsc::channel();
    /// run_loop.post_once(move || tx.send(42).unwrap());
    /// ```
    fn post_once<F>(&self, f: F) -> TaskHandle
    where
        F: FnOnce() + Send + 'static,
    {
        self.post_task(once(f))
    }

    /// Posts `f` to run once, no earlier than `delay` from now.
    fn post_delayed_once<F>(&self, f: F, delay: Duration) -> TaskHandle
    where
        F: FnOnce() + Send + 'static,
    {
        self.post_delayed_task(once(f), delay)
    }
}

impl<D: DispatchTask + ?Sized> DispatchTaskExt for D {}

/// Driving a loop.
pub trait TaskLoop: Send + Sync {
    /// Processes tasks on the calling thread until the loop is stopped.
    ///
    /// Returns immediately if the loop was already stopped, and fails with
    /// [`LoopError::AlreadyRunning`] if another thread is inside `run`.
    fn run(&self) -> Result<(), LoopError>;

    /// Asks the loop to return from [`TaskLoop::run`]. Tasks still queued are
    /// abandoned. Idempotent and callable from any thread, task bodies included.
    fn stop(&self);
}
