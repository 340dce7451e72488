//! Blocking wait used by the dedicated-thread loop.
//!
//! The loop sleeps in the pump until its next deadline, until a producer posts
//! something that is due sooner, or until it is stopped.

use std::sync::{Condvar, Mutex, MutexGuard, PoisonError};
use std::time::{Duration, Instant};

/// A blocking-wait primitive with an external wake-up.
pub trait TaskPump: Send + Sync {
    /// Blocks the calling thread for at most `timeout`, or until [`TaskPump::wake`]
    /// is called. `None` waits until woken.
    ///
    /// A wake issued while nobody is waiting must make the next `wait` return
    /// immediately, otherwise a post racing with the loop going to sleep would
    /// be missed.
    fn wait(&self, timeout: Option<Duration>);

    /// Ends the current or next [`TaskPump::wait`].
    fn wake(&self);
}

/// [`TaskPump`] built on a mutex-guarded notification flag and a condition variable.
#[derive(Debug, Default)]
pub struct TaskPumpStd {
    notified: Mutex<bool>,
    condvar: Condvar,
}

impl TaskPumpStd {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, bool> {
        self.notified.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl TaskPump for TaskPumpStd {
    fn wait(&self, timeout: Option<Duration>) {
        let mut notified = self.lock();

        match timeout {
            None => {
                while !*notified {
                    notified = self
                        .condvar
                        .wait(notified)
                        .unwrap_or_else(PoisonError::into_inner);
                }
            }
            Some(timeout) => {
                let deadline = Instant::now() + timeout;

                while !*notified {
                    let now = Instant::now();
                    if now >= deadline {
                        break;
                    }

                    notified = self
                        .condvar
                        .wait_timeout(notified, deadline - now)
                        .unwrap_or_else(PoisonError::into_inner)
                        .0;
                }
            }
        }

        // Consume the notification so the next wait blocks again.
        *notified = false;
    }

    fn wake(&self) {
        *self.lock() = true;
        self.condvar.notify_one();
    }
}
