//! Time provider that only moves when told to.

use super::{TimeProvider, Timestamp};

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Duration;

/// A controllable clock for simulated time.
///
/// Shared between threads through an `Arc`; every method takes `&self`.
/// The clock never moves backwards: [`ManualTimeProvider::set`] with an
/// earlier timestamp is ignored.
///
/// # Example
/// ```ignore
/// let clock = Arc::new(ManualTimeProvider::new());
/// let run_loop = RunLoopBuilder::new().time_provider(clock.clone()).build();
///
/// clock.advance(Duration::from_millis(49));
/// ```
#[derive(Debug, Default)]
pub struct ManualTimeProvider {
    millis: AtomicU64,
}

impl ManualTimeProvider {
    /// Creates a clock standing at [`Timestamp::ZERO`].
    pub fn new() -> Self {
        Self::starting_at(Timestamp::ZERO)
    }

    /// Creates a clock standing at `start`.
    ///
    /// # Example
    /// ```ignore
    /// let clock = ManualTimeProvider::starting_at(Timestamp::from_millis(1_000));
    /// assert_eq!(clock.now().as_millis(), 1_000);
    /// ```
    pub fn starting_at(start: Timestamp) -> Self {
        Self {
            millis: AtomicU64::new(start.as_millis()),
        }
    }

    /// Moves the clock forward by `delta` and returns the new time.
    pub fn advance(&self, delta: Duration) -> Timestamp {
        let delta = u64::try_from(delta.as_millis()).unwrap_or(u64::MAX);
        let previous = self
            .millis
            .fetch_update(Ordering::AcqRel, Ordering::Acquire, |ms| {
                Some(ms.saturating_add(delta))
            })
            .unwrap_or_else(|ms| ms);

        Timestamp::from_millis(previous.saturating_add(delta))
    }

    /// Moves the clock to `at`, unless it already stands later.
    pub fn set(&self, at: Timestamp) {
        self.millis.fetch_max(at.as_millis(), Ordering::AcqRel);
    }
}

impl TimeProvider for ManualTimeProvider {
    fn now(&self) -> Timestamp {
        Timestamp::from_millis(self.millis.load(Ordering::Acquire))
    }
}
