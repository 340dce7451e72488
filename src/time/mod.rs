//! Monotonic time sources for the run loops.
//!
//! Every deadline in the scheduler is a [`Timestamp`]: a number of milliseconds
//! from an epoch fixed by the [`TimeProvider`] that produced it. Only timestamps
//! coming from the same provider can be compared meaningfully.
//!
//! - [`SteadyTimeProvider`] reads the OS monotonic clock and is the default.
//! - [`ManualTimeProvider`] only moves when told to, which makes scheduling
//!   behaviour reproducible in tests.
//!
//! # Example
//!
//! ```ignore
//! use runloop::{ManualTimeProvider, TimeProvider, Timestamp};
//! use std::time::Duration;
//!
//! let clock = ManualTimeProvider::new();
//! clock.advance(Duration::from_millis(50));
//! assert_eq!(clock.now(), Timestamp::from_millis(50));
//! ```

pub mod manual;
pub mod steady;

pub use manual::ManualTimeProvider;
pub use steady::SteadyTimeProvider;

use std::fmt;
use std::ops::Add;
use std::time::Duration;

/// A point in time, in milliseconds from a provider-defined epoch.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Timestamp(u64);

impl Timestamp {
    /// The provider's epoch.
    pub const ZERO: Timestamp = Timestamp(0);

    /// Creates a timestamp `millis` milliseconds after the epoch.
    pub const fn from_millis(millis: u64) -> Self {
        Self(millis)
    }

    /// Milliseconds since the epoch.
    pub const fn as_millis(self) -> u64 {
        self.0
    }

    /// Time elapsed from `earlier` to `self`, or zero if `earlier` is later.
    pub fn saturating_duration_since(self, earlier: Timestamp) -> Duration {
        Duration::from_millis(self.0.saturating_sub(earlier.0))
    }
}

impl Add<Duration> for Timestamp {
    type Output = Timestamp;

    /// Sub-millisecond precision is truncated; the sum saturates at `u64::MAX` ms.
    fn add(self, rhs: Duration) -> Timestamp {
        let millis = u64::try_from(rhs.as_millis()).unwrap_or(u64::MAX);
        Timestamp(self.0.saturating_add(millis))
    }
}

impl fmt::Display for Timestamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}ms", self.0)
    }
}

/// Source of monotonic timestamps.
///
/// Implementations must never go backwards: the loops compare deadlines
/// against `now()` and assume a later call never yields a smaller value.
pub trait TimeProvider: Send + Sync {
    /// Returns the current timestamp.
    fn now(&self) -> Timestamp;
}
