//! Time provider backed by the standard library's monotonic clock.

use super::{TimeProvider, Timestamp};

use std::sync::OnceLock;
use std::time::Instant;

/// Reads a steady clock that is immune to wall-clock adjustments.
///
/// The epoch is the first call made by any `SteadyTimeProvider` in the
/// process, so timestamps from different providers can be compared.
#[derive(Debug, Default, Clone, Copy)]
pub struct SteadyTimeProvider;

impl SteadyTimeProvider {
    pub fn new() -> Self {
        Self
    }
}

impl TimeProvider for SteadyTimeProvider {
    fn now(&self) -> Timestamp {
        static EPOCH: OnceLock<Instant> = OnceLock::new();

        let elapsed = EPOCH.get_or_init(Instant::now).elapsed();
        Timestamp::from_millis(u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX))
    }
}
