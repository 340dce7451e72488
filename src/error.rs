//! Errors reported by the run loops.
//!
//! Posting, cancelling and stopping never fail. Only driving a loop does.

use std::io;

/// Error returned when a loop cannot be driven.
#[derive(Debug, thiserror::Error)]
pub enum LoopError {
    #[error("run loop `{name}` is already running")]
    AlreadyRunning { name: String },

    #[error("failed to spawn thread for run loop `{name}`: {source}")]
    Spawn {
        name: String,
        #[source]
        source: io::Error,
    },
}
