//! Deadline-ordered task scheduling with two drive models.
//!
//! Work is posted to a loop from any thread and runs on the loop's thread in
//! deadline order. Tasks can be delayed, repeated a fixed number of times and
//! cancelled through weak handles.
//!
//! # Architecture
//!
//! - **RunLoop**: owns a dedicated thread and sleeps in a [`TaskPump`] until
//!   the next deadline or a wake-up
//! - **RunLoopUi**: cooperative loop that shares the host's thread and hands
//!   control to a [`BackendTask`] once per pass
//! - **TaskQueue**: deadline-ordered storage of [`PendingTask`]s, FIFO among
//!   equal deadlines
//! - **TaskHandle**: weak observer of a posted task, used for cancellation
//! - **TimeProvider**: monotonic millisecond clock, real or simulated
//! - **RunLoopBuilder**: fluent construction with injectable collaborators
//!
//! # Example
//!
//! ```ignore
//! use runloop::{DispatchTaskExt, IterationStatus, RunLoopBackendExecutor, RunLoopBuilder, TaskLoop};
//! use std::sync::Arc;
//!
//! let worker = Arc::new(RunLoopBuilder::new().name("worker").build());
//! let ui = Arc::new(RunLoopBuilder::new().name("ui").build_ui());
//! let worker_thread = worker.spawn()?;
//!
//! let reply_to = ui.clone();
//! worker.post_once(move || {
//!     let answer = 42;
//!     reply_to.post_once(move || println!("answer: {answer}"));
//! });
//!
//! ui.set_backend_task(Box::new(|| IterationStatus::Ok));
//! ui.run()?;
//! ```

mod builder;
mod dispatch;
mod error;
mod runtime;
mod task;
pub mod time;

pub use builder::RunLoopBuilder;
pub use dispatch::{DispatchTask, DispatchTaskExt, TaskLoop};
pub use error::LoopError;
pub use runtime::{
    BackendTask, IterationStatus, LoopStatus, PriorityTaskQueue, RunLoop, RunLoopBackendExecutor,
    RunLoopUi, TaskPump, TaskPumpStd, TaskQueue,
};
pub use task::{PendingTask, SharedTask, Task, TaskHandle, once};
pub use time::{ManualTimeProvider, SteadyTimeProvider, TimeProvider, Timestamp};
