//! Run loop subsystem modules.

pub(crate) mod backend;
mod core;
pub(crate) mod pump;
pub(crate) mod queue;
pub(crate) mod scheduler;
mod ui;

pub use backend::{BackendTask, IterationStatus, RunLoopBackendExecutor};
pub use self::core::RunLoop;
pub use pump::{TaskPump, TaskPumpStd};
pub use queue::{PriorityTaskQueue, TaskQueue};
pub use scheduler::LoopStatus;
pub use ui::RunLoopUi;
