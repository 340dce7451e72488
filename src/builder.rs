//! Fluent builder for run loop construction.
//!
//! Every collaborator a loop needs can be injected; whatever is left unset
//! falls back to the standard implementation.

use crate::runtime::{PriorityTaskQueue, RunLoop, RunLoopUi, TaskPump, TaskPumpStd, TaskQueue};
use crate::time::{SteadyTimeProvider, TimeProvider};

use std::sync::Arc;

/// Builder for [`RunLoop`] and [`RunLoopUi`] instances.
///
/// # Example
/// ```ignore
/// let clock = Arc::new(ManualTimeProvider::new());
///
/// let worker = RunLoopBuilder::new()
///     .name("decoder")
///     .time_provider(clock.clone())
///     .build();
///
/// let ui = RunLoopBuilder::new()
///     .name("ui")
///     .time_provider(clock)
///     .build_ui();
/// ```
pub struct RunLoopBuilder {
    name: String,
    time_provider: Option<Arc<dyn TimeProvider>>,
    task_queue: Option<Box<dyn TaskQueue>>,
    task_pump: Option<Arc<dyn TaskPump>>,
}

impl Default for RunLoopBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl RunLoopBuilder {
    /// Name used when none is configured.
    pub const DEFAULT_NAME: &'static str = "run-loop";

    /// Creates a builder with every collaborator left at its default.
    pub fn new() -> Self {
        Self {
            name: Self::DEFAULT_NAME.to_string(),
            time_provider: None,
            task_queue: None,
            task_pump: None,
        }
    }

    /// Names the loop in log records and, for [`RunLoop::spawn`], the OS thread.
    pub fn name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Clock used to compute and check deadlines. Defaults to [`SteadyTimeProvider`].
    pub fn time_provider(mut self, time_provider: Arc<dyn TimeProvider>) -> Self {
        self.time_provider = Some(time_provider);
        self
    }

    /// Queue holding pending tasks. Defaults to [`PriorityTaskQueue`].
    pub fn task_queue(mut self, task_queue: Box<dyn TaskQueue>) -> Self {
        self.task_queue = Some(task_queue);
        self
    }

    /// Blocking primitive for [`RunLoop`]. Defaults to [`TaskPumpStd`].
    ///
    /// Ignored by [`RunLoopBuilder::build_ui`]: the cooperative loop never blocks.
    pub fn task_pump(mut self, task_pump: Arc<dyn TaskPump>) -> Self {
        self.task_pump = Some(task_pump);
        self
    }

    /// Builds a dedicated-thread [`RunLoop`].
    pub fn build(self) -> RunLoop {
        let pump = self
            .task_pump
            .unwrap_or_else(|| Arc::new(TaskPumpStd::new()));
        let (name, queue, time_provider) =
            Self::common(self.name, self.task_queue, self.time_provider);

        RunLoop::with_name(&name, pump, queue, time_provider)
    }

    /// Builds a cooperative [`RunLoopUi`].
    pub fn build_ui(self) -> RunLoopUi {
        let (name, queue, time_provider) =
            Self::common(self.name, self.task_queue, self.time_provider);

        RunLoopUi::with_name(&name, queue, time_provider)
    }

    fn common(
        name: String,
        task_queue: Option<Box<dyn TaskQueue>>,
        time_provider: Option<Arc<dyn TimeProvider>>,
    ) -> (String, Box<dyn TaskQueue>, Arc<dyn TimeProvider>) {
        let queue = task_queue.unwrap_or_else(|| Box::new(PriorityTaskQueue::new()));
        let time_provider = time_provider.unwrap_or_else(|| Arc::new(SteadyTimeProvider::new()));

        (name, queue, time_provider)
    }
}
