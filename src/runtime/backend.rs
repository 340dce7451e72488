//! Host work interleaved with the cooperative loop.

/// Outcome of one backend iteration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum IterationStatus {
    /// The iteration finished normally; keep looping.
    Ok,
    /// The backend is finished; stop the loop after this pass.
    Done,
}

/// One unit of host work, such as polling input and drawing a frame.
///
/// Any `FnMut() -> IterationStatus + Send` closure is a `BackendTask`.
pub trait BackendTask: Send {
    fn iterate(&mut self) -> IterationStatus;
}

impl<F> BackendTask for F
where
    F: FnMut() -> IterationStatus + Send,
{
    fn iterate(&mut self) -> IterationStatus {
        self()
    }
}

/// Lets a host register the work a cooperative loop runs once per pass.
pub trait RunLoopBackendExecutor: Send + Sync {
    /// Registers `backend_task`, replacing any previously registered one.
    ///
    /// The task is invoked at most once per pass, never concurrently with
    /// itself and never while the loop's task lock is held.
    fn set_backend_task(&self, backend_task: Box<dyn BackendTask>);
}
