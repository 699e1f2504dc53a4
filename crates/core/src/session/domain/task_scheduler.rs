use std::sync::Arc;
use std::time::Duration;

/// A one-shot unit of background work.
pub type Task = Box<dyn FnOnce() + Send + 'static>;

/// Work run on every tick of a repeating schedule. Shared because ticks may
/// overlap.
pub type RepeatingFn = Arc<dyn Fn() + Send + Sync + 'static>;

/// Scheduler-specific cancellation of a repeating schedule.
pub trait TimerHandle: Send {
    /// Stops the schedule. After this returns no new tick may start; ticks
    /// already running are left to finish.
    fn cancel(&mut self);
}

/// Owned handle to a repeating schedule.
///
/// Cancelled exactly once, either explicitly or when dropped, so every path
/// that discards the handle also stops the timer.
pub struct RepeatingTask {
    handle: Option<Box<dyn TimerHandle>>,
}

impl RepeatingTask {
    pub fn new(handle: Box<dyn TimerHandle>) -> Self {
        Self {
            handle: Some(handle),
        }
    }

    pub fn cancel(mut self) {
        self.cancel_inner();
    }

    fn cancel_inner(&mut self) {
        if let Some(mut handle) = self.handle.take() {
            handle.cancel();
        }
    }
}

impl Drop for RepeatingTask {
    fn drop(&mut self) {
        self.cancel_inner();
    }
}

/// Runs background work for a session: one-shot requests and the periodic
/// capture tick.
pub trait TaskScheduler: Send + Sync {
    /// Runs `task` without blocking the caller.
    fn spawn(&self, task: Task);

    /// Runs `task` every `interval`, starting one interval from now. Each
    /// tick runs independently of the previous one, so a slow tick does not
    /// delay or swallow the next.
    fn schedule_repeating(&self, interval: Duration, task: RepeatingFn) -> RepeatingTask;
}
