//! Task Scheduling Abstractions
//!
//! Provides the two deferral primitives the core needs from the host event
//! loop: an idle callback for low-priority work and a cancellable timer.

use std::time::Duration;

use crate::{
    error::{BridgeError, Result},
    platform::PlatformSendSync,
};

/// Scheduled task identifier
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TaskId(pub u64);

/// Work handed to the scheduler. Runs at most once.
pub type ScheduledTask = Box<dyn FnOnce() + Send + 'static>;

/// Host task scheduler trait
///
/// Abstracts the host event loop:
/// - **Desktop app**: `requestIdleCallback` / `setTimeout`
/// - **Native**: Tokio timers
/// - **Tests**: a manually driven clock
///
/// # Example
///
/// ```ignore
/// use bridge_traits::scheduler::TaskScheduler;
/// use std::time::Duration;
///
/// fn debounce(scheduler: &dyn TaskScheduler, previous: Option<TaskId>) -> Result<TaskId> {
///     if let Some(id) = previous {
///         scheduler.cancel(id);
///     }
///     scheduler.schedule_timeout(Duration::from_millis(200), Box::new(|| refresh()))
/// }
/// ```
pub trait TaskScheduler: PlatformSendSync {
    /// Whether [`schedule_idle`](Self::schedule_idle) is implemented.
    fn supports_idle(&self) -> bool {
        false
    }

    /// Run `task` when the host is idle.
    fn schedule_idle(&self, _task: ScheduledTask) -> Result<TaskId> {
        Err(BridgeError::NotAvailable(
            "idle callbacks are not supported by this scheduler".to_string(),
        ))
    }

    /// Run `task` once `delay` has elapsed.
    fn schedule_timeout(&self, delay: Duration, task: ScheduledTask) -> Result<TaskId>;

    /// Cancel a pending task. Unknown or already-run ids are ignored.
    fn cancel(&self, id: TaskId);
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicBool, Ordering};
    use std::sync::Arc;

    struct TimerOnly;

    impl TaskScheduler for TimerOnly {
        fn schedule_timeout(&self, _delay: Duration, task: ScheduledTask) -> Result<TaskId> {
            task();
            Ok(TaskId(1))
        }

        fn cancel(&self, _id: TaskId) {}
    }

    #[test]
    fn test_idle_defaults_to_not_available() {
        let scheduler = TimerOnly;
        assert!(!scheduler.supports_idle());

        let result = scheduler.schedule_idle(Box::new(|| {}));
        assert!(matches!(result, Err(BridgeError::NotAvailable(_))));
    }

    #[test]
    fn test_timeout_runs_boxed_closure() {
        let ran = Arc::new(AtomicBool::new(false));
        let flag = ran.clone();

        TimerOnly
            .schedule_timeout(
                Duration::ZERO,
                Box::new(move || flag.store(true, Ordering::SeqCst)),
            )
            .unwrap();
        assert!(ran.load(Ordering::SeqCst));
    }
}
