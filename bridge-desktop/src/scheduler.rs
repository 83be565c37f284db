//! Tokio-backed task scheduler

use bridge_traits::{
    error::{BridgeError, Result},
    scheduler::{ScheduledTask, TaskId, TaskScheduler},
};
use parking_lot::Mutex;
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;
use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tracing::trace;

type TaskTable = Arc<Mutex<HashMap<TaskId, JoinHandle<()>>>>;

/// Scheduler running deferred work on a Tokio runtime.
///
/// Idle callbacks are approximated by yielding once to the runtime before
/// running the task.
pub struct TokioScheduler {
    handle: Handle,
    tasks: TaskTable,
    next_id: AtomicU64,
}

impl TokioScheduler {
    pub fn new(handle: Handle) -> Self {
        Self {
            handle,
            tasks: Arc::new(Mutex::new(HashMap::new())),
            next_id: AtomicU64::new(1),
        }
    }

    /// Scheduler on the runtime of the calling context.
    pub fn try_current() -> Result<Self> {
        let handle = Handle::try_current().map_err(|e| {
            BridgeError::NotAvailable(format!("no Tokio runtime in this context: {}", e))
        })?;
        Ok(Self::new(handle))
    }

    /// Tasks scheduled and not yet started or cancelled.
    pub fn pending_count(&self) -> usize {
        self.tasks.lock().len()
    }

    fn spawn(&self, delay: Option<Duration>, task: ScheduledTask) -> TaskId {
        let id = TaskId(self.next_id.fetch_add(1, Ordering::Relaxed));
        let tasks = self.tasks.clone();

        // Held across spawn so the task cannot deregister before it is registered.
        let mut table = self.tasks.lock();
        let join = self.handle.spawn(async move {
            match delay {
                Some(delay) => tokio::time::sleep(delay).await,
                None => tokio::task::yield_now().await,
            }
            if tasks.lock().remove(&id).is_none() {
                return;
            }
            trace!(task_id = id.0, "Running scheduled task");
            task();
        });
        table.insert(id, join);
        id
    }
}

impl TaskScheduler for TokioScheduler {
    fn supports_idle(&self) -> bool {
        true
    }

    fn schedule_idle(&self, task: ScheduledTask) -> Result<TaskId> {
        Ok(self.spawn(None, task))
    }

    fn schedule_timeout(&self, delay: Duration, task: ScheduledTask) -> Result<TaskId> {
        Ok(self.spawn(Some(delay), task))
    }

    fn cancel(&self, id: TaskId) {
        if let Some(join) = self.tasks.lock().remove(&id) {
            trace!(task_id = id.0, "Cancelled scheduled task");
            join.abort();
        }
    }
}

impl Drop for TokioScheduler {
    fn drop(&mut self) {
        for (_, join) in self.tasks.lock().drain() {
            join.abort();
        }
    }
}

impl std::fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokioScheduler")
            .field("pending", &self.pending_count())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;

    fn counter() -> (Arc<AtomicUsize>, impl Fn() -> ScheduledTask) {
        let count = Arc::new(AtomicUsize::new(0));
        let handle = count.clone();
        let make = move || -> ScheduledTask {
            let count = handle.clone();
            Box::new(move || {
                count.fetch_add(1, Ordering::SeqCst);
            })
        };
        (count, make)
    }

    #[test]
    fn test_try_current_outside_runtime_fails() {
        assert!(matches!(
            TokioScheduler::try_current(),
            Err(BridgeError::NotAvailable(_))
        ));
    }

    #[tokio::test(start_paused = true)]
    async fn test_timeout_fires_after_delay() {
        let scheduler = TokioScheduler::try_current().unwrap();
        let (count, task) = counter();

        scheduler
            .schedule_timeout(Duration::from_millis(200), task())
            .unwrap();
        assert_eq!(scheduler.pending_count(), 1);

        tokio::time::sleep(Duration::from_millis(100)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);

        tokio::time::sleep(Duration::from_millis(150)).await;
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_cancelled_timeout_never_runs() {
        let scheduler = TokioScheduler::try_current().unwrap();
        let (count, task) = counter();

        let id = scheduler
            .schedule_timeout(Duration::from_millis(200), task())
            .unwrap();
        scheduler.cancel(id);
        scheduler.cancel(TaskId(9_999));

        tokio::time::sleep(Duration::from_secs(1)).await;
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending_count(), 0);
    }

    #[tokio::test(start_paused = true)]
    async fn test_idle_task_runs_after_yield() {
        let scheduler = TokioScheduler::try_current().unwrap();
        let (count, task) = counter();

        assert!(scheduler.supports_idle());
        scheduler.schedule_idle(task()).unwrap();
        scheduler.schedule_idle(task()).unwrap();

        tokio::time::sleep(Duration::from_millis(10)).await;
        assert_eq!(count.load(Ordering::SeqCst), 2);
    }
}
