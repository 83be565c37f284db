//! Viewport debouncing.
//!
//! Scrolling produces bursts of viewport notifications. Each one restarts a
//! timer; the action runs once the viewport has been quiet for the whole
//! period.

use std::sync::Arc;
use std::time::Duration;

use bridge_traits::error::Result;
use bridge_traits::scheduler::{ScheduledTask, TaskId, TaskScheduler};
use parking_lot::Mutex;
use tracing::trace;

#[derive(Default)]
struct Pending {
    generation: u64,
    task: Option<TaskId>,
}

pub struct ViewportDebouncer {
    scheduler: Arc<dyn TaskScheduler>,
    delay: Duration,
    pending: Arc<Mutex<Pending>>,
}

impl ViewportDebouncer {
    pub fn new(scheduler: Arc<dyn TaskScheduler>, delay: Duration) -> Self {
        Self {
            scheduler,
            delay,
            pending: Arc::new(Mutex::new(Pending::default())),
        }
    }

    pub fn delay(&self) -> Duration {
        self.delay
    }

    /// (Re)start the quiet period; `action` runs when it elapses.
    pub fn trigger(&self, action: ScheduledTask) -> Result<()> {
        let (generation, previous) = {
            let mut pending = self.pending.lock();
            pending.generation += 1;
            (pending.generation, pending.task.take())
        };
        if let Some(task_id) = previous {
            trace!(task_id = task_id.0, "Restarting viewport timer");
            self.scheduler.cancel(task_id);
        }

        let slot = self.pending.clone();
        let fire = Box::new(move || {
            {
                let mut pending = slot.lock();
                if pending.generation != generation {
                    return;
                }
                pending.task = None;
            }
            action();
        });

        let task_id = self.scheduler.schedule_timeout(self.delay, fire)?;
        let mut pending = self.pending.lock();
        if pending.generation == generation {
            pending.task = Some(task_id);
        }
        Ok(())
    }

    /// Drop the pending action, if any.
    pub fn cancel(&self) -> bool {
        let previous = {
            let mut pending = self.pending.lock();
            pending.generation += 1;
            pending.task.take()
        };
        match previous {
            Some(task_id) => {
                self.scheduler.cancel(task_id);
                true
            }
            None => false,
        }
    }

    pub fn is_pending(&self) -> bool {
        self.pending.lock().task.is_some()
    }
}

impl std::fmt::Debug for ViewportDebouncer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ViewportDebouncer")
            .field("delay", &self.delay)
            .field("pending", &self.is_pending())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use core_runtime::scheduler::ManualScheduler;
    use std::sync::atomic::{AtomicUsize, Ordering};

    fn setup() -> (Arc<ManualScheduler>, ViewportDebouncer, Arc<AtomicUsize>) {
        let scheduler = Arc::new(ManualScheduler::new());
        let debouncer = ViewportDebouncer::new(scheduler.clone(), Duration::from_millis(200));
        (scheduler, debouncer, Arc::new(AtomicUsize::new(0)))
    }

    fn bump(count: &Arc<AtomicUsize>) -> ScheduledTask {
        let count = count.clone();
        Box::new(move || {
            count.fetch_add(1, Ordering::SeqCst);
        })
    }

    #[test]
    fn test_burst_collapses_into_one_run() {
        let (scheduler, debouncer, count) = setup();

        for _ in 0..5 {
            debouncer.trigger(bump(&count)).unwrap();
            scheduler.advance(Duration::from_millis(50));
        }
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending_timers(), 1);

        scheduler.advance(Duration::from_millis(149));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        scheduler.advance(Duration::from_millis(1));
        assert_eq!(count.load(Ordering::SeqCst), 1);
        assert!(!debouncer.is_pending());
    }

    #[test]
    fn test_separate_bursts_run_separately() {
        let (scheduler, debouncer, count) = setup();

        debouncer.trigger(bump(&count)).unwrap();
        scheduler.advance(Duration::from_millis(200));
        debouncer.trigger(bump(&count)).unwrap();
        scheduler.advance(Duration::from_millis(200));

        assert_eq!(count.load(Ordering::SeqCst), 2);
    }

    #[test]
    fn test_cancel() {
        let (scheduler, debouncer, count) = setup();

        debouncer.trigger(bump(&count)).unwrap();
        assert!(debouncer.is_pending());
        assert!(debouncer.cancel());
        assert!(!debouncer.cancel());

        scheduler.advance(Duration::from_secs(1));
        assert_eq!(count.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.pending_count(), 0);
    }
}
