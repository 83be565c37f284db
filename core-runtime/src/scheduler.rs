//! # Scheduling Helpers
//!
//! Deferral helpers on top of the [`TaskScheduler`] bridge, plus
//! [`ManualScheduler`], a deterministic scheduler driven by hand. Headless
//! hosts and test suites use it to control exactly when deferred mounts and
//! debounce timers fire.

use std::time::Duration;

use bridge_traits::error::Result as BridgeResult;
use bridge_traits::scheduler::{ScheduledTask, TaskId, TaskScheduler};
use parking_lot::Mutex;
use tracing::trace;

/// Schedule `task` at the lowest priority the host offers: an idle callback
/// when available, otherwise a zero-delay timer.
pub fn defer_low_priority(scheduler: &dyn TaskScheduler, task: ScheduledTask) -> BridgeResult<TaskId> {
    if scheduler.supports_idle() {
        scheduler.schedule_idle(task)
    } else {
        scheduler.schedule_timeout(Duration::ZERO, task)
    }
}

struct PendingTimer {
    id: TaskId,
    due: Duration,
    task: ScheduledTask,
}

#[derive(Default)]
struct ManualState {
    now: Duration,
    next_id: u64,
    idle: Vec<(TaskId, ScheduledTask)>,
    timers: Vec<PendingTimer>,
}

impl ManualState {
    fn allocate_id(&mut self) -> TaskId {
        self.next_id += 1;
        TaskId(self.next_id)
    }
}

/// Scheduler whose clock only moves when told to.
///
/// Tasks never run while the internal lock is held, so a task may schedule
/// or cancel other tasks.
pub struct ManualScheduler {
    state: Mutex<ManualState>,
    supports_idle: bool,
}

impl ManualScheduler {
    /// Scheduler offering both idle callbacks and timers.
    pub fn new() -> Self {
        Self {
            state: Mutex::new(ManualState::default()),
            supports_idle: true,
        }
    }

    /// Scheduler with timers only, like hosts lacking an idle callback.
    pub fn without_idle() -> Self {
        Self {
            state: Mutex::new(ManualState::default()),
            supports_idle: false,
        }
    }

    /// Current virtual time since creation.
    pub fn now(&self) -> Duration {
        self.state.lock().now
    }

    pub fn pending_idle(&self) -> usize {
        self.state.lock().idle.len()
    }

    pub fn pending_timers(&self) -> usize {
        self.state.lock().timers.len()
    }

    pub fn pending_count(&self) -> usize {
        let state = self.state.lock();
        state.idle.len() + state.timers.len()
    }

    /// Run the idle tasks queued so far. Tasks queued while running wait for
    /// the next call. Returns how many ran.
    pub fn run_idle(&self) -> usize {
        let batch = std::mem::take(&mut self.state.lock().idle);
        let count = batch.len();
        for (id, task) in batch {
            trace!(task_id = id.0, "Running idle task");
            task();
        }
        count
    }

    /// Move the clock forward by `by`, firing due timers in deadline order.
    /// Returns how many timers fired.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.state.lock().now + by;
        let mut fired = 0;

        loop {
            let next = {
                let mut state = self.state.lock();
                let position = state
                    .timers
                    .iter()
                    .enumerate()
                    .filter(|(_, timer)| timer.due <= target)
                    .min_by_key(|(_, timer)| (timer.due, timer.id))
                    .map(|(index, _)| index);

                match position {
                    Some(index) => {
                        let timer = state.timers.remove(index);
                        state.now = state.now.max(timer.due);
                        Some(timer)
                    }
                    None => {
                        state.now = target;
                        None
                    }
                }
            };

            let Some(timer) = next else {
                break;
            };

            trace!(task_id = timer.id.0, "Firing timer");
            (timer.task)();
            fired += 1;
        }

        fired
    }

    /// Run idle tasks and zero-delay timers until nothing is immediately
    /// runnable. Returns how many tasks ran.
    pub fn run_until_stalled(&self) -> usize {
        let mut total = 0;
        loop {
            let ran = self.run_idle() + self.advance(Duration::ZERO);
            if ran == 0 {
                return total;
            }
            total += ran;
        }
    }
}

impl Default for ManualScheduler {
    fn default() -> Self {
        Self::new()
    }
}

impl TaskScheduler for ManualScheduler {
    fn supports_idle(&self) -> bool {
        self.supports_idle
    }

    fn schedule_idle(&self, task: ScheduledTask) -> BridgeResult<TaskId> {
        if !self.supports_idle {
            return Err(bridge_traits::BridgeError::NotAvailable(
                "idle callbacks disabled on this scheduler".to_string(),
            ));
        }
        let mut state = self.state.lock();
        let id = state.allocate_id();
        state.idle.push((id, task));
        Ok(id)
    }

    fn schedule_timeout(&self, delay: Duration, task: ScheduledTask) -> BridgeResult<TaskId> {
        let mut state = self.state.lock();
        let id = state.allocate_id();
        let due = state.now + delay;
        state.timers.push(PendingTimer { id, due, task });
        Ok(id)
    }

    fn cancel(&self, id: TaskId) {
        let mut state = self.state.lock();
        state.idle.retain(|(pending, _)| *pending != id);
        state.timers.retain(|timer| timer.id != id);
    }
}

impl std::fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state.lock();
        f.debug_struct("ManualScheduler")
            .field("now", &state.now)
            .field("idle", &state.idle.len())
            .field("timers", &state.timers.len())
            .field("supports_idle", &self.supports_idle)
            .finish()
    }
}
