//! Reminder scheduling: per-task wall-clock timers over the cache state.
//!
//! The timer table is an explicit registry owned by the scheduler, keyed by
//! task id: armed on add/edit, disarmed on delete/complete, re-derived from
//! cache state on process start and on every snapshot. Timers are
//! in-memory and best-effort; they do not survive a restart, which is why
//! `sync` exists.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::events::{CacheEvent, EventReceiver};
use crate::task::{now_ms, Task};
use crate::task_cache::TaskCache;

/// The notification boundary consumed by the scheduler.
pub trait Notifier: Send + Sync {
    fn is_permission_granted(&self) -> bool;
    fn request_permission(&self) {}
    fn fire(&self, title: &str, body: &str);
}

struct ArmedReminder {
    remind_at: i64,
    handle: JoinHandle<()>,
}

/// Owns the per-task timer registry and delivers notifications.
pub struct ReminderScheduler {
    notifier: Arc<dyn Notifier>,
    tasks: Arc<TaskCache>,
    registry: Mutex<HashMap<String, ArmedReminder>>,
}

impl ReminderScheduler {
    pub fn new(notifier: Arc<dyn Notifier>, tasks: Arc<TaskCache>) -> Arc<Self> {
        Arc::new(Self {
            notifier,
            tasks,
            registry: Mutex::new(HashMap::new()),
        })
    }

    /// A task deserves a timer when it is not done, its reminder has not
    /// been sent, and its reminder instant is still ahead of the clock.
    /// A `remind_at` already in the past never fires for that edit.
    fn eligible(task: &Task) -> bool {
        !task.done && !task.reminder_sent && task.remind_at > now_ms()
    }

    /// Cancel any existing timer for the task, then arm a new one firing at
    /// its reminder instant, provided permission is granted and the task is
    /// eligible.
    pub fn arm(self: &Arc<Self>, task: &Task) {
        self.disarm(&task.id);
        if task.id.is_empty() || !self.notifier.is_permission_granted() || !Self::eligible(task) {
            return;
        }
        let delay = Duration::from_millis(u64::try_from(task.remind_at - now_ms()).unwrap_or(0));
        let scheduler = Arc::clone(self);
        let id = task.id.clone();
        let sleep = tokio::time::sleep(delay);
        let handle = tokio::spawn(async move {
            sleep.await;
            scheduler.fire(&id).await;
        });
        debug!(id = %task.id, remind_at = task.remind_at, "reminder armed");
        self.lock().insert(
            task.id.clone(),
            ArmedReminder {
                remind_at: task.remind_at,
                handle,
            },
        );
    }

    /// Cancel the timer for a task id, if any.
    pub fn disarm(&self, id: &str) {
        if let Some(entry) = self.lock().remove(id) {
            entry.handle.abort();
            debug!(%id, "reminder disarmed");
        }
    }

    /// Cancel every timer (session teardown).
    pub fn disarm_all(&self) {
        let mut registry = self.lock();
        for (_, entry) in registry.drain() {
            entry.handle.abort();
        }
    }

    /// Re-derive the whole timer table from cache state: disarm ids that
    /// are gone or no longer eligible, arm eligible tasks that are new or
    /// whose reminder instant moved.
    pub fn sync(self: &Arc<Self>, tasks: &[Task]) {
        let armed: HashMap<String, i64> = self
            .lock()
            .iter()
            .map(|(id, entry)| (id.clone(), entry.remind_at))
            .collect();
        let eligible: HashMap<&str, &Task> = tasks
            .iter()
            .filter(|task| Self::eligible(task))
            .map(|task| (task.id.as_str(), task))
            .collect();

        let stale: HashSet<String> = armed
            .keys()
            .filter(|id| !eligible.contains_key(id.as_str()))
            .cloned()
            .collect();
        for id in &stale {
            self.disarm(id);
        }
        for (id, task) in eligible {
            if armed.get(id).copied() != Some(task.remind_at) {
                self.arm(task);
            }
        }
    }

    /// Whether a timer is currently armed for the task.
    pub fn is_armed(&self, id: &str) -> bool {
        self.lock().contains_key(id)
    }

    pub fn armed_count(&self) -> usize {
        self.lock().len()
    }

    /// Timer handler. The cancellation paths should already have fired for
    /// completed or deleted tasks; current cache state is re-checked anyway.
    async fn fire(&self, id: &str) {
        self.lock().remove(id);
        let Some(task) = self.tasks.get(id) else {
            return;
        };
        if task.done || task.reminder_sent {
            return;
        }
        self.notifier
            .fire(&task.title, &format!("Due {}", task.due));
        debug!(%id, "reminder fired");
        if let Err(err) = self.tasks.mark_reminder_sent(id).await {
            warn!(%id, %err, "failed to record reminder delivery");
        }
    }

    /// Event loop: consumes the task cache's mutation stream until the
    /// channel closes.
    pub async fn run(self: Arc<Self>, mut events: EventReceiver) {
        while let Some(event) = events.recv().await {
            match event {
                CacheEvent::Loaded(tasks) => self.sync(&tasks),
                CacheEvent::Added(task) | CacheEvent::Edited(task) => self.arm(&task),
                CacheEvent::Toggled { id, done: true } => self.disarm(&id),
                CacheEvent::Toggled { id, done: false } => {
                    if let Some(task) = self.tasks.get(&id) {
                        self.arm(&task);
                    }
                }
                CacheEvent::Deleted { id } => self.disarm(&id),
            }
        }
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<String, ArmedReminder>> {
        self.registry
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
