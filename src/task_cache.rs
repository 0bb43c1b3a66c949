//! Optimistic, reconciled local mirror of the task collection.
//!
//! Mutation entry points apply an optimistic local update, issue the remote
//! write, and rely on the live subscription to deliver the server-confirmed
//! snapshot. A failed write rolls the optimistic update back to its
//! pre-mutation value before the error surfaces, so the cache is always in
//! a consistent (rolled-back or confirmed) state.
//!
//! Reconciliation is full replace: every pushed snapshot becomes the
//! visible state. Last push wins, not last local intent.

use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::config::CoreConfig;
use crate::error::{Error, Result};
use crate::events::{CacheEvent, EventSender};
use crate::store::{CollectionPath, Document, RemoteStore};
use crate::task::{
    build_due, due_epoch_ms, now_ms, reduce, remind_at, Task, TaskAction, TaskDraft,
};

/// Reconciled task cache for one user session.
pub struct TaskCache {
    store: Arc<dyn RemoteStore>,
    path: CollectionPath,
    state: Arc<Mutex<Vec<Task>>>,
    events: EventSender,
    lead_ms: i64,
}

impl TaskCache {
    pub fn new(
        store: Arc<dyn RemoteStore>,
        uid: &str,
        config: &CoreConfig,
        events: EventSender,
    ) -> Self {
        Self {
            store,
            path: CollectionPath::tasks(uid),
            state: Arc::new(Mutex::new(Vec::new())),
            events,
            lead_ms: config.reminders.lead_ms(),
        }
    }

    pub fn path(&self) -> &CollectionPath {
        &self.path
    }

    /// Current visible state.
    pub fn tasks(&self) -> Vec<Task> {
        self.lock().clone()
    }

    pub fn get(&self, id: &str) -> Option<Task> {
        self.lock().iter().find(|task| task.id == id).cloned()
    }

    /// Create a task from a draft. The local view updates once the
    /// subscription delivers the new entry; no placeholder id is minted.
    pub async fn add(&self, draft: &TaskDraft) -> Result<String> {
        let task = self.materialize(draft, None)?;
        let fields = task.to_fields()?;
        let id = self.store.add(&self.path, fields).await?;
        debug!(%id, title = %task.title, "task created");
        let task = Task {
            id: id.clone(),
            ..task
        };
        let _ = self.events.send(CacheEvent::Added(task));
        Ok(id)
    }

    /// Flip the done flag: optimistic apply first, rollback on write failure.
    pub async fn toggle_done(&self, id: &str, done: bool) -> Result<()> {
        let prior = self.get(id).ok_or_else(|| Error::task_not_found(id))?;
        let updated = Task {
            done,
            ..prior.clone()
        };
        let fields = updated.to_fields()?;

        self.apply(TaskAction::Toggle {
            id: id.to_string(),
            done,
        });
        match self.store.update(&self.path, id, fields).await {
            Ok(()) => {
                let _ = self.events.send(CacheEvent::Toggled {
                    id: id.to_string(),
                    done,
                });
                Ok(())
            }
            Err(err) => {
                warn!(%id, %err, "toggle write failed, rolling back");
                self.apply(TaskAction::Toggle {
                    id: id.to_string(),
                    done: prior.done,
                });
                Err(err)
            }
        }
    }

    /// Rewrite a task from a draft. Recomputes due and the reminder instant
    /// and resets `reminder_sent`: an edited deadline invalidates any prior
    /// scheduling decision.
    pub async fn edit(&self, id: &str, draft: &TaskDraft) -> Result<()> {
        let prior = self.get(id).ok_or_else(|| Error::task_not_found(id))?;
        let updated = self.materialize(draft, Some(&prior))?;
        let fields = updated.to_fields()?;

        self.apply(TaskAction::Edit {
            id: id.to_string(),
            task: updated.clone(),
        });
        match self.store.update(&self.path, id, fields).await {
            Ok(()) => {
                let _ = self.events.send(CacheEvent::Edited(Task {
                    id: id.to_string(),
                    ..updated
                }));
                Ok(())
            }
            Err(err) => {
                warn!(%id, %err, "edit write failed, rolling back");
                self.apply(TaskAction::Edit {
                    id: id.to_string(),
                    task: prior,
                });
                Err(err)
            }
        }
    }

    /// Remove a task: optimistic removal, restore at the original position
    /// on write failure.
    pub async fn delete(&self, id: &str) -> Result<()> {
        let (index, prior) = {
            let state = self.lock();
            let index = state
                .iter()
                .position(|task| task.id == id)
                .ok_or_else(|| Error::task_not_found(id))?;
            (index, state[index].clone())
        };

        self.apply(TaskAction::Delete { id: id.to_string() });
        match self.store.delete(&self.path, id).await {
            Ok(()) => {
                let _ = self.events.send(CacheEvent::Deleted { id: id.to_string() });
                Ok(())
            }
            Err(err) => {
                warn!(%id, %err, "delete write failed, restoring entry");
                let mut state = self.lock();
                let at = index.min(state.len());
                state.insert(at, prior);
                Err(err)
            }
        }
    }

    /// Record that the reminder for a task was surfaced. Called by the
    /// scheduler on timer fire; idempotent when the flag is already set.
    pub async fn mark_reminder_sent(&self, id: &str) -> Result<()> {
        let prior = self.get(id).ok_or_else(|| Error::task_not_found(id))?;
        if prior.reminder_sent {
            return Ok(());
        }
        let updated = Task {
            reminder_sent: true,
            ..prior.clone()
        };
        let fields = updated.to_fields()?;

        self.apply(TaskAction::Edit {
            id: id.to_string(),
            task: updated,
        });
        match self.store.update(&self.path, id, fields).await {
            Ok(()) => Ok(()),
            Err(err) => {
                warn!(%id, %err, "reminder-sent write failed, rolling back");
                self.apply(TaskAction::Edit {
                    id: id.to_string(),
                    task: prior,
                });
                Err(err)
            }
        }
    }

    /// Reconcile a pushed snapshot: the visible state becomes exactly the
    /// pushed set. Malformed documents are skipped, never fatal.
    pub fn apply_snapshot(&self, docs: &[Document]) {
        let mut tasks = Vec::with_capacity(docs.len());
        for doc in docs {
            match Task::from_document(doc) {
                Ok(task) => tasks.push(task),
                Err(err) => warn!(id = %doc.id, %err, "skipping malformed task document"),
            }
        }
        debug!(count = tasks.len(), "task snapshot reconciled");
        self.apply(TaskAction::Load(tasks.clone()));
        let _ = self.events.send(CacheEvent::Loaded(tasks));
    }

    /// Build the stored task for a draft: assembled due string, computed
    /// reminder instant, maintained title index field. Carries `done` and
    /// `created_at` over from `prior` on edit.
    fn materialize(&self, draft: &TaskDraft, prior: Option<&Task>) -> Result<Task> {
        let due = build_due(&draft.date, &draft.time);
        let due_ms = due_epoch_ms(&due)?;
        let now = now_ms();
        let title = draft.title.trim().to_string();
        Ok(Task {
            id: prior.map(|task| task.id.clone()).unwrap_or_default(),
            title_lower: title.to_lowercase(),
            title,
            description: draft.description.clone(),
            category: draft.category.clone(),
            due,
            done: prior.map(|task| task.done).unwrap_or(false),
            remind_at: remind_at(now, due_ms, self.lead_ms),
            reminder_sent: false,
            created_at: prior.map(|task| task.created_at).unwrap_or(now),
        })
    }

    fn apply(&self, action: TaskAction) {
        let mut state = self.lock();
        let current = std::mem::take(&mut *state);
        *state = reduce(current, action);
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Task>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
