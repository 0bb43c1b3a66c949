//! Mutation events flowing from the task cache to the reminder scheduler.
//!
//! The scheduler observes cache mutations, never remote pushes directly:
//! the cache translates both into one typed stream.

use tokio::sync::mpsc;

use crate::task::Task;

/// A task-cache mutation the reminder scheduler reacts to.
#[derive(Debug, Clone)]
pub enum CacheEvent {
    /// An authoritative snapshot replaced the local view.
    Loaded(Vec<Task>),
    /// A new task was written; carries the store-assigned id.
    Added(Task),
    /// A task's fields were rewritten (deadline may have moved).
    Edited(Task),
    /// The done flag flipped.
    Toggled { id: String, done: bool },
    /// The task is gone.
    Deleted { id: String },
}

pub type EventSender = mpsc::UnboundedSender<CacheEvent>;
pub type EventReceiver = mpsc::UnboundedReceiver<CacheEvent>;

/// Create the cache-to-scheduler event channel.
pub fn channel() -> (EventSender, EventReceiver) {
    mpsc::unbounded_channel()
}
