//! Task model, due-date assembly, reminder math, and the cache reducer.
//!
//! The reducer is a single total function `(state, action) -> state` with no
//! hidden mutation. The same function serves optimistic local transitions
//! and authoritative server pushes, which is what makes transient
//! double-application (optimistic flip, then the same flip again via the
//! push) harmless: both applications are idempotent.

use chrono::{Local, NaiveDateTime, TimeZone, Utc};
use serde::{Deserialize, Serialize};

use crate::error::{Error, Result};
use crate::store::Document;

/// Wire format of the `due` field: local wall clock, second precision.
pub const DUE_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A task as mirrored from the remote store.
///
/// Field names on the wire are camelCase (`remindAt`, `reminderSent`,
/// `createdAt`, `titleLower`). The id is assigned by the store and is not
/// part of the serialized fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Task {
    #[serde(skip)]
    pub id: String,
    pub title: String,
    /// Lower-cased copy of `title`, maintained on every write. This is the
    /// index field prefix search orders by.
    #[serde(default)]
    pub title_lower: String,
    #[serde(default)]
    pub description: String,
    /// Name of a category, or empty meaning "uncategorized". Dangling
    /// references are tolerated and render as uncategorized.
    #[serde(default)]
    pub category: String,
    /// `"YYYY-MM-DD HH:MM:SS"`, local wall clock, not UTC-normalized.
    pub due: String,
    #[serde(default)]
    pub done: bool,
    /// Computed reminder instant, epoch milliseconds.
    #[serde(default)]
    pub remind_at: i64,
    #[serde(default)]
    pub reminder_sent: bool,
    /// Epoch milliseconds, set once at creation.
    #[serde(default)]
    pub created_at: i64,
}

impl Task {
    /// Deserialize a pushed document into a task.
    pub fn from_document(doc: &Document) -> Result<Self> {
        let mut task: Task =
            serde_json::from_value(doc.fields.clone()).map_err(|source| Error::MalformedDocument {
                id: doc.id.clone(),
                source,
            })?;
        task.id = doc.id.clone();
        Ok(task)
    }

    /// Serialize into the document fields written to the remote store.
    pub fn to_fields(&self) -> Result<serde_json::Value> {
        Ok(serde_json::to_value(self)?)
    }

    /// Parsed due instant, if the stored string is well formed.
    pub fn due_instant(&self) -> Result<NaiveDateTime> {
        parse_due(&self.due)
    }

    /// Presentation status derived from `done` and the deadline.
    pub fn status(&self, now_ms: i64) -> TaskStatus {
        if self.done {
            TaskStatus::Done
        } else if due_epoch_ms(&self.due).map(|due| due < now_ms).unwrap_or(false) {
            TaskStatus::Overdue
        } else {
            TaskStatus::Pending
        }
    }
}

/// Presentation status of a task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum TaskStatus {
    Done,
    Overdue,
    Pending,
}

/// User-entered fields for creating or editing a task.
///
/// The due instant is split into calendar date (`YYYY-MM-DD`) and time of
/// day (`HH:MM` or `HH:MM:SS`) exactly as a form would collect them.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct TaskDraft {
    pub title: String,
    pub description: String,
    pub category: String,
    pub date: String,
    pub time: String,
}

/// Status filter applied to task lists and search queries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum StatusFilter {
    All,
    Done,
    NotDone,
}

/// Filter a task list by completion status.
pub fn filter_tasks(tasks: &[Task], filter: StatusFilter) -> Vec<Task> {
    tasks
        .iter()
        .filter(|task| match filter {
            StatusFilter::All => true,
            StatusFilter::Done => task.done,
            StatusFilter::NotDone => !task.done,
        })
        .cloned()
        .collect()
}

/// Combine form date and time into the stored due string, zero-padding the
/// seconds when the time component is `HH:MM`.
pub fn build_due(date: &str, time: &str) -> String {
    let time = time.trim();
    if time.len() == 5 {
        format!("{date} {time}:00")
    } else {
        format!("{date} {time}")
    }
}

/// Parse a stored due string; failure means the draft never reaches the
/// remote store.
pub fn parse_due(due: &str) -> Result<NaiveDateTime> {
    NaiveDateTime::parse_from_str(due, DUE_FORMAT)
        .map_err(|_| Error::InvalidDueDate(due.to_string()))
}

/// Resolve a due string to epoch milliseconds in the local timezone.
///
/// A wall-clock time that does not exist locally (DST gap) is rejected the
/// same way as an unparseable one.
pub fn due_epoch_ms(due: &str) -> Result<i64> {
    let naive = parse_due(due)?;
    let resolved = Local
        .from_local_datetime(&naive)
        .earliest()
        .ok_or_else(|| Error::InvalidDueDate(due.to_string()))?;
    Ok(resolved.timestamp_millis())
}

/// Current wall-clock instant in epoch milliseconds.
pub fn now_ms() -> i64 {
    Utc::now().timestamp_millis()
}

/// Reminder instant for a deadline: the earlier of "two-thirds of the way
/// to the deadline" and "lead time before the deadline".
///
/// Near-term deadlines converge to the fixed lead; far-future deadlines are
/// reminded proportionally sooner. A `due` already in the past yields a
/// `remind_at` in the past, which the scheduler treats as "do not arm".
pub fn remind_at(now_ms: i64, due_ms: i64, lead_ms: i64) -> i64 {
    let two_thirds = now_ms + (due_ms - now_ms) * 2 / 3;
    let lead = due_ms - lead_ms;
    two_thirds.min(lead)
}

/// State transitions applied to the task snapshot, whether they originate
/// locally (optimistic) or from a remote push (authoritative).
#[derive(Debug, Clone)]
pub enum TaskAction {
    /// Replace the snapshot wholesale with a pushed set.
    Load(Vec<Task>),
    /// Flip the done flag of one task.
    Toggle { id: String, done: bool },
    /// Remove one task.
    Delete { id: String },
    /// Replace the fields of one task, keeping its identity.
    Edit { id: String, task: Task },
}

/// Pure, total state-transition function. Actions targeting unknown ids
/// leave the state unchanged.
pub fn reduce(state: Vec<Task>, action: TaskAction) -> Vec<Task> {
    match action {
        TaskAction::Load(tasks) => tasks,
        TaskAction::Toggle { id, done } => state
            .into_iter()
            .map(|task| {
                if task.id == id {
                    Task { done, ..task }
                } else {
                    task
                }
            })
            .collect(),
        TaskAction::Delete { id } => state.into_iter().filter(|task| task.id != id).collect(),
        TaskAction::Edit { id, task: replacement } => state
            .into_iter()
            .map(|task| {
                if task.id == id {
                    Task {
                        id: task.id,
                        ..replacement.clone()
                    }
                } else {
                    task
                }
            })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn task(id: &str, title: &str, done: bool) -> Task {
        Task {
            id: id.to_string(),
            title: title.to_string(),
            title_lower: title.to_lowercase(),
            description: String::new(),
            category: String::new(),
            due: "2026-09-01 12:00:00".to_string(),
            done,
            remind_at: 0,
            reminder_sent: false,
            created_at: 0,
        }
    }

    #[test]
    fn build_due_pads_seconds() {
        assert_eq!(build_due("2026-09-01", "08:30"), "2026-09-01 08:30:00");
        assert_eq!(build_due("2026-09-01", " 08:30 "), "2026-09-01 08:30:00");
        assert_eq!(build_due("2026-09-01", "08:30:15"), "2026-09-01 08:30:15");
    }

    #[test]
    fn parse_due_rejects_garbage() {
        assert!(matches!(
            parse_due("not a date"),
            Err(Error::InvalidDueDate(_))
        ));
        // February 30th is not a real calendar instant.
        assert!(parse_due("2026-02-30 10:00:00").is_err());
    }

    #[test]
    fn remind_at_proportional_branch_wins_far_out() {
        // now = T, due = T + 30min => two-thirds = T + 20min beats T + 25min
        let t = 1_000_000_000_000i64;
        let due = t + 30 * 60 * 1000;
        assert_eq!(remind_at(t, due, 5 * 60 * 1000), t + 20 * 60 * 1000);
    }

    #[test]
    fn remind_at_lead_branch_wins_near_term() {
        // now = T, due = T + 6min => lead gives T + 1min, beats T + 4min
        let t = 1_000_000_000_000i64;
        let due = t + 6 * 60 * 1000;
        assert_eq!(remind_at(t, due, 5 * 60 * 1000), t + 60 * 1000);
    }

    #[test]
    fn remind_at_exactly_lead_away_equals_due_minus_lead() {
        let t = 1_000_000_000_000i64;
        let lead = 5 * 60 * 1000;
        let due = t + lead;
        assert_eq!(remind_at(t, due, lead), due - lead);
    }

    #[test]
    fn remind_at_past_due_is_in_the_past() {
        let t = 1_000_000_000_000i64;
        let due = t - 60 * 1000;
        assert!(remind_at(t, due, 5 * 60 * 1000) < t);
    }

    #[test]
    fn remind_at_monotone_bounds() {
        let t = 1_000_000_000_000i64;
        for minutes in [15i64, 60, 24 * 60, 7 * 24 * 60] {
            let due = t + minutes * 60 * 1000;
            let at = remind_at(t, due, 5 * 60 * 1000);
            assert!(at > t, "remind_at must be in the future for {minutes}min");
            assert!(at < due, "remind_at must precede due for {minutes}min");
        }
    }

    #[test]
    fn reduce_load_replaces_wholesale() {
        let state = vec![task("a", "Old", false)];
        let next = reduce(state, TaskAction::Load(vec![task("b", "New", false)]));
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].id, "b");
    }

    #[test]
    fn reduce_toggle_flips_only_the_target() {
        let state = vec![task("a", "One", false), task("b", "Two", false)];
        let next = reduce(
            state,
            TaskAction::Toggle {
                id: "a".to_string(),
                done: true,
            },
        );
        assert!(next[0].done);
        assert!(!next[1].done);
    }

    #[test]
    fn reduce_toggle_unknown_id_is_noop() {
        let state = vec![task("a", "One", false)];
        let next = reduce(
            state.clone(),
            TaskAction::Toggle {
                id: "ghost".to_string(),
                done: true,
            },
        );
        assert_eq!(next, state);
    }

    #[test]
    fn reduce_delete_filters_by_id() {
        let state = vec![task("a", "One", false), task("b", "Two", false)];
        let next = reduce(
            state,
            TaskAction::Delete {
                id: "a".to_string(),
            },
        );
        assert_eq!(next.len(), 1);
        assert_eq!(next[0].id, "b");
    }

    #[test]
    fn reduce_edit_keeps_identity() {
        let state = vec![task("a", "One", false)];
        let mut replacement = task("ignored", "Renamed", false);
        replacement.description = "updated".to_string();
        let next = reduce(
            state,
            TaskAction::Edit {
                id: "a".to_string(),
                task: replacement,
            },
        );
        assert_eq!(next[0].id, "a");
        assert_eq!(next[0].title, "Renamed");
        assert_eq!(next[0].description, "updated");
    }

    #[test]
    fn reduce_is_idempotent_for_repeated_loads() {
        let pushed = vec![task("a", "One", true), task("b", "Two", false)];
        let once = reduce(Vec::new(), TaskAction::Load(pushed.clone()));
        let twice = reduce(once.clone(), TaskAction::Load(pushed));
        assert_eq!(once, twice);
    }

    #[test]
    fn status_reflects_done_and_deadline() {
        let now = now_ms();
        let mut done = task("a", "One", true);
        done.due = "2020-01-01 00:00:00".to_string();
        assert_eq!(done.status(now), TaskStatus::Done);

        let mut overdue = task("b", "Two", false);
        overdue.due = "2020-01-01 00:00:00".to_string();
        assert_eq!(overdue.status(now), TaskStatus::Overdue);

        let mut pending = task("c", "Three", false);
        pending.due = "2099-01-01 00:00:00".to_string();
        assert_eq!(pending.status(now), TaskStatus::Pending);
    }

    #[test]
    fn filter_tasks_matches_status() {
        let tasks = vec![task("a", "One", true), task("b", "Two", false)];
        assert_eq!(filter_tasks(&tasks, StatusFilter::All).len(), 2);
        let done = filter_tasks(&tasks, StatusFilter::Done);
        assert_eq!(done.len(), 1);
        assert_eq!(done[0].id, "a");
        let open = filter_tasks(&tasks, StatusFilter::NotDone);
        assert_eq!(open.len(), 1);
        assert_eq!(open[0].id, "b");
    }

    #[test]
    fn wire_field_names_are_camel_case() {
        let fields = task("a", "One", false).to_fields().expect("serialize");
        let object = fields.as_object().expect("object");
        assert!(object.contains_key("titleLower"));
        assert!(object.contains_key("remindAt"));
        assert!(object.contains_key("reminderSent"));
        assert!(object.contains_key("createdAt"));
        assert!(!object.contains_key("id"));
    }

    #[test]
    fn document_roundtrip_restores_id() {
        let original = task("doc-1", "One", false);
        let doc = Document {
            id: "doc-1".to_string(),
            fields: original.to_fields().expect("serialize"),
        };
        let parsed = Task::from_document(&doc).expect("parse");
        assert_eq!(parsed, original);
    }
}
