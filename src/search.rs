//! Incremental prefix search over the task collection.
//!
//! "Starts-with" semantics are implemented as a range query over the
//! lower-cased title index field, with the upper bound capped by a high
//! sentinel codepoint. Keystrokes are debounced; submitting the form
//! dispatches immediately.

use std::sync::{Arc, Mutex, MutexGuard};
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::debug;

use crate::error::Result;
use crate::store::{CollectionPath, EqualityClause, RangeQuery, RemoteStore};
use crate::task::{StatusFilter, Task};

/// Index field prefix queries order by.
pub const TITLE_INDEX_FIELD: &str = "titleLower";

/// Maximal codepoint in the store's collation; `[term, term + sentinel]`
/// captures every string starting with `term`.
pub const PREFIX_SENTINEL: char = '\u{f8ff}';

/// Build the remote query for a search term, or `None` for an empty term
/// (no active search: show the unfiltered cache).
pub fn build_query(term: &str, filter: StatusFilter) -> Option<RangeQuery> {
    let term = term.trim().to_lowercase();
    if term.is_empty() {
        return None;
    }
    let equality = match filter {
        StatusFilter::All => Vec::new(),
        StatusFilter::Done => vec![EqualityClause::new("done", true)],
        StatusFilter::NotDone => vec![EqualityClause::new("done", false)],
    };
    Some(RangeQuery {
        order_by: TITLE_INDEX_FIELD.to_string(),
        upper: format!("{term}{PREFIX_SENTINEL}"),
        lower: term,
        equality,
    })
}

/// Executes prefix searches against the remote task collection.
pub struct TaskSearch {
    store: Arc<dyn RemoteStore>,
    path: CollectionPath,
}

impl TaskSearch {
    pub fn new(store: Arc<dyn RemoteStore>, uid: &str) -> Self {
        Self {
            store,
            path: CollectionPath::tasks(uid),
        }
    }

    /// `Ok(None)` means no active search; `Ok(Some(tasks))` are the hits in
    /// title order.
    pub async fn search(&self, term: &str, filter: StatusFilter) -> Result<Option<Vec<Task>>> {
        let Some(query) = build_query(term, filter) else {
            return Ok(None);
        };
        debug!(term = %query.lower, ?filter, "dispatching search");
        let docs = self.store.range_query(&self.path, &query).await?;
        let tasks = docs.iter().map(Task::from_document).collect::<Result<Vec<_>>>()?;
        Ok(Some(tasks))
    }
}

/// One debounced search dispatch.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SearchRequest {
    pub term: String,
    pub filter: StatusFilter,
}

/// Collapses keystrokes into delayed dispatches: a new keystroke cancels
/// the pending dispatch and reschedules it; a form submit bypasses the
/// delay. Dispatches land on an mpsc sink the consumer drains.
pub struct Debouncer {
    delay: Duration,
    sink: mpsc::UnboundedSender<SearchRequest>,
    pending: Mutex<Option<JoinHandle<()>>>,
}

impl Debouncer {
    pub fn new(delay: Duration, sink: mpsc::UnboundedSender<SearchRequest>) -> Self {
        Self {
            delay,
            sink,
            pending: Mutex::new(None),
        }
    }

    /// A keystroke: cancel the pending dispatch and schedule a new one
    /// after the debounce delay.
    pub fn input(&self, request: SearchRequest) {
        let mut pending = self.lock();
        if let Some(handle) = pending.take() {
            handle.abort();
        }
        let sink = self.sink.clone();
        let delay = self.delay;
        *pending = Some(tokio::spawn(async move {
            tokio::time::sleep(delay).await;
            let _ = sink.send(request);
        }));
    }

    /// A form submit: dispatch immediately, bypassing the delay.
    pub fn submit(&self, request: SearchRequest) {
        self.cancel();
        let _ = self.sink.send(request);
    }

    /// Drop the pending dispatch without sending (input cleared, teardown).
    pub fn cancel(&self) {
        if let Some(handle) = self.lock().take() {
            handle.abort();
        }
    }

    fn lock(&self) -> MutexGuard<'_, Option<JoinHandle<()>>> {
        self.pending
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl Drop for Debouncer {
    fn drop(&mut self) {
        self.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_or_blank_term_builds_no_query() {
        assert!(build_query("", StatusFilter::All).is_none());
        assert!(build_query("   ", StatusFilter::Done).is_none());
    }

    #[test]
    fn query_normalizes_term_and_caps_upper_bound() {
        let query = build_query("  Buy ", StatusFilter::All).expect("query");
        assert_eq!(query.order_by, TITLE_INDEX_FIELD);
        assert_eq!(query.lower, "buy");
        assert_eq!(query.upper, format!("buy{PREFIX_SENTINEL}"));
        assert!(query.equality.is_empty());
    }

    #[test]
    fn status_filter_prepends_equality_clause() {
        let done = build_query("buy", StatusFilter::Done).expect("query");
        assert_eq!(done.equality, vec![EqualityClause::new("done", true)]);

        let not_done = build_query("buy", StatusFilter::NotDone).expect("query");
        assert_eq!(not_done.equality, vec![EqualityClause::new("done", false)]);
    }
}
