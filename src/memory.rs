//! In-memory implementation of the remote store boundary.
//!
//! Serves as the reference adapter for tests and embedded use. It models
//! the one behavior the caches depend on: every committed write is followed
//! by a push of the full collection to every live subscriber, so a caller
//! always observes its own writes through its subscription.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::anyhow;
use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;
use uuid::Uuid;

use crate::error::{Error, Result};
use crate::store::{CollectionPath, Document, RangeQuery, RemoteStore, Subscription};

type SnapshotSender = mpsc::UnboundedSender<Vec<Document>>;

#[derive(Default)]
struct Inner {
    /// Documents per path, insertion order preserved.
    collections: HashMap<String, Vec<Document>>,
    /// Live subscribers per path.
    subscribers: HashMap<String, Vec<(u64, SnapshotSender)>>,
    next_subscriber_id: u64,
    /// When set, the next add/update/delete fails once.
    fail_next_write: bool,
}

/// In-memory remote store.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Inner>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make the next write operation fail with a transport error, so
    /// rollback paths can be exercised.
    pub fn fail_next_write(&self) {
        self.lock().fail_next_write = true;
    }

    /// Number of live subscribers on a path (teardown checks).
    pub fn subscriber_count(&self, path: &CollectionPath) -> usize {
        self.lock()
            .subscribers
            .get(path.as_str())
            .map(|subs| subs.len())
            .unwrap_or(0)
    }

    /// Insert a document verbatim and notify subscribers. Lets tests stage
    /// malformed documents or simulate writes from another device.
    pub fn insert_raw(&self, path: &CollectionPath, doc: Document) {
        let mut inner = self.lock();
        inner
            .collections
            .entry(path.as_str().to_string())
            .or_default()
            .push(doc);
        notify(&mut inner, path.as_str());
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn take_write_failure(inner: &mut Inner) -> bool {
        std::mem::take(&mut inner.fail_next_write)
    }
}

/// Push the current snapshot of `path` to every live subscriber, pruning
/// the ones whose receiver is gone.
fn notify(inner: &mut Inner, path: &str) {
    let snapshot = inner.collections.get(path).cloned().unwrap_or_default();
    if let Some(subscribers) = inner.subscribers.get_mut(path) {
        subscribers.retain(|(_, sender)| sender.send(snapshot.clone()).is_ok());
    }
}

fn merge_fields(existing: &mut Value, patch: &Value) {
    match (existing.as_object_mut(), patch.as_object()) {
        (Some(target), Some(source)) => {
            for (key, value) in source {
                target.insert(key.clone(), value.clone());
            }
        }
        _ => *existing = patch.clone(),
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn subscribe(&self, path: &CollectionPath) -> Result<Subscription> {
        let (sender, receiver) = mpsc::unbounded_channel();
        let (subscriber_id, snapshot) = {
            let mut inner = self.lock();
            let id = inner.next_subscriber_id;
            inner.next_subscriber_id += 1;
            inner
                .subscribers
                .entry(path.as_str().to_string())
                .or_default()
                .push((id, sender.clone()));
            let snapshot = inner
                .collections
                .get(path.as_str())
                .cloned()
                .unwrap_or_default();
            (id, snapshot)
        };
        // Initial snapshot, mirroring a live listener's first delivery.
        let _ = sender.send(snapshot);

        let inner = Arc::clone(&self.inner);
        let key = path.as_str().to_string();
        Ok(Subscription::new(receiver, move || {
            let mut inner = inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
            if let Some(subscribers) = inner.subscribers.get_mut(&key) {
                subscribers.retain(|(id, _)| *id != subscriber_id);
            }
        }))
    }

    async fn get_once(&self, path: &CollectionPath) -> Result<Vec<Document>> {
        Ok(self
            .lock()
            .collections
            .get(path.as_str())
            .cloned()
            .unwrap_or_default())
    }

    async fn add(&self, path: &CollectionPath, fields: Value) -> Result<String> {
        let mut inner = self.lock();
        if Self::take_write_failure(&mut inner) {
            return Err(Error::remote_write(anyhow!("injected write failure")));
        }
        let id = Uuid::new_v4().to_string();
        inner
            .collections
            .entry(path.as_str().to_string())
            .or_default()
            .push(Document {
                id: id.clone(),
                fields,
            });
        notify(&mut inner, path.as_str());
        Ok(id)
    }

    async fn update(&self, path: &CollectionPath, id: &str, fields: Value) -> Result<()> {
        let mut inner = self.lock();
        if Self::take_write_failure(&mut inner) {
            return Err(Error::remote_write(anyhow!("injected write failure")));
        }
        let Some(doc) = inner
            .collections
            .get_mut(path.as_str())
            .and_then(|docs| docs.iter_mut().find(|doc| doc.id == id))
        else {
            return Err(Error::remote_write(anyhow!(
                "no document {id} in {path}"
            )));
        };
        merge_fields(&mut doc.fields, &fields);
        notify(&mut inner, path.as_str());
        Ok(())
    }

    async fn delete(&self, path: &CollectionPath, id: &str) -> Result<()> {
        let mut inner = self.lock();
        if Self::take_write_failure(&mut inner) {
            return Err(Error::remote_write(anyhow!("injected write failure")));
        }
        if let Some(docs) = inner.collections.get_mut(path.as_str()) {
            docs.retain(|doc| doc.id != id);
        }
        notify(&mut inner, path.as_str());
        Ok(())
    }

    async fn range_query(
        &self,
        path: &CollectionPath,
        query: &RangeQuery,
    ) -> Result<Vec<Document>> {
        let docs = self
            .lock()
            .collections
            .get(path.as_str())
            .cloned()
            .unwrap_or_default();

        let mut hits: Vec<(String, Document)> = docs
            .into_iter()
            .filter_map(|doc| {
                let ordered = doc.fields.get(&query.order_by)?.as_str()?.to_string();
                if ordered.as_str() < query.lower.as_str()
                    || ordered.as_str() > query.upper.as_str()
                {
                    return None;
                }
                let matches_equality = query.equality.iter().all(|clause| {
                    doc.fields.get(&clause.field) == Some(&clause.value)
                });
                matches_equality.then_some((ordered, doc))
            })
            .collect();
        hits.sort_by(|(left, _), (right, _)| left.cmp(right));
        Ok(hits.into_iter().map(|(_, doc)| doc).collect())
    }
}
