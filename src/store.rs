//! The remote document store boundary.
//!
//! The store is an external collaborator. This module defines only the
//! primitives the core consumes (subscribe-to-collection, get-once,
//! add/update/delete-document, and a range+equality query), each keyed by a
//! logical path scoped per authenticated user.

use std::fmt;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::mpsc;

use crate::error::Result;

/// Logical path of a per-user collection, e.g. `users/{uid}/tasks`.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct CollectionPath {
    raw: String,
}

impl CollectionPath {
    pub fn tasks(uid: &str) -> Self {
        Self {
            raw: format!("users/{uid}/tasks"),
        }
    }

    pub fn categories(uid: &str) -> Self {
        Self {
            raw: format!("users/{uid}/categories"),
        }
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }
}

impl fmt::Display for CollectionPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

/// One document in a collection: store-assigned id plus its fields.
#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    pub fields: Value,
}

/// Equality clause attached to a range query (`field == value`).
#[derive(Debug, Clone, PartialEq)]
pub struct EqualityClause {
    pub field: String,
    pub value: Value,
}

impl EqualityClause {
    pub fn new(field: impl Into<String>, value: impl Into<Value>) -> Self {
        Self {
            field: field.into(),
            value: value.into(),
        }
    }
}

/// A range+equality query: order by a string field, keep documents whose
/// ordered value lies in `[lower, upper]`, then apply equality clauses.
#[derive(Debug, Clone, PartialEq)]
pub struct RangeQuery {
    pub order_by: String,
    pub lower: String,
    pub upper: String,
    pub equality: Vec<EqualityClause>,
}

pub type SnapshotReceiver = mpsc::UnboundedReceiver<Vec<Document>>;

/// A live subscription to a collection.
///
/// Delivers full snapshots in server commit order. Cancellation is
/// idempotent and also runs on drop, so every exit path (logout, user
/// switch, pump teardown) releases the subscription.
pub struct Subscription {
    receiver: SnapshotReceiver,
    cancel: Option<Box<dyn FnOnce() + Send>>,
}

impl Subscription {
    pub fn new(receiver: SnapshotReceiver, cancel: impl FnOnce() + Send + 'static) -> Self {
        Self {
            receiver,
            cancel: Some(Box::new(cancel)),
        }
    }

    /// Next pushed snapshot; `None` once the subscription is closed.
    pub async fn next(&mut self) -> Option<Vec<Document>> {
        self.receiver.recv().await
    }

    /// Unsubscribe. Safe to call more than once.
    pub fn cancel(&mut self) {
        if let Some(cancel) = self.cancel.take() {
            cancel();
        }
        self.receiver.close();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.cancel();
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription")
            .field("cancelled", &self.cancel.is_none())
            .finish()
    }
}

/// The primitives the remote document store exposes to this core.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Open a live subscription delivering the current snapshot and every
    /// subsequent change, including the caller's own writes.
    async fn subscribe(&self, path: &CollectionPath) -> Result<Subscription>;

    /// One-shot fetch of the full collection.
    async fn get_once(&self, path: &CollectionPath) -> Result<Vec<Document>>;

    /// Create a document; returns the store-assigned id.
    async fn add(&self, path: &CollectionPath, fields: Value) -> Result<String>;

    /// Merge fields into an existing document.
    async fn update(&self, path: &CollectionPath, id: &str, fields: Value) -> Result<()>;

    /// Remove a document. Removing an absent document is not an error.
    async fn delete(&self, path: &CollectionPath, id: &str) -> Result<()>;

    /// Execute a range+equality query.
    async fn range_query(&self, path: &CollectionPath, query: &RangeQuery)
        -> Result<Vec<Document>>;
}
