//! Reconciled local mirror of the category collection.
//!
//! Categories have no optimistic-apply path: operations are rare and a
//! brief loading state is acceptable, so the visible state only ever
//! changes on a pushed snapshot. The cache owns the case-insensitive
//! uniqueness check and slug assignment; deletion never cascades to tasks.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

use tracing::{debug, warn};

use crate::category::{resolve, Category, DEFAULT_COLOR, UNCATEGORIZED};
use crate::error::{Error, Result};
use crate::slug::slugify;
use crate::store::{CollectionPath, Document, RangeQuery, RemoteStore};
use crate::task::Task;

/// Reconciled category cache for one user session.
pub struct CategoryCache {
    store: Arc<dyn RemoteStore>,
    path: CollectionPath,
    tasks_path: CollectionPath,
    state: Arc<Mutex<Vec<Category>>>,
    /// Set once the first snapshot arrives; before that, uniqueness checks
    /// go through a one-shot fetch.
    loaded: AtomicBool,
}

impl CategoryCache {
    pub fn new(store: Arc<dyn RemoteStore>, uid: &str) -> Self {
        Self {
            store,
            path: CollectionPath::categories(uid),
            tasks_path: CollectionPath::tasks(uid),
            state: Arc::new(Mutex::new(Vec::new())),
            loaded: AtomicBool::new(false),
        }
    }

    pub fn path(&self) -> &CollectionPath {
        &self.path
    }

    /// Current visible state.
    pub fn categories(&self) -> Vec<Category> {
        self.lock().clone()
    }

    pub fn get(&self, id: &str) -> Option<Category> {
        self.lock().iter().find(|category| category.id == id).cloned()
    }

    /// Create a category. Fails with `DuplicateName` before any write when
    /// the trimmed name collides case-insensitively with an existing one.
    pub async fn create(&self, name: &str, color: &str) -> Result<String> {
        let name = name.trim();
        if self.name_exists(name, None).await? {
            return Err(Error::DuplicateName(name.to_string()));
        }
        let category = Category {
            id: String::new(),
            name: name.to_string(),
            color: if color.is_empty() {
                DEFAULT_COLOR.to_string()
            } else {
                color.to_string()
            },
            link: slugify(name),
        };
        let id = self.store.add(&self.path, category.to_fields()?).await?;
        debug!(%id, name = %category.name, link = %category.link, "category created");
        Ok(id)
    }

    /// Rename and recolor a category, regenerating its slug. The duplicate
    /// check excludes the category being renamed, so a pure recolor or case
    /// change of the same name succeeds.
    pub async fn rename(&self, id: &str, new_name: &str, new_color: &str) -> Result<()> {
        let new_name = new_name.trim();
        let current = self
            .find(id)
            .await?
            .ok_or_else(|| Error::category_not_found(id))?;
        if self.name_exists(new_name, Some(id)).await? {
            return Err(Error::DuplicateName(new_name.to_string()));
        }
        let updated = Category {
            id: current.id,
            name: new_name.to_string(),
            color: if new_color.is_empty() {
                current.color
            } else {
                new_color.to_string()
            },
            link: slugify(new_name),
        };
        self.store
            .update(&self.path, id, updated.to_fields()?)
            .await?;
        debug!(%id, name = %updated.name, link = %updated.link, "category renamed");
        Ok(())
    }

    /// Delete a category. Tasks referencing it are left untouched and will
    /// resolve as uncategorized.
    pub async fn delete(&self, id: &str) -> Result<()> {
        if self.find(id).await?.is_none() {
            return Err(Error::category_not_found(id));
        }
        self.store.delete(&self.path, id).await?;
        debug!(%id, "category deleted");
        Ok(())
    }

    /// Reconcile a pushed snapshot: full replace, malformed documents are
    /// skipped.
    pub fn apply_snapshot(&self, docs: &[Document]) {
        let mut categories = Vec::with_capacity(docs.len());
        for doc in docs {
            match Category::from_document(doc) {
                Ok(category) => categories.push(category),
                Err(err) => warn!(id = %doc.id, %err, "skipping malformed category document"),
            }
        }
        debug!(count = categories.len(), "category snapshot reconciled");
        *self.lock() = categories;
        self.loaded.store(true, Ordering::Release);
    }

    /// Look a category up by slug: first match in snapshot order. A miss
    /// means "category not found" and the consumer should redirect away.
    pub fn by_slug(&self, slug: &str) -> Option<Category> {
        self.lock()
            .iter()
            .find(|category| category.link == slug)
            .cloned()
    }

    /// Display name for a task's category reference; empty and dangling
    /// references resolve as "Uncategorized".
    pub fn display_name(&self, reference: &str) -> String {
        resolve(&self.lock(), reference)
            .map(|category| category.name.clone())
            .unwrap_or_else(|| UNCATEGORIZED.to_string())
    }

    /// Display color for a task's category reference, with the gray
    /// fallback for unresolved references.
    pub fn display_color(&self, reference: &str) -> String {
        resolve(&self.lock(), reference)
            .map(|category| category.color.clone())
            .unwrap_or_else(|| DEFAULT_COLOR.to_string())
    }

    /// Fetch the tasks assigned to a category name, expressed as a
    /// degenerate range (`[name, name]`) over the category field.
    pub async fn tasks_in_category(&self, name: &str) -> Result<Vec<Task>> {
        let query = RangeQuery {
            order_by: "category".to_string(),
            lower: name.to_string(),
            upper: name.to_string(),
            equality: Vec::new(),
        };
        let docs = self.store.range_query(&self.tasks_path, &query).await?;
        docs.iter().map(Task::from_document).collect()
    }

    /// Case-insensitive existence scan. Uses the snapshot when loaded,
    /// otherwise a one-shot fetch.
    async fn name_exists(&self, name: &str, exclude_id: Option<&str>) -> Result<bool> {
        let needle = name.trim().to_lowercase();
        let candidates = self.candidates().await?;
        Ok(candidates.iter().any(|category| {
            exclude_id != Some(category.id.as_str())
                && category.name.trim().to_lowercase() == needle
        }))
    }

    async fn find(&self, id: &str) -> Result<Option<Category>> {
        Ok(self
            .candidates()
            .await?
            .into_iter()
            .find(|category| category.id == id))
    }

    async fn candidates(&self) -> Result<Vec<Category>> {
        if self.loaded.load(Ordering::Acquire) {
            return Ok(self.categories());
        }
        let docs = self.store.get_once(&self.path).await?;
        Ok(docs
            .iter()
            .filter_map(|doc| Category::from_document(doc).ok())
            .collect())
    }

    fn lock(&self) -> MutexGuard<'_, Vec<Category>> {
        self.state.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
