//! Per-user session wiring.
//!
//! A session owns one task cache and one category cache, the live
//! subscriptions feeding them, and the reminder scheduler's event loop.
//! The snapshot's lifetime is bounded by the subscription's lifetime:
//! teardown on logout or user switch cancels both subscriptions, stops the
//! pumps, and disarms every timer.

use std::sync::Arc;

use tokio::task::JoinHandle;
use tracing::debug;

use crate::category_cache::CategoryCache;
use crate::config::CoreConfig;
use crate::error::Result;
use crate::events;
use crate::reminder::{Notifier, ReminderScheduler};
use crate::search::TaskSearch;
use crate::store::RemoteStore;
use crate::task_cache::TaskCache;

/// A live, authenticated user session over the remote store.
pub struct Session {
    pub tasks: Arc<TaskCache>,
    pub categories: Arc<CategoryCache>,
    pub scheduler: Arc<ReminderScheduler>,
    pub search: TaskSearch,
    pumps: Vec<JoinHandle<()>>,
}

impl Session {
    /// Subscribe to both collections and start the snapshot pumps and the
    /// scheduler loop. The initial pushes populate the caches; the
    /// scheduler re-derives its timer table from each of them.
    pub async fn start(
        store: Arc<dyn RemoteStore>,
        notifier: Arc<dyn Notifier>,
        uid: &str,
        config: CoreConfig,
    ) -> Result<Self> {
        let (events_tx, events_rx) = events::channel();
        let tasks = Arc::new(TaskCache::new(store.clone(), uid, &config, events_tx));
        let categories = Arc::new(CategoryCache::new(store.clone(), uid));
        let scheduler = ReminderScheduler::new(notifier.clone(), Arc::clone(&tasks));
        let search = TaskSearch::new(store.clone(), uid);

        notifier.request_permission();

        let mut task_sub = store.subscribe(tasks.path()).await?;
        let mut category_sub = store.subscribe(categories.path()).await?;
        debug!(%uid, "session subscriptions opened");

        let pumps = vec![
            tokio::spawn({
                let tasks = Arc::clone(&tasks);
                async move {
                    while let Some(docs) = task_sub.next().await {
                        tasks.apply_snapshot(&docs);
                    }
                }
            }),
            tokio::spawn({
                let categories = Arc::clone(&categories);
                async move {
                    while let Some(docs) = category_sub.next().await {
                        categories.apply_snapshot(&docs);
                    }
                }
            }),
            tokio::spawn(Arc::clone(&scheduler).run(events_rx)),
        ];

        Ok(Self {
            tasks,
            categories,
            scheduler,
            search,
            pumps,
        })
    }

    /// Tear the session down: stop the pumps (dropping them cancels the
    /// subscriptions) and disarm every reminder timer.
    pub fn shutdown(mut self) {
        self.teardown();
    }

    fn teardown(&mut self) {
        for pump in self.pumps.drain(..) {
            pump.abort();
        }
        self.scheduler.disarm_all();
        debug!("session torn down");
    }
}

impl Drop for Session {
    fn drop(&mut self) {
        self.teardown();
    }
}
