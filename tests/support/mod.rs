#![allow(dead_code)]

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};

use chrono::{Duration, Local};

use tasklens::config::CoreConfig;
use tasklens::events::{self, EventReceiver};
use tasklens::memory::MemoryStore;
use tasklens::reminder::Notifier;
use tasklens::store::RemoteStore;
use tasklens::task::TaskDraft;
use tasklens::task_cache::TaskCache;

pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

pub fn store() -> Arc<MemoryStore> {
    Arc::new(MemoryStore::new())
}

/// Task cache wired straight to a memory store, bypassing the session.
pub fn task_cache(store: &Arc<MemoryStore>, uid: &str) -> (TaskCache, EventReceiver) {
    let (tx, rx) = events::channel();
    let remote: Arc<dyn RemoteStore> = Arc::clone(store) as Arc<dyn RemoteStore>;
    let cache = TaskCache::new(remote, uid, &CoreConfig::default(), tx);
    (cache, rx)
}

pub fn draft(title: &str, date: &str, time: &str) -> TaskDraft {
    TaskDraft {
        title: title.to_string(),
        description: format!("{title} description"),
        category: String::new(),
        date: date.to_string(),
        time: time.to_string(),
    }
}

/// Draft whose deadline sits the given number of minutes ahead of the local
/// wall clock.
pub fn future_draft(title: &str, minutes_ahead: i64) -> TaskDraft {
    let due = Local::now() + Duration::minutes(minutes_ahead);
    draft(
        title,
        &due.format("%Y-%m-%d").to_string(),
        &due.format("%H:%M:%S").to_string(),
    )
}

/// Let spawned tasks (snapshot pumps, timer handlers) run to quiescence.
pub async fn settle() {
    for _ in 0..50 {
        tokio::task::yield_now().await;
    }
}

/// Notification boundary double that records permission requests and fires.
pub struct RecordingNotifier {
    granted: AtomicBool,
    requested: AtomicBool,
    fired: Mutex<Vec<(String, String)>>,
}

impl RecordingNotifier {
    pub fn granted() -> Arc<Self> {
        Arc::new(Self {
            granted: AtomicBool::new(true),
            requested: AtomicBool::new(false),
            fired: Mutex::new(Vec::new()),
        })
    }

    pub fn denied() -> Arc<Self> {
        let notifier = Self::granted();
        notifier.granted.store(false, Ordering::SeqCst);
        notifier
    }

    pub fn was_requested(&self) -> bool {
        self.requested.load(Ordering::SeqCst)
    }

    pub fn fired(&self) -> Vec<(String, String)> {
        self.fired.lock().expect("notifier lock").clone()
    }
}

impl Notifier for RecordingNotifier {
    fn is_permission_granted(&self) -> bool {
        self.granted.load(Ordering::SeqCst)
    }

    fn request_permission(&self) {
        self.requested.store(true, Ordering::SeqCst);
    }

    fn fire(&self, title: &str, body: &str) {
        self.fired
            .lock()
            .expect("notifier lock")
            .push((title.to_string(), body.to_string()));
    }
}
