//! tasklens - Reactive Task Manager Core
//!
//! This library is the headless core of a personal task manager whose data
//! lives in a remote document store and is mirrored into a local, reactive
//! cache consumed by a presentation layer.
//!
//! # Core Concepts
//!
//! - **Optimistic cache**: local mutations apply immediately and roll back
//!   if the paired remote write fails
//! - **Reconciliation**: every server push replaces the local view in full;
//!   last push wins
//! - **Reminders**: wall-clock timers derived from each task's deadline,
//!   re-armed on edit and re-derived from cache state on start
//! - **Referential integrity**: category renames and deletes never cascade;
//!   dangling task references resolve as "Uncategorized"
//! - **Prefix search**: range queries over a lower-cased title index,
//!   debounced at the input boundary
//!
//! # Module Organization
//!
//! - `config`: tunables loaded from TOML with defaults
//! - `error`: error types and result aliases
//! - `store`: the remote document store boundary (trait + query types)
//! - `memory`: in-memory store adapter for tests and embedding
//! - `task`: task model, due-date math, and the pure cache reducer
//! - `category`: category model and slug integrity rules
//! - `task_cache` / `category_cache`: the reconciled local mirrors
//! - `reminder`: per-task timer registry and notification delivery
//! - `search`: prefix query construction and keystroke debouncing
//! - `session`: per-user wiring and guaranteed subscription teardown

pub mod category;
pub mod category_cache;
pub mod config;
pub mod error;
pub mod events;
pub mod memory;
pub mod reminder;
pub mod search;
pub mod session;
pub mod slug;
pub mod store;
pub mod task;
pub mod task_cache;

pub use error::{Error, Result};
