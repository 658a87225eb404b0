//! Storage module for persisting harvest data
//!
//! This module handles all database operations, including:
//! - SQLite database initialization and schema management
//! - Shard key bookkeeping (discovery inserts, processed flag)
//! - Atomic per-shard entity commits
//! - Paginated entity listing for the query service
//! - The explicit full re-crawl reset

mod schema;
mod sqlite;
mod traits;

pub use sqlite::SqliteStorage;
pub use traits::{Storage, StorageError, StorageResult};

use serde::Serialize;
use std::path::Path;
use std::sync::{Mutex, MutexGuard};

/// Initializes or opens a storage database
pub fn open_storage(path: &Path) -> StorageResult<SqliteStorage> {
    SqliteStorage::new(path)
}

/// Locks a shared store handle
///
/// The guard must be dropped before the caller next awaits.
pub fn lock<S>(storage: &Mutex<S>) -> StorageResult<MutexGuard<'_, S>> {
    storage.lock().map_err(|_| StorageError::LockPoisoned)
}

/// Represents a shard key in the database
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShardRecord {
    pub id: i64,
    pub key: String,
    pub source_url: String,
    pub processed: bool,
    pub discovered_at: String,
}

/// A shard key found by discovery, not yet stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewShard {
    pub key: String,
    pub source_url: String,
}

/// An entity row parsed from a shard listing, not yet stored
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewEntity {
    pub name: String,
    pub active_years: String,
    pub role: String,
    pub extra_info: String,
    pub profile_url: String,
}

/// Represents a stored entity row
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntityRecord {
    pub id: i64,
    pub name: String,
    pub active_years: String,
    pub role: String,
    pub extra_info: String,
    pub profile_url: String,
    pub shard_key_id: i64,
    pub created_at: String,
}

/// An entity joined with its owning shard's key, as served by the query API
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct EntityView {
    pub id: i64,
    pub name: String,
    pub active_years: String,
    pub role: String,
    pub extra_info: String,
    pub shard_key_id: i64,
    pub profile_url: String,
    pub key: String,
}

/// Result of committing a shard's parsed entities
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CommitOutcome {
    /// Entities were inserted and the shard flipped to processed
    Committed { entities: usize },

    /// The shard was already processed; nothing was written
    AlreadyProcessed,

    /// No entities were supplied; nothing was written
    NoEntities,
}

/// Counts from the full re-crawl reset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ResetReport {
    pub shards_reset: u64,
    pub entities_deleted: u64,
}
