//! Storage traits and error types
//!
//! This module defines the trait interface for storage backends and
//! associated error types.

use crate::query::{SortColumn, SortOrder};
use crate::storage::{
    CommitOutcome, EntityRecord, EntityView, NewEntity, NewShard, ResetReport, ShardRecord,
};
use rusqlite::ErrorCode;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    /// Another writer holds the database lock; safe to retry shortly
    #[error("Database is busy: {0}")]
    Busy(String),

    #[error("Shard not found: {0}")]
    ShardNotFound(i64),

    #[error("Storage lock poisoned")]
    LockPoisoned,

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("SQLite error: {0}")]
    Sqlite(rusqlite::Error),
}

impl StorageError {
    /// Returns true for transient lock contention
    pub fn is_busy(&self) -> bool {
        matches!(self, Self::Busy(_))
    }
}

impl From<rusqlite::Error> for StorageError {
    fn from(err: rusqlite::Error) -> Self {
        match err.sqlite_error_code() {
            Some(ErrorCode::DatabaseBusy) | Some(ErrorCode::DatabaseLocked) => {
                Self::Busy(err.to_string())
            }
            _ => Self::Sqlite(err),
        }
    }
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for storage backend implementations
///
/// This trait defines all database operations needed by discovery, the
/// entity crawler and the query service.
pub trait Storage: Send {
    // ===== Shard Keys =====

    /// Checks whether a shard key is already stored
    fn shard_exists(&self, key: &str) -> StorageResult<bool>;

    /// Inserts newly discovered shards in a single transaction
    ///
    /// Keys that already exist are left untouched.
    ///
    /// # Returns
    ///
    /// The number of rows actually inserted
    fn insert_shards(&mut self, shards: &[NewShard]) -> StorageResult<usize>;

    /// Gets a shard by ID
    fn get_shard(&self, shard_id: i64) -> StorageResult<ShardRecord>;

    /// Gets a shard by its key
    fn get_shard_by_key(&self, key: &str) -> StorageResult<Option<ShardRecord>>;

    /// Gets up to `limit` unprocessed shards, oldest first
    fn pending_shards(&self, limit: u32) -> StorageResult<Vec<ShardRecord>>;

    /// Gets every shard ordered by ID
    fn list_shards(&self) -> StorageResult<Vec<ShardRecord>>;

    /// Gets the most recently discovered shards, newest first
    fn latest_shards(&self, limit: u32) -> StorageResult<Vec<ShardRecord>>;

    /// Counts all shards
    fn count_shards(&self) -> StorageResult<u64>;

    /// Counts shards with the given processed flag
    fn count_shards_by_status(&self, processed: bool) -> StorageResult<u64>;

    // ===== Entities =====

    /// Writes a shard's entities and flags it processed as one transaction
    ///
    /// The flag update only applies to a shard that is still unprocessed, so a
    /// shard can be committed at most once between resets.
    fn commit_shard(
        &mut self,
        shard_id: i64,
        entities: &[NewEntity],
    ) -> StorageResult<CommitOutcome>;

    /// Gets all entities owned by a shard, ordered by ID
    fn entities_for_shard(&self, shard_id: i64) -> StorageResult<Vec<EntityRecord>>;

    /// Counts all entities
    fn count_entities(&self) -> StorageResult<u64>;

    /// Gets one page of entities joined with their shard key
    ///
    /// Rows are ordered by `column` in `order`, then by entity ID ascending.
    fn list_entities(
        &self,
        column: SortColumn,
        order: SortOrder,
        limit: u32,
        offset: u64,
    ) -> StorageResult<Vec<EntityView>>;

    // ===== Maintenance =====

    /// Deletes every entity and marks every shard unprocessed
    fn reset_all(&mut self) -> StorageResult<ResetReport>;
}
