//! SQLite storage implementation
//!
//! This module provides a SQLite-based implementation of the Storage trait.

use crate::query::{SortColumn, SortOrder};
use crate::storage::schema::initialize_schema;
use crate::storage::traits::{Storage, StorageError, StorageResult};
use crate::storage::{
    CommitOutcome, EntityRecord, EntityView, NewEntity, NewShard, ResetReport, ShardRecord,
};
use chrono::Utc;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::path::Path;
use std::time::Duration;

const SHARD_COLUMNS: &str = "id, key, source_url, processed, discovered_at";

/// SQLite storage backend
pub struct SqliteStorage {
    conn: Connection,
}

impl SqliteStorage {
    /// Creates a new SqliteStorage instance
    ///
    /// Missing parent directories of `path` are created.
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the SQLite database file
    ///
    /// # Returns
    ///
    /// * `Ok(SqliteStorage)` - Successfully opened/created database
    /// * `Err(StorageError)` - Failed to open database
    pub fn new(path: &Path) -> StorageResult<Self> {
        if let Some(parent) = path.parent() {
            if !parent.as_os_str().is_empty() {
                std::fs::create_dir_all(parent)?;
            }
        }

        let conn = Connection::open(path)?;
        // Busy writers surface at once; the crawler owns the retry schedule
        conn.busy_timeout(Duration::ZERO)?;

        conn.execute_batch(
            "
            PRAGMA journal_mode = WAL;
            PRAGMA synchronous = NORMAL;
            PRAGMA foreign_keys = ON;
            PRAGMA temp_store = MEMORY;
        ",
        )?;

        initialize_schema(&conn)?;

        Ok(Self { conn })
    }

    /// Creates an in-memory database (for testing)
    #[cfg(test)]
    pub fn new_in_memory() -> StorageResult<Self> {
        let conn = Connection::open_in_memory()?;
        conn.busy_timeout(Duration::ZERO)?;
        conn.execute_batch("PRAGMA foreign_keys = ON;")?;
        initialize_schema(&conn)?;
        Ok(Self { conn })
    }

    fn shard_from_row(row: &Row<'_>) -> rusqlite::Result<ShardRecord> {
        Ok(ShardRecord {
            id: row.get(0)?,
            key: row.get(1)?,
            source_url: row.get(2)?,
            processed: row.get::<_, i64>(3)? != 0,
            discovered_at: row.get(4)?,
        })
    }

    fn count(&self, sql: &str) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(sql, [], |row| row.get(0))?;
        Ok(count as u64)
    }
}

impl Storage for SqliteStorage {
    // ===== Shard Keys =====

    fn shard_exists(&self, key: &str) -> StorageResult<bool> {
        let existing: Option<i64> = self
            .conn
            .query_row(
                "SELECT id FROM shard_keys WHERE key = ?1",
                params![key],
                |row| row.get(0),
            )
            .optional()?;

        Ok(existing.is_some())
    }

    fn insert_shards(&mut self, shards: &[NewShard]) -> StorageResult<usize> {
        let now = Utc::now().to_rfc3339();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let mut inserted = 0;
        {
            let mut stmt = tx.prepare(
                "INSERT INTO shard_keys (key, source_url, processed, discovered_at)
                 VALUES (?1, ?2, 0, ?3)
                 ON CONFLICT(key) DO NOTHING",
            )?;
            for shard in shards {
                inserted += stmt.execute(params![shard.key, shard.source_url, now])?;
            }
        }

        tx.commit()?;
        Ok(inserted)
    }

    fn get_shard(&self, shard_id: i64) -> StorageResult<ShardRecord> {
        self.conn
            .query_row(
                &format!("SELECT {} FROM shard_keys WHERE id = ?1", SHARD_COLUMNS),
                params![shard_id],
                Self::shard_from_row,
            )
            .optional()?
            .ok_or(StorageError::ShardNotFound(shard_id))
    }

    fn get_shard_by_key(&self, key: &str) -> StorageResult<Option<ShardRecord>> {
        let shard = self
            .conn
            .query_row(
                &format!("SELECT {} FROM shard_keys WHERE key = ?1", SHARD_COLUMNS),
                params![key],
                Self::shard_from_row,
            )
            .optional()?;

        Ok(shard)
    }

    fn pending_shards(&self, limit: u32) -> StorageResult<Vec<ShardRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM shard_keys WHERE processed = 0 ORDER BY id ASC LIMIT ?1",
            SHARD_COLUMNS
        ))?;

        let shards = stmt
            .query_map(params![limit], Self::shard_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(shards)
    }

    fn list_shards(&self) -> StorageResult<Vec<ShardRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM shard_keys ORDER BY id ASC",
            SHARD_COLUMNS
        ))?;

        let shards = stmt
            .query_map([], Self::shard_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(shards)
    }

    fn latest_shards(&self, limit: u32) -> StorageResult<Vec<ShardRecord>> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM shard_keys ORDER BY id DESC LIMIT ?1",
            SHARD_COLUMNS
        ))?;

        let shards = stmt
            .query_map(params![limit], Self::shard_from_row)?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(shards)
    }

    fn count_shards(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM shard_keys")
    }

    fn count_shards_by_status(&self, processed: bool) -> StorageResult<u64> {
        let count: i64 = self.conn.query_row(
            "SELECT COUNT(*) FROM shard_keys WHERE processed = ?1",
            params![processed as i64],
            |row| row.get(0),
        )?;
        Ok(count as u64)
    }

    // ===== Entities =====

    fn commit_shard(
        &mut self,
        shard_id: i64,
        entities: &[NewEntity],
    ) -> StorageResult<CommitOutcome> {
        if entities.is_empty() {
            return Ok(CommitOutcome::NoEntities);
        }

        let now = Utc::now().to_rfc3339();
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        // Claim the shard first; a shard that is already processed (or gone)
        // matches nothing and the transaction is dropped, rolling back.
        let claimed = tx.execute(
            "UPDATE shard_keys SET processed = 1 WHERE id = ?1 AND processed = 0",
            params![shard_id],
        )?;

        if claimed == 0 {
            let exists: Option<i64> = tx
                .query_row(
                    "SELECT id FROM shard_keys WHERE id = ?1",
                    params![shard_id],
                    |row| row.get(0),
                )
                .optional()?;
            return match exists {
                Some(_) => Ok(CommitOutcome::AlreadyProcessed),
                None => Err(StorageError::ShardNotFound(shard_id)),
            };
        }

        {
            let mut stmt = tx.prepare(
                "INSERT INTO entities
                 (name, active_years, role, extra_info, profile_url, shard_key_id, created_at)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
            )?;
            for entity in entities {
                stmt.execute(params![
                    entity.name,
                    entity.active_years,
                    entity.role,
                    entity.extra_info,
                    entity.profile_url,
                    shard_id,
                    now,
                ])?;
            }
        }

        tx.commit()?;

        Ok(CommitOutcome::Committed {
            entities: entities.len(),
        })
    }

    fn entities_for_shard(&self, shard_id: i64) -> StorageResult<Vec<EntityRecord>> {
        let mut stmt = self.conn.prepare(
            "SELECT id, name, active_years, role, extra_info, profile_url, shard_key_id, created_at
             FROM entities WHERE shard_key_id = ?1 ORDER BY id ASC",
        )?;

        let entities = stmt
            .query_map(params![shard_id], |row| {
                Ok(EntityRecord {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    active_years: row.get(2)?,
                    role: row.get(3)?,
                    extra_info: row.get(4)?,
                    profile_url: row.get(5)?,
                    shard_key_id: row.get(6)?,
                    created_at: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(entities)
    }

    fn count_entities(&self) -> StorageResult<u64> {
        self.count("SELECT COUNT(*) FROM entities")
    }

    fn list_entities(
        &self,
        column: SortColumn,
        order: SortOrder,
        limit: u32,
        offset: u64,
    ) -> StorageResult<Vec<EntityView>> {
        // Column and direction come from closed enums, never from raw input.
        let tie_break = if column == SortColumn::Id {
            ""
        } else {
            ", e.id ASC"
        };
        let query = format!(
            "SELECT e.id, e.name, e.active_years, e.role, e.extra_info,
                    e.shard_key_id, e.profile_url, s.key
             FROM entities e
             JOIN shard_keys s ON e.shard_key_id = s.id
             ORDER BY {} {}{}
             LIMIT ?1 OFFSET ?2",
            column.sql_expr(),
            order.sql_keyword(),
            tie_break
        );

        let mut stmt = self.conn.prepare(&query)?;
        let rows = stmt
            .query_map(params![limit, offset as i64], |row| {
                Ok(EntityView {
                    id: row.get(0)?,
                    name: row.get(1)?,
                    active_years: row.get(2)?,
                    role: row.get(3)?,
                    extra_info: row.get(4)?,
                    shard_key_id: row.get(5)?,
                    profile_url: row.get(6)?,
                    key: row.get(7)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(rows)
    }

    // ===== Maintenance =====

    fn reset_all(&mut self) -> StorageResult<ResetReport> {
        let tx = self
            .conn
            .transaction_with_behavior(TransactionBehavior::Immediate)?;

        let entities_deleted = tx.execute("DELETE FROM entities", [])?;
        let shards_reset = tx.execute(
            "UPDATE shard_keys SET processed = 0 WHERE processed != 0",
            [],
        )?;

        tx.commit()?;

        Ok(ResetReport {
            shards_reset: shards_reset as u64,
            entities_deleted: entities_deleted as u64,
        })
    }
}
