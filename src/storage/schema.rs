//! Database schema definitions
//!
//! This module contains all SQL schema definitions for the Roster Harvest database.

/// SQL schema for the database
pub const SCHEMA_SQL: &str = r#"
-- Shard keys discovered on the catalog root
CREATE TABLE IF NOT EXISTS shard_keys (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    key TEXT NOT NULL UNIQUE,
    source_url TEXT NOT NULL,
    processed INTEGER NOT NULL DEFAULT 0,
    discovered_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_shard_keys_processed ON shard_keys(processed);

-- Entity rows parsed from a shard listing
CREATE TABLE IF NOT EXISTS entities (
    id INTEGER PRIMARY KEY AUTOINCREMENT,
    name TEXT NOT NULL,
    active_years TEXT NOT NULL,
    role TEXT NOT NULL,
    extra_info TEXT NOT NULL DEFAULT '',
    profile_url TEXT NOT NULL,
    shard_key_id INTEGER NOT NULL REFERENCES shard_keys(id) ON DELETE CASCADE,
    created_at TEXT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_entities_shard ON entities(shard_key_id);
"#;

/// Initializes the database schema
pub fn initialize_schema(conn: &rusqlite::Connection) -> Result<(), rusqlite::Error> {
    conn.execute_batch(SCHEMA_SQL)?;
    Ok(())
}
