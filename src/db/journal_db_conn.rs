// src/db/journal_db_conn.rs
//! Schema creation and connection setup for the journal database

use std::time::Duration;
use std::{fs, path::Path};

use rusqlite::Connection;

use crate::error::{CoreError, Result};

const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

const SCHEMA: &str = r#"
    CREATE TABLE IF NOT EXISTS entries (
        id         TEXT PRIMARY KEY,
        owner_id   TEXT NOT NULL,
        payload    TEXT NOT NULL,
        status     TEXT,
        updated_at TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_entries_owner_id ON entries(owner_id);

    CREATE TABLE IF NOT EXISTS entries_backup (
        id         TEXT PRIMARY KEY,
        owner_id   TEXT NOT NULL,
        payload    TEXT NOT NULL,
        created_at TEXT
    );

    CREATE INDEX IF NOT EXISTS idx_entries_backup_owner_id ON entries_backup(owner_id);

    CREATE TABLE IF NOT EXISTS user_encryption_keys (
        user_id        TEXT PRIMARY KEY,
        encryption_key TEXT NOT NULL,
        cipher_version INTEGER NOT NULL DEFAULT 1,
        created_at     TEXT NOT NULL DEFAULT (datetime('now'))
    );
"#;

/// Open an existing journal database
///
/// A missing file is an environment problem, not something to paper over
/// with a fresh empty database.
pub fn open_journal_db<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let path = path.as_ref();
    if !path.exists() {
        return Err(CoreError::Environment(format!(
            "journal database not found at {}",
            path.display()
        )));
    }
    let conn = Connection::open(path)?;
    prepare(&conn)?;
    Ok(conn)
}

/// Open or create a journal database, creating parent directories
pub fn create_journal_db<P: AsRef<Path>>(path: P) -> Result<Connection> {
    let path = path.as_ref();
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }
    let conn = Connection::open(path)?;
    prepare(&conn)?;
    Ok(conn)
}

/// Private in-memory database with the journal schema
pub fn open_in_memory() -> Result<Connection> {
    let conn = Connection::open_in_memory()?;
    prepare(&conn)?;
    Ok(conn)
}

fn prepare(conn: &Connection) -> Result<()> {
    conn.busy_timeout(BUSY_TIMEOUT)?;
    conn.execute_batch(SCHEMA)?;
    Ok(())
}
