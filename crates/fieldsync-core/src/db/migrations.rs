//! Database migrations

use crate::error::Result;
use rusqlite::{Connection, OptionalExtension};

/// Current schema version
const CURRENT_VERSION: i32 = 2;

/// Run all pending migrations
pub fn run(conn: &mut Connection) -> Result<()> {
    let version = get_version(conn)?;

    if version < 1 {
        migrate_v1(conn)?;
    }
    if version < 2 {
        migrate_v2(conn)?;
    }

    Ok(())
}

/// Get the current schema version
fn get_version(conn: &Connection) -> Result<i32> {
    let exists: bool = conn.query_row(
        "SELECT EXISTS(SELECT 1 FROM sqlite_master WHERE type='table' AND name='schema_version')",
        [],
        |row| row.get(0),
    )?;

    if !exists {
        return Ok(0);
    }

    let version = conn
        .query_row("SELECT COALESCE(MAX(version), 0) FROM schema_version", [], |row| {
            row.get(0)
        })
        .optional()?;

    Ok(version.unwrap_or(0))
}

/// Migration to version 1: Offline cache and sync queue
fn migrate_v1(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute_batch(
        "CREATE TABLE IF NOT EXISTS schema_version (
            version INTEGER PRIMARY KEY
        );

        CREATE TABLE IF NOT EXISTS inspections (
            id          INTEGER PRIMARY KEY,
            data        TEXT    NOT NULL,
            fetched_at  INTEGER NOT NULL,
            synced_at   INTEGER,
            is_dirty    INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS report_data (
            inspection_id  INTEGER PRIMARY KEY,
            data           TEXT    NOT NULL,
            modified_at    INTEGER NOT NULL
        );

        CREATE TABLE IF NOT EXISTS sync_queue (
            id             INTEGER PRIMARY KEY AUTOINCREMENT,
            inspection_id  INTEGER NOT NULL,
            type           TEXT    NOT NULL,
            payload        TEXT    NOT NULL,
            status         TEXT    NOT NULL DEFAULT 'pending',
            created_at     INTEGER NOT NULL,
            attempts       INTEGER NOT NULL DEFAULT 0,
            error_msg      TEXT
        );

        CREATE TABLE IF NOT EXISTS recordings (
            id             TEXT    PRIMARY KEY,
            inspection_id  INTEGER NOT NULL,
            item_key       TEXT    NOT NULL,
            label          TEXT    NOT NULL,
            file_path      TEXT    NOT NULL,
            mime_type      TEXT,
            duration       INTEGER NOT NULL DEFAULT 0,
            created_at     INTEGER NOT NULL,
            synced         INTEGER NOT NULL DEFAULT 0
        );

        CREATE TABLE IF NOT EXISTS photos (
            id             TEXT    PRIMARY KEY,
            inspection_id  INTEGER NOT NULL,
            section_id     TEXT    NOT NULL,
            item_id        TEXT    NOT NULL,
            file_path      TEXT    NOT NULL,
            created_at     INTEGER NOT NULL,
            synced         INTEGER NOT NULL DEFAULT 0
        );

        INSERT INTO schema_version (version) VALUES (1);",
    )?;

    tx.commit()?;
    tracing::info!("Migrated offline database to version 1");
    Ok(())
}

/// Migration to version 2: Indexes for per-inspection queue and attachment scans
fn migrate_v2(conn: &mut Connection) -> Result<()> {
    let tx = conn.transaction()?;

    tx.execute_batch(
        "CREATE INDEX IF NOT EXISTS idx_sync_queue_pending
            ON sync_queue(status, inspection_id, id);
        CREATE INDEX IF NOT EXISTS idx_recordings_inspection
            ON recordings(inspection_id, synced, created_at);
        CREATE INDEX IF NOT EXISTS idx_photos_inspection
            ON photos(inspection_id, synced, created_at);
        CREATE INDEX IF NOT EXISTS idx_photos_item
            ON photos(inspection_id, section_id, item_id, created_at);
        CREATE INDEX IF NOT EXISTS idx_inspections_fetched
            ON inspections(fetched_at DESC);

        INSERT INTO schema_version (version) VALUES (2);",
    )?;

    tx.commit()?;
    tracing::info!("Migrated offline database to version {CURRENT_VERSION}");
    Ok(())
}
