//! `SQLite` implementation of `LocalStore`

use std::path::Path;
use std::sync::{Mutex, MutexGuard};

use rusqlite::{params, Connection, OptionalExtension, Row};

use crate::db::Database;
use crate::error::{Error, Result};
use crate::models::{
    empty_document, CachedInspection, Document, InspectionId, Photo, PhotoId, Recording,
    RecordingId, ReportDataPayload, SyncItemKind, SyncItemStatus, SyncQueueItem,
};
use crate::util::now_millis;

use super::{parse_stored_document, LocalStore};

const RECORDING_COLUMNS: &str =
    "id, inspection_id, item_key, label, file_path, mime_type, duration, created_at, synced";
const PHOTO_COLUMNS: &str =
    "id, inspection_id, section_id, item_id, file_path, created_at, synced";
const QUEUE_COLUMNS: &str =
    "id, inspection_id, type, payload, status, created_at, attempts, error_msg";

/// `SQLite`-backed store owning a single migrated connection.
pub struct SqliteStore {
    conn: Mutex<Connection>,
}

impl SqliteStore {
    /// Open (creating and migrating if needed) the database file at `path`.
    pub fn open(path: impl AsRef<Path>) -> Result<Self> {
        Ok(Self::new(Database::open(path)?))
    }

    /// Open a private in-memory database (useful for testing)
    pub fn open_in_memory() -> Result<Self> {
        Ok(Self::new(Database::open_in_memory()?))
    }

    pub fn new(database: Database) -> Self {
        Self {
            conn: Mutex::new(database.into_connection()),
        }
    }

    fn lock(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| Error::StorageUnavailable("offline database lock poisoned".to_string()))
    }

    fn parse_recording(row: &Row<'_>) -> rusqlite::Result<Recording> {
        let id: String = row.get(0)?;
        let mime_type: Option<String> = row.get(5)?;
        Ok(Recording {
            id: RecordingId::from(id),
            inspection_id: InspectionId::new(row.get(1)?),
            item_key: row.get(2)?,
            label: row.get(3)?,
            file_path: row.get(4)?,
            mime_type: mime_type
                .unwrap_or_else(|| crate::models::DEFAULT_RECORDING_MIME_TYPE.to_string()),
            duration: row.get(6)?,
            created_at: row.get(7)?,
            synced: row.get::<_, i32>(8)? != 0,
        })
    }

    fn parse_photo(row: &Row<'_>) -> rusqlite::Result<Photo> {
        let id: String = row.get(0)?;
        Ok(Photo {
            id: PhotoId::from(id),
            inspection_id: InspectionId::new(row.get(1)?),
            section_id: row.get(2)?,
            item_id: row.get(3)?,
            file_path: row.get(4)?,
            created_at: row.get(5)?,
            synced: row.get::<_, i32>(6)? != 0,
        })
    }

    fn query_recordings(
        conn: &Connection,
        inspection_id: InspectionId,
        unsynced_only: bool,
    ) -> Result<Vec<Recording>> {
        let filter = if unsynced_only { "AND synced = 0" } else { "" };
        let mut stmt = conn.prepare(&format!(
            "SELECT {RECORDING_COLUMNS} FROM recordings
             WHERE inspection_id = ? {filter}
             ORDER BY created_at ASC, rowid ASC"
        ))?;
        let recordings = stmt
            .query_map(params![inspection_id.get()], Self::parse_recording)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(recordings)
    }

    fn query_queue(
        conn: &Connection,
        inspection_id: Option<InspectionId>,
        pending_only: bool,
    ) -> Result<Vec<SyncQueueItem>> {
        let mut conditions = Vec::new();
        if pending_only {
            conditions.push("status = 'pending'");
        }
        if inspection_id.is_some() {
            conditions.push("inspection_id = ?1");
        }
        let where_clause = if conditions.is_empty() {
            String::new()
        } else {
            format!("WHERE {}", conditions.join(" AND "))
        };
        let mut stmt = conn.prepare(&format!(
            "SELECT {QUEUE_COLUMNS} FROM sync_queue {where_clause} ORDER BY inspection_id ASC, id ASC"
        ))?;

        let rows = match inspection_id {
            Some(id) => stmt
                .query_map(params![id.get()], RawQueueRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
            None => stmt
                .query_map([], RawQueueRow::from_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
        };

        Ok(rows.into_iter().filter_map(RawQueueRow::into_item).collect())
    }
}

/// Queue row as stored, before its text columns are interpreted.
struct RawQueueRow {
    id: i64,
    inspection_id: i64,
    kind: String,
    payload: String,
    status: String,
    created_at: i64,
    attempts: i64,
    error_message: Option<String>,
}

impl RawQueueRow {
    fn from_row(row: &Row<'_>) -> rusqlite::Result<Self> {
        Ok(Self {
            id: row.get(0)?,
            inspection_id: row.get(1)?,
            kind: row.get(2)?,
            payload: row.get(3)?,
            status: row.get(4)?,
            created_at: row.get(5)?,
            attempts: row.get(6)?,
            error_message: row.get(7)?,
        })
    }

    fn into_item(self) -> Option<SyncQueueItem> {
        let (kind, status) = match (
            self.kind.parse::<SyncItemKind>(),
            self.status.parse::<SyncItemStatus>(),
        ) {
            (Ok(kind), Ok(status)) => (kind, status),
            (Err(error), _) | (_, Err(error)) => {
                tracing::warn!("Skipping unreadable sync queue item {}: {error}", self.id);
                return None;
            }
        };
        let payload = parse_stored_document(
            &self.payload,
            format_args!("sync queue item {}", self.id),
        )
        .unwrap_or(Document::Null);

        Some(SyncQueueItem {
            id: self.id,
            inspection_id: InspectionId::new(self.inspection_id),
            kind,
            payload,
            status,
            created_at: self.created_at,
            attempts: u32::try_from(self.attempts).unwrap_or(u32::MAX),
            error_message: self.error_message,
        })
    }
}

/// Append a queue item, applying `report_data` supersession first.
///
/// Callers run this inside a transaction so the delete and insert land together.
fn enqueue_in(
    conn: &Connection,
    inspection_id: InspectionId,
    kind: SyncItemKind,
    payload: &Document,
) -> Result<i64> {
    if kind == SyncItemKind::ReportData {
        let superseded = conn.execute(
            "DELETE FROM sync_queue WHERE inspection_id = ? AND type = 'report_data' AND status = 'pending'",
            params![inspection_id.get()],
        )?;
        if superseded > 0 {
            tracing::debug!("Superseded pending report data for inspection {inspection_id}");
        }
    }

    conn.execute(
        "INSERT INTO sync_queue (inspection_id, type, payload, status, created_at, attempts)
         VALUES (?, ?, ?, 'pending', ?, 0)",
        params![
            inspection_id.get(),
            kind.as_str(),
            serde_json::to_string(payload)?,
            now_millis()
        ],
    )?;
    Ok(conn.last_insert_rowid())
}

fn mark_dirty_in(conn: &Connection, inspection_id: InspectionId) -> Result<()> {
    conn.execute(
        "UPDATE inspections SET is_dirty = 1 WHERE id = ?",
        params![inspection_id.get()],
    )?;
    Ok(())
}

impl LocalStore for SqliteStore {
    fn save_inspection(&self, record: &Document) -> Result<InspectionId> {
        let id = InspectionId::from_record(record)?;
        let conn = self.lock()?;
        conn.execute(
            "INSERT INTO inspections (id, data, fetched_at, is_dirty) VALUES (?, ?, ?, 0)
             ON CONFLICT(id) DO UPDATE SET data = excluded.data, fetched_at = excluded.fetched_at",
            params![id.get(), serde_json::to_string(record)?, now_millis()],
        )?;
        Ok(id)
    }

    fn get_inspection(&self, id: InspectionId) -> Result<Option<Document>> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT data FROM inspections WHERE id = ?",
                params![id.get()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw.and_then(|raw| parse_stored_document(&raw, format_args!("inspection {id}"))))
    }

    fn get_cached_inspection(&self, id: InspectionId) -> Result<Option<CachedInspection>> {
        let conn = self.lock()?;
        let row = conn
            .query_row(
                "SELECT data, fetched_at, synced_at, is_dirty FROM inspections WHERE id = ?",
                params![id.get()],
                |row| {
                    Ok((
                        row.get::<_, String>(0)?,
                        row.get::<_, i64>(1)?,
                        row.get::<_, Option<i64>>(2)?,
                        row.get::<_, i32>(3)? != 0,
                    ))
                },
            )
            .optional()?;

        Ok(row.and_then(|(raw, fetched_at, synced_at, is_dirty)| {
            parse_stored_document(&raw, format_args!("inspection {id}")).map(|record| {
                CachedInspection {
                    id,
                    record,
                    fetched_at,
                    synced_at,
                    is_dirty,
                }
            })
        }))
    }

    fn get_all_inspections(&self) -> Result<Vec<CachedInspection>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(
            "SELECT id, data, fetched_at, synced_at, is_dirty
             FROM inspections
             ORDER BY fetched_at DESC, id DESC",
        )?;
        let rows = stmt
            .query_map([], |row| {
                Ok((
                    InspectionId::new(row.get(0)?),
                    row.get::<_, String>(1)?,
                    row.get::<_, i64>(2)?,
                    row.get::<_, Option<i64>>(3)?,
                    row.get::<_, i32>(4)? != 0,
                ))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;

        Ok(rows
            .into_iter()
            .filter_map(|(id, raw, fetched_at, synced_at, is_dirty)| {
                parse_stored_document(&raw, format_args!("inspection {id}")).map(|record| {
                    CachedInspection {
                        id,
                        record,
                        fetched_at,
                        synced_at,
                        is_dirty,
                    }
                })
            })
            .collect())
    }

    fn mark_inspection_dirty(&self, id: InspectionId) -> Result<()> {
        let conn = self.lock()?;
        mark_dirty_in(&conn, id)
    }

    fn mark_inspection_synced(&self, id: InspectionId) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE inspections SET is_dirty = 0, synced_at = ? WHERE id = ?",
            params![now_millis(), id.get()],
        )?;
        Ok(())
    }

    fn delete_inspection(&self, id: InspectionId) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute("DELETE FROM inspections WHERE id = ?", params![id.get()])?;
        tx.execute(
            "DELETE FROM report_data WHERE inspection_id = ?",
            params![id.get()],
        )?;
        tx.execute(
            "DELETE FROM recordings WHERE inspection_id = ?",
            params![id.get()],
        )?;
        tx.execute("DELETE FROM photos WHERE inspection_id = ?", params![id.get()])?;
        tx.execute(
            "DELETE FROM sync_queue WHERE inspection_id = ?",
            params![id.get()],
        )?;
        tx.commit()?;
        tracing::info!("Deleted inspection {id} and its offline data");
        Ok(())
    }

    fn save_report_data(&self, inspection_id: InspectionId, data: &Document) -> Result<()> {
        let payload = serde_json::to_value(ReportDataPayload {
            inspection_id,
            report_data: data.clone(),
        })?;

        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        tx.execute(
            "INSERT OR REPLACE INTO report_data (inspection_id, data, modified_at) VALUES (?, ?, ?)",
            params![inspection_id.get(), serde_json::to_string(data)?, now_millis()],
        )?;
        mark_dirty_in(&tx, inspection_id)?;
        enqueue_in(&tx, inspection_id, SyncItemKind::ReportData, &payload)?;
        tx.commit()?;
        Ok(())
    }

    fn get_report_data(&self, inspection_id: InspectionId) -> Result<Document> {
        let conn = self.lock()?;
        let raw: Option<String> = conn
            .query_row(
                "SELECT data FROM report_data WHERE inspection_id = ?",
                params![inspection_id.get()],
                |row| row.get(0),
            )
            .optional()?;
        Ok(raw
            .and_then(|raw| {
                parse_stored_document(&raw, format_args!("report data {inspection_id}"))
            })
            .unwrap_or_else(empty_document))
    }

    fn save_recording(&self, recording: &Recording) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let changed = tx.execute(
            "INSERT INTO recordings
                (id, inspection_id, item_key, label, file_path, mime_type, duration, created_at, synced)
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, 0)
             ON CONFLICT(id) DO UPDATE SET
                inspection_id = excluded.inspection_id,
                item_key = excluded.item_key,
                label = excluded.label,
                file_path = excluded.file_path,
                mime_type = excluded.mime_type,
                duration = excluded.duration,
                created_at = excluded.created_at
             WHERE recordings.synced = 0",
            params![
                recording.id.as_str(),
                recording.inspection_id.get(),
                recording.item_key,
                recording.label,
                recording.file_path,
                recording.mime_type,
                recording.duration,
                recording.created_at
            ],
        )?;
        if changed == 0 {
            tracing::debug!("Recording {} already synced; save ignored", recording.id);
            return Ok(());
        }
        mark_dirty_in(&tx, recording.inspection_id)?;
        tx.commit()?;
        Ok(())
    }

    fn get_recordings(&self, inspection_id: InspectionId) -> Result<Vec<Recording>> {
        let conn = self.lock()?;
        Self::query_recordings(&conn, inspection_id, false)
    }

    fn get_unsynced_recordings(&self, inspection_id: InspectionId) -> Result<Vec<Recording>> {
        let conn = self.lock()?;
        Self::query_recordings(&conn, inspection_id, true)
    }

    fn mark_recording_synced(&self, id: &RecordingId) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE recordings SET synced = 1 WHERE id = ?",
            params![id.as_str()],
        )?;
        Ok(())
    }

    fn save_photo(&self, photo: &Photo) -> Result<()> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let changed = tx.execute(
            "INSERT INTO photos
                (id, inspection_id, section_id, item_id, file_path, created_at, synced)
             VALUES (?, ?, ?, ?, ?, ?, 0)
             ON CONFLICT(id) DO UPDATE SET
                inspection_id = excluded.inspection_id,
                section_id = excluded.section_id,
                item_id = excluded.item_id,
                file_path = excluded.file_path,
                created_at = excluded.created_at
             WHERE photos.synced = 0",
            params![
                photo.id.as_str(),
                photo.inspection_id.get(),
                photo.section_id,
                photo.item_id,
                photo.file_path,
                photo.created_at
            ],
        )?;
        if changed == 0 {
            tracing::debug!("Photo {} already synced; save ignored", photo.id);
            return Ok(());
        }
        mark_dirty_in(&tx, photo.inspection_id)?;
        tx.commit()?;
        Ok(())
    }

    fn get_photos(
        &self,
        inspection_id: InspectionId,
        section_id: &str,
        item_id: &str,
    ) -> Result<Vec<Photo>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos
             WHERE inspection_id = ? AND section_id = ? AND item_id = ?
             ORDER BY created_at ASC, rowid ASC"
        ))?;
        let photos = stmt
            .query_map(
                params![inspection_id.get(), section_id, item_id],
                Self::parse_photo,
            )?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(photos)
    }

    fn get_unsynced_photos(&self, inspection_id: InspectionId) -> Result<Vec<Photo>> {
        let conn = self.lock()?;
        let mut stmt = conn.prepare(&format!(
            "SELECT {PHOTO_COLUMNS} FROM photos
             WHERE inspection_id = ? AND synced = 0
             ORDER BY created_at ASC, rowid ASC"
        ))?;
        let photos = stmt
            .query_map(params![inspection_id.get()], Self::parse_photo)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(photos)
    }

    fn mark_photo_synced(&self, id: &PhotoId) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE photos SET synced = 1 WHERE id = ?",
            params![id.as_str()],
        )?;
        Ok(())
    }

    fn enqueue_sync_item(
        &self,
        inspection_id: InspectionId,
        kind: SyncItemKind,
        payload: &Document,
    ) -> Result<i64> {
        let mut conn = self.lock()?;
        let tx = conn.transaction()?;
        let id = enqueue_in(&tx, inspection_id, kind, payload)?;
        tx.commit()?;
        Ok(id)
    }

    fn get_pending_sync_items(
        &self,
        inspection_id: Option<InspectionId>,
    ) -> Result<Vec<SyncQueueItem>> {
        let conn = self.lock()?;
        Self::query_queue(&conn, inspection_id, true)
    }

    fn list_sync_items(&self, inspection_id: Option<InspectionId>) -> Result<Vec<SyncQueueItem>> {
        let conn = self.lock()?;
        Self::query_queue(&conn, inspection_id, false)
    }

    fn mark_sync_item_status(
        &self,
        item_id: i64,
        status: SyncItemStatus,
        error_message: Option<&str>,
    ) -> Result<()> {
        let conn = self.lock()?;
        conn.execute(
            "UPDATE sync_queue SET status = ?, error_msg = ?, attempts = attempts + 1 WHERE id = ?",
            params![status.as_str(), error_message, item_id],
        )?;
        Ok(())
    }

    fn clear_done_sync_items(&self) -> Result<usize> {
        let conn = self.lock()?;
        let removed = conn.execute("DELETE FROM sync_queue WHERE status = 'done'", [])?;
        Ok(removed)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn setup() -> SqliteStore {
        SqliteStore::open_in_memory().unwrap()
    }

    fn corrupt(store: &SqliteStore, sql: &str) {
        store.lock().unwrap().execute(sql, []).unwrap();
    }

    #[test]
    fn test_malformed_inspection_is_treated_as_absent() {
        let store = setup();
        store.save_inspection(&json!({ "id": 1 })).unwrap();
        store.save_inspection(&json!({ "id": 2 })).unwrap();
        corrupt(&store, "UPDATE inspections SET data = '{not json' WHERE id = 1");

        assert!(store.get_inspection(InspectionId::new(1)).unwrap().is_none());
        assert!(store
            .get_cached_inspection(InspectionId::new(1))
            .unwrap()
            .is_none());

        let all = store.get_all_inspections().unwrap();
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].id, InspectionId::new(2));
    }

    #[test]
    fn test_malformed_report_data_degrades_to_empty() {
        let store = setup();
        let id = InspectionId::new(5);
        store.save_report_data(id, &json!({ "rooms": [1] })).unwrap();
        corrupt(&store, "UPDATE report_data SET data = 'oops'");

        assert_eq!(store.get_report_data(id).unwrap(), json!({}));
    }

    #[test]
    fn test_malformed_queue_payload_surfaces_as_null() {
        let store = setup();
        let id = InspectionId::new(5);
        store.save_report_data(id, &json!({ "rooms": [] })).unwrap();
        corrupt(&store, "UPDATE sync_queue SET payload = '{'");

        let pending = store.get_pending_sync_items(Some(id)).unwrap();
        assert_eq!(pending.len(), 1);
        assert_eq!(pending[0].payload, Document::Null);
    }

    #[test]
    fn test_unknown_queue_type_is_skipped() {
        let store = setup();
        let id = InspectionId::new(5);
        store
            .enqueue_sync_item(id, SyncItemKind::Photo, &json!({}))
            .unwrap();
        corrupt(&store, "UPDATE sync_queue SET type = 'video'");

        assert!(store.get_pending_sync_items(Some(id)).unwrap().is_empty());
    }

    #[test]
    fn test_sequence_numbers_are_not_reused() {
        let store = setup();
        let id = InspectionId::new(5);
        let first = store
            .enqueue_sync_item(id, SyncItemKind::Status, &json!({}))
            .unwrap();
        store
            .mark_sync_item_status(first, SyncItemStatus::Done, None)
            .unwrap();
        store.clear_done_sync_items().unwrap();

        let second = store
            .enqueue_sync_item(id, SyncItemKind::Status, &json!({}))
            .unwrap();
        assert!(second > first);
    }

    #[test]
    fn test_data_survives_reopen() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join("offline.db");
        let id = InspectionId::new(8);

        {
            let store = SqliteStore::open(&path).unwrap();
            store.save_inspection(&json!({ "id": 8 })).unwrap();
            store.save_report_data(id, &json!({ "meter": 1234 })).unwrap();
        }

        let store = SqliteStore::open(&path).unwrap();
        assert_eq!(store.get_report_data(id).unwrap(), json!({ "meter": 1234 }));
        assert!(store.get_cached_inspection(id).unwrap().unwrap().is_dirty);
        assert_eq!(store.get_pending_sync_items(Some(id)).unwrap().len(), 1);
    }
}
