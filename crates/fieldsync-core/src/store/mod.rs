//! Offline local store.
//!
//! Durable, transactional storage for cached inspections, their editable report
//! payload, captured attachment metadata and the outbound sync queue. Two
//! backends implement [`LocalStore`]: [`SqliteStore`] on devices with a writable
//! data directory, and [`MemoryStore`] where native storage is unavailable.

mod memory;
mod shared;
mod sqlite;

use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use std::sync::Arc;

use crate::error::{Error, Result};
use crate::models::{
    CachedInspection, Document, InspectionId, Photo, PhotoId, Recording, RecordingId,
    SyncItemKind, SyncItemStatus, SyncQueueItem,
};

pub use memory::MemoryStore;
pub use shared::shared_store;
pub use sqlite::SqliteStore;

/// Storage operations over the offline cache and sync queue.
///
/// Local reads and writes are fast relative to network and blob I/O, so the
/// interface is synchronous. Multi-table writes are atomic in every backend.
pub trait LocalStore: Send + Sync {
    /// Upsert a record fetched from the remote. Leaves the dirty flag untouched.
    fn save_inspection(&self, record: &Document) -> Result<InspectionId>;

    /// Cached record, or `None` when absent or unreadable.
    fn get_inspection(&self, id: InspectionId) -> Result<Option<Document>>;

    /// Cached record with its sync bookkeeping.
    fn get_cached_inspection(&self, id: InspectionId) -> Result<Option<CachedInspection>>;

    /// All readable cached inspections, newest fetched first.
    fn get_all_inspections(&self) -> Result<Vec<CachedInspection>>;

    fn mark_inspection_dirty(&self, id: InspectionId) -> Result<()>;

    /// Clear the dirty flag and stamp the sync time.
    fn mark_inspection_synced(&self, id: InspectionId) -> Result<()>;

    /// Remove the inspection and every row that belongs to it, atomically.
    fn delete_inspection(&self, id: InspectionId) -> Result<()>;

    /// Overwrite the report payload, mark the inspection dirty and queue the
    /// upload, superseding any upload still pending.
    fn save_report_data(&self, inspection_id: InspectionId, data: &Document) -> Result<()>;

    /// Cached report payload, or an empty document when none exists yet.
    fn get_report_data(&self, inspection_id: InspectionId) -> Result<Document>;

    /// Insert or replace an unsynced recording and mark its inspection dirty.
    ///
    /// A recording that has already been synced is left as is.
    fn save_recording(&self, recording: &Recording) -> Result<()>;

    fn get_recordings(&self, inspection_id: InspectionId) -> Result<Vec<Recording>>;

    fn get_unsynced_recordings(&self, inspection_id: InspectionId) -> Result<Vec<Recording>>;

    fn mark_recording_synced(&self, id: &RecordingId) -> Result<()>;

    /// Insert or replace an unsynced photo and mark its inspection dirty.
    ///
    /// A photo that has already been synced is left as is.
    fn save_photo(&self, photo: &Photo) -> Result<()>;

    fn get_photos(
        &self,
        inspection_id: InspectionId,
        section_id: &str,
        item_id: &str,
    ) -> Result<Vec<Photo>>;

    fn get_unsynced_photos(&self, inspection_id: InspectionId) -> Result<Vec<Photo>>;

    fn mark_photo_synced(&self, id: &PhotoId) -> Result<()>;

    /// Append a pending item and return its sequence number.
    fn enqueue_sync_item(
        &self,
        inspection_id: InspectionId,
        kind: SyncItemKind,
        payload: &Document,
    ) -> Result<i64>;

    /// Pending items, ordered by inspection then sequence number.
    fn get_pending_sync_items(
        &self,
        inspection_id: Option<InspectionId>,
    ) -> Result<Vec<SyncQueueItem>>;

    /// Items in any state, ordered by inspection then sequence number.
    fn list_sync_items(&self, inspection_id: Option<InspectionId>)
        -> Result<Vec<SyncQueueItem>>;

    /// Settle an item and count the attempt.
    fn mark_sync_item_status(
        &self,
        item_id: i64,
        status: SyncItemStatus,
        error_message: Option<&str>,
    ) -> Result<()>;

    /// Delete every `done` item and return how many were removed.
    fn clear_done_sync_items(&self) -> Result<usize>;
}

/// Which [`LocalStore`] implementation to open.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum StoreBackend {
    /// `SQLite` when a writable database location is available, memory otherwise
    #[default]
    Auto,
    Sqlite,
    Memory,
}

impl StoreBackend {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Auto => "auto",
            Self::Sqlite => "sqlite",
            Self::Memory => "memory",
        }
    }
}

impl fmt::Display for StoreBackend {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for StoreBackend {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "auto" => Ok(Self::Auto),
            "sqlite" => Ok(Self::Sqlite),
            "memory" => Ok(Self::Memory),
            other => Err(Error::InvalidInput(format!(
                "Unknown storage backend '{other}' (expected auto, sqlite or memory)"
            ))),
        }
    }
}

/// Where and how to open the local store.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StoreConfig {
    pub backend: StoreBackend,
    pub db_path: Option<PathBuf>,
}

impl StoreConfig {
    pub fn sqlite(db_path: impl Into<PathBuf>) -> Self {
        Self {
            backend: StoreBackend::Sqlite,
            db_path: Some(db_path.into()),
        }
    }

    #[must_use]
    pub const fn memory() -> Self {
        Self {
            backend: StoreBackend::Memory,
            db_path: None,
        }
    }

    /// Pick the concrete backend, probing the platform when set to `Auto`.
    pub fn resolve_backend(&self) -> Result<StoreBackend> {
        match (self.backend, self.db_path.as_deref()) {
            (StoreBackend::Memory, _) => Ok(StoreBackend::Memory),
            (StoreBackend::Sqlite, Some(_)) => Ok(StoreBackend::Sqlite),
            (StoreBackend::Sqlite, None) => Err(Error::InvalidInput(
                "sqlite storage requires a database path".to_string(),
            )),
            (StoreBackend::Auto, Some(path)) if native_storage_available(path) => {
                Ok(StoreBackend::Sqlite)
            }
            (StoreBackend::Auto, path) => {
                tracing::warn!(
                    "Native storage unavailable{}; offline data will not survive restarts",
                    path.map(|p| format!(" at {}", p.display()))
                        .unwrap_or_default()
                );
                Ok(StoreBackend::Memory)
            }
        }
    }
}

/// Open the configured backend behind the shared store interface.
pub fn open_store(config: &StoreConfig) -> Result<Arc<dyn LocalStore>> {
    match config.resolve_backend()? {
        StoreBackend::Sqlite => {
            let path = config.db_path.as_deref().ok_or_else(|| {
                Error::InvalidInput("sqlite storage requires a database path".to_string())
            })?;
            tracing::info!("Opening offline store at {}", path.display());
            Ok(Arc::new(SqliteStore::open(path)?))
        }
        StoreBackend::Memory | StoreBackend::Auto => {
            tracing::info!("Opening in-memory offline store");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

fn native_storage_available(db_path: &Path) -> bool {
    match db_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent).is_ok(),
        _ => true,
    }
}

/// Parse a stored JSON column, degrading to `None` when it is corrupt.
pub(crate) fn parse_stored_document(raw: &str, what: fmt::Arguments<'_>) -> Option<Document> {
    match serde_json::from_str(raw) {
        Ok(document) => Some(document),
        Err(error) => {
            tracing::warn!("Ignoring malformed stored JSON for {what}: {error}");
            None
        }
    }
}

#[cfg(test)]
mod contract_tests;
