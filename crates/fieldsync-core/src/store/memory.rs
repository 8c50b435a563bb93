//! In-memory implementation of `LocalStore`
//!
//! Used where no native database is available. Every operation takes the one
//! state lock, so multi-table writes are atomic; nothing survives the process.

use std::collections::BTreeMap;
use std::sync::{Mutex, MutexGuard};

use crate::error::{Error, Result};
use crate::models::{
    empty_document, CachedInspection, Document, InspectionId, Photo, PhotoId, Recording,
    RecordingId, ReportDataPayload, SyncItemKind, SyncItemStatus, SyncQueueItem,
};
use crate::util::now_millis;

use super::LocalStore;

#[derive(Default)]
struct MemoryState {
    inspections: BTreeMap<InspectionId, CachedInspection>,
    report_data: BTreeMap<InspectionId, Document>,
    // Insertion order doubles as the rowid tie-breaker for equal timestamps
    recordings: Vec<Recording>,
    photos: Vec<Photo>,
    queue: BTreeMap<i64, SyncQueueItem>,
    last_queue_id: i64,
}

impl MemoryState {
    fn mark_dirty(&mut self, id: InspectionId) {
        if let Some(inspection) = self.inspections.get_mut(&id) {
            inspection.is_dirty = true;
        }
    }

    fn enqueue(
        &mut self,
        inspection_id: InspectionId,
        kind: SyncItemKind,
        payload: &Document,
    ) -> i64 {
        if kind == SyncItemKind::ReportData {
            self.queue.retain(|_, item| {
                !(item.inspection_id == inspection_id
                    && item.kind == SyncItemKind::ReportData
                    && item.status == SyncItemStatus::Pending)
            });
        }

        self.last_queue_id += 1;
        let id = self.last_queue_id;
        self.queue.insert(
            id,
            SyncQueueItem {
                id,
                inspection_id,
                kind,
                payload: payload.clone(),
                status: SyncItemStatus::Pending,
                created_at: now_millis(),
                attempts: 0,
                error_message: None,
            },
        );
        id
    }

    fn queue_items(
        &self,
        inspection_id: Option<InspectionId>,
        pending_only: bool,
    ) -> Vec<SyncQueueItem> {
        let mut items: Vec<SyncQueueItem> = self
            .queue
            .values()
            .filter(|item| inspection_id.map_or(true, |id| item.inspection_id == id))
            .filter(|item| !pending_only || item.status == SyncItemStatus::Pending)
            .cloned()
            .collect();
        items.sort_by_key(|item| (item.inspection_id, item.id));
        items
    }
}

/// Process-local store with the same contract as the `SQLite` backend.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<MemoryState>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, MemoryState>> {
        self.state
            .lock()
            .map_err(|_| Error::StorageUnavailable("in-memory store lock poisoned".to_string()))
    }
}

fn sorted_by_creation<T>(rows: impl Iterator<Item = T>, created_at: impl Fn(&T) -> i64) -> Vec<T> {
    let mut rows: Vec<T> = rows.collect();
    // Stable sort keeps insertion order for equal timestamps
    rows.sort_by_key(|row| created_at(row));
    rows
}

impl LocalStore for MemoryStore {
    fn save_inspection(&self, record: &Document) -> Result<InspectionId> {
        let id = InspectionId::from_record(record)?;
        let mut state = self.lock()?;
        let fetched_at = now_millis();
        state
            .inspections
            .entry(id)
            .and_modify(|cached| {
                cached.record = record.clone();
                cached.fetched_at = fetched_at;
            })
            .or_insert_with(|| CachedInspection {
                id,
                record: record.clone(),
                fetched_at,
                synced_at: None,
                is_dirty: false,
            });
        Ok(id)
    }

    fn get_inspection(&self, id: InspectionId) -> Result<Option<Document>> {
        let state = self.lock()?;
        Ok(state.inspections.get(&id).map(|cached| cached.record.clone()))
    }

    fn get_cached_inspection(&self, id: InspectionId) -> Result<Option<CachedInspection>> {
        let state = self.lock()?;
        Ok(state.inspections.get(&id).cloned())
    }

    fn get_all_inspections(&self) -> Result<Vec<CachedInspection>> {
        let state = self.lock()?;
        let mut all: Vec<CachedInspection> = state.inspections.values().cloned().collect();
        all.sort_by(|a, b| b.fetched_at.cmp(&a.fetched_at).then(b.id.cmp(&a.id)));
        Ok(all)
    }

    fn mark_inspection_dirty(&self, id: InspectionId) -> Result<()> {
        self.lock()?.mark_dirty(id);
        Ok(())
    }

    fn mark_inspection_synced(&self, id: InspectionId) -> Result<()> {
        let mut state = self.lock()?;
        if let Some(cached) = state.inspections.get_mut(&id) {
            cached.is_dirty = false;
            cached.synced_at = Some(now_millis());
        }
        Ok(())
    }

    fn delete_inspection(&self, id: InspectionId) -> Result<()> {
        let mut state = self.lock()?;
        state.inspections.remove(&id);
        state.report_data.remove(&id);
        state.recordings.retain(|rec| rec.inspection_id != id);
        state.photos.retain(|photo| photo.inspection_id != id);
        state.queue.retain(|_, item| item.inspection_id != id);
        Ok(())
    }

    fn save_report_data(&self, inspection_id: InspectionId, data: &Document) -> Result<()> {
        let payload = serde_json::to_value(ReportDataPayload {
            inspection_id,
            report_data: data.clone(),
        })?;
        let mut state = self.lock()?;
        state.report_data.insert(inspection_id, data.clone());
        state.mark_dirty(inspection_id);
        state.enqueue(inspection_id, SyncItemKind::ReportData, &payload);
        Ok(())
    }

    fn get_report_data(&self, inspection_id: InspectionId) -> Result<Document> {
        let state = self.lock()?;
        Ok(state
            .report_data
            .get(&inspection_id)
            .cloned()
            .unwrap_or_else(empty_document))
    }

    fn save_recording(&self, recording: &Recording) -> Result<()> {
        let mut state = self.lock()?;
        let mut fresh = recording.clone();
        fresh.synced = false;

        match state.recordings.iter_mut().find(|rec| rec.id == recording.id) {
            Some(existing) if existing.synced => {
                tracing::debug!("Recording {} already synced; save ignored", recording.id);
                return Ok(());
            }
            Some(existing) => *existing = fresh,
            None => state.recordings.push(fresh),
        }
        state.mark_dirty(recording.inspection_id);
        Ok(())
    }

    fn get_recordings(&self, inspection_id: InspectionId) -> Result<Vec<Recording>> {
        let state = self.lock()?;
        Ok(sorted_by_creation(
            state
                .recordings
                .iter()
                .filter(|rec| rec.inspection_id == inspection_id)
                .cloned(),
            |rec| rec.created_at,
        ))
    }

    fn get_unsynced_recordings(&self, inspection_id: InspectionId) -> Result<Vec<Recording>> {
        let state = self.lock()?;
        Ok(sorted_by_creation(
            state
                .recordings
                .iter()
                .filter(|rec| rec.inspection_id == inspection_id && !rec.synced)
                .cloned(),
            |rec| rec.created_at,
        ))
    }

    fn mark_recording_synced(&self, id: &RecordingId) -> Result<()> {
        let mut state = self.lock()?;
        if let Some(rec) = state.recordings.iter_mut().find(|rec| &rec.id == id) {
            rec.synced = true;
        }
        Ok(())
    }

    fn save_photo(&self, photo: &Photo) -> Result<()> {
        let mut state = self.lock()?;
        let mut fresh = photo.clone();
        fresh.synced = false;

        match state.photos.iter_mut().find(|existing| existing.id == photo.id) {
            Some(existing) if existing.synced => {
                tracing::debug!("Photo {} already synced; save ignored", photo.id);
                return Ok(());
            }
            Some(existing) => *existing = fresh,
            None => state.photos.push(fresh),
        }
        state.mark_dirty(photo.inspection_id);
        Ok(())
    }

    fn get_photos(
        &self,
        inspection_id: InspectionId,
        section_id: &str,
        item_id: &str,
    ) -> Result<Vec<Photo>> {
        let state = self.lock()?;
        Ok(sorted_by_creation(
            state
                .photos
                .iter()
                .filter(|photo| {
                    photo.inspection_id == inspection_id
                        && photo.section_id == section_id
                        && photo.item_id == item_id
                })
                .cloned(),
            |photo| photo.created_at,
        ))
    }

    fn get_unsynced_photos(&self, inspection_id: InspectionId) -> Result<Vec<Photo>> {
        let state = self.lock()?;
        Ok(sorted_by_creation(
            state
                .photos
                .iter()
                .filter(|photo| photo.inspection_id == inspection_id && !photo.synced)
                .cloned(),
            |photo| photo.created_at,
        ))
    }

    fn mark_photo_synced(&self, id: &PhotoId) -> Result<()> {
        let mut state = self.lock()?;
        if let Some(photo) = state.photos.iter_mut().find(|photo| &photo.id == id) {
            photo.synced = true;
        }
        Ok(())
    }

    fn enqueue_sync_item(
        &self,
        inspection_id: InspectionId,
        kind: SyncItemKind,
        payload: &Document,
    ) -> Result<i64> {
        Ok(self.lock()?.enqueue(inspection_id, kind, payload))
    }

    fn get_pending_sync_items(
        &self,
        inspection_id: Option<InspectionId>,
    ) -> Result<Vec<SyncQueueItem>> {
        Ok(self.lock()?.queue_items(inspection_id, true))
    }

    fn list_sync_items(&self, inspection_id: Option<InspectionId>) -> Result<Vec<SyncQueueItem>> {
        Ok(self.lock()?.queue_items(inspection_id, false))
    }

    fn mark_sync_item_status(
        &self,
        item_id: i64,
        status: SyncItemStatus,
        error_message: Option<&str>,
    ) -> Result<()> {
        let mut state = self.lock()?;
        if let Some(item) = state.queue.get_mut(&item_id) {
            item.status = status;
            item.error_message = error_message.map(ToString::to_string);
            item.attempts = item.attempts.saturating_add(1);
        }
        Ok(())
    }

    fn clear_done_sync_items(&self) -> Result<usize> {
        let mut state = self.lock()?;
        let before = state.queue.len();
        state
            .queue
            .retain(|_, item| item.status != SyncItemStatus::Done);
        Ok(before - state.queue.len())
    }
}
