//! Sync pass orchestration.
//!
//! A pass pushes one inspection's local changes in a fixed order: report data,
//! photos, recordings, then the optional status advance. Every phase runs even
//! when an earlier one failed, and the inspection is only settled locally when
//! the whole pass finished without a single error.

use std::sync::Arc;

use base64::{engine::general_purpose::STANDARD as BASE64, Engine as _};

use crate::error::Result;
use crate::models::{
    InspectionId, InspectionStatus, Photo, Recording, SyncItemKind, SyncItemStatus, SyncQueueItem,
};
use crate::store::LocalStore;

use super::blob::BlobReader;
use super::locks::InspectionLocks;
use super::remote::{RecordingUpload, RemoteClient, RemoteResult};

/// Advisory progress report emitted at each phase boundary.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyncProgress {
    /// Running step counter within the pass, starting at 1
    pub step: u32,
    pub message: String,
}

pub type ProgressCallback<'a> = &'a dyn Fn(&SyncProgress);

#[derive(Clone, Copy, Default)]
pub struct SyncOptions<'a> {
    pub on_progress: Option<ProgressCallback<'a>>,
    /// Advance the remote status once everything else has been pushed
    pub mark_finished: bool,
}

/// Result of one sync pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SyncOutcome {
    /// `true` only when every phase completed without error
    pub success: bool,
    pub errors: Vec<String>,
    /// Report payloads, photos and recordings pushed, plus the status advance
    pub processed: usize,
}

impl SyncOutcome {
    fn failed(message: String) -> Self {
        Self {
            success: false,
            errors: vec![message],
            processed: 0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InspectionSyncResult {
    pub inspection_id: InspectionId,
    pub outcome: SyncOutcome,
}

/// Bookkeeping for a pass in progress.
struct Pass<'a> {
    inspection_id: InspectionId,
    on_progress: Option<ProgressCallback<'a>>,
    step: u32,
    errors: Vec<String>,
    processed: usize,
}

impl<'a> Pass<'a> {
    const fn new(inspection_id: InspectionId, on_progress: Option<ProgressCallback<'a>>) -> Self {
        Self {
            inspection_id,
            on_progress,
            step: 0,
            errors: Vec::new(),
            processed: 0,
        }
    }

    fn emit(&mut self, message: impl Into<String>) {
        self.step += 1;
        let progress = SyncProgress {
            step: self.step,
            message: message.into(),
        };
        tracing::debug!(
            "Inspection {} sync step {}: {}",
            self.inspection_id,
            progress.step,
            progress.message
        );
        if let Some(callback) = self.on_progress {
            callback(&progress);
        }
    }

    fn fail(&mut self, error: String) {
        tracing::warn!("Inspection {} sync error: {error}", self.inspection_id);
        self.errors.push(error);
    }

    fn into_outcome(self) -> SyncOutcome {
        SyncOutcome {
            success: self.errors.is_empty(),
            errors: self.errors,
            processed: self.processed,
        }
    }
}

/// Pushes queued local changes to the remote.
pub struct SyncEngine<R, B> {
    store: Arc<dyn LocalStore>,
    remote: R,
    blobs: B,
    locks: InspectionLocks,
}

impl<R: RemoteClient, B: BlobReader> SyncEngine<R, B> {
    pub fn new(store: Arc<dyn LocalStore>, remote: R, blobs: B) -> Self {
        Self {
            store,
            remote,
            blobs,
            locks: InspectionLocks::new(),
        }
    }

    pub fn store(&self) -> &Arc<dyn LocalStore> {
        &self.store
    }

    pub const fn remote(&self) -> &R {
        &self.remote
    }

    /// Run one sync pass for an inspection.
    ///
    /// Remote and blob failures are collected into the outcome; only local
    /// store failures abort the pass with `Err`. A second call for the same
    /// inspection waits until the running pass has finished.
    pub async fn sync_inspection(
        &self,
        inspection_id: InspectionId,
        options: SyncOptions<'_>,
    ) -> Result<SyncOutcome> {
        let _guard = self.locks.acquire(inspection_id).await;
        let mut pass = Pass::new(inspection_id, options.on_progress);

        let outstanding = self.outstanding_items(Some(inspection_id))?;
        let finish_requests: Vec<&SyncQueueItem> = outstanding
            .iter()
            .filter(|item| item.kind == SyncItemKind::Status)
            .collect();
        let finish = options.mark_finished || !finish_requests.is_empty();

        pass.emit("Uploading report data…");
        let report_items: Vec<&SyncQueueItem> = outstanding
            .iter()
            .filter(|item| item.kind == SyncItemKind::ReportData)
            .collect();
        if let Some((latest, superseded)) = report_items.split_last() {
            self.push_report_data(inspection_id, latest, superseded, &mut pass)
                .await?;
        }

        let photos = self.store.get_unsynced_photos(inspection_id)?;
        pass.emit(format!("Uploading {} photo(s)…", photos.len()));
        let errors_before = pass.errors.len();
        for photo in &photos {
            self.push_photo(photo, &mut pass).await?;
        }
        if pass.errors.len() == errors_before {
            self.settle_markers(&outstanding, SyncItemKind::Photo)?;
        }

        let recordings = self.store.get_unsynced_recordings(inspection_id)?;
        pass.emit(format!("Uploading {} recording(s)…", recordings.len()));
        let errors_before = pass.errors.len();
        for recording in &recordings {
            self.push_recording(recording, &mut pass).await?;
        }
        if pass.errors.len() == errors_before {
            self.settle_markers(&outstanding, SyncItemKind::Recording)?;
        }

        if finish && pass.errors.is_empty() {
            pass.emit("Finalising…");
            match self.advance_status(inspection_id).await {
                Ok(status) => {
                    for item in &finish_requests {
                        self.store
                            .mark_sync_item_status(item.id, SyncItemStatus::Done, None)?;
                    }
                    pass.processed += 1;
                    tracing::info!("Inspection {inspection_id} advanced to {status}");
                }
                Err(error) => {
                    let message = error.to_string();
                    for item in &finish_requests {
                        self.store.mark_sync_item_status(
                            item.id,
                            SyncItemStatus::Error,
                            Some(&message),
                        )?;
                    }
                    pass.fail(format!("Status advance: {message}"));
                }
            }
        }

        if pass.errors.is_empty() {
            let cleared = self.store.clear_done_sync_items()?;
            if self.has_unpushed_changes(inspection_id)? {
                tracing::info!(
                    "Inspection {inspection_id} was edited during sync; leaving it dirty for the next pass"
                );
            } else {
                self.store.mark_inspection_synced(inspection_id)?;
            }
            pass.emit("Sync complete");
            tracing::info!(
                "Synced inspection {inspection_id}: {} change(s) pushed, {cleared} queue item(s) cleared",
                pass.processed
            );
        } else {
            let message = format!("Sync finished with {} error(s)", pass.errors.len());
            pass.emit(message);
        }

        Ok(pass.into_outcome())
    }

    /// Sync every inspection with pending or failed queue items, one after
    /// another.
    ///
    /// A local store failure during one inspection is reported in its result
    /// and the remaining inspections still run.
    pub async fn sync_all(
        &self,
        on_progress: Option<ProgressCallback<'_>>,
    ) -> Result<Vec<InspectionSyncResult>> {
        let mut inspection_ids: Vec<InspectionId> = self
            .outstanding_items(None)?
            .into_iter()
            .map(|item| item.inspection_id)
            .collect();
        inspection_ids.dedup();

        let mut results = Vec::with_capacity(inspection_ids.len());
        for inspection_id in inspection_ids {
            let options = SyncOptions {
                on_progress,
                mark_finished: false,
            };
            let outcome = match self.sync_inspection(inspection_id, options).await {
                Ok(outcome) => outcome,
                Err(error) => {
                    tracing::warn!("Sync of inspection {inspection_id} aborted: {error}");
                    SyncOutcome::failed(format!("Sync failed: {error}"))
                }
            };
            results.push(InspectionSyncResult {
                inspection_id,
                outcome,
            });
        }
        Ok(results)
    }

    /// Items a pass still has to act on: pending ones and earlier failures.
    fn outstanding_items(
        &self,
        inspection_id: Option<InspectionId>,
    ) -> Result<Vec<SyncQueueItem>> {
        let mut items = self.store.list_sync_items(inspection_id)?;
        items.retain(|item| item.status != SyncItemStatus::Done);
        Ok(items)
    }

    /// Anything queued or captured after this pass read its work.
    fn has_unpushed_changes(&self, inspection_id: InspectionId) -> Result<bool> {
        Ok(!self.outstanding_items(Some(inspection_id))?.is_empty()
            || !self.store.get_unsynced_photos(inspection_id)?.is_empty()
            || !self.store.get_unsynced_recordings(inspection_id)?.is_empty())
    }

    /// Push the newest report data document. Older failed documents it
    /// replaces are settled along with it.
    async fn push_report_data(
        &self,
        inspection_id: InspectionId,
        item: &SyncQueueItem,
        superseded: &[&SyncQueueItem],
        pass: &mut Pass<'_>,
    ) -> Result<()> {
        let result = match item.payload.get("report_data") {
            Some(report_data) => self
                .remote
                .update_inspection_report_data(inspection_id, report_data)
                .await
                .map_err(|error| error.to_string()),
            None => Err(format!("queue item {} has no report data payload", item.id)),
        };

        match result {
            Ok(()) => {
                self.store
                    .mark_sync_item_status(item.id, SyncItemStatus::Done, None)?;
                for older in superseded {
                    self.store
                        .mark_sync_item_status(older.id, SyncItemStatus::Done, None)?;
                }
                pass.processed += 1;
            }
            Err(message) => {
                self.store
                    .mark_sync_item_status(item.id, SyncItemStatus::Error, Some(&message))?;
                pass.fail(format!("Report data: {message}"));
            }
        }
        Ok(())
    }

    async fn push_photo(&self, photo: &Photo, pass: &mut Pass<'_>) -> Result<()> {
        // Photo content travels inside the report data document; the read only
        // proves the captured file is still there.
        match self.blobs.read_as_binary(&photo.file_path).await {
            Ok(_) => {
                self.store.mark_photo_synced(&photo.id)?;
                pass.processed += 1;
            }
            Err(error) => pass.fail(format!("Photo {}: {error}", photo.id)),
        }
        Ok(())
    }

    async fn push_recording(&self, recording: &Recording, pass: &mut Pass<'_>) -> Result<()> {
        let bytes = match self.blobs.read_as_binary(&recording.file_path).await {
            Ok(bytes) => bytes,
            Err(error) => {
                pass.fail(format!("Recording {}: {error}", recording.id));
                return Ok(());
            }
        };

        let upload = RecordingUpload {
            item_key: recording.item_key.clone(),
            label: recording.label.clone(),
            duration: recording.duration,
            audio_base64: BASE64.encode(bytes),
            mime_type: recording.mime_type.clone(),
        };
        match self
            .remote
            .upload_recording(recording.inspection_id, &upload)
            .await
        {
            Ok(()) => {
                self.store.mark_recording_synced(&recording.id)?;
                pass.processed += 1;
            }
            Err(error) => pass.fail(format!("Recording {}: {error}", recording.id)),
        }
        Ok(())
    }

    fn settle_markers(&self, outstanding: &[SyncQueueItem], kind: SyncItemKind) -> Result<()> {
        for item in outstanding.iter().filter(|item| item.kind == kind) {
            self.store
                .mark_sync_item_status(item.id, SyncItemStatus::Done, None)?;
        }
        Ok(())
    }

    async fn advance_status(&self, inspection_id: InspectionId) -> RemoteResult<InspectionStatus> {
        let inspection = self.remote.get_inspection(inspection_id).await?;
        let next = InspectionStatus::after_field_work(inspection.typist_assigned());
        self.remote
            .update_inspection_status(inspection_id, next)
            .await?;
        Ok(next)
    }
}
