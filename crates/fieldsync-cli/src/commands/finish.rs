use fieldsync_core::models::{SyncItemKind, SyncItemStatus};
use fieldsync_core::util::now_millis;
use fieldsync_core::{InspectionId, LocalStore};

use crate::error::CliError;

/// Queue a finish request, or return the one still waiting to go through.
pub fn request_finish(
    store: &dyn LocalStore,
    inspection_id: InspectionId,
) -> Result<(i64, bool), CliError> {
    if store.get_cached_inspection(inspection_id)?.is_none() {
        return Err(CliError::InspectionNotFound(inspection_id));
    }

    // A failed request is retried by the next sync, so it still counts
    let queued = store.list_sync_items(Some(inspection_id))?;
    if let Some(existing) = queued
        .iter()
        .find(|item| item.kind == SyncItemKind::Status && item.status != SyncItemStatus::Done)
        .map(|item| item.id)
    {
        return Ok((existing, false));
    }

    let id = store.enqueue_sync_item(
        inspection_id,
        SyncItemKind::Status,
        &serde_json::json!({ "requested_at": now_millis() }),
    )?;
    store.mark_inspection_dirty(inspection_id)?;
    Ok((id, true))
}

pub fn run_finish(store: &dyn LocalStore, inspection_id: InspectionId) -> Result<(), CliError> {
    let (item_id, created) = request_finish(store, inspection_id)?;
    if created {
        println!("Finish requested for inspection {inspection_id} (queue item {item_id})");
    } else {
        println!("Finish already queued for inspection {inspection_id} (queue item {item_id})");
    }
    Ok(())
}
