use fieldsync_core::{InspectionId, LocalStore};

use crate::error::CliError;

pub fn run_delete(store: &dyn LocalStore, inspection_id: InspectionId) -> Result<(), CliError> {
    let cached = store.get_cached_inspection(inspection_id)?.is_some();
    if !cached && store.list_sync_items(Some(inspection_id))?.is_empty() {
        return Err(CliError::InspectionNotFound(inspection_id));
    }

    store.delete_inspection(inspection_id)?;
    println!("{inspection_id}");
    Ok(())
}
