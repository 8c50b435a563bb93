use fieldsync_core::{InspectionId, LocalStore};

use crate::commands::common::{format_queue_lines, queue_to_list_item, QueueListItem};
use crate::error::CliError;

pub fn run_queue(
    store: &dyn LocalStore,
    inspection_id: Option<InspectionId>,
    as_json: bool,
) -> Result<(), CliError> {
    let items = store.list_sync_items(inspection_id)?;

    if as_json {
        let json_items = items
            .iter()
            .map(queue_to_list_item)
            .collect::<Vec<QueueListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if items.is_empty() {
        println!("Sync queue is empty.");
        return Ok(());
    }

    for line in format_queue_lines(&items) {
        println!("{line}");
    }
    Ok(())
}
