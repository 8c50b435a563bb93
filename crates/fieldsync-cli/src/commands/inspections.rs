use fieldsync_core::util::now_millis;
use fieldsync_core::LocalStore;

use crate::commands::common::{format_inspection_lines, inspection_to_list_item, InspectionListItem};
use crate::error::CliError;

pub fn run_inspections(store: &dyn LocalStore, as_json: bool) -> Result<(), CliError> {
    let inspections = store.get_all_inspections()?;
    let now = now_millis();

    if as_json {
        let json_items = inspections
            .iter()
            .map(|inspection| inspection_to_list_item(inspection, now))
            .collect::<Vec<InspectionListItem>>();
        println!("{}", serde_json::to_string_pretty(&json_items)?);
        return Ok(());
    }

    if inspections.is_empty() {
        println!("No inspections cached.");
        return Ok(());
    }

    for line in format_inspection_lines(&inspections, now) {
        println!("{line}");
    }
    Ok(())
}
