use fieldsync_core::LocalStore;

use crate::error::CliError;

pub fn run_clear_done(store: &dyn LocalStore) -> Result<(), CliError> {
    let removed = store.clear_done_sync_items()?;
    println!("Removed {removed} finished queue item(s)");
    Ok(())
}
