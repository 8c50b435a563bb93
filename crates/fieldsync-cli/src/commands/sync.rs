use std::path::PathBuf;
use std::sync::Arc;

use fieldsync_core::sync::{
    FsBlobReader, HttpRemoteClient, InspectionSyncResult, SyncEngine, SyncOptions, SyncProgress,
};
use fieldsync_core::{ClientConfig, InspectionId, LocalStore};

use crate::commands::common::format_sync_result_lines;
use crate::error::CliError;

/// Directory that relative photo and recording paths resolve against.
pub fn blob_root(config: &ClientConfig) -> PathBuf {
    config
        .data_dir
        .clone()
        .or_else(|| {
            config
                .db_path
                .as_deref()
                .and_then(|path| path.parent())
                .map(PathBuf::from)
        })
        .unwrap_or_else(|| PathBuf::from("."))
}

pub async fn run_sync(
    config: &ClientConfig,
    store: Arc<dyn LocalStore>,
    inspection_id: Option<InspectionId>,
    finish: bool,
) -> Result<(), CliError> {
    let remote = HttpRemoteClient::from_config(config)?;
    let engine = SyncEngine::new(store, remote, FsBlobReader::new(blob_root(config)));
    let on_progress = |progress: &SyncProgress| {
        eprintln!("[{}] {}", progress.step, progress.message);
    };

    let results = match inspection_id {
        Some(inspection_id) => {
            let options = SyncOptions {
                on_progress: Some(&on_progress),
                mark_finished: finish,
            };
            let outcome = engine.sync_inspection(inspection_id, options).await?;
            vec![InspectionSyncResult {
                inspection_id,
                outcome,
            }]
        }
        None => engine.sync_all(Some(&on_progress)).await?,
    };

    if results.is_empty() {
        println!("Nothing to sync.");
        return Ok(());
    }

    for line in format_sync_result_lines(&results) {
        println!("{line}");
    }

    let failed = results
        .iter()
        .filter(|result| !result.outcome.success)
        .count();
    if failed > 0 {
        return Err(CliError::SyncIncomplete(failed));
    }
    Ok(())
}
