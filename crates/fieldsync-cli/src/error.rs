use fieldsync_core::sync::RemoteError;
use fieldsync_core::InspectionId;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Core(#[from] fieldsync_core::Error),
    #[error(transparent)]
    Remote(#[from] RemoteError),
    #[error(transparent)]
    Serialization(#[from] serde_json::Error),
    #[error("Configuration error: {0}")]
    Config(String),
    #[error("Inspection {0} is not in the offline store")]
    InspectionNotFound(InspectionId),
    #[error("Sync finished with errors for {0} inspection(s)")]
    SyncIncomplete(usize),
}
