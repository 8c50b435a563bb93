//! Sync engine.
//!
//! Drains the local sync queue to the remote inspection API, one inspection at
//! a time, and settles local state once a pass has fully succeeded.

mod blob;
mod engine;
mod locks;
mod remote;

pub use blob::{BlobReader, FsBlobReader};
pub use engine::{
    InspectionSyncResult, ProgressCallback, SyncEngine, SyncOptions, SyncOutcome, SyncProgress,
};
pub use locks::{InspectionLockGuard, InspectionLocks};
pub use remote::{
    HttpRemoteClient, RecordingUpload, RemoteClient, RemoteError, RemoteInspection, RemoteResult,
};
