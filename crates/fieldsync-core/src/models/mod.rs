//! Data models for fieldsync

mod inspection;
mod photo;
mod recording;
mod sync_item;

pub use inspection::{CachedInspection, InspectionId, InspectionStatus};
pub use photo::{Photo, PhotoId};
pub use recording::{Recording, RecordingId, DEFAULT_RECORDING_MIME_TYPE};
pub use sync_item::{ReportDataPayload, SyncItemKind, SyncItemStatus, SyncQueueItem};

/// Opaque JSON document forwarded between the editor, the store and the remote.
pub type Document = serde_json::Value;

/// The empty document returned for reports that have not been edited yet.
#[must_use]
pub fn empty_document() -> Document {
    Document::Object(serde_json::Map::new())
}
