//! Audio recording model

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::util::now_millis;

use super::InspectionId;

/// MIME type assumed when the capture surface did not report one.
pub const DEFAULT_RECORDING_MIME_TYPE: &str = "audio/webm";

/// Client-generated recording identifier.
///
/// New ids are UUID v7 strings, but ids minted elsewhere on the device are kept verbatim.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct RecordingId(String);

impl RecordingId {
    /// Create a new unique recording ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for RecordingId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for RecordingId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for RecordingId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for RecordingId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Metadata for an audio note captured against an inspection item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Recording {
    pub id: RecordingId,
    pub inspection_id: InspectionId,
    /// Report item the recording belongs to
    pub item_key: String,
    pub label: String,
    /// Device path (or inline data URI) of the audio content
    pub file_path: String,
    pub mime_type: String,
    /// Length in seconds
    pub duration: i64,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    pub synced: bool,
}

impl Recording {
    /// Create an unsynced recording with a fresh id.
    pub fn new(
        inspection_id: InspectionId,
        item_key: impl Into<String>,
        label: impl Into<String>,
        file_path: impl Into<String>,
    ) -> Self {
        Self {
            id: RecordingId::new(),
            inspection_id,
            item_key: item_key.into(),
            label: label.into(),
            file_path: file_path.into(),
            mime_type: DEFAULT_RECORDING_MIME_TYPE.to_string(),
            duration: 0,
            created_at: now_millis(),
            synced: false,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<RecordingId>) -> Self {
        self.id = id.into();
        self
    }

    #[must_use]
    pub fn with_mime_type(mut self, mime_type: impl Into<String>) -> Self {
        let mime_type = mime_type.into();
        if !mime_type.trim().is_empty() {
            self.mime_type = mime_type.trim().to_string();
        }
        self
    }

    #[must_use]
    pub const fn with_duration(mut self, duration: i64) -> Self {
        self.duration = duration;
        self
    }
}
