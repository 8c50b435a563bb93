//! Photo model

use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

use crate::util::now_millis;

use super::InspectionId;

/// Client-generated photo identifier.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PhotoId(String);

impl PhotoId {
    /// Create a new unique photo ID using UUID v7
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::now_v7().to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Default for PhotoId {
    fn default() -> Self {
        Self::new()
    }
}

impl From<String> for PhotoId {
    fn from(id: String) -> Self {
        Self(id)
    }
}

impl From<&str> for PhotoId {
    fn from(id: &str) -> Self {
        Self(id.to_string())
    }
}

impl fmt::Display for PhotoId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// A photo captured against a report section item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Photo {
    pub id: PhotoId,
    pub inspection_id: InspectionId,
    pub section_id: String,
    pub item_id: String,
    pub file_path: String,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    pub synced: bool,
}

impl Photo {
    pub fn new(
        inspection_id: InspectionId,
        section_id: impl Into<String>,
        item_id: impl Into<String>,
        file_path: impl Into<String>,
    ) -> Self {
        Self {
            id: PhotoId::new(),
            inspection_id,
            section_id: section_id.into(),
            item_id: item_id.into(),
            file_path: file_path.into(),
            created_at: now_millis(),
            synced: false,
        }
    }

    #[must_use]
    pub fn with_id(mut self, id: impl Into<PhotoId>) -> Self {
        self.id = id.into();
        self
    }
}
