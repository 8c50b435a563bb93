//! Sync queue model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Error;

use super::{Document, InspectionId};

/// Kind of outbound change a queue item represents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncItemKind {
    ReportData,
    Photo,
    Recording,
    Status,
}

impl SyncItemKind {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ReportData => "report_data",
            Self::Photo => "photo",
            Self::Recording => "recording",
            Self::Status => "status",
        }
    }
}

impl fmt::Display for SyncItemKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncItemKind {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "report_data" => Ok(Self::ReportData),
            "photo" => Ok(Self::Photo),
            "recording" => Ok(Self::Recording),
            "status" => Ok(Self::Status),
            other => Err(Error::InvalidInput(format!("Unknown sync item type: {other}"))),
        }
    }
}

/// Processing state of a queue item.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SyncItemStatus {
    Pending,
    Done,
    Error,
}

impl SyncItemStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Done => "done",
            Self::Error => "error",
        }
    }
}

impl fmt::Display for SyncItemStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for SyncItemStatus {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "pending" => Ok(Self::Pending),
            "done" => Ok(Self::Done),
            "error" => Ok(Self::Error),
            other => Err(Error::InvalidInput(format!("Unknown sync item status: {other}"))),
        }
    }
}

/// A pending (or settled) outbound change in the sync queue.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SyncQueueItem {
    /// Sequence number, assigned on enqueue
    pub id: i64,
    pub inspection_id: InspectionId,
    pub kind: SyncItemKind,
    /// Opaque payload; `null` when the stored payload could not be parsed
    pub payload: Document,
    pub status: SyncItemStatus,
    /// Creation timestamp (Unix ms)
    pub created_at: i64,
    /// Number of times a sync pass settled this item
    pub attempts: u32,
    pub error_message: Option<String>,
}

/// Payload stored with a `report_data` queue item.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportDataPayload {
    pub inspection_id: InspectionId,
    pub report_data: Document,
}
