//! Inspection model

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::{Error, Result};

use super::Document;

/// Server-assigned inspection identifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InspectionId(i64);

impl InspectionId {
    #[must_use]
    pub const fn new(id: i64) -> Self {
        Self(id)
    }

    #[must_use]
    pub const fn get(self) -> i64 {
        self.0
    }

    /// Read the `id` field of an inspection record as served by the remote.
    pub fn from_record(record: &Document) -> Result<Self> {
        record
            .get("id")
            .and_then(serde_json::Value::as_i64)
            .map(Self)
            .ok_or_else(|| Error::InvalidInput("Inspection record has no integer id".to_string()))
    }
}

impl From<i64> for InspectionId {
    fn from(id: i64) -> Self {
        Self(id)
    }
}

impl fmt::Display for InspectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for InspectionId {
    type Err = std::num::ParseIntError;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        Ok(Self(s.trim().parse()?))
    }
}

/// Remote lifecycle status of an inspection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum InspectionStatus {
    Created,
    Assigned,
    Active,
    Processing,
    Review,
    Complete,
}

impl InspectionStatus {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Created => "created",
            Self::Assigned => "assigned",
            Self::Active => "active",
            Self::Processing => "processing",
            Self::Review => "review",
            Self::Complete => "complete",
        }
    }

    /// Status an inspection moves to once the inspector has finished on site.
    ///
    /// Work goes straight to the typist when one is assigned, otherwise to review.
    #[must_use]
    pub const fn after_field_work(typist_assigned: bool) -> Self {
        if typist_assigned {
            Self::Processing
        } else {
            Self::Review
        }
    }
}

impl fmt::Display for InspectionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A locally cached inspection record with its sync bookkeeping.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CachedInspection {
    /// Inspection identifier
    pub id: InspectionId,
    /// Full inspection record as fetched from the remote
    pub record: Document,
    /// When the record was last written to the cache (Unix ms)
    pub fetched_at: i64,
    /// When the last fully successful sync pass settled (Unix ms)
    pub synced_at: Option<i64>,
    /// Local edits not yet accepted by the remote
    pub is_dirty: bool,
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_inspection_id_from_record() {
        let id = InspectionId::from_record(&json!({ "id": 42, "status": "active" })).unwrap();
        assert_eq!(id, InspectionId::new(42));
    }

    #[test]
    fn test_inspection_id_from_record_requires_integer() {
        assert!(InspectionId::from_record(&json!({ "id": "42" })).is_err());
        assert!(InspectionId::from_record(&json!({ "status": "active" })).is_err());
    }

    #[test]
    fn test_inspection_id_parse() {
        let id: InspectionId = " 17 ".parse().unwrap();
        assert_eq!(id.get(), 17);
        assert!("abc".parse::<InspectionId>().is_err());
    }

    #[test]
    fn test_status_after_field_work() {
        assert_eq!(
            InspectionStatus::after_field_work(true),
            InspectionStatus::Processing
        );
        assert_eq!(
            InspectionStatus::after_field_work(false),
            InspectionStatus::Review
        );
    }

    #[test]
    fn test_status_serializes_lowercase() {
        assert_eq!(
            serde_json::to_string(&InspectionStatus::Processing).unwrap(),
            "\"processing\""
        );
    }
}
