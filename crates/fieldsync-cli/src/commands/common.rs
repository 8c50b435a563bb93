use std::path::PathBuf;

use fieldsync_core::models::{CachedInspection, SyncQueueItem};
use fieldsync_core::sync::InspectionSyncResult;
use serde::Serialize;

use crate::error::CliError;

#[derive(Debug, Serialize)]
pub struct InspectionListItem {
    pub id: i64,
    pub address: Option<String>,
    pub status: Option<String>,
    pub fetched_at: i64,
    pub relative_time: String,
    pub synced_at: Option<i64>,
    pub dirty: bool,
}

#[derive(Debug, Serialize)]
pub struct QueueListItem {
    pub id: i64,
    pub inspection_id: i64,
    #[serde(rename = "type")]
    pub kind: String,
    pub status: String,
    pub attempts: u32,
    pub created_at: i64,
    pub created_at_iso: String,
    pub error: Option<String>,
}

pub fn default_db_path() -> Result<PathBuf, CliError> {
    dirs::data_dir()
        .map(|dir| dir.join("fieldsync").join("offline.db"))
        .ok_or_else(|| CliError::Config("Failed to resolve CLI data directory".to_string()))
}

fn record_text(inspection: &CachedInspection, field: &str) -> Option<String> {
    inspection
        .record
        .get(field)
        .and_then(serde_json::Value::as_str)
        .map(ToString::to_string)
}

pub fn inspection_to_list_item(inspection: &CachedInspection, now_ms: i64) -> InspectionListItem {
    InspectionListItem {
        id: inspection.id.get(),
        address: record_text(inspection, "address"),
        status: record_text(inspection, "status"),
        fetched_at: inspection.fetched_at,
        relative_time: format_relative_time(inspection.fetched_at, now_ms),
        synced_at: inspection.synced_at,
        dirty: inspection.is_dirty,
    }
}

pub fn format_inspection_lines(inspections: &[CachedInspection], now_ms: i64) -> Vec<String> {
    inspections
        .iter()
        .map(|inspection| {
            let item = inspection_to_list_item(inspection, now_ms);
            format!(
                "{:>6}  {}  {:<10}  {:<10}  {}",
                item.id,
                if item.dirty { "*" } else { " " },
                item.status.as_deref().unwrap_or("-"),
                item.relative_time,
                item.address.as_deref().unwrap_or("")
            )
        })
        .collect()
}

pub fn queue_to_list_item(item: &SyncQueueItem) -> QueueListItem {
    QueueListItem {
        id: item.id,
        inspection_id: item.inspection_id.get(),
        kind: item.kind.to_string(),
        status: item.status.to_string(),
        attempts: item.attempts,
        created_at: item.created_at,
        created_at_iso: format_timestamp(item.created_at),
        error: item.error_message.clone(),
    }
}

pub fn format_queue_lines(items: &[SyncQueueItem]) -> Vec<String> {
    items
        .iter()
        .map(|item| {
            let mut line = format!(
                "{:>6}  inspection={}  {:<11}  {:<7}  attempts={}  {}",
                item.id,
                item.inspection_id,
                item.kind,
                item.status,
                item.attempts,
                format_timestamp(item.created_at)
            );
            if let Some(error) = &item.error_message {
                line.push_str(&format!("  error={error}"));
            }
            line
        })
        .collect()
}

pub fn format_sync_result_lines(results: &[InspectionSyncResult]) -> Vec<String> {
    let mut lines = Vec::new();
    for result in results {
        let outcome = &result.outcome;
        if outcome.success {
            lines.push(format!(
                "Inspection {}: synced ({} change(s))",
                result.inspection_id, outcome.processed
            ));
        } else {
            lines.push(format!(
                "Inspection {}: {} error(s)",
                result.inspection_id,
                outcome.errors.len()
            ));
            lines.extend(outcome.errors.iter().map(|error| format!("  - {error}")));
        }
    }
    lines
}

pub fn format_timestamp(timestamp_ms: i64) -> String {
    chrono::DateTime::from_timestamp_millis(timestamp_ms).map_or_else(
        || timestamp_ms.to_string(),
        |date_time| date_time.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
    )
}

pub fn format_relative_time(timestamp_ms: i64, now_ms: i64) -> String {
    let diff = now_ms.saturating_sub(timestamp_ms);
    let minute = 60_000;
    let hour = 60 * minute;
    let day = 24 * hour;
    let week = 7 * day;

    if diff < minute {
        "just now".to_string()
    } else if diff < hour {
        format!("{}m ago", diff / minute)
    } else if diff < day {
        format!("{}h ago", diff / hour)
    } else if diff < week {
        format!("{}d ago", diff / day)
    } else {
        format!("{}w ago", diff / week)
    }
}
