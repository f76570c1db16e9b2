use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use validator::Validate;

use db::models::attendance_record::{EditEntry, Model as RecordModel};
use services::status::SourceSystem;

#[derive(Debug, Deserialize, Validate)]
pub struct ScanReq {
    #[validate(length(min = 1))]
    pub token: String,
    #[validate(length(min = 1))]
    pub device_id: String,
    pub attendee_id: i64,
    /// Client clock; server clock is authoritative when absent.
    pub timestamp: Option<DateTime<Utc>>,
    /// Allows the scan to supersede an existing manual record.
    #[serde(default)]
    pub force: bool,
}

#[derive(Debug, Deserialize, Validate)]
pub struct ManualReq {
    pub attendee_id: i64,
    pub session_id: i64,
    /// Defaults to the session's scheduled date.
    pub date: Option<NaiveDate>,
    #[validate(length(min = 1))]
    pub status: String,
    /// Vocabulary the status code belongs to; defaults to `gateway`.
    pub system: Option<SourceSystem>,
    pub reason: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct BulkManualReq {
    pub items: Vec<ManualReq>,
}

#[derive(Debug, Serialize, Default)]
pub struct AttendanceRecordResponse {
    pub id: i64,
    pub attendee_id: i64,
    pub session_id: i64,
    pub date: String,
    pub status: String,
    pub reason: Option<String>,
    pub source: String,
    pub created_at: String,
    pub last_edited_at: String,
    pub edit_history: Vec<EditEntryResponse>,
}

#[derive(Debug, Serialize)]
pub struct EditEntryResponse {
    pub status: String,
    pub source: String,
    pub edited_at: String,
}

impl From<EditEntry> for EditEntryResponse {
    fn from(e: EditEntry) -> Self {
        Self {
            status: e.status.to_string(),
            source: e.source.to_string(),
            edited_at: e.edited_at.to_rfc3339(),
        }
    }
}

impl From<RecordModel> for AttendanceRecordResponse {
    fn from(m: RecordModel) -> Self {
        let edit_history = m.history().into_iter().map(Into::into).collect();
        Self {
            id: m.id,
            attendee_id: m.attendee_id,
            session_id: m.session_id,
            date: m.record_date.to_string(),
            status: m.status.to_string(),
            reason: m.reason,
            source: m.source.to_string(),
            created_at: m.created_at.to_rfc3339(),
            last_edited_at: m.last_edited_at.to_rfc3339(),
            edit_history,
        }
    }
}

/// One entry of a bulk write's outcome list, in input order.
#[derive(Debug, Serialize)]
pub struct BulkItemResponse {
    pub index: usize,
    pub success: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub record: Option<AttendanceRecordResponse>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}
