use axum::{Json, extract::State, http::StatusCode};
use util::state::AppState;
use validator::Validate;

use services::manual::{ManualEntry, ManualRecorder};
use services::roster::DbRoster;
use services::scan::{ScanIntake, ScanRequest};
use services::status::SourceSystem;

use super::common::{
    AttendanceRecordResponse, BulkItemResponse, BulkManualReq, ManualReq, ScanReq,
};
use crate::response::{ApiResponse, error_response};

/// POST /api/attendance/scan
///
/// Converts a validated token plus attendee identity into an at-most-once
/// attendance record. Safe to retry: a repeat scan returns the existing
/// record with 200 instead of creating a duplicate.
pub async fn scan(
    State(state): State<AppState>,
    Json(body): Json<ScanReq>,
) -> (StatusCode, Json<ApiResponse<AttendanceRecordResponse>>) {
    if let Err(e) = body.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error_kind("Validation", e.to_string())),
        );
    }

    let roster = DbRoster::new(state.db_clone());
    let req = ScanRequest {
        token_secret: body.token,
        device_id: body.device_id,
        attendee_id: body.attendee_id,
        timestamp: body.timestamp,
        force: body.force,
    };

    match ScanIntake::handle_scan(state.db(), &roster, req).await {
        Ok(outcome) => {
            let status = if outcome.created {
                StatusCode::CREATED
            } else {
                StatusCode::OK
            };
            (
                status,
                Json(ApiResponse::success(
                    AttendanceRecordResponse::from(outcome.record),
                    "Attendance recorded",
                )),
            )
        }
        Err(e) => error_response(&e),
    }
}

fn to_entry(req: ManualReq) -> ManualEntry {
    ManualEntry {
        attendee_id: req.attendee_id,
        session_id: req.session_id,
        date: req.date,
        status_code: req.status,
        system: req.system.unwrap_or(SourceSystem::Gateway),
        reason: req.reason,
    }
}

/// POST /api/attendance/manual
///
/// Staff override; always supersedes the current record for the key.
pub async fn manual_one(
    State(state): State<AppState>,
    Json(body): Json<ManualReq>,
) -> (StatusCode, Json<ApiResponse<AttendanceRecordResponse>>) {
    if let Err(e) = body.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error_kind("Validation", e.to_string())),
        );
    }

    let roster = DbRoster::new(state.db_clone());
    match ManualRecorder::record_one(state.db(), &roster, to_entry(body)).await {
        Ok(record) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                AttendanceRecordResponse::from(record),
                "Attendance recorded",
            )),
        ),
        Err(e) => error_response(&e),
    }
}

/// POST /api/attendance/manual/bulk
///
/// Processes every item independently; the response reports one outcome per
/// item in input order. Partial completion is a normal result, never a 4xx.
pub async fn manual_bulk(
    State(state): State<AppState>,
    Json(body): Json<BulkManualReq>,
) -> (StatusCode, Json<ApiResponse<Vec<BulkItemResponse>>>) {
    let entries: Vec<ManualEntry> = body.items.into_iter().map(to_entry).collect();

    let roster = DbRoster::new(state.db_clone());
    let outcomes = ManualRecorder::record_bulk(state.db(), &roster, entries).await;

    let results: Vec<BulkItemResponse> = outcomes
        .into_iter()
        .enumerate()
        .map(|(index, outcome)| match outcome {
            Ok(record) => BulkItemResponse {
                index,
                success: true,
                record: Some(AttendanceRecordResponse::from(record)),
                error_kind: None,
                message: None,
            },
            Err(err) => BulkItemResponse {
                index,
                success: false,
                record: None,
                error_kind: Some(err.kind().to_string()),
                message: Some(err.to_string()),
            },
        })
        .collect();

    (
        StatusCode::OK,
        Json(ApiResponse::success(results, "Bulk attendance processed")),
    )
}
