use axum::{Json, extract::Query, extract::State, http::StatusCode};
use chrono::NaiveDate;
use serde::Deserialize;
use util::config::{self, MissingRecordPolicy};
use util::state::AppState;

use services::roster::DbRoster;
use services::summary::{Aggregation, AttendanceSummary, DateRange, GroupBy, SummaryScope};

use crate::response::{ApiResponse, error_response};

#[derive(Debug, Deserialize)]
pub struct SummaryQuery {
    /// `attendee:{id}` or `class:{id}`.
    pub scope: String,
    pub from: NaiveDate,
    pub to: NaiveDate,
    pub group_by: Option<GroupBy>,
    /// Overrides the configured missing-record policy for this request.
    pub missing: Option<MissingRecordPolicy>,
}

fn parse_scope(raw: &str) -> Option<SummaryScope> {
    let (kind, id) = raw.split_once(':')?;
    let id: i64 = id.parse().ok()?;
    match kind {
        "attendee" => Some(SummaryScope::Attendee(id)),
        "class" => Some(SummaryScope::Class(id)),
        _ => None,
    }
}

/// GET /api/attendance/summary
///
/// Read-only aggregation over attendance records for one attendee or one
/// class between two dates, inclusive.
pub async fn summary(
    State(state): State<AppState>,
    Query(query): Query<SummaryQuery>,
) -> (StatusCode, Json<ApiResponse<Option<AttendanceSummary>>>) {
    let Some(scope) = parse_scope(&query.scope) else {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error_kind(
                "Validation",
                format!(
                    "invalid scope '{}', expected 'attendee:{{id}}' or 'class:{{id}}'",
                    query.scope
                ),
            )),
        );
    };

    let range = match DateRange::new(query.from, query.to) {
        Ok(r) => r,
        Err(e) => return error_response(&e),
    };

    let group_by = query.group_by.unwrap_or(GroupBy::Total);
    let policy = query.missing.unwrap_or_else(config::summary_missing_policy);

    let roster = DbRoster::new(state.db_clone());
    match Aggregation::summarize(state.db(), &roster, scope, range, group_by, policy).await {
        Ok(result) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                Some(result),
                "Attendance summary computed",
            )),
        ),
        Err(e) => error_response(&e),
    }
}
