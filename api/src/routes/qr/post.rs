use axum::{
    Json,
    extract::{Path, State},
    http::StatusCode,
};
use chrono::Duration;
use services::roster::DbRoster;
use services::token::TokenService;
use util::{config, state::AppState};
use validator::Validate;

use super::common::{IssueTokenReq, QrTokenResponse};
use crate::response::{ApiResponse, error_response};

/// POST /api/qr/sessions/{session_id}/token
///
/// Issues a fresh time-boxed token for the session, implicitly revoking any
/// prior active one.
pub async fn issue_token(
    State(state): State<AppState>,
    Path(session_id): Path<i64>,
    Json(body): Json<IssueTokenReq>,
) -> (StatusCode, Json<ApiResponse<QrTokenResponse>>) {
    if let Err(e) = body.validate() {
        return (
            StatusCode::BAD_REQUEST,
            Json(ApiResponse::error_kind("Validation", e.to_string())),
        );
    }

    let ttl = Duration::seconds(body.ttl_seconds.unwrap_or_else(config::qr_token_ttl_seconds));
    let roster = DbRoster::new(state.db_clone());

    match TokenService::issue(state.db(), &roster, session_id, ttl).await {
        Ok(token) => (
            StatusCode::CREATED,
            Json(ApiResponse::success(
                QrTokenResponse::from(token),
                "Attendance token issued",
            )),
        ),
        Err(e) => error_response(&e),
    }
}

/// POST /api/qr/tokens/{token}/revoke
pub async fn revoke_token(
    State(state): State<AppState>,
    Path(token): Path<String>,
) -> (StatusCode, Json<ApiResponse<QrTokenResponse>>) {
    match TokenService::revoke(state.db(), &token).await {
        Ok(revoked) => (
            StatusCode::OK,
            Json(ApiResponse::success(
                QrTokenResponse::from(revoked),
                "Attendance token revoked",
            )),
        ),
        Err(e) => error_response(&e),
    }
}
