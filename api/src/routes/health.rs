use axum::{Json, Router, http::StatusCode, routing::get};
use util::state::AppState;

use crate::response::ApiResponse;

pub fn health_routes() -> Router<AppState> {
    Router::new().route("/", get(health))
}

async fn health() -> (StatusCode, Json<ApiResponse<serde_json::Value>>) {
    (
        StatusCode::OK,
        Json(ApiResponse::success(
            serde_json::json!({ "status": "ok" }),
            "Service healthy",
        )),
    )
}
