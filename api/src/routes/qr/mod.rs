use axum::{Router, routing::post};
use util::state::AppState;

pub mod common;
pub mod post;

pub fn qr_routes() -> Router<AppState> {
    Router::new()
        .route("/sessions/{session_id}/token", post(post::issue_token))
        .route("/tokens/{token}/revoke", post(post::revoke_token))
}
