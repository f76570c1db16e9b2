//! HTTP route entry point for `/api/...`.
//!
//! Route groups:
//! - `/health` → liveness probe (public)
//! - `/qr` → token issue/revoke (staff and teachers only)
//! - `/attendance` → scan intake, manual overrides, summaries (authenticated;
//!   manual writes staff/teacher only)

use axum::{Router, middleware::from_fn};
use util::state::AppState;

use crate::auth::guards::allow_staff;

pub mod attendance;
pub mod health;
pub mod qr;

/// Builds the complete application router for all HTTP endpoints.
///
/// The returned router has `AppState` as its state type and mounts all core
/// API routes under their respective base paths.
pub fn routes(app_state: AppState) -> Router<AppState> {
    Router::new()
        .nest("/health", health::health_routes())
        .nest("/qr", qr::qr_routes().route_layer(from_fn(allow_staff)))
        .nest("/attendance", attendance::attendance_routes())
        .with_state(app_state)
}
