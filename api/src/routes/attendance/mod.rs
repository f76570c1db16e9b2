use axum::{Router, middleware::from_fn, routing};
use util::state::AppState;

use crate::auth::guards::{allow_authenticated, allow_staff};

pub mod common;
pub mod get;
pub mod post;

pub fn attendance_routes() -> Router<AppState> {
    let open = Router::new()
        .route("/scan", routing::post(post::scan))
        .route("/summary", routing::get(get::summary))
        .route_layer(from_fn(allow_authenticated));

    let staff = Router::new()
        .route("/manual", routing::post(post::manual_one))
        .route("/manual/bulk", routing::post(post::manual_bulk))
        .route_layer(from_fn(allow_staff));

    open.merge(staff)
}
