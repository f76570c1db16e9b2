//! Shared harness for API integration tests.
//!
//! Each test gets its own router over a fresh in-memory database, boxed as a
//! clonable service so a single test can fire several requests.

use std::convert::Infallible;

use axum::{Router, body::Body, http::Request, response::Response};
use chrono::{Duration, Utc};
use sea_orm::{ActiveModelTrait, DatabaseConnection, Set};
use tower::ServiceExt;
use tower::util::BoxCloneService;

use api::auth::{CallerRole, generate_jwt};
use api::routes::routes;
use db::models::{attendee, schedule_session};
use db::test_utils::setup_test_db;
use util::state::AppState;

pub type TestApp = BoxCloneService<Request<Body>, Response, Infallible>;

pub async fn make_test_app() -> (TestApp, AppState) {
    let db = setup_test_db().await;
    let state = AppState::new(db);

    let router = Router::new()
        .nest("/api", routes(state.clone()))
        .with_state(state.clone());

    (router.into_service().boxed_clone(), state)
}

pub fn bearer(user_id: i64, role: CallerRole) -> String {
    let (token, _) = generate_jwt(user_id, role);
    format!("Bearer {token}")
}

pub struct Seed {
    pub class_id: i64,
    pub teacher: attendee::Model,
    pub students: Vec<attendee::Model>,
    pub session: schedule_session::Model,
}

/// Seeds one class: a teacher, `student_count` enrolled students, and a
/// session starting `starts_offset_minutes` relative to now.
pub async fn seed_class(
    db: &DatabaseConnection,
    student_count: usize,
    starts_offset_minutes: i64,
) -> Seed {
    let now = Utc::now();
    let class_id = 7;

    let teacher = attendee::ActiveModel {
        display_name: Set("Bu Ratna".into()),
        kind: Set(attendee::AttendeeKind::Teacher),
        class_id: Set(None),
        created_at: Set(now),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert teacher");

    let mut students = Vec::with_capacity(student_count);
    for i in 0..student_count {
        let student = attendee::ActiveModel {
            display_name: Set(format!("Student {i}")),
            kind: Set(attendee::AttendeeKind::Student),
            class_id: Set(Some(class_id)),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .expect("insert student");
        students.push(student);
    }

    let starts = now + Duration::minutes(starts_offset_minutes);
    let session = schedule_session::ActiveModel {
        class_id: Set(class_id),
        teacher_id: Set(teacher.id),
        subject: Set("Mathematics".into()),
        session_date: Set(starts.date_naive()),
        starts_at: Set(starts),
        ends_at: Set(starts + Duration::minutes(45)),
        ..Default::default()
    }
    .insert(db)
    .await
    .expect("insert session");

    Seed {
        class_id,
        teacher,
        students,
        session,
    }
}

pub async fn read_json(resp: Response) -> serde_json::Value {
    let bytes = axum::body::to_bytes(resp.into_body(), usize::MAX)
        .await
        .expect("read body");
    serde_json::from_slice(&bytes).expect("parse json body")
}
