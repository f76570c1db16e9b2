//! Shared persistence helpers for attendance records.
//!
//! Both intake paths (scan and manual) funnel through these: one current row
//! per (attendee, session, date), supersession instead of duplication, and the
//! edit history appended on every overwrite.

use chrono::{DateTime, NaiveDate, Utc};
use db::models::attendance_record::{
    ActiveModel, CanonicalStatus, Column, EditEntry, Entity, Model, RecordSource,
};
use sea_orm::{
    ActiveModelTrait, ColumnTrait, DatabaseConnection, DbErr, EntityTrait, QueryFilter, Set,
};
use sea_orm::entity::prelude::Json;

use crate::error::ServiceError;

pub(crate) async fn find_current(
    db: &DatabaseConnection,
    attendee_id: i64,
    session_id: i64,
    date: NaiveDate,
) -> Result<Option<Model>, ServiceError> {
    Ok(Entity::find()
        .filter(Column::AttendeeId.eq(attendee_id))
        .filter(Column::SessionId.eq(session_id))
        .filter(Column::RecordDate.eq(date))
        .one(db)
        .await?)
}

pub(crate) async fn insert_new(
    db: &DatabaseConnection,
    attendee_id: i64,
    session_id: i64,
    date: NaiveDate,
    status: CanonicalStatus,
    reason: Option<String>,
    source: RecordSource,
    now: DateTime<Utc>,
) -> Result<Model, DbErr> {
    ActiveModel {
        attendee_id: Set(attendee_id),
        session_id: Set(session_id),
        record_date: Set(date),
        status: Set(status),
        reason: Set(reason),
        source: Set(source),
        created_at: Set(now),
        last_edited_at: Set(now),
        edit_history: Set(Json::Array(Vec::new())),
        ..Default::default()
    }
    .insert(db)
    .await
}

/// Replaces the current value of an existing record, appending the prior
/// {status, source, edited_at} to the append-only history.
///
/// The UPDATE lands only if the row still carries the `last_edited_at` the
/// caller read. `Ok(None)` means a concurrent edit won; the caller re-reads
/// the current row and decides again, so no history entry is ever lost.
pub(crate) async fn supersede(
    db: &DatabaseConnection,
    existing: Model,
    status: CanonicalStatus,
    reason: Option<String>,
    source: RecordSource,
    now: DateTime<Utc>,
) -> Result<Option<Model>, ServiceError> {
    let prior = EditEntry {
        status: existing.status,
        source: existing.source,
        edited_at: existing.last_edited_at,
    };

    let mut history = match existing.edit_history.clone() {
        Json::Array(items) => items,
        _ => Vec::new(),
    };
    history.push(serde_json::to_value(prior).map_err(|e| {
        ServiceError::Validation(format!("could not serialize edit history entry: {e}"))
    })?);

    let res = Entity::update_many()
        .set(ActiveModel {
            status: Set(status),
            reason: Set(reason),
            source: Set(source),
            last_edited_at: Set(now),
            edit_history: Set(Json::Array(history)),
            ..Default::default()
        })
        .filter(Column::Id.eq(existing.id))
        .filter(Column::LastEditedAt.eq(existing.last_edited_at))
        .exec(db)
        .await?;

    if res.rows_affected == 0 {
        return Ok(None);
    }

    let updated = Entity::find_by_id(existing.id)
        .one(db)
        .await?
        .ok_or_else(|| {
            ServiceError::NotFound(format!("attendance record {} no longer exists", existing.id))
        })?;
    Ok(Some(updated))
}

/// True when the error is the unique-index race on the record key; the caller
/// re-reads and resolves against the row that won.
pub(crate) fn is_unique_violation(err: &DbErr) -> bool {
    err.to_string().contains("UNIQUE constraint")
}

#[cfg(test)]
mod tests {
    use super::*;
    use db::models::{attendee, schedule_session};
    use db::test_utils::setup_test_db;
    use sea_orm::{ActiveModelTrait, Set};

    async fn seed(db: &DatabaseConnection) -> (attendee::Model, schedule_session::Model) {
        let now = Utc::now();
        let teacher = attendee::ActiveModel {
            display_name: Set("Pak Ahmad".into()),
            kind: Set(attendee::AttendeeKind::Teacher),
            class_id: Set(None),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();

        let student = attendee::ActiveModel {
            display_name: Set("Dewi".into()),
            kind: Set(attendee::AttendeeKind::Student),
            class_id: Set(Some(4)),
            created_at: Set(now),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();

        let session = schedule_session::ActiveModel {
            class_id: Set(4),
            teacher_id: Set(teacher.id),
            subject: Set("History".into()),
            session_date: Set(now.date_naive()),
            starts_at: Set(now),
            ends_at: Set(now + chrono::Duration::minutes(45)),
            ..Default::default()
        }
        .insert(db)
        .await
        .unwrap();

        (student, session)
    }

    #[tokio::test]
    async fn stale_snapshot_cannot_overwrite_a_newer_edit() {
        let db = setup_test_db().await;
        let (student, session) = seed(&db).await;
        let date = session.session_date;
        let t0 = Utc::now();

        insert_new(
            &db,
            student.id,
            session.id,
            date,
            CanonicalStatus::Present,
            None,
            RecordSource::Scan,
            t0,
        )
        .await
        .unwrap();

        // two callers read the same row before either writes
        let snap_a = find_current(&db, student.id, session.id, date)
            .await
            .unwrap()
            .unwrap();
        let snap_b = snap_a.clone();

        let won = supersede(
            &db,
            snap_a,
            CanonicalStatus::Sick,
            None,
            RecordSource::Manual,
            t0 + chrono::Duration::seconds(1),
        )
        .await
        .unwrap();
        assert!(won.is_some());

        let lost = supersede(
            &db,
            snap_b,
            CanonicalStatus::Excused,
            None,
            RecordSource::Manual,
            t0 + chrono::Duration::seconds(2),
        )
        .await
        .unwrap();
        assert!(lost.is_none());

        // the first write and its history entry both survive
        let current = find_current(&db, student.id, session.id, date)
            .await
            .unwrap()
            .unwrap();
        assert_eq!(current.status, CanonicalStatus::Sick);
        assert_eq!(current.history().len(), 1);
        assert_eq!(current.history()[0].status, CanonicalStatus::Present);
    }
}
