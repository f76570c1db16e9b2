//! Manual Attendance Recorder.
//!
//! Staff-entered overrides. A manual write always supersedes the current
//! record for its key, whatever its source; the status code is validated
//! through the taxonomy mapper before anything reaches storage. Bulk entry
//! processes items independently: one bad item never blocks or rolls back the
//! rest.

use chrono::{NaiveDate, Utc};
use db::models::attendance_record::{Model as AttendanceRecord, RecordSource};
use futures::StreamExt;
use sea_orm::DatabaseConnection;
use util::config;

use crate::error::ServiceError;
use crate::records;
use crate::roster::RosterDirectory;
use crate::status::{self, SourceSystem};

#[derive(Debug, Clone)]
pub struct ManualEntry {
    pub attendee_id: i64,
    pub session_id: i64,
    /// Defaults to the session's scheduled date.
    pub date: Option<NaiveDate>,
    /// External status code, interpreted against `system`'s table.
    pub status_code: String,
    pub system: SourceSystem,
    pub reason: Option<String>,
}

/// Per-item outcome of a bulk write, in input order.
pub type BulkOutcome = Vec<Result<AttendanceRecord, ServiceError>>;

pub struct ManualRecorder;

impl ManualRecorder {
    pub async fn record_one(
        db: &DatabaseConnection,
        roster: &dyn RosterDirectory,
        entry: ManualEntry,
    ) -> Result<AttendanceRecord, ServiceError> {
        // Status validation comes first so nothing invalid reaches storage.
        let status = status::to_canonical(
            &entry.status_code,
            entry.system,
            config::unknown_status_policy(),
        )?;

        roster
            .get_attendee(entry.attendee_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("attendee {} not found", entry.attendee_id))
            })?;
        let session = roster
            .get_session(entry.session_id)
            .await?
            .ok_or_else(|| {
                ServiceError::NotFound(format!("schedule session {} not found", entry.session_id))
            })?;

        let date = entry.date.unwrap_or(session.session_date);
        let now = Utc::now();

        // A manual entry supersedes any current record, scan or manual. Both
        // the insert and the supersede are conditional writes; losing either
        // race means another edit committed first, so re-read and go again.
        let record = loop {
            match records::find_current(db, entry.attendee_id, entry.session_id, date).await? {
                Some(current) => {
                    if let Some(updated) = records::supersede(
                        db,
                        current,
                        status,
                        entry.reason.clone(),
                        RecordSource::Manual,
                        now,
                    )
                    .await?
                    {
                        break updated;
                    }
                }
                None => match records::insert_new(
                    db,
                    entry.attendee_id,
                    entry.session_id,
                    date,
                    status,
                    entry.reason.clone(),
                    RecordSource::Manual,
                    now,
                )
                .await
                {
                    Ok(record) => break record,
                    Err(err) if records::is_unique_violation(&err) => {}
                    Err(err) => return Err(err.into()),
                },
            }
        };

        tracing::info!(
            attendee_id = record.attendee_id,
            session_id = record.session_id,
            status = %record.status,
            "manual attendance recorded"
        );
        Ok(record)
    }

    /// Writes every item independently through a bounded worker pool.
    ///
    /// The outcome list matches the input order. Partial completion is a
    /// normal, reported result; there is no rollback.
    pub async fn record_bulk(
        db: &DatabaseConnection,
        roster: &dyn RosterDirectory,
        entries: Vec<ManualEntry>,
    ) -> BulkOutcome {
        let workers = config::bulk_workers();
        futures::stream::iter(
            entries
                .into_iter()
                .map(|entry| Self::record_one(db, roster, entry)),
        )
        .buffered(workers)
        .collect()
        .await
    }
}
