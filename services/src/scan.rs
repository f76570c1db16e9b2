//! Scan Intake Handler.
//!
//! Turns a validated QR scan event into an at-most-once attendance record.
//! Retries are safe: a repeat scan for the same key returns the existing
//! record unchanged. A scan never silently overwrites a manual entry; that
//! clash is a Conflict unless the caller passes an explicit force flag.

use chrono::{DateTime, Duration, Utc};
use db::models::attendance_record::{CanonicalStatus, Model as AttendanceRecord, RecordSource};
use sea_orm::DatabaseConnection;
use util::config;

use crate::error::ServiceError;
use crate::records;
use crate::roster::RosterDirectory;
use crate::token::TokenService;

#[derive(Debug, Clone)]
pub struct ScanRequest {
    pub token_secret: String,
    pub device_id: String,
    pub attendee_id: i64,
    /// Client clock; the server clock is authoritative when absent.
    pub timestamp: Option<DateTime<Utc>>,
    /// Allows a scan to supersede an existing manual record.
    pub force: bool,
}

/// Outcome of a scan: the current record plus whether this scan created it.
#[derive(Debug, Clone)]
pub struct ScanOutcome {
    pub record: AttendanceRecord,
    pub created: bool,
}

pub struct ScanIntake;

impl ScanIntake {
    pub async fn handle_scan(
        db: &DatabaseConnection,
        roster: &dyn RosterDirectory,
        req: ScanRequest,
    ) -> Result<ScanOutcome, ServiceError> {
        if req.device_id.trim().is_empty() {
            return Err(ServiceError::Validation("device_id must not be empty".into()));
        }

        let session_id = TokenService::validate(db, &req.token_secret).await?;
        let session = roster
            .get_session(session_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("schedule session {session_id} not found")))?;

        roster
            .get_attendee(req.attendee_id)
            .await?
            .ok_or_else(|| ServiceError::NotFound(format!("attendee {} not found", req.attendee_id)))?;

        if !roster.is_enrolled(req.attendee_id, session.class_id).await? {
            return Err(ServiceError::AttendeeNotEnrolled {
                attendee_id: req.attendee_id,
                session_id,
            });
        }

        let scanned_at = req.timestamp.unwrap_or_else(Utc::now);
        let status = Self::classify(scanned_at, session.starts_at);

        let now = Utc::now();
        let date = session.session_date;

        if let Some(existing) =
            records::find_current(db, req.attendee_id, session_id, date).await?
        {
            return Self::resolve_existing(db, existing, status, req.force, now).await;
        }

        match records::insert_new(
            db,
            req.attendee_id,
            session_id,
            date,
            status,
            None,
            RecordSource::Scan,
            now,
        )
        .await
        {
            Ok(record) => {
                tracing::info!(
                    attendee_id = req.attendee_id,
                    session_id,
                    device_id = %req.device_id,
                    status = %record.status,
                    "scan recorded"
                );
                Ok(ScanOutcome { record, created: true })
            }
            // Lost the insert race on the unique key; resolve against the row
            // that won, exactly as if it had been found up front.
            Err(err) if records::is_unique_violation(&err) => {
                let existing = records::find_current(db, req.attendee_id, session_id, date)
                    .await?
                    .ok_or(ServiceError::Database(err))?;
                Self::resolve_existing(db, existing, status, req.force, now).await
            }
            Err(err) => Err(err.into()),
        }
    }

    /// On time within the configured grace period is Present, anything later
    /// is Late. Scans before the session starts count as Present.
    fn classify(scanned_at: DateTime<Utc>, starts_at: DateTime<Utc>) -> CanonicalStatus {
        let grace = Duration::minutes(config::scan_grace_minutes());
        if scanned_at <= starts_at + grace {
            CanonicalStatus::Present
        } else {
            CanonicalStatus::Late
        }
    }

    async fn resolve_existing(
        db: &DatabaseConnection,
        existing: AttendanceRecord,
        status: CanonicalStatus,
        force: bool,
        now: DateTime<Utc>,
    ) -> Result<ScanOutcome, ServiceError> {
        let (attendee_id, session_id, date) =
            (existing.attendee_id, existing.session_id, existing.record_date);
        let mut current = existing;
        loop {
            match current.source {
                // Idempotent retry: same key, scan-sourced, nothing changes.
                RecordSource::Scan => {
                    return Ok(ScanOutcome {
                        record: current,
                        created: false,
                    });
                }
                RecordSource::Manual if !force => {
                    return Err(ServiceError::Conflict(format!(
                        "a manual record already exists for attendee {attendee_id} in session {session_id}; pass force to supersede"
                    )));
                }
                RecordSource::Manual => {
                    // A lost conditional write means another edit landed; the
                    // fresh row decides whether force still applies.
                    match records::supersede(db, current, status, None, RecordSource::Scan, now)
                        .await?
                    {
                        Some(record) => {
                            tracing::warn!(
                                attendee_id = record.attendee_id,
                                session_id = record.session_id,
                                "forced scan superseded a manual record"
                            );
                            return Ok(ScanOutcome {
                                record,
                                created: false,
                            });
                        }
                        None => {
                            current = records::find_current(db, attendee_id, session_id, date)
                                .await?
                                .ok_or_else(|| {
                                    ServiceError::NotFound(format!(
                                        "attendance record for attendee {attendee_id} in session {session_id} no longer exists"
                                    ))
                                })?;
                        }
                    }
                }
            }
        }
    }
}
