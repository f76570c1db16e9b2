use db::models::attendance_record::CanonicalStatus;
use sea_orm::DbErr;
use thiserror::Error;

use crate::status::SourceSystem;

/// Failure taxonomy for the attendance core.
///
/// Every variant carries a stable machine-readable kind (see [`ServiceError::kind`])
/// that transports serialise alongside the human-readable message. Ambiguity is
/// never coerced into a default status; it always surfaces as one of these.
#[derive(Debug, Error)]
pub enum ServiceError {
    /// Malformed or out-of-range input.
    #[error("{0}")]
    Validation(String),

    /// Unknown token, session or attendee.
    #[error("{0}")]
    NotFound(String),

    /// The presented token is past its expiry.
    #[error("attendance token has expired")]
    Expired,

    /// The presented token has been revoked.
    #[error("attendance token has been revoked")]
    Revoked,

    /// A write clashed with an existing record it may not supersede.
    #[error("{0}")]
    Conflict(String),

    /// An inbound status code not present in the source system's table.
    #[error("unknown status code '{code}' for system '{system}'")]
    UnknownStatusCode { system: SourceSystem, code: String },

    /// A canonical status with no encoding in the target system.
    #[error("status '{status}' has no encoding in system '{system}'")]
    UnsupportedStatus {
        system: SourceSystem,
        status: CanonicalStatus,
    },

    /// The attendee is not on the session's class roster.
    #[error("attendee {attendee_id} is not enrolled for session {session_id}")]
    AttendeeNotEnrolled { attendee_id: i64, session_id: i64 },

    /// Backing store failure.
    #[error("database error: {0}")]
    Database(#[from] DbErr),
}

impl ServiceError {
    /// Stable machine-readable error kind, independent of the display text.
    pub fn kind(&self) -> &'static str {
        match self {
            ServiceError::Validation(_) => "Validation",
            ServiceError::NotFound(_) => "NotFound",
            ServiceError::Expired => "Expired",
            ServiceError::Revoked => "Revoked",
            ServiceError::Conflict(_) => "Conflict",
            ServiceError::UnknownStatusCode { .. } => "UnknownStatusCode",
            ServiceError::UnsupportedStatus { .. } => "UnsupportedStatus",
            ServiceError::AttendeeNotEnrolled { .. } => "AttendeeNotEnrolled",
            ServiceError::Database(_) => "Database",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // clients branch on these strings; they may not drift
    #[test]
    fn kinds_are_stable() {
        assert_eq!(ServiceError::Expired.kind(), "Expired");
        assert_eq!(ServiceError::Revoked.kind(), "Revoked");
        assert_eq!(
            ServiceError::Database(DbErr::Custom("boom".into())).kind(),
            "Database"
        );
    }
}
