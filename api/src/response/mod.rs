use axum::{Json, http::StatusCode};
use serde::Serialize;
use services::ServiceError;

/// Standardized API response wrapper for all outgoing JSON responses.
///
/// ```json
/// {
///   "success": true,
///   "data": { ... },
///   "message": "Some message"
/// }
/// ```
///
/// Error responses additionally carry a stable machine-readable kind so
/// callers can branch without parsing the human text:
///
/// ```json
/// {
///   "success": false,
///   "data": {},
///   "message": "attendance token has been revoked",
///   "error_kind": "Revoked"
/// }
/// ```
#[derive(Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub success: bool,
    pub data: T,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error_kind: Option<String>,
}

impl<T> ApiResponse<T>
where
    T: Serialize,
{
    /// Constructs a success response with the given data and message.
    pub fn success(data: T, message: impl Into<String>) -> Self {
        Self {
            success: true,
            data,
            message: message.into(),
            error_kind: None,
        }
    }

    /// Constructs an error response with a message and default `data`.
    pub fn error(message: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self {
            success: false,
            data: T::default(),
            message: message.into(),
            error_kind: None,
        }
    }

    /// Constructs an error response carrying a machine-readable kind.
    pub fn error_kind(kind: impl Into<String>, message: impl Into<String>) -> Self
    where
        T: Default,
    {
        Self {
            success: false,
            data: T::default(),
            message: message.into(),
            error_kind: Some(kind.into()),
        }
    }
}

/// Maps a core error onto an HTTP status and the wrapped error body.
///
/// The status mapping is a thin presentation concern; the error kind is what
/// clients should branch on.
pub fn error_response<T>(err: &ServiceError) -> (StatusCode, Json<ApiResponse<T>>)
where
    T: Serialize + Default,
{
    let status = match err {
        ServiceError::Validation(_) => StatusCode::BAD_REQUEST,
        ServiceError::NotFound(_) => StatusCode::NOT_FOUND,
        ServiceError::Expired | ServiceError::Revoked => StatusCode::GONE,
        ServiceError::Conflict(_) => StatusCode::CONFLICT,
        ServiceError::UnknownStatusCode { .. } | ServiceError::UnsupportedStatus { .. } => {
            StatusCode::UNPROCESSABLE_ENTITY
        }
        ServiceError::AttendeeNotEnrolled { .. } => StatusCode::FORBIDDEN,
        ServiceError::Database(_) => StatusCode::INTERNAL_SERVER_ERROR,
    };

    if status == StatusCode::INTERNAL_SERVER_ERROR {
        tracing::error!(error = %err, "internal error");
    }

    (
        status,
        Json(ApiResponse::error_kind(err.kind(), err.to_string())),
    )
}
