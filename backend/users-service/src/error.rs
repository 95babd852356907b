/// Error types for Users Service
///
/// Errors are converted to the HTTP responses described by the error
/// taxonomy: Validation/Conflict/NotFound/Cancelled/Transient/Internal.
use actix_web::{error::ResponseError, http::StatusCode, HttpResponse};
use std::fmt;
use uuid::Uuid;

pub type AppResult<T> = std::result::Result<T, AppError>;

#[derive(Debug)]
pub enum AppError {
    /// Caller-side shape problem; never retried.
    Validation(String),
    /// Uniqueness violation (duplicate email).
    Conflict(String),
    /// Absent aggregate.
    NotFound(String),
    /// Caller disconnected or shutdown requested.
    Cancelled,
    /// Database contention, bus unavailability, peer 5xx/timeout.
    Transient(String),
    /// Unexpected; carries a trace id so it can be correlated in logs.
    Internal(String),
}

impl AppError {
    fn trace_id() -> String {
        Uuid::new_v4().to_string()
    }
}

impl fmt::Display for AppError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AppError::Validation(msg) => write!(f, "Validation error: {}", msg),
            AppError::Conflict(msg) => write!(f, "Conflict: {}", msg),
            AppError::NotFound(msg) => write!(f, "Not found: {}", msg),
            AppError::Cancelled => write!(f, "Request cancelled"),
            AppError::Transient(msg) => write!(f, "Transient failure: {}", msg),
            AppError::Internal(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl ResponseError for AppError {
    fn status_code(&self) -> StatusCode {
        match self {
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            // 499 has no named actix_web StatusCode constant.
            AppError::Cancelled => StatusCode::from_u16(499).unwrap(),
            AppError::Transient(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        let status = self.status_code();

        let body = match self {
            AppError::Internal(_) => serde_json::json!({
                "error": self.to_string(),
                "status": status.as_u16(),
                "trace_id": Self::trace_id(),
            }),
            _ => serde_json::json!({
                "error": self.to_string(),
                "status": status.as_u16(),
            }),
        };

        HttpResponse::build(status).json(body)
    }
}

impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        match &err {
            sqlx::Error::RowNotFound => AppError::NotFound("row not found".to_string()),
            sqlx::Error::Database(db_err) if db_err.code().as_deref() == Some("23505") => {
                AppError::Conflict("duplicate key".to_string())
            }
            sqlx::Error::PoolTimedOut | sqlx::Error::Io(_) => {
                AppError::Transient(err.to_string())
            }
            _ => AppError::Internal(err.to_string()),
        }
    }
}

impl From<transactional_outbox::OutboxError> for AppError {
    fn from(err: transactional_outbox::OutboxError) -> Self {
        AppError::Internal(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::Validation(err.to_string())
    }
}

impl From<serde_json::Error> for AppError {
    fn from(err: serde_json::Error) -> Self {
        AppError::Internal(err.to_string())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn cancelled_maps_to_status_499() {
        assert_eq!(AppError::Cancelled.status_code().as_u16(), 499);
    }

    #[test]
    fn conflict_maps_to_409() {
        assert_eq!(
            AppError::Conflict("dup".into()).status_code(),
            StatusCode::CONFLICT
        );
    }

    #[test]
    fn duplicate_key_db_error_becomes_conflict() {
        // sqlx::Error::Database variants aren't constructible outside the crate
        // in tests; this documents the intended mapping via the Display text.
        let err = AppError::Conflict("duplicate key".to_string());
        assert!(err.to_string().contains("Conflict"));
    }
}
