//! Error types for the Calliope server

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;
use thiserror::Error;

/// Application error codes exposed to API clients
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u32)]
pub enum ErrorCode {
    Failure = 1,
    NotAuthorized = 2,
    DbFailure = 3,
    NoSuchData = 4,
    PermissionDenied = 5,
    LimitExceeded = 6,
    NoCopyAvailable = 7,
    ReservationConflict = 8,
    ConcurrentConflict = 9,
    AlreadyQueued = 10,
    CopyAvailable = 11,
    DuplicateFine = 12,
    InvalidTransition = 13,
}

/// Main application error type
///
/// Business-rule violations each get their own variant so callers can react
/// per kind; only `ConcurrentConflict` is worth retrying, every other kind
/// is terminal for the request.
#[derive(Error, Debug)]
pub enum AppError {
    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Permission denied: {0}")]
    PermissionDenied(String),

    #[error("Limit exceeded: {0}")]
    LimitExceeded(String),

    #[error("No copy available: {0}")]
    NoCopyAvailable(String),

    #[error("Reservation conflict: {0}")]
    ReservationConflict(String),

    #[error("Concurrent conflict: {0}")]
    ConcurrentConflict(String),

    #[error("Already queued: {0}")]
    AlreadyQueued(String),

    #[error("Copy available: {0}")]
    CopyAvailable(String),

    #[error("Duplicate fine: {0}")]
    DuplicateFine(String),

    #[error("Invalid transition: {0}")]
    InvalidTransition(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Internal server error: {0}")]
    Internal(String),
}

/// Error response body
#[derive(Serialize, utoipa::ToSchema)]
pub struct ErrorResponse {
    pub code: u32,
    pub error: String,
    pub message: String,
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code, message) = match &self {
            AppError::Authentication(msg) => {
                (StatusCode::UNAUTHORIZED, ErrorCode::NotAuthorized, msg.clone())
            }
            AppError::NotFound(msg) => {
                (StatusCode::NOT_FOUND, ErrorCode::NoSuchData, msg.clone())
            }
            AppError::PermissionDenied(msg) => {
                (StatusCode::FORBIDDEN, ErrorCode::PermissionDenied, msg.clone())
            }
            AppError::LimitExceeded(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::LimitExceeded, msg.clone())
            }
            AppError::NoCopyAvailable(msg) => {
                (StatusCode::CONFLICT, ErrorCode::NoCopyAvailable, msg.clone())
            }
            AppError::ReservationConflict(msg) => {
                (StatusCode::CONFLICT, ErrorCode::ReservationConflict, msg.clone())
            }
            AppError::ConcurrentConflict(msg) => {
                (StatusCode::CONFLICT, ErrorCode::ConcurrentConflict, msg.clone())
            }
            AppError::AlreadyQueued(msg) => {
                (StatusCode::CONFLICT, ErrorCode::AlreadyQueued, msg.clone())
            }
            AppError::CopyAvailable(msg) => {
                (StatusCode::CONFLICT, ErrorCode::CopyAvailable, msg.clone())
            }
            AppError::DuplicateFine(msg) => {
                (StatusCode::CONFLICT, ErrorCode::DuplicateFine, msg.clone())
            }
            AppError::InvalidTransition(msg) => {
                (StatusCode::UNPROCESSABLE_ENTITY, ErrorCode::InvalidTransition, msg.clone())
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::DbFailure,
                    "Database error".to_string(),
                )
            }
            AppError::BadRequest(msg) => {
                (StatusCode::BAD_REQUEST, ErrorCode::Failure, msg.clone())
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    ErrorCode::Failure,
                    "Internal server error".to_string(),
                )
            }
        };

        let body = Json(ErrorResponse {
            code: code as u32,
            error: format!("{:?}", code),
            message,
        });

        (status, body).into_response()
    }
}

/// Result type alias for application operations
pub type AppResult<T> = Result<T, AppError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn conflict_kinds_map_to_409() {
        for err in [
            AppError::NoCopyAvailable("x".into()),
            AppError::ReservationConflict("x".into()),
            AppError::ConcurrentConflict("x".into()),
            AppError::AlreadyQueued("x".into()),
            AppError::CopyAvailable("x".into()),
            AppError::DuplicateFine("x".into()),
        ] {
            assert_eq!(err.into_response().status(), StatusCode::CONFLICT);
        }
    }

    #[test]
    fn business_rule_kinds_map_to_422() {
        for err in [
            AppError::LimitExceeded("x".into()),
            AppError::InvalidTransition("x".into()),
        ] {
            assert_eq!(err.into_response().status(), StatusCode::UNPROCESSABLE_ENTITY);
        }
    }

    #[test]
    fn not_found_maps_to_404() {
        let err = AppError::NotFound("loan 12".into());
        assert_eq!(err.into_response().status(), StatusCode::NOT_FOUND);
    }
}
