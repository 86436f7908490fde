//! Centralized error handling.
//!
//! Provides a unified error type for the entire application,
//! with automatic HTTP response conversion.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use sea_orm::{DbErr, SqlErr};
use serde::Serialize;
use thiserror::Error;

/// Application error types
#[derive(Error, Debug)]
pub enum AppError {
    // Authentication & Authorization
    #[error("Authentication required")]
    Unauthenticated,

    #[error("Access denied")]
    Forbidden,

    #[error("Invalid credentials")]
    InvalidCredentials,

    // Resource errors
    #[error("Resource not found")]
    NotFound,

    /// Unique constraint violated while creating or updating a row.
    #[error("Duplicate key: {0}")]
    DuplicateKey(String),

    /// Constraint violated when the store finalized the transaction.
    #[error("Conflict: {0}")]
    Conflict(String),

    // Validation
    #[error("{0}")]
    Validation(String),

    /// Unit-of-work misuse (finalizing twice, using a finished scope).
    #[error("Invalid state: {0}")]
    InvalidState(String),

    // Infrastructure errors
    #[error("Store unavailable: {0}")]
    Connection(String),

    #[error("Request deadline exceeded")]
    Timeout,

    #[error("Database error")]
    Database(DbErr),

    // Internal
    #[error("Internal server error")]
    Internal(String),
}

/// Error envelope returned to clients: `{error, code, details}`.
#[derive(Debug, Serialize)]
struct ErrorResponse {
    error: &'static str,
    code: u16,
    #[serde(skip_serializing_if = "Option::is_none")]
    details: Option<String>,
}

impl AppError {
    /// Short, stable title for the envelope's `error` field
    fn title(&self) -> &'static str {
        match self {
            AppError::Unauthenticated => "Unauthenticated",
            AppError::Forbidden => "Forbidden",
            AppError::InvalidCredentials => "Invalid email or password",
            AppError::NotFound => "Not found",
            AppError::DuplicateKey(_) => "Duplicate key",
            AppError::Conflict(_) => "Conflict",
            AppError::Validation(_) => "Validation failed",
            AppError::InvalidState(_) => "Invalid state",
            AppError::Connection(_) => "Service unavailable",
            AppError::Timeout => "Request timed out",
            AppError::Database(_) | AppError::Internal(_) => "Internal server error",
        }
    }

    /// Get HTTP status code
    pub fn status(&self) -> StatusCode {
        match self {
            AppError::Unauthenticated | AppError::InvalidCredentials => StatusCode::UNAUTHORIZED,
            AppError::Forbidden => StatusCode::FORBIDDEN,
            AppError::NotFound => StatusCode::NOT_FOUND,
            AppError::DuplicateKey(_) | AppError::Conflict(_) => StatusCode::CONFLICT,
            AppError::Validation(_) => StatusCode::BAD_REQUEST,
            AppError::Connection(_) => StatusCode::SERVICE_UNAVAILABLE,
            AppError::Timeout => StatusCode::GATEWAY_TIMEOUT,
            AppError::InvalidState(_) | AppError::Database(_) | AppError::Internal(_) => {
                StatusCode::INTERNAL_SERVER_ERROR
            }
        }
    }

    /// Get user-facing details (hides internal details)
    fn details(&self) -> Option<String> {
        match self {
            AppError::Validation(msg) => Some(msg.clone()),
            AppError::DuplicateKey(_) => Some("A record with the same unique value already exists".to_string()),
            AppError::Conflict(_) => Some("The operation conflicted with concurrent changes".to_string()),

            // Hide details for internal/security errors
            AppError::Connection(msg) => {
                tracing::error!("Store unavailable: {}", msg);
                None
            }
            AppError::InvalidState(msg) => {
                tracing::error!("Unit of work misuse: {}", msg);
                None
            }
            AppError::Database(e) => {
                tracing::error!("Database error: {:?}", e);
                None
            }
            AppError::Internal(msg) => {
                tracing::error!("Internal error: {}", msg);
                None
            }

            _ => None,
        }
    }

    /// Classify an error raised while committing a transaction.
    ///
    /// Constraint violations surfaced at commit time are conflicts with
    /// concurrent work, not duplicate-key errors of a single statement.
    pub fn from_commit(err: DbErr) -> Self {
        let constraint = err.sql_err();
        Self::commit_failure(err, constraint)
    }

    fn commit_failure(err: DbErr, constraint: Option<SqlErr>) -> Self {
        match Self::classify(err, constraint) {
            AppError::DuplicateKey(detail) => AppError::Conflict(detail),
            other => other,
        }
    }

    /// Map a driver error, given the constraint it violated if any.
    fn classify(err: DbErr, constraint: Option<SqlErr>) -> Self {
        match constraint {
            Some(SqlErr::UniqueConstraintViolation(detail)) => AppError::DuplicateKey(detail),
            Some(SqlErr::ForeignKeyConstraintViolation(detail)) => AppError::Conflict(detail),
            _ => match err {
                DbErr::Conn(_) | DbErr::ConnectionAcquire(_) => AppError::Connection(err.to_string()),
                DbErr::RecordNotFound(_) => AppError::NotFound,
                other => AppError::Database(other),
            },
        }
    }
}

impl From<DbErr> for AppError {
    fn from(err: DbErr) -> Self {
        let constraint = err.sql_err();
        Self::classify(err, constraint)
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ErrorResponse {
            error: self.title(),
            code: status.as_u16(),
            details: self.details(),
        };

        (status, Json(body)).into_response()
    }
}

/// Result type alias
pub type AppResult<T> = Result<T, AppError>;

/// Extension trait for Option -> AppError conversion
pub trait OptionExt<T> {
    fn ok_or_not_found(self) -> AppResult<T>;
}

impl<T> OptionExt<T> for Option<T> {
    fn ok_or_not_found(self) -> AppResult<T> {
        self.ok_or(AppError::NotFound)
    }
}

/// Convenience constructors
impl AppError {
    pub fn validation(msg: impl Into<String>) -> Self {
        AppError::Validation(msg.into())
    }

    pub fn duplicate(what: impl Into<String>) -> Self {
        AppError::DuplicateKey(what.into())
    }

    pub fn conflict(what: impl Into<String>) -> Self {
        AppError::Conflict(what.into())
    }

    pub fn connection(msg: impl Into<String>) -> Self {
        AppError::Connection(msg.into())
    }

    pub fn invalid_state(msg: impl Into<String>) -> Self {
        AppError::InvalidState(msg.into())
    }

    pub fn internal(msg: impl Into<String>) -> Self {
        AppError::Internal(msg.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_codes() {
        assert_eq!(AppError::Unauthenticated.status(), StatusCode::UNAUTHORIZED);
        assert_eq!(AppError::Forbidden.status(), StatusCode::FORBIDDEN);
        assert_eq!(AppError::NotFound.status(), StatusCode::NOT_FOUND);
        assert_eq!(AppError::duplicate("email").status(), StatusCode::CONFLICT);
        assert_eq!(AppError::conflict("fk").status(), StatusCode::CONFLICT);
        assert_eq!(AppError::connection("down").status(), StatusCode::SERVICE_UNAVAILABLE);
        assert_eq!(AppError::Timeout.status(), StatusCode::GATEWAY_TIMEOUT);
        assert_eq!(
            AppError::invalid_state("committed").status(),
            StatusCode::INTERNAL_SERVER_ERROR
        );
    }

    #[test]
    fn test_db_connection_errors_are_classified() {
        let err = AppError::from(DbErr::Conn(sea_orm::RuntimeErr::Internal(
            "connection refused".to_string(),
        )));
        assert!(matches!(err, AppError::Connection(_)));
    }

    #[test]
    fn test_unique_violation_is_duplicate_per_statement_but_conflict_at_commit() {
        let violation = || Some(SqlErr::UniqueConstraintViolation("account_email_key".to_string()));

        let statement = AppError::classify(DbErr::Custom("insert".to_string()), violation());
        assert!(matches!(statement, AppError::DuplicateKey(_)));

        let commit = AppError::commit_failure(DbErr::Custom("commit".to_string()), violation());
        assert!(matches!(commit, AppError::Conflict(ref d) if d == "account_email_key"));
    }

    #[test]
    fn test_foreign_key_violation_is_conflict() {
        let err = AppError::classify(
            DbErr::Custom("insert".to_string()),
            Some(SqlErr::ForeignKeyConstraintViolation("fk_order_account".to_string())),
        );
        assert!(matches!(err, AppError::Conflict(_)));
    }

    #[test]
    fn test_commit_keeps_non_constraint_errors() {
        let err = AppError::from_commit(DbErr::Custom("boom".to_string()));
        assert!(matches!(err, AppError::Database(_)));
    }

    #[test]
    fn test_internal_details_are_hidden() {
        assert!(AppError::internal("secret").details().is_none());
        assert_eq!(
            AppError::validation("name is required").details().as_deref(),
            Some("name is required")
        );
    }
}
