//! # API Error Types
//!
//! What the operator screen receives when a station operation fails.
//!
//! ## Error Flow
//! ```text
//! ValidationError ──► CoreError ──► DbError ──► ApiError { code, message }
//!   (fuelbook-core)                (fuelbook-db)      (this module)
//! ```
//!
//! Storage details are logged here and replaced by a generic message; rule
//! violations keep their message so the operator knows what to fix.

use serde::Serialize;
use thiserror::Error;

use fuelbook_core::{CoreError, ValidationError};
use fuelbook_db::DbError;

/// API error returned from station operations.
///
/// ## Serialization
/// ```json
/// {
///   "code": "EDIT_WINDOW_CLOSED",
///   "message": "Only the last closed shift can be edited: latest is shift 2 on 2025-05-01, ..."
/// }
/// ```
#[derive(Debug, Clone, Serialize, Error)]
#[serde(rename_all = "camelCase")]
#[error("[{code:?}] {message}")]
pub struct ApiError {
    /// Machine-readable error code for programmatic handling
    pub code: ErrorCode,

    /// Human-readable error message for display
    pub message: String,
}

/// Error codes for API responses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ErrorCode {
    /// Row, pump or shift does not exist
    NotFound,

    /// Input validation failed, or a duplicate key
    ValidationError,

    /// The stored row moved on; reload and retry
    Conflict,

    /// Edit requested outside the most recently closed shift
    EditWindowClosed,

    /// Database operation failed
    DatabaseError,

    /// Internal error
    Internal,
}

impl ApiError {
    /// Creates a new API error.
    pub fn new(code: ErrorCode, message: impl Into<String>) -> Self {
        ApiError {
            code,
            message: message.into(),
        }
    }

    /// Creates a not found error.
    pub fn not_found(resource: &str, id: &str) -> Self {
        ApiError::new(ErrorCode::NotFound, format!("{} not found: {}", resource, id))
    }

    /// Creates a validation error.
    pub fn validation(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::ValidationError, message)
    }

    /// Creates an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        ApiError::new(ErrorCode::Internal, message)
    }
}

/// Converts database errors to API errors.
impl From<DbError> for ApiError {
    fn from(err: DbError) -> Self {
        match err {
            DbError::NotFound { entity, id } => ApiError::not_found(&entity, &id),
            DbError::UniqueViolation { field, value } => ApiError::new(
                ErrorCode::ValidationError,
                format!("{} '{}' already exists", field, value),
            ),
            DbError::Conflict { .. } => ApiError::new(ErrorCode::Conflict, err.to_string()),
            DbError::Domain(core) => core.into(),
            DbError::Busy(e) => {
                tracing::warn!("Database busy: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database is busy, try again")
            }
            DbError::ConnectionFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database connection failed")
            }
            DbError::MigrationFailed(_) => {
                ApiError::new(ErrorCode::DatabaseError, "Database migration failed")
            }
            DbError::QueryFailed(e) => {
                // Log the actual error but return a generic message
                tracing::error!("Database query failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
            DbError::TransactionFailed(e) => {
                tracing::error!("Transaction failed: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database transaction failed")
            }
            DbError::ForeignKeyViolation { message } => {
                tracing::error!("Foreign key violation: {}", message);
                ApiError::new(ErrorCode::ValidationError, "Invalid reference")
            }
            DbError::PoolExhausted => {
                ApiError::new(ErrorCode::DatabaseError, "Database pool exhausted")
            }
            DbError::Internal(e) => {
                tracing::error!("Internal database error: {}", e);
                ApiError::new(ErrorCode::DatabaseError, "Database operation failed")
            }
        }
    }
}

/// Converts ledger rule errors to API errors.
impl From<CoreError> for ApiError {
    fn from(err: CoreError) -> Self {
        match err {
            CoreError::EditWindowClosed { .. }
            | CoreError::NoClosedShift
            | CoreError::EntryOutsideEditWindow { .. } => {
                ApiError::new(ErrorCode::EditWindowClosed, err.to_string())
            }
            CoreError::InvalidStatusTransition { .. } | CoreError::RowKeyChanged { .. } => {
                ApiError::new(ErrorCode::Conflict, err.to_string())
            }
            CoreError::Validation(e) => ApiError::validation(e.to_string()),
        }
    }
}

impl From<ValidationError> for ApiError {
    fn from(err: ValidationError) -> Self {
        ApiError::validation(err.to_string())
    }
}
