//! # Error Types
//!
//! Domain-specific error types for fuelbook-core.
//!
//! ## Error Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Error Types                                     │
//! │                                                                         │
//! │  fuelbook-core errors (this file)                                      │
//! │  ├── CoreError        - Ledger rule violations                         │
//! │  └── ValidationError  - Input validation failures                      │
//! │                                                                         │
//! │  fuelbook-db errors (separate crate)                                   │
//! │  └── DbError          - Storage and transaction failures               │
//! │                                                                         │
//! │  Station errors (in app)                                               │
//! │  └── ApiError         - What the operator screen sees (serialized)     │
//! │                                                                         │
//! │  Flow: ValidationError → CoreError → DbError → ApiError → Operator     │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use thiserror::Error;

use crate::shift::Shift;
use crate::types::ReadingStatus;

// =============================================================================
// Core Error
// =============================================================================

/// Ledger rule violations.
#[derive(Debug, Error)]
pub enum CoreError {
    /// There is no closed shift at all, so there is nothing to reopen.
    #[error("There are no closed shifts to edit")]
    NoClosedShift,

    /// Only the most recently closed shift may be reopened, and only from
    /// the matching operator session.
    ///
    /// ## When This Occurs
    /// ```text
    /// Latest closed: shift 2 on 2025-05-01
    /// Operator session: shift 1 on 2025-05-01
    ///      │
    ///      ▼
    /// EditWindowClosed { latest: 2025-05-01 #2, requested: 2025-05-01 #1 }
    /// ```
    #[error(
        "Only the last closed shift can be edited: latest is shift {latest_shift} on {latest_date}, \
         session is shift {requested_shift} on {requested_date}"
    )]
    EditWindowClosed {
        latest_date: NaiveDate,
        latest_shift: Shift,
        requested_date: NaiveDate,
        requested_shift: Shift,
    },

    /// An edit-mode write touched a row outside the permitted shift.
    #[error("Entry for pump {pump_code} (shift {shift} on {reading_date}) is outside the edit window")]
    EntryOutsideEditWindow {
        pump_code: String,
        shift: Shift,
        reading_date: NaiveDate,
    },

    /// An edit tried to move a stored row to another pump, shift or date.
    #[error("Reading {id} belongs to pump {pump_code}; an edit cannot change its pump, shift or date")]
    RowKeyChanged { id: i64, pump_code: String },

    /// The requested status change is not in the transition table.
    #[error("Reading for pump {pump_code} cannot move from {from} to {to}")]
    InvalidStatusTransition {
        pump_code: String,
        from: ReadingStatus,
        to: ReadingStatus,
    },

    /// Validation error (wraps ValidationError).
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),
}

// =============================================================================
// Validation Error
// =============================================================================

/// Input validation errors.
///
/// Raised before any storage access.
#[derive(Debug, Error)]
pub enum ValidationError {
    /// A required field is missing or empty.
    #[error("{field} is required")]
    Required { field: String },

    /// Field value is too long.
    #[error("{field} must be at most {max} characters")]
    TooLong { field: String, max: usize },

    /// Numeric value is out of range.
    #[error("{field} must be between {min} and {max}")]
    OutOfRange { field: String, min: i64, max: i64 },

    /// Invalid format (e.g., unparseable reading or date).
    #[error("{field} has invalid format: {reason}")]
    InvalidFormat { field: String, reason: String },

    /// Value is not in allowed set.
    #[error("{field} must be one of: {allowed:?}")]
    NotAllowed { field: String, allowed: Vec<String> },

    /// Duplicate value inside a single request (e.g., the same pump twice).
    #[error("{field} '{value}' appears more than once")]
    Duplicate { field: String, value: String },
}

impl ValidationError {
    /// Shorthand for a missing required field.
    pub fn required(field: impl Into<String>) -> Self {
        ValidationError::Required {
            field: field.into(),
        }
    }
}

// =============================================================================
// Result Type Alias
// =============================================================================

/// Convenience type alias for Results with CoreError.
pub type CoreResult<T> = Result<T, CoreError>;

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_edit_window_message() {
        let err = CoreError::EditWindowClosed {
            latest_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            latest_shift: Shift::Night,
            requested_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            requested_shift: Shift::Day,
        };
        assert_eq!(
            err.to_string(),
            "Only the last closed shift can be edited: latest is shift 2 on 2025-05-01, \
             session is shift 1 on 2025-05-01"
        );
    }

    #[test]
    fn test_validation_error_messages() {
        assert_eq!(
            ValidationError::required("pump_code").to_string(),
            "pump_code is required"
        );

        let err = ValidationError::Duplicate {
            field: "pump_code".to_string(),
            value: "P1".to_string(),
        };
        assert_eq!(err.to_string(), "pump_code 'P1' appears more than once");
    }

    #[test]
    fn test_validation_converts_to_core_error() {
        let core_err: CoreError = ValidationError::required("shift").into();
        assert!(matches!(core_err, CoreError::Validation(_)));
    }
}
