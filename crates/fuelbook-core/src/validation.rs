//! # Validation Module
//!
//! Input checks run before any storage access.
//!
//! ## Validation Layers
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Layer 1: Operator screen (field masks)                                │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 2: THIS MODULE                                                  │
//! │  ├── codes and names present and bounded                               │
//! │  ├── meter values within the meter's range                             │
//! │  ├── a closed row carries a closing reading                            │
//! │  └── one entry per pump per request                                    │
//! │           │                                                             │
//! │           ▼                                                             │
//! │  Layer 3: SQLite (NOT NULL, UNIQUE(pump_code, shift, reading_date))    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use fuelbook_core::validation::{validate_pump_code, validate_meter_reading};
//! use fuelbook_core::Litres;
//!
//! assert!(validate_pump_code("P1").is_ok());
//! assert!(validate_meter_reading("closing_reading", Litres::from_whole(-1)).is_err());
//! ```

use std::collections::HashSet;

use crate::error::ValidationError;
use crate::litres::Litres;
use crate::types::{Bill, NewPumpConfig, ReadingEntry, ReadingStatus, SeedReading};
use crate::{MAX_BATCH_ENTRIES, MAX_CODE_LEN, MAX_METER_LITRES, MAX_NAME_LEN};

/// Result type for validation operations.
pub type ValidationResult<T> = Result<T, ValidationError>;

// =============================================================================
// Field Validators
// =============================================================================

fn validate_text(field: &str, value: &str, max: usize) -> ValidationResult<()> {
    let value = value.trim();
    if value.is_empty() {
        return Err(ValidationError::required(field));
    }
    if value.chars().count() > max {
        return Err(ValidationError::TooLong {
            field: field.to_string(),
            max,
        });
    }
    Ok(())
}

/// Validates a pump code.
///
/// ## Rules
/// - Not empty, at most `MAX_CODE_LEN` characters
/// - Letters, digits, hyphen and underscore only
pub fn validate_pump_code(code: &str) -> ValidationResult<()> {
    validate_text("pump_code", code, MAX_CODE_LEN)?;

    if !code
        .trim()
        .chars()
        .all(|c| c.is_alphanumeric() || c == '-' || c == '_')
    {
        return Err(ValidationError::InvalidFormat {
            field: "pump_code".to_string(),
            reason: "must contain only letters, numbers, hyphens, and underscores".to_string(),
        });
    }

    Ok(())
}

pub fn validate_product_code(code: &str) -> ValidationResult<()> {
    validate_text("product_code", code, MAX_CODE_LEN)
}

pub fn validate_product_name(name: &str) -> ValidationResult<()> {
    validate_text("product_name", name, MAX_NAME_LEN)
}

/// Meter values are never negative and never exceed the meter's range.
pub fn validate_meter_reading(field: &str, value: Litres) -> ValidationResult<()> {
    if value.is_negative() || value.whole() > MAX_METER_LITRES {
        return Err(ValidationError::OutOfRange {
            field: field.to_string(),
            min: 0,
            max: MAX_METER_LITRES,
        });
    }
    Ok(())
}

// =============================================================================
// Request Validators
// =============================================================================

pub fn validate_new_pump_config(config: &NewPumpConfig) -> ValidationResult<()> {
    validate_pump_code(&config.pump_code)?;
    validate_product_code(&config.product_code)?;
    validate_product_name(&config.product_name)
}

/// Validates one shift-sheet row.
///
/// A row can only be closed once its closing reading has been entered.
pub fn validate_reading_entry(entry: &ReadingEntry) -> ValidationResult<()> {
    validate_pump_code(&entry.pump_code)?;
    validate_product_code(&entry.product_code)?;
    validate_product_name(&entry.product_name)?;
    validate_meter_reading("opening_reading", entry.opening_reading)?;
    validate_meter_reading("closing_reading", entry.closing_reading)?;
    if entry.status == ReadingStatus::Closed && entry.closing_reading.is_zero() {
        return Err(ValidationError::required("closing_reading"));
    }
    Ok(())
}

pub fn validate_seed_reading(seed: &SeedReading) -> ValidationResult<()> {
    validate_pump_code(&seed.pump_code)?;
    validate_product_code(&seed.product_code)?;
    validate_product_name(&seed.product_name)?;
    validate_meter_reading("opening_reading", seed.opening_reading)
}

/// Validates a batch: non-empty, bounded, and at most one entry per
/// `(pump_code, shift, reading_date)`.
pub fn validate_reading_batch(entries: &[ReadingEntry]) -> ValidationResult<()> {
    if entries.is_empty() {
        return Err(ValidationError::required("entries"));
    }
    if entries.len() > MAX_BATCH_ENTRIES {
        return Err(ValidationError::OutOfRange {
            field: "entries".to_string(),
            min: 1,
            max: MAX_BATCH_ENTRIES as i64,
        });
    }

    let mut seen = HashSet::with_capacity(entries.len());
    for entry in entries {
        validate_reading_entry(entry)?;
        if !seen.insert((entry.pump_code.trim(), entry.shift, entry.reading_date)) {
            return Err(ValidationError::Duplicate {
                field: "pump_code".to_string(),
                value: entry.pump_code.trim().to_string(),
            });
        }
    }
    Ok(())
}

/// Validates a list of pump codes for a bulk close.
pub fn validate_pump_codes(codes: &[String]) -> ValidationResult<()> {
    if codes.is_empty() {
        return Err(ValidationError::required("entries"));
    }
    let mut seen = HashSet::with_capacity(codes.len());
    for code in codes {
        validate_pump_code(code)?;
        if !seen.insert(code.trim()) {
            return Err(ValidationError::Duplicate {
                field: "pump_code".to_string(),
                value: code.trim().to_string(),
            });
        }
    }
    Ok(())
}

pub fn validate_bill(bill: &Bill) -> ValidationResult<()> {
    if bill.bill_number <= 0 {
        return Err(ValidationError::OutOfRange {
            field: "bill_number".to_string(),
            min: 1,
            max: i64::MAX,
        });
    }
    if bill.lines.is_empty() {
        return Err(ValidationError::required("lines"));
    }
    for line in &bill.lines {
        validate_product_code(&line.product_code)?;
        validate_product_name(&line.product_name)?;
        if line.qty.is_negative() || line.qty.is_zero() {
            return Err(ValidationError::OutOfRange {
                field: "qty".to_string(),
                min: 0,
                max: MAX_METER_LITRES,
            });
        }
    }
    Ok(())
}

// =============================================================================
// Unit Tests
// =============================================================================
