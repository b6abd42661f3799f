//! # Station Commands
//!
//! DTOs and operations exposed to the operator screens.
//!
//! ## Conventions
//! - DTO fields are camelCase
//! - Litre values travel as two-decimal strings ("1500.25") and are parsed
//!   exactly, never through floating point
//! - Shifts travel as their number, dates as `YYYY-MM-DD`

pub mod bill;
pub mod pump_config;
pub mod reading;
pub mod reconciliation;
pub mod shift;

use fuelbook_core::{Litres, ValidationError};

/// Parses a litre string, naming `field` in the error.
pub(crate) fn parse_litres(field: &str, value: &str) -> Result<Litres, ValidationError> {
    value.parse::<Litres>().map_err(|err| match err {
        ValidationError::Required { .. } => ValidationError::required(field),
        ValidationError::InvalidFormat { reason, .. } => ValidationError::InvalidFormat {
            field: field.to_string(),
            reason,
        },
        other => other,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_litres_names_field() {
        assert_eq!(parse_litres("closingReading", "1500.5").unwrap(), Litres::from_hundredths(150050));

        let err = parse_litres("closingReading", "15.005").unwrap_err();
        assert_eq!(
            err.to_string(),
            "closingReading has invalid format: at most two decimal places"
        );
        assert_eq!(
            parse_litres("openingReading", " ").unwrap_err().to_string(),
            "openingReading is required"
        );
    }
}
