//! # Partition Keys
//!
//! Maps dates to the storage period that holds their rows.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  Readings  → calendar month      2025-05-31  ──►  (2025, 5)            │
//! │                                  2025-06-01  ──►  (2025, 6)            │
//! │                                                                         │
//! │  Bills     → April-March year    2025-03-31  ──►  FY 2024 (2024-25)    │
//! │                                  2025-04-01  ──►  FY 2025 (2025-26)    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Keys are plain values. The database layer turns them into partition rows;
//! nothing here ever produces SQL text.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

/// First month of the fiscal year.
pub const FISCAL_YEAR_START_MONTH: u32 = 4;

// =============================================================================
// Reading Partition
// =============================================================================

/// Calendar month holding a reading's row.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct PartitionKey {
    pub year: i32,
    pub month: u32,
}

impl PartitionKey {
    /// Partition for a reading date.
    pub fn for_date(date: NaiveDate) -> Self {
        PartitionKey {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for PartitionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

// =============================================================================
// Fiscal Year
// =============================================================================

/// April-to-March fiscal year, named by the year it starts in.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct FiscalYear(i32);

impl FiscalYear {
    #[inline]
    pub const fn new(start_year: i32) -> Self {
        FiscalYear(start_year)
    }

    /// Fiscal year a date falls in. January to March belong to the year
    /// that started the previous April.
    pub fn for_date(date: NaiveDate) -> Self {
        if date.month() < FISCAL_YEAR_START_MONTH {
            FiscalYear(date.year() - 1)
        } else {
            FiscalYear(date.year())
        }
    }

    /// Fiscal year of `today`. The caller supplies the clock.
    #[inline]
    pub fn current(today: NaiveDate) -> Self {
        Self::for_date(today)
    }

    #[inline]
    pub const fn start_year(&self) -> i32 {
        self.0
    }
}

/// Renders as `2025-26`.
impl fmt::Display for FiscalYear {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}-{:02}", self.0, (self.0 + 1).rem_euclid(100))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_month_partition() {
        assert_eq!(PartitionKey::for_date(date(2025, 5, 31)), PartitionKey { year: 2025, month: 5 });
        assert_eq!(PartitionKey::for_date(date(2025, 6, 1)), PartitionKey { year: 2025, month: 6 });
        assert_eq!(PartitionKey::for_date(date(2025, 6, 1)).to_string(), "2025-06");
    }

    #[test]
    fn test_fiscal_year_boundaries() {
        assert_eq!(FiscalYear::for_date(date(2025, 3, 31)), FiscalYear::new(2024));
        assert_eq!(FiscalYear::for_date(date(2025, 4, 1)), FiscalYear::new(2025));
        assert_eq!(FiscalYear::for_date(date(2026, 1, 15)), FiscalYear::new(2025));
        assert_eq!(FiscalYear::current(date(2025, 12, 31)), FiscalYear::new(2025));
    }

    #[test]
    fn test_fiscal_year_display() {
        assert_eq!(FiscalYear::new(2025).to_string(), "2025-26");
        assert_eq!(FiscalYear::new(2099).to_string(), "2099-00");
    }
}
