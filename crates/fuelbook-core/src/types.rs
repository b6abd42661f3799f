//! # Domain Types
//!
//! Core domain types used throughout Fuelbook.
//!
//! ## Type Hierarchy
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                         Domain Types                                    │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │   PumpConfig    │   │  ReadingRecord  │   │    BillLine     │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  id             │   │  id             │   │  bill_number    │       │
//! │  │  pump_code (UQ) │   │  pump_code      │   │  product_name   │       │
//! │  │  product_code   │   │  opening/closing│   │  qty (Litres)   │       │
//! │  │  product_name   │   │  sale_litre     │   │  shift_no/date  │       │
//! │  └─────────────────┘   │  shift, status  │   └─────────────────┘       │
//! │                        └─────────────────┘                              │
//! │                                                                         │
//! │  ┌─────────────────┐   ┌─────────────────┐   ┌─────────────────┐       │
//! │  │ ReadingStatus   │   │  ReadingEntry   │   │   BillTotals    │       │
//! │  │  ─────────────  │   │  ─────────────  │   │  ─────────────  │       │
//! │  │  Pending        │   │  operator input │   │  per product    │       │
//! │  │  Active         │   │  (sale ignored) │   │  qty + count    │       │
//! │  │  Closed/Edited  │   └─────────────────┘   └─────────────────┘       │
//! │  └─────────────────┘                                                    │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Identity
//! Rows carry an integer `id` for updates, but the business key of a reading
//! is `(pump_code, shift, reading_date)` and the store enforces it as unique.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::litres::Litres;
use crate::shift::{Shift, ShiftStamp};

// =============================================================================
// Reading Status
// =============================================================================

/// Lifecycle of a reading row.
///
/// ## State Machine
/// ```text
///   ┌─────────┐  autosave  ┌────────┐  final save  ┌────────┐
///   │ Pending │──────────►│ Active │─────────────►│ Closed │◄──┐
///   └────┬────┘            └────────┘              └───┬────┘   │
///        │ final save (no keystrokes)                  │ edit   │ final save
///        └─────────────────────────────────────────────┤ permit │ (edit mode)
///                                                      ▼        │
///                                                  ┌────────┐   │
///                                                  │ Edited │───┘
///                                                  └────────┘
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum ReadingStatus {
    /// Seeded opening, nothing entered yet.
    Pending,
    /// Closing is being typed in (autosaved).
    Active,
    /// A closed shift reopened under an edit permit.
    Edited,
    /// Final save done.
    Closed,
}

impl ReadingStatus {
    /// Whether a stored row in this status may be rewritten with `next`.
    ///
    /// `Closed -> Edited` is listed here but only the edit-mode write path
    /// is allowed to request it.
    pub const fn can_transition_to(self, next: ReadingStatus) -> bool {
        use ReadingStatus::*;
        matches!(
            (self, next),
            (Pending, Pending | Active | Closed)
                | (Active, Active | Closed)
                | (Closed, Edited)
                | (Edited, Edited | Closed)
        )
    }

    /// Closed or reopened: counts towards the edit window.
    #[inline]
    pub const fn is_finalized(self) -> bool {
        matches!(self, ReadingStatus::Closed | ReadingStatus::Edited)
    }

    /// Lowercase name, as stored.
    pub const fn as_str(self) -> &'static str {
        match self {
            ReadingStatus::Pending => "pending",
            ReadingStatus::Active => "active",
            ReadingStatus::Edited => "edited",
            ReadingStatus::Closed => "closed",
        }
    }
}

impl Default for ReadingStatus {
    fn default() -> Self {
        ReadingStatus::Pending
    }
}

impl fmt::Display for ReadingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

// =============================================================================
// Pump Configuration
// =============================================================================

/// Which product a pump dispenses.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct PumpConfig {
    pub id: i64,
    /// Business identifier, unique across the station.
    pub pump_code: String,
    pub product_code: String,
    pub product_name: String,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

/// Input for creating a pump configuration.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewPumpConfig {
    pub pump_code: String,
    pub product_code: String,
    pub product_name: String,
}

// =============================================================================
// Reading Record
// =============================================================================

/// One pump's meter values for one shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct ReadingRecord {
    pub id: i64,
    pub pump_code: String,
    pub product_code: String,
    pub product_name: String,
    pub opening_reading: Litres,
    pub closing_reading: Litres,
    /// `closing - opening`, computed by the store. Zero while the closing
    /// is still zero (nothing entered yet), never `-opening`.
    pub sale_litre: Litres,
    #[ts(as = "u8")]
    pub shift: Shift,
    /// Operator session date that produced the row.
    #[ts(as = "String")]
    pub date: NaiveDate,
    /// Shift date the meter values belong to.
    #[ts(as = "String")]
    pub reading_date: NaiveDate,
    pub status: ReadingStatus,
    #[ts(as = "String")]
    pub created_at: DateTime<Utc>,
    #[ts(as = "String")]
    pub updated_at: DateTime<Utc>,
}

impl ReadingRecord {
    /// The `(reading_date, shift)` this row belongs to.
    #[inline]
    pub fn stamp(&self) -> ShiftStamp {
        ShiftStamp::new(self.reading_date, self.shift)
    }
}

// =============================================================================
// Reading Entry
// =============================================================================

/// Operator input for one reading row.
///
/// There is no sale field: the store always derives it from the two meter
/// values, so a client cannot smuggle in an inconsistent figure.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReadingEntry {
    /// Present when updating an existing row.
    pub id: Option<i64>,
    pub pump_code: String,
    pub product_code: String,
    pub product_name: String,
    pub opening_reading: Litres,
    pub closing_reading: Litres,
    #[ts(as = "u8")]
    pub shift: Shift,
    /// Session date; defaults to `reading_date` when absent.
    #[ts(as = "Option<String>")]
    pub date: Option<NaiveDate>,
    #[ts(as = "String")]
    pub reading_date: NaiveDate,
    pub status: ReadingStatus,
}

impl ReadingEntry {
    /// Sale the store will persist for this entry.
    #[inline]
    pub fn sale_litre(&self) -> Litres {
        Litres::sale_between(self.opening_reading, self.closing_reading)
    }

    /// Session date, falling back to the reading date.
    #[inline]
    pub fn session_date(&self) -> NaiveDate {
        self.date.unwrap_or(self.reading_date)
    }

    #[inline]
    pub fn stamp(&self) -> ShiftStamp {
        ShiftStamp::new(self.reading_date, self.shift)
    }

    /// True when this write finalizes the row with a real closing value.
    #[inline]
    pub fn closes_with_reading(&self) -> bool {
        self.status == ReadingStatus::Closed && !self.closing_reading.is_zero()
    }
}

/// Opening value used to initialize a shift before any closing is typed.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SeedReading {
    pub pump_code: String,
    pub product_code: String,
    pub product_name: String,
    pub opening_reading: Litres,
    #[ts(as = "u8")]
    pub shift: Shift,
    #[ts(as = "String")]
    pub reading_date: NaiveDate,
}

// =============================================================================
// Save Outcome
// =============================================================================

/// What a single upsert did.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaveAction {
    Inserted,
    Updated,
}

/// Result of saving one entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct SaveOutcome {
    pub id: i64,
    pub action: SaveAction,
}

// =============================================================================
// Shift Transition
// =============================================================================

/// Summary returned by a bulk close-and-seed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShiftTransition {
    #[ts(as = "u8")]
    pub current_shift: Shift,
    #[ts(as = "u8")]
    pub new_shift: Shift,
    /// Date of the shift that was closed.
    #[ts(as = "String")]
    pub record_date: NaiveDate,
    /// Reading date of the seeded shift.
    #[ts(as = "String")]
    pub reading_date: NaiveDate,
}

impl ShiftTransition {
    /// Builds the summary for closing `(shift, date)`.
    pub fn from_closed(closed: ShiftStamp) -> Self {
        let next = closed.successor();
        ShiftTransition {
            current_shift: closed.shift,
            new_shift: next.shift,
            record_date: closed.reading_date,
            reading_date: next.reading_date,
        }
    }
}

// =============================================================================
// Bills
// =============================================================================

/// How a bill was settled.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(rename_all = "lowercase"))]
#[ts(export)]
#[serde(rename_all = "snake_case")]
pub enum SaleMode {
    Cash,
    Credit,
}

/// One product line of a bill.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct BillLine {
    pub product_code: String,
    pub product_name: String,
    pub qty: Litres,
    /// Unit rate in paise.
    pub rate_paise: i64,
    /// Line amount in paise.
    pub amount_paise: i64,
}

/// A bill as issued at the counter.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct Bill {
    pub bill_number: i64,
    #[ts(as = "String")]
    pub bill_date: NaiveDate,
    pub party_name: Option<String>,
    pub vehicle_number: Option<String>,
    pub mode_of_sales: SaleMode,
    #[ts(as = "u8")]
    pub shift_no: Shift,
    #[ts(as = "String")]
    pub shift_date: NaiveDate,
    pub lines: Vec<BillLine>,
}

/// Billed quantity for one product in one shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::FromRow))]
#[ts(export)]
pub struct BillTotals {
    pub product_name: String,
    pub total_qty: Litres,
    pub bill_count: i64,
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use ReadingStatus::*;

    #[test]
    fn test_status_transition_table() {
        assert!(Pending.can_transition_to(Pending));
        assert!(Pending.can_transition_to(Active));
        assert!(Pending.can_transition_to(Closed));
        assert!(Active.can_transition_to(Active));
        assert!(Active.can_transition_to(Closed));
        assert!(Closed.can_transition_to(Edited));
        assert!(Edited.can_transition_to(Edited));
        assert!(Edited.can_transition_to(Closed));
    }

    #[test]
    fn test_status_rejected_transitions() {
        assert!(!Closed.can_transition_to(Closed));
        assert!(!Closed.can_transition_to(Active));
        assert!(!Closed.can_transition_to(Pending));
        assert!(!Active.can_transition_to(Pending));
        assert!(!Pending.can_transition_to(Edited));
        assert!(!Edited.can_transition_to(Active));
    }

    #[test]
    fn test_status_serde_lowercase() {
        assert_eq!(serde_json::to_string(&Edited).unwrap(), "\"edited\"");
        assert_eq!(serde_json::from_str::<ReadingStatus>("\"closed\"").unwrap(), Closed);
        assert_eq!(Active.to_string(), "active");
    }

    #[test]
    fn test_entry_sale_and_close_flag() {
        let entry = ReadingEntry {
            id: None,
            pump_code: "P1".to_string(),
            product_code: "HSD".to_string(),
            product_name: "DIESEL".to_string(),
            opening_reading: Litres::from_whole(1000),
            closing_reading: Litres::from_whole(1500),
            shift: Shift::Day,
            date: None,
            reading_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            status: Closed,
        };
        assert_eq!(entry.sale_litre(), Litres::from_whole(500));
        assert_eq!(entry.session_date(), entry.reading_date);
        assert!(entry.closes_with_reading());

        let pending = ReadingEntry {
            closing_reading: Litres::zero(),
            ..entry
        };
        assert!(!pending.closes_with_reading());
        assert_eq!(pending.sale_litre(), Litres::zero());
    }

    #[test]
    fn test_transition_summary() {
        let closed = ShiftStamp::new(NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(), Shift::Night);
        let summary = ShiftTransition::from_closed(closed);
        assert_eq!(summary.current_shift, Shift::Night);
        assert_eq!(summary.new_shift, Shift::Day);
        assert_eq!(summary.record_date, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
        assert_eq!(summary.reading_date, NaiveDate::from_ymd_opt(2025, 5, 2).unwrap());
    }
}
