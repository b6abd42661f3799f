//! # Shifts
//!
//! The two daily operating periods and the hand-over arithmetic between them.
//!
//! ## Hand-over Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                    Shift Hand-over                                      │
//! │                                                                         │
//! │   2025-05-01                     2025-05-02                             │
//! │  ┌────────────┐  ┌────────────┐  ┌────────────┐                         │
//! │  │  Shift 1   │─►│  Shift 2   │─►│  Shift 1   │                         │
//! │  │   (day)    │  │  (night)   │  │   (day)    │                         │
//! │  └────────────┘  └────────────┘  └────────────┘                         │
//! │        same day ──┘      └── next calendar day                         │
//! │                                                                         │
//! │  closing(shift N) ══► opening(shift N+1)                               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use chrono::{Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Shift
// =============================================================================

/// One of the two daily operating periods.
///
/// Serialized as its number (`1` or `2`), which is how operators and the
/// bill ledger refer to it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[serde(try_from = "u8", into = "u8")]
#[repr(i32)]
pub enum Shift {
    /// Shift 1.
    Day = 1,
    /// Shift 2.
    Night = 2,
}

impl Shift {
    /// Returns the shift number.
    #[inline]
    pub const fn number(self) -> u8 {
        match self {
            Shift::Day => 1,
            Shift::Night => 2,
        }
    }

    /// The shift that follows this one.
    #[inline]
    pub const fn next(self) -> Shift {
        match self {
            Shift::Day => Shift::Night,
            Shift::Night => Shift::Day,
        }
    }
}

impl TryFrom<u8> for Shift {
    type Error = ValidationError;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(Shift::Day),
            2 => Ok(Shift::Night),
            _ => Err(ValidationError::NotAllowed {
                field: "shift".to_string(),
                allowed: vec!["1".to_string(), "2".to_string()],
            }),
        }
    }
}

impl From<Shift> for u8 {
    fn from(shift: Shift) -> Self {
        shift.number()
    }
}

impl std::str::FromStr for Shift {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::required("shift"));
        }
        let n: u8 = s.parse().map_err(|_| ValidationError::InvalidFormat {
            field: "shift".to_string(),
            reason: "must be 1 or 2".to_string(),
        })?;
        Shift::try_from(n)
    }
}

impl fmt::Display for Shift {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.number())
    }
}

// =============================================================================
// Shift Stamp
// =============================================================================

/// A specific shift on a specific reading date.
///
/// Ordered by date first, then shift: this is the ordering the edit window
/// uses to find the most recently closed shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ShiftStamp {
    #[ts(as = "String")]
    pub reading_date: NaiveDate,
    #[ts(as = "u8")]
    pub shift: Shift,
}

impl ShiftStamp {
    pub const fn new(reading_date: NaiveDate, shift: Shift) -> Self {
        ShiftStamp {
            reading_date,
            shift,
        }
    }

    /// The shift whose opening readings are seeded when this one closes.
    ///
    /// Day hands over on the same date; night hands over to the next
    /// calendar day (crossing month and year boundaries as needed).
    ///
    /// ## Example
    /// ```rust
    /// use chrono::NaiveDate;
    /// use fuelbook_core::shift::{Shift, ShiftStamp};
    ///
    /// let night = ShiftStamp::new(NaiveDate::from_ymd_opt(2025, 5, 31).unwrap(), Shift::Night);
    /// let next = night.successor();
    /// assert_eq!(next.shift, Shift::Day);
    /// assert_eq!(next.reading_date, NaiveDate::from_ymd_opt(2025, 6, 1).unwrap());
    /// ```
    pub fn successor(&self) -> ShiftStamp {
        let reading_date = match self.shift {
            Shift::Day => self.reading_date,
            Shift::Night => self
                .reading_date
                .checked_add_days(Days::new(1))
                .unwrap_or(NaiveDate::MAX),
        };
        ShiftStamp {
            reading_date,
            shift: self.shift.next(),
        }
    }
}

impl fmt::Display for ShiftStamp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} #{}", self.reading_date, self.shift)
    }
}

// =============================================================================
// Shift Context
// =============================================================================

/// The operator session's current shift, supplied by the caller (login).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(rename_all = "camelCase")]
#[ts(export)]
pub struct ShiftContext {
    #[ts(as = "u8")]
    pub shift_no: Shift,
    #[ts(as = "String")]
    pub shift_date: NaiveDate,
}

impl ShiftContext {
    pub const fn new(shift_no: Shift, shift_date: NaiveDate) -> Self {
        ShiftContext {
            shift_no,
            shift_date,
        }
    }

    /// The session as a stamp for comparisons.
    #[inline]
    pub const fn stamp(&self) -> ShiftStamp {
        ShiftStamp::new(self.shift_date, self.shift_no)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_day_hands_over_same_date() {
        let day = ShiftStamp::new(date(2025, 5, 1), Shift::Day);
        assert_eq!(day.successor(), ShiftStamp::new(date(2025, 5, 1), Shift::Night));
    }

    #[test]
    fn test_night_hands_over_next_day() {
        let night = ShiftStamp::new(date(2025, 5, 1), Shift::Night);
        assert_eq!(night.successor(), ShiftStamp::new(date(2025, 5, 2), Shift::Day));
    }

    #[test]
    fn test_night_rolls_over_year_end() {
        let night = ShiftStamp::new(date(2025, 12, 31), Shift::Night);
        assert_eq!(night.successor(), ShiftStamp::new(date(2026, 1, 1), Shift::Day));
    }

    #[test]
    fn test_stamp_ordering_date_then_shift() {
        let a = ShiftStamp::new(date(2025, 5, 1), Shift::Night);
        let b = ShiftStamp::new(date(2025, 5, 2), Shift::Day);
        let c = ShiftStamp::new(date(2025, 5, 2), Shift::Night);
        assert!(a < b);
        assert!(b < c);
        assert_eq!([b, c, a].iter().max(), Some(&c));
    }

    #[test]
    fn test_shift_parsing() {
        assert_eq!("1".parse::<Shift>().unwrap(), Shift::Day);
        assert_eq!(" 2 ".parse::<Shift>().unwrap(), Shift::Night);
        assert!("3".parse::<Shift>().is_err());
        assert!("".parse::<Shift>().is_err());
        assert!("A".parse::<Shift>().is_err());
    }

    #[test]
    fn test_shift_serializes_as_number() {
        assert_eq!(serde_json::to_string(&Shift::Night).unwrap(), "2");
        assert_eq!(serde_json::from_str::<Shift>("1").unwrap(), Shift::Day);
        assert!(serde_json::from_str::<Shift>("0").is_err());
    }
}
