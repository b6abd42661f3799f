//! # Litres Module
//!
//! Provides the `Litres` type for meter readings and dispensed volume.
//!
//! ## Why Integer Litres?
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  THE FLOATING POINT PROBLEM                                             │
//! │                                                                         │
//! │  Pump meters are read to two decimals: 1500.25                         │
//! │                                                                         │
//! │  In floating point:                                                    │
//! │    1800.10 - 1500.20 = 299.89999999999986  ❌                           │
//! │                                                                         │
//! │  OUR SOLUTION: Integer hundredths of a litre                            │
//! │    180010 - 150020 = 29990  → "299.90"  ✅                              │
//! │                                                                         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Usage
//! ```rust
//! use fuelbook_core::litres::Litres;
//!
//! let opening: Litres = "1000.00".parse().unwrap();
//! let closing: Litres = "1500.00".parse().unwrap();
//!
//! let sale = Litres::sale_between(opening, closing);
//! assert_eq!(sale.to_string(), "500.00");
//! ```

use serde::{Deserialize, Serialize};
use std::fmt;
use std::iter::Sum;
use std::ops::{Add, AddAssign, Neg, Sub, SubAssign};
use std::str::FromStr;
use ts_rs::TS;

use crate::error::ValidationError;

// =============================================================================
// Litres Type
// =============================================================================

/// A volume (or meter value) in hundredths of a litre.
///
/// ## Design Decisions
/// - **i64 (signed)**: a closing below the opening yields a negative sale,
///   which is kept and flagged rather than rejected
/// - **Single field tuple struct**: stored as a plain INTEGER column
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize, TS)]
#[cfg_attr(feature = "sqlx", derive(sqlx::Type))]
#[cfg_attr(feature = "sqlx", sqlx(transparent))]
#[ts(export)]
pub struct Litres(i64);

impl Litres {
    /// Creates a value from hundredths of a litre.
    ///
    /// ## Example
    /// ```rust
    /// use fuelbook_core::litres::Litres;
    ///
    /// let reading = Litres::from_hundredths(150025); // 1500.25 L
    /// assert_eq!(reading.whole(), 1500);
    /// ```
    #[inline]
    pub const fn from_hundredths(hundredths: i64) -> Self {
        Litres(hundredths)
    }

    /// Creates a value from whole litres.
    #[inline]
    pub const fn from_whole(litres: i64) -> Self {
        Litres(litres * 100)
    }

    /// Returns the raw value in hundredths of a litre.
    #[inline]
    pub const fn hundredths(&self) -> i64 {
        self.0
    }

    /// Returns the whole-litre portion (truncated toward zero).
    #[inline]
    pub const fn whole(&self) -> i64 {
        self.0 / 100
    }

    /// Returns the fractional portion in hundredths (always 0-99).
    #[inline]
    pub const fn fraction(&self) -> i64 {
        (self.0 % 100).abs()
    }

    /// Zero litres.
    #[inline]
    pub const fn zero() -> Self {
        Litres(0)
    }

    /// Checks if the value is zero.
    #[inline]
    pub const fn is_zero(&self) -> bool {
        self.0 == 0
    }

    /// Checks if the value is negative.
    #[inline]
    pub const fn is_negative(&self) -> bool {
        self.0 < 0
    }

    /// Dispensed volume for a shift: `closing - opening`.
    ///
    /// A closing of zero means no closing reading has been entered yet
    /// (freshly seeded row), so the sale is zero rather than `-opening`.
    ///
    /// ## Example
    /// ```rust
    /// use fuelbook_core::litres::Litres;
    ///
    /// let opening = Litres::from_whole(1000);
    /// assert_eq!(Litres::sale_between(opening, Litres::from_whole(1500)), Litres::from_whole(500));
    /// assert_eq!(Litres::sale_between(opening, Litres::zero()), Litres::zero());
    /// ```
    #[inline]
    pub const fn sale_between(opening: Litres, closing: Litres) -> Litres {
        if closing.is_zero() {
            Litres::zero()
        } else {
            Litres(closing.0 - opening.0)
        }
    }
}

// =============================================================================
// Parsing
// =============================================================================

/// Parses a decimal string with at most two fractional digits.
///
/// Accepts `"1500"`, `"1500.5"`, `"1500.25"`, `"-3.10"`. Anything with more
/// precision than a meter shows is rejected instead of silently rounded.
impl FromStr for Litres {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let invalid = |reason: &str| ValidationError::InvalidFormat {
            field: "reading".to_string(),
            reason: reason.to_string(),
        };

        let s = s.trim();
        if s.is_empty() {
            return Err(ValidationError::required("reading"));
        }

        let (negative, digits) = match s.strip_prefix('-') {
            Some(rest) => (true, rest),
            None => (false, s),
        };

        let (whole_part, frac_part) = match digits.split_once('.') {
            Some((w, f)) => (w, f),
            None => (digits, ""),
        };

        if whole_part.is_empty() && frac_part.is_empty() {
            return Err(invalid("no digits"));
        }
        if !whole_part.chars().all(|c| c.is_ascii_digit())
            || !frac_part.chars().all(|c| c.is_ascii_digit())
        {
            return Err(invalid("must be a decimal number"));
        }
        if frac_part.len() > 2 {
            return Err(invalid("at most two decimal places"));
        }

        let whole: i64 = if whole_part.is_empty() {
            0
        } else {
            whole_part
                .parse()
                .map_err(|_| invalid("value is too large"))?
        };
        let frac: i64 = match frac_part.len() {
            0 => 0,
            1 => frac_part.parse::<i64>().unwrap_or(0) * 10,
            _ => frac_part.parse::<i64>().unwrap_or(0),
        };

        let hundredths = whole
            .checked_mul(100)
            .and_then(|v| v.checked_add(frac))
            .ok_or_else(|| invalid("value is too large"))?;

        Ok(Litres(if negative { -hundredths } else { hundredths }))
    }
}

// =============================================================================
// Trait Implementations
// =============================================================================

/// Two-decimal rendering, the way readings appear on the shift sheet.
impl fmt::Display for Litres {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let sign = if self.0 < 0 { "-" } else { "" };
        write!(f, "{}{}.{:02}", sign, self.whole().abs(), self.fraction())
    }
}

impl Default for Litres {
    fn default() -> Self {
        Litres::zero()
    }
}

impl Add for Litres {
    type Output = Self;

    #[inline]
    fn add(self, other: Self) -> Self {
        Litres(self.0 + other.0)
    }
}

impl AddAssign for Litres {
    #[inline]
    fn add_assign(&mut self, other: Self) {
        self.0 += other.0;
    }
}

impl Sub for Litres {
    type Output = Self;

    #[inline]
    fn sub(self, other: Self) -> Self {
        Litres(self.0 - other.0)
    }
}

impl SubAssign for Litres {
    #[inline]
    fn sub_assign(&mut self, other: Self) {
        self.0 -= other.0;
    }
}

impl Neg for Litres {
    type Output = Self;

    #[inline]
    fn neg(self) -> Self {
        Litres(-self.0)
    }
}

impl Sum for Litres {
    fn sum<I: Iterator<Item = Litres>>(iter: I) -> Self {
        iter.fold(Litres::zero(), Add::add)
    }
}

impl<'a> Sum<&'a Litres> for Litres {
    fn sum<I: Iterator<Item = &'a Litres>>(iter: I) -> Self {
        iter.copied().sum()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
