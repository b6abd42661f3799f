//! # Edit Window
//!
//! Decides whether a closed shift may be reopened.
//!
//! ## Rule
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  closed/edited rows ──► latest (reading_date, shift) ──┐               │
//! │                                                        │ equal?        │
//! │  operator session (shift_no, shift_date) ──────────────┘               │
//! │                                                                         │
//! │      yes ──► EditPermit { latest }      no ──► EditWindowClosed        │
//! │      (no finalized rows at all)            ──► NoClosedShift           │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! An [`EditPermit`] can only be obtained through [`authorize`], so holding
//! one proves the check ran. Every edit-mode write carries it.

use serde::Serialize;
use ts_rs::TS;

use crate::error::{CoreError, CoreResult, ValidationError};
use crate::shift::{ShiftContext, ShiftStamp};
use crate::types::ReadingStatus;

// =============================================================================
// Edit Permit
// =============================================================================

/// Proof that the operator may rewrite the most recently closed shift.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, TS)]
#[ts(export)]
pub struct EditPermit {
    stamp: ShiftStamp,
}

impl EditPermit {
    /// The shift this permit reopens.
    #[inline]
    pub const fn stamp(&self) -> ShiftStamp {
        self.stamp
    }

    /// Checks one edit-mode write against the permit.
    ///
    /// The row must belong to the permitted shift and the requested status
    /// must be `edited` (in progress) or `closed` (final save).
    pub fn check_entry(
        &self,
        pump_code: &str,
        entry: ShiftStamp,
        status: ReadingStatus,
    ) -> CoreResult<()> {
        if entry != self.stamp {
            return Err(CoreError::EntryOutsideEditWindow {
                pump_code: pump_code.to_string(),
                shift: entry.shift,
                reading_date: entry.reading_date,
            });
        }
        if !status.is_finalized() {
            return Err(ValidationError::NotAllowed {
                field: "status".to_string(),
                allowed: vec![
                    ReadingStatus::Edited.to_string(),
                    ReadingStatus::Closed.to_string(),
                ],
            }
            .into());
        }
        Ok(())
    }

    /// Checks the stored row an edit-mode update overwrites.
    ///
    /// The row itself must belong to the permitted shift, and the update
    /// must keep its pump, shift and reading date.
    pub fn check_stored(
        &self,
        id: i64,
        stored_pump: &str,
        stored: ShiftStamp,
        entry_pump: &str,
        entry: ShiftStamp,
    ) -> CoreResult<()> {
        if stored != self.stamp {
            return Err(CoreError::EntryOutsideEditWindow {
                pump_code: stored_pump.to_string(),
                shift: stored.shift,
                reading_date: stored.reading_date,
            });
        }
        if stored_pump != entry_pump.trim() || stored != entry {
            return Err(CoreError::RowKeyChanged {
                id,
                pump_code: stored_pump.to_string(),
            });
        }
        Ok(())
    }
}

// =============================================================================
// Window Rule
// =============================================================================

/// Most recent `(reading_date, shift)` among finalized rows.
pub fn latest_finalized<I>(rows: I) -> Option<ShiftStamp>
where
    I: IntoIterator<Item = (ShiftStamp, ReadingStatus)>,
{
    rows.into_iter()
        .filter(|(_, status)| status.is_finalized())
        .map(|(stamp, _)| stamp)
        .max()
}

/// Grants a permit when the session matches the latest finalized shift.
pub fn authorize(latest: Option<ShiftStamp>, session: &ShiftContext) -> CoreResult<EditPermit> {
    let latest = latest.ok_or(CoreError::NoClosedShift)?;
    let requested = session.stamp();

    if latest != requested {
        return Err(CoreError::EditWindowClosed {
            latest_date: latest.reading_date,
            latest_shift: latest.shift,
            requested_date: requested.reading_date,
            requested_shift: requested.shift,
        });
    }

    Ok(EditPermit { stamp: latest })
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shift::Shift;
    use chrono::NaiveDate;

    fn stamp(d: u32, shift: Shift) -> ShiftStamp {
        ShiftStamp::new(NaiveDate::from_ymd_opt(2025, 5, d).unwrap(), shift)
    }

    #[test]
    fn test_latest_ignores_open_rows() {
        let rows = vec![
            (stamp(1, Shift::Day), ReadingStatus::Closed),
            (stamp(1, Shift::Night), ReadingStatus::Closed),
            (stamp(2, Shift::Day), ReadingStatus::Pending),
            (stamp(2, Shift::Day), ReadingStatus::Active),
        ];
        assert_eq!(latest_finalized(rows), Some(stamp(1, Shift::Night)));
    }

    #[test]
    fn test_latest_counts_edited() {
        let rows = vec![
            (stamp(1, Shift::Day), ReadingStatus::Closed),
            (stamp(1, Shift::Night), ReadingStatus::Edited),
        ];
        assert_eq!(latest_finalized(rows), Some(stamp(1, Shift::Night)));
    }

    #[test]
    fn test_authorize_latest_shift() {
        let session = ShiftContext::new(Shift::Night, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
        let permit = authorize(Some(stamp(1, Shift::Night)), &session).unwrap();
        assert_eq!(permit.stamp(), stamp(1, Shift::Night));
    }

    #[test]
    fn test_authorize_rejects_older_shift() {
        let session = ShiftContext::new(Shift::Day, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
        let err = authorize(Some(stamp(1, Shift::Night)), &session).unwrap_err();
        assert!(matches!(
            err,
            CoreError::EditWindowClosed {
                latest_shift: Shift::Night,
                requested_shift: Shift::Day,
                ..
            }
        ));
    }

    #[test]
    fn test_authorize_without_closed_shift() {
        let session = ShiftContext::new(Shift::Day, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
        assert!(matches!(authorize(None, &session), Err(CoreError::NoClosedShift)));
    }

    #[test]
    fn test_permit_checks_entries() {
        let session = ShiftContext::new(Shift::Night, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
        let permit = authorize(Some(stamp(1, Shift::Night)), &session).unwrap();

        assert!(permit
            .check_entry("P1", stamp(1, Shift::Night), ReadingStatus::Edited)
            .is_ok());
        assert!(permit
            .check_entry("P1", stamp(1, Shift::Night), ReadingStatus::Closed)
            .is_ok());
        assert!(matches!(
            permit.check_entry("P1", stamp(1, Shift::Day), ReadingStatus::Edited),
            Err(CoreError::EntryOutsideEditWindow { .. })
        ));
        assert!(matches!(
            permit.check_entry("P1", stamp(1, Shift::Night), ReadingStatus::Active),
            Err(CoreError::Validation(_))
        ));
    }

    #[test]
    fn test_permit_checks_stored_row() {
        let session = ShiftContext::new(Shift::Night, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap());
        let permit = authorize(Some(stamp(1, Shift::Night)), &session).unwrap();

        assert!(permit
            .check_stored(7, "P1", stamp(1, Shift::Night), "P1", stamp(1, Shift::Night))
            .is_ok());
        // A closed row from an earlier shift stays out of reach.
        assert!(matches!(
            permit.check_stored(7, "P2", stamp(1, Shift::Day), "P9", stamp(1, Shift::Night)),
            Err(CoreError::EntryOutsideEditWindow { shift: Shift::Day, .. })
        ));
        assert!(matches!(
            permit.check_stored(7, "P1", stamp(1, Shift::Night), "P9", stamp(1, Shift::Night)),
            Err(CoreError::RowKeyChanged { id: 7, .. })
        ));
    }
}
