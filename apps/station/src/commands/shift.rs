use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::ApiError;
use crate::service::StationService;
use fuelbook_core::{EditPermit, Shift, ShiftContext, ShiftTransition};
use fuelbook_db::CloseShiftRequest;

/// A pump taking part in a bulk close.
///
/// The sheet sends whole rows; only the pump code is used.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PumpRefDto {
    pub pump_code: String,
}

/// Closes `current_shift` on `date` for every listed pump.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CloseShiftDto {
    pub entries: Vec<PumpRefDto>,
    pub current_shift: Shift,
    pub date: NaiveDate,
}

impl From<CloseShiftDto> for CloseShiftRequest {
    fn from(dto: CloseShiftDto) -> Self {
        CloseShiftRequest {
            pump_codes: dto.entries.into_iter().map(|e| e.pump_code).collect(),
            current_shift: dto.current_shift,
            date: dto.date,
        }
    }
}

/// Result of a bulk close.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ShiftTransitionDto {
    pub current_shift: Shift,
    pub new_shift: Shift,
    pub record_date: NaiveDate,
    pub reading_date: NaiveDate,
    /// "Day to Night" or "Night to Day"
    pub transition_type: String,
}

impl From<ShiftTransition> for ShiftTransitionDto {
    fn from(t: ShiftTransition) -> Self {
        let transition_type = match t.current_shift {
            Shift::Day => "Day to Night",
            Shift::Night => "Night to Day",
        };
        ShiftTransitionDto {
            current_shift: t.current_shift,
            new_shift: t.new_shift,
            record_date: t.record_date,
            reading_date: t.reading_date,
            transition_type: transition_type.to_string(),
        }
    }
}

impl StationService {
    /// Closes a shift and seeds the next one in a single transaction.
    pub async fn close_shift_and_seed_next(
        &self,
        request: CloseShiftDto,
    ) -> Result<ShiftTransitionDto, ApiError> {
        debug!(
            shift = %request.current_shift,
            date = %request.date,
            pumps = request.entries.len(),
            "close_shift_and_seed_next command"
        );
        let request = CloseShiftRequest::from(request);
        let transition = self.db().transitions().close_shift_and_seed_next(&request).await?;
        Ok(transition.into())
    }

    /// Checks whether the session may edit, returning the permitted shift.
    ///
    /// Edits are sent with the same session; the permit is re-checked on
    /// every write.
    pub async fn open_edit_window(&self, session: ShiftContext) -> Result<EditPermit, ApiError> {
        debug!(session = %session.stamp(), "open_edit_window command");
        Ok(self.db().readings().open_edit_window(&session).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::service::tests::{entry_dto, may, seeded_station, service};
    use fuelbook_core::ReadingStatus;

    fn close(shift: Shift, date: NaiveDate, pumps: &[&str]) -> CloseShiftDto {
        CloseShiftDto {
            entries: pumps
                .iter()
                .map(|p| PumpRefDto {
                    pump_code: p.to_string(),
                })
                .collect(),
            current_shift: shift,
            date,
        }
    }

    #[tokio::test]
    async fn test_close_is_idempotent() {
        let station = seeded_station().await;
        let row = station.get_readings(Shift::Day, may(1)).await.unwrap().remove(0);
        station
            .autosave_entry(
                entry_dto(Some(row.id), "1000.00", "1500.00", Shift::Day, may(1), ReadingStatus::Active),
                None,
            )
            .await
            .unwrap();

        let first = station
            .close_shift_and_seed_next(close(Shift::Day, may(1), &["P1"]))
            .await
            .unwrap();
        assert_eq!(first.transition_type, "Day to Night");
        assert_eq!(first.reading_date, may(1));

        let night_before = station.get_readings(Shift::Night, may(1)).await.unwrap();
        station
            .close_shift_and_seed_next(close(Shift::Day, may(1), &["P1"]))
            .await
            .unwrap();
        let night_after = station.get_readings(Shift::Night, may(1)).await.unwrap();

        assert_eq!(night_after.len(), 1);
        assert_eq!(night_after[0].opening_reading, "1500.00");
        assert_eq!(night_before[0].id, night_after[0].id);
    }

    #[tokio::test]
    async fn test_close_unknown_pump_not_found() {
        let station = seeded_station().await;
        let row = station.get_readings(Shift::Day, may(1)).await.unwrap().remove(0);
        station
            .autosave_entry(
                entry_dto(Some(row.id), "1000.00", "1500.00", Shift::Day, may(1), ReadingStatus::Active),
                None,
            )
            .await
            .unwrap();

        let err = station
            .close_shift_and_seed_next(close(Shift::Day, may(1), &["P1", "P7"]))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::NotFound);

        // Rolled back: P1 is still open and night was not seeded.
        let day = station.get_readings(Shift::Day, may(1)).await.unwrap();
        assert_eq!(day[0].status, ReadingStatus::Active);
        assert!(station.get_readings(Shift::Night, may(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_close_without_closing_rejected() {
        let station = seeded_station().await;
        let err = station
            .close_shift_and_seed_next(close(Shift::Day, may(1), &["P1"]))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains("closing_reading"));
    }

    #[tokio::test]
    async fn test_open_edit_window_without_closed_shift() {
        let station = service().await;
        let err = station
            .open_edit_window(ShiftContext::new(Shift::Day, may(1)))
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::EditWindowClosed);
    }

    #[test]
    fn test_close_dto_ignores_extra_row_fields() {
        let json = r#"{
            "entries": [{"pumpCode": "P1", "closingReading": "1500.00"}],
            "currentShift": 2,
            "date": "2025-05-31"
        }"#;
        let dto: CloseShiftDto = serde_json::from_str(json).unwrap();
        let request = CloseShiftRequest::from(dto);
        assert_eq!(request.pump_codes, vec!["P1"]);
        assert_eq!(request.current_shift, Shift::Night);
    }
}
