//! # Reading Commands
//!
//! The shift sheet: load the opening view, save closings, autosave rows.
//!
//! ## Operator Workflow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────┐
//! │  get_readings(shift, date)        opening + closing columns     │
//! │       │                                                         │
//! │       ▼ Enter/Tab on a row                                      │
//! │  autosave_entry(row)              status active / edited        │
//! │       │                                                         │
//! │       ▼ "Save"                                                  │
//! │  save_entries(rows)               status closed, next shift     │
//! │                                   seeded with the closings      │
//! └─────────────────────────────────────────────────────────────────┘
//! ```

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commands::parse_litres;
use crate::error::ApiError;
use crate::service::StationService;
use fuelbook_core::{
    ReadingEntry, ReadingRecord, ReadingStatus, SaveAction, SaveOutcome, SeedReading, Shift,
    ShiftContext, ValidationError,
};
use fuelbook_db::AutosaveResult;

/// A stored reading row.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingDto {
    pub id: i64,
    pub pump_code: String,
    pub product_code: String,
    pub product_name: String,
    pub opening_reading: String,
    pub closing_reading: String,
    pub sale_litre: String,
    pub shift: Shift,
    pub date: NaiveDate,
    pub reading_date: NaiveDate,
    pub status: ReadingStatus,
}

impl From<ReadingRecord> for ReadingDto {
    fn from(r: ReadingRecord) -> Self {
        ReadingDto {
            id: r.id,
            pump_code: r.pump_code,
            product_code: r.product_code,
            product_name: r.product_name,
            opening_reading: r.opening_reading.to_string(),
            closing_reading: r.closing_reading.to_string(),
            sale_litre: r.sale_litre.to_string(),
            shift: r.shift,
            date: r.date,
            reading_date: r.reading_date,
            status: r.status,
        }
    }
}

/// A row as typed on the shift sheet.
///
/// Carries no sale: it is always computed from the two readings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReadingEntryDto {
    #[serde(default)]
    pub id: Option<i64>,
    pub pump_code: String,
    pub product_code: String,
    pub product_name: String,
    pub opening_reading: String,
    pub closing_reading: String,
    pub shift: Shift,
    #[serde(default)]
    pub date: Option<NaiveDate>,
    pub reading_date: NaiveDate,
    pub status: ReadingStatus,
}

impl TryFrom<ReadingEntryDto> for ReadingEntry {
    type Error = ValidationError;

    fn try_from(dto: ReadingEntryDto) -> Result<Self, Self::Error> {
        Ok(ReadingEntry {
            id: dto.id,
            opening_reading: parse_litres("openingReading", &dto.opening_reading)?,
            closing_reading: parse_litres("closingReading", &dto.closing_reading)?,
            pump_code: dto.pump_code,
            product_code: dto.product_code,
            product_name: dto.product_name,
            shift: dto.shift,
            date: dto.date,
            reading_date: dto.reading_date,
            status: dto.status,
        })
    }
}

/// Opening reading for a shift that has no predecessor in the ledger.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SeedReadingDto {
    pub pump_code: String,
    pub product_code: String,
    pub product_name: String,
    pub opening_reading: String,
    pub shift: Shift,
    pub reading_date: NaiveDate,
}

impl TryFrom<SeedReadingDto> for SeedReading {
    type Error = ValidationError;

    fn try_from(dto: SeedReadingDto) -> Result<Self, Self::Error> {
        Ok(SeedReading {
            opening_reading: parse_litres("openingReading", &dto.opening_reading)?,
            pump_code: dto.pump_code,
            product_code: dto.product_code,
            product_name: dto.product_name,
            shift: dto.shift,
            reading_date: dto.reading_date,
        })
    }
}

/// What saving one row did.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveResultDto {
    pub id: i64,
    pub action: SaveAction,
}

impl From<SaveOutcome> for SaveResultDto {
    fn from(o: SaveOutcome) -> Self {
        SaveResultDto {
            id: o.id,
            action: o.action,
        }
    }
}

/// Per-row autosave result.
///
/// A failed autosave is a normal response: the screen marks the row and
/// the operator's next keystroke tries again.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AutosaveResultDto {
    pub pump_code: String,
    pub saved: bool,
    pub id: Option<i64>,
    pub action: Option<SaveAction>,
    pub error: Option<String>,
    /// Whether the last failure was contention rather than a rule.
    pub transient: bool,
    pub attempts: u32,
}

impl From<AutosaveResult> for AutosaveResultDto {
    fn from(result: AutosaveResult) -> Self {
        match result {
            AutosaveResult::Saved {
                pump_code,
                id,
                action,
                attempts,
            } => AutosaveResultDto {
                pump_code,
                saved: true,
                id: Some(id),
                action: Some(action),
                error: None,
                transient: false,
                attempts,
            },
            AutosaveResult::Failed {
                pump_code,
                error,
                transient,
                attempts,
            } => AutosaveResultDto {
                pump_code,
                saved: false,
                id: None,
                action: None,
                error: Some(error),
                transient,
                attempts,
            },
        }
    }
}

impl StationService {
    /// Seeds opening readings as pending rows.
    pub async fn seed_opening_readings(&self, seeds: Vec<SeedReadingDto>) -> Result<(), ApiError> {
        debug!(count = seeds.len(), "seed_opening_readings command");
        let seeds = seeds
            .into_iter()
            .map(SeedReading::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        self.db().readings().seed_opening_readings(&seeds).await?;
        Ok(())
    }

    /// All rows of one shift. Serves both the opening and closing views.
    pub async fn get_readings(
        &self,
        shift: Shift,
        date: NaiveDate,
    ) -> Result<Vec<ReadingDto>, ApiError> {
        debug!(shift = %shift, date = %date, "get_readings command");
        let rows = self.db().readings().list_by_shift_date(shift, date).await?;
        Ok(rows.into_iter().map(ReadingDto::from).collect())
    }

    /// Saves a batch of rows in one transaction.
    ///
    /// With `edit_session` set, the batch rewrites the most recently closed
    /// shift and nothing propagates.
    pub async fn save_entries(
        &self,
        entries: Vec<ReadingEntryDto>,
        edit_session: Option<ShiftContext>,
    ) -> Result<Vec<SaveResultDto>, ApiError> {
        debug!(
            count = entries.len(),
            edit = edit_session.is_some(),
            "save_entries command"
        );
        let entries = entries
            .into_iter()
            .map(ReadingEntry::try_from)
            .collect::<Result<Vec<_>, _>>()?;
        let mode = self.write_mode(edit_session.as_ref()).await?;

        let outcomes = self.db().readings().save_entries(&entries, mode).await?;
        Ok(outcomes.into_iter().map(SaveResultDto::from).collect())
    }

    /// Commits one row as work in progress.
    ///
    /// Input and edit-window problems are errors; storage failures come back
    /// inside the result after retrying.
    pub async fn autosave_entry(
        &self,
        entry: ReadingEntryDto,
        edit_session: Option<ShiftContext>,
    ) -> Result<AutosaveResultDto, ApiError> {
        let entry = ReadingEntry::try_from(entry)?;
        let mode = self.write_mode(edit_session.as_ref()).await?;
        Ok(self.autosaver().save(&entry, mode).await.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::service::tests::{entry_dto, may, seeded_station};

    #[tokio::test]
    async fn test_autosave_keeps_row_active() {
        let station = seeded_station().await;
        let row = station.get_readings(Shift::Day, may(1)).await.unwrap().remove(0);

        let result = station
            .autosave_entry(
                entry_dto(Some(row.id), "1000.00", "1210.50", Shift::Day, may(1), ReadingStatus::Closed),
                None,
            )
            .await
            .unwrap();
        assert!(result.saved);
        assert_eq!(result.attempts, 1);
        assert_eq!(result.action, Some(SaveAction::Updated));

        let stored = station.get_readings(Shift::Day, may(1)).await.unwrap().remove(0);
        assert_eq!(stored.status, ReadingStatus::Active);
        assert_eq!(stored.sale_litre, "210.50");
        assert!(station.get_readings(Shift::Night, may(1)).await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_autosave_failure_is_data() {
        let station = seeded_station().await;
        let result = station
            .autosave_entry(
                entry_dto(Some(999), "1000.00", "1100.00", Shift::Day, may(1), ReadingStatus::Active),
                None,
            )
            .await
            .unwrap();
        assert!(!result.saved);
        assert!(!result.transient);
        assert!(result.error.unwrap().contains("not found"));
    }

    #[tokio::test]
    async fn test_bad_reading_rejected_before_storage() {
        let station = seeded_station().await;
        let err = station
            .save_entries(
                vec![entry_dto(None, "1000.00", "12.345", Shift::Day, may(1), ReadingStatus::Active)],
                None,
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
        assert!(err.message.contains("closingReading"));
    }

    #[tokio::test]
    async fn test_edit_session_rewrites_latest_closed_shift() {
        let station = seeded_station().await;
        let row = station.get_readings(Shift::Day, may(1)).await.unwrap().remove(0);
        station
            .save_entries(
                vec![entry_dto(Some(row.id), "1000.00", "1500.00", Shift::Day, may(1), ReadingStatus::Closed)],
                None,
            )
            .await
            .unwrap();

        let session = ShiftContext::new(Shift::Day, may(1));
        station
            .save_entries(
                vec![entry_dto(Some(row.id), "1000.00", "1495.00", Shift::Day, may(1), ReadingStatus::Edited)],
                Some(session),
            )
            .await
            .unwrap();

        let stored = station.get_readings(Shift::Day, may(1)).await.unwrap().remove(0);
        assert_eq!(stored.status, ReadingStatus::Edited);
        assert_eq!(stored.sale_litre, "495.00");

        // Night keeps the opening it was seeded with.
        let night = station.get_readings(Shift::Night, may(1)).await.unwrap().remove(0);
        assert_eq!(night.opening_reading, "1500.00");

        let wrong_session = ShiftContext::new(Shift::Night, may(1));
        let err = station
            .save_entries(
                vec![entry_dto(Some(row.id), "1000.00", "1490.00", Shift::Day, may(1), ReadingStatus::Edited)],
                Some(wrong_session),
            )
            .await
            .unwrap_err();
        assert_eq!(err.code, ErrorCode::EditWindowClosed);
    }

    #[test]
    fn test_entry_dto_accepts_missing_id_and_date() {
        let json = r#"{
            "pumpCode": "P1",
            "productCode": "HSD",
            "productName": "DIESEL",
            "openingReading": "1000",
            "closingReading": "1500.5",
            "shift": 1,
            "readingDate": "2025-05-01",
            "status": "closed"
        }"#;
        let dto: ReadingEntryDto = serde_json::from_str(json).unwrap();
        let entry = ReadingEntry::try_from(dto).unwrap();
        assert_eq!(entry.id, None);
        assert_eq!(entry.session_date(), may(1));
        assert_eq!(entry.sale_litre().to_string(), "500.50");
    }
}
