//! # Shift Transition Engine
//!
//! Closes a shift and carries each pump's closing reading into the next
//! shift's opening reading.
//!
//! ## Hand-over
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  closed row (P1, shift S, date D, closing C)                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  successor = (P1, S==1 ? 2 : 1, S==1 ? D : D+1)                        │
//! │       │                                                                 │
//! │       ├── found, opening == C ──► nothing to do                        │
//! │       ├── found, opening != C ──► opening := C, sale recomputed (info) │
//! │       └── missing ──────────────► INSERT pending {opening C} (debug)   │
//! │                                                                         │
//! │  All of it inside the transaction that closed the row.                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! The successor may live in the next month's partition; the registry
//! provisions it in the same transaction.

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::partition::{PartitionRegistry, StagedPartitions};
use crate::repository::reading::{fetch_by_key, insert_pending, PendingRow};
use fuelbook_core::validation::validate_pump_codes;
use fuelbook_core::{
    Litres, PartitionKey, ReadingStatus, Shift, ShiftStamp, ShiftTransition, ValidationError,
};

// =============================================================================
// Propagation
// =============================================================================

/// A closed row whose closing reading seeds its successor.
#[derive(Debug, Clone, Copy)]
pub struct SuccessorSource<'a> {
    pub pump_code: &'a str,
    pub product_code: &'a str,
    pub product_name: &'a str,
    pub closing: Litres,
    pub closed: ShiftStamp,
}

/// What propagation did to the successor row.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Propagation {
    /// No successor existed; a pending row was inserted.
    Seeded { id: i64 },
    /// The successor's opening was stale and has been overwritten.
    Corrected { id: i64, previous: Litres },
    /// The successor already opened at the closing value.
    Unchanged { id: i64 },
}

/// Seeds or corrects the successor of `source` through `conn`.
pub async fn propagate_closing(
    conn: &mut SqliteConnection,
    partitions: &PartitionRegistry,
    staged: &mut StagedPartitions,
    source: &SuccessorSource<'_>,
) -> DbResult<Propagation> {
    let next = source.closed.successor();
    let partition_id = partitions
        .reading_partition(conn, PartitionKey::for_date(next.reading_date), staged)
        .await?;

    match fetch_by_key(conn, source.pump_code, next.shift, next.reading_date).await? {
        Some(successor) if successor.opening_reading == source.closing => {
            Ok(Propagation::Unchanged { id: successor.id })
        }
        Some(successor) => {
            let sale = Litres::sale_between(source.closing, successor.closing_reading);
            sqlx::query(
                r#"
                UPDATE pump_readings
                SET opening_reading = ?1, sale_litre = ?2, updated_at = ?3
                WHERE id = ?4
                "#,
            )
            .bind(source.closing)
            .bind(sale)
            .bind(Utc::now())
            .bind(successor.id)
            .execute(&mut *conn)
            .await?;

            info!(
                pump_code = %source.pump_code,
                successor = %next,
                previous = %successor.opening_reading,
                opening = %source.closing,
                "Corrected stale opening reading"
            );
            Ok(Propagation::Corrected {
                id: successor.id,
                previous: successor.opening_reading,
            })
        }
        None => {
            debug!(
                pump_code = %source.pump_code,
                successor = %next,
                "Successor row not found, seeding pending row"
            );
            let id = insert_pending(
                conn,
                partition_id,
                &PendingRow {
                    pump_code: source.pump_code,
                    product_code: source.product_code,
                    product_name: source.product_name,
                    opening: source.closing,
                    target: next,
                    session_date: source.closed.reading_date,
                },
            )
            .await?;
            Ok(Propagation::Seeded { id })
        }
    }
}

// =============================================================================
// Bulk Close
// =============================================================================

/// Close every listed pump's row for `(current_shift, date)` and seed the
/// next shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CloseShiftRequest {
    pub pump_codes: Vec<String>,
    pub current_shift: Shift,
    pub date: NaiveDate,
}

/// Runs shift closes.
#[derive(Debug, Clone)]
pub struct ShiftTransitionEngine {
    pool: SqlitePool,
    partitions: Arc<PartitionRegistry>,
}

impl ShiftTransitionEngine {
    pub fn new(pool: SqlitePool, partitions: Arc<PartitionRegistry>) -> Self {
        ShiftTransitionEngine { pool, partitions }
    }

    /// Closes the shift and seeds its successor in one transaction.
    ///
    /// ## Rules
    /// - A listed pump with no row for the shift aborts the whole close
    /// - Pending and active rows become closed; closed rows are left as is
    /// - A row with no closing reading cannot be closed; the close rolls back
    /// - An edited row belongs to an edit session and is a `Conflict`
    /// - Every listed pump seeds its successor with
    ///   `INSERT ... ON CONFLICT DO UPDATE` on the opening only
    ///
    /// Running the same close twice changes nothing the second time.
    pub async fn close_shift_and_seed_next(
        &self,
        request: &CloseShiftRequest,
    ) -> DbResult<ShiftTransition> {
        validate_pump_codes(&request.pump_codes)?;

        let closed = ShiftStamp::new(request.date, request.current_shift);
        let next = closed.successor();

        info!(
            shift = %closed,
            next = %next,
            pumps = request.pump_codes.len(),
            "Closing shift"
        );

        let mut tx = self.pool.begin().await?;
        let mut staged = StagedPartitions::default();
        let next_partition = self
            .partitions
            .reading_partition(&mut tx, PartitionKey::for_date(next.reading_date), &mut staged)
            .await?;

        let mut closed_now = 0usize;
        let mut seeded = 0u64;

        for code in &request.pump_codes {
            let code = code.trim();
            let row = fetch_by_key(&mut tx, code, closed.shift, closed.reading_date)
                .await?
                .ok_or_else(|| DbError::not_found("ReadingRecord", format!("{code}/{closed}")))?;

            match row.status {
                ReadingStatus::Closed => {
                    debug!(pump_code = %code, "Row already closed");
                }
                ReadingStatus::Edited => {
                    return Err(DbError::conflict(
                        "ReadingRecord",
                        row.id,
                        "row is being edited and can only be closed under an edit permit",
                    ));
                }
                ReadingStatus::Pending | ReadingStatus::Active => {
                    if row.closing_reading.is_zero() {
                        return Err(ValidationError::required(format!(
                            "closing_reading for pump {code}"
                        ))
                        .into());
                    }
                    sqlx::query(
                        "UPDATE pump_readings SET status = 'closed', updated_at = ?1 WHERE id = ?2",
                    )
                    .bind(Utc::now())
                    .bind(row.id)
                    .execute(&mut *tx)
                    .await?;
                    closed_now += 1;
                }
            }

            let now = Utc::now();
            seeded += sqlx::query(
                r#"
                INSERT INTO pump_readings (
                    partition_id, pump_code, product_code, product_name,
                    opening_reading, closing_reading, sale_litre,
                    shift, date, reading_date, status, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, ?6, ?7, ?8, 'pending', ?9, ?9)
                ON CONFLICT (pump_code, shift, reading_date) DO UPDATE SET
                    opening_reading = excluded.opening_reading,
                    sale_litre = CASE
                        WHEN pump_readings.closing_reading = 0 THEN 0
                        ELSE pump_readings.closing_reading - excluded.opening_reading
                    END,
                    updated_at = excluded.updated_at
                WHERE pump_readings.opening_reading <> excluded.opening_reading
                "#,
            )
            .bind(next_partition)
            .bind(&row.pump_code)
            .bind(&row.product_code)
            .bind(&row.product_name)
            .bind(row.closing_reading)
            .bind(next.shift)
            .bind(closed.reading_date)
            .bind(next.reading_date)
            .bind(now)
            .execute(&mut *tx)
            .await?
            .rows_affected();
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        self.partitions.commit(staged).await;

        info!(
            shift = %closed,
            closed = closed_now,
            seeded_or_corrected = seeded,
            "Shift closed"
        );

        Ok(ShiftTransition::from_closed(closed))
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use crate::repository::reading::WriteMode;
    use fuelbook_core::{ReadingEntry, ShiftContext};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn active(pump: &str, opening: i64, closing: i64, shift: Shift, day: NaiveDate) -> ReadingEntry {
        ReadingEntry {
            id: None,
            pump_code: pump.to_string(),
            product_code: "HSD".to_string(),
            product_name: "DIESEL".to_string(),
            opening_reading: Litres::from_whole(opening),
            closing_reading: Litres::from_whole(closing),
            shift,
            date: None,
            reading_date: day,
            status: ReadingStatus::Active,
        }
    }

    fn request(codes: &[&str], shift: Shift, day: NaiveDate) -> CloseShiftRequest {
        CloseShiftRequest {
            pump_codes: codes.iter().map(|c| c.to_string()).collect(),
            current_shift: shift,
            date: day,
        }
    }

    async fn snapshot(db: &Database) -> Vec<(String, i64, String, i64, i64, String, String)> {
        sqlx::query_as(
            r#"
            SELECT pump_code, shift, reading_date, opening_reading, sale_litre, status, updated_at
            FROM pump_readings
            ORDER BY pump_code, reading_date, shift
            "#,
        )
        .fetch_all(db.pool())
        .await
        .unwrap()
    }

    #[tokio::test]
    async fn test_bulk_close_seeds_successors() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let day = date(2025, 5, 1);
        db.readings()
            .save_entries(
                &[
                    active("P1", 1000, 1500, Shift::Day, day),
                    active("P2", 200, 260, Shift::Day, day),
                ],
                WriteMode::Normal,
            )
            .await
            .unwrap();

        let summary = db
            .transitions()
            .close_shift_and_seed_next(&request(&["P1", "P2"], Shift::Day, day))
            .await
            .unwrap();

        assert_eq!(summary.current_shift, Shift::Day);
        assert_eq!(summary.new_shift, Shift::Night);
        assert_eq!(summary.record_date, day);
        assert_eq!(summary.reading_date, day);

        let closed = db.readings().list_by_shift_date(Shift::Day, day).await.unwrap();
        assert!(closed.iter().all(|r| r.status == ReadingStatus::Closed));

        let night = db.readings().list_by_shift_date(Shift::Night, day).await.unwrap();
        assert_eq!(night.len(), 2);
        assert_eq!(night[0].opening_reading, Litres::from_whole(1500));
        assert_eq!(night[1].opening_reading, Litres::from_whole(260));
        assert!(night.iter().all(|r| r.status == ReadingStatus::Pending));
    }

    #[tokio::test]
    async fn test_bulk_close_is_idempotent() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let day = date(2025, 5, 1);
        db.readings()
            .upsert(&active("P1", 1000, 1500, Shift::Night, day))
            .await
            .unwrap();

        let engine = db.transitions();
        let req = request(&["P1"], Shift::Night, day);
        let first = engine.close_shift_and_seed_next(&req).await.unwrap();
        let before = snapshot(&db).await;

        let second = engine.close_shift_and_seed_next(&req).await.unwrap();
        let after = snapshot(&db).await;

        assert_eq!(first, second);
        assert_eq!(before, after);
        assert_eq!(second.reading_date, date(2025, 5, 2));
    }

    #[tokio::test]
    async fn test_bulk_close_corrects_stale_successor() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let day = date(2025, 5, 1);
        let readings = db.readings();
        readings
            .upsert(&active("P1", 1000, 1500, Shift::Day, day))
            .await
            .unwrap();
        readings
            .upsert(&active("P1", 1450, 1700, Shift::Night, day))
            .await
            .unwrap();

        db.transitions()
            .close_shift_and_seed_next(&request(&["P1"], Shift::Day, day))
            .await
            .unwrap();

        let night = readings.get("P1", Shift::Night, day).await.unwrap().unwrap();
        assert_eq!(night.opening_reading, Litres::from_whole(1500));
        assert_eq!(night.sale_litre, Litres::from_whole(200));
        assert_eq!(night.status, ReadingStatus::Active);
    }

    #[tokio::test]
    async fn test_missing_pump_aborts_close() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let day = date(2025, 5, 1);
        db.readings()
            .upsert(&active("P1", 1000, 1500, Shift::Day, day))
            .await
            .unwrap();

        let err = db
            .transitions()
            .close_shift_and_seed_next(&request(&["P1", "P9"], Shift::Day, day))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::NotFound { .. }));

        let p1 = db.readings().get("P1", Shift::Day, day).await.unwrap().unwrap();
        assert_eq!(p1.status, ReadingStatus::Active);
        assert!(db.readings().get("P1", Shift::Night, day).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_year_end_rollover() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let eve = date(2025, 12, 31);
        db.readings()
            .upsert(&active("P1", 5000, 5400, Shift::Night, eve))
            .await
            .unwrap();

        let summary = db
            .transitions()
            .close_shift_and_seed_next(&request(&["P1"], Shift::Night, eve))
            .await
            .unwrap();
        assert_eq!(summary.reading_date, date(2026, 1, 1));

        let seeded = db
            .readings()
            .get("P1", Shift::Day, date(2026, 1, 1))
            .await
            .unwrap()
            .unwrap();
        assert_eq!(seeded.opening_reading, Litres::from_whole(5400));
    }

    #[tokio::test]
    async fn test_edited_row_blocks_bulk_close() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let day = date(2025, 5, 1);
        let readings = db.readings();
        let mut entry = active("P1", 1000, 1500, Shift::Day, day);
        entry.status = ReadingStatus::Closed;
        let saved = readings.upsert(&entry).await.unwrap();

        let permit = readings
            .open_edit_window(&ShiftContext::new(Shift::Day, day))
            .await
            .unwrap();
        entry.id = Some(saved.id);
        entry.status = ReadingStatus::Edited;
        readings
            .save_entries(&[entry], WriteMode::Edit(permit))
            .await
            .unwrap();

        assert!(matches!(
            db.transitions()
                .close_shift_and_seed_next(&request(&["P1"], Shift::Day, day))
                .await,
            Err(DbError::Conflict { .. })
        ));
    }

    #[tokio::test]
    async fn test_propagation_reports_action() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let registry = PartitionRegistry::new();
        let source = SuccessorSource {
            pump_code: "P1",
            product_code: "HSD",
            product_name: "DIESEL",
            closing: Litres::from_whole(1500),
            closed: ShiftStamp::new(date(2025, 5, 1), Shift::Day),
        };

        let mut tx = db.pool().begin().await.unwrap();
        let mut staged = StagedPartitions::default();
        let first = propagate_closing(&mut tx, &registry, &mut staged, &source)
            .await
            .unwrap();
        let second = propagate_closing(&mut tx, &registry, &mut staged, &source)
            .await
            .unwrap();
        tx.commit().await.unwrap();

        let Propagation::Seeded { id } = first else {
            panic!("expected a seeded successor, got {first:?}");
        };
        assert_eq!(second, Propagation::Unchanged { id });
    }

    #[tokio::test]
    async fn test_close_without_closing_reading_rolls_back() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let day = date(2025, 5, 1);
        db.readings()
            .upsert(&active("P1", 1000, 1500, Shift::Day, day))
            .await
            .unwrap();
        db.readings()
            .seed_opening_readings(&[fuelbook_core::SeedReading {
                pump_code: "P2".to_string(),
                product_code: "MS".to_string(),
                product_name: "PETROL".to_string(),
                opening_reading: Litres::from_whole(1000),
                shift: Shift::Day,
                reading_date: day,
            }])
            .await
            .unwrap();

        let err = db
            .transitions()
            .close_shift_and_seed_next(&request(&["P1", "P2"], Shift::Day, day))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::Domain(fuelbook_core::CoreError::Validation(_))));

        // Nothing closed, nothing seeded.
        let rows = db.readings().list_by_shift_date(Shift::Day, day).await.unwrap();
        assert!(rows.iter().all(|r| r.status != ReadingStatus::Closed));
        assert!(db.readings().list_by_shift_date(Shift::Night, day).await.unwrap().is_empty());
    }
}
