//! # Reading Repository
//!
//! Shift reading rows: one per `(pump_code, shift, reading_date)`.
//!
//! ## Save Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  save_entries(entries, mode)                                           │
//! │       │                                                                 │
//! │       ├── validate batch (codes, meter range, one row per pump)        │
//! │       ├── Edit mode: every entry inside the permit's shift             │
//! │       ▼                                                                 │
//! │  BEGIN                                                                 │
//! │   for each entry:                                                      │
//! │     resolve partition of reading_date (staged)                         │
//! │     id? ── yes ──► re-read stored row, check permit + transition,      │
//! │                    UPDATE                                              │
//! │         └─ no ───► INSERT                                              │
//! │     sale_litre = closing - opening (never taken from the client)       │
//! │     Normal mode + status closed + closing ≠ 0 ──► propagate_closing    │
//! │  COMMIT ──► cache staged partitions                                    │
//! │  (any error ──► ROLLBACK, nothing cached)                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sqlx::{SqliteConnection, SqlitePool};
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::partition::{PartitionRegistry, StagedPartitions};
use crate::transition::{propagate_closing, SuccessorSource};
use fuelbook_core::edit_window::{self, EditPermit};
use fuelbook_core::validation::{validate_reading_batch, validate_seed_reading};
use fuelbook_core::{
    CoreError, Litres, PartitionKey, ReadingEntry, ReadingRecord, ReadingStatus, SaveAction, SaveOutcome,
    SeedReading, Shift, ShiftContext, ShiftStamp, ValidationError,
};

macro_rules! select_reading {
    ($tail:literal) => {
        concat!(
            "SELECT id, pump_code, product_code, product_name, opening_reading, ",
            "closing_reading, sale_litre, shift, date, reading_date, status, ",
            "created_at, updated_at FROM pump_readings ",
            $tail
        )
    };
}

// =============================================================================
// Write Mode
// =============================================================================

/// How a batch of entries is written.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WriteMode {
    /// Regular shift entry. Closing a row seeds the next shift.
    Normal,
    /// Rewriting the last closed shift. Never propagates.
    Edit(EditPermit),
}

impl WriteMode {
    pub fn is_edit(&self) -> bool {
        matches!(self, WriteMode::Edit(_))
    }
}

// =============================================================================
// Repository
// =============================================================================

/// Repository for pump reading rows.
#[derive(Debug, Clone)]
pub struct ReadingRepository {
    pool: SqlitePool,
    partitions: Arc<PartitionRegistry>,
}

impl ReadingRepository {
    /// Creates a new ReadingRepository.
    pub fn new(pool: SqlitePool, partitions: Arc<PartitionRegistry>) -> Self {
        ReadingRepository { pool, partitions }
    }

    /// Gets the row for one pump in one shift.
    pub async fn get(
        &self,
        pump_code: &str,
        shift: Shift,
        reading_date: NaiveDate,
    ) -> DbResult<Option<ReadingRecord>> {
        let mut conn = self.pool.acquire().await?;
        fetch_by_key(&mut conn, pump_code, shift, reading_date).await
    }

    /// Gets a row by id.
    pub async fn get_by_id(&self, id: i64) -> DbResult<Option<ReadingRecord>> {
        let record = sqlx::query_as::<_, ReadingRecord>(select_reading!("WHERE id = ?1"))
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(record)
    }

    /// All rows of one shift, ordered by pump code.
    ///
    /// This is both the opening view (seeded rows) and the closing view of
    /// the shift sheet. A month that was never written to yields no rows.
    pub async fn list_by_shift_date(
        &self,
        shift: Shift,
        reading_date: NaiveDate,
    ) -> DbResult<Vec<ReadingRecord>> {
        let key = PartitionKey::for_date(reading_date);
        let Some(partition_id) = self.partitions.find_reading_partition(&self.pool, key).await?
        else {
            debug!(partition = %key, "No partition for date, returning empty shift");
            return Ok(Vec::new());
        };

        let records = sqlx::query_as::<_, ReadingRecord>(select_reading!(
            "WHERE partition_id = ?1 AND shift = ?2 AND reading_date = ?3 ORDER BY pump_code"
        ))
        .bind(partition_id)
        .bind(shift)
        .bind(reading_date)
        .fetch_all(&self.pool)
        .await?;

        debug!(
            shift = %shift,
            reading_date = %reading_date,
            count = records.len(),
            "Listed shift readings"
        );
        Ok(records)
    }

    /// Saves a single entry in normal mode.
    pub async fn upsert(&self, entry: &ReadingEntry) -> DbResult<SaveOutcome> {
        let mut outcomes = self
            .save_entries(std::slice::from_ref(entry), WriteMode::Normal)
            .await?;
        outcomes
            .pop()
            .ok_or_else(|| DbError::Internal("save produced no outcome".to_string()))
    }

    /// Saves a batch of entries in one transaction.
    ///
    /// ## Rules
    /// - An entry with an id overwrites that row; without an id it is inserted
    /// - `sale_litre` is recomputed from the meter values
    /// - The stored status must allow the requested one, otherwise `Conflict`
    /// - `edited` requires [`WriteMode::Edit`]
    /// - In normal mode, closing a row with a non-zero closing seeds the
    ///   next shift's opening inside the same transaction
    ///
    /// Any failure rolls back the whole batch.
    pub async fn save_entries(
        &self,
        entries: &[ReadingEntry],
        mode: WriteMode,
    ) -> DbResult<Vec<SaveOutcome>> {
        validate_reading_batch(entries)?;
        if let WriteMode::Edit(permit) = mode {
            for entry in entries {
                permit.check_entry(&entry.pump_code, entry.stamp(), entry.status)?;
            }
        }

        debug!(count = entries.len(), edit = mode.is_edit(), "Saving reading entries");

        let mut tx = self.pool.begin().await?;
        let mut staged = StagedPartitions::default();
        let mut outcomes = Vec::with_capacity(entries.len());

        for entry in entries {
            let outcome = write_entry(&mut tx, &self.partitions, &mut staged, entry, mode).await?;
            outcomes.push(outcome);
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        self.partitions.commit(staged).await;

        info!(count = outcomes.len(), edit = mode.is_edit(), "Saved reading entries");
        Ok(outcomes)
    }

    /// Inserts the opening readings of a shift as pending rows.
    ///
    /// Used when a station starts using the ledger or a pump is added. A row
    /// that already exists for the same pump and shift is a `UniqueViolation`
    /// and rolls back the batch.
    pub async fn seed_opening_readings(&self, seeds: &[SeedReading]) -> DbResult<Vec<i64>> {
        if seeds.is_empty() {
            return Err(ValidationError::required("entries").into());
        }
        for seed in seeds {
            validate_seed_reading(seed)?;
        }

        let mut tx = self.pool.begin().await?;
        let mut staged = StagedPartitions::default();
        let mut ids = Vec::with_capacity(seeds.len());

        for seed in seeds {
            let partition_id = self
                .partitions
                .reading_partition(&mut tx, PartitionKey::for_date(seed.reading_date), &mut staged)
                .await?;

            let id = insert_pending(
                &mut tx,
                partition_id,
                &PendingRow {
                    pump_code: seed.pump_code.trim(),
                    product_code: seed.product_code.trim(),
                    product_name: seed.product_name.trim(),
                    opening: seed.opening_reading,
                    target: ShiftStamp::new(seed.reading_date, seed.shift),
                    session_date: seed.reading_date,
                },
            )
            .await?;
            ids.push(id);
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        self.partitions.commit(staged).await;

        info!(count = ids.len(), "Seeded opening readings");
        Ok(ids)
    }

    /// Most recent `(reading_date, shift)` with a closed or edited row.
    pub async fn latest_finalized(&self) -> DbResult<Option<ShiftStamp>> {
        let row: Option<(NaiveDate, Shift, ReadingStatus)> = sqlx::query_as(
            r#"
            SELECT reading_date, shift, status
            FROM pump_readings
            WHERE status IN ('closed', 'edited')
            ORDER BY reading_date DESC, shift DESC
            LIMIT 1
            "#,
        )
        .fetch_optional(&self.pool)
        .await?;

        Ok(edit_window::latest_finalized(
            row.map(|(date, shift, status)| (ShiftStamp::new(date, shift), status)),
        ))
    }

    /// Grants an edit permit for the operator session, if it is on the
    /// most recently closed shift.
    pub async fn open_edit_window(&self, session: &ShiftContext) -> DbResult<EditPermit> {
        let latest = self.latest_finalized().await?;
        match edit_window::authorize(latest, session) {
            Ok(permit) => {
                info!(shift = %permit.stamp(), "Edit window opened");
                Ok(permit)
            }
            Err(err) => {
                warn!(
                    session = %session.stamp(),
                    latest = ?latest.map(|s| s.to_string()),
                    "Edit window refused"
                );
                Err(err.into())
            }
        }
    }
}

// =============================================================================
// Transaction Helpers
// =============================================================================

/// Row for `(pump_code, shift, reading_date)` read through `conn`.
pub(crate) async fn fetch_by_key(
    conn: &mut SqliteConnection,
    pump_code: &str,
    shift: Shift,
    reading_date: NaiveDate,
) -> DbResult<Option<ReadingRecord>> {
    let record = sqlx::query_as::<_, ReadingRecord>(select_reading!(
        "WHERE pump_code = ?1 AND shift = ?2 AND reading_date = ?3"
    ))
    .bind(pump_code.trim())
    .bind(shift)
    .bind(reading_date)
    .fetch_optional(&mut *conn)
    .await?;
    Ok(record)
}

/// A seeded row: opening known, nothing entered yet.
pub(crate) struct PendingRow<'a> {
    pub pump_code: &'a str,
    pub product_code: &'a str,
    pub product_name: &'a str,
    pub opening: Litres,
    pub target: ShiftStamp,
    pub session_date: NaiveDate,
}

/// Inserts `row` with closing 0, sale 0 and status pending.
pub(crate) async fn insert_pending(
    conn: &mut SqliteConnection,
    partition_id: i64,
    row: &PendingRow<'_>,
) -> DbResult<i64> {
    let id = sqlx::query(
        r#"
        INSERT INTO pump_readings (
            partition_id, pump_code, product_code, product_name,
            opening_reading, closing_reading, sale_litre,
            shift, date, reading_date, status, created_at, updated_at
        ) VALUES (?1, ?2, ?3, ?4, ?5, 0, 0, ?6, ?7, ?8, 'pending', ?9, ?9)
        "#,
    )
    .bind(partition_id)
    .bind(row.pump_code)
    .bind(row.product_code)
    .bind(row.product_name)
    .bind(row.opening)
    .bind(row.target.shift)
    .bind(row.session_date)
    .bind(row.target.reading_date)
    .bind(Utc::now())
    .execute(&mut *conn)
    .await
    .map_err(|e| DbError::from(e).with_duplicate_value(format!("{}/{}", row.pump_code, row.target)))?
    .last_insert_rowid();

    Ok(id)
}

/// Checks a requested status against the stored one.
fn check_transition(
    mode: WriteMode,
    id: i64,
    pump_code: &str,
    from: ReadingStatus,
    to: ReadingStatus,
) -> DbResult<()> {
    match mode {
        WriteMode::Normal if to == ReadingStatus::Edited => {
            Err(CoreError::InvalidStatusTransition {
                pump_code: pump_code.to_string(),
                from,
                to,
            }
            .into())
        }
        WriteMode::Normal if !from.can_transition_to(to) => Err(DbError::conflict(
            "ReadingRecord",
            id,
            format!("{from} -> {to} is not allowed"),
        )),
        // Any finalized row may be rewritten, including an untouched closed
        // row re-saved as closed at the end of an edit.
        WriteMode::Edit(_) if !from.is_finalized() => Err(DbError::conflict(
            "ReadingRecord",
            id,
            format!("{from} row is not part of a closed shift"),
        )),
        _ => Ok(()),
    }
}

/// Writes one entry inside the caller's transaction.
pub(crate) async fn write_entry(
    conn: &mut SqliteConnection,
    partitions: &PartitionRegistry,
    staged: &mut StagedPartitions,
    entry: &ReadingEntry,
    mode: WriteMode,
) -> DbResult<SaveOutcome> {
    let pump_code = entry.pump_code.trim();
    let stamp = entry.stamp();
    let sale = entry.sale_litre();
    let partition_id = partitions
        .reading_partition(conn, PartitionKey::for_date(entry.reading_date), staged)
        .await?;
    let now = Utc::now();

    let outcome = match entry.id {
        Some(id) => {
            let stored: Option<(String, Shift, NaiveDate, ReadingStatus)> = sqlx::query_as(
                "SELECT pump_code, shift, reading_date, status FROM pump_readings WHERE id = ?1",
            )
            .bind(id)
            .fetch_optional(&mut *conn)
            .await?;
            let (stored_pump, stored_shift, stored_date, stored_status) =
                stored.ok_or_else(|| DbError::not_found("ReadingRecord", id))?;
            if let WriteMode::Edit(permit) = mode {
                permit.check_stored(
                    id,
                    &stored_pump,
                    ShiftStamp::new(stored_date, stored_shift),
                    pump_code,
                    stamp,
                )?;
            }
            check_transition(mode, id, pump_code, stored_status, entry.status)?;

            sqlx::query(
                r#"
                UPDATE pump_readings SET
                    partition_id = ?1, pump_code = ?2, product_code = ?3, product_name = ?4,
                    opening_reading = ?5, closing_reading = ?6, sale_litre = ?7,
                    shift = ?8, date = ?9, reading_date = ?10, status = ?11, updated_at = ?12
                WHERE id = ?13
                "#,
            )
            .bind(partition_id)
            .bind(pump_code)
            .bind(entry.product_code.trim())
            .bind(entry.product_name.trim())
            .bind(entry.opening_reading)
            .bind(entry.closing_reading)
            .bind(sale)
            .bind(entry.shift)
            .bind(entry.session_date())
            .bind(entry.reading_date)
            .bind(entry.status)
            .bind(now)
            .bind(id)
            .execute(&mut *conn)
            .await
            .map_err(|e| DbError::from(e).with_duplicate_value(format!("{pump_code}/{stamp}")))?;

            debug!(
                id,
                pump_code = %pump_code,
                from = %stored_status,
                to = %entry.status,
                "Updated reading"
            );
            SaveOutcome {
                id,
                action: SaveAction::Updated,
            }
        }
        None => {
            if !mode.is_edit() {
                check_transition(mode, 0, pump_code, ReadingStatus::Pending, entry.status)?;
            }

            let id = sqlx::query(
                r#"
                INSERT INTO pump_readings (
                    partition_id, pump_code, product_code, product_name,
                    opening_reading, closing_reading, sale_litre,
                    shift, date, reading_date, status, created_at, updated_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?12)
                "#,
            )
            .bind(partition_id)
            .bind(pump_code)
            .bind(entry.product_code.trim())
            .bind(entry.product_name.trim())
            .bind(entry.opening_reading)
            .bind(entry.closing_reading)
            .bind(sale)
            .bind(entry.shift)
            .bind(entry.session_date())
            .bind(entry.reading_date)
            .bind(entry.status)
            .bind(now)
            .execute(&mut *conn)
            .await
            .map_err(|e| DbError::from(e).with_duplicate_value(format!("{pump_code}/{stamp}")))?
            .last_insert_rowid();

            debug!(id, pump_code = %pump_code, status = %entry.status, "Inserted reading");
            SaveOutcome {
                id,
                action: SaveAction::Inserted,
            }
        }
    };

    if mode == WriteMode::Normal && entry.closes_with_reading() {
        propagate_closing(
            conn,
            partitions,
            staged,
            &SuccessorSource {
                pump_code,
                product_code: entry.product_code.trim(),
                product_name: entry.product_name.trim(),
                closing: entry.closing_reading,
                closed: stamp,
            },
        )
        .await?;
    }

    Ok(outcome)
}

// =============================================================================
// Unit Tests
// =============================================================================
