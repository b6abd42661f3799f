//! # Partition Registry
//!
//! Resolves a reading month or bill fiscal year to its partition row,
//! creating the row on first use.
//!
//! ## Provisioning Flow
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  write path (inside the caller's transaction)                          │
//! │                                                                         │
//! │  PartitionKey(2025, 6)                                                 │
//! │       │                                                                 │
//! │       ├── cached? ─────────────────────────────► id                     │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  INSERT ... ON CONFLICT DO NOTHING   (idempotent, same tx)             │
//! │  SELECT id                                                             │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  StagedPartitions  ──(tx commits)──► registry.commit(staged)           │
//! │                    ──(tx rolls back)──► dropped, nothing cached        │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Partitions are identified by rows and foreign keys. No table name or any
//! other SQL text is ever built from a partition key.

use std::collections::HashMap;

use chrono::Utc;
use sqlx::{SqliteConnection, SqlitePool};
use tokio::sync::RwLock;
use tracing::{debug, info};

use crate::error::DbResult;
use fuelbook_core::{FiscalYear, PartitionKey};

/// Row id of a partition.
pub type PartitionId = i64;

// =============================================================================
// Staged Handles
// =============================================================================

/// Partition handles resolved inside a transaction that has not committed.
#[derive(Debug, Default)]
pub struct StagedPartitions {
    readings: Vec<(PartitionKey, PartitionId)>,
    bills: Vec<(FiscalYear, PartitionId)>,
}

impl StagedPartitions {
    pub fn is_empty(&self) -> bool {
        self.readings.is_empty() && self.bills.is_empty()
    }
}

// =============================================================================
// Registry
// =============================================================================

/// Cache of committed partition handles.
#[derive(Debug, Default)]
pub struct PartitionRegistry {
    readings: RwLock<HashMap<PartitionKey, PartitionId>>,
    bills: RwLock<HashMap<FiscalYear, PartitionId>>,
}

impl PartitionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Reading partition for `key`, provisioned in `conn` if missing.
    ///
    /// The handle is staged, not cached; call [`commit`](Self::commit) once
    /// the transaction owning `conn` has committed.
    pub async fn reading_partition(
        &self,
        conn: &mut SqliteConnection,
        key: PartitionKey,
        staged: &mut StagedPartitions,
    ) -> DbResult<PartitionId> {
        if let Some(id) = self.readings.read().await.get(&key).copied() {
            return Ok(id);
        }
        if let Some((_, id)) = staged.readings.iter().find(|(k, _)| *k == key) {
            return Ok(*id);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO reading_partitions (year, month, created_at)
            VALUES (?1, ?2, ?3)
            ON CONFLICT (year, month) DO NOTHING
            "#,
        )
        .bind(key.year)
        .bind(key.month as i64)
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?
        .rows_affected();

        let id: PartitionId =
            sqlx::query_scalar("SELECT id FROM reading_partitions WHERE year = ?1 AND month = ?2")
                .bind(key.year)
                .bind(key.month as i64)
                .fetch_one(&mut *conn)
                .await?;

        if inserted > 0 {
            info!(partition = %key, id, "Provisioned reading partition");
        } else {
            debug!(partition = %key, id, "Resolved reading partition");
        }

        staged.readings.push((key, id));
        Ok(id)
    }

    /// Bill partition for `year`, provisioned in `conn` if missing.
    pub async fn bill_partition(
        &self,
        conn: &mut SqliteConnection,
        year: FiscalYear,
        staged: &mut StagedPartitions,
    ) -> DbResult<PartitionId> {
        if let Some(id) = self.bills.read().await.get(&year).copied() {
            return Ok(id);
        }
        if let Some((_, id)) = staged.bills.iter().find(|(y, _)| *y == year) {
            return Ok(*id);
        }

        let inserted = sqlx::query(
            r#"
            INSERT INTO bill_partitions (fiscal_year, created_at)
            VALUES (?1, ?2)
            ON CONFLICT (fiscal_year) DO NOTHING
            "#,
        )
        .bind(year.start_year())
        .bind(Utc::now())
        .execute(&mut *conn)
        .await?
        .rows_affected();

        let id: PartitionId =
            sqlx::query_scalar("SELECT id FROM bill_partitions WHERE fiscal_year = ?1")
                .bind(year.start_year())
                .fetch_one(&mut *conn)
                .await?;

        if inserted > 0 {
            info!(fiscal_year = %year, id, "Provisioned bill partition");
        }

        staged.bills.push((year, id));
        Ok(id)
    }

    /// Looks up an existing reading partition without creating it.
    ///
    /// Used by read paths: a month nobody wrote to simply has no rows.
    pub async fn find_reading_partition(
        &self,
        pool: &SqlitePool,
        key: PartitionKey,
    ) -> DbResult<Option<PartitionId>> {
        if let Some(id) = self.readings.read().await.get(&key).copied() {
            return Ok(Some(id));
        }

        let id: Option<PartitionId> =
            sqlx::query_scalar("SELECT id FROM reading_partitions WHERE year = ?1 AND month = ?2")
                .bind(key.year)
                .bind(key.month as i64)
                .fetch_optional(pool)
                .await?;

        if let Some(id) = id {
            self.readings.write().await.insert(key, id);
        }
        Ok(id)
    }

    /// Looks up an existing bill partition without creating it.
    pub async fn find_bill_partition(
        &self,
        pool: &SqlitePool,
        year: FiscalYear,
    ) -> DbResult<Option<PartitionId>> {
        if let Some(id) = self.bills.read().await.get(&year).copied() {
            return Ok(Some(id));
        }

        let id: Option<PartitionId> =
            sqlx::query_scalar("SELECT id FROM bill_partitions WHERE fiscal_year = ?1")
                .bind(year.start_year())
                .fetch_optional(pool)
                .await?;

        if let Some(id) = id {
            self.bills.write().await.insert(year, id);
        }
        Ok(id)
    }

    /// Caches handles staged by a transaction that has now committed.
    pub async fn commit(&self, staged: StagedPartitions) {
        if staged.is_empty() {
            return;
        }
        if !staged.readings.is_empty() {
            self.readings.write().await.extend(staged.readings);
        }
        if !staged.bills.is_empty() {
            self.bills.write().await.extend(staged.bills);
        }
    }

    /// Number of cached reading partitions.
    pub async fn cached_reading_partitions(&self) -> usize {
        self.readings.read().await.len()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
