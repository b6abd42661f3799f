//! # Bill Repository
//!
//! The counter's bill ledger, partitioned by April-March fiscal year.
//!
//! Only what reconciliation and bill numbering need lives here: bill lines
//! with product, quantity and the shift they were sold in.
//!
//! ```text
//! record_bill(bill)           ──► partition of FY(bill_date), one row per line
//! next_bill_number(today)     ──► MAX(bill_number) + 1 in FY(today), from 100
//! product_totals(date, shift) ──► partition of FY(date), grouped by product
//! ```

use std::sync::Arc;

use chrono::{NaiveDate, Utc};
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use crate::partition::{PartitionRegistry, StagedPartitions};
use fuelbook_core::validation::validate_bill;
use fuelbook_core::{Bill, BillTotals, FiscalYear, Shift, FIRST_BILL_NUMBER};

/// Repository for bill lines.
#[derive(Debug, Clone)]
pub struct BillRepository {
    pool: SqlitePool,
    partitions: Arc<PartitionRegistry>,
}

impl BillRepository {
    /// Creates a new BillRepository.
    pub fn new(pool: SqlitePool, partitions: Arc<PartitionRegistry>) -> Self {
        BillRepository { pool, partitions }
    }

    /// Records a bill, one row per product line.
    ///
    /// The bill lands in the fiscal year of its bill date. Reusing a bill
    /// number in the same fiscal year is a `UniqueViolation`.
    pub async fn record_bill(&self, bill: &Bill) -> DbResult<()> {
        validate_bill(bill)?;
        let year = FiscalYear::for_date(bill.bill_date);

        let mut tx = self.pool.begin().await?;
        let mut staged = StagedPartitions::default();
        let partition_id = self
            .partitions
            .bill_partition(&mut tx, year, &mut staged)
            .await?;
        let now = Utc::now();

        for line in &bill.lines {
            sqlx::query(
                r#"
                INSERT INTO bill_lines (
                    partition_id, bill_number, bill_date, party_name, vehicle_number,
                    mode_of_sales, shift_no, shift_date,
                    product_code, product_name, qty, rate_paise, amount_paise, created_at
                ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)
                "#,
            )
            .bind(partition_id)
            .bind(bill.bill_number)
            .bind(bill.bill_date)
            .bind(bill.party_name.as_deref())
            .bind(bill.vehicle_number.as_deref())
            .bind(bill.mode_of_sales)
            .bind(bill.shift_no)
            .bind(bill.shift_date)
            .bind(line.product_code.trim())
            .bind(line.product_name.trim())
            .bind(line.qty)
            .bind(line.rate_paise)
            .bind(line.amount_paise)
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::from(e).with_duplicate_value(bill.bill_number.to_string()))?;
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;
        self.partitions.commit(staged).await;

        info!(
            bill_number = bill.bill_number,
            fiscal_year = %year,
            lines = bill.lines.len(),
            "Recorded bill"
        );
        Ok(())
    }

    /// Next free bill number in the fiscal year of `today`.
    ///
    /// Numbering restarts at 100 each fiscal year.
    pub async fn next_bill_number(&self, today: NaiveDate) -> DbResult<i64> {
        let year = FiscalYear::current(today);
        let Some(partition_id) = self.partitions.find_bill_partition(&self.pool, year).await?
        else {
            return Ok(FIRST_BILL_NUMBER);
        };

        let max: Option<i64> =
            sqlx::query_scalar("SELECT MAX(bill_number) FROM bill_lines WHERE partition_id = ?1")
                .bind(partition_id)
                .fetch_one(&self.pool)
                .await?;

        let next = max.map_or(FIRST_BILL_NUMBER, |n| (n + 1).max(FIRST_BILL_NUMBER));
        debug!(fiscal_year = %year, next, "Next bill number");
        Ok(next)
    }

    /// Billed quantity and bill count per product for one shift.
    pub async fn product_totals(
        &self,
        shift_date: NaiveDate,
        shift: Shift,
    ) -> DbResult<Vec<BillTotals>> {
        let year = FiscalYear::for_date(shift_date);
        let Some(partition_id) = self.partitions.find_bill_partition(&self.pool, year).await?
        else {
            return Ok(Vec::new());
        };

        let totals = sqlx::query_as::<_, BillTotals>(
            r#"
            SELECT
                product_name,
                SUM(qty) AS total_qty,
                COUNT(DISTINCT bill_number) AS bill_count
            FROM bill_lines
            WHERE partition_id = ?1 AND shift_date = ?2 AND shift_no = ?3
            GROUP BY product_name
            ORDER BY product_name
            "#,
        )
        .bind(partition_id)
        .bind(shift_date)
        .bind(shift)
        .fetch_all(&self.pool)
        .await?;

        debug!(
            shift_date = %shift_date,
            shift = %shift,
            products = totals.len(),
            "Loaded bill totals"
        );
        Ok(totals)
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use fuelbook_core::{BillLine, Litres, SaleMode};

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn bill(number: i64, day: NaiveDate, shift: Shift, lines: &[(&str, i64)]) -> Bill {
        Bill {
            bill_number: number,
            bill_date: day,
            party_name: None,
            vehicle_number: None,
            mode_of_sales: SaleMode::Cash,
            shift_no: shift,
            shift_date: day,
            lines: lines
                .iter()
                .map(|(product, qty)| BillLine {
                    product_code: product.to_uppercase(),
                    product_name: product.to_string(),
                    qty: Litres::from_whole(*qty),
                    rate_paise: 10_000,
                    amount_paise: qty * 10_000,
                })
                .collect(),
        }
    }

    #[tokio::test]
    async fn test_bill_numbers_start_at_100() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let bills = db.bills();
        let day = date(2025, 5, 1);

        assert_eq!(bills.next_bill_number(day).await.unwrap(), 100);
        bills.record_bill(&bill(100, day, Shift::Day, &[("DIESEL", 40)])).await.unwrap();
        bills.record_bill(&bill(101, day, Shift::Day, &[("DIESEL", 10)])).await.unwrap();
        assert_eq!(bills.next_bill_number(day).await.unwrap(), 102);

        // New fiscal year starts over.
        assert_eq!(bills.next_bill_number(date(2026, 4, 1)).await.unwrap(), 100);
        // Still the 2025-26 year.
        assert_eq!(bills.next_bill_number(date(2026, 3, 31)).await.unwrap(), 102);
    }

    #[tokio::test]
    async fn test_product_totals_per_shift() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let bills = db.bills();
        let day = date(2025, 5, 1);

        bills
            .record_bill(&bill(100, day, Shift::Day, &[("DIESEL", 300), ("PETROL", 20)]))
            .await
            .unwrap();
        bills.record_bill(&bill(101, day, Shift::Day, &[("DIESEL", 180)])).await.unwrap();
        bills.record_bill(&bill(102, day, Shift::Night, &[("DIESEL", 50)])).await.unwrap();

        let totals = bills.product_totals(day, Shift::Day).await.unwrap();
        assert_eq!(
            totals,
            vec![
                BillTotals {
                    product_name: "DIESEL".to_string(),
                    total_qty: Litres::from_whole(480),
                    bill_count: 2,
                },
                BillTotals {
                    product_name: "PETROL".to_string(),
                    total_qty: Litres::from_whole(20),
                    bill_count: 1,
                },
            ]
        );

        assert!(bills
            .product_totals(date(2024, 5, 1), Shift::Day)
            .await
            .unwrap()
            .is_empty());
    }

    #[tokio::test]
    async fn test_reused_bill_number_rejected() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let bills = db.bills();
        let day = date(2025, 5, 1);

        bills.record_bill(&bill(100, day, Shift::Day, &[("DIESEL", 40)])).await.unwrap();
        let err = bills
            .record_bill(&bill(100, day, Shift::Day, &[("DIESEL", 5)]))
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref value, .. } if value == "100"));
    }
}
