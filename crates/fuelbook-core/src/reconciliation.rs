//! # Reconciliation
//!
//! Metered volume versus billed volume, per product, for one shift.
//!
//! ```text
//! ┌──────────────────────┐     ┌──────────────────────┐
//! │  ReadingRecord × N   │     │   BillTotals × M     │
//! │  (one per pump)      │     │  (one per product)   │
//! └──────────┬───────────┘     └──────────┬───────────┘
//!            │ group by product_name      │
//!            └─────────────┬──────────────┘
//!                          ▼
//!            ProductReconciliation
//!            difference = sale_total - bill_qty
//!            anomalies  (informational only)
//! ```
//!
//! Products are keyed by name because that is what the bill ledger reports.
//! Nothing here blocks a save; anomalies are for the shift report.

use std::collections::BTreeMap;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::litres::Litres;
use crate::shift::{Shift, ShiftStamp};
use crate::types::{BillTotals, ReadingRecord};

// =============================================================================
// Report Types
// =============================================================================

/// Something on the report worth a second look.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[serde(tag = "kind", rename_all = "snake_case")]
#[ts(export)]
pub enum Anomaly {
    /// Metered and billed volume disagree.
    Variance { difference: Litres },
    /// A pump's closing is below its opening.
    NegativeSale { pump_code: String, sale: Litres },
    /// Bills exist for a product no pump dispensed this shift.
    BilledWithoutMeter { bill_qty: Litres },
}

/// One product's line on the report.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductReconciliation {
    /// `None` when the product only appears on bills.
    pub product_code: Option<String>,
    pub product_name: String,
    pub pump_count: u32,
    pub opening_total: Litres,
    pub closing_total: Litres,
    pub sale_total: Litres,
    pub bill_qty: Litres,
    pub bill_count: i64,
    pub difference: Litres,
    pub anomalies: Vec<Anomaly>,
}

impl ProductReconciliation {
    fn empty(product_name: &str) -> Self {
        ProductReconciliation {
            product_code: None,
            product_name: product_name.to_string(),
            pump_count: 0,
            opening_total: Litres::zero(),
            closing_total: Litres::zero(),
            sale_total: Litres::zero(),
            bill_qty: Litres::zero(),
            bill_count: 0,
            difference: Litres::zero(),
            anomalies: Vec::new(),
        }
    }
}

/// Reconciliation of a whole shift.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ReconciliationReport {
    #[ts(as = "u8")]
    pub shift: Shift,
    #[ts(as = "String")]
    pub reading_date: NaiveDate,
    /// Ordered by product name.
    pub products: Vec<ProductReconciliation>,
    pub sale_total: Litres,
    pub bill_total: Litres,
    pub difference: Litres,
}

impl ReconciliationReport {
    /// True when any product carries an anomaly.
    pub fn has_anomalies(&self) -> bool {
        self.products.iter().any(|p| !p.anomalies.is_empty())
    }
}

// =============================================================================
// Aggregation
// =============================================================================

/// Builds the report for `stamp` from its reading rows and bill totals.
///
/// Rows for other shifts are ignored. A product with no bills gets a bill
/// quantity of zero.
pub fn reconcile(
    stamp: ShiftStamp,
    readings: &[ReadingRecord],
    bills: &[BillTotals],
) -> ReconciliationReport {
    let mut products: BTreeMap<&str, ProductReconciliation> = BTreeMap::new();

    for row in readings.iter().filter(|r| r.stamp() == stamp) {
        let line = products
            .entry(row.product_name.as_str())
            .or_insert_with(|| ProductReconciliation::empty(&row.product_name));

        if line.product_code.is_none() {
            line.product_code = Some(row.product_code.clone());
        }
        line.pump_count += 1;
        line.opening_total += row.opening_reading;
        line.closing_total += row.closing_reading;
        line.sale_total += row.sale_litre;

        if row.sale_litre.is_negative() {
            line.anomalies.push(Anomaly::NegativeSale {
                pump_code: row.pump_code.clone(),
                sale: row.sale_litre,
            });
        }
    }

    for bill in bills {
        let line = products
            .entry(bill.product_name.as_str())
            .or_insert_with(|| ProductReconciliation::empty(&bill.product_name));
        line.bill_qty += bill.total_qty;
        line.bill_count += bill.bill_count;
    }

    let mut report = ReconciliationReport {
        shift: stamp.shift,
        reading_date: stamp.reading_date,
        products: Vec::with_capacity(products.len()),
        sale_total: Litres::zero(),
        bill_total: Litres::zero(),
        difference: Litres::zero(),
    };

    for (_, mut line) in products {
        line.difference = line.sale_total - line.bill_qty;

        if line.pump_count == 0 && !line.bill_qty.is_zero() {
            line.anomalies.push(Anomaly::BilledWithoutMeter {
                bill_qty: line.bill_qty,
            });
        } else if !line.difference.is_zero() {
            line.anomalies.push(Anomaly::Variance {
                difference: line.difference,
            });
        }

        report.sale_total += line.sale_total;
        report.bill_total += line.bill_qty;
        report.products.push(line);
    }
    report.difference = report.sale_total - report.bill_total;

    report
}

// =============================================================================
// Unit Tests
// =============================================================================
