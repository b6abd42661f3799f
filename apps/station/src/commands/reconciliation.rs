use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::service::StationService;
use fuelbook_core::reconciliation::reconcile;
use fuelbook_core::{Anomaly, ProductReconciliation, ReconciliationReport, Shift, ShiftStamp};

/// One product's line on the shift report.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProductReconciliationDto {
    pub product_code: Option<String>,
    pub product_name: String,
    pub pump_count: u32,
    pub opening_total: String,
    pub closing_total: String,
    pub sale_total: String,
    pub bill_qty: String,
    pub bill_count: i64,
    pub difference: String,
    /// Human-readable notes, one per anomaly.
    pub anomalies: Vec<String>,
}

fn describe(anomaly: &Anomaly) -> String {
    match anomaly {
        Anomaly::Variance { difference } => {
            format!("Metered and billed volume differ by {} L", difference)
        }
        Anomaly::NegativeSale { pump_code, sale } => {
            format!("Pump {} closed below its opening ({} L)", pump_code, sale)
        }
        Anomaly::BilledWithoutMeter { bill_qty } => {
            format!("{} L billed with no pump reading", bill_qty)
        }
    }
}

impl From<ProductReconciliation> for ProductReconciliationDto {
    fn from(p: ProductReconciliation) -> Self {
        ProductReconciliationDto {
            anomalies: p.anomalies.iter().map(describe).collect(),
            product_code: p.product_code,
            product_name: p.product_name,
            pump_count: p.pump_count,
            opening_total: p.opening_total.to_string(),
            closing_total: p.closing_total.to_string(),
            sale_total: p.sale_total.to_string(),
            bill_qty: p.bill_qty.to_string(),
            bill_count: p.bill_count,
            difference: p.difference.to_string(),
        }
    }
}

/// Metered versus billed volume for one shift.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReconciliationDto {
    pub shift: Shift,
    pub reading_date: NaiveDate,
    pub products: Vec<ProductReconciliationDto>,
    pub sale_total: String,
    pub bill_total: String,
    pub difference: String,
    pub has_anomalies: bool,
}

impl From<ReconciliationReport> for ReconciliationDto {
    fn from(r: ReconciliationReport) -> Self {
        ReconciliationDto {
            has_anomalies: r.has_anomalies(),
            shift: r.shift,
            reading_date: r.reading_date,
            products: r.products.into_iter().map(ProductReconciliationDto::from).collect(),
            sale_total: r.sale_total.to_string(),
            bill_total: r.bill_total.to_string(),
            difference: r.difference.to_string(),
        }
    }
}

impl StationService {
    /// Reconciles a shift's meter sales against its bills.
    ///
    /// Informational: anomalies never block a save.
    pub async fn reconcile(
        &self,
        shift: Shift,
        date: NaiveDate,
    ) -> Result<ReconciliationDto, ApiError> {
        debug!(shift = %shift, date = %date, "reconcile command");
        let readings = self.db().readings().list_by_shift_date(shift, date).await?;
        let bills = self.db().bills().product_totals(date, shift).await?;

        let report = reconcile(ShiftStamp::new(date, shift), &readings, &bills);
        if report.has_anomalies() {
            info!(
                shift = %shift,
                date = %date,
                difference = %report.difference,
                "Shift reconciliation has anomalies"
            );
        }
        Ok(report.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::service::tests::{entry_dto, may, seeded_station, service};
    use fuelbook_core::ReadingStatus;

    #[tokio::test]
    async fn test_missing_bills_count_as_zero() {
        let station = seeded_station().await;
        let row = station.get_readings(Shift::Day, may(1)).await.unwrap().remove(0);
        station
            .save_entries(
                vec![entry_dto(Some(row.id), "1000.00", "1250.25", Shift::Day, may(1), ReadingStatus::Closed)],
                None,
            )
            .await
            .unwrap();

        let report = station.reconcile(Shift::Day, may(1)).await.unwrap();
        assert_eq!(report.sale_total, "250.25");
        assert_eq!(report.bill_total, "0.00");
        assert_eq!(report.difference, "250.25");
        assert_eq!(report.products[0].bill_count, 0);
    }

    #[tokio::test]
    async fn test_negative_sale_is_flagged_not_rejected() {
        let station = seeded_station().await;
        let row = station.get_readings(Shift::Day, may(1)).await.unwrap().remove(0);
        station
            .save_entries(
                vec![entry_dto(Some(row.id), "1000.00", "990.00", Shift::Day, may(1), ReadingStatus::Active)],
                None,
            )
            .await
            .unwrap();

        let report = station.reconcile(Shift::Day, may(1)).await.unwrap();
        assert_eq!(report.products[0].sale_total, "-10.00");
        assert!(report.products[0]
            .anomalies
            .iter()
            .any(|a| a.contains("closed below its opening")));
    }

    #[tokio::test]
    async fn test_empty_shift() {
        let station = service().await;
        let report = station.reconcile(Shift::Night, may(9)).await.unwrap();
        assert!(report.products.is_empty());
        assert_eq!(report.difference, "0.00");
        assert!(!report.has_anomalies);
    }

    #[test]
    fn test_anomaly_descriptions() {
        let text = describe(&Anomaly::BilledWithoutMeter {
            bill_qty: "40".parse().unwrap(),
        });
        assert_eq!(text, "40.00 L billed with no pump reading");
    }
}
