use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::commands::parse_litres;
use crate::error::ApiError;
use crate::service::StationService;
use fuelbook_core::{Bill, BillLine, SaleMode, Shift, ValidationError};

/// One product line of a bill.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillLineDto {
    pub product_code: String,
    pub product_name: String,
    pub qty: String,
    pub rate_paise: i64,
    pub amount_paise: i64,
}

/// A bill issued at the counter.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BillDto {
    pub bill_number: i64,
    pub bill_date: NaiveDate,
    #[serde(default)]
    pub party_name: Option<String>,
    #[serde(default)]
    pub vehicle_number: Option<String>,
    pub mode_of_sales: SaleMode,
    pub shift_no: Shift,
    pub shift_date: NaiveDate,
    pub lines: Vec<BillLineDto>,
}

impl TryFrom<BillDto> for Bill {
    type Error = ValidationError;

    fn try_from(dto: BillDto) -> Result<Self, Self::Error> {
        let lines = dto
            .lines
            .into_iter()
            .map(|line| {
                Ok(BillLine {
                    qty: parse_litres("qty", &line.qty)?,
                    product_code: line.product_code,
                    product_name: line.product_name,
                    rate_paise: line.rate_paise,
                    amount_paise: line.amount_paise,
                })
            })
            .collect::<Result<Vec<_>, ValidationError>>()?;

        Ok(Bill {
            bill_number: dto.bill_number,
            bill_date: dto.bill_date,
            party_name: dto.party_name.filter(|s| !s.trim().is_empty()),
            vehicle_number: dto.vehicle_number.filter(|s| !s.trim().is_empty()),
            mode_of_sales: dto.mode_of_sales,
            shift_no: dto.shift_no,
            shift_date: dto.shift_date,
            lines,
        })
    }
}

impl StationService {
    /// Records a bill in the ledger of its fiscal year.
    pub async fn record_bill(&self, bill: BillDto) -> Result<(), ApiError> {
        debug!(bill_number = bill.bill_number, "record_bill command");
        let bill = Bill::try_from(bill)?;
        self.db().bills().record_bill(&bill).await?;
        Ok(())
    }

    /// Number to print on the next bill issued on `today`.
    pub async fn next_bill_number(&self, today: NaiveDate) -> Result<i64, ApiError> {
        Ok(self.db().bills().next_bill_number(today).await?)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorCode;
    use crate::service::tests::{may, service};

    fn bill(number: i64, qty: &str) -> BillDto {
        BillDto {
            bill_number: number,
            bill_date: may(3),
            party_name: Some(" ".to_string()),
            vehicle_number: None,
            mode_of_sales: SaleMode::Cash,
            shift_no: Shift::Night,
            shift_date: may(3),
            lines: vec![BillLineDto {
                product_code: "MS".to_string(),
                product_name: "PETROL".to_string(),
                qty: qty.to_string(),
                rate_paise: 10_200,
                amount_paise: 204_000,
            }],
        }
    }

    #[tokio::test]
    async fn test_numbering_follows_recorded_bills() {
        let station = service().await;
        assert_eq!(station.next_bill_number(may(3)).await.unwrap(), 100);

        station.record_bill(bill(100, "20")).await.unwrap();
        assert_eq!(station.next_bill_number(may(3)).await.unwrap(), 101);

        let err = station.record_bill(bill(100, "5")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[tokio::test]
    async fn test_zero_quantity_rejected() {
        let station = service().await;
        let err = station.record_bill(bill(100, "0.00")).await.unwrap_err();
        assert_eq!(err.code, ErrorCode::ValidationError);
    }

    #[test]
    fn test_blank_party_dropped() {
        let parsed = Bill::try_from(bill(100, "20.5")).unwrap();
        assert_eq!(parsed.party_name, None);
        assert_eq!(parsed.lines[0].qty.to_string(), "20.50");
    }
}
