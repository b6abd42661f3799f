use serde::{Deserialize, Serialize};
use tracing::{debug, info};

use crate::error::ApiError;
use crate::service::StationService;
use fuelbook_core::{NewPumpConfig, PumpConfig};

/// Pump configuration DTO for the setup screen.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PumpConfigDto {
    pub id: i64,
    pub pump_code: String,
    pub product_code: String,
    pub product_name: String,
}

impl From<PumpConfig> for PumpConfigDto {
    fn from(p: PumpConfig) -> Self {
        PumpConfigDto {
            id: p.id,
            pump_code: p.pump_code,
            product_code: p.product_code,
            product_name: p.product_name,
        }
    }
}

/// A pump to create.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct NewPumpConfigDto {
    pub pump_code: String,
    pub product_code: String,
    pub product_name: String,
}

impl From<NewPumpConfigDto> for NewPumpConfig {
    fn from(dto: NewPumpConfigDto) -> Self {
        NewPumpConfig {
            pump_code: dto.pump_code,
            product_code: dto.product_code,
            product_name: dto.product_name,
        }
    }
}

impl StationService {
    /// All pumps, ordered by pump code.
    pub async fn list_pump_configurations(&self) -> Result<Vec<PumpConfigDto>, ApiError> {
        debug!("list_pump_configurations command");
        let pumps = self.db().pump_configs().list().await?;
        Ok(pumps.into_iter().map(PumpConfigDto::from).collect())
    }

    /// Creates pumps; all or nothing.
    pub async fn create_pump_configurations(
        &self,
        configs: Vec<NewPumpConfigDto>,
    ) -> Result<(), ApiError> {
        debug!(count = configs.len(), "create_pump_configurations command");
        let configs: Vec<NewPumpConfig> = configs.into_iter().map(NewPumpConfig::from).collect();
        self.db().pump_configs().create_many(&configs).await?;
        Ok(())
    }

    /// Renames a pump. Recorded readings keep their old code.
    pub async fn rename_pump(&self, id: i64, pump_code: &str) -> Result<(), ApiError> {
        self.db().pump_configs().rename(id, pump_code).await?;
        info!(id, pump_code = %pump_code.trim(), "Pump renamed");
        Ok(())
    }
}
