//! # Pump Configuration Repository
//!
//! Which product each pump dispenses. Rows are created from the setup
//! screen, pump codes can be renamed, and nothing is ever deleted.

use chrono::Utc;
use sqlx::SqlitePool;
use tracing::{debug, info};

use crate::error::{DbError, DbResult};
use fuelbook_core::validation::{validate_new_pump_config, validate_pump_code};
use fuelbook_core::{NewPumpConfig, PumpConfig, ValidationError};

/// Repository for pump configuration rows.
#[derive(Debug, Clone)]
pub struct PumpConfigRepository {
    pool: SqlitePool,
}

impl PumpConfigRepository {
    /// Creates a new PumpConfigRepository.
    pub fn new(pool: SqlitePool) -> Self {
        PumpConfigRepository { pool }
    }

    /// All pumps, ordered by pump code.
    pub async fn list(&self) -> DbResult<Vec<PumpConfig>> {
        let pumps = sqlx::query_as::<_, PumpConfig>(
            r#"
            SELECT id, pump_code, product_code, product_name, created_at, updated_at
            FROM pump_configurations
            ORDER BY pump_code
            "#,
        )
        .fetch_all(&self.pool)
        .await?;

        debug!(count = pumps.len(), "Listed pump configurations");
        Ok(pumps)
    }

    /// Gets a pump by its code.
    pub async fn get_by_code(&self, pump_code: &str) -> DbResult<Option<PumpConfig>> {
        let pump = sqlx::query_as::<_, PumpConfig>(
            r#"
            SELECT id, pump_code, product_code, product_name, created_at, updated_at
            FROM pump_configurations
            WHERE pump_code = ?1
            "#,
        )
        .bind(pump_code.trim())
        .fetch_optional(&self.pool)
        .await?;

        Ok(pump)
    }

    /// Creates several pumps in one transaction.
    ///
    /// A duplicate code (in the batch or already stored) rolls back the
    /// whole batch.
    pub async fn create_many(&self, configs: &[NewPumpConfig]) -> DbResult<Vec<i64>> {
        if configs.is_empty() {
            return Err(ValidationError::required("pump_configurations").into());
        }
        for config in configs {
            validate_new_pump_config(config)?;
        }

        let mut tx = self.pool.begin().await?;
        let mut ids = Vec::with_capacity(configs.len());
        let now = Utc::now();

        for config in configs {
            let pump_code = config.pump_code.trim();
            let id = sqlx::query(
                r#"
                INSERT INTO pump_configurations
                    (pump_code, product_code, product_name, created_at, updated_at)
                VALUES (?1, ?2, ?3, ?4, ?4)
                "#,
            )
            .bind(pump_code)
            .bind(config.product_code.trim())
            .bind(config.product_name.trim())
            .bind(now)
            .execute(&mut *tx)
            .await
            .map_err(|e| DbError::from(e).with_duplicate_value(pump_code))?
            .last_insert_rowid();

            ids.push(id);
        }

        tx.commit()
            .await
            .map_err(|e| DbError::TransactionFailed(e.to_string()))?;

        info!(count = ids.len(), "Created pump configurations");
        Ok(ids)
    }

    /// Renames a pump.
    ///
    /// Existing reading rows keep the code they were recorded under.
    pub async fn rename(&self, id: i64, pump_code: &str) -> DbResult<()> {
        validate_pump_code(pump_code)?;
        let pump_code = pump_code.trim();

        let updated = sqlx::query(
            r#"
            UPDATE pump_configurations
            SET pump_code = ?1, updated_at = ?2
            WHERE id = ?3
            "#,
        )
        .bind(pump_code)
        .bind(Utc::now())
        .bind(id)
        .execute(&self.pool)
        .await
        .map_err(|e| DbError::from(e).with_duplicate_value(pump_code))?
        .rows_affected();

        if updated == 0 {
            return Err(DbError::not_found("PumpConfig", id));
        }

        info!(id, pump_code = %pump_code, "Renamed pump");
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};

    fn pump(code: &str, product: &str) -> NewPumpConfig {
        NewPumpConfig {
            pump_code: code.to_string(),
            product_code: product.to_uppercase(),
            product_name: product.to_string(),
        }
    }

    #[tokio::test]
    async fn test_create_and_list() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.pump_configs();

        repo.create_many(&[pump("P2", "PETROL"), pump("P1", "DIESEL")])
            .await
            .unwrap();

        let pumps = repo.list().await.unwrap();
        assert_eq!(pumps.len(), 2);
        assert_eq!(pumps[0].pump_code, "P1");
        assert_eq!(pumps[0].product_name, "DIESEL");
    }

    #[tokio::test]
    async fn test_duplicate_rolls_back_batch() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.pump_configs();
        repo.create_many(&[pump("P1", "DIESEL")]).await.unwrap();

        let err = repo
            .create_many(&[pump("P2", "PETROL"), pump("P1", "DIESEL")])
            .await
            .unwrap_err();
        assert!(matches!(err, DbError::UniqueViolation { ref value, .. } if value == "P1"));

        assert!(repo.get_by_code("P2").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_rename() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let repo = db.pump_configs();
        let ids = repo.create_many(&[pump("P1", "DIESEL")]).await.unwrap();

        repo.rename(ids[0], "DU-1").await.unwrap();
        assert!(repo.get_by_code("DU-1").await.unwrap().is_some());
        assert!(repo.get_by_code("P1").await.unwrap().is_none());

        assert!(matches!(
            repo.rename(999, "DU-9").await,
            Err(DbError::NotFound { .. })
        ));
        assert!(matches!(repo.rename(ids[0], "").await, Err(DbError::Domain(_))));
    }
}
