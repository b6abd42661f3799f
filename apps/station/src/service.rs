//! # Station Service
//!
//! The operation surface of a station: every command the operator screens
//! (and the CLI) invoke goes through [`StationService`].
//!
//! ## Operations
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  commands/pump_config.rs   list / create / rename pumps                │
//! │  commands/reading.rs       seed, get_readings, save_entries, autosave  │
//! │  commands/shift.rs         close_shift_and_seed_next, open_edit_window │
//! │  commands/reconciliation   reconcile                                   │
//! │  commands/bill.rs          record_bill, next_bill_number               │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! Each command module adds its operations as an `impl StationService`
//! block next to its DTOs.

use tracing::info;

use fuelbook_core::ShiftContext;
use fuelbook_db::{Autosaver, Database, DbConfig, WriteMode};

use crate::error::ApiError;
use crate::state::StationConfig;

/// Station operations over one database.
#[derive(Debug, Clone)]
pub struct StationService {
    db: Database,
    autosaver: Autosaver,
    config: StationConfig,
}

impl StationService {
    /// Opens the configured database, creating its directory if needed.
    pub async fn open(config: StationConfig) -> Result<Self, ApiError> {
        if let Some(dir) = config.database_path.parent() {
            if !dir.as_os_str().is_empty() {
                std::fs::create_dir_all(dir).map_err(|e| {
                    ApiError::internal(format!("Cannot create {}: {}", dir.display(), e))
                })?;
            }
        }

        let db = Database::new(DbConfig::new(&config.database_path)).await?;
        info!(
            station = %config.station_name,
            path = %config.database_path.display(),
            "Station database ready"
        );
        Ok(Self::with_database(db, config))
    }

    /// Wraps an already opened database.
    pub fn with_database(db: Database, config: StationConfig) -> Self {
        let autosaver = db.autosaver(config.retry_policy());
        StationService {
            db,
            autosaver,
            config,
        }
    }

    pub fn db(&self) -> &Database {
        &self.db
    }

    pub(crate) fn autosaver(&self) -> &Autosaver {
        &self.autosaver
    }

    pub fn config(&self) -> &StationConfig {
        &self.config
    }

    /// Normal mode, or edit mode after re-checking the session's permit.
    ///
    /// The permit is derived from stored rows on every request, so a client
    /// cannot hold on to one after another shift has closed.
    pub(crate) async fn write_mode(
        &self,
        edit_session: Option<&ShiftContext>,
    ) -> Result<WriteMode, ApiError> {
        match edit_session {
            None => Ok(WriteMode::Normal),
            Some(session) => {
                let permit = self.db.readings().open_edit_window(session).await?;
                Ok(WriteMode::Edit(permit))
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
