//! # fuelbook-db: Database Layer for Fuelbook
//!
//! SQLite storage for the station ledger: pump configuration, shift
//! readings partitioned by month, and bills partitioned by fiscal year.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Fuelbook Data Flow                               │
//! │                                                                         │
//! │  Station command (save_entries, close_shift, reconcile)                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                    fuelbook-db (THIS CRATE)                     │   │
//! │  │                                                                 │   │
//! │  │   ┌───────────────┐    ┌────────────────┐    ┌──────────────┐  │   │
//! │  │   │   Database    │    │  Repositories  │    │  Migrations  │  │   │
//! │  │   │   (pool.rs)   │    │ PumpConfigRepo │    │  (embedded)  │  │   │
//! │  │   │               │    │ ReadingRepo    │    │              │  │   │
//! │  │   │ SqlitePool    │◄───│ BillRepo       │    │ 001_initial  │  │   │
//! │  │   │ Partitions    │    ├────────────────┤    │              │  │   │
//! │  │   │               │◄───│ Transitions    │    │              │  │   │
//! │  │   │               │◄───│ Autosaver      │    │              │  │   │
//! │  │   └───────────────┘    └────────────────┘    └──────────────┘  │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                     SQLite Database (WAL)                       │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Module Organization
//!
//! - [`pool`] - Connection pool and repository access
//! - [`migrations`] - Embedded database migrations
//! - [`error`] - Database error types
//! - [`partition`] - Month and fiscal-year partition registry
//! - [`repository`] - Pump configuration, reading and bill repositories
//! - [`transition`] - Shift close and hand-over to the next shift
//! - [`autosave`] - Per-row autosave with retry
//!
//! ## Usage
//!
//! ```rust,ignore
//! use fuelbook_db::{Database, DbConfig, WriteMode};
//!
//! let db = Database::new(DbConfig::new("fuelbook.db")).await?;
//!
//! let outcomes = db.readings().save_entries(&entries, WriteMode::Normal).await?;
//! let transition = db.transitions().close_shift_and_seed_next(&request).await?;
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod autosave;
pub mod error;
pub mod migrations;
pub mod partition;
pub mod pool;
pub mod repository;
pub mod transition;

// =============================================================================
// Re-exports
// =============================================================================

pub use autosave::{AutosaveResult, Autosaver, RetryPolicy};
pub use error::{DbError, DbResult};
pub use pool::{Database, DbConfig};
pub use transition::{CloseShiftRequest, ShiftTransitionEngine};

// Repository re-exports for convenience
pub use repository::bill::BillRepository;
pub use repository::pump_config::PumpConfigRepository;
pub use repository::reading::{ReadingRepository, WriteMode};
