//! # fuelbook-core: Pure Business Logic for Fuelbook
//!
//! The ledger rules of a fuel station's shift sheet, with zero I/O.
//!
//! ## Architecture Position
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Fuelbook Architecture                            │
//! │                                                                         │
//! │  ┌─────────────────────────────────────────────────────────────────┐   │
//! │  │                apps/station (StationService)                    │   │
//! │  │   get_readings, save_entries, close_shift_and_seed_next, ...    │   │
//! │  └─────────────────────────────┬───────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │               ★ fuelbook-core (THIS CRATE) ★                    │   │
//! │  │                                                                 │   │
//! │  │   ┌──────────┐ ┌──────────┐ ┌────────────┐ ┌────────────────┐  │   │
//! │  │   │  litres  │ │  shift   │ │ partition  │ │ reconciliation │  │   │
//! │  │   │  Litres  │ │ Shift    │ │ month / FY │ │ sale vs bills  │  │   │
//! │  │   └──────────┘ └──────────┘ └────────────┘ └────────────────┘  │   │
//! │  │   ┌──────────┐ ┌────────────┐ ┌──────────────┐                  │   │
//! │  │   │  types   │ │ validation │ │ edit_window  │                  │   │
//! │  │   └──────────┘ └────────────┘ └──────────────┘                  │   │
//! │  │                                                                 │   │
//! │  │   NO I/O • NO DATABASE • NO CLOCK • PURE FUNCTIONS             │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! │                                │                                        │
//! │  ┌─────────────────────────────▼───────────────────────────────────┐   │
//! │  │                fuelbook-db (Database Layer)                     │   │
//! │  │        partitions, repositories, shift transition engine        │   │
//! │  └─────────────────────────────────────────────────────────────────┘   │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Modules
//!
//! - [`types`] - Domain types (PumpConfig, ReadingRecord, Bill, ...)
//! - [`litres`] - Fixed-point litres (no floating point)
//! - [`shift`] - Shift numbers and the hand-over rule
//! - [`partition`] - Month and fiscal-year partition keys
//! - [`edit_window`] - Reopening the last closed shift
//! - [`reconciliation`] - Metered versus billed volume
//! - [`validation`] - Input validation
//! - [`error`] - Domain error types
//!
//! ## Example Usage
//!
//! ```rust
//! use chrono::NaiveDate;
//! use fuelbook_core::{Litres, Shift, ShiftStamp};
//!
//! let opening: Litres = "1000.00".parse().unwrap();
//! let closing: Litres = "1500.00".parse().unwrap();
//! assert_eq!(Litres::sale_between(opening, closing).to_string(), "500.00");
//!
//! let day = ShiftStamp::new(NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(), Shift::Day);
//! assert_eq!(day.successor().shift, Shift::Night);
//! ```

// =============================================================================
// Module Declarations
// =============================================================================

pub mod edit_window;
pub mod error;
pub mod litres;
pub mod partition;
pub mod reconciliation;
pub mod shift;
pub mod types;
pub mod validation;

// =============================================================================
// Re-exports for Convenience
// =============================================================================

pub use edit_window::EditPermit;
pub use error::{CoreError, CoreResult, ValidationError};
pub use litres::Litres;
pub use partition::{FiscalYear, PartitionKey};
pub use reconciliation::{Anomaly, ProductReconciliation, ReconciliationReport};
pub use shift::{Shift, ShiftContext, ShiftStamp};
pub use types::*;

// =============================================================================
// Crate-Level Constants
// =============================================================================

/// Longest pump or product code accepted.
pub const MAX_CODE_LEN: usize = 20;

/// Longest product name accepted.
pub const MAX_NAME_LEN: usize = 100;

/// Largest value a pump totalizer shows, in whole litres.
pub const MAX_METER_LITRES: i64 = 99_999_999;

/// Most entries accepted in one save or close request.
///
/// A station has a handful of pumps; anything larger is a client bug.
pub const MAX_BATCH_ENTRIES: usize = 200;

/// First bill number of every fiscal year.
pub const FIRST_BILL_NUMBER: i64 = 100;
