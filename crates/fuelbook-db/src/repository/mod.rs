//! # Repository Module
//!
//! Database repository implementations for Fuelbook.
//!
//! ## Repository Pattern
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  StationService                                                        │
//! │       │                                                                 │
//! │       │  db.readings().list_by_shift_date(Shift::Day, date)            │
//! │       ▼                                                                 │
//! │  ReadingRepository ──uses──► PartitionRegistry                         │
//! │  ├── get / get_by_id / list_by_shift_date                              │
//! │  ├── save_entries (one transaction, may propagate)                     │
//! │  ├── seed_opening_readings                                             │
//! │  └── open_edit_window                                                  │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  SQLite Database                                                       │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Available Repositories
//!
//! - [`pump_config::PumpConfigRepository`] - Pump to product mapping
//! - [`reading::ReadingRepository`] - Shift reading rows
//! - [`bill::BillRepository`] - Fiscal-year bill ledger

pub mod bill;
pub mod pump_config;
pub mod reading;
