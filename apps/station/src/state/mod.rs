//! # Station State
//!
//! Long-lived state shared by every station operation.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │  StationConfig::from_env()                                             │
//! │       │ database_path, autosave retry policy                           │
//! │       ▼                                                                 │
//! │  StationService { Database, Autosaver, StationConfig }                 │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

mod config;

pub use config::{default_database_path, StationConfig};
