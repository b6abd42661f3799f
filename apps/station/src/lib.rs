//! # fuelbook-station: Station Operations
//!
//! The operation surface of a fuel station ledger: what the shift sheet,
//! the setup screen and the shift report call.
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                        Fuelbook Station                                 │
//! │                                                                         │
//! │  main.rs ────► CLI: logging, config, one command, JSON to stdout       │
//! │                                                                         │
//! │  service.rs ─► StationService (Database + Autosaver + config)          │
//! │                                                                         │
//! │  commands/ ──► DTOs + operations (readings, shift, bills, reports)     │
//! │                                                                         │
//! │  state/ ─────► StationConfig::from_env                                 │
//! │                                                                         │
//! │  error.rs ───► ApiError { code, message }                              │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

pub mod commands;
pub mod error;
pub mod service;
pub mod state;

use tracing_subscriber::EnvFilter;

pub use error::{ApiError, ErrorCode};
pub use service::StationService;
pub use state::StationConfig;

/// Initializes the tracing subscriber for structured logging.
///
/// ## Log Levels
/// - `RUST_LOG=debug` - Show debug messages
/// - `RUST_LOG=fuelbook_db=trace` - Trace the database layer only
/// - Default: INFO, DEBUG for fuelbook crates, WARN for sqlx
///
/// Logs go to stderr so command output on stdout stays parseable.
pub fn init_tracing() {
    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("info,fuelbook=debug,sqlx=warn"));

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}
