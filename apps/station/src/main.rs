//! # Fuelbook Station CLI
//!
//! Runs one station operation against the configured database and prints
//! the result as JSON.
//!
//! ## Usage
//! ```bash
//! fuelbook-station readings --shift 1 --date 2025-05-01
//! fuelbook-station close --shift 1 --date 2025-05-01
//! fuelbook-station reconcile --shift 1 --date 2025-05-01
//! fuelbook-station edit-window --shift 2 --date 2025-05-01
//! fuelbook-station next-bill
//! fuelbook-station pumps
//! ```
//!
//! The database comes from `FUELBOOK_DB_PATH` or the platform data
//! directory. Logs go to stderr; `RUST_LOG` overrides the default filter.

use std::env;
use std::process::ExitCode;

use chrono::{Local, NaiveDate};
use serde::Serialize;
use tracing::info;

use fuelbook_core::{Shift, ShiftContext};
use fuelbook_station::commands::shift::{CloseShiftDto, PumpRefDto};
use fuelbook_station::{init_tracing, ApiError, StationConfig, StationService};

const USAGE: &str = "\
Fuelbook Station

Usage: fuelbook-station <COMMAND> [OPTIONS]

Commands:
  pumps                     List pump configurations
  readings                  Rows of one shift
  close                     Close a shift and seed the next one
  edit-window               Check whether a session may edit
  reconcile                 Metered versus billed volume
  next-bill                 Next free bill number

Options:
  -s, --shift <1|2>         Shift number (default: 1)
  -d, --date <YYYY-MM-DD>   Shift date (default: today)
  -p, --pumps <P1,P2,..>    Pumps to close (default: every row of the shift)
  -h, --help                Show this help message";

/// Parsed command line.
struct Args {
    command: String,
    shift: Shift,
    date: NaiveDate,
    pumps: Vec<String>,
}

fn parse_args(args: &[String]) -> Result<Option<Args>, ApiError> {
    let Some(command) = args.get(1).cloned() else {
        return Ok(None);
    };
    if command == "--help" || command == "-h" {
        return Ok(None);
    }

    let mut parsed = Args {
        command,
        shift: Shift::Day,
        date: Local::now().date_naive(),
        pumps: Vec::new(),
    };

    let mut i = 2;
    while i < args.len() {
        let value = args.get(i + 1).map(String::as_str);
        match (args[i].as_str(), value) {
            ("--shift" | "-s", Some(v)) => {
                parsed.shift = v.parse()?;
                i += 1;
            }
            ("--date" | "-d", Some(v)) => {
                parsed.date = v
                    .parse()
                    .map_err(|_| ApiError::validation(format!("Invalid date: {}", v)))?;
                i += 1;
            }
            ("--pumps" | "-p", Some(v)) => {
                parsed.pumps = v
                    .split(',')
                    .map(|p| p.trim().to_string())
                    .filter(|p| !p.is_empty())
                    .collect();
                i += 1;
            }
            ("--help" | "-h", _) => return Ok(None),
            (other, _) => {
                return Err(ApiError::validation(format!("Unexpected argument: {}", other)));
            }
        }
        i += 1;
    }

    Ok(Some(parsed))
}

fn print_json<T: Serialize>(value: &T) -> Result<(), ApiError> {
    let text = serde_json::to_string_pretty(value).map_err(|e| ApiError::internal(e.to_string()))?;
    println!("{}", text);
    Ok(())
}

async fn run(station: &StationService, args: Args) -> Result<(), ApiError> {
    match args.command.as_str() {
        "pumps" => print_json(&station.list_pump_configurations().await?),
        "readings" => print_json(&station.get_readings(args.shift, args.date).await?),
        "close" => {
            let pumps = if args.pumps.is_empty() {
                station
                    .get_readings(args.shift, args.date)
                    .await?
                    .into_iter()
                    .map(|row| row.pump_code)
                    .collect()
            } else {
                args.pumps
            };
            let request = CloseShiftDto {
                entries: pumps
                    .into_iter()
                    .map(|pump_code| PumpRefDto { pump_code })
                    .collect(),
                current_shift: args.shift,
                date: args.date,
            };
            print_json(&station.close_shift_and_seed_next(request).await?)
        }
        "edit-window" => {
            let session = ShiftContext::new(args.shift, args.date);
            print_json(&station.open_edit_window(session).await?)
        }
        "reconcile" => print_json(&station.reconcile(args.shift, args.date).await?),
        "next-bill" => print_json(&station.next_bill_number(args.date).await?),
        other => Err(ApiError::validation(format!("Unknown command: {}", other))),
    }
}

/// Parses arguments, opens the station and runs one command.
async fn execute(raw: &[String]) -> Result<(), ApiError> {
    let Some(args) = parse_args(raw)? else {
        println!("{}", USAGE);
        return Ok(());
    };

    let config = StationConfig::from_env();
    info!(station = %config.station_name, command = %args.command, "Starting Fuelbook station");
    let station = StationService::open(config).await?;

    let outcome = run(&station, args).await;
    station.db().close().await;
    outcome
}

#[tokio::main]
async fn main() -> ExitCode {
    init_tracing();

    let raw: Vec<String> = env::args().collect();
    match execute(&raw).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            let text = serde_json::to_string(&err).unwrap_or_else(|_| err.to_string());
            eprintln!("{}", text);
            ExitCode::FAILURE
        }
    }
}
