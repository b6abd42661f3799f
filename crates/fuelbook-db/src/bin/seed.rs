//! # Seed Data Generator
//!
//! Sets up a development station: pump configuration plus the opening
//! readings of one day shift.
//!
//! ## Usage
//! ```bash
//! # Four pumps, day shift of today
//! cargo run -p fuelbook-db --bin seed
//!
//! # Specify database path and start date
//! cargo run -p fuelbook-db --bin seed -- --db ./data/fuelbook.db --date 2025-05-01
//! ```
//!
//! ## Generated Pumps
//! Pumps P1..Pn alternate between diesel and petrol, each opening at a
//! different meter value so hand-overs are easy to follow.

use chrono::{Local, NaiveDate};
use fuelbook_core::{Litres, NewPumpConfig, SeedReading, Shift};
use fuelbook_db::{Database, DbConfig};
use std::env;

/// Products dispensed by the generated pumps: (product_code, product_name)
const PRODUCTS: &[(&str, &str)] = &[("HSD", "DIESEL"), ("MS", "PETROL")];

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Parse command line arguments
    let args: Vec<String> = env::args().collect();

    let mut pumps: usize = 4;
    let mut db_path = String::from("./fuelbook_dev.db");
    let mut date: NaiveDate = Local::now().date_naive();

    let mut i = 1;
    while i < args.len() {
        match args[i].as_str() {
            "--pumps" | "-p" => {
                if i + 1 < args.len() {
                    pumps = args[i + 1].parse().unwrap_or(4);
                    i += 1;
                }
            }
            "--db" | "-d" => {
                if i + 1 < args.len() {
                    db_path = args[i + 1].clone();
                    i += 1;
                }
            }
            "--date" => {
                if i + 1 < args.len() {
                    date = args[i + 1].parse()?;
                    i += 1;
                }
            }
            "--help" | "-h" => {
                println!("Fuelbook Seed Data Generator");
                println!();
                println!("Usage: seed [OPTIONS]");
                println!();
                println!("Options:");
                println!("  -p, --pumps <N>      Number of pumps to create (default: 4)");
                println!("  -d, --db <PATH>      Database file path (default: ./fuelbook_dev.db)");
                println!("      --date <DATE>    Day shift to open, YYYY-MM-DD (default: today)");
                println!("  -h, --help           Show this help message");
                return Ok(());
            }
            _ => {}
        }
        i += 1;
    }

    println!("Fuelbook Seed Data Generator");
    println!("============================");
    println!("Database: {}", db_path);
    println!("Pumps:    {}", pumps);
    println!("Shift:    {} #1", date);
    println!();

    let db = Database::new(DbConfig::new(&db_path)).await?;
    println!("✓ Connected to database");
    println!("✓ Migrations applied");

    let existing = db.pump_configs().list().await?;
    if !existing.is_empty() {
        println!("⚠ Database already has {} pumps", existing.len());
        println!("  Skipping seed to avoid duplicates.");
        println!("  Delete the database file to regenerate.");
        return Ok(());
    }

    let configs: Vec<NewPumpConfig> = (1..=pumps)
        .map(|n| {
            let (product_code, product_name) = PRODUCTS[(n - 1) % PRODUCTS.len()];
            NewPumpConfig {
                pump_code: format!("P{n}"),
                product_code: product_code.to_string(),
                product_name: product_name.to_string(),
            }
        })
        .collect();

    db.pump_configs().create_many(&configs).await?;
    println!("✓ Created {} pump configurations", configs.len());

    let seeds: Vec<SeedReading> = configs
        .iter()
        .enumerate()
        .map(|(idx, config)| SeedReading {
            pump_code: config.pump_code.clone(),
            product_code: config.product_code.clone(),
            product_name: config.product_name.clone(),
            opening_reading: Litres::from_whole(10_000 * (idx as i64 + 1)),
            shift: Shift::Day,
            reading_date: date,
        })
        .collect();

    db.readings().seed_opening_readings(&seeds).await?;
    println!("✓ Seeded opening readings for {} #1", date);

    println!();
    for row in db.readings().list_by_shift_date(Shift::Day, date).await? {
        println!(
            "  {:<4} {:<8} opening {:>12}",
            row.pump_code, row.product_name, row.opening_reading
        );
    }

    println!();
    println!("✓ Seed complete!");

    Ok(())
}
