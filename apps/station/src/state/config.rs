use std::path::PathBuf;
use std::time::Duration;

use directories::ProjectDirs;
use serde::Serialize;
use tracing::warn;

use fuelbook_db::RetryPolicy;

/// Station configuration.
///
/// ## Fields
/// Defaults suit a single-till development station. Production stations
/// override them through the environment.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct StationConfig {
    /// SQLite database file.
    /// Default: platform data dir, `fuelbook.db`
    pub database_path: PathBuf,

    /// Station name (shown on shift reports)
    pub station_name: String,

    /// Autosave attempts per row, including the first one
    pub autosave_attempts: u32,

    /// Delay before the first autosave retry, in milliseconds
    pub autosave_base_delay_ms: u64,

    /// Upper bound for any single retry delay, in milliseconds
    pub autosave_max_delay_ms: u64,
}

impl Default for StationConfig {
    /// Returns default configuration suitable for development.
    ///
    /// ## Default Values
    /// - Database: platform data directory, falling back to `./fuelbook.db`
    /// - Station: "Fuelbook Dev Station"
    /// - Autosave: 3 attempts, 50 ms doubling up to 500 ms
    fn default() -> Self {
        StationConfig {
            database_path: default_database_path(),
            station_name: "Fuelbook Dev Station".to_string(),
            autosave_attempts: 3,
            autosave_base_delay_ms: 50,
            autosave_max_delay_ms: 500,
        }
    }
}

impl StationConfig {
    /// Creates a StationConfig from environment variables and defaults.
    ///
    /// ## Environment Variables
    /// - `FUELBOOK_DB_PATH`: database file
    /// - `FUELBOOK_STATION_NAME`: station name
    /// - `FUELBOOK_AUTOSAVE_ATTEMPTS`: autosave attempts per row
    /// - `FUELBOOK_AUTOSAVE_BASE_DELAY_MS`: first retry delay
    ///
    /// Unparseable numbers are logged and the default is kept.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Same as [`from_env`](Self::from_env) with an injectable lookup.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let mut config = StationConfig::default();

        if let Some(path) = lookup("FUELBOOK_DB_PATH") {
            config.database_path = PathBuf::from(path);
        }

        if let Some(name) = lookup("FUELBOOK_STATION_NAME") {
            config.station_name = name;
        }

        if let Some(raw) = lookup("FUELBOOK_AUTOSAVE_ATTEMPTS") {
            match raw.trim().parse::<u32>() {
                Ok(attempts) => config.autosave_attempts = attempts,
                Err(_) => warn!(value = %raw, "Ignoring invalid FUELBOOK_AUTOSAVE_ATTEMPTS"),
            }
        }

        if let Some(raw) = lookup("FUELBOOK_AUTOSAVE_BASE_DELAY_MS") {
            match raw.trim().parse::<u64>() {
                Ok(ms) => config.autosave_base_delay_ms = ms,
                Err(_) => warn!(value = %raw, "Ignoring invalid FUELBOOK_AUTOSAVE_BASE_DELAY_MS"),
            }
        }

        config
    }

    /// Retry policy for per-row autosave.
    pub fn retry_policy(&self) -> RetryPolicy {
        RetryPolicy::new(
            self.autosave_attempts,
            Duration::from_millis(self.autosave_base_delay_ms),
            Duration::from_millis(self.autosave_max_delay_ms),
        )
    }
}

/// Platform data directory for the database.
///
/// ## Platform-Specific Paths
/// - **macOS**: `~/Library/Application Support/com.fuelbook.station/fuelbook.db`
/// - **Windows**: `%APPDATA%\fuelbook\station\data\fuelbook.db`
/// - **Linux**: `~/.local/share/station/fuelbook.db`
pub fn default_database_path() -> PathBuf {
    ProjectDirs::from("com", "fuelbook", "station")
        .map(|dirs| dirs.data_dir().join("fuelbook.db"))
        .unwrap_or_else(|| PathBuf::from("./fuelbook.db"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    fn lookup(vars: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let vars: HashMap<String, String> = vars
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        move |key| vars.get(key).cloned()
    }

    #[test]
    fn test_defaults() {
        let config = StationConfig::from_lookup(lookup(&[]));
        assert_eq!(config.autosave_attempts, 3);
        assert!(config.database_path.ends_with("fuelbook.db"));
    }

    #[test]
    fn test_overrides() {
        let config = StationConfig::from_lookup(lookup(&[
            ("FUELBOOK_DB_PATH", "/tmp/station.db"),
            ("FUELBOOK_STATION_NAME", "Highway 44"),
            ("FUELBOOK_AUTOSAVE_ATTEMPTS", "5"),
            ("FUELBOOK_AUTOSAVE_BASE_DELAY_MS", "20"),
        ]));

        assert_eq!(config.database_path, PathBuf::from("/tmp/station.db"));
        assert_eq!(config.station_name, "Highway 44");

        let policy = config.retry_policy();
        assert_eq!(policy.max_attempts, 5);
        assert_eq!(policy.base_delay, Duration::from_millis(20));
        assert_eq!(policy.max_delay, Duration::from_millis(500));
    }

    #[test]
    fn test_invalid_numbers_keep_defaults() {
        let config = StationConfig::from_lookup(lookup(&[
            ("FUELBOOK_AUTOSAVE_ATTEMPTS", "many"),
            ("FUELBOOK_AUTOSAVE_BASE_DELAY_MS", "-1"),
        ]));
        assert_eq!(config.autosave_attempts, 3);
        assert_eq!(config.autosave_base_delay_ms, 50);
    }
}
