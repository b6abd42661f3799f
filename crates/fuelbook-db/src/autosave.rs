//! # Autosave
//!
//! Commits one reading row per keystroke (Enter/Tab on the shift sheet),
//! each in its own transaction, retrying transient failures.
//!
//! ```text
//!  keystroke ──► Autosaver::save(entry, mode)
//!                    │  status := active (normal) / edited (edit mode)
//!                    ▼
//!               attempt 1 ── ok ──────────────────────► Saved { attempts: 1 }
//!                    │ transient (busy, pool, connection)
//!                    ▼ sleep base_delay
//!               attempt 2 ── ok ──────────────────────► Saved { attempts: 2 }
//!                    │ ...
//!                    ▼ sleep ExponentialBackoff (x2, capped at max_delay)
//!               attempt N ── err / non-transient ─────► Failed { error, attempts }
//! ```
//!
//! Failures are returned to the caller as data, never swallowed.

use std::time::Duration;

use backoff::backoff::Backoff;
use backoff::ExponentialBackoff;
use serde::Serialize;
use tokio::time::sleep;
use tracing::{debug, warn};

use crate::error::DbError;
use crate::repository::reading::{ReadingRepository, WriteMode};
use fuelbook_core::{ReadingEntry, ReadingStatus, SaveAction};

// =============================================================================
// Retry Policy
// =============================================================================

/// Bounded exponential backoff for autosave retries.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RetryPolicy {
    pub max_attempts: u32,
    pub base_delay: Duration,
    pub max_delay: Duration,
}

impl RetryPolicy {
    /// Creates a policy; at least one attempt, and `max_delay >= base_delay`.
    pub fn new(max_attempts: u32, base_delay: Duration, max_delay: Duration) -> Self {
        RetryPolicy {
            max_attempts: max_attempts.max(1),
            base_delay,
            max_delay: max_delay.max(base_delay),
        }
    }

    /// A single attempt, no retry.
    pub fn none() -> Self {
        Self::new(1, Duration::ZERO, Duration::ZERO)
    }

    /// Delay schedule: `base_delay`, doubling, capped at `max_delay`.
    ///
    /// No jitter and no elapsed-time limit; `max_attempts` bounds the run.
    pub fn backoff(&self) -> ExponentialBackoff {
        ExponentialBackoff {
            current_interval: self.base_delay,
            initial_interval: self.base_delay,
            randomization_factor: 0.0,
            multiplier: 2.0,
            max_interval: self.max_delay,
            max_elapsed_time: None,
            ..Default::default()
        }
    }

    /// Runs `op` until it succeeds, fails with a non-transient error or
    /// runs out of attempts. Returns the result and the attempts used.
    pub async fn run<F, Fut, T>(&self, mut op: F) -> (Result<T, DbError>, u32)
    where
        F: FnMut(u32) -> Fut,
        Fut: std::future::Future<Output = Result<T, DbError>>,
    {
        let mut backoff = self.backoff();
        let mut attempt = 0;
        loop {
            attempt += 1;
            match op(attempt).await {
                Ok(value) => return (Ok(value), attempt),
                Err(err) if err.is_transient() && attempt < self.max_attempts => {
                    let delay = backoff.next_backoff().unwrap_or(self.max_delay);
                    warn!(attempt, ?delay, error = %err, "Transient failure, retrying");
                    sleep(delay).await;
                }
                Err(err) => return (Err(err), attempt),
            }
        }
    }
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self::new(3, Duration::from_millis(50), Duration::from_millis(500))
    }
}

// =============================================================================
// Result
// =============================================================================

/// Outcome of one autosave.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "result", rename_all = "snake_case")]
pub enum AutosaveResult {
    Saved {
        pump_code: String,
        id: i64,
        action: SaveAction,
        attempts: u32,
    },
    Failed {
        pump_code: String,
        error: String,
        transient: bool,
        attempts: u32,
    },
}

impl AutosaveResult {
    pub fn is_saved(&self) -> bool {
        matches!(self, AutosaveResult::Saved { .. })
    }

    pub fn attempts(&self) -> u32 {
        match self {
            AutosaveResult::Saved { attempts, .. } | AutosaveResult::Failed { attempts, .. } => {
                *attempts
            }
        }
    }
}

// =============================================================================
// Autosaver
// =============================================================================

/// Per-row autosave with retry.
#[derive(Debug, Clone)]
pub struct Autosaver {
    readings: ReadingRepository,
    policy: RetryPolicy,
}

impl Autosaver {
    pub fn new(readings: ReadingRepository, policy: RetryPolicy) -> Self {
        Autosaver { readings, policy }
    }

    pub fn policy(&self) -> RetryPolicy {
        self.policy
    }

    /// Saves one row as work in progress.
    ///
    /// The stored status is forced to `active`, or `edited` under an edit
    /// permit, so an autosave never closes a row or propagates.
    pub async fn save(&self, entry: &ReadingEntry, mode: WriteMode) -> AutosaveResult {
        let mut entry = entry.clone();
        entry.status = if mode.is_edit() {
            ReadingStatus::Edited
        } else {
            ReadingStatus::Active
        };
        let entries = [entry];

        let (result, attempts) = self
            .policy
            .run(|attempt| {
                debug!(pump_code = %entries[0].pump_code, attempt, "Autosaving reading");
                self.readings.save_entries(&entries, mode)
            })
            .await;

        let pump_code = entries[0].pump_code.clone();
        match result.and_then(|mut outcomes| {
            outcomes
                .pop()
                .ok_or_else(|| DbError::Internal("save produced no outcome".to_string()))
        }) {
            Ok(outcome) => AutosaveResult::Saved {
                pump_code,
                id: outcome.id,
                action: outcome.action,
                attempts,
            },
            Err(err) => {
                warn!(pump_code = %pump_code, attempts, error = %err, "Autosave failed");
                AutosaveResult::Failed {
                    pump_code,
                    transient: err.is_transient(),
                    error: err.to_string(),
                    attempts,
                }
            }
        }
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::pool::{Database, DbConfig};
    use chrono::NaiveDate;
    use fuelbook_core::{Litres, Shift};
    use std::sync::atomic::{AtomicU32, Ordering};

    fn entry() -> ReadingEntry {
        ReadingEntry {
            id: None,
            pump_code: "P1".to_string(),
            product_code: "HSD".to_string(),
            product_name: "DIESEL".to_string(),
            opening_reading: Litres::from_whole(1000),
            closing_reading: Litres::from_whole(1200),
            shift: Shift::Day,
            date: None,
            reading_date: NaiveDate::from_ymd_opt(2025, 5, 1).unwrap(),
            status: ReadingStatus::Closed,
        }
    }

    fn millis(delay: Option<Duration>) -> u128 {
        delay.expect("unbounded backoff").as_millis()
    }

    #[test]
    fn test_backoff_doubles_and_caps() {
        let policy = RetryPolicy::new(5, Duration::from_millis(100), Duration::from_millis(500));
        let mut backoff = policy.backoff();
        assert_eq!(millis(backoff.next_backoff()), 100);
        assert_eq!(millis(backoff.next_backoff()), 200);
        assert_eq!(millis(backoff.next_backoff()), 400);
        assert_eq!(millis(backoff.next_backoff()), 500);
        assert_eq!(millis(backoff.next_backoff()), 500);

        backoff.reset();
        assert_eq!(millis(backoff.next_backoff()), 100);
    }

    #[test]
    fn test_new_clamps() {
        let policy = RetryPolicy::new(0, Duration::from_millis(10), Duration::ZERO);
        assert_eq!(policy.max_attempts, 1);
        assert_eq!(policy.max_delay, Duration::from_millis(10));
    }

    #[tokio::test]
    async fn test_retries_transient_until_success() {
        let policy = RetryPolicy::new(3, Duration::from_millis(1), Duration::from_millis(2));
        let calls = AtomicU32::new(0);

        let (result, attempts) = policy
            .run(|attempt| {
                calls.fetch_add(1, Ordering::SeqCst);
                async move {
                    if attempt < 3 {
                        Err(DbError::Busy("database is locked".to_string()))
                    } else {
                        Ok(attempt)
                    }
                }
            })
            .await;

        assert_eq!(result.unwrap(), 3);
        assert_eq!(attempts, 3);
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn test_does_not_retry_permanent_errors() {
        let policy = RetryPolicy::new(5, Duration::from_millis(1), Duration::from_millis(1));
        let (result, attempts): (Result<(), DbError>, u32) = policy
            .run(|_| async { Err(DbError::not_found("ReadingRecord", 1)) })
            .await;

        assert!(matches!(result, Err(DbError::NotFound { .. })));
        assert_eq!(attempts, 1);
    }

    #[tokio::test]
    async fn test_gives_up_after_max_attempts() {
        let policy = RetryPolicy::new(2, Duration::from_millis(1), Duration::from_millis(1));
        let (result, attempts): (Result<(), DbError>, u32) =
            policy.run(|_| async { Err(DbError::PoolExhausted) }).await;

        assert!(matches!(result, Err(DbError::PoolExhausted)));
        assert_eq!(attempts, 2);
    }

    #[tokio::test]
    async fn test_autosave_stores_active_without_propagating() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let saver = db.autosaver(RetryPolicy::none());

        let result = saver.save(&entry(), WriteMode::Normal).await;
        assert!(result.is_saved());
        assert_eq!(result.attempts(), 1);

        let stored = db
            .readings()
            .get("P1", Shift::Day, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap())
            .await
            .unwrap()
            .unwrap();
        assert_eq!(stored.status, ReadingStatus::Active);
        assert_eq!(stored.sale_litre, Litres::from_whole(200));
        assert!(db
            .readings()
            .get("P1", Shift::Night, NaiveDate::from_ymd_opt(2025, 5, 1).unwrap())
            .await
            .unwrap()
            .is_none());
    }

    #[tokio::test]
    async fn test_autosave_failure_is_reported() {
        let db = Database::new(DbConfig::in_memory()).await.unwrap();
        let saver = db.autosaver(RetryPolicy::default());
        let mut missing = entry();
        missing.id = Some(77);

        let result = saver.save(&missing, WriteMode::Normal).await;
        match result {
            AutosaveResult::Failed {
                pump_code,
                transient,
                attempts,
                ..
            } => {
                assert_eq!(pump_code, "P1");
                assert!(!transient);
                assert_eq!(attempts, 1);
            }
            other => panic!("expected failure, got {other:?}"),
        }
    }
}
