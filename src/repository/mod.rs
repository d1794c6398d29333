//! Read-only access to readings and incident reports.
//!
//! Adapters return `Result` so failures can be logged with their cause; the
//! dispatcher goes through [`readings_or_empty`] / [`incidents_or_empty`],
//! which turn a failure into an empty sequence. The composer therefore sees
//! "query failed" and "no rows" identically.
//!
//! Submodules:
//! - `pg` — PostgreSQL adapter over the `flomon` schema.
//! - `memory` — fixture-backed store for development replay and tests.

pub mod memory;
pub mod pg;

use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};

use crate::logging;
use crate::model::{IncidentReport, Reading, RelayError, Result};

pub use memory::MemoryRepository;
pub use pg::PgRepository;

#[async_trait]
pub trait Repository: Send + Sync {
    /// Newest `limit` readings, newest first.
    async fn fetch_latest_readings(&self, limit: usize) -> Result<Vec<Reading>>;

    /// Reports observed within the last `since_hours`, newest first, at most `limit`.
    async fn fetch_incidents(&self, since_hours: i64, limit: usize) -> Result<Vec<IncidentReport>>;
}

/// Start of an incident window of `since_hours` ending at `now`.
///
/// Errors instead of panicking when the window falls outside chrono's range.
pub fn window_start(now: DateTime<Utc>, since_hours: i64) -> Result<DateTime<Utc>> {
    Duration::try_hours(since_hours)
        .and_then(|window| now.checked_sub_signed(window))
        .ok_or_else(|| {
            RelayError::Repository(format!("incident window of {since_hours} hours out of range"))
        })
}

/// Fetches readings, logging and swallowing any failure.
pub async fn readings_or_empty(repository: &dyn Repository, limit: usize) -> Vec<Reading> {
    match repository.fetch_latest_readings(limit).await {
        Ok(readings) => readings,
        Err(e) => {
            logging::log_repository_failure("fetch_latest_readings", &e);
            Vec::new()
        }
    }
}

/// Fetches incident reports, logging and swallowing any failure.
pub async fn incidents_or_empty(
    repository: &dyn Repository,
    since_hours: i64,
    limit: usize,
) -> Vec<IncidentReport> {
    match repository.fetch_incidents(since_hours, limit).await {
        Ok(reports) => reports,
        Err(e) => {
            logging::log_repository_failure("fetch_incidents", &e);
            Vec::new()
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[tokio::test]
    async fn test_failure_becomes_empty() {
        let repo = MemoryRepository::new(vec![Reading::new(10.0, Utc::now())], Vec::new());
        repo.set_failing(true);
        assert!(readings_or_empty(&repo, 10).await.is_empty());
        assert!(incidents_or_empty(&repo, 24, 10).await.is_empty());
    }

    #[tokio::test]
    async fn test_success_passes_rows_through() {
        let now = Utc::now();
        let repo = MemoryRepository::new(
            vec![Reading::new(10.0, now), Reading::new(9.0, now - Duration::minutes(10))],
            Vec::new(),
        );
        assert_eq!(readings_or_empty(&repo, 10).await.len(), 2);
    }

    #[test]
    fn test_window_start_subtracts_hours() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap();
        let start = window_start(now, 24).expect("in range");
        assert_eq!(start, Utc.with_ymd_and_hms(2024, 4, 30, 13, 0, 0).unwrap());
    }

    #[test]
    fn test_window_start_out_of_range_is_error() {
        let now = Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap();
        assert!(matches!(window_start(now, i64::MAX), Err(RelayError::Repository(_))));
        assert!(matches!(
            window_start(now, 9_000_000_000_000_000),
            Err(RelayError::Repository(_))
        ));
        // Representable as a duration but reaching before chrono's minimum date.
        assert!(matches!(
            window_start(now, 2_400_000_000),
            Err(RelayError::Repository(_))
        ));
    }
}
