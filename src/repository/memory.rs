/// In-memory repository for development and tests.
///
/// Loads readings and incident reports from a JSON fixture so the relay can
/// be exercised without a database. A fixed clock can be set to replay a
/// historical window as if it were current; the incident window is then
/// measured from that clock instead of the wall clock. Without an explicit
/// time, replay pins the clock to the newest row in the fixture.

use std::path::Path;
use std::sync::atomic::{AtomicBool, Ordering};

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use super::{Repository, window_start};
use crate::model::{IncidentReport, Reading, RelayError, Result};

/// Shape of a fixture file:
///
/// ```json
/// {
///   "readings": [{ "level_cm": 31.5, "observed_at": "2024-05-01T12:00:00Z" }],
///   "incidents": [{ "area_name": "Old Bridge", "severity": "high",
///                   "description": null, "observed_at": "2024-05-01T10:00:00Z" }]
/// }
/// ```
#[derive(Debug, Default, Deserialize)]
pub struct Fixture {
    #[serde(default)]
    pub readings: Vec<Reading>,
    #[serde(default)]
    pub incidents: Vec<IncidentReport>,
}

#[derive(Debug, Default)]
pub struct MemoryRepository {
    readings: Vec<Reading>,
    incidents: Vec<IncidentReport>,
    clock: Option<DateTime<Utc>>,
    failing: AtomicBool,
}

impl MemoryRepository {
    /// Rows may be given in any order; they are stored newest first.
    pub fn new(mut readings: Vec<Reading>, mut incidents: Vec<IncidentReport>) -> Self {
        readings.sort_by(|a, b| b.observed_at.cmp(&a.observed_at));
        incidents.sort_by(|a, b| b.observed_at.cmp(&a.observed_at));
        Self {
            readings,
            incidents,
            clock: None,
            failing: AtomicBool::new(false),
        }
    }

    pub fn from_fixture_json(json: &str) -> Result<Self> {
        let fixture: Fixture = serde_json::from_str(json)?;
        Ok(Self::new(fixture.readings, fixture.incidents))
    }

    pub fn load_fixture(path: &Path) -> Result<Self> {
        let json = std::fs::read_to_string(path).map_err(|e| {
            RelayError::Parse(format!("failed to read fixture {}: {}", path.display(), e))
        })?;
        Self::from_fixture_json(&json)
    }

    /// Pins "now" for incident window filtering.
    pub fn with_clock(mut self, now: DateTime<Utc>) -> Self {
        self.clock = Some(now);
        self
    }

    /// Pins the clock to the newest reading or report, so a replayed fixture
    /// looks current. Leaves the wall clock in place when there are no rows.
    pub fn pinned_to_newest(self) -> Self {
        match self.newest_observed_at() {
            Some(now) => self.with_clock(now),
            None => self,
        }
    }

    /// Latest `observed_at` across readings and reports.
    pub fn newest_observed_at(&self) -> Option<DateTime<Utc>> {
        let reading = self.readings.first().map(|r| r.observed_at);
        let incident = self.incidents.first().map(|r| r.observed_at);
        reading.max(incident)
    }

    /// The pinned clock, if any.
    pub fn clock(&self) -> Option<DateTime<Utc>> {
        self.clock
    }

    /// When set, every fetch fails as an unreachable database would.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    fn check_available(&self) -> Result<()> {
        if self.failing.load(Ordering::SeqCst) {
            return Err(RelayError::Repository("connection refused (simulated)".to_string()));
        }
        Ok(())
    }

    fn now(&self) -> DateTime<Utc> {
        self.clock.unwrap_or_else(Utc::now)
    }
}

#[async_trait]
impl Repository for MemoryRepository {
    async fn fetch_latest_readings(&self, limit: usize) -> Result<Vec<Reading>> {
        self.check_available()?;
        Ok(self.readings.iter().take(limit).cloned().collect())
    }

    async fn fetch_incidents(&self, since_hours: i64, limit: usize) -> Result<Vec<IncidentReport>> {
        self.check_available()?;
        let since = window_start(self.now(), since_hours)?;
        Ok(self
            .incidents
            .iter()
            .filter(|r| r.observed_at >= since)
            .take(limit)
            .cloned()
            .collect())
    }
}
