/// PostgreSQL repository.
///
/// Reads from the `flomon` schema (see `sql/001_relay_schema.sql`). The
/// `postgres` client is blocking, so every query runs on tokio's blocking
/// pool; the client sits behind a mutex and is used by one query at a time.
///
/// Timeouts are the connection's own (`connect_timeout`, `statement_timeout`);
/// nothing here retries.

use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use postgres::{Client, NoTls, Row};

use super::{Repository, window_start};
use crate::logging::{self, LogSource};
use crate::model::{IncidentReport, Reading, RelayError, Result};

const SCHEMA: &str = "flomon";
const CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const STATEMENT_TIMEOUT_MS: u64 = 10_000;

const LATEST_READINGS_SQL: &str = "
    SELECT level_cm, observed_at
    FROM flomon.water_levels
    ORDER BY observed_at DESC
    LIMIT $1
";

const RECENT_INCIDENTS_SQL: &str = "
    SELECT area_name, severity, description, observed_at
    FROM flomon.incident_reports
    WHERE observed_at >= $1
    ORDER BY observed_at DESC
    LIMIT $2
";

pub struct PgRepository {
    client: Arc<Mutex<Client>>,
}

impl PgRepository {
    /// Connects and checks that the `flomon` schema exists.
    pub async fn connect(database_url: &str) -> Result<Self> {
        let url = database_url.to_string();
        let client = tokio::task::spawn_blocking(move || connect_and_verify(&url))
            .await
            .map_err(|e| RelayError::Repository(format!("connect task failed: {e}")))??;
        logging::info(LogSource::Repository, None, "connected to database");
        Ok(Self {
            client: Arc::new(Mutex::new(client)),
        })
    }

    async fn run<T, F>(&self, query: F) -> Result<T>
    where
        T: Send + 'static,
        F: FnOnce(&mut Client) -> Result<T> + Send + 'static,
    {
        let client = Arc::clone(&self.client);
        tokio::task::spawn_blocking(move || {
            let mut guard = client
                .lock()
                .map_err(|_| RelayError::Repository("database client lock poisoned".to_string()))?;
            query(&mut guard)
        })
        .await
        .map_err(|e| RelayError::Repository(format!("query task failed: {e}")))?
    }
}

fn connect_and_verify(database_url: &str) -> Result<Client> {
    let mut config: postgres::Config = database_url.parse()?;
    config.connect_timeout(CONNECT_TIMEOUT);
    let mut client = config.connect(NoTls)?;
    client.batch_execute(&format!("SET statement_timeout = {STATEMENT_TIMEOUT_MS}"))?;

    let row = client.query_one(
        "SELECT EXISTS (SELECT 1 FROM information_schema.schemata WHERE schema_name = $1)",
        &[&SCHEMA],
    )?;
    let exists: bool = row.try_get(0)?;
    if !exists {
        return Err(RelayError::Repository(format!(
            "schema '{SCHEMA}' not found; apply sql/001_relay_schema.sql"
        )));
    }
    Ok(client)
}

fn reading_from_row(row: &Row) -> Result<Reading> {
    Ok(Reading {
        level_cm: row.try_get(0)?,
        observed_at: row.try_get(1)?,
    })
}

fn incident_from_row(row: &Row) -> Result<IncidentReport> {
    Ok(IncidentReport {
        area_name: row.try_get(0)?,
        severity: row.try_get(1)?,
        description: row.try_get(2)?,
        observed_at: row.try_get(3)?,
    })
}

fn sql_limit(limit: usize) -> i64 {
    i64::try_from(limit).unwrap_or(i64::MAX)
}

#[async_trait]
impl Repository for PgRepository {
    async fn fetch_latest_readings(&self, limit: usize) -> Result<Vec<Reading>> {
        let limit = sql_limit(limit);
        self.run(move |client| {
            client
                .query(LATEST_READINGS_SQL, &[&limit])?
                .iter()
                .map(reading_from_row)
                .collect()
        })
        .await
    }

    async fn fetch_incidents(&self, since_hours: i64, limit: usize) -> Result<Vec<IncidentReport>> {
        let since: DateTime<Utc> = window_start(Utc::now(), since_hours)?;
        let limit = sql_limit(limit);
        self.run(move |client| {
            client
                .query(RECENT_INCIDENTS_SQL, &[&since, &limit])?
                .iter()
                .map(incident_from_row)
                .collect()
        })
        .await
    }
}
