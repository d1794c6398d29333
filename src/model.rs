/// Core data types for the flood alert relay.
///
/// This module defines the shared domain model imported by all other modules:
/// the readings and incident reports pulled from the backing store, and the
/// crate-wide error type. It contains no I/O.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

// ---------------------------------------------------------------------------
// Reading types
// ---------------------------------------------------------------------------

/// A single water level measurement from the monitored gauge.
///
/// Repositories return these newest first; the trend engine relies on that
/// ordering (index 0 is the current level, the last element is the oldest
/// reading in the window).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    /// Water level in centimetres.
    pub level_cm: f64,
    pub observed_at: DateTime<Utc>,
}

impl Reading {
    pub fn new(level_cm: f64, observed_at: DateTime<Utc>) -> Self {
        Self { level_cm, observed_at }
    }
}

/// A field report of flooding or damage in a named area.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentReport {
    pub area_name: String,
    /// Free-form severity label as entered by the reporter ("high", "moderate", ...).
    pub severity: String,
    #[serde(default)]
    pub description: Option<String>,
    pub observed_at: DateTime<Utc>,
}

/// Placeholder shown when a report carries no description.
pub const MISSING_DESCRIPTION: &str = "-";

impl IncidentReport {
    /// The description, or [`MISSING_DESCRIPTION`] when absent or blank.
    pub fn description_or_placeholder(&self) -> &str {
        match self.description.as_deref().map(str::trim) {
            Some(text) if !text.is_empty() => text,
            _ => MISSING_DESCRIPTION,
        }
    }
}

// ---------------------------------------------------------------------------
// Error types
// ---------------------------------------------------------------------------

/// Errors that can arise while fetching, delivering, or configuring.
///
/// "No data" is deliberately absent: an empty series is a normal result and
/// is carried as an empty `Vec` or `Assessment::NoData`.
#[derive(Debug, Error)]
pub enum RelayError {
    /// The backing store could not be queried.
    #[error("repository error: {0}")]
    Repository(String),

    /// The rendered message could not be delivered.
    #[error("delivery failed ({status:?}): {reason}")]
    Delivery { status: Option<u16>, reason: String },

    /// Configuration file or environment is invalid.
    #[error("configuration error: {0}")]
    Config(String),

    /// An inbound payload or fixture could not be parsed.
    #[error("parse error: {0}")]
    Parse(String),
}

impl From<postgres::Error> for RelayError {
    fn from(err: postgres::Error) -> Self {
        Self::Repository(err.to_string())
    }
}

impl From<reqwest::Error> for RelayError {
    fn from(err: reqwest::Error) -> Self {
        Self::Delivery {
            status: err.status().map(|s| s.as_u16()),
            reason: err.to_string(),
        }
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        Self::Parse(err.to_string())
    }
}

impl From<toml::de::Error> for RelayError {
    fn from(err: toml::de::Error) -> Self {
        Self::Config(err.to_string())
    }
}

/// Result type for relay operations.
pub type Result<T> = std::result::Result<T, RelayError>;

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn report(description: Option<&str>) -> IncidentReport {
        IncidentReport {
            area_name: "Riverside Market".to_string(),
            severity: "high".to_string(),
            description: description.map(String::from),
            observed_at: Utc.with_ymd_and_hms(2024, 5, 1, 13, 0, 0).unwrap(),
        }
    }

    #[test]
    fn test_missing_description_uses_placeholder() {
        assert_eq!(report(None).description_or_placeholder(), "-");
    }

    #[test]
    fn test_blank_description_uses_placeholder() {
        assert_eq!(report(Some("   ")).description_or_placeholder(), "-");
    }

    #[test]
    fn test_description_is_trimmed() {
        assert_eq!(
            report(Some("  road closed ")).description_or_placeholder(),
            "road closed"
        );
    }

    #[test]
    fn test_error_display() {
        let err = RelayError::Delivery {
            status: Some(400),
            reason: "invalid reply token".to_string(),
        };
        assert_eq!(err.to_string(), "delivery failed (Some(400)): invalid reply token");

        let err = RelayError::Repository("connection refused".to_string());
        assert_eq!(err.to_string(), "repository error: connection refused");
    }

    #[test]
    fn test_error_from_serde_json() {
        let json_err = serde_json::from_str::<String>("not json").unwrap_err();
        let err: RelayError = json_err.into();
        assert!(matches!(err, RelayError::Parse(_)));
    }
}
