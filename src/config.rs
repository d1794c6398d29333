/// Relay configuration.
///
/// Tunables (thresholds, pagination, command labels, query bounds) live in a
/// TOML file so each deployment can calibrate them per monitored site.
/// Credentials come from the environment, optionally via a `.env` file.
///
/// ```toml
/// [thresholds]
/// warning_cm = 20.0
/// danger_cm = 40.0
///
/// [composer]
/// history_page_size = 5
/// max_carousel_cards = 12
/// see_more_url = "https://example.org/levels"
///
/// [commands]
/// current_level = "level"
/// ```
///
/// Every section and field is optional; missing values fall back to the
/// defaults below.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::Deserialize;

use crate::alert::thresholds::SeverityThresholds;
use crate::model::{RelayError, Result};

/// Default location of the configuration file.
pub const DEFAULT_CONFIG_PATH: &str = "./relay.toml";

/// LINE caps a Flex carousel at 12 bubbles.
pub const LINE_MAX_CAROUSEL_CARDS: usize = 12;

/// Longest accepted incident window: one year.
pub const MAX_INCIDENT_WINDOW_HOURS: i64 = 365 * 24;

/// Display offsets must stay strictly within a day.
const MAX_UTC_OFFSET_MINUTES: i32 = 24 * 60 - 1;

// ---------------------------------------------------------------------------
// Sections
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct RelayConfig {
    pub thresholds: SeverityThresholds,
    pub composer: ComposerConfig,
    pub queries: QueryConfig,
    pub commands: CommandLabels,
    pub line: LineConfig,
}

/// Presentation settings for the report composer.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// Readings per history card.
    pub history_page_size: usize,
    /// Upper bound on cards in one carousel message, at most
    /// [`LINE_MAX_CAROUSEL_CARDS`].
    pub max_carousel_cards: usize,
    /// Target of the trailing "see more" card; no card when unset.
    pub see_more_url: Option<String>,
    /// Base URL for hero images; cards carry no hero when unset.
    pub asset_base_url: Option<String>,
    /// Offset applied to timestamps shown to users, in minutes east of UTC.
    pub utc_offset_minutes: i32,
    /// Age after which the current-level card warns that data may be stale.
    pub stale_after_minutes: u64,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            history_page_size: 5,
            max_carousel_cards: LINE_MAX_CAROUSEL_CARDS,
            see_more_url: None,
            asset_base_url: None,
            utc_offset_minutes: 7 * 60,
            stale_after_minutes: 60,
        }
    }
}

/// Bounds on repository reads. Every query is limited; none are unbounded.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct QueryConfig {
    /// Readings fetched to assess the current level and trend.
    pub trend_window_readings: usize,
    /// Readings fetched for the history view.
    pub history_limit: usize,
    /// Incident reports older than this are not shown. At most
    /// [`MAX_INCIDENT_WINDOW_HOURS`].
    pub incident_window_hours: i64,
    /// Maximum incident reports fetched per request.
    pub incident_limit: usize,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            trend_window_readings: 12,
            history_limit: 20,
            incident_window_hours: 24,
            incident_limit: 20,
        }
    }
}

/// Exact-match chat labels for each command.
#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct CommandLabels {
    pub current_level: String,
    pub history: String,
    pub incidents: String,
    pub combined: String,
}

impl Default for CommandLabels {
    fn default() -> Self {
        Self {
            current_level: "level".to_string(),
            history: "history".to_string(),
            incidents: "reports".to_string(),
            combined: "summary".to_string(),
        }
    }
}

#[derive(Debug, Clone, Deserialize)]
#[serde(default)]
pub struct LineConfig {
    pub api_base: String,
    pub timeout_secs: u64,
}

impl Default for LineConfig {
    fn default() -> Self {
        Self {
            api_base: "https://api.line.me".to_string(),
            timeout_secs: 10,
        }
    }
}

// ---------------------------------------------------------------------------
// Loading and validation
// ---------------------------------------------------------------------------

impl RelayConfig {
    /// Loads configuration from `path`, or defaults when the file is absent.
    pub fn load(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let text = fs::read_to_string(path).map_err(|e| {
            RelayError::Config(format!("failed to read {}: {}", path.display(), e))
        })?;
        Self::from_toml_str(&text)
    }

    /// Parses and validates a TOML document.
    pub fn from_toml_str(text: &str) -> Result<Self> {
        let config: RelayConfig = toml::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if !self.thresholds.is_ordered() {
            return Err(RelayError::Config(format!(
                "warning_cm ({}) must be below danger_cm ({})",
                self.thresholds.warning_cm, self.thresholds.danger_cm
            )));
        }
        if self.composer.history_page_size == 0 {
            return Err(config_error("history_page_size must be at least 1"));
        }
        let cards = self.composer.max_carousel_cards;
        if cards == 0 || cards > LINE_MAX_CAROUSEL_CARDS {
            return Err(RelayError::Config(format!(
                "max_carousel_cards must be between 1 and {LINE_MAX_CAROUSEL_CARDS}, got {cards}"
            )));
        }
        let offset = self.composer.utc_offset_minutes;
        if !(-MAX_UTC_OFFSET_MINUTES..=MAX_UTC_OFFSET_MINUTES).contains(&offset) {
            return Err(RelayError::Config(format!("utc_offset_minutes out of range: {offset}")));
        }
        if self.queries.trend_window_readings == 0 || self.queries.history_limit == 0 {
            return Err(config_error("reading limits must be at least 1"));
        }
        let window = self.queries.incident_window_hours;
        if !(1..=MAX_INCIDENT_WINDOW_HOURS).contains(&window) {
            return Err(RelayError::Config(format!(
                "incident_window_hours must be between 1 and {}, got {}",
                MAX_INCIDENT_WINDOW_HOURS, window
            )));
        }
        if self.queries.incident_limit == 0 {
            return Err(config_error("incident_limit must be at least 1"));
        }

        let labels = [
            &self.commands.current_level,
            &self.commands.history,
            &self.commands.incidents,
            &self.commands.combined,
        ];
        let mut seen = HashSet::new();
        for label in labels {
            let label = label.trim();
            if label.is_empty() {
                return Err(config_error("command labels must not be empty"));
            }
            if !seen.insert(label) {
                return Err(RelayError::Config(format!("duplicate command label: {label}")));
            }
        }
        Ok(())
    }
}

fn config_error(message: &str) -> RelayError {
    RelayError::Config(message.to_string())
}

// ---------------------------------------------------------------------------
// Secrets
// ---------------------------------------------------------------------------

/// Credentials read from the environment.
#[derive(Clone, Default)]
pub struct Secrets {
    pub database_url: Option<String>,
    pub line_channel_access_token: Option<String>,
}

impl Secrets {
    /// Reads `DATABASE_URL` and `LINE_CHANNEL_ACCESS_TOKEN`, loading `.env`
    /// first if one is present.
    pub fn from_env() -> Self {
        dotenv::dotenv().ok();
        Self {
            database_url: non_empty_var("DATABASE_URL"),
            line_channel_access_token: non_empty_var("LINE_CHANNEL_ACCESS_TOKEN"),
        }
    }

    pub fn require_database_url(&self) -> Result<&str> {
        self.database_url
            .as_deref()
            .ok_or_else(|| config_error("DATABASE_URL must be set"))
    }

    pub fn require_line_token(&self) -> Result<&str> {
        self.line_channel_access_token
            .as_deref()
            .ok_or_else(|| config_error("LINE_CHANNEL_ACCESS_TOKEN must be set"))
    }
}

impl std::fmt::Debug for Secrets {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let redacted = |value: &Option<String>| value.as_ref().map(|_| "<redacted>");
        f.debug_struct("Secrets")
            .field("database_url", &redacted(&self.database_url))
            .field("line_channel_access_token", &redacted(&self.line_channel_access_token))
            .finish()
    }
}

fn non_empty_var(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
