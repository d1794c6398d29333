//! Rate-of-change and severity assessment for a window of readings.
//!
//! The rate is measured across the whole fetched window (newest against
//! oldest), not between adjacent samples. Gauge telemetry is noisy sample to
//! sample; spanning the window smooths transient spikes at the cost of some
//! responsiveness.

use std::fmt;

use chrono::{DateTime, Utc};

use crate::alert::thresholds::{SeverityThresholds, SeverityTier, classify_severity};
use crate::model::Reading;

/// Direction of the level over the assessed window.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Rising,
    Falling,
    Steady,
}

impl fmt::Display for Direction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Direction::Rising => write!(f, "rising"),
            Direction::Falling => write!(f, "falling"),
            Direction::Steady => write!(f, "steady"),
        }
    }
}

/// Derived view of the current level; computed per request and discarded.
#[derive(Debug, Clone, PartialEq)]
pub struct TrendAssessment {
    pub current_level_cm: f64,
    /// Timestamp of the newest reading.
    pub observed_at: DateTime<Utc>,
    pub direction: Direction,
    /// Centimetres per hour, rounded to 2 decimal places.
    pub rate_per_hour: f64,
    pub severity: SeverityTier,
}

/// Outcome of [`assess_trend`]. An empty window is a normal result.
#[derive(Debug, Clone, PartialEq)]
pub enum Assessment {
    NoData,
    Trend(TrendAssessment),
}

impl Assessment {
    pub fn trend(&self) -> Option<&TrendAssessment> {
        match self {
            Assessment::Trend(t) => Some(t),
            Assessment::NoData => None,
        }
    }
}

/// Assesses a window of readings ordered newest first.
///
/// - no readings: `NoData`
/// - one reading: `Steady` at 0 cm/h
/// - otherwise: `(newest - oldest) / hours_between`, 0 when the span is not positive
pub fn assess_trend(readings: &[Reading], thresholds: &SeverityThresholds) -> Assessment {
    let Some(newest) = readings.first() else {
        return Assessment::NoData;
    };
    let severity = classify_severity(newest.level_cm, thresholds);

    let (direction, rate_per_hour) = match readings.last() {
        Some(oldest) if readings.len() > 1 => window_rate(newest, oldest),
        _ => (Direction::Steady, 0.0),
    };

    Assessment::Trend(TrendAssessment {
        current_level_cm: newest.level_cm,
        observed_at: newest.observed_at,
        direction,
        rate_per_hour,
        severity,
    })
}

fn window_rate(newest: &Reading, oldest: &Reading) -> (Direction, f64) {
    let delta_level = newest.level_cm - oldest.level_cm;
    let delta_hours = (newest.observed_at - oldest.observed_at).num_seconds() as f64 / 3600.0;

    let rate = if delta_hours > 0.0 { delta_level / delta_hours } else { 0.0 };

    let direction = if delta_level > 0.0 {
        Direction::Rising
    } else if delta_level < 0.0 {
        Direction::Falling
    } else {
        Direction::Steady
    };

    (direction, round_2dp(rate))
}

fn round_2dp(value: f64) -> f64 {
    (value * 100.0).round() / 100.0
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
