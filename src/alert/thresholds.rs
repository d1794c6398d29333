//! Water level severity classification.
//!
//! Thresholds are deployment configuration, calibrated per monitored site,
//! and are loaded from `relay.toml` rather than hardcoded here.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Severity tiers, in ascending order of severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SeverityTier {
    Normal,
    Warning,
    Danger,
}

impl SeverityTier {
    /// Every tier, lowest first. Used to check that lookup tables are total.
    pub const ALL: [SeverityTier; 3] =
        [SeverityTier::Normal, SeverityTier::Warning, SeverityTier::Danger];

    /// Position of the tier in [`SeverityTier::ALL`].
    pub const fn index(self) -> usize {
        match self {
            SeverityTier::Normal => 0,
            SeverityTier::Warning => 1,
            SeverityTier::Danger => 2,
        }
    }
}

impl fmt::Display for SeverityTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            SeverityTier::Normal => write!(f, "normal"),
            SeverityTier::Warning => write!(f, "warning"),
            SeverityTier::Danger => write!(f, "danger"),
        }
    }
}

/// Level thresholds for a monitored site, in centimetres.
///
/// Levels in ascending order: `warning_cm < danger_cm`. The ordering is
/// checked when configuration is loaded.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SeverityThresholds {
    pub warning_cm: f64,
    pub danger_cm: f64,
}

impl SeverityThresholds {
    pub fn new(warning_cm: f64, danger_cm: f64) -> Self {
        Self { warning_cm, danger_cm }
    }

    /// Returns `true` when both thresholds are finite and strictly ordered.
    pub fn is_ordered(&self) -> bool {
        self.warning_cm.is_finite()
            && self.danger_cm.is_finite()
            && self.warning_cm < self.danger_cm
    }
}

impl Default for SeverityThresholds {
    fn default() -> Self {
        Self { warning_cm: 20.0, danger_cm: 40.0 }
    }
}

/// Classifies a level against the thresholds.
///
/// Checked highest tier first, and both boundaries are inclusive:
///   level >= danger   →  Danger
///   level >= warning  →  Warning
///   otherwise         →  Normal
pub fn classify_severity(level_cm: f64, thresholds: &SeverityThresholds) -> SeverityTier {
    if level_cm >= thresholds.danger_cm {
        SeverityTier::Danger
    } else if level_cm >= thresholds.warning_cm {
        SeverityTier::Warning
    } else {
        SeverityTier::Normal
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn thresholds() -> SeverityThresholds {
        SeverityThresholds::new(20.0, 40.0)
    }

    #[test]
    fn test_below_warning_is_normal() {
        assert_eq!(classify_severity(0.0, &thresholds()), SeverityTier::Normal);
        assert_eq!(classify_severity(19.99, &thresholds()), SeverityTier::Normal);
        assert_eq!(classify_severity(-5.0, &thresholds()), SeverityTier::Normal);
    }

    #[test]
    fn test_warning_boundary_is_inclusive() {
        assert_eq!(classify_severity(20.0, &thresholds()), SeverityTier::Warning);
        assert_eq!(classify_severity(39.99, &thresholds()), SeverityTier::Warning);
    }

    #[test]
    fn test_danger_boundary_is_inclusive() {
        assert_eq!(classify_severity(40.0, &thresholds()), SeverityTier::Danger);
        assert_eq!(classify_severity(250.0, &thresholds()), SeverityTier::Danger);
    }

    #[test]
    fn test_classification_follows_configured_thresholds() {
        // Same level, two sites calibrated differently.
        let low_bank = SeverityThresholds::new(50.0, 80.0);
        let high_bank = SeverityThresholds::new(120.0, 160.0);
        assert_eq!(classify_severity(90.0, &low_bank), SeverityTier::Danger);
        assert_eq!(classify_severity(90.0, &high_bank), SeverityTier::Normal);
    }

    #[test]
    fn test_tiers_are_ordered() {
        assert!(SeverityTier::Normal < SeverityTier::Warning);
        assert!(SeverityTier::Warning < SeverityTier::Danger);
        for (i, tier) in SeverityTier::ALL.iter().enumerate() {
            assert_eq!(tier.index(), i);
        }
    }

    #[test]
    fn test_threshold_ordering_check() {
        assert!(thresholds().is_ordered());
        assert!(!SeverityThresholds::new(40.0, 40.0).is_ordered());
        assert!(!SeverityThresholds::new(50.0, 40.0).is_ordered());
        assert!(!SeverityThresholds::new(f64::NAN, 40.0).is_ordered());
    }
}
