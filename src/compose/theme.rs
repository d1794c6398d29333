//! Severity-driven card styling.
//!
//! One row per tier, indexed by `SeverityTier::index`, so the lookup is
//! total over every tier and adding a tier fails to compile until the table
//! grows with it.

use crate::alert::thresholds::SeverityTier;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Theme {
    pub status_label: &'static str,
    pub accent_color: &'static str,
    /// Hero image file name, resolved against the configured asset base URL.
    pub background: &'static str,
}

const THEMES: [Theme; SeverityTier::ALL.len()] = [
    Theme {
        status_label: "Normal",
        accent_color: "#1E8449",
        background: "level_normal.png",
    },
    Theme {
        status_label: "Warning",
        accent_color: "#D68910",
        background: "level_warning.png",
    },
    Theme {
        status_label: "Danger",
        accent_color: "#C0392B",
        background: "level_danger.png",
    },
];

/// Background for history cards.
pub const HISTORY_BACKGROUND: &str = "history.png";

/// Background for incident report cards.
pub const INCIDENT_BACKGROUND: &str = "incident.png";

/// Muted colour for secondary notices.
pub const NOTICE_COLOR: &str = "#7F8C8D";

pub fn theme_for(tier: SeverityTier) -> &'static Theme {
    &THEMES[tier.index()]
}

/// Joins an asset file name onto the base URL, if one is configured.
pub fn asset_url(base: Option<&str>, file: &str) -> Option<String> {
    base.map(|b| format!("{}/{}", b.trim_end_matches('/'), file))
}
