//! Level thresholds and data freshness checks.
//!
//! Submodules:
//! - `thresholds` — maps a water level to a severity tier.
//! - `staleness` — flags readings too old to present as current.

pub mod staleness;
pub mod thresholds;

pub use thresholds::{SeverityThresholds, SeverityTier, classify_severity};
