/// Derived views over fetched readings.
///
/// Submodules:
/// - `trend` — rate of change, direction, and severity for a reading window.

pub mod trend;

pub use trend::{Assessment, Direction, TrendAssessment, assess_trend};
