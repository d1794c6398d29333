/// Reading staleness detection.
///
/// The gauge normally reports every few minutes. When the newest reading in
/// the store is old, the level shown to a chat user may no longer reflect the
/// river; the current-level card flags that case instead of silently
/// presenting an outdated number as current.
///
/// # Clock injection
/// All functions accept a `now: DateTime<Utc>` parameter rather than calling
/// `Utc::now()` internally, so staleness is deterministic in tests.

use chrono::{DateTime, Utc};

use crate::model::Reading;

// ---------------------------------------------------------------------------
// Staleness check
// ---------------------------------------------------------------------------

/// Age of the reading in whole minutes relative to `now`.
///
/// Readings stamped in the future (clock skew between gauge and relay) have
/// an age of zero.
pub fn age_minutes_at(reading: &Reading, now: DateTime<Utc>) -> u64 {
    (now - reading.observed_at).num_minutes().max(0) as u64
}

/// Returns `true` if the reading is older than `max_age_minutes` relative
/// to `now`.
///
/// Staleness is defined as strictly greater than the threshold:
///   age > max_age_minutes  →  stale
///   age == max_age_minutes →  not stale
pub fn is_stale_at(reading: &Reading, max_age_minutes: u64, now: DateTime<Utc>) -> bool {
    age_minutes_at(reading, now) > max_age_minutes
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
