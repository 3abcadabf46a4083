/// Reading age and staleness.
///
/// A failed poll leaves the previous reading on screen. Nothing marks it as
/// old except its timestamp, so the dashboard uses this module to show the
/// age of each site's latest reading and to dim readings past a threshold.
///
/// # Clock injection
/// All functions accept a `now: DateTime<Utc>` parameter rather than calling
/// `Utc::now()` internally, so tests are deterministic.

use chrono::{DateTime, Utc};
use std::time::Duration;

use crate::model::NormalizedReading;

/// Age of `reading` relative to `now`.
///
/// A reading stamped in the future (clock skew) has age zero.
pub fn age_at(reading: &NormalizedReading, now: DateTime<Utc>) -> Duration {
    (now - reading.timestamp).to_std().unwrap_or(Duration::ZERO)
}

/// Returns `true` if the reading is strictly older than `max_age`.
///
///   age > max_age   →  stale
///   age == max_age  →  not stale
pub fn is_stale_at(reading: &NormalizedReading, max_age: Duration, now: DateTime<Utc>) -> bool {
    age_at(reading, now) > max_age
}

/// Short human form used on the dashboard, e.g. `4s`, `3m 20s`, `2h 5m`.
pub fn format_age(age: Duration) -> String {
    let secs = age.as_secs();
    match secs {
        0..=59 => format!("{}s", secs),
        60..=3599 => format!("{}m {}s", secs / 60, secs % 60),
        _ => format!("{}h {}m", secs / 3600, (secs % 3600) / 60),
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
