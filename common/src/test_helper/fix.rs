use crate::fix::Fix;
use chrono::{DateTime, Utc};

/// Builds a fix at the given coordinates whose timestamp is `seconds` after the unix epoch.
///
/// Tests use the timestamp only to tell fixes apart, so a plain counter is enough.
pub fn fix_at(latitude: f64, longitude: f64, seconds: i64) -> Fix {
    let time = DateTime::<Utc>::from_timestamp(seconds, 0).unwrap_or_default();
    Fix::new(latitude, longitude, 0.0, &time)
}

/// Same as [`fix_at`] with a horizontal accuracy in meters.
pub fn fix_with_accuracy(latitude: f64, longitude: f64, seconds: i64, accuracy: f64) -> Fix {
    fix_at(latitude, longitude, seconds).with_accuracy(accuracy)
}
