// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use chrono::{DateTime, SecondsFormat, Utc};
use serde::{self, Deserialize, Deserializer, Serializer};

/// Writes UTC with milliseconds as reported by gpsd, e.g. `2005-06-08T10:34:48.283Z`.
///
/// Times with sub-millisecond parts are written with nanoseconds so they
/// survive a round trip unchanged.
pub fn serialize<S>(time: &DateTime<Utc>, serializer: S) -> Result<S::Ok, S::Error>
where
    S: Serializer,
{
    let precision = if time.timestamp_subsec_nanos() % 1_000_000 == 0 {
        SecondsFormat::Millis
    } else {
        SecondsFormat::Nanos
    };
    serializer.serialize_str(&time.to_rfc3339_opts(precision, true))
}

/// Accepts any RFC 3339 timestamp and normalizes it to UTC.
pub fn deserialize<'de, D>(deserializer: D) -> Result<DateTime<Utc>, D::Error>
where
    D: Deserializer<'de>,
{
    let s = String::deserialize(deserializer)?;
    DateTime::parse_from_rfc3339(&s)
        .map(|time| time.with_timezone(&Utc))
        .map_err(serde::de::Error::custom)
}
