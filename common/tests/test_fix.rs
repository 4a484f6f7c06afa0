// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use chrono::{DateTime, Utc};
use common::fix::Fix;
use common::provider::ProviderId;
use std::str::FromStr;

fn get_fix_as_json<'a>() -> &'a str {
    r#"
    {
        "latitude": 52.025833,
        "longitude": 11.279166,
        "accuracy": 4.5,
        "velocity": 10,
        "time": "2005-06-08T10:34:48.283Z",
        "provider": "gps"
    }
    "#
}

fn get_fix() -> Fix {
    Fix::new(
        52.025833,
        11.279166,
        10.0,
        &DateTime::<Utc>::from_str("2005-06-08T10:34:48.283Z").unwrap(),
    )
    .with_accuracy(4.5)
    .with_provider(ProviderId::new("gps"))
}

#[test]
pub fn deserialize_fix_from_json() {
    let fix = Fix::from_json(get_fix_as_json())
        .unwrap_or_else(|e| panic!("Failed to deserialize the raw json. Reason: {e}"));
    assert_eq!(fix, get_fix());
}

#[test]
pub fn deserialize_fix_without_optional_fields() {
    let json = r#"{ "latitude": 1.0, "longitude": 2.0, "time": "1970-01-01T00:01:40.000Z" }"#;
    let fix = Fix::from_json(json)
        .unwrap_or_else(|e| panic!("Failed to deserialize the raw json. Reason: {e}"));
    assert_eq!(fix.accuracy(), None);
    assert_eq!(fix.provider(), None);
    assert_eq!(fix.velocity(), 0.0);
    assert_eq!(fix.time().timestamp(), 100);
}

#[test]
pub fn serialize_timestamp_with_milliseconds() {
    let json = serde_json::to_value(get_fix()).unwrap();
    assert_eq!(json["time"], "2005-06-08T10:34:48.283Z");
}

#[test]
pub fn keep_sub_millisecond_timestamp_in_json() {
    let time = DateTime::<Utc>::from_str("2005-06-08T10:34:48.283456789Z").unwrap();
    let fix = Fix::new(52.025833, 11.279166, 10.0, &time);
    let json = serde_json::to_string(&fix).unwrap();
    assert!(json.contains("\"2005-06-08T10:34:48.283456789Z\""), "json was {json}");
    assert_eq!(Fix::from_json(&json).unwrap(), fix);
}

#[test]
pub fn distance_between_fixes() {
    let time = Utc::now();
    let start = Fix::new(52.0, 11.0, 0.0, &time);
    let one_degree_north = Fix::new(53.0, 11.0, 0.0, &time);
    let distance = start.distance_to(&one_degree_north);
    assert!((distance - 111_195.0).abs() < 10.0, "distance was {distance}");
    assert_eq!(start.distance_to(&start), 0.0);
}
