// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use crate::provider::ProviderId;
use crate::serde::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Mean earth radius in metres used for distance approximations.
const EARTH_RADIUS_M: f64 = 6_371_008.8;

/// A single positional reading produced by a location provider.
///
/// The session that tracks the "best known location" never looks inside a
/// `Fix`, it only stores and forwards it. Backends fill in what they know:
/// the horizontal accuracy and the producing provider are optional.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Fix {
    latitude: f64,
    longitude: f64,
    #[serde(default)]
    accuracy: Option<f64>,
    #[serde(default)]
    velocity: f64,
    #[serde(with = "timestamp")]
    time: DateTime<Utc>,
    #[serde(default)]
    provider: Option<ProviderId>,
}

impl Fix {
    /// Creates a new [`Fix`] with the specified latitude, longitude, velocity, and time.
    ///
    /// # Arguments
    ///
    /// * `latitude` – Latitude in decimal degrees. Positive for northern hemisphere.
    /// * `longitude` – Longitude in decimal degrees. Positive for eastern hemisphere.
    /// * `velocity` – Speed over ground in meters per second.
    /// * `time` – Timestamp of the fix in UTC.
    ///
    /// # Example
    ///
    /// ```rust
    /// use common::fix::Fix;
    ///
    /// let fix = Fix::new(52.0, 13.0, 15.5, &chrono::Utc::now());
    /// assert!(fix.accuracy().is_none());
    /// ```
    pub fn new(latitude: f64, longitude: f64, velocity: f64, time: &DateTime<Utc>) -> Fix {
        Fix {
            latitude,
            longitude,
            accuracy: None,
            velocity,
            time: *time,
            provider: None,
        }
    }

    /// Sets the horizontal accuracy (in meters) of the fix.
    pub fn with_accuracy(mut self, accuracy: f64) -> Self {
        self.accuracy = Some(accuracy);
        self
    }

    /// Tags the fix with the provider that produced it.
    pub fn with_provider(mut self, provider: ProviderId) -> Self {
        self.provider = Some(provider);
        self
    }

    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    /// Returns the latitude in decimal degrees.
    pub fn latitude(&self) -> f64 {
        self.latitude
    }

    /// Returns the longitude in decimal degrees.
    pub fn longitude(&self) -> f64 {
        self.longitude
    }

    /// Returns the horizontal accuracy in meters, if the provider reported one.
    pub fn accuracy(&self) -> Option<f64> {
        self.accuracy
    }

    /// Returns the velocity in meters per second.
    pub fn velocity(&self) -> f64 {
        self.velocity
    }

    pub fn time(&self) -> DateTime<Utc> {
        self.time
    }

    pub fn provider(&self) -> Option<&ProviderId> {
        self.provider.as_ref()
    }

    /// Great-circle distance to `other` in meters (haversine).
    pub fn distance_to(&self, other: &Fix) -> f64 {
        let lat1 = self.latitude.to_radians();
        let lat2 = other.latitude.to_radians();
        let d_lat = lat2 - lat1;
        let d_lon = (other.longitude - self.longitude).to_radians();
        let a = (d_lat / 2.0).sin().powi(2) + lat1.cos() * lat2.cos() * (d_lon / 2.0).sin().powi(2);
        2.0 * EARTH_RADIUS_M * a.sqrt().asin()
    }
}
