// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use serde::{Deserialize, Serialize};
use std::fmt;

/// Name of a source of fixes, e.g. `"gps"` or `"network"`.
///
/// Provider ids are compared by value; two subsystems that both expose a
/// `"gps"` provider produce equal ids.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ProviderId(String);

impl ProviderId {
    /// Creates a new [`ProviderId`] from anything that converts into a [`String`].
    ///
    /// # Example
    ///
    /// ```rust
    /// use common::provider::ProviderId;
    ///
    /// let gps = ProviderId::new("gps");
    /// assert_eq!(gps.as_str(), "gps");
    /// ```
    pub fn new(id: impl Into<String>) -> Self {
        ProviderId(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ProviderId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ProviderId {
    fn from(id: &str) -> Self {
        ProviderId::new(id)
    }
}

/// Liveness of a provider as reported by the positioning subsystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ProviderStatus {
    /// The provider is out of service and not expected to recover soon.
    OutOfService,
    /// The provider is temporarily unable to deliver fixes.
    TemporarilyUnavailable,
    /// The provider is delivering fixes.
    Available,
}

impl ProviderStatus {
    /// Maps the numeric status codes used by platform location services.
    ///
    /// `0` is out of service, `1` temporarily unavailable, everything else available.
    pub fn from_code(code: i32) -> Self {
        match code {
            0 => ProviderStatus::OutOfService,
            1 => ProviderStatus::TemporarilyUnavailable,
            _ => ProviderStatus::Available,
        }
    }
}

impl fmt::Display for ProviderStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ProviderStatus::OutOfService => "OUT_OF_SERVICE",
            ProviderStatus::TemporarilyUnavailable => "TEMPORARILY_UNAVAILABLE",
            ProviderStatus::Available => "AVAILABLE",
        };
        f.write_str(name)
    }
}

/// A status change of a named provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProviderStatusChange {
    pub provider: ProviderId,
    pub status: ProviderStatus,
}
