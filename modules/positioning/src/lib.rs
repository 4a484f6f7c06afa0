// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

//! Positioning Modul for the locator
//!
//! Describes the capability a positioning subsystem offers (provider
//! selection, update registration, last-known fixes) and provides the
//! backends that implement it: an in-memory simulation, a constant route
//! simulator and a gpsd client.

use common::fix::Fix;
use common::provider::{ProviderId, ProviderStatus};
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

pub mod constant_source;
pub mod error;
pub mod gpsd_source;
pub mod selection;
pub mod simulated;
pub mod test_helper;

pub use error::PositioningError;
pub use selection::best_provider;

/// Callback target that receives fixes and provider notifications.
///
/// Implementations are invoked on whatever thread or task the subsystem
/// delivers on and must not block for long.
pub trait LocationListener: Send + Sync {
    /// A provider the listener is registered with produced a new fix.
    fn on_location_changed(&self, fix: Fix);

    /// A provider the listener is registered with changed its liveness.
    fn on_status_changed(&self, provider: &ProviderId, status: ProviderStatus);

    /// A provider of the subsystem was enabled.
    fn on_provider_enabled(&self, provider: &ProviderId);

    /// A provider of the subsystem was disabled.
    fn on_provider_disabled(&self, provider: &ProviderId);
}

/// Shared handle to a registered [`LocationListener`].
pub type ListenerPtr = Arc<dyn LocationListener>;

/// Returns true if both handles point to the same listener instance.
pub fn same_listener(lhs: &ListenerPtr, rhs: &ListenerPtr) -> bool {
    std::ptr::addr_eq(Arc::as_ptr(lhs), Arc::as_ptr(rhs))
}

/// Accuracy class of a provider, ordered from best to worst.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Accuracy {
    /// Satellite class accuracy.
    Fine,
    /// Cell or network class accuracy.
    Coarse,
}

/// Requirements a provider has to meet to be selected.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Criteria {
    /// Whether providers that may incur monetary cost are acceptable.
    pub cost_allowed: bool,
    /// The worst acceptable accuracy.
    pub accuracy: Accuracy,
    /// Only consider providers that are currently enabled.
    pub enabled_only: bool,
}

impl Default for Criteria {
    /// Fine accuracy without cost, which favors satellite providers.
    fn default() -> Self {
        Criteria {
            cost_allowed: false,
            accuracy: Accuracy::Fine,
            enabled_only: true,
        }
    }
}

/// Static description of a provider offered by a subsystem.
#[derive(Debug, Clone, PartialEq)]
pub struct ProviderInfo {
    pub id: ProviderId,
    pub accuracy: Accuracy,
    pub has_cost: bool,
    pub enabled: bool,
}

impl ProviderInfo {
    /// An enabled provider without cost.
    pub fn new(id: impl Into<String>, accuracy: Accuracy) -> Self {
        ProviderInfo {
            id: ProviderId::new(id),
            accuracy,
            has_cost: false,
            enabled: true,
        }
    }

    pub fn with_cost(mut self) -> Self {
        self.has_cost = true;
        self
    }

    pub fn disabled(mut self) -> Self {
        self.enabled = false;
        self
    }
}

/// Common interface every positioning subsystem must support.
///
/// Status notifications (`on_status_changed`) are sent to listeners
/// registered with the affected provider; enable and disable notifications
/// are sent to every registered listener.
pub trait PositioningSubsystem: Send + Sync {
    /// Lists the providers this subsystem offers.
    fn providers(&self) -> Vec<ProviderInfo>;

    /// Picks the provider that best matches `criteria`, if any.
    fn select_best_provider(&self, criteria: &Criteria) -> Option<ProviderId> {
        best_provider(&self.providers(), criteria, &[])
    }

    /// Registers `listener` for updates of `provider`.
    ///
    /// Fixes are delivered at most once per `interval` and only if the
    /// position moved at least `min_distance` meters (0 delivers every fix).
    /// Registering an already registered listener replaces its registration.
    /// The listener is never invoked from within this call.
    fn request_updates(
        &self,
        provider: &ProviderId,
        interval: Duration,
        min_distance: f64,
        listener: ListenerPtr,
    ) -> Result<(), PositioningError>;

    /// The most recent fix `provider` knows of, without waiting for a new reading.
    fn last_known_fix(&self, provider: &ProviderId) -> Option<Fix>;

    /// Removes every registration of `listener`.
    fn remove_updates(&self, listener: &ListenerPtr);
}
