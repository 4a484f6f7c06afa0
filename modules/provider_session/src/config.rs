use positioning::Criteria;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Settings of a [`ProviderSession`](crate::ProviderSession).
///
/// Every field has a default, so a JSON configuration only needs to name
/// what it changes:
///
/// ```rust
/// use provider_session::SessionConfig;
///
/// let config = SessionConfig::from_json(r#"{ "poll_interval_ms": 5000 }"#).unwrap();
/// assert_eq!(config.poll_interval().as_millis(), 5000);
/// assert!(config.reselect_on_provider_loss);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Requested time between two fixes in milliseconds.
    pub poll_interval_ms: u64,
    /// Minimum movement in meters between two fixes, 0 delivers every fix.
    pub min_distance: f64,
    /// Requirements for the provider selection.
    pub criteria: Criteria,
    /// Switch to another provider when the active one is disabled or out of service.
    pub reselect_on_provider_loss: bool,
}

impl Default for SessionConfig {
    fn default() -> Self {
        SessionConfig {
            poll_interval_ms: 1000,
            min_distance: 0.0,
            criteria: Criteria::default(),
            reselect_on_provider_loss: true,
        }
    }
}

impl SessionConfig {
    pub fn from_json(json: &str) -> serde_json::Result<Self> {
        serde_json::from_str(json)
    }

    pub fn with_poll_interval(mut self, interval: Duration) -> Self {
        self.poll_interval_ms = u64::try_from(interval.as_millis()).unwrap_or(u64::MAX);
        self
    }

    pub fn with_min_distance(mut self, meters: f64) -> Self {
        self.min_distance = meters;
        self
    }

    pub fn with_reselect_on_provider_loss(mut self, reselect: bool) -> Self {
        self.reselect_on_provider_loss = reselect;
        self
    }

    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}
