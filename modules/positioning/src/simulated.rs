use crate::{
    ListenerPtr, PositioningError, PositioningSubsystem, ProviderInfo, same_listener,
};
use common::fix::Fix;
use common::provider::{ProviderId, ProviderStatus};
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;
use tracing::debug;

/// An in-memory positioning subsystem driven by the caller.
///
/// Nothing happens on its own: fixes, status changes and enable/disable
/// transitions are injected through the `deliver_*`/`set_*` methods and
/// dispatched synchronously on the calling thread. The internal lock is
/// released before any listener is invoked, so listeners may call back into
/// the subsystem.
///
/// With [`defer_removals`](Self::defer_removals) the subsystem behaves like a
/// slow platform service that keeps delivering to a listener until the
/// removal request is processed by [`flush_removals`](Self::flush_removals).
#[derive(Default)]
pub struct SimulatedPositioning {
    state: Mutex<SimulatedState>,
}

#[derive(Default)]
struct SimulatedState {
    providers: Vec<SimulatedProvider>,
    registrations: Vec<Registration>,
    pending_removals: Vec<ListenerPtr>,
    unreachable: bool,
    defer_removals: bool,
    request_count: usize,
    removal_count: usize,
}

struct SimulatedProvider {
    info: ProviderInfo,
    last_known: Option<Fix>,
}

struct Registration {
    provider: ProviderId,
    interval: Duration,
    min_distance: f64,
    listener: ListenerPtr,
}

/// A registration as seen from the outside, for assertions in tests.
#[derive(Debug, Clone, PartialEq)]
pub struct RegistrationInfo {
    pub provider: ProviderId,
    pub interval: Duration,
    pub min_distance: f64,
}

impl SimulatedPositioning {
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a provider, builder style.
    pub fn with_provider(self, info: ProviderInfo) -> Self {
        self.add_provider(info);
        self
    }

    pub fn add_provider(&self, info: ProviderInfo) {
        self.lock().providers.push(SimulatedProvider {
            info,
            last_known: None,
        });
    }

    /// Sets the fix a provider reports as last known.
    pub fn set_last_known_fix(&self, provider: &ProviderId, fix: Option<Fix>) {
        if let Some(p) = self.lock().provider_mut(provider) {
            p.last_known = fix;
        }
    }

    /// Makes every subsequent registration fail as if the service was gone.
    pub fn set_reachable(&self, reachable: bool) {
        self.lock().unreachable = !reachable;
    }

    /// Keeps delivering to removed listeners until [`flush_removals`](Self::flush_removals).
    pub fn defer_removals(&self, defer: bool) {
        self.lock().defer_removals = defer;
    }

    /// Processes all removal requests received while removals were deferred.
    pub fn flush_removals(&self) {
        let mut state = self.lock();
        let pending = std::mem::take(&mut state.pending_removals);
        for listener in pending.iter() {
            state.drop_registrations(listener);
        }
    }

    /// Delivers `fix` to every listener registered with `provider`.
    ///
    /// The fix also becomes the provider's last known fix. Returns the number
    /// of listeners that were notified.
    pub fn deliver_fix(&self, provider: &ProviderId, fix: Fix) -> usize {
        let listeners = {
            let mut state = self.lock();
            if let Some(p) = state.provider_mut(provider) {
                p.last_known = Some(fix.clone());
            }
            state.listeners_of(provider)
        };
        debug!(
            "Delivering fix of {} to {} listeners",
            provider,
            listeners.len()
        );
        for listener in listeners.iter() {
            listener.on_location_changed(fix.clone());
        }
        listeners.len()
    }

    /// Reports a status change of `provider` to its listeners.
    pub fn set_status(&self, provider: &ProviderId, status: ProviderStatus) {
        let listeners = self.lock().listeners_of(provider);
        for listener in listeners.iter() {
            listener.on_status_changed(provider, status);
        }
    }

    pub fn enable_provider(&self, provider: &ProviderId) {
        let listeners = self.set_enabled(provider, true);
        for listener in listeners.iter() {
            listener.on_provider_enabled(provider);
        }
    }

    pub fn disable_provider(&self, provider: &ProviderId) {
        let listeners = self.set_enabled(provider, false);
        for listener in listeners.iter() {
            listener.on_provider_disabled(provider);
        }
    }

    /// Number of live registrations, pending removals included.
    pub fn registration_count(&self) -> usize {
        self.lock().registrations.len()
    }

    /// Registrations currently held for `provider`.
    pub fn registrations_of(&self, provider: &ProviderId) -> Vec<RegistrationInfo> {
        self.lock()
            .registrations
            .iter()
            .filter(|r| &r.provider == provider)
            .map(|r| RegistrationInfo {
                provider: r.provider.clone(),
                interval: r.interval,
                min_distance: r.min_distance,
            })
            .collect()
    }

    /// Number of successful `request_updates` calls so far.
    pub fn request_count(&self) -> usize {
        self.lock().request_count
    }

    /// Number of `remove_updates` calls so far.
    pub fn removal_count(&self) -> usize {
        self.lock().removal_count
    }

    fn set_enabled(&self, provider: &ProviderId, enabled: bool) -> Vec<ListenerPtr> {
        let mut state = self.lock();
        if let Some(p) = state.provider_mut(provider) {
            p.info.enabled = enabled;
        }
        state.all_listeners()
    }

    fn lock(&self) -> MutexGuard<'_, SimulatedState> {
        self.state.lock().unwrap_or_else(|state| state.into_inner())
    }
}

impl SimulatedState {
    fn provider_mut(&mut self, id: &ProviderId) -> Option<&mut SimulatedProvider> {
        self.providers.iter_mut().find(|p| &p.info.id == id)
    }

    fn listeners_of(&self, provider: &ProviderId) -> Vec<ListenerPtr> {
        self.registrations
            .iter()
            .filter(|r| &r.provider == provider)
            .map(|r| r.listener.clone())
            .collect()
    }

    fn all_listeners(&self) -> Vec<ListenerPtr> {
        let mut listeners: Vec<ListenerPtr> = Vec::new();
        for r in self.registrations.iter() {
            if !listeners.iter().any(|l| same_listener(l, &r.listener)) {
                listeners.push(r.listener.clone());
            }
        }
        listeners
    }

    fn drop_registrations(&mut self, listener: &ListenerPtr) {
        self.registrations
            .retain(|r| !same_listener(&r.listener, listener));
    }
}

impl PositioningSubsystem for SimulatedPositioning {
    fn providers(&self) -> Vec<ProviderInfo> {
        self.lock().providers.iter().map(|p| p.info.clone()).collect()
    }

    fn request_updates(
        &self,
        provider: &ProviderId,
        interval: Duration,
        min_distance: f64,
        listener: ListenerPtr,
    ) -> Result<(), PositioningError> {
        let mut state = self.lock();
        if state.unreachable {
            return Err(PositioningError::Unavailable(
                "simulated service is unreachable".to_string(),
            ));
        }
        if state.provider_mut(provider).is_none() {
            return Err(PositioningError::UnknownProvider(provider.clone()));
        }
        state.drop_registrations(&listener);
        state
            .pending_removals
            .retain(|l| !same_listener(l, &listener));
        state.registrations.push(Registration {
            provider: provider.clone(),
            interval,
            min_distance,
            listener,
        });
        state.request_count += 1;
        debug!("Registered listener for {provider} with interval {interval:?}");
        Ok(())
    }

    fn last_known_fix(&self, provider: &ProviderId) -> Option<Fix> {
        self.lock()
            .provider_mut(provider)
            .and_then(|p| p.last_known.clone())
    }

    fn remove_updates(&self, listener: &ListenerPtr) {
        let mut state = self.lock();
        state.removal_count += 1;
        if state.defer_removals {
            state.pending_removals.push(listener.clone());
        } else {
            state.drop_registrations(listener);
        }
    }
}
