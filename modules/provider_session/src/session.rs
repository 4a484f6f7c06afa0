use crate::{FixConsumer, SessionConfig, SessionError};
use common::fix::Fix;
use common::provider::{ProviderId, ProviderStatus};
use positioning::{ListenerPtr, LocationListener, PositioningSubsystem, best_provider};
use std::sync::{Arc, Mutex, MutexGuard, RwLock, Weak};
use std::time::Duration;
use tracing::{debug, error, info, warn};

/// Lifecycle state of a [`ProviderSession`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SessionState {
    /// Created but not started, no subsystem call was made yet.
    Created,
    /// Registered with the active provider, fixes are delivered.
    Subscribed,
    /// Paused, the latest fix is kept.
    Unsubscribed,
    /// No provider matched the criteria, the session never fires until resumed.
    NoProvider,
    /// Stopped for good.
    Stopped,
}

struct Lifecycle {
    state: SessionState,
    provider: Option<ProviderId>,
    /// False while the active provider is disabled or out of service.
    provider_healthy: bool,
}

struct SessionCore {
    subsystem: Arc<dyn PositioningSubsystem>,
    config: SessionConfig,
    consumer: Box<dyn FixConsumer>,
    lifecycle: Mutex<Lifecycle>,
    latest: RwLock<Option<Fix>>,
    listener: ListenerPtr,
}

/// The single registration of a [`SessionCore`] with the positioning subsystem.
///
/// Holds the core weakly, the subsystem may keep the listener alive longer
/// than the session.
struct SessionListener {
    core: Weak<SessionCore>,
}

/// Tracks the best known location of one consumer.
///
/// A session keeps at most one registration with a positioning subsystem,
/// stores the latest fix it received and relays every fix to its consumer.
/// Creating a session has no side effects, [`start`](Self::start) selects a
/// provider and subscribes.
///
/// All methods take `&self`; the session can be shared between threads.
/// Dropping the session removes its registration.
///
/// # Example
///
/// ```rust
/// use common::fix::Fix;
/// use positioning::simulated::SimulatedPositioning;
/// use positioning::{Accuracy, ProviderInfo};
/// use provider_session::{ProviderSession, SessionConfig, SessionState};
/// use std::sync::Arc;
///
/// let subsystem = Arc::new(
///     SimulatedPositioning::new().with_provider(ProviderInfo::new("gps", Accuracy::Fine)),
/// );
/// let session = ProviderSession::create(
///     subsystem.clone(),
///     SessionConfig::default(),
///     |fix: &Fix| println!("new fix {fix:?}"),
/// );
/// session.start().unwrap();
/// assert_eq!(session.state(), SessionState::Subscribed);
/// assert!(!session.has_location());
/// ```
pub struct ProviderSession {
    core: Arc<SessionCore>,
}

impl ProviderSession {
    /// Creates a session without touching the subsystem.
    pub fn create(
        subsystem: Arc<dyn PositioningSubsystem>,
        config: SessionConfig,
        consumer: impl FixConsumer + 'static,
    ) -> Self {
        let core = Arc::new_cyclic(|core: &Weak<SessionCore>| SessionCore {
            subsystem,
            config,
            consumer: Box::new(consumer),
            lifecycle: Mutex::new(Lifecycle {
                state: SessionState::Created,
                provider: None,
                provider_healthy: false,
            }),
            latest: RwLock::new(None),
            listener: Arc::new(SessionListener { core: core.clone() }),
        });
        ProviderSession { core }
    }

    /// Selects a provider and subscribes to it.
    ///
    /// Finding no provider is not an error: the session enters
    /// [`SessionState::NoProvider`]. Starting a running session does nothing.
    ///
    /// # Errors
    ///
    /// * `SessionError::SubsystemUnavailable` - If the subsystem can't be reached
    /// * `SessionError::Subscribe` - If the subsystem refused the registration
    /// * `SessionError::Stopped` - If the session was stopped before
    pub fn start(&self) -> Result<(), SessionError> {
        let mut lifecycle = self.core.lock();
        match lifecycle.state {
            SessionState::Stopped => Err(SessionError::Stopped),
            SessionState::Created => {
                info!(
                    "Starting location session with interval {:?}",
                    self.core.config.poll_interval()
                );
                self.core.select_and_subscribe(&mut lifecycle)
            }
            state => {
                debug!("Location session already started, state {state:?}");
                Ok(())
            }
        }
    }

    /// Stops the delivery of fixes, the latest fix is kept.
    ///
    /// Does nothing if the session is not subscribed.
    pub fn pause(&self) {
        let mut lifecycle = self.core.lock();
        if lifecycle.state == SessionState::Subscribed {
            self.core.unsubscribe(&mut lifecycle, SessionState::Unsubscribed);
            info!("Location session paused");
        } else {
            debug!("Pause ignored in state {:?}", lifecycle.state);
        }
    }

    /// Subscribes again to the provider that was selected before the pause.
    ///
    /// The provider is not selected again, except when none was found so far.
    /// Resuming a subscribed session does nothing, resuming a created one
    /// starts it.
    ///
    /// # Errors
    ///
    /// Same as [`start`](Self::start).
    pub fn resume(&self) -> Result<(), SessionError> {
        let mut lifecycle = self.core.lock();
        match lifecycle.state {
            SessionState::Stopped => Err(SessionError::Stopped),
            SessionState::Subscribed => {
                debug!("Resume ignored, session is subscribed");
                Ok(())
            }
            SessionState::Unsubscribed => {
                info!("Resuming location session");
                self.core.subscribe(&mut lifecycle)
            }
            SessionState::Created | SessionState::NoProvider => {
                self.core.select_and_subscribe(&mut lifecycle)
            }
        }
    }

    /// Unsubscribes for good. A stopped session can't be resumed.
    pub fn stop(&self) {
        self.core.stop();
    }

    /// Forgets the latest fix.
    pub fn reset(&self) {
        *self.core.latest_mut() = None;
    }

    /// The latest fix, if any was received or found as last known fix.
    pub fn location(&self) -> Option<Fix> {
        self.core
            .latest
            .read()
            .unwrap_or_else(|latest| latest.into_inner())
            .clone()
    }

    pub fn has_location(&self) -> bool {
        self.core
            .latest
            .read()
            .unwrap_or_else(|latest| latest.into_inner())
            .is_some()
    }

    pub fn state(&self) -> SessionState {
        self.core.lock().state
    }

    pub fn is_subscribed(&self) -> bool {
        self.state() == SessionState::Subscribed
    }

    /// The provider that was selected last, if any.
    pub fn active_provider(&self) -> Option<ProviderId> {
        self.core.lock().provider.clone()
    }

    pub fn poll_interval(&self) -> Duration {
        self.core.config.poll_interval()
    }
}

impl Drop for ProviderSession {
    fn drop(&mut self) {
        self.core.stop();
    }
}

impl SessionCore {
    fn lock(&self) -> MutexGuard<'_, Lifecycle> {
        self.lifecycle
            .lock()
            .unwrap_or_else(|lifecycle| lifecycle.into_inner())
    }

    fn latest_mut(&self) -> std::sync::RwLockWriteGuard<'_, Option<Fix>> {
        self.latest
            .write()
            .unwrap_or_else(|latest| latest.into_inner())
    }

    fn select_and_subscribe(&self, lifecycle: &mut Lifecycle) -> Result<(), SessionError> {
        match self.subsystem.select_best_provider(&self.config.criteria) {
            Some(provider) => {
                info!("Selected location provider {provider}");
                lifecycle.provider = Some(provider);
                lifecycle.provider_healthy = true;
                self.subscribe(lifecycle)
            }
            None => {
                warn!("No location provider matches {:?}", self.config.criteria);
                lifecycle.state = SessionState::NoProvider;
                Ok(())
            }
        }
    }

    fn subscribe(&self, lifecycle: &mut Lifecycle) -> Result<(), SessionError> {
        if lifecycle.state == SessionState::Subscribed {
            return Ok(());
        }
        let Some(provider) = lifecycle.provider.clone() else {
            lifecycle.state = SessionState::NoProvider;
            return Ok(());
        };
        debug!(
            "Requesting updates from {provider} every {:?}",
            self.config.poll_interval()
        );
        self.subsystem
            .request_updates(
                &provider,
                self.config.poll_interval(),
                self.config.min_distance,
                self.listener.clone(),
            )
            .map_err(|e| {
                error!("Failed to request updates from {provider}. Error: {e}");
                SessionError::from_registration(&provider, e)
            })?;
        lifecycle.state = SessionState::Subscribed;
        self.seed_latest(&provider);
        Ok(())
    }

    fn seed_latest(&self, provider: &ProviderId) {
        let mut latest = self.latest_mut();
        if latest.is_none() {
            *latest = self.subsystem.last_known_fix(provider);
            if latest.is_some() {
                debug!("Seeded location from last known fix of {provider}");
            }
        }
    }

    fn unsubscribe(&self, lifecycle: &mut Lifecycle, next: SessionState) {
        if lifecycle.state == SessionState::Subscribed {
            self.subsystem.remove_updates(&self.listener);
        }
        lifecycle.state = next;
    }

    fn stop(&self) {
        let mut lifecycle = self.lock();
        if lifecycle.state != SessionState::Stopped {
            self.unsubscribe(&mut lifecycle, SessionState::Stopped);
            info!("Location session stopped");
        }
    }

    fn on_fix(&self, fix: Fix) {
        let lifecycle = self.lock();
        if lifecycle.state != SessionState::Subscribed {
            debug!("Dropping fix received in state {:?}", lifecycle.state);
            return;
        }
        *self.latest_mut() = Some(fix.clone());
        self.consumer.on_fix(&fix);
    }

    fn on_status_changed(&self, provider: &ProviderId, status: ProviderStatus) {
        info!("The status of the provider {provider} changed to {status}");
        let mut lifecycle = self.lock();
        if lifecycle.state != SessionState::Subscribed {
            debug!("Dropping status received in state {:?}", lifecycle.state);
            return;
        }
        self.consumer.on_provider_status(provider, status);
        if lifecycle.provider.as_ref() != Some(provider) {
            return;
        }
        match status {
            ProviderStatus::OutOfService => self.on_provider_lost(&mut lifecycle),
            ProviderStatus::Available => lifecycle.provider_healthy = true,
            ProviderStatus::TemporarilyUnavailable => (),
        }
    }

    fn on_provider_enabled(&self, provider: &ProviderId) {
        info!("The provider {provider} is enabled");
        let mut lifecycle = self.lock();
        if lifecycle.provider.as_ref() == Some(provider) {
            lifecycle.provider_healthy = true;
        } else if !lifecycle.provider_healthy {
            self.replace_provider(&mut lifecycle);
        }
    }

    fn on_provider_disabled(&self, provider: &ProviderId) {
        info!("The provider {provider} is disabled");
        let mut lifecycle = self.lock();
        if lifecycle.provider.as_ref() == Some(provider) {
            self.on_provider_lost(&mut lifecycle);
        }
    }

    fn on_provider_lost(&self, lifecycle: &mut Lifecycle) {
        lifecycle.provider_healthy = false;
        self.replace_provider(lifecycle);
    }

    /// Moves the registration to another provider if the active one is unhealthy.
    ///
    /// Without a replacement, or if the replacement refuses the registration,
    /// the registration with the lost provider is kept; it fires again once
    /// that provider recovers.
    fn replace_provider(&self, lifecycle: &mut Lifecycle) {
        if !self.config.reselect_on_provider_loss
            || lifecycle.state != SessionState::Subscribed
            || lifecycle.provider_healthy
        {
            return;
        }
        let Some(lost) = lifecycle.provider.clone() else {
            return;
        };
        let Some(replacement) = best_provider(
            &self.subsystem.providers(),
            &self.config.criteria,
            std::slice::from_ref(&lost),
        ) else {
            warn!("No replacement for provider {lost}, waiting for it to recover");
            return;
        };
        info!("Switching location provider from {lost} to {replacement}");
        // A new registration of the same listener replaces the one with the lost provider.
        if let Err(e) = self.subsystem.request_updates(
            &replacement,
            self.config.poll_interval(),
            self.config.min_distance,
            self.listener.clone(),
        ) {
            error!(
                "Failed to switch location provider to {replacement}, keeping {lost}. Error: {e}"
            );
            return;
        }
        lifecycle.provider = Some(replacement.clone());
        lifecycle.provider_healthy = true;
        self.seed_latest(&replacement);
    }
}

impl LocationListener for SessionListener {
    fn on_location_changed(&self, fix: Fix) {
        if let Some(core) = self.core.upgrade() {
            core.on_fix(fix);
        }
    }

    fn on_status_changed(&self, provider: &ProviderId, status: ProviderStatus) {
        if let Some(core) = self.core.upgrade() {
            core.on_status_changed(provider, status);
        }
    }

    fn on_provider_enabled(&self, provider: &ProviderId) {
        if let Some(core) = self.core.upgrade() {
            core.on_provider_enabled(provider);
        }
    }

    fn on_provider_disabled(&self, provider: &ProviderId) {
        if let Some(core) = self.core.upgrade() {
            core.on_provider_disabled(provider);
        }
    }
}
