use common::fix::Fix;
use common::provider::{ProviderId, ProviderStatus, ProviderStatusChange};
use module_core::{Event, EventKind};
use std::sync::Arc;
use tracing::debug;

/// Receiver of the fixes accepted by a [`ProviderSession`](crate::ProviderSession).
///
/// `on_fix` is called once per accepted fix, on the thread the positioning
/// subsystem delivers on, while the session holds its lifecycle lock. It must
/// return quickly and must not call `pause`, `resume` or `stop` of the same
/// session. Reading the location from inside `on_fix` is fine.
pub trait FixConsumer: Send + Sync {
    fn on_fix(&self, fix: &Fix);

    /// Called for every provider status change the session observes while
    /// subscribed, under the same lock and with the same rules as `on_fix`.
    fn on_provider_status(&self, _provider: &ProviderId, _status: ProviderStatus) {}
}

impl<F> FixConsumer for F
where
    F: Fn(&Fix) + Send + Sync,
{
    fn on_fix(&self, fix: &Fix) {
        self(fix)
    }
}

/// A [`FixConsumer`] that publishes fixes and status changes on the event bus.
///
/// Fan-out to several interested modules happens on the bus, the session
/// itself only knows this single consumer.
pub struct FixPublisher {
    sender: tokio::sync::broadcast::Sender<Event>,
}

impl FixPublisher {
    pub fn new(sender: tokio::sync::broadcast::Sender<Event>) -> Self {
        FixPublisher { sender }
    }

    fn publish(&self, kind: EventKind) {
        if self.sender.send(Event { kind }).is_err() {
            debug!("No subscriber for location events");
        }
    }
}

impl FixConsumer for FixPublisher {
    fn on_fix(&self, fix: &Fix) {
        self.publish(EventKind::FixEvent(Arc::new(fix.clone())));
    }

    fn on_provider_status(&self, provider: &ProviderId, status: ProviderStatus) {
        self.publish(EventKind::ProviderStatusEvent(Arc::new(
            ProviderStatusChange {
                provider: provider.clone(),
                status,
            },
        )));
    }
}
