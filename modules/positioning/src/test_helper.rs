use crate::LocationListener;
use common::fix::Fix;
use common::provider::{ProviderId, ProviderStatus};
use std::sync::Mutex;
use std::time::Duration;
use tokio::sync::mpsc;
use tokio::time::timeout;

/// A callback received by a [`RecordingListener`].
#[derive(Debug, Clone, PartialEq)]
pub enum Notification {
    Fix(Fix),
    Status(ProviderId, ProviderStatus),
    Enabled(ProviderId),
    Disabled(ProviderId),
}

/// A [`LocationListener`] that forwards every callback into a channel.
///
/// Backends that deliver from background tasks are tested by awaiting the
/// notifications with [`next_notification`] or [`next_fix`].
pub struct RecordingListener {
    sender: mpsc::UnboundedSender<Notification>,
    receiver: Mutex<Option<mpsc::UnboundedReceiver<Notification>>>,
}

impl Default for RecordingListener {
    fn default() -> Self {
        let (sender, receiver) = mpsc::unbounded_channel();
        RecordingListener {
            sender,
            receiver: Mutex::new(Some(receiver)),
        }
    }
}

impl RecordingListener {
    /// Takes the receiving side of the recorded notifications.
    ///
    /// # Panics
    ///
    /// Panics when called twice.
    pub fn notifications(&self) -> mpsc::UnboundedReceiver<Notification> {
        self.receiver
            .lock()
            .unwrap()
            .take()
            .expect("Notifications of the RecordingListener already taken")
    }
}

/// Waits up to `duration` for the next notification.
///
/// # Panics
///
/// Panics if nothing was received in time.
pub async fn next_notification(
    rx: &mut mpsc::UnboundedReceiver<Notification>,
    duration: Duration,
) -> Notification {
    timeout(duration, rx.recv())
        .await
        .unwrap_or_else(|_| panic!("No notification received within {duration:?}"))
        .expect("Notification channel closed")
}

/// Waits up to `duration` for the next fix, skipping other notifications.
pub async fn next_fix(rx: &mut mpsc::UnboundedReceiver<Notification>, duration: Duration) -> Fix {
    let deadline = tokio::time::Instant::now() + duration;
    loop {
        let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
        if let Notification::Fix(fix) = next_notification(rx, remaining).await {
            return fix;
        }
    }
}

impl LocationListener for RecordingListener {
    fn on_location_changed(&self, fix: Fix) {
        let _ = self.sender.send(Notification::Fix(fix));
    }

    fn on_status_changed(&self, provider: &ProviderId, status: ProviderStatus) {
        let _ = self
            .sender
            .send(Notification::Status(provider.clone(), status));
    }

    fn on_provider_enabled(&self, provider: &ProviderId) {
        let _ = self.sender.send(Notification::Enabled(provider.clone()));
    }

    fn on_provider_disabled(&self, provider: &ProviderId) {
        let _ = self.sender.send(Notification::Disabled(provider.clone()));
    }
}
