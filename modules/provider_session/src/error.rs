use common::provider::ProviderId;
use positioning::PositioningError;
use thiserror::Error;

/// Errors returned by the lifecycle operations of a [`ProviderSession`](crate::ProviderSession).
///
/// A missing provider is not an error, it is reported through
/// [`SessionState::NoProvider`](crate::SessionState::NoProvider).
#[derive(Debug, Error)]
pub enum SessionError {
    /// The positioning subsystem can't be reached.
    #[error("positioning subsystem unavailable")]
    SubsystemUnavailable(#[source] PositioningError),

    /// The subsystem refused the registration for another reason.
    #[error("failed to request updates from provider {provider}")]
    Subscribe {
        provider: ProviderId,
        #[source]
        source: PositioningError,
    },

    /// The session was stopped and can't be started or resumed again.
    #[error("session has been stopped")]
    Stopped,
}

impl SessionError {
    pub(crate) fn from_registration(provider: &ProviderId, error: PositioningError) -> Self {
        match error {
            PositioningError::Unavailable(_) => SessionError::SubsystemUnavailable(error),
            source => SessionError::Subscribe {
                provider: provider.clone(),
                source,
            },
        }
    }
}
