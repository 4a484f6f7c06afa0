use common::provider::ProviderId;
use thiserror::Error;

/// Failures reported by a positioning subsystem.
#[derive(Debug, Error)]
pub enum PositioningError {
    /// The underlying service cannot be reached.
    #[error("positioning subsystem unavailable: {0}")]
    Unavailable(String),

    #[error("unknown provider {0}")]
    UnknownProvider(ProviderId),

    /// A simulated route can't be used to produce fixes.
    #[error("invalid route: {0}")]
    InvalidRoute(String),

    #[error(transparent)]
    Io(#[from] std::io::Error),
}
