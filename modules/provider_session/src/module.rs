use crate::{FixPublisher, ProviderSession, SessionConfig};
use async_trait::async_trait;
use module_core::{EventKind, Module, ModuleCtx};
use positioning::PositioningSubsystem;
use std::sync::Arc;
use tokio::sync::broadcast::error::RecvError;
use tracing::{debug, error, info, warn};

/// Runs a [`ProviderSession`] on the event bus.
///
/// Every accepted fix is published as [`EventKind::FixEvent`] and every
/// provider status change as [`EventKind::ProviderStatusEvent`]. The module
/// reacts to [`EventKind::PauseLocationEvent`], [`EventKind::ResumeLocationEvent`]
/// and stops the session on [`EventKind::QuitEvent`].
pub struct LocatorModule {
    ctx: ModuleCtx,
    session: ProviderSession,
}

impl LocatorModule {
    pub fn new(
        ctx: ModuleCtx,
        subsystem: Arc<dyn PositioningSubsystem>,
        config: SessionConfig,
    ) -> Self {
        let publisher = FixPublisher::new(ctx.publisher());
        let session = ProviderSession::create(subsystem, config, publisher);
        LocatorModule { ctx, session }
    }

    pub fn session(&self) -> &ProviderSession {
        &self.session
    }
}

#[async_trait]
impl Module for LocatorModule {
    async fn run(&mut self) -> Result<(), ()> {
        if let Err(e) = self.session.start() {
            error!("Failed to start location session. Error: {e}");
            return Err(());
        }
        let mut run = true;
        while run {
            tokio::select! {
                event = self.ctx.receiver.recv() => {
                    match event {
                        Ok(event) => match event.kind {
                            EventKind::QuitEvent => {
                                self.session.stop();
                                run = false;
                            }
                            EventKind::PauseLocationEvent => {
                                debug!("Pause event received in Locator module");
                                self.session.pause();
                            }
                            EventKind::ResumeLocationEvent => {
                                debug!("Resume event received in Locator module");
                                if let Err(e) = self.session.resume() {
                                    error!("Failed to resume location session. Error: {e}");
                                }
                            }
                            _ => (),
                        },
                        Err(RecvError::Lagged(skipped)) => {
                            warn!("Locator module missed {skipped} events");
                        }
                        Err(RecvError::Closed) => {
                            self.session.stop();
                            run = false;
                        }
                    }
                }
            }
        }
        info!("Locator module finished");
        Ok(())
    }
}
