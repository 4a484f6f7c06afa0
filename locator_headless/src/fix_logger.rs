use async_trait::async_trait;
use module_core::{EventKind, Module, ModuleCtx};
use tokio::sync::broadcast::error::RecvError;
use tracing::{info, warn};

/// Prints every fix and provider status change published on the bus.
pub struct FixLogger {
    ctx: ModuleCtx,
    fixes: usize,
}

impl FixLogger {
    pub fn new(ctx: ModuleCtx) -> Self {
        FixLogger { ctx, fixes: 0 }
    }
}

#[async_trait]
impl Module for FixLogger {
    async fn run(&mut self) -> Result<(), ()> {
        loop {
            match self.ctx.receiver.recv().await {
                Ok(event) => match event.kind {
                    EventKind::QuitEvent => break,
                    EventKind::FixEvent(fix) => {
                        self.fixes += 1;
                        let accuracy = fix
                            .accuracy()
                            .map(|a| format!("{a:.1} m"))
                            .unwrap_or_else(|| "unknown".to_string());
                        info!(
                            "Fix #{} lat: {:.6} lon: {:.6} accuracy: {} velocity: {:.1} m/s",
                            self.fixes,
                            fix.latitude(),
                            fix.longitude(),
                            accuracy,
                            fix.velocity()
                        );
                    }
                    EventKind::ProviderStatusEvent(change) => {
                        info!("Provider {} is {}", change.provider, change.status);
                    }
                    _ => (),
                },
                Err(RecvError::Lagged(skipped)) => warn!("Fix logger missed {skipped} events"),
                Err(RecvError::Closed) => break,
            }
        }
        info!("Received {} fixes", self.fixes);
        Ok(())
    }
}
