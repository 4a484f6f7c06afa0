use crate::{
    Accuracy, ListenerPtr, PositioningError, PositioningSubsystem, ProviderInfo, same_listener,
};
use chrono::{DateTime, Utc};
use common::fix::Fix;
use common::provider::{ProviderId, ProviderStatus};
use futures::StreamExt;
use gpsd_proto::{self, Mode, Satellite, Sky, Tpv};
use std::{
    net::SocketAddr,
    str::FromStr,
    sync::{Arc, Mutex, MutexGuard},
    time::Duration,
};
use tokio::time::Instant;
use tokio::{io::AsyncWriteExt, net::TcpStream, task::JoinHandle};
use tokio_util::codec::{Framed, LinesCodec};
use tracing::{debug, error, info, warn};

/// Name of the single provider offered by [`GpsdPositioning`].
pub const GPS_PROVIDER: &str = "gps";

/// A callback that has to be dispatched to a listener once the state lock is released.
enum Callback {
    Fix(Fix),
    Status(ProviderStatus),
    Disabled,
}

struct GpsdRegistration {
    listener: ListenerPtr,
    interval: Duration,
    min_distance: f64,
    last_delivery: Option<(Instant, Fix)>,
}

impl GpsdRegistration {
    fn accepts(&self, fix: &Fix, now: Instant) -> bool {
        match &self.last_delivery {
            None => true,
            Some((at, last)) => {
                now.saturating_duration_since(*at) >= self.interval
                    && (self.min_distance <= 0.0 || last.distance_to(fix) >= self.min_distance)
            }
        }
    }
}

/// State shared between the gpsd reader task and the subsystem handle.
struct GpsdRuntime {
    registrations: Vec<GpsdRegistration>,
    last_fix: Option<Fix>,
    status: Option<ProviderStatus>,
    satellites: usize,
    enabled: bool,
}

impl GpsdRuntime {
    fn new() -> Self {
        GpsdRuntime {
            registrations: Vec::new(),
            last_fix: None,
            status: None,
            satellites: 0,
            enabled: true,
        }
    }

    fn process_tpv_msg(&mut self, tpv: &Tpv, now: Instant) -> Vec<(ListenerPtr, Callback)> {
        let mut callbacks = Vec::new();
        let status = convert_mode(&tpv.mode);
        if self.status != Some(status) {
            info!("gpsd provider is {status}");
            self.status = Some(status);
            callbacks.extend(
                self.registrations
                    .iter()
                    .map(|r| (r.listener.clone(), Callback::Status(status))),
            );
        }
        let Some(fix) = fix_from_tpv(tpv) else {
            return callbacks;
        };
        self.last_fix = Some(fix.clone());
        for registration in self.registrations.iter_mut() {
            if registration.accepts(&fix, now) {
                registration.last_delivery = Some((now, fix.clone()));
                callbacks.push((registration.listener.clone(), Callback::Fix(fix.clone())));
            }
        }
        callbacks
    }

    fn process_sky_msg(&mut self, sky: &Sky) {
        let Some(ref sat) = sky.satellites else {
            return;
        };
        self.satellites = used_satellites(sat);
        debug!("gpsd uses {} satellites", self.satellites);
    }

    fn connection_lost(&mut self) -> Vec<(ListenerPtr, Callback)> {
        self.enabled = false;
        self.status = Some(ProviderStatus::OutOfService);
        let mut callbacks = Vec::new();
        for registration in self.registrations.iter() {
            callbacks.push((
                registration.listener.clone(),
                Callback::Status(ProviderStatus::OutOfService),
            ));
            callbacks.push((registration.listener.clone(), Callback::Disabled));
        }
        callbacks
    }
}

fn convert_mode(mode: &Mode) -> ProviderStatus {
    match mode {
        Mode::NoFix => ProviderStatus::TemporarilyUnavailable,
        Mode::Fix2d | Mode::Fix3d => ProviderStatus::Available,
    }
}

fn used_satellites(satellites: &[Satellite]) -> usize {
    satellites.iter().filter(|s| s.used).count()
}

fn fix_from_tpv(tpv: &Tpv) -> Option<Fix> {
    if let Mode::NoFix = tpv.mode {
        return None;
    }
    let lat = tpv.lat?;
    let lon = tpv.lon?;
    let time = tpv.time.as_ref()?;
    let datetime = DateTime::<Utc>::from_str(time).ok()?;
    let speed = tpv.speed.map_or(0.0, f64::from);
    let mut fix =
        Fix::new(lat, lon, speed, &datetime).with_provider(ProviderId::new(GPS_PROVIDER));
    let accuracy = match (tpv.epx, tpv.epy) {
        (Some(x), Some(y)) => Some(x.max(y)),
        (Some(e), None) | (None, Some(e)) => Some(e),
        (None, None) => None,
    };
    if let Some(accuracy) = accuracy {
        fix = fix.with_accuracy(f64::from(accuracy));
    }
    Some(fix)
}

fn lock_runtime(runtime: &Mutex<GpsdRuntime>) -> MutexGuard<'_, GpsdRuntime> {
    runtime.lock().unwrap_or_else(|runtime| runtime.into_inner())
}

fn dispatch(callbacks: Vec<(ListenerPtr, Callback)>) {
    let provider = ProviderId::new(GPS_PROVIDER);
    for (listener, callback) in callbacks {
        match callback {
            Callback::Fix(fix) => listener.on_location_changed(fix),
            Callback::Status(status) => listener.on_status_changed(&provider, status),
            Callback::Disabled => listener.on_provider_disabled(&provider),
        }
    }
}

async fn gpsd_reader(mut stream: TcpStream, runtime: Arc<Mutex<GpsdRuntime>>) {
    if let Err(e) = stream
        .write_all(gpsd_proto::ENABLE_WATCH_CMD.as_bytes())
        .await
    {
        error!("Failed to enable gpsd watch mode. Error: {e}");
        let callbacks = lock_runtime(&runtime).connection_lost();
        dispatch(callbacks);
        return;
    }
    let mut framed = Framed::new(stream, LinesCodec::new());
    while let Some(result) = framed.next().await {
        match result {
            Ok(ref line) => {
                if let Ok(tpv) = serde_json::from_str::<Tpv>(line) {
                    let callbacks = lock_runtime(&runtime).process_tpv_msg(&tpv, Instant::now());
                    dispatch(callbacks);
                } else if let Ok(sky) = serde_json::from_str::<Sky>(line) {
                    lock_runtime(&runtime).process_sky_msg(&sky);
                }
            }
            Err(e) => {
                warn!("gpsd receive error {e:?}");
            }
        }
    }
    warn!("gpsd closed the connection");
    let callbacks = lock_runtime(&runtime).connection_lost();
    dispatch(callbacks);
}

/// A positioning subsystem fed by a gpsd daemon.
///
/// Offers the single provider [`GPS_PROVIDER`]. The connection is opened on
/// creation, so an unreachable daemon is reported right away. When gpsd
/// closes the connection the provider reports out of service and is disabled.
pub struct GpsdPositioning {
    runtime: Arc<Mutex<GpsdRuntime>>,
    reader: JoinHandle<()>,
}

impl GpsdPositioning {
    /// Connects to the gpsd daemon at `address` (e.g. `127.0.0.1:2947`) and starts watching it.
    ///
    /// # Errors
    ///
    /// * `PositioningError::Unavailable` - If the address is invalid or the daemon can't be reached
    pub async fn new(address: &str) -> Result<Self, PositioningError> {
        let address: SocketAddr = address.parse().map_err(|e| {
            PositioningError::Unavailable(format!("invalid gpsd address {address}: {e}"))
        })?;
        let socket = TcpStream::connect(address).await.map_err(|e| {
            PositioningError::Unavailable(format!("failed to connect to gpsd at {address}: {e}"))
        })?;
        info!("Connected to gpsd at {address}");
        let runtime = Arc::new(Mutex::new(GpsdRuntime::new()));
        let reader = tokio::spawn(gpsd_reader(socket, runtime.clone()));
        Ok(GpsdPositioning { runtime, reader })
    }

    /// Number of satellites gpsd last reported as used for the solution.
    pub fn satellites(&self) -> usize {
        lock_runtime(&self.runtime).satellites
    }

    fn lock(&self) -> MutexGuard<'_, GpsdRuntime> {
        lock_runtime(&self.runtime)
    }
}

impl PositioningSubsystem for GpsdPositioning {
    fn providers(&self) -> Vec<ProviderInfo> {
        let mut info = ProviderInfo::new(GPS_PROVIDER, Accuracy::Fine);
        info.enabled = self.lock().enabled;
        vec![info]
    }

    fn request_updates(
        &self,
        provider: &ProviderId,
        interval: Duration,
        min_distance: f64,
        listener: ListenerPtr,
    ) -> Result<(), PositioningError> {
        if provider.as_str() != GPS_PROVIDER {
            return Err(PositioningError::UnknownProvider(provider.clone()));
        }
        let mut runtime = self.lock();
        runtime
            .registrations
            .retain(|r| !same_listener(&r.listener, &listener));
        runtime.registrations.push(GpsdRegistration {
            listener,
            interval,
            min_distance,
            last_delivery: None,
        });
        debug!("gpsd registration with interval {interval:?}");
        Ok(())
    }

    fn last_known_fix(&self, provider: &ProviderId) -> Option<Fix> {
        if provider.as_str() != GPS_PROVIDER {
            return None;
        }
        self.lock().last_fix.clone()
    }

    fn remove_updates(&self, listener: &ListenerPtr) {
        self.lock()
            .registrations
            .retain(|r| !same_listener(&r.listener, listener));
    }
}

impl Drop for GpsdPositioning {
    fn drop(&mut self) {
        self.reader.abort();
    }
}
