use crate::{
    Accuracy, ListenerPtr, PositioningError, PositioningSubsystem, ProviderInfo, same_listener,
};
use chrono::Utc;
use common::fix::Fix;
use common::position::Position;
use common::provider::ProviderId;
use std::sync::{Arc, Mutex, MutexGuard, Weak};
use std::time::Duration;
use tokio::task::JoinHandle;
use tokio::time::Instant;
use tracing::{debug, warn};
use utm::{lat_lon_to_zone_number, lat_to_zone_letter, to_utm_wgs84, wsg84_utm_to_lat_lon};

/// Name of the single provider offered by [`ConstantPositioning`].
pub const CONSTANT_PROVIDER: &str = "constant";

#[derive(Debug, Clone, Copy, Default, PartialEq)]
struct UtmPoint {
    northing: f64,
    easting: f64,
}

impl UtmPoint {
    fn distance_to(&self, other: &UtmPoint) -> f64 {
        let dn = other.northing - self.northing;
        let de = other.easting - self.easting;
        (dn * dn + de * de).sqrt()
    }
}

/// Moves along a closed route with a constant velocity.
///
/// The walker keeps driving while nobody listens: its position depends only
/// on the time passed since it was first advanced.
struct RouteWalker {
    points: Vec<UtmPoint>,
    zone: u8,
    zone_letter: char,
    lap_length: f64,
    next_point: usize,
    current: UtmPoint,
    velocity: f64,
    last_advance: Option<Instant>,
}

impl RouteWalker {
    fn new(positions: &[Position], velocity: f64) -> Result<Self, PositioningError> {
        let Some(first) = positions.first() else {
            return Err(PositioningError::InvalidRoute(
                "positions parameter is empty".to_string(),
            ));
        };
        // The whole route is projected into the zone of its first point.
        let zone = lat_lon_to_zone_number(first.latitude, first.longitude);
        let Some(zone_letter) = lat_to_zone_letter(first.latitude) else {
            return Err(PositioningError::InvalidRoute(format!(
                "Position lat: {}, long: {} can't be converted to a UTM zone",
                first.latitude, first.longitude
            )));
        };
        let points: Vec<UtmPoint> = positions
            .iter()
            .map(|pos| {
                let (northing, easting, _) = to_utm_wgs84(pos.latitude, pos.longitude, zone);
                UtmPoint { northing, easting }
            })
            .collect();
        let lap_length = points
            .iter()
            .zip(points.iter().cycle().skip(1))
            .map(|(from, to)| from.distance_to(to))
            .sum();
        Ok(RouteWalker {
            current: points[0],
            next_point: 1 % points.len(),
            points,
            zone,
            zone_letter,
            lap_length,
            velocity,
            last_advance: None,
        })
    }

    /// Advances to `now` and returns the fix at the new position.
    fn advance(&mut self, now: Instant) -> Option<Fix> {
        let elapsed = self
            .last_advance
            .map_or(Duration::ZERO, |last| now.saturating_duration_since(last));
        self.last_advance = Some(now);
        self.walk(self.velocity * elapsed.as_secs_f64());

        let (latitude, longitude) = wsg84_utm_to_lat_lon(
            self.current.easting,
            self.current.northing,
            self.zone,
            self.zone_letter,
        )
        .ok()?;
        Some(
            Fix::new(latitude, longitude, self.velocity, &Utc::now())
                .with_provider(ProviderId::new(CONSTANT_PROVIDER)),
        )
    }

    fn walk(&mut self, distance: f64) {
        if self.lap_length <= 0.0 || distance <= 0.0 {
            return;
        }
        // Full laps end where they started.
        let mut distance = distance % self.lap_length;
        while distance > 0.0 {
            let target = self.points[self.next_point];
            let remaining = self.current.distance_to(&target);
            if remaining > distance {
                let ratio = distance / remaining;
                self.current.northing += (target.northing - self.current.northing) * ratio;
                self.current.easting += (target.easting - self.current.easting) * ratio;
                return;
            }
            distance -= remaining;
            self.current = target;
            self.next_point = (self.next_point + 1) % self.points.len();
        }
    }
}

struct ConstantState {
    walker: RouteWalker,
    last_fix: Option<Fix>,
    registrations: Vec<(ListenerPtr, JoinHandle<()>)>,
}

/// A positioning subsystem that drives along a route with a constant velocity.
///
/// It offers a single always enabled provider named [`CONSTANT_PROVIDER`].
/// Every registration is served by its own tokio task that reports the
/// current position once per requested interval.
pub struct ConstantPositioning {
    state: Arc<Mutex<ConstantState>>,
    runtime: tokio::runtime::Handle,
}

impl ConstantPositioning {
    /// The shortest interval a registration is served with.
    pub const MIN_INTERVAL: Duration = Duration::from_millis(10);

    /// Creates a new ConstantPositioning
    ///
    /// # Arguments
    ///
    /// * `positions` - The route that is driven, the last point connects back to the first one
    /// * `velocity` - The velocity in meters per second, reported for every fix
    ///
    /// # Errors
    ///
    /// * `PositioningError::InvalidRoute` - If the route is empty or can't be projected
    /// * `PositioningError::Unavailable` - If called outside of a tokio runtime
    pub fn new(positions: &[Position], velocity: f64) -> Result<Self, PositioningError> {
        let walker = RouteWalker::new(positions, velocity)?;
        let runtime = tokio::runtime::Handle::try_current()
            .map_err(|e| PositioningError::Unavailable(e.to_string()))?;
        Ok(ConstantPositioning {
            state: Arc::new(Mutex::new(ConstantState {
                walker,
                last_fix: None,
                registrations: Vec::new(),
            })),
            runtime,
        })
    }

    fn lock(&self) -> MutexGuard<'_, ConstantState> {
        lock_state(&self.state)
    }
}

fn lock_state(state: &Mutex<ConstantState>) -> MutexGuard<'_, ConstantState> {
    state.lock().unwrap_or_else(|state| state.into_inner())
}

async fn route_task(
    state: Weak<Mutex<ConstantState>>,
    interval: Duration,
    min_distance: f64,
    listener: ListenerPtr,
) {
    let mut timer = tokio::time::interval(interval.max(ConstantPositioning::MIN_INTERVAL));
    let mut last_delivered: Option<Fix> = None;
    while let Some(shared) = Weak::upgrade(&state) {
        timer.tick().await;
        let fix = {
            let mut guard = lock_state(&shared);
            let Some(fix) = guard.walker.advance(Instant::now()) else {
                warn!("Route position can't be converted back to latitude and longitude");
                continue;
            };
            guard.last_fix = Some(fix.clone());
            fix
        };
        if let Some(last) = &last_delivered
            && min_distance > 0.0
            && last.distance_to(&fix) < min_distance
        {
            continue;
        }
        last_delivered = Some(fix.clone());
        listener.on_location_changed(fix);
    }
}

impl PositioningSubsystem for ConstantPositioning {
    fn providers(&self) -> Vec<ProviderInfo> {
        vec![ProviderInfo::new(CONSTANT_PROVIDER, Accuracy::Fine)]
    }

    fn request_updates(
        &self,
        provider: &ProviderId,
        interval: Duration,
        min_distance: f64,
        listener: ListenerPtr,
    ) -> Result<(), PositioningError> {
        if provider.as_str() != CONSTANT_PROVIDER {
            return Err(PositioningError::UnknownProvider(provider.clone()));
        }
        self.remove_updates(&listener);
        let handle = self.runtime.spawn(route_task(
            Arc::downgrade(&self.state),
            interval,
            min_distance,
            listener.clone(),
        ));
        self.lock().registrations.push((listener, handle));
        debug!("Constant route registration with interval {interval:?}");
        Ok(())
    }

    fn last_known_fix(&self, provider: &ProviderId) -> Option<Fix> {
        if provider.as_str() != CONSTANT_PROVIDER {
            return None;
        }
        self.lock().last_fix.clone()
    }

    fn remove_updates(&self, listener: &ListenerPtr) {
        self.lock().registrations.retain(|(registered, handle)| {
            if same_listener(registered, listener) {
                handle.abort();
                false
            } else {
                true
            }
        });
    }
}

impl Drop for ConstantPositioning {
    fn drop(&mut self) {
        for (_, handle) in self.lock().registrations.drain(..) {
            handle.abort();
        }
    }
}
