// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::fix::Fix;
use common::position::Position;
use common::provider::ProviderId;
use common::test_helper::route::get_route;
use positioning::constant_source::{CONSTANT_PROVIDER, ConstantPositioning};
use positioning::test_helper::{RecordingListener, next_fix};
use positioning::{ListenerPtr, PositioningError, PositioningSubsystem};
use std::sync::Arc;
use std::time::Duration;

const TIMEOUT_MS: u64 = 200;
const VELOCITY: f64 = 10.0;

fn route_point(index: usize) -> Fix {
    let route = get_route();
    Fix::new(
        route[index].latitude,
        route[index].longitude,
        0.0,
        &chrono::Utc::now(),
    )
}

fn constant() -> ProviderId {
    ProviderId::new(CONSTANT_PROVIDER)
}

#[test]
fn report_creation_error_with_empty_positions() {
    let source = ConstantPositioning::new(&[], VELOCITY);
    assert!(matches!(source, Err(PositioningError::InvalidRoute(_))));
}

#[test]
fn report_creation_error_outside_of_runtime() {
    let source = ConstantPositioning::new(&get_route(), VELOCITY);
    assert!(matches!(source, Err(PositioningError::Unavailable(_))));
}

#[tokio::test]
async fn report_creation_error_for_polar_positions() {
    let positions = vec![Position::new(&89.0, &11.0)];
    let source = ConstantPositioning::new(&positions, VELOCITY);
    assert!(matches!(source, Err(PositioningError::InvalidRoute(_))));
}

#[tokio::test]
#[test_log::test]
async fn start_at_first_route_point_and_drive_towards_the_next() {
    let source = ConstantPositioning::new(&get_route(), VELOCITY).unwrap();
    let listener = Arc::new(RecordingListener::default());
    let mut rx = listener.notifications();
    source
        .request_updates(&constant(), Duration::from_millis(50), 0.0, listener)
        .unwrap();

    let timeout = Duration::from_millis(TIMEOUT_MS);
    let first = next_fix(&mut rx, timeout).await;
    assert!(first.distance_to(&route_point(0)) < 0.5);
    assert_eq!(first.velocity(), VELOCITY);
    assert_eq!(first.provider(), Some(&constant()));

    let second = next_fix(&mut rx, timeout).await;
    let moved = first.distance_to(&second);
    assert!(moved > 0.0 && moved < 5.0, "moved {moved} meters");
    assert!(second.distance_to(&route_point(1)) < first.distance_to(&route_point(1)));
}

#[tokio::test]
async fn last_known_fix_follows_delivered_fixes() {
    let source = ConstantPositioning::new(&get_route(), VELOCITY).unwrap();
    assert_eq!(source.last_known_fix(&constant()), None);
    let listener = Arc::new(RecordingListener::default());
    let mut rx = listener.notifications();
    source
        .request_updates(&constant(), Duration::from_millis(20), 0.0, listener)
        .unwrap();
    let fix = next_fix(&mut rx, Duration::from_millis(TIMEOUT_MS)).await;
    let last_known = source
        .last_known_fix(&constant())
        .expect("No last known fix after delivery");
    assert!(last_known.time() >= fix.time());
    assert_eq!(source.last_known_fix(&"gps".into()), None);
}

#[tokio::test]
async fn no_fixes_after_remove_updates() {
    let source = ConstantPositioning::new(&get_route(), VELOCITY).unwrap();
    let listener = Arc::new(RecordingListener::default());
    let mut rx = listener.notifications();
    let listener: ListenerPtr = listener;
    source
        .request_updates(&constant(), Duration::from_millis(20), 0.0, listener.clone())
        .unwrap();
    next_fix(&mut rx, Duration::from_millis(TIMEOUT_MS)).await;
    source.remove_updates(&listener);
    while rx.try_recv().is_ok() {}
    let late = tokio::time::timeout(Duration::from_millis(100), rx.recv()).await;
    assert!(late.is_err(), "Received fix after removing the registration");
}

#[tokio::test]
async fn reject_unknown_provider() {
    let source = ConstantPositioning::new(&get_route(), VELOCITY).unwrap();
    let listener: ListenerPtr = Arc::new(RecordingListener::default());
    let result = source.request_updates(&"gps".into(), Duration::from_millis(20), 0.0, listener);
    assert!(matches!(result, Err(PositioningError::UnknownProvider(_))));
    assert_eq!(source.providers().len(), 1);
    assert_eq!(source.select_best_provider(&Default::default()), Some(constant()));
}

#[tokio::test]
#[test_log::test]
async fn skip_positions_closer_than_min_distance() {
    const MIN_DISTANCE: f64 = 20.0;
    // About one meter per tick of 10 ms.
    let source = ConstantPositioning::new(&get_route(), 100.0).unwrap();
    let every_tick = Arc::new(RecordingListener::default());
    let mut every_tick_rx = every_tick.notifications();
    let distant = Arc::new(RecordingListener::default());
    let mut distant_rx = distant.notifications();
    source
        .request_updates(&constant(), Duration::from_millis(10), 0.0, every_tick)
        .unwrap();
    source
        .request_updates(&constant(), Duration::from_millis(10), MIN_DISTANCE, distant)
        .unwrap();

    let timeout = Duration::from_millis(1000);
    let first = next_fix(&mut every_tick_rx, timeout).await;
    let second = next_fix(&mut every_tick_rx, timeout).await;
    let step = first.distance_to(&second);
    assert!(step < MIN_DISTANCE, "unthrottled step was {step} meters");

    let first = next_fix(&mut distant_rx, timeout).await;
    let second = next_fix(&mut distant_rx, timeout).await;
    let moved = first.distance_to(&second);
    assert!(moved >= MIN_DISTANCE, "moved only {moved} meters");
}
