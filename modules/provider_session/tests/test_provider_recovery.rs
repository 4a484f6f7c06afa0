// SPDX-FileCopyrightText: 2025 All contributors
//
// SPDX-License-Identifier: GPL-2.0-or-later

use common::fix::Fix;
use common::provider::{ProviderId, ProviderStatus};
use common::test_helper::fix::fix_at;
use positioning::simulated::SimulatedPositioning;
use positioning::{Accuracy, ProviderInfo};
use provider_session::{FixConsumer, ProviderSession, SessionConfig, SessionState};
use std::sync::{Arc, Mutex};

#[derive(Clone, Default)]
struct RecordingConsumer {
    fixes: Arc<Mutex<Vec<Fix>>>,
    statuses: Arc<Mutex<Vec<(ProviderId, ProviderStatus)>>>,
}

impl FixConsumer for RecordingConsumer {
    fn on_fix(&self, fix: &Fix) {
        self.fixes.lock().unwrap().push(fix.clone());
    }

    fn on_provider_status(&self, provider: &ProviderId, status: ProviderStatus) {
        self.statuses.lock().unwrap().push((provider.clone(), status));
    }
}

fn gps() -> ProviderId {
    ProviderId::new("gps")
}

fn network() -> ProviderId {
    ProviderId::new("network")
}

fn start_session(
    subsystem: &Arc<SimulatedPositioning>,
    config: SessionConfig,
) -> (ProviderSession, RecordingConsumer) {
    let consumer = RecordingConsumer::default();
    let session = ProviderSession::create(subsystem.clone(), config, consumer.clone());
    session.start().expect("Failed to start session");
    (session, consumer)
}

fn gps_and_network() -> Arc<SimulatedPositioning> {
    Arc::new(
        SimulatedPositioning::new()
            .with_provider(ProviderInfo::new("gps", Accuracy::Fine))
            .with_provider(ProviderInfo::new("network", Accuracy::Coarse)),
    )
}

#[test_log::test]
fn prefers_the_fine_provider() {
    let subsystem = gps_and_network();
    let (session, _) = start_session(&subsystem, SessionConfig::default());
    assert_eq!(session.active_provider(), Some(gps()));
}

#[test_log::test]
fn out_of_service_switches_to_replacement() {
    let subsystem = gps_and_network();
    let (session, consumer) = start_session(&subsystem, SessionConfig::default());
    subsystem.deliver_fix(&gps(), fix_at(1.0, 1.0, 100));

    subsystem.set_status(&gps(), ProviderStatus::OutOfService);

    assert_eq!(session.state(), SessionState::Subscribed);
    assert_eq!(session.active_provider(), Some(network()));
    assert!(subsystem.registrations_of(&gps()).is_empty());
    assert_eq!(subsystem.registrations_of(&network()).len(), 1);
    assert_eq!(session.location(), Some(fix_at(1.0, 1.0, 100)));

    subsystem.deliver_fix(&network(), fix_at(2.0, 2.0, 200));
    assert_eq!(session.location(), Some(fix_at(2.0, 2.0, 200)));
    assert_eq!(consumer.fixes.lock().unwrap().len(), 2);
    assert_eq!(
        *consumer.statuses.lock().unwrap(),
        vec![(gps(), ProviderStatus::OutOfService)]
    );
}

#[test_log::test]
fn disabled_provider_switches_to_replacement() {
    let subsystem = gps_and_network();
    let (session, _) = start_session(&subsystem, SessionConfig::default());
    subsystem.disable_provider(&gps());
    assert_eq!(session.active_provider(), Some(network()));
    assert_eq!(subsystem.registration_count(), 1);
    assert_eq!(subsystem.registrations_of(&network()).len(), 1);
}

#[test_log::test]
fn disabling_another_provider_changes_nothing() {
    let subsystem = gps_and_network();
    let (session, _) = start_session(&subsystem, SessionConfig::default());
    subsystem.disable_provider(&network());
    assert_eq!(session.active_provider(), Some(gps()));
    assert_eq!(subsystem.request_count(), 1);
}

#[test_log::test]
fn lost_provider_without_replacement_keeps_registration() {
    let subsystem = Arc::new(
        SimulatedPositioning::new().with_provider(ProviderInfo::new("gps", Accuracy::Fine)),
    );
    let (session, consumer) = start_session(&subsystem, SessionConfig::default());

    subsystem.disable_provider(&gps());
    assert_eq!(session.state(), SessionState::Subscribed);
    assert_eq!(session.active_provider(), Some(gps()));
    assert_eq!(subsystem.registrations_of(&gps()).len(), 1);

    subsystem.enable_provider(&gps());
    subsystem.deliver_fix(&gps(), fix_at(1.0, 1.0, 100));
    assert_eq!(consumer.fixes.lock().unwrap().len(), 1);
    assert_eq!(subsystem.request_count(), 1);
}

#[test_log::test]
fn enabled_replacement_is_picked_up_after_loss() {
    let subsystem = Arc::new(
        SimulatedPositioning::new()
            .with_provider(ProviderInfo::new("gps", Accuracy::Fine))
            .with_provider(ProviderInfo::new("network", Accuracy::Coarse).disabled()),
    );
    let (session, _) = start_session(&subsystem, SessionConfig::default());

    subsystem.set_status(&gps(), ProviderStatus::OutOfService);
    assert_eq!(session.active_provider(), Some(gps()));

    subsystem.enable_provider(&network());
    assert_eq!(session.active_provider(), Some(network()));
    assert_eq!(subsystem.registrations_of(&network()).len(), 1);
}

#[test_log::test]
fn recovered_provider_is_kept() {
    let subsystem = Arc::new(
        SimulatedPositioning::new()
            .with_provider(ProviderInfo::new("gps", Accuracy::Fine))
            .with_provider(ProviderInfo::new("network", Accuracy::Coarse).disabled()),
    );
    let (session, _) = start_session(&subsystem, SessionConfig::default());

    subsystem.set_status(&gps(), ProviderStatus::OutOfService);
    subsystem.set_status(&gps(), ProviderStatus::Available);
    subsystem.enable_provider(&network());
    assert_eq!(session.active_provider(), Some(gps()));
    assert_eq!(subsystem.request_count(), 1);
}

#[test_log::test]
fn reselection_can_be_turned_off() {
    let subsystem = gps_and_network();
    let config = SessionConfig::default().with_reselect_on_provider_loss(false);
    let (session, _) = start_session(&subsystem, config);

    subsystem.set_status(&gps(), ProviderStatus::OutOfService);
    subsystem.disable_provider(&gps());
    assert_eq!(session.active_provider(), Some(gps()));
    assert_eq!(subsystem.registrations_of(&gps()).len(), 1);
    assert_eq!(subsystem.request_count(), 1);
}

#[test_log::test]
fn paused_session_ignores_provider_loss() {
    let subsystem = gps_and_network();
    let (session, _) = start_session(&subsystem, SessionConfig::default());
    session.pause();
    subsystem.disable_provider(&gps());
    assert_eq!(session.state(), SessionState::Unsubscribed);
    assert_eq!(session.active_provider(), Some(gps()));
}

#[test_log::test]
fn costly_provider_is_used_only_as_fallback() {
    let subsystem = Arc::new(
        SimulatedPositioning::new()
            .with_provider(ProviderInfo::new("assisted", Accuracy::Fine).with_cost())
            .with_provider(ProviderInfo::new("network", Accuracy::Coarse)),
    );
    let (session, _) = start_session(&subsystem, SessionConfig::default());
    assert_eq!(session.active_provider(), Some(network()));

    subsystem.disable_provider(&network());
    assert_eq!(session.active_provider(), Some(ProviderId::new("assisted")));
}

#[test_log::test]
fn failed_switch_keeps_the_lost_provider() {
    let subsystem = gps_and_network();
    let (session, consumer) = start_session(&subsystem, SessionConfig::default());

    subsystem.set_reachable(false);
    subsystem.set_status(&gps(), ProviderStatus::OutOfService);

    assert_eq!(session.state(), SessionState::Subscribed);
    assert_eq!(session.active_provider(), Some(gps()));
    assert_eq!(subsystem.registrations_of(&gps()).len(), 1);
    assert!(subsystem.registrations_of(&network()).is_empty());

    subsystem.set_reachable(true);
    subsystem.set_status(&gps(), ProviderStatus::Available);
    assert_eq!(subsystem.deliver_fix(&gps(), fix_at(1.0, 1.0, 100)), 1);
    assert_eq!(session.location(), Some(fix_at(1.0, 1.0, 100)));
    assert_eq!(consumer.fixes.lock().unwrap().len(), 1);
}

#[test_log::test]
fn late_status_after_pause_is_dropped() {
    let subsystem = gps_and_network();
    subsystem.defer_removals(true);
    let (session, consumer) = start_session(&subsystem, SessionConfig::default());
    session.pause();

    subsystem.set_status(&gps(), ProviderStatus::OutOfService);

    assert!(consumer.statuses.lock().unwrap().is_empty());
    assert_eq!(session.state(), SessionState::Unsubscribed);
    assert_eq!(session.active_provider(), Some(gps()));
}
