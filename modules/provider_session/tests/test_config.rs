use positioning::Accuracy;
use provider_session::SessionConfig;
use std::time::Duration;

#[test]
fn default_config() {
    let config = SessionConfig::default();
    assert_eq!(config.poll_interval(), Duration::from_secs(1));
    assert_eq!(config.min_distance, 0.0);
    assert_eq!(config.criteria.accuracy, Accuracy::Fine);
    assert!(!config.criteria.cost_allowed);
    assert!(config.criteria.enabled_only);
    assert!(config.reselect_on_provider_loss);
}

#[test]
fn empty_json_gives_default_config() {
    let config = SessionConfig::from_json("{}").unwrap();
    assert_eq!(config, SessionConfig::default());
}

#[test]
fn parse_full_config() {
    let json = r#"{
        "poll_interval_ms": 5000,
        "min_distance": 12.5,
        "criteria": {
            "cost_allowed": true,
            "accuracy": "coarse",
            "enabled_only": false
        },
        "reselect_on_provider_loss": false
    }"#;
    let config = SessionConfig::from_json(json).unwrap();
    assert_eq!(config.poll_interval(), Duration::from_millis(5000));
    assert_eq!(config.min_distance, 12.5);
    assert!(config.criteria.cost_allowed);
    assert_eq!(config.criteria.accuracy, Accuracy::Coarse);
    assert!(!config.criteria.enabled_only);
    assert!(!config.reselect_on_provider_loss);
}

#[test]
fn reject_unknown_accuracy() {
    let json = r#"{ "criteria": { "accuracy": "perfect" } }"#;
    assert!(SessionConfig::from_json(json).is_err());
}

#[test]
fn builder_overrides_fields() {
    let config = SessionConfig::default()
        .with_poll_interval(Duration::from_millis(250))
        .with_min_distance(3.0)
        .with_reselect_on_provider_loss(false);
    assert_eq!(config.poll_interval_ms, 250);
    assert_eq!(config.min_distance, 3.0);
    assert!(!config.reselect_on_provider_loss);
}
