//! Integration tests for the postflight SDK surface
//!
//! These tests drive the real init → track → shutdown flow against an
//! unreachable endpoint to verify the fire-and-forget contract end to end:
//! tracking calls never error, never block, and delivery failures stay
//! inside the session.

use std::io::Write;

use postflight_core::{param_keys, EventParameters, Sdk, SdkConfig};

/// Config pointing at a port nothing listens on, with retries disabled so
/// delivery fails fast.
fn unreachable_config() -> SdkConfig {
    SdkConfig {
        endpoint: "http://127.0.0.1:9".to_string(),
        timeout_secs: 1,
        max_retries: 0,
        ..SdkConfig::new("pf_live_test")
    }
}

#[test]
fn test_fire_and_forget_against_unreachable_endpoint() {
    let sdk = Sdk::init(unreachable_config()).expect("init should succeed");
    let events = sdk.event_service();

    // None of these return errors or block, regardless of the dead endpoint
    events.track("purchase");
    events.track_with_parameters("level_complete", EventParameters::new().with("level", "5"));
    events.track_in_app_purchase(
        "txn-123",
        Some(
            EventParameters::new()
                .with(param_keys::REVENUE_AMOUNT, "4.99")
                .with(param_keys::REVENUE_CURRENCY, "USD"),
        ),
    );
    events.track_checkout(
        None,
        Some(EventParameters::new().with(param_keys::REVENUE_AMOUNT, "9.99")),
    );

    assert!(!sdk.check_connectivity());

    // Shutdown drains the queue; every event was attempted and dropped
    sdk.shutdown();

    let stats = sdk.stats();
    assert_eq!(stats.events_submitted, 4);
    assert_eq!(stats.events_sent, 0);
    assert_eq!(stats.events_dropped, 4);
    assert!(stats.api_failures >= 1);
    assert!(stats.api_calls >= stats.api_failures);
}

#[test]
fn test_tracking_after_shutdown_is_dropped_quietly() {
    let sdk = Sdk::init(unreachable_config()).expect("init should succeed");
    let events = sdk.event_service();

    sdk.shutdown();

    // Still no error and no block; the event is counted as dropped
    events.track("late_event");

    let stats = sdk.stats();
    assert_eq!(stats.events_submitted, 1);
    assert_eq!(stats.events_dropped, 1);
}

#[test]
fn test_init_from_config_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    write!(
        file,
        r#"
sdk_key = "pf_live_filetest"
endpoint = "http://127.0.0.1:9"
timeout_secs = 1
max_retries = 0
"#
    )
    .unwrap();

    let config = SdkConfig::load_from(&file.path().to_path_buf()).expect("config should parse");
    assert_eq!(config.sdk_key, "pf_live_filetest");

    let sdk = Sdk::init(config).expect("init should succeed");
    sdk.event_service().track("config_file_smoke");
    sdk.shutdown();
}
