//! Integration tests for metrics server functionality.
//!
//! The global recorder can be installed once per process, so only the
//! success case installs it; the failure cases bail out before installing.

use errwatch_core::config::MetricsConfig;
use errwatch_daemon::metrics_server;
use serial_test::serial;

#[test]
#[serial]
fn test_install_metrics_recorder_succeeds_with_valid_config() {
    // Given: A valid metrics configuration on a non-standard port
    let config = MetricsConfig {
        enabled: true,
        listen_addr: "127.0.0.1".to_owned(),
        port: 19185,
        endpoint: "/metrics".to_owned(),
    };

    // When
    let result = metrics_server::install_metrics_recorder(&config);

    // Then
    assert!(
        result.is_ok(),
        "install_metrics_recorder should succeed with valid config: {:?}",
        result.err()
    );
}

#[test]
#[serial]
fn test_install_metrics_recorder_fails_with_invalid_address() {
    let config = MetricsConfig {
        enabled: true,
        listen_addr: "999.999.999.999".to_owned(),
        port: 9185,
        endpoint: "/metrics".to_owned(),
    };

    let result = metrics_server::install_metrics_recorder(&config);

    assert!(
        result.is_err(),
        "install_metrics_recorder should fail with invalid address"
    );
}

#[test]
#[serial]
fn test_install_metrics_recorder_rejects_unsupported_endpoint() {
    let config = MetricsConfig {
        enabled: true,
        listen_addr: "127.0.0.1".to_owned(),
        port: 19186,
        endpoint: "/custom".to_owned(),
    };

    let result = metrics_server::install_metrics_recorder(&config);

    assert!(
        result.is_err(),
        "install_metrics_recorder should reject unsupported endpoint paths"
    );
}
