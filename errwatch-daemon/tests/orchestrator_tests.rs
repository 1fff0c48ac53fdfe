//! Orchestrator integration tests.
//!
//! Tests the flow: config -> assembly -> start -> health check -> shutdown.
//! The feed points at a closed local port so every cycle fails fast at the
//! transport layer without touching the network.

use std::path::Path;
use std::time::Duration;

use errwatch_core::config::ErrwatchConfig;
use errwatch_core::pipeline::HealthStatus;
use errwatch_daemon::orchestrator::Orchestrator;
use errwatch_ingest::CycleOutcome;
use tempfile::TempDir;

fn test_config(store_dir: &Path, run_on_start: bool) -> ErrwatchConfig {
    let toml_str = format!(
        r#"
[general]
log_level = "debug"
log_format = "pretty"

[feed]
url = "http://127.0.0.1:9/errata/rss"
cve_base_url = "http://127.0.0.1:9/security/cve/"
poll_interval_secs = 3600
workers = 2
request_timeout_secs = 2
run_on_start = {run_on_start}

[store]
path = "{}"
"#,
        store_dir.join("advisories.db").display()
    );
    ErrwatchConfig::parse(&toml_str).expect("failed to parse test config")
}

#[tokio::test]
async fn test_build_opens_store_and_starts_uninitialized() {
    // Given: A valid config pointing at a fresh store directory
    let dir = TempDir::new().expect("should create temp dir");
    let config = test_config(&dir.path().join("nested"), false);

    // When
    let orchestrator = Orchestrator::build_from_config(config).expect("should build");

    // Then: Store file exists and the watcher is not yet running
    assert!(dir.path().join("nested").join("advisories.db").exists());
    assert_eq!(orchestrator.watcher().state_name(), "initialized");

    let health = orchestrator.health().await;
    assert!(health.status.is_unhealthy());
    assert_eq!(health.modules.len(), 1);
    assert_eq!(health.modules[0].name, "errata-watcher");
}

#[tokio::test]
async fn test_build_rejects_invalid_config() {
    // Given: workers out of range
    let dir = TempDir::new().expect("should create temp dir");
    let mut config = test_config(dir.path(), false);
    config.feed.workers = 0;

    // When
    let result = Orchestrator::build_from_config(config);

    // Then
    let err = result.err().expect("invalid config should be rejected");
    assert!(err.to_string().contains("feed.workers"), "got: {err}");
}

#[tokio::test]
async fn test_run_once_reports_unreachable_feed() {
    // Given
    let dir = TempDir::new().expect("should create temp dir");
    let orchestrator =
        Orchestrator::build_from_config(test_config(dir.path(), false)).expect("should build");

    // When: One cycle against a closed port
    let report = orchestrator.run_once().await;

    // Then: Feed-level transport failure, nothing attempted
    assert!(
        matches!(report.outcome, CycleOutcome::FeedUnavailable(_)),
        "unexpected outcome: {:?}",
        report.outcome
    );
    assert!(report.attempted.is_empty());
    assert_eq!(orchestrator.watcher().cycles_completed(), 1);
    assert_eq!(orchestrator.watcher().feed_failures(), 1);
}

#[tokio::test]
async fn test_run_stops_on_shutdown_token() {
    // Given: A built orchestrator running its main loop
    let dir = TempDir::new().expect("should create temp dir");
    let mut orchestrator =
        Orchestrator::build_from_config(test_config(dir.path(), true)).expect("should build");
    let token = orchestrator.shutdown_token();

    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(200)).await;
        token.cancel();
    });

    // When
    let result = tokio::time::timeout(Duration::from_secs(20), orchestrator.run()).await;

    // Then: run returns cleanly and the watcher is stopped
    let result = result.expect("run should return after the token is cancelled");
    assert!(result.is_ok(), "run failed: {:?}", result.err());
    assert_eq!(orchestrator.watcher().state_name(), "stopped");
    assert!(matches!(
        orchestrator.health().await.status,
        HealthStatus::Unhealthy(_)
    ));
}
