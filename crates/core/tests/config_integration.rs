//! errwatch.toml 통합 설정 테스트
//!
//! - errwatch.toml.example 파싱 테스트
//! - 부분 설정 로딩 테스트
//! - 환경변수 우선순위 테스트
//! - 파일 로딩 / 잘못된 형식 에러 테스트

use std::io::Write;

use errwatch_core::config::ErrwatchConfig;
use errwatch_core::error::{ConfigError, ErrwatchError};

const REQUIRED_FEED: &str = r#"
[feed]
url = "https://access.example.com/errata.rss"
cve_base_url = "https://access.example.com/security/cve/"
poll_interval_secs = 900
workers = 2
"#;

// =============================================================================
// errwatch.toml.example 파싱 테스트
// =============================================================================

#[test]
fn example_config_parses_and_validates() {
    let content = include_str!("../../../errwatch.toml.example");
    let config = ErrwatchConfig::parse(content).expect("example config should parse");
    config
        .validate()
        .expect("example config should pass validation");

    assert_eq!(config.feed.poll_interval_secs, 3600);
    assert_eq!(config.feed.workers, 4);
    assert_eq!(config.feed.security_marker, "RHSA");
    assert!(config.feed.cve_base_url.ends_with('/'));
}

#[test]
fn example_config_matches_code_defaults() {
    let content = include_str!("../../../errwatch.toml.example");
    let from_file = ErrwatchConfig::parse(content).expect("should parse");
    let from_code = ErrwatchConfig::parse(REQUIRED_FEED).expect("should parse");

    assert_eq!(from_file.general.log_level, from_code.general.log_level);
    assert_eq!(from_file.general.log_format, from_code.general.log_format);
    assert_eq!(
        from_file.feed.request_timeout_secs,
        from_code.feed.request_timeout_secs
    );
    assert_eq!(from_file.feed.run_on_start, from_code.feed.run_on_start);
    assert_eq!(from_file.store.path, from_code.store.path);
    assert_eq!(from_file.notify.backend, from_code.notify.backend);
    assert_eq!(from_file.notify.command, from_code.notify.command);
    assert_eq!(from_file.notify.timeout_ms, from_code.notify.timeout_ms);
    assert_eq!(from_file.metrics.enabled, from_code.metrics.enabled);
    assert_eq!(from_file.metrics.port, from_code.metrics.port);
    assert_eq!(from_file.metrics.endpoint, from_code.metrics.endpoint);
}

// =============================================================================
// 부분 설정 로딩 테스트
// =============================================================================

#[test]
fn partial_config_feed_and_notify() {
    let toml = format!(
        "{REQUIRED_FEED}\n[notify]\nbackend = \"command\"\ncommand = \"/usr/local/bin/alert\"\n"
    );
    let config = ErrwatchConfig::parse(&toml).expect("should parse");
    config.validate().expect("should validate");

    assert_eq!(config.notify.backend, "command");
    assert_eq!(config.notify.command, "/usr/local/bin/alert");
    // 생략된 필드는 기본값
    assert_eq!(config.notify.app_name, "errwatch");
    assert!(!config.metrics.enabled);
}

#[test]
fn empty_file_is_parse_failure() {
    let err = ErrwatchConfig::parse("").unwrap_err();
    assert!(matches!(
        err,
        ErrwatchError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[test]
fn malformed_toml_is_parse_failure() {
    let err = ErrwatchConfig::parse("[feed\nurl = ").unwrap_err();
    assert!(matches!(
        err,
        ErrwatchError::Config(ConfigError::ParseFailed { .. })
    ));
}

#[test]
fn command_backend_requires_command() {
    let toml = format!("{REQUIRED_FEED}\n[notify]\nbackend = \"command\"\ncommand = \"  \"\n");
    let config = ErrwatchConfig::parse(&toml).expect("should parse");
    let err = config.validate().unwrap_err();
    assert!(err.to_string().contains("notify.command"));
}

// =============================================================================
// 환경변수 우선순위 테스트
// =============================================================================

#[test]
#[serial_test::serial]
fn env_override_takes_precedence_over_toml() {
    let original = std::env::var("ERRWATCH_FEED_POLL_INTERVAL_SECS").ok();
    // SAFETY: serial 테스트로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("ERRWATCH_FEED_POLL_INTERVAL_SECS", "60");
    }

    let mut config = ErrwatchConfig::parse(REQUIRED_FEED).expect("should parse");
    config.apply_env_overrides();
    let result = config.feed.poll_interval_secs;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("ERRWATCH_FEED_POLL_INTERVAL_SECS", val),
            None => std::env::remove_var("ERRWATCH_FEED_POLL_INTERVAL_SECS"),
        }
    }

    assert_eq!(result, 60);
}

#[test]
#[serial_test::serial]
fn env_override_bool_accepts_false() {
    let original = std::env::var("ERRWATCH_FEED_RUN_ON_START").ok();
    // SAFETY: serial 테스트로 직렬화되어 환경변수 조작이 안전합니다.
    unsafe {
        std::env::set_var("ERRWATCH_FEED_RUN_ON_START", "false");
    }

    let mut config = ErrwatchConfig::parse(REQUIRED_FEED).expect("should parse");
    config.apply_env_overrides();
    let result = config.feed.run_on_start;

    // SAFETY: 테스트 정리
    unsafe {
        match original {
            Some(val) => std::env::set_var("ERRWATCH_FEED_RUN_ON_START", val),
            None => std::env::remove_var("ERRWATCH_FEED_RUN_ON_START"),
        }
    }

    assert!(!result);
}

// =============================================================================
// 파일 로딩 테스트
// =============================================================================

#[tokio::test]
#[serial_test::serial]
async fn load_reads_file_and_validates() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    file.write_all(REQUIRED_FEED.as_bytes()).expect("write");

    let config = ErrwatchConfig::load(file.path()).await.expect("should load");
    assert_eq!(config.feed.workers, 2);
}

#[tokio::test]
#[serial_test::serial]
async fn load_rejects_invalid_values() {
    let mut file = tempfile::NamedTempFile::new().expect("tempfile");
    let toml = REQUIRED_FEED.replace("workers = 2", "workers = 500");
    file.write_all(toml.as_bytes()).expect("write");

    let err = ErrwatchConfig::load(file.path()).await.unwrap_err();
    assert!(matches!(
        err,
        ErrwatchError::Config(ConfigError::InvalidValue { .. })
    ));
}
