//! 설정 관리 — errwatch.toml 파싱 및 런타임 설정
//!
//! [`ErrwatchConfig`]는 모든 모듈의 설정을 담는 최상위 구조체입니다.
//!
//! # 설정 로딩 우선순위
//! 1. CLI 인자 (최고 우선)
//! 2. 환경변수 (`ERRWATCH_FEED_WORKERS=8` 형식)
//! 3. 설정 파일 (`errwatch.toml`)
//! 4. 기본값 (선택 항목만)
//!
//! `[feed]` 섹션의 `url`, `cve_base_url`, `poll_interval_secs`, `workers`는 필수입니다.
//! 하나라도 없으면 파싱 단계에서 [`ConfigError::ParseFailed`]가 발생합니다.
//!
//! # 사용 예시
//! ```no_run
//! # async fn example() -> Result<(), errwatch_core::error::ErrwatchError> {
//! use errwatch_core::config::ErrwatchConfig;
//!
//! // 파일에서 로드 + 환경변수 오버라이드 + 검증
//! let config = ErrwatchConfig::load("errwatch.toml").await?;
//! println!("polling {} every {}s", config.feed.url, config.feed.poll_interval_secs);
//! # Ok(())
//! # }
//! ```

use std::path::Path;

use serde::{Deserialize, Serialize};
use tracing::warn;

use crate::error::{ConfigError, ErrwatchError};

/// 폴링 간격 상한 (7일)
const MAX_POLL_INTERVAL_SECS: u64 = 604_800;
/// 보강 워커 수 상한
const MAX_WORKERS: usize = 64;
/// 요청 타임아웃 상한 (10분)
const MAX_REQUEST_TIMEOUT_SECS: u64 = 600;

/// errwatch 통합 설정
///
/// `errwatch.toml` 파일의 최상위 구조를 나타냅니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrwatchConfig {
    /// 일반 설정
    #[serde(default)]
    pub general: GeneralConfig,
    /// 피드 수집 설정 (필수)
    pub feed: FeedConfig,
    /// 스토어 설정
    #[serde(default)]
    pub store: StoreConfig,
    /// 알림 설정
    #[serde(default)]
    pub notify: NotifyConfig,
    /// 메트릭 설정
    #[serde(default)]
    pub metrics: MetricsConfig,
}

impl ErrwatchConfig {
    /// TOML 파일에서 설정을 로드하고 환경변수 오버라이드를 적용한 뒤 검증합니다.
    pub async fn load(path: impl AsRef<Path>) -> Result<Self, ErrwatchError> {
        let mut config = Self::from_file(path).await?;
        config.apply_env_overrides();
        config.validate()?;
        Ok(config)
    }

    /// TOML 파일에서 설정을 로드합니다 (환경변수 오버라이드, 검증 없음).
    pub async fn from_file(path: impl AsRef<Path>) -> Result<Self, ErrwatchError> {
        let path = path.as_ref();
        let content = tokio::fs::read_to_string(path).await.map_err(|e| {
            if e.kind() == std::io::ErrorKind::NotFound {
                ErrwatchError::Config(ConfigError::FileNotFound {
                    path: path.display().to_string(),
                })
            } else {
                ErrwatchError::Io(e)
            }
        })?;
        Self::parse(&content)
    }

    /// TOML 문자열에서 설정을 파싱합니다.
    pub fn parse(toml_str: &str) -> Result<Self, ErrwatchError> {
        toml::from_str(toml_str).map_err(|e| {
            ErrwatchError::Config(ConfigError::ParseFailed {
                reason: e.to_string(),
            })
        })
    }

    /// 환경변수로 설정값을 오버라이드합니다.
    ///
    /// 환경변수 네이밍 규칙: `ERRWATCH_{SECTION}_{FIELD}`
    pub fn apply_env_overrides(&mut self) {
        // General
        override_string(&mut self.general.log_level, "ERRWATCH_GENERAL_LOG_LEVEL");
        override_string(&mut self.general.log_format, "ERRWATCH_GENERAL_LOG_FORMAT");

        // Feed
        override_string(&mut self.feed.url, "ERRWATCH_FEED_URL");
        override_string(&mut self.feed.cve_base_url, "ERRWATCH_FEED_CVE_BASE_URL");
        override_u64(
            &mut self.feed.poll_interval_secs,
            "ERRWATCH_FEED_POLL_INTERVAL_SECS",
        );
        override_usize(&mut self.feed.workers, "ERRWATCH_FEED_WORKERS");
        override_u64(
            &mut self.feed.request_timeout_secs,
            "ERRWATCH_FEED_REQUEST_TIMEOUT_SECS",
        );
        override_string(
            &mut self.feed.security_marker,
            "ERRWATCH_FEED_SECURITY_MARKER",
        );
        override_bool(&mut self.feed.run_on_start, "ERRWATCH_FEED_RUN_ON_START");

        // Store
        override_string(&mut self.store.path, "ERRWATCH_STORE_PATH");

        // Notify
        override_string(&mut self.notify.backend, "ERRWATCH_NOTIFY_BACKEND");
        override_string(&mut self.notify.command, "ERRWATCH_NOTIFY_COMMAND");

        // Metrics
        override_bool(&mut self.metrics.enabled, "ERRWATCH_METRICS_ENABLED");
        override_string(&mut self.metrics.listen_addr, "ERRWATCH_METRICS_LISTEN_ADDR");
        override_u16(&mut self.metrics.port, "ERRWATCH_METRICS_PORT");
    }

    /// 설정값의 유효성을 검증합니다.
    pub fn validate(&self) -> Result<(), ErrwatchError> {
        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.general.log_level.as_str()) {
            return Err(invalid(
                "general.log_level",
                format!("must be one of: {}", valid_levels.join(", ")),
            ));
        }

        let valid_formats = ["json", "pretty"];
        if !valid_formats.contains(&self.general.log_format.as_str()) {
            return Err(invalid(
                "general.log_format",
                format!("must be one of: {}", valid_formats.join(", ")),
            ));
        }

        self.feed.validate()?;

        if self.store.path.is_empty() {
            return Err(invalid("store.path", "must not be empty".to_owned()));
        }

        let valid_backends = ["log", "command"];
        if !valid_backends.contains(&self.notify.backend.as_str()) {
            return Err(invalid(
                "notify.backend",
                format!("must be one of: {}", valid_backends.join(", ")),
            ));
        }
        if self.notify.backend == "command" && self.notify.command.trim().is_empty() {
            return Err(invalid(
                "notify.command",
                "command must not be empty when backend is 'command'".to_owned(),
            ));
        }

        if self.metrics.enabled && self.metrics.port == 0 {
            return Err(invalid(
                "metrics.port",
                "port must be non-zero when metrics are enabled".to_owned(),
            ));
        }

        Ok(())
    }
}

fn invalid(field: &str, reason: String) -> ErrwatchError {
    ConfigError::InvalidValue {
        field: field.to_owned(),
        reason,
    }
    .into()
}

fn is_http_url(url: &str) -> bool {
    let rest = url
        .strip_prefix("https://")
        .or_else(|| url.strip_prefix("http://"));
    matches!(rest, Some(host) if !host.is_empty())
}

/// 일반 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralConfig {
    /// 로그 레벨 (trace, debug, info, warn, error)
    pub log_level: String,
    /// 로그 형식 (json, pretty)
    pub log_format: String,
}

impl Default for GeneralConfig {
    fn default() -> Self {
        Self {
            log_level: "info".to_owned(),
            log_format: "json".to_owned(),
        }
    }
}

/// 피드 수집 설정
///
/// 기본값이 없는 네 필드는 필수입니다.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FeedConfig {
    /// 권고 RSS 피드 URL
    pub url: String,
    /// CVE 상세 페이지 기본 URL (CVE 식별자를 그대로 이어 붙임)
    pub cve_base_url: String,
    /// 폴링 간격 (초)
    pub poll_interval_secs: u64,
    /// 심각도 보강 워커 수
    pub workers: usize,
    /// 요청별 타임아웃 (초)
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    /// 보안 권고 판별 표식
    #[serde(default = "default_security_marker")]
    pub security_marker: String,
    /// 시작 직후 첫 사이클 실행 여부
    #[serde(default = "default_run_on_start")]
    pub run_on_start: bool,
    /// HTTP User-Agent
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_request_timeout_secs() -> u64 {
    30
}

fn default_security_marker() -> String {
    "RHSA".to_owned()
}

fn default_run_on_start() -> bool {
    true
}

fn default_user_agent() -> String {
    concat!("errwatch/", env!("CARGO_PKG_VERSION")).to_owned()
}

impl FeedConfig {
    /// 필수 항목만으로 설정을 생성합니다. 나머지는 기본값입니다.
    pub fn new(
        url: impl Into<String>,
        cve_base_url: impl Into<String>,
        poll_interval_secs: u64,
        workers: usize,
    ) -> Self {
        Self {
            url: url.into(),
            cve_base_url: cve_base_url.into(),
            poll_interval_secs,
            workers,
            request_timeout_secs: default_request_timeout_secs(),
            security_marker: default_security_marker(),
            run_on_start: default_run_on_start(),
            user_agent: default_user_agent(),
        }
    }

    /// 피드 설정을 검증합니다.
    pub fn validate(&self) -> Result<(), ErrwatchError> {
        if !is_http_url(&self.url) {
            return Err(invalid(
                "feed.url",
                format!("'{}' is not an http(s) URL", self.url),
            ));
        }
        if !is_http_url(&self.cve_base_url) {
            return Err(invalid(
                "feed.cve_base_url",
                format!("'{}' is not an http(s) URL", self.cve_base_url),
            ));
        }
        if self.poll_interval_secs == 0 || self.poll_interval_secs > MAX_POLL_INTERVAL_SECS {
            return Err(invalid(
                "feed.poll_interval_secs",
                format!("must be 1-{MAX_POLL_INTERVAL_SECS}"),
            ));
        }
        if self.workers == 0 || self.workers > MAX_WORKERS {
            return Err(invalid("feed.workers", format!("must be 1-{MAX_WORKERS}")));
        }
        if self.request_timeout_secs == 0 || self.request_timeout_secs > MAX_REQUEST_TIMEOUT_SECS
        {
            return Err(invalid(
                "feed.request_timeout_secs",
                format!("must be 1-{MAX_REQUEST_TIMEOUT_SECS}"),
            ));
        }
        if self.security_marker.trim().is_empty() {
            return Err(invalid(
                "feed.security_marker",
                "must not be empty".to_owned(),
            ));
        }
        Ok(())
    }
}

/// 스토어 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct StoreConfig {
    /// SQLite 데이터베이스 경로
    pub path: String,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: "/var/lib/errwatch/advisories.db".to_owned(),
        }
    }
}

/// 알림 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct NotifyConfig {
    /// 알림 백엔드 (log, command)
    pub backend: String,
    /// command 백엔드가 실행할 프로그램
    pub command: String,
    /// 알림에 표시할 애플리케이션 이름
    pub app_name: String,
    /// 알림 표시 시간 (밀리초)
    pub timeout_ms: u32,
}

impl Default for NotifyConfig {
    fn default() -> Self {
        Self {
            backend: "log".to_owned(),
            command: "notify-send".to_owned(),
            app_name: "errwatch".to_owned(),
            timeout_ms: 10_000,
        }
    }
}

/// 메트릭 설정
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct MetricsConfig {
    /// Prometheus 엔드포인트 활성화 여부
    pub enabled: bool,
    /// 바인드 주소
    pub listen_addr: String,
    /// 포트
    pub port: u16,
    /// 스크레이프 경로
    pub endpoint: String,
}

impl Default for MetricsConfig {
    fn default() -> Self {
        Self {
            enabled: false,
            listen_addr: "127.0.0.1".to_owned(),
            port: 9185,
            endpoint: "/metrics".to_owned(),
        }
    }
}

// --- 환경변수 오버라이드 헬퍼 ---

fn override_string(target: &mut String, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        *target = val;
    }
}

fn override_bool(target: &mut bool, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<bool>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse bool from env var, ignoring"
            ),
        }
    }
}

fn override_usize(target: &mut usize, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<usize>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse usize from env var, ignoring"
            ),
        }
    }
}

fn override_u16(target: &mut u16, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u16>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u16 from env var, ignoring"
            ),
        }
    }
}

fn override_u64(target: &mut u64, env_key: &str) {
    if let Ok(val) = std::env::var(env_key) {
        match val.parse::<u64>() {
            Ok(parsed) => *target = parsed,
            Err(_) => warn!(
                env_key,
                value = val.as_str(),
                "failed to parse u64 from env var, ignoring"
            ),
        }
    }
}
