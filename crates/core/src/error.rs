//! 에러 타입 — 도메인별 에러 정의
//!
//! 에러는 네 범주로 나뉩니다.
//!
//! 1. 설정 에러 ([`ConfigError`]) — 시작 단계에서 치명적
//! 2. 전송 에러 ([`FeedError::Fetch`]) — 현재 작업 단위만 실패
//! 3. 파싱/형식 에러 ([`FeedError::Parse`], [`FeedError::Enrichment`]) — 필드 누락으로 강등
//! 4. 저장 충돌 ([`StorageError::Duplicate`]) — 로그만 남기고 무시
//!
//! 2~4 범주는 폴링 사이클 경계를 넘어 전파되지 않습니다.

/// errwatch 최상위 에러 타입
#[derive(Debug, thiserror::Error)]
pub enum ErrwatchError {
    /// 설정 관련 에러
    #[error("config error: {0}")]
    Config(#[from] ConfigError),

    /// 피드 수집/보강 에러
    #[error("feed error: {0}")]
    Feed(#[from] FeedError),

    /// 스토리지 에러
    #[error("storage error: {0}")]
    Storage(#[from] StorageError),

    /// 파이프라인 생명주기 에러
    #[error("pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    /// I/O 에러
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),
}

/// 설정 관련 에러
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// 설정 파일을 찾을 수 없음
    #[error("config file not found: {path}")]
    FileNotFound { path: String },

    /// 설정 파싱 실패 (필수 항목 누락 포함)
    #[error("failed to parse config: {reason}")]
    ParseFailed { reason: String },

    /// 유효하지 않은 설정 값
    #[error("invalid config value for '{field}': {reason}")]
    InvalidValue { field: String, reason: String },
}

/// 피드 수집 및 보강 에러
#[derive(Debug, thiserror::Error)]
pub enum FeedError {
    /// HTTP 전송 실패
    #[error("fetch failed: {0}")]
    Fetch(String),

    /// 문서 파싱 실패
    #[error("parse failed: {0}")]
    Parse(String),

    /// 심각도 보강 실패
    #[error("enrichment failed: {0}")]
    Enrichment(String),
}

/// 스토리지 에러
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// 이미 기록된 식별자 (중복 키 경쟁)
    #[error("advisory already recorded: {id}")]
    Duplicate { id: String },

    /// 연결 실패
    #[error("connection failed: {0}")]
    Connection(String),

    /// 쿼리 실패
    #[error("query failed: {0}")]
    Query(String),
}

impl StorageError {
    /// 중복 키 충돌인지 확인합니다.
    pub fn is_duplicate(&self) -> bool {
        matches!(self, Self::Duplicate { .. })
    }
}

/// 파이프라인 생명주기 에러
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    /// 이미 실행 중
    #[error("pipeline already running")]
    AlreadyRunning,

    /// 실행 중이 아님
    #[error("pipeline not running")]
    NotRunning,

    /// 초기화 실패
    #[error("pipeline init failed: {0}")]
    InitFailed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_converts_to_top_level() {
        let err: ErrwatchError = ConfigError::InvalidValue {
            field: "feed.workers".to_owned(),
            reason: "must be 1-64".to_owned(),
        }
        .into();
        assert!(matches!(err, ErrwatchError::Config(_)));
        assert!(err.to_string().contains("feed.workers"));
    }

    #[test]
    fn duplicate_storage_error_is_detected() {
        let err = StorageError::Duplicate {
            id: "RHSA-2015:1234".to_owned(),
        };
        assert!(err.is_duplicate());
        assert!(err.to_string().contains("RHSA-2015:1234"));
        assert!(!StorageError::Query("locked".to_owned()).is_duplicate());
    }

    #[test]
    fn feed_error_display_keeps_reason() {
        let err = FeedError::Fetch("connection refused".to_owned());
        assert_eq!(err.to_string(), "fetch failed: connection refused");
    }
}
