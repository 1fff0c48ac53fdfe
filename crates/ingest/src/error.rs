//! 수집 모듈 에러 타입
//!
//! [`IngestError`]는 피드 수집과 심각도 보강 중 발생하는 에러를 나타냅니다.
//! `From<IngestError> for ErrwatchError` 구현으로 `?` 연산자를 통해
//! 상위 에러 타입으로 전파됩니다.
//!
//! # 에러 카테고리
//!
//! - **전송**: `Http`, `HttpStatus`
//! - **형식**: `FeedMalformed`, `ScoreMissing`, `ScoreInvalid`, `Selector`
//! - **설정**: `Config`

use errwatch_core::error::{ConfigError, ErrwatchError, FeedError};

/// 수집 모듈 도메인 에러
#[derive(Debug, thiserror::Error)]
pub enum IngestError {
    /// HTTP 요청 실패 (연결, 타임아웃, 본문 읽기)
    #[error("http request to {url} failed: {reason}")]
    Http {
        /// 요청 URL
        url: String,
        /// 실패 사유
        reason: String,
    },

    /// 2xx가 아닌 응답
    #[error("http {status} from {url}")]
    HttpStatus {
        /// 요청 URL
        url: String,
        /// 응답 상태 코드
        status: u16,
    },

    /// 피드 문서 구조를 찾을 수 없음
    #[error("feed document malformed: {0}")]
    FeedMalformed(String),

    /// CVE 페이지에 점수 요소가 없음
    #[error("base score not found for {cve}")]
    ScoreMissing {
        /// CVE 식별자
        cve: String,
    },

    /// 점수 값이 숫자가 아니거나 음수
    #[error("invalid base score for {cve}: '{raw}'")]
    ScoreInvalid {
        /// CVE 식별자
        cve: String,
        /// 원본 텍스트
        raw: String,
    },

    /// CSS 선택자 파싱 실패
    #[error("invalid selector: {0}")]
    Selector(String),

    /// 설정 에러
    #[error("config error: {field}: {reason}")]
    Config {
        /// 설정 필드명
        field: String,
        /// 에러 사유
        reason: String,
    },
}

impl IngestError {
    /// 전송 계층 실패인지 확인합니다.
    pub fn is_transport(&self) -> bool {
        matches!(self, Self::Http { .. } | Self::HttpStatus { .. })
    }
}

impl From<IngestError> for ErrwatchError {
    fn from(err: IngestError) -> Self {
        match err {
            IngestError::Http { .. } | IngestError::HttpStatus { .. } => {
                ErrwatchError::Feed(FeedError::Fetch(err.to_string()))
            }
            IngestError::FeedMalformed(msg) => ErrwatchError::Feed(FeedError::Parse(msg)),
            IngestError::ScoreMissing { .. }
            | IngestError::ScoreInvalid { .. }
            | IngestError::Selector(_) => {
                ErrwatchError::Feed(FeedError::Enrichment(err.to_string()))
            }
            IngestError::Config { field, reason } => {
                ErrwatchError::Config(ConfigError::InvalidValue { field, reason })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn http_status_display() {
        let err = IngestError::HttpStatus {
            url: "https://example.com/feed".to_owned(),
            status: 503,
        };
        let msg = err.to_string();
        assert!(msg.contains("503"));
        assert!(msg.contains("example.com/feed"));
        assert!(err.is_transport());
    }

    #[test]
    fn score_invalid_display() {
        let err = IngestError::ScoreInvalid {
            cve: "CVE-2015-0001".to_owned(),
            raw: "n/a".to_owned(),
        };
        assert!(err.to_string().contains("CVE-2015-0001"));
        assert!(!err.is_transport());
    }

    #[test]
    fn transport_errors_convert_to_fetch() {
        let err: ErrwatchError = IngestError::Http {
            url: "https://example.com".to_owned(),
            reason: "timed out".to_owned(),
        }
        .into();
        assert!(matches!(err, ErrwatchError::Feed(FeedError::Fetch(_))));
    }

    #[test]
    fn malformed_feed_converts_to_parse() {
        let err: ErrwatchError = IngestError::FeedMalformed("no channel".to_owned()).into();
        assert!(matches!(err, ErrwatchError::Feed(FeedError::Parse(_))));
    }

    #[test]
    fn config_converts_to_invalid_value() {
        let err: ErrwatchError = IngestError::Config {
            field: "workers".to_owned(),
            reason: "must be greater than 0".to_owned(),
        }
        .into();
        assert!(matches!(
            err,
            ErrwatchError::Config(ConfigError::InvalidValue { .. })
        ));
    }
}
