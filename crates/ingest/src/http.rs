//! HTTP 전송 계층
//!
//! 피드와 CVE 상세 페이지 조회는 모두 [`HttpFetcher`]를 거칩니다.
//! 운영 환경은 [`ReqwestFetcher`]를, 테스트는 메모리 구현을 주입합니다.

use std::future::Future;
use std::time::Duration;

use tracing::debug;

use crate::error::IngestError;

/// URL 하나를 조회하여 본문을 문자열로 돌려주는 전송 trait
///
/// 2xx가 아닌 응답은 전송 실패로 취급해야 합니다.
pub trait HttpFetcher: Send + Sync + 'static {
    /// GET 요청을 보내고 응답 본문을 반환합니다.
    fn fetch_text(&self, url: &str) -> impl Future<Output = Result<String, IngestError>> + Send;
}

/// reqwest 기반 [`HttpFetcher`]
///
/// 요청별 타임아웃이 적용되어 멈춘 업스트림이 폴링 루프를 무기한 막지 않습니다.
#[derive(Debug, Clone)]
pub struct ReqwestFetcher {
    client: reqwest::Client,
}

impl ReqwestFetcher {
    /// 타임아웃과 User-Agent를 지정해 클라이언트를 생성합니다.
    pub fn new(timeout: Duration, user_agent: &str) -> Result<Self, IngestError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(user_agent)
            .build()
            .map_err(|e| IngestError::Config {
                field: "feed.user_agent".to_owned(),
                reason: e.to_string(),
            })?;
        Ok(Self { client })
    }
}

impl HttpFetcher for ReqwestFetcher {
    async fn fetch_text(&self, url: &str) -> Result<String, IngestError> {
        debug!(url, "http get");

        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| IngestError::Http {
                url: url.to_owned(),
                reason: e.to_string(),
            })?;

        let status = response.status();
        if !status.is_success() {
            return Err(IngestError::HttpStatus {
                url: url.to_owned(),
                status: status.as_u16(),
            });
        }

        response.text().await.map_err(|e| IngestError::Http {
            url: url.to_owned(),
            reason: e.to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_client_with_timeout() {
        let fetcher = ReqwestFetcher::new(Duration::from_secs(5), "errwatch-test/0.1");
        assert!(fetcher.is_ok());
    }

    #[tokio::test]
    async fn unreachable_host_is_transport_error() {
        let fetcher = ReqwestFetcher::new(Duration::from_millis(500), "errwatch-test/0.1")
            .expect("client");
        // 포트 9는 discard 서비스로, 로컬에서 열려 있지 않음
        let err = fetcher
            .fetch_text("http://127.0.0.1:9/feed.rss")
            .await
            .unwrap_err();
        assert!(err.is_transport());
    }
}
