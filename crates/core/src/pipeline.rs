//! 파이프라인 trait — 모듈 생명주기와 외부 협력자 정의
//!
//! - [`Pipeline`]: start/stop/health_check 생명주기
//! - [`AdvisoryStore`]: 중복 판별 및 기록용 스토어 (조회, 삽입, 전체 목록)
//! - [`Notifier`]: 신규 권고 알림 (fire-and-forget)
//!
//! 모든 trait은 RPITIT(`impl Future + Send`)를 사용하므로 제네릭으로 주입합니다.

use std::future::Future;

use serde::{Deserialize, Serialize};

use crate::error::{ErrwatchError, StorageError};
use crate::types::{Advisory, AdvisoryId, AdvisoryRecord};

/// 모듈 건강 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum HealthStatus {
    /// 정상
    Healthy,
    /// 동작하지만 일부 기능 저하
    Degraded(String),
    /// 비정상
    Unhealthy(String),
}

impl HealthStatus {
    /// 정상 상태인지 확인합니다.
    pub fn is_healthy(&self) -> bool {
        matches!(self, Self::Healthy)
    }

    /// 비정상 상태인지 확인합니다.
    pub fn is_unhealthy(&self) -> bool {
        matches!(self, Self::Unhealthy(_))
    }
}

/// 생명주기를 갖는 모듈 trait
pub trait Pipeline: Send {
    /// 모듈을 시작합니다. 이미 실행 중이면 `PipelineError::AlreadyRunning`.
    fn start(&mut self) -> impl Future<Output = Result<(), ErrwatchError>> + Send;

    /// 모듈을 정지합니다. 실행 중이 아니면 `PipelineError::NotRunning`.
    fn stop(&mut self) -> impl Future<Output = Result<(), ErrwatchError>> + Send;

    /// 건강 상태를 확인합니다.
    fn health_check(&self) -> impl Future<Output = HealthStatus> + Send;
}

/// 권고 기록 스토어
///
/// 식별자 유일성은 스토어가 보장합니다. 이미 존재하는 식별자를 삽입하면
/// [`StorageError::Duplicate`]를 반환해야 합니다.
pub trait AdvisoryStore: Send + Sync + 'static {
    /// 식별자로 기록을 조회합니다.
    fn find(
        &self,
        id: &AdvisoryId,
    ) -> impl Future<Output = Result<Option<AdvisoryRecord>, StorageError>> + Send;

    /// 권고를 기록합니다. 관측 시각은 이 시점에 부여됩니다.
    fn insert(&self, advisory: &Advisory) -> impl Future<Output = Result<(), StorageError>> + Send;

    /// 모든 기록을 최신순으로 반환합니다.
    fn list_all(&self) -> impl Future<Output = Result<Vec<AdvisoryRecord>, StorageError>> + Send;
}

/// 신규 권고 알림 싱크
///
/// 실패는 싱크가 직접 로그로 남기며 호출자에게 전달하지 않습니다.
pub trait Notifier: Send + Sync + 'static {
    /// 권고 하나를 알립니다.
    fn notify(&self, advisory: &Advisory) -> impl Future<Output = ()> + Send;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn health_status_predicates() {
        assert!(HealthStatus::Healthy.is_healthy());
        assert!(!HealthStatus::Degraded("feed unreachable".to_owned()).is_healthy());
        assert!(!HealthStatus::Degraded("feed unreachable".to_owned()).is_unhealthy());
        assert!(HealthStatus::Unhealthy("stopped".to_owned()).is_unhealthy());
    }
}
