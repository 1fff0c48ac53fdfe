//! errwatch-core — 공통 타입, trait, 에러, 설정
//!
//! 모든 errwatch 크레이트가 공유하는 기반 레이어입니다.
//!
//! - [`config`]: `errwatch.toml` 로딩, 환경변수 오버라이드, 검증
//! - [`error`]: 도메인별 에러 타입
//! - [`metrics`]: Prometheus 메트릭 이름 상수
//! - [`pipeline`]: 생명주기 및 협력자 trait (`Pipeline`, `AdvisoryStore`, `Notifier`)
//! - [`types`]: 권고 도메인 타입

pub mod config;
pub mod error;
pub mod metrics;
pub mod pipeline;
pub mod types;

// --- 주요 타입 re-export ---

// 에러
pub use error::{ConfigError, ErrwatchError, FeedError, PipelineError, StorageError};

// 설정
pub use config::ErrwatchConfig;

// 파이프라인 trait
pub use pipeline::{AdvisoryStore, HealthStatus, Notifier, Pipeline};

// 도메인 타입
pub use types::{Advisory, AdvisoryClass, AdvisoryId, AdvisoryRecord, CveId};
