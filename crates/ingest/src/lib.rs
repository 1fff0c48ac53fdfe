//! errwatch-ingest — 권고 피드 수집 파이프라인
//!
//! # Module Structure
//!
//! - [`error`]: 도메인 에러 타입 (`IngestError`)
//! - [`http`]: HTTP 전송 trait (`HttpFetcher`, `ReqwestFetcher`)
//! - [`feed`]: 관대한 RSS 파서 (`parse_feed`, `FeedEntry`)
//! - [`advisory`]: 제목/CVE 추출과 권고 변환 (`AdvisoryExtractor`)
//! - [`severity`]: CVE 점수 병렬 수집 (`SeverityFetcher`)
//! - [`ingestor`]: 폴링 사이클 한 번 (`FeedIngestor`, `CycleReport`)
//! - [`scheduler`]: 순차 폴링 스케줄러 (`PollScheduler`)
//! - [`watcher`]: `Pipeline` 구현 (`ErrataWatcher`, `ErrataWatcherBuilder`)
//!
//! # Architecture
//!
//! ```text
//! PollScheduler --> FeedIngestor --> store.find (dedup)
//!                        |
//!                        +--> AdvisoryExtractor --> SeverityFetcher (fan-out / fan-in)
//!                        |
//!                        +--> notifier.notify --> store.insert
//! ```

pub mod advisory;
pub mod error;
pub mod feed;
pub mod http;
pub mod ingestor;
pub mod scheduler;
pub mod severity;
pub mod watcher;

// --- Public API Re-exports ---

pub use advisory::{AdvisoryExtractor, ParsedTitle, extract_cves, parse_title};
pub use error::IngestError;
pub use feed::{FeedDocument, FeedEntry, parse_feed};
pub use http::{HttpFetcher, ReqwestFetcher};
pub use ingestor::{CycleOutcome, CycleReport, FeedIngestor};
pub use scheduler::{PollScheduler, SchedulerState};
pub use severity::{SeverityFetcher, extract_base_score};
pub use watcher::{ErrataWatcher, ErrataWatcherBuilder};
