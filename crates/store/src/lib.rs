//! errwatch-store — 권고 기록 스토어 구현
//!
//! core의 [`AdvisoryStore`](errwatch_core::pipeline::AdvisoryStore) trait을 구현합니다.
//!
//! - [`SqliteStore`]: `advisories` 테이블 하나를 사용하는 영속 스토어
//! - [`MemoryStore`]: 테스트와 드라이런용 메모리 스토어
//!
//! 두 구현 모두 같은 식별자의 두 번째 삽입을 `StorageError::Duplicate`로 거부하고,
//! `list_all`은 관측 시각 내림차순으로 반환합니다.

pub mod memory;
pub mod sqlite;

pub use memory::MemoryStore;
pub use sqlite::SqliteStore;
