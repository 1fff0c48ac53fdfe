//! 메모리 스토어 — 테스트와 드라이런용

use std::sync::atomic::{AtomicBool, Ordering};

use tokio::sync::RwLock;

use errwatch_core::error::StorageError;
use errwatch_core::pipeline::AdvisoryStore;
use errwatch_core::types::{Advisory, AdvisoryId, AdvisoryRecord};

/// 메모리 기반 권고 스토어
///
/// 레코드는 삽입 순서대로 보관됩니다.
#[derive(Debug, Default)]
pub struct MemoryStore {
    records: RwLock<Vec<AdvisoryRecord>>,
    fail_lookups: AtomicBool,
}

impl MemoryStore {
    /// 빈 스토어를 생성합니다.
    pub fn new() -> Self {
        Self::default()
    }

    /// 기록된 레코드 수
    pub async fn len(&self) -> usize {
        self.records.read().await.len()
    }

    /// 비어 있는지 확인합니다.
    pub async fn is_empty(&self) -> bool {
        self.records.read().await.is_empty()
    }

    /// 이후 `find` 호출이 연결 실패를 반환하도록 설정합니다.
    pub fn set_fail_lookups(&self, fail: bool) {
        self.fail_lookups.store(fail, Ordering::Relaxed);
    }
}

impl AdvisoryStore for MemoryStore {
    async fn find(&self, id: &AdvisoryId) -> Result<Option<AdvisoryRecord>, StorageError> {
        if self.fail_lookups.load(Ordering::Relaxed) {
            return Err(StorageError::Connection("memory store lookups disabled".to_owned()));
        }
        Ok(self
            .records
            .read()
            .await
            .iter()
            .find(|r| &r.advisory.id == id)
            .cloned())
    }

    async fn insert(&self, advisory: &Advisory) -> Result<(), StorageError> {
        let mut records = self.records.write().await;
        if records.iter().any(|r| r.advisory.id == advisory.id) {
            return Err(StorageError::Duplicate {
                id: advisory.id.to_string(),
            });
        }
        records.push(AdvisoryRecord::observed_now(advisory.clone()));
        Ok(())
    }

    async fn list_all(&self) -> Result<Vec<AdvisoryRecord>, StorageError> {
        let mut records: Vec<AdvisoryRecord> =
            self.records.read().await.iter().rev().cloned().collect();
        // 같은 시각이면 나중에 삽입된 것이 먼저 (stable sort)
        records.sort_by(|a, b| b.observed_at.cmp(&a.observed_at));
        Ok(records)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn advisory(id: &str) -> Advisory {
        Advisory::new(AdvisoryId::new(id), "synopsis", "https://example.com")
    }

    #[tokio::test]
    async fn insert_and_find() {
        let store = MemoryStore::new();
        assert!(store.is_empty().await);
        store.insert(&advisory("RHSA-2015:0001")).await.unwrap();
        assert_eq!(store.len().await, 1);
        assert!(
            store
                .find(&AdvisoryId::new("RHSA-2015:0001"))
                .await
                .unwrap()
                .is_some()
        );
    }

    #[tokio::test]
    async fn duplicate_insert_is_rejected() {
        let store = MemoryStore::new();
        store.insert(&advisory("RHSA-2015:0001")).await.unwrap();
        let err = store.insert(&advisory("RHSA-2015:0001")).await.unwrap_err();
        assert!(err.is_duplicate());
        assert_eq!(store.len().await, 1);
    }

    #[tokio::test]
    async fn list_all_is_most_recent_first() {
        let store = MemoryStore::new();
        store.insert(&advisory("RHSA-2015:0001")).await.unwrap();
        store.insert(&advisory("RHBA-2015:0002")).await.unwrap();
        let ids: Vec<String> = store
            .list_all()
            .await
            .unwrap()
            .iter()
            .map(|r| r.advisory.id.to_string())
            .collect();
        assert_eq!(ids, ["RHBA-2015:0002", "RHSA-2015:0001"]);
    }

    #[tokio::test]
    async fn failing_lookups_surface_connection_error() {
        let store = MemoryStore::new();
        store.set_fail_lookups(true);
        let err = store
            .find(&AdvisoryId::new("RHSA-2015:0001"))
            .await
            .unwrap_err();
        assert!(matches!(err, StorageError::Connection(_)));
    }
}
