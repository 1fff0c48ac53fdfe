//! 메트릭 상수 및 설명 등록
//!
//! 모든 Prometheus 메트릭의 이름과 설명을 중앙에서 정의합니다.
//! 각 모듈은 이 상수를 사용하여 `metrics::counter!()`, `metrics::gauge!()`,
//! `metrics::histogram!()` 매크로를 호출합니다.
//!
//! # 네이밍 컨벤션
//!
//! - 접두어: `errwatch_`
//! - 접미어: `_total` (counter), `_seconds` (histogram/latency), 없음 (gauge)
//!
//! # 사용 예시
//!
//! ```ignore
//! use metrics::counter;
//!
//! counter!(errwatch_core::metrics::FEED_ENTRIES_TOTAL).increment(1);
//! ```

// ─── 레이블 키 상수 ────────────────────────────────────────────────

/// 결과 레이블 키 (success, failure 등)
pub const LABEL_RESULT: &str = "result";

/// 권고 유형 레이블 키 (security, bugfix, enhancement, other)
pub const LABEL_CLASS: &str = "class";

// ─── 수집 사이클 메트릭 ─────────────────────────────────────────────

/// 완료된 수집 사이클 수 (counter, label: result = ok | feed_unavailable | feed_unparsable)
pub const CYCLES_TOTAL: &str = "errwatch_cycles_total";

/// 수집 사이클 소요 시간 (histogram, 초)
pub const CYCLE_DURATION_SECONDS: &str = "errwatch_cycle_duration_seconds";

/// 파싱된 피드 항목 수 (counter)
pub const FEED_ENTRIES_TOTAL: &str = "errwatch_feed_entries_total";

/// 제목 형식이 맞지 않아 건너뛴 항목 수 (counter)
pub const MALFORMED_ENTRIES_TOTAL: &str = "errwatch_malformed_entries_total";

/// 신규 권고 수 (counter, label: class)
pub const ADVISORIES_NEW_TOTAL: &str = "errwatch_advisories_new_total";

/// CVE 페이지 조회 수 (counter, label: result = scored | unscored | failed)
pub const CVE_LOOKUPS_TOTAL: &str = "errwatch_cve_lookups_total";

/// 스토어 기록 실패 수 (counter)
pub const STORE_INSERT_FAILURES_TOTAL: &str = "errwatch_store_insert_failures_total";

// ─── Daemon 메트릭 ──────────────────────────────────────────────────

/// Daemon: 가동 시간 (gauge, 초)
pub const DAEMON_UPTIME_SECONDS: &str = "errwatch_daemon_uptime_seconds";

// ─── 히스토그램 버킷 정의 ────────────────────────────────────────────

/// 사이클 소요 시간 히스토그램 버킷 (초)
///
/// 100ms ~ 300s 범위 (피드 1회 + CVE 페이지 다수 조회)
pub const CYCLE_DURATION_BUCKETS: [f64; 9] = [0.1, 0.5, 1.0, 5.0, 10.0, 30.0, 60.0, 120.0, 300.0];

// ─── 설명 등록 함수 ─────────────────────────────────────────────────

/// 모든 메트릭의 설명(description)을 등록합니다.
///
/// 전역 레코더 설치 후 한 번만 호출해야 합니다.
/// 일반적으로 `errwatch-daemon`의 시작 시점에서 호출합니다.
pub fn describe_all() {
    use metrics::{describe_counter, describe_gauge, describe_histogram};

    describe_counter!(
        CYCLES_TOTAL,
        "Total number of ingest cycles by outcome"
    );
    describe_histogram!(
        CYCLE_DURATION_SECONDS,
        "Time to complete a single ingest cycle in seconds"
    );
    describe_counter!(
        FEED_ENTRIES_TOTAL,
        "Total number of feed entries parsed"
    );
    describe_counter!(
        MALFORMED_ENTRIES_TOTAL,
        "Total number of feed entries skipped because of a malformed title"
    );
    describe_counter!(
        ADVISORIES_NEW_TOTAL,
        "Total number of previously unseen advisories by class"
    );
    describe_counter!(
        CVE_LOOKUPS_TOTAL,
        "Total number of CVE detail page lookups by result"
    );
    describe_counter!(
        STORE_INSERT_FAILURES_TOTAL,
        "Total number of advisories that could not be persisted"
    );

    describe_gauge!(DAEMON_UPTIME_SECONDS, "errwatch daemon uptime in seconds");
}
