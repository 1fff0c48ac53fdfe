//! 피드 수집기 — 한 번의 폴링 사이클
//!
//! ```text
//! fetch feed --> parse_feed --> (항목마다, 문서 순서)
//!     parse_title --> store.find --> AdvisoryExtractor --> notify --> store.insert
//! ```
//!
//! 피드 조회/파싱 실패는 해당 사이클만 중단합니다. 항목 단위 실패(제목 형식, 스토어
//! 조회, 기록)는 로그를 남기고 다음 항목으로 진행합니다. 어떤 실패도 사이클 경계를
//! 넘어 전파되지 않으며 결과는 [`CycleReport`]로 요약됩니다.

use std::sync::Arc;
use std::time::{Duration, Instant};

use metrics::{counter, histogram};
use serde::Serialize;
use tracing::{Instrument, debug, error, info, info_span, warn};

use errwatch_core::config::FeedConfig;
use errwatch_core::metrics as m;
use errwatch_core::pipeline::{AdvisoryStore, Notifier};
use errwatch_core::types::{Advisory, AdvisoryId};

use crate::advisory::{AdvisoryExtractor, parse_title};
use crate::feed::parse_feed;
use crate::http::HttpFetcher;
use crate::severity::SeverityFetcher;

/// 사이클 종료 상태
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", content = "reason", rename_all = "snake_case")]
pub enum CycleOutcome {
    /// 피드를 끝까지 처리함
    Completed,
    /// 피드 조회 실패
    FeedUnavailable(String),
    /// 피드 문서 구조를 찾을 수 없음
    FeedUnparsable(String),
}

impl CycleOutcome {
    /// 피드 단계에서 사이클이 중단되었는지 확인합니다.
    pub fn is_feed_failure(&self) -> bool {
        !matches!(self, Self::Completed)
    }

    /// 메트릭 레이블
    pub fn label(&self) -> &'static str {
        match self {
            Self::Completed => "ok",
            Self::FeedUnavailable(_) => "feed_unavailable",
            Self::FeedUnparsable(_) => "feed_unparsable",
        }
    }
}

/// 한 사이클의 결과 요약
#[derive(Debug, Clone, Serialize)]
pub struct CycleReport {
    /// 사이클 식별자 (로그 span의 `cycle_id`와 동일)
    pub cycle_id: String,
    /// 종료 상태
    pub outcome: CycleOutcome,
    /// 피드 항목 수
    pub entries: usize,
    /// 제목 형식이 맞아 처리를 시도한 식별자 (문서 순서)
    pub attempted: Vec<AdvisoryId>,
    /// 제목 형식이 맞지 않아 건너뛴 항목 수
    pub malformed: usize,
    /// 이미 기록되어 건너뛴 항목 수
    pub known: usize,
    /// 스토어 조회 실패로 건너뛴 항목 수
    pub lookup_failures: usize,
    /// 알림을 보낸 신규 권고 (알림 순서)
    pub new_advisories: Vec<Advisory>,
    /// 기록에 성공한 수
    pub persisted: usize,
    /// 동시 기록으로 인한 중복 키 충돌 수
    pub duplicates: usize,
    /// 그 밖의 기록 실패 수
    pub persist_failures: usize,
    /// 경과 시간 (밀리초)
    pub elapsed_ms: u64,
}

impl CycleReport {
    fn new(cycle_id: String) -> Self {
        Self {
            cycle_id,
            outcome: CycleOutcome::Completed,
            entries: 0,
            attempted: Vec::new(),
            malformed: 0,
            known: 0,
            lookup_failures: 0,
            new_advisories: Vec::new(),
            persisted: 0,
            duplicates: 0,
            persist_failures: 0,
            elapsed_ms: 0,
        }
    }
}

/// 피드 수집기
pub struct FeedIngestor<H, S, N> {
    feed_url: String,
    http: Arc<H>,
    extractor: AdvisoryExtractor<H>,
    store: Arc<S>,
    notifier: Arc<N>,
}

impl<H, S, N> FeedIngestor<H, S, N>
where
    H: HttpFetcher,
    S: AdvisoryStore,
    N: Notifier,
{
    /// 구성 요소로부터 수집기를 생성합니다.
    pub fn new(
        feed_url: impl Into<String>,
        http: Arc<H>,
        extractor: AdvisoryExtractor<H>,
        store: Arc<S>,
        notifier: Arc<N>,
    ) -> Self {
        Self {
            feed_url: feed_url.into(),
            http,
            extractor,
            store,
            notifier,
        }
    }

    /// 피드 설정으로 수집기를 생성합니다.
    pub fn from_config(feed: &FeedConfig, http: Arc<H>, store: Arc<S>, notifier: Arc<N>) -> Self {
        let severity = SeverityFetcher::new(Arc::clone(&http), &feed.cve_base_url, feed.workers);
        let extractor = AdvisoryExtractor::new(severity, &feed.security_marker);
        Self::new(&feed.url, http, extractor, store, notifier)
    }

    /// 피드 URL
    pub fn feed_url(&self) -> &str {
        &self.feed_url
    }

    /// 폴링 사이클 하나를 실행합니다.
    ///
    /// 사이클은 `cycle_id`를 가진 `ingest_cycle` span 안에서 실행됩니다.
    pub async fn ingest(&self) -> CycleReport {
        let cycle_id = uuid::Uuid::new_v4().to_string();
        let span = info_span!("ingest_cycle", cycle_id = %cycle_id);
        self.run_cycle(cycle_id).instrument(span).await
    }

    async fn run_cycle(&self, cycle_id: String) -> CycleReport {
        let started = Instant::now();
        let mut report = CycleReport::new(cycle_id);

        let body = match self.http.fetch_text(&self.feed_url).await {
            Ok(body) => body,
            Err(e) => {
                error!(url = %self.feed_url, error = %e, "feed fetch failed, cycle aborted");
                report.outcome = CycleOutcome::FeedUnavailable(e.to_string());
                return finish(report, started.elapsed());
            }
        };

        let doc = match parse_feed(&body) {
            Ok(doc) => doc,
            Err(e) => {
                error!(url = %self.feed_url, error = %e, "feed document unparsable, cycle aborted");
                report.outcome = CycleOutcome::FeedUnparsable(e.to_string());
                return finish(report, started.elapsed());
            }
        };

        for issue in &doc.issues {
            warn!(url = %self.feed_url, issue = %issue, "recovered from malformed feed markup");
        }

        report.entries = doc.entries.len();
        counter!(m::FEED_ENTRIES_TOTAL).increment(doc.entries.len() as u64);

        for entry in &doc.entries {
            let Some(parsed) = parse_title(&entry.title) else {
                error!(title = %entry.title, "feed entry title is not an advisory title, skipping");
                counter!(m::MALFORMED_ENTRIES_TOTAL).increment(1);
                report.malformed += 1;
                continue;
            };
            let id = parsed.id;
            report.attempted.push(id.clone());

            match self.store.find(&id).await {
                Ok(Some(_)) => {
                    debug!(advisory = %id, "already recorded, skipping");
                    report.known += 1;
                    continue;
                }
                Ok(None) => {}
                Err(e) => {
                    error!(advisory = %id, error = %e, "store lookup failed, skipping entry");
                    report.lookup_failures += 1;
                    continue;
                }
            }

            let advisory = self.extractor.extract(&id, entry).await;
            counter!(m::ADVISORIES_NEW_TOTAL, m::LABEL_CLASS => advisory.class().label().to_owned())
                .increment(1);
            info!(
                advisory = %advisory.id,
                severity = ?advisory.severity,
                cves = advisory.cves.len(),
                "new advisory"
            );

            self.notifier.notify(&advisory).await;

            match self.store.insert(&advisory).await {
                Ok(()) => report.persisted += 1,
                Err(e) if e.is_duplicate() => {
                    warn!(advisory = %advisory.id, "advisory already recorded by another writer");
                    report.duplicates += 1;
                }
                Err(e) => {
                    error!(advisory = %advisory.id, error = %e, "failed to persist advisory");
                    counter!(m::STORE_INSERT_FAILURES_TOTAL).increment(1);
                    report.persist_failures += 1;
                }
            }

            report.new_advisories.push(advisory);
        }

        finish(report, started.elapsed())
    }
}

fn finish(mut report: CycleReport, elapsed: Duration) -> CycleReport {
    report.elapsed_ms = u64::try_from(elapsed.as_millis()).unwrap_or(u64::MAX);

    histogram!(m::CYCLE_DURATION_SECONDS).record(elapsed.as_secs_f64());
    counter!(m::CYCLES_TOTAL, m::LABEL_RESULT => report.outcome.label()).increment(1);

    info!(
        outcome = report.outcome.label(),
        entries = report.entries,
        malformed = report.malformed,
        known = report.known,
        new = report.new_advisories.len(),
        persisted = report.persisted,
        elapsed_ms = report.elapsed_ms,
        "ingest cycle finished"
    );
    report
}
