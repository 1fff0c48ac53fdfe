//! 심각도 보강 — CVE 상세 페이지에서 CVSS 기본 점수를 수집
//!
//! [`SeverityFetcher::fetch_max_severity`]는 CVE 목록을 작업 큐에 모두 넣은 뒤
//! 고정 크기 워커 풀이 큐를 소비하도록 합니다.
//!
//! ```text
//! cves --> mpsc(capacity = n) --> worker 0..min(workers, n) --> Mutex<Vec<f64>>
//!                                                                   |
//!                               join + completed == dispatched --> max
//! ```
//!
//! 각 CVE는 정확히 한 워커에게 전달됩니다. 조회 실패나 점수 요소 누락은 로그로 남고
//! 결과에 기여하지 않을 뿐 다른 조회를 중단하지 않습니다. 모든 조회가 실패하면
//! 결과는 `None`이며 0.0으로 대체하지 않습니다.
//!
//! 점수 위치(`Base Score:` 레이블이 붙은 표 행)에 대한 의존은 [`extract_base_score`]
//! 하나에 격리되어 있습니다.

use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use metrics::counter;
use scraper::{Html, Selector};
use tokio::sync::{Mutex, mpsc};
use tokio::task::JoinSet;
use tracing::{debug, warn};

use errwatch_core::metrics as m;
use errwatch_core::types::CveId;

use crate::error::IngestError;
use crate::http::HttpFetcher;

/// 점수 행을 식별하는 레이블
const BASE_SCORE_LABEL: &str = "Base Score:";

/// CVE 점수 수집기
pub struct SeverityFetcher<H> {
    http: Arc<H>,
    base_url: String,
    workers: usize,
}

impl<H> Clone for SeverityFetcher<H> {
    fn clone(&self) -> Self {
        Self {
            http: Arc::clone(&self.http),
            base_url: self.base_url.clone(),
            workers: self.workers,
        }
    }
}

impl<H: HttpFetcher> SeverityFetcher<H> {
    /// 새 수집기를 생성합니다. `workers`가 0이면 1로 보정합니다.
    pub fn new(http: Arc<H>, base_url: impl Into<String>, workers: usize) -> Self {
        Self {
            http,
            base_url: base_url.into(),
            workers: workers.max(1),
        }
    }

    /// CVE 목록의 최대 기본 점수를 반환합니다.
    ///
    /// 모든 CVE가 처리(성공 또는 실패)된 뒤에만 반환합니다.
    /// 점수를 하나도 얻지 못하면 `None`입니다.
    pub async fn fetch_max_severity(&self, cves: &[CveId]) -> Option<f64> {
        let dispatched = cves.len();
        if dispatched == 0 {
            return None;
        }

        // 소비자가 시작되기 전에 모든 항목을 큐에 넣음
        let (tx, rx) = mpsc::channel::<CveId>(dispatched);
        for cve in cves {
            if let Err(e) = tx.try_send(cve.clone()) {
                warn!(cve = %cve, error = %e, "failed to enqueue cve lookup");
            }
        }
        drop(tx);

        let queue = Arc::new(Mutex::new(rx));
        let scores = Arc::new(Mutex::new(Vec::with_capacity(dispatched)));
        let completed = Arc::new(AtomicUsize::new(0));

        let mut pool = JoinSet::new();
        for worker in 0..self.workers.min(dispatched) {
            let queue = Arc::clone(&queue);
            let scores = Arc::clone(&scores);
            let completed = Arc::clone(&completed);
            let http = Arc::clone(&self.http);
            let base_url = self.base_url.clone();

            pool.spawn(async move {
                loop {
                    let next = queue.lock().await.recv().await;
                    let Some(cve) = next else {
                        break;
                    };

                    match lookup(http.as_ref(), &base_url, &cve).await {
                        Ok(score) => {
                            debug!(worker, cve = %cve, score, "base score extracted");
                            counter!(m::CVE_LOOKUPS_TOTAL, m::LABEL_RESULT => "scored")
                                .increment(1);
                            scores.lock().await.push(score);
                        }
                        Err(e) if e.is_transport() => {
                            warn!(worker, cve = %cve, error = %e, "cve page fetch failed");
                            counter!(m::CVE_LOOKUPS_TOTAL, m::LABEL_RESULT => "failed")
                                .increment(1);
                        }
                        Err(e) => {
                            warn!(
                                worker,
                                cve = %cve,
                                error = %e,
                                "no usable base score on cve page"
                            );
                            counter!(m::CVE_LOOKUPS_TOTAL, m::LABEL_RESULT => "unscored")
                                .increment(1);
                        }
                    }
                    completed.fetch_add(1, Ordering::AcqRel);
                }
            });
        }

        while let Some(joined) = pool.join_next().await {
            if let Err(e) = joined {
                warn!(error = %e, "severity worker terminated abnormally");
            }
        }

        let done = completed.load(Ordering::Acquire);
        if done != dispatched {
            warn!(dispatched, completed = done, "not every cve lookup completed");
        }

        let scores = scores.lock().await;
        scores.iter().copied().fold(None, |max: Option<f64>, s| {
            Some(max.map_or(s, |cur| cur.max(s)))
        })
    }
}

async fn lookup<H: HttpFetcher>(
    http: &H,
    base_url: &str,
    cve: &CveId,
) -> Result<f64, IngestError> {
    let url = format!("{base_url}{cve}");
    let body = http.fetch_text(&url).await?;
    let raw = extract_base_score(&body)?.ok_or_else(|| IngestError::ScoreMissing {
        cve: cve.to_string(),
    })?;
    parse_score(cve, &raw)
}

/// CVE 상세 페이지에서 `Base Score:` 행의 값 텍스트를 찾습니다.
///
/// 레이블 셀 바로 다음 셀의 텍스트를 반환합니다. 해당 행이 없으면 `None`.
pub fn extract_base_score(html: &str) -> Result<Option<String>, IngestError> {
    let row_selector =
        Selector::parse("table tr").map_err(|e| IngestError::Selector(e.to_string()))?;
    let cell_selector =
        Selector::parse("th, td").map_err(|e| IngestError::Selector(e.to_string()))?;

    let document = Html::parse_document(html);
    for row in document.select(&row_selector) {
        let cells: Vec<String> = row
            .select(&cell_selector)
            .map(|cell| cell.text().collect::<String>().trim().to_owned())
            .collect();

        if let Some(pos) = cells.iter().position(|c| c == BASE_SCORE_LABEL)
            && let Some(value) = cells.get(pos + 1)
        {
            return Ok(Some(value.clone()));
        }
    }
    Ok(None)
}

/// 점수 텍스트를 숫자로 변환합니다 (`"7.5"`, `"7.5/10"`, `"7.5 (AV:N/...)"`).
fn parse_score(cve: &CveId, raw: &str) -> Result<f64, IngestError> {
    let invalid = || IngestError::ScoreInvalid {
        cve: cve.to_string(),
        raw: raw.to_owned(),
    };
    let token = raw
        .split_whitespace()
        .next()
        .and_then(|t| t.split('/').next())
        .ok_or_else(invalid)?;
    let score: f64 = token.parse().map_err(|_| invalid())?;
    if !score.is_finite() || score < 0.0 {
        return Err(invalid());
    }
    Ok(score)
}
