//! 권고 추출 — 피드 항목 하나를 [`Advisory`]로 변환
//!
//! - 제목 `^(.*?)-1:\s(.*)$`에서 식별자(그룹 1)와 요약(그룹 2)을 얻습니다.
//! - 식별자에 보안 표식(기본 `RHSA`)이 있으면 설명에서 CVE를 추출하고
//!   [`SeverityFetcher`]로 최대 점수를 붙입니다.
//! - 그 밖의 유형은 보강하지 않습니다.

use std::collections::HashSet;
use std::sync::LazyLock;

use regex::Regex;
use tracing::{debug, error, warn};

use errwatch_core::types::{Advisory, AdvisoryId, CveId};

use crate::feed::FeedEntry;
use crate::http::HttpFetcher;
use crate::severity::SeverityFetcher;

static TITLE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(.*?)-1:\s(.*)$").expect("title pattern is a valid regex"));

static CVE_PATTERN: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"CVE-\d{4}-\d{4,}").expect("cve pattern is a valid regex"));

/// 제목에서 분리한 식별자와 요약
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParsedTitle {
    /// 권고 식별자
    pub id: AdvisoryId,
    /// 요약
    pub synopsis: String,
}

/// 피드 항목 제목을 파싱합니다.
///
/// 패턴이 맞지 않거나 식별자 부분이 비어 있으면 `None`.
pub fn parse_title(title: &str) -> Option<ParsedTitle> {
    let caps = TITLE_PATTERN.captures(title)?;
    let id = caps.get(1)?.as_str();
    if id.is_empty() {
        return None;
    }
    Some(ParsedTitle {
        id: AdvisoryId::new(id),
        synopsis: caps.get(2).map(|m| m.as_str()).unwrap_or_default().to_owned(),
    })
}

/// 본문에서 CVE 식별자를 첫 등장 순서대로, 중복 없이 추출합니다.
pub fn extract_cves(text: &str) -> Vec<CveId> {
    let mut seen = HashSet::new();
    CVE_PATTERN
        .find_iter(text)
        .filter(|m| seen.insert(m.as_str()))
        .filter_map(|m| CveId::parse(m.as_str()))
        .collect()
}

/// 피드 항목을 권고로 변환하는 추출기
pub struct AdvisoryExtractor<H> {
    severity: SeverityFetcher<H>,
    security_marker: String,
}

impl<H: HttpFetcher> AdvisoryExtractor<H> {
    /// 새 추출기를 생성합니다.
    pub fn new(severity: SeverityFetcher<H>, security_marker: impl Into<String>) -> Self {
        Self {
            severity,
            security_marker: security_marker.into(),
        }
    }

    /// 보안 표식
    pub fn security_marker(&self) -> &str {
        &self.security_marker
    }

    /// 항목 하나에서 권고를 만듭니다.
    ///
    /// 보안 권고인데 CVE가 없거나 점수를 하나도 얻지 못하면 점수 없이 반환합니다.
    pub async fn extract(&self, id: &AdvisoryId, entry: &FeedEntry) -> Advisory {
        let synopsis = parse_title(&entry.title)
            .map(|parsed| parsed.synopsis)
            .unwrap_or_default();
        let mut advisory = Advisory::new(id.clone(), synopsis, entry.link.clone());

        if !id.has_marker(&self.security_marker) {
            debug!(advisory = %id, "not a security advisory, skipping enrichment");
            return advisory;
        }

        let cves = extract_cves(&entry.description);
        if cves.is_empty() {
            error!(advisory = %id, "security advisory description lists no CVE identifiers");
            return advisory;
        }

        debug!(advisory = %id, cves = cves.len(), "fetching base scores");
        advisory.severity = self.severity.fetch_max_severity(&cves).await;
        if advisory.severity.is_none() {
            warn!(advisory = %id, cves = cves.len(), "no base score could be resolved");
        }
        advisory.cves = cves;
        advisory
    }
}
