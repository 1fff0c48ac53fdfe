//! 도메인 타입 — 시스템 전역에서 사용되는 공통 타입
//!
//! 피드 항목에서 파생된 [`Advisory`]와, 스토어에 기록된 [`AdvisoryRecord`]를 정의합니다.
//! `Advisory`는 관측 시각을 갖지 않습니다. 관측 시각은 스토어가 기록 시점에 부여합니다.

use std::fmt;
use std::sync::LazyLock;

use chrono::{DateTime, Utc};
use regex::Regex;
use serde::{Deserialize, Serialize};

static CVE_ID_PATTERN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^CVE-\d{4}-\d{4,}$").expect("CVE id pattern is a valid regex")
});

/// 권고 식별자 (`<PREFIX>-<year>:<number>`, 예: `RHSA-2015:1234`)
///
/// 식별자는 스토어의 유일 키입니다.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AdvisoryId(String);

impl AdvisoryId {
    /// 식별자를 생성합니다. 형식 검증은 피드 제목 파서가 담당합니다.
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    /// 문자열 표현
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// `-` 앞의 접두어 (예: `RHSA`)
    pub fn prefix(&self) -> &str {
        self.0.split('-').next().unwrap_or_default()
    }

    /// 접두어로 권고 유형을 판별합니다.
    pub fn class(&self) -> AdvisoryClass {
        AdvisoryClass::from_prefix(self.prefix())
    }

    /// 보안 유형 표식을 포함하는지 확인합니다.
    pub fn has_marker(&self, marker: &str) -> bool {
        !marker.is_empty() && self.0.contains(marker)
    }
}

impl fmt::Display for AdvisoryId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for AdvisoryId {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

/// 권고 유형
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum AdvisoryClass {
    /// 보안 권고 (RHSA)
    Security,
    /// 버그 수정 (RHBA)
    Bugfix,
    /// 기능 개선 (RHEA)
    Enhancement,
    /// 알 수 없는 접두어
    Other(String),
}

impl AdvisoryClass {
    /// 식별자 접두어에서 유형을 결정합니다.
    pub fn from_prefix(prefix: &str) -> Self {
        match prefix.to_ascii_uppercase().as_str() {
            "RHSA" => Self::Security,
            "RHBA" => Self::Bugfix,
            "RHEA" => Self::Enhancement,
            other => Self::Other(other.to_owned()),
        }
    }

    /// 메트릭 레이블 등에 쓰이는 짧은 이름
    pub fn label(&self) -> &str {
        match self {
            Self::Security => "security",
            Self::Bugfix => "bugfix",
            Self::Enhancement => "enhancement",
            Self::Other(_) => "other",
        }
    }
}

impl fmt::Display for AdvisoryClass {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Other(prefix) => write!(f, "other:{prefix}"),
            _ => f.write_str(self.label()),
        }
    }
}

/// CVE 식별자 (`CVE-\d{4}-\d{4,}`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CveId(String);

impl CveId {
    /// 형식이 맞으면 CVE 식별자를 반환합니다.
    pub fn parse(s: &str) -> Option<Self> {
        CVE_ID_PATTERN.is_match(s).then(|| Self(s.to_owned()))
    }

    /// 문자열 표현
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for CveId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// 피드 항목 하나에서 파생된 권고
///
/// `severity`는 보안 유형이면서 점수를 하나 이상 얻은 경우에만 존재합니다.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Advisory {
    /// 권고 식별자
    pub id: AdvisoryId,
    /// 요약
    pub synopsis: String,
    /// 원문 링크
    pub link: String,
    /// 설명에서 추출한 CVE 목록 (첫 등장 순서)
    pub cves: Vec<CveId>,
    /// 최대 CVSS 기본 점수
    pub severity: Option<f64>,
}

impl Advisory {
    /// 보강 전 권고를 생성합니다.
    pub fn new(id: AdvisoryId, synopsis: impl Into<String>, link: impl Into<String>) -> Self {
        Self {
            id,
            synopsis: synopsis.into(),
            link: link.into(),
            cves: Vec::new(),
            severity: None,
        }
    }

    /// 권고 유형
    pub fn class(&self) -> AdvisoryClass {
        self.id.class()
    }
}

impl fmt::Display for Advisory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.severity {
            Some(score) => write!(f, "{} [{score:.1}] {}", self.id, self.synopsis),
            None => write!(f, "{} {}", self.id, self.synopsis),
        }
    }
}

/// 스토어에 기록된 권고
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AdvisoryRecord {
    /// 기록된 권고
    #[serde(flatten)]
    pub advisory: Advisory,
    /// 스토어가 부여한 관측 시각 (UTC)
    pub observed_at: DateTime<Utc>,
}

impl AdvisoryRecord {
    /// 지금 시각으로 관측된 레코드를 만듭니다.
    pub fn observed_now(advisory: Advisory) -> Self {
        Self {
            advisory,
            observed_at: Utc::now(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn advisory_id_prefix_and_class() {
        let id = AdvisoryId::new("RHSA-2015:1234");
        assert_eq!(id.prefix(), "RHSA");
        assert_eq!(id.class(), AdvisoryClass::Security);
        assert_eq!(AdvisoryId::new("RHBA-2015:0001").class(), AdvisoryClass::Bugfix);
        assert_eq!(
            AdvisoryId::new("RHEA-2015:0002").class(),
            AdvisoryClass::Enhancement
        );
        assert_eq!(
            AdvisoryId::new("FEDORA-2015:0003").class(),
            AdvisoryClass::Other("FEDORA".to_owned())
        );
    }

    #[test]
    fn marker_matches_infix() {
        let id = AdvisoryId::new("RHSA-2015:1234");
        assert!(id.has_marker("RHSA"));
        assert!(!id.has_marker("RHBA"));
        assert!(!id.has_marker(""));
    }

    #[test]
    fn cve_id_parse_accepts_long_sequence_numbers() {
        assert!(CveId::parse("CVE-2015-0001").is_some());
        assert!(CveId::parse("CVE-2021-1234567").is_some());
    }

    #[test]
    fn cve_id_parse_rejects_malformed() {
        assert!(CveId::parse("CVE-15-0001").is_none());
        assert!(CveId::parse("CVE-2015-001").is_none());
        assert!(CveId::parse("see CVE-2015-0001").is_none());
    }

    #[test]
    fn advisory_display_includes_score_when_present() {
        let mut advisory = Advisory::new(
            AdvisoryId::new("RHSA-2015:1234"),
            "Important: kernel security update",
            "https://example.com/RHSA-2015-1234",
        );
        assert_eq!(
            advisory.to_string(),
            "RHSA-2015:1234 Important: kernel security update"
        );
        advisory.severity = Some(9.8);
        assert!(advisory.to_string().contains("[9.8]"));
    }

    #[test]
    fn record_serializes_flat() {
        let record = AdvisoryRecord::observed_now(Advisory::new(
            AdvisoryId::new("RHBA-2015:0001"),
            "bug fix",
            "https://example.com",
        ));
        let json = serde_json::to_value(&record).unwrap();
        assert_eq!(json["id"], "RHBA-2015:0001");
        assert!(json["observed_at"].is_string());
    }
}
