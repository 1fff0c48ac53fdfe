//! 권고 RSS 피드 파서
//!
//! `channel/item` 구조에서 각 항목의 `title`, `link`, `description` 텍스트를 추출합니다.
//!
//! 파싱은 관대하게 동작합니다.
//! - 닫는 태그 이름이 맞지 않아도 계속 진행합니다.
//! - 필드 안에 중첩된 태그의 텍스트도 필드 값에 포함됩니다.
//! - `channel`을 찾은 뒤 발생한 문법 에러는 그때까지 파싱한 항목을 유지하고
//!   [`FeedDocument::issues`]에 기록합니다.
//!
//! 문서 전체 실패는 최상위 구조(`channel`)를 찾을 수 없을 때만 반환합니다.

use quick_xml::events::Event;
use quick_xml::reader::Reader;

use crate::error::IngestError;

/// 피드 항목 하나 (`<item>`)
///
/// 한 사이클 동안만 존재하며 직접 저장되지 않습니다.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FeedEntry {
    /// `<title>` 텍스트
    pub title: String,
    /// `<link>` 텍스트
    pub link: String,
    /// `<description>` 텍스트
    pub description: String,
}

/// 파싱된 피드 문서
#[derive(Debug, Clone, Default)]
pub struct FeedDocument {
    /// 문서 순서대로의 항목
    pub entries: Vec<FeedEntry>,
    /// 복구된 형식 문제
    pub issues: Vec<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Field {
    Title,
    Link,
    Description,
}

impl Field {
    fn from_name(name: &[u8]) -> Option<Self> {
        match name {
            b"title" => Some(Self::Title),
            b"link" => Some(Self::Link),
            b"description" => Some(Self::Description),
            _ => None,
        }
    }
}

#[derive(Debug, Default)]
struct EntryBuilder {
    entry: FeedEntry,
}

impl EntryBuilder {
    fn append(&mut self, field: Field, text: &str) {
        let target = match field {
            Field::Title => &mut self.entry.title,
            Field::Link => &mut self.entry.link,
            Field::Description => &mut self.entry.description,
        };
        if text.is_empty() {
            return;
        }
        if !target.is_empty() {
            target.push(' ');
        }
        target.push_str(text);
    }
}

/// 피드 문서를 파싱합니다.
pub fn parse_feed(xml: &str) -> Result<FeedDocument, IngestError> {
    let mut reader = Reader::from_str(xml);
    let config = reader.config_mut();
    config.trim_text(true);
    config.check_end_names = false;

    let mut doc = FeedDocument::default();
    let mut saw_channel = false;

    // 열린 요소의 로컬 이름 스택
    let mut open: Vec<Vec<u8>> = Vec::new();
    // (항목 빌더, 항목 요소의 스택 깊이)
    let mut current: Option<(EntryBuilder, usize)> = None;
    // (필드, 필드 요소의 스택 깊이)
    let mut field: Option<(Field, usize)> = None;

    loop {
        match reader.read_event() {
            Ok(Event::Start(e)) => {
                let name = e.local_name().as_ref().to_vec();
                open.push(name);
                let depth = open.len();
                let name = &open[depth - 1];

                match name.as_slice() {
                    b"channel" => saw_channel = true,
                    // channel 바로 아래의 item만 항목으로 취급
                    b"item"
                        if current.is_none()
                            && depth >= 2
                            && open[depth - 2].as_slice() == b"channel" =>
                    {
                        current = Some((EntryBuilder::default(), depth));
                    }
                    other => {
                        if let Some((_, item_depth)) = current.as_ref()
                            && field.is_none()
                            && depth == *item_depth + 1
                            && let Some(f) = Field::from_name(other)
                        {
                            field = Some((f, depth));
                        }
                    }
                }
            }
            Ok(Event::End(e)) => {
                let name = e.local_name();
                // 짝이 맞지 않는 닫는 태그는 가장 가까운 같은 이름의 요소까지 닫음
                let Some(pos) = open.iter().rposition(|n| n.as_slice() == name.as_ref()) else {
                    doc.issues.push(format!(
                        "unmatched closing tag </{}> at byte {}",
                        String::from_utf8_lossy(name.as_ref()),
                        reader.buffer_position()
                    ));
                    continue;
                };
                open.truncate(pos);

                if matches!(field, Some((_, d)) if d > open.len()) {
                    field = None;
                }
                if matches!(current, Some((_, d)) if d > open.len())
                    && let Some((builder, _)) = current.take()
                {
                    doc.entries.push(builder.entry);
                }
            }
            Ok(Event::Text(e)) => {
                if let (Some((builder, _)), Some((f, _))) = (current.as_mut(), field) {
                    let text = match e.unescape() {
                        Ok(text) => text.into_owned(),
                        Err(_) => String::from_utf8_lossy(&e).into_owned(),
                    };
                    builder.append(f, &text);
                }
            }
            Ok(Event::CData(e)) => {
                if let (Some((builder, _)), Some((f, _))) = (current.as_mut(), field) {
                    let text = String::from_utf8_lossy(&e);
                    builder.append(f, text.trim());
                }
            }
            Ok(Event::Empty(e)) => {
                if e.local_name().as_ref() == b"channel" {
                    saw_channel = true;
                }
            }
            Ok(Event::Eof) => break,
            Ok(_) => {}
            Err(e) => {
                if !saw_channel {
                    return Err(IngestError::FeedMalformed(format!(
                        "xml error before <channel> at byte {}: {e}",
                        reader.error_position()
                    )));
                }
                doc.issues.push(format!(
                    "xml error at byte {}: {e}",
                    reader.error_position()
                ));
                break;
            }
        }
    }

    if !saw_channel {
        return Err(IngestError::FeedMalformed(
            "no <channel> element found".to_owned(),
        ));
    }

    if let Some((builder, _)) = current.take() {
        doc.issues.push(format!(
            "unterminated <item> dropped (title: '{}')",
            builder.entry.title
        ));
    }

    Ok(doc)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feed(items: &str) -> String {
        format!(
            r#"<?xml version="1.0" encoding="UTF-8"?>
<rss version="2.0"><channel><title>Errata</title><link>https://example.com</link>{items}</channel></rss>"#
        )
    }

    #[test]
    fn parses_items_in_document_order() {
        let xml = feed(
            r#"<item><title>RHSA-2015:1234-1: Important: kernel security update</title>
<link>https://example.com/RHSA-2015-1234</link>
<description>Fixes CVE-2015-0001.</description></item>
<item><title>RHBA-2015:0002-1: bash bug fix update</title>
<link>https://example.com/RHBA-2015-0002</link>
<description>Bug fixes.</description></item>"#,
        );
        let doc = parse_feed(&xml).unwrap();
        assert_eq!(doc.entries.len(), 2);
        assert_eq!(
            doc.entries[0].title,
            "RHSA-2015:1234-1: Important: kernel security update"
        );
        assert_eq!(doc.entries[1].link, "https://example.com/RHBA-2015-0002");
        assert!(doc.issues.is_empty());
    }

    #[test]
    fn channel_title_is_not_an_entry_field() {
        let doc = parse_feed(&feed("")).unwrap();
        assert!(doc.entries.is_empty());
    }

    #[test]
    fn unescapes_entities_in_description() {
        let xml = feed(
            "<item><title>RHSA-2015:1-1: x</title><link>l</link>\
             <description>&lt;p&gt;CVE-2015-0001 &amp; CVE-2015-0002&lt;/p&gt;</description></item>",
        );
        let doc = parse_feed(&xml).unwrap();
        assert_eq!(
            doc.entries[0].description,
            "<p>CVE-2015-0001 & CVE-2015-0002</p>"
        );
    }

    #[test]
    fn reads_cdata_sections() {
        let xml = feed(
            "<item><title><![CDATA[RHSA-2015:1-1: cdata title]]></title><link>l</link>\
             <description><![CDATA[<b>CVE-2015-0003</b>]]></description></item>",
        );
        let doc = parse_feed(&xml).unwrap();
        assert_eq!(doc.entries[0].title, "RHSA-2015:1-1: cdata title");
        assert_eq!(doc.entries[0].description, "<b>CVE-2015-0003</b>");
    }

    #[test]
    fn nested_markup_inside_description_is_flattened() {
        let xml = feed(
            "<item><title>RHSA-2015:1-1: x</title><link>l</link>\
             <description><p>first CVE-2015-0001</p><p>second</p></description></item>",
        );
        let doc = parse_feed(&xml).unwrap();
        assert_eq!(doc.entries[0].description, "first CVE-2015-0001 second");
    }

    #[test]
    fn mismatched_closing_tag_does_not_drop_siblings() {
        let xml = feed(
            "<item><title>RHSA-2015:1-1: broken</title><link>l</linx>\
             <description>d</description></item>\
             <item><title>RHBA-2015:2-1: fine</title><link>m</link><description>e</description></item>",
        );
        let doc = parse_feed(&xml).unwrap();
        assert_eq!(doc.entries.len(), 2);
        assert_eq!(doc.entries[1].title, "RHBA-2015:2-1: fine");
        assert!(!doc.issues.is_empty());
    }

    #[test]
    fn truncated_document_keeps_completed_entries() {
        let xml = r#"<rss><channel>
<item><title>RHSA-2015:1-1: complete</title><link>l</link><description>d</description></item>
<item><title>RHSA-2015:2-1: cut"#;
        let doc = parse_feed(xml).unwrap();
        assert_eq!(doc.entries.len(), 1);
        assert_eq!(doc.entries[0].title, "RHSA-2015:1-1: complete");
        assert!(!doc.issues.is_empty());
    }

    #[test]
    fn document_without_channel_is_error() {
        let err = parse_feed("<html><body>maintenance</body></html>").unwrap_err();
        assert!(matches!(err, IngestError::FeedMalformed(_)));
    }

    #[test]
    fn empty_document_is_error() {
        assert!(parse_feed("").is_err());
    }

    #[test]
    fn items_outside_channel_are_ignored() {
        let xml = r#"<rss><item><title>RHSA-2015:9-1: stray</title><link>l</link></item>
<channel><title>c</title>
<item><title>RHBA-2015:2-1: listed</title><link>m</link></item>
</channel></rss>"#;
        let doc = parse_feed(xml).unwrap();
        assert_eq!(doc.entries.len(), 1);
        assert_eq!(doc.entries[0].title, "RHBA-2015:2-1: listed");
    }

    #[test]
    fn item_nested_below_channel_child_is_ignored() {
        let xml = feed("<image><item><title>RHSA-2015:9-1: nested</title></item></image>");
        let doc = parse_feed(&xml).unwrap();
        assert!(doc.entries.is_empty());
    }

    #[test]
    fn self_closing_channel_is_empty_feed() {
        let doc = parse_feed("<rss><channel/></rss>").unwrap();
        assert!(doc.entries.is_empty());
        assert!(doc.issues.is_empty());
    }

    #[test]
    fn item_without_title_yields_empty_title() {
        let xml = feed("<item><link>l</link><description>d</description></item>");
        let doc = parse_feed(&xml).unwrap();
        assert_eq!(doc.entries.len(), 1);
        assert!(doc.entries[0].title.is_empty());
    }
}
