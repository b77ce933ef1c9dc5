use async_trait::async_trait;
use quick_xml::escape::resolve_predefined_entity;
use quick_xml::events::{BytesRef, Event};
use quick_xml::Reader;
use reqwest::Client;

use super::ResearchSource;
use crate::capabilities::CapabilityError;
use crate::model::{ContentType, ResearchRecord};

const QUERY_URL: &str = "http://export.arxiv.org/api/query";
const MAX_PAPERS: usize = 2;
const SUMMARY_CHARS: usize = 500;
const RELEVANCE: f64 = 0.8;

#[derive(Default)]
struct Entry {
    id: String,
    title: String,
    summary: String,
}

#[derive(Clone, Copy, PartialEq)]
enum Field {
    None,
    Id,
    Title,
    Summary,
}

fn collapse_whitespace(text: &str) -> String {
    text.split_whitespace().collect::<Vec<_>>().join(" ")
}

fn truncate_summary(summary: &str) -> String {
    if summary.chars().count() > SUMMARY_CHARS {
        let cut: String = summary.chars().take(SUMMARY_CHARS).collect();
        format!("{}...", cut)
    } else {
        summary.to_string()
    }
}

impl Entry {
    fn push(&mut self, field: Field, text: &str) {
        match field {
            Field::Id => self.id.push_str(text),
            Field::Title => self.title.push_str(text),
            Field::Summary => self.summary.push_str(text),
            Field::None => {}
        }
    }
}

fn malformed(e: impl std::fmt::Display) -> CapabilityError {
    CapabilityError::Malformed {
        service: "arxiv",
        message: format!("XML parsing error: {}", e),
    }
}

/// Resolves `&name;` and `&#NN;` references to their text. Names outside
/// the predefined XML set are kept verbatim.
fn resolve_reference(reference: &BytesRef<'_>) -> Result<String, CapabilityError> {
    if let Some(ch) = reference.resolve_char_ref().map_err(malformed)? {
        return Ok(ch.to_string());
    }
    let name = reference.decode().map_err(malformed)?;
    Ok(match resolve_predefined_entity(&name) {
        Some(text) => text.to_string(),
        None => format!("&{};", name),
    })
}

/// Parses an arXiv Atom feed into at most `max` paper records.
///
/// The feed-level title is ignored; only `<entry>` elements count. Text is
/// kept untrimmed until the entry ends so entity references keep their
/// surrounding spaces.
pub fn parse_feed(xml: &str, max: usize) -> Result<Vec<ResearchRecord>, CapabilityError> {
    let mut reader = Reader::from_str(xml);

    let mut records = Vec::new();
    let mut current: Option<Entry> = None;
    let mut field = Field::None;

    loop {
        match reader.read_event().map_err(malformed)? {
            Event::Start(ref e) => match e.local_name().as_ref() {
                b"entry" => current = Some(Entry::default()),
                b"id" if current.is_some() => field = Field::Id,
                b"title" if current.is_some() => field = Field::Title,
                b"summary" if current.is_some() => field = Field::Summary,
                _ => {}
            },
            Event::End(ref e) => match e.local_name().as_ref() {
                b"entry" => {
                    if let Some(entry) = current.take() {
                        let summary = collapse_whitespace(&entry.summary);
                        records.push(ResearchRecord::new(
                            collapse_whitespace(&entry.title),
                            truncate_summary(&summary),
                            entry.id.trim(),
                            "arXiv",
                            ContentType::AcademicPaper,
                            RELEVANCE,
                        ));
                        if records.len() >= max {
                            break;
                        }
                    }
                }
                b"id" | b"title" | b"summary" => field = Field::None,
                _ => {}
            },
            Event::Text(e) => {
                if let Some(entry) = current.as_mut() {
                    entry.push(field, &e.decode().map_err(malformed)?);
                }
            }
            Event::CData(e) => {
                if let Some(entry) = current.as_mut() {
                    entry.push(field, &e.decode().map_err(malformed)?);
                }
            }
            Event::GeneralRef(e) => {
                if let Some(entry) = current.as_mut() {
                    if field != Field::None {
                        entry.push(field, &resolve_reference(&e)?);
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }
    }

    Ok(records)
}

/// Academic papers from the arXiv query API, most relevant first.
pub struct ArxivSource {
    client: Client,
}

impl ArxivSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResearchSource for ArxivSource {
    fn name(&self) -> &'static str {
        "arxiv"
    }

    async fn search(&self, query: &str) -> Result<Vec<ResearchRecord>, CapabilityError> {
        let search_query = format!("all:{}", query);
        let max = MAX_PAPERS.to_string();
        let response = self
            .client
            .get(QUERY_URL)
            .query(&[
                ("search_query", search_query.as_str()),
                ("start", "0"),
                ("max_results", max.as_str()),
                ("sortBy", "relevance"),
                ("sortOrder", "descending"),
            ])
            .send()
            .await
            .map_err(|e| CapabilityError::Http {
                service: "arxiv",
                source: e,
            })?;
        if !response.status().is_success() {
            return Err(CapabilityError::Status {
                service: "arxiv",
                status: response.status().as_u16(),
                message: "query failed".to_string(),
            });
        }
        let body = response.text().await.map_err(|e| CapabilityError::Http {
            service: "arxiv",
            source: e,
        })?;
        parse_feed(&body, MAX_PAPERS)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const FEED: &str = r#"<?xml version="1.0" encoding="UTF-8"?>
<feed xmlns="http://www.w3.org/2005/Atom">
  <title type="html">ArXiv Query: search_query=all:solar</title>
  <id>http://arxiv.org/api/abc</id>
  <entry>
    <id>http://arxiv.org/abs/2101.00001v1</id>
    <title>Perovskite
      Solar Cells</title>
    <summary>  Efficiency gains in
      perovskite cells.  </summary>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2101.00002v1</id>
    <title>Second</title>
    <summary>Second summary.</summary>
  </entry>
  <entry>
    <id>http://arxiv.org/abs/2101.00003v1</id>
    <title>Third</title>
    <summary>Third summary.</summary>
  </entry>
</feed>"#;

    #[test]
    fn test_parse_feed_skips_feed_title_and_limits() {
        let records = parse_feed(FEED, 2).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].title, "Perovskite Solar Cells");
        assert_eq!(records[0].content, "Efficiency gains in perovskite cells.");
        assert_eq!(records[0].url, "http://arxiv.org/abs/2101.00001v1");
        assert_eq!(records[0].content_type, ContentType::AcademicPaper);
        assert_eq!(records[1].title, "Second");
    }

    #[test]
    fn test_long_summary_is_truncated() {
        let long = "word ".repeat(200);
        let xml = format!(
            "<feed><entry><id>x</id><title>T</title><summary>{}</summary></entry></feed>",
            long
        );
        let records = parse_feed(&xml, 2).unwrap();
        assert!(records[0].content.ends_with("..."));
        assert_eq!(records[0].content.chars().count(), SUMMARY_CHARS + 3);
    }

    #[test]
    fn test_empty_feed() {
        assert!(parse_feed("<feed><title>none</title></feed>", 2)
            .unwrap()
            .is_empty());
    }

    #[test]
    fn test_entities_are_resolved_with_their_spacing() {
        let xml = "<feed><entry><id>x</id>\
                   <title>Fish &amp; Chips &lt;3</title>\
                   <summary>A &quot;study&quot; of &#233;t&#xE9;</summary>\
                   </entry></feed>";
        let records = parse_feed(xml, 2).unwrap();
        assert_eq!(records[0].title, "Fish & Chips <3");
        assert_eq!(records[0].content, "A \"study\" of \u{e9}t\u{e9}");
    }

    #[test]
    fn test_unknown_entity_is_kept_verbatim() {
        let xml = "<feed><entry><id>x</id><title>R&amp;D &nbsp; notes</title></entry></feed>";
        let records = parse_feed(xml, 2).unwrap();
        assert_eq!(records[0].title, "R&D &nbsp; notes");
    }
}
