use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;

use super::ResearchSource;
use crate::capabilities::CapabilityError;
use crate::model::{ContentType, ResearchRecord};

const INSTANT_ANSWER_URL: &str = "https://api.duckduckgo.com/";
const MAX_RESULTS: usize = 5;
const ABSTRACT_RELEVANCE: f64 = 0.7;
const TOPIC_RELEVANCE: f64 = 0.6;

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "PascalCase", default)]
struct InstantAnswer {
    heading: String,
    abstract_text: String,
    #[serde(rename = "AbstractURL")]
    abstract_url: String,
    abstract_source: String,
    related_topics: Vec<RelatedTopic>,
}

/// Either a topic or a named group of topics.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum RelatedTopic {
    Topic {
        #[serde(rename = "Text")]
        text: String,
        #[serde(rename = "FirstURL", default)]
        first_url: String,
    },
    Group {
        #[serde(rename = "Topics")]
        topics: Vec<RelatedTopic>,
    },
}

fn flatten_topics(topics: Vec<RelatedTopic>, out: &mut Vec<(String, String)>) {
    for topic in topics {
        match topic {
            RelatedTopic::Topic { text, first_url } => out.push((text, first_url)),
            RelatedTopic::Group { topics } => flatten_topics(topics, out),
        }
    }
}

/// Parses an instant-answer response: the abstract first, then related topics.
pub fn parse_instant_answer(body: &str, query: &str) -> Result<Vec<ResearchRecord>, CapabilityError> {
    let answer: InstantAnswer = serde_json::from_str(body).map_err(|e| CapabilityError::Malformed {
        service: "duckduckgo",
        message: e.to_string(),
    })?;

    let mut records = Vec::new();
    if !answer.abstract_text.trim().is_empty() {
        let title = if answer.heading.is_empty() {
            query.to_string()
        } else {
            answer.heading.clone()
        };
        let source = if answer.abstract_source.is_empty() {
            "DuckDuckGo".to_string()
        } else {
            answer.abstract_source.clone()
        };
        records.push(ResearchRecord::new(
            title,
            answer.abstract_text,
            answer.abstract_url,
            source,
            ContentType::Web,
            ABSTRACT_RELEVANCE,
        ));
    }

    let mut topics = Vec::new();
    flatten_topics(answer.related_topics, &mut topics);
    for (text, url) in topics {
        if records.len() >= MAX_RESULTS {
            break;
        }
        if text.trim().is_empty() {
            continue;
        }
        let title = text
            .split(" - ")
            .next()
            .unwrap_or(&text)
            .trim()
            .to_string();
        records.push(ResearchRecord::new(
            title,
            text,
            url,
            "DuckDuckGo",
            ContentType::Web,
            TOPIC_RELEVANCE,
        ));
    }

    records.truncate(MAX_RESULTS);
    Ok(records)
}

/// General web results from the DuckDuckGo instant answer API.
pub struct DuckDuckGoSource {
    client: Client,
}

impl DuckDuckGoSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResearchSource for DuckDuckGoSource {
    fn name(&self) -> &'static str {
        "duckduckgo"
    }

    async fn search(&self, query: &str) -> Result<Vec<ResearchRecord>, CapabilityError> {
        let response = self
            .client
            .get(INSTANT_ANSWER_URL)
            .query(&[
                ("q", query),
                ("format", "json"),
                ("no_html", "1"),
                ("skip_disambig", "1"),
            ])
            .send()
            .await
            .map_err(|e| CapabilityError::Http {
                service: "duckduckgo",
                source: e,
            })?;
        if !response.status().is_success() {
            return Err(CapabilityError::Status {
                service: "duckduckgo",
                status: response.status().as_u16(),
                message: "instant answer lookup failed".to_string(),
            });
        }
        let body = response.text().await.map_err(|e| CapabilityError::Http {
            service: "duckduckgo",
            source: e,
        })?;
        parse_instant_answer(&body, query)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_abstract_and_nested_topics() {
        let body = r#"{
            "Heading": "Solar power",
            "AbstractText": "Solar power is the conversion of sunlight.",
            "AbstractURL": "https://en.wikipedia.org/wiki/Solar_power",
            "AbstractSource": "Wikipedia",
            "RelatedTopics": [
                {"Text": "Photovoltaics - Conversion of light", "FirstURL": "https://duckduckgo.com/Photovoltaics"},
                {"Name": "See also", "Topics": [
                    {"Text": "Solar thermal energy", "FirstURL": "https://duckduckgo.com/Solar_thermal"}
                ]}
            ]
        }"#;
        let records = parse_instant_answer(body, "solar").unwrap();
        assert_eq!(records.len(), 3);
        assert_eq!(records[0].source, "Wikipedia");
        assert_eq!(records[0].relevance_score, ABSTRACT_RELEVANCE);
        assert_eq!(records[1].title, "Photovoltaics");
        assert_eq!(records[2].title, "Solar thermal energy");
        assert!(records.iter().all(|r| r.content_type == ContentType::Web));
    }

    #[test]
    fn test_parse_caps_results() {
        let topics: Vec<String> = (0..10)
            .map(|i| format!(r#"{{"Text": "Topic {}", "FirstURL": "https://d/{}"}}"#, i, i))
            .collect();
        let body = format!(r#"{{"RelatedTopics": [{}]}}"#, topics.join(","));
        let records = parse_instant_answer(&body, "q").unwrap();
        assert_eq!(records.len(), MAX_RESULTS);
    }

    #[test]
    fn test_parse_empty_answer() {
        assert!(parse_instant_answer("{}", "q").unwrap().is_empty());
    }
}
