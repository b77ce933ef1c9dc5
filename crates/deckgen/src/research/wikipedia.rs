use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::Deserialize;

use super::ResearchSource;
use crate::capabilities::CapabilityError;
use crate::model::{ContentType, ResearchRecord};

const SUMMARY_URL: &str = "https://en.wikipedia.org/api/rest_v1/page/summary/";
const RELEVANCE: f64 = 0.9;

#[derive(Debug, Deserialize)]
struct PageSummary {
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    extract: String,
    #[serde(default)]
    content_urls: Option<ContentUrls>,
}

#[derive(Debug, Deserialize)]
struct ContentUrls {
    desktop: Option<PageUrl>,
}

#[derive(Debug, Deserialize)]
struct PageUrl {
    page: Option<String>,
}

/// Page title as used in the REST path.
pub fn page_slug(query: &str) -> String {
    query.trim().replace(' ', "_")
}

/// Parses a page summary. A summary without an extract yields nothing.
pub fn parse_summary(body: &str, query: &str) -> Result<Vec<ResearchRecord>, CapabilityError> {
    let summary: PageSummary = serde_json::from_str(body).map_err(|e| CapabilityError::Malformed {
        service: "wikipedia",
        message: e.to_string(),
    })?;
    if summary.extract.trim().is_empty() {
        return Ok(Vec::new());
    }
    let url = summary
        .content_urls
        .and_then(|u| u.desktop)
        .and_then(|d| d.page)
        .unwrap_or_default();
    Ok(vec![ResearchRecord::new(
        summary.title.unwrap_or_else(|| query.to_string()),
        summary.extract,
        url,
        "Wikipedia",
        ContentType::Encyclopedia,
        RELEVANCE,
    )])
}

/// Encyclopedia summary of the page matching the query.
pub struct WikipediaSource {
    client: Client,
}

impl WikipediaSource {
    pub fn new(client: Client) -> Self {
        Self { client }
    }
}

#[async_trait]
impl ResearchSource for WikipediaSource {
    fn name(&self) -> &'static str {
        "wikipedia"
    }

    async fn search(&self, query: &str) -> Result<Vec<ResearchRecord>, CapabilityError> {
        let url = format!("{}{}", SUMMARY_URL, page_slug(query));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| CapabilityError::Http {
                service: "wikipedia",
                source: e,
            })?;
        if response.status() == StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !response.status().is_success() {
            return Err(CapabilityError::Status {
                service: "wikipedia",
                status: response.status().as_u16(),
                message: "summary lookup failed".to_string(),
            });
        }
        let body = response.text().await.map_err(|e| CapabilityError::Http {
            service: "wikipedia",
            source: e,
        })?;
        parse_summary(&body, query)
    }
}
