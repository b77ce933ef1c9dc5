//! Research aggregation over independent knowledge sources.
//!
//! Sources are queried in order (most specific first) with a fixed delay
//! between requests. A failing source contributes nothing; it never fails
//! the whole lookup. Combined results are cached per topic in the `web`
//! namespace.

mod arxiv;
mod duckduckgo;
mod facts;
mod wikipedia;

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use tracing::{debug, info, instrument, warn};

pub use arxiv::{parse_feed, ArxivSource};
pub use duckduckgo::{parse_instant_answer, DuckDuckGoSource};
pub use facts::extract_key_facts;
pub use wikipedia::{parse_summary, WikipediaSource};

use crate::cache::{CacheNamespace, CacheStore};
use crate::capabilities::{CapabilityError, ResearchCapability};
use crate::model::ResearchRecord;

pub const DEFAULT_USER_AGENT: &str = "deckgen/0.1 (presentation research)";

/// One knowledge source.
#[async_trait]
pub trait ResearchSource: Send + Sync {
    fn name(&self) -> &'static str;

    async fn search(&self, query: &str) -> Result<Vec<ResearchRecord>, CapabilityError>;
}

/// Builds the HTTP client shared by the research sources.
pub fn http_client(user_agent: &str, timeout: Duration) -> Result<Client, CapabilityError> {
    Client::builder()
        .user_agent(user_agent)
        .timeout(timeout)
        .build()
        .map_err(|e| CapabilityError::Http {
            service: "research",
            source: e,
        })
}

/// Builds the named sources in the given order. Unknown names are skipped.
pub fn sources_by_name(names: &[String], client: &Client) -> Vec<Arc<dyn ResearchSource>> {
    names
        .iter()
        .filter_map(|name| -> Option<Arc<dyn ResearchSource>> {
            match name.as_str() {
                "wikipedia" => Some(Arc::new(WikipediaSource::new(client.clone()))),
                "arxiv" => Some(Arc::new(ArxivSource::new(client.clone()))),
                "duckduckgo" => Some(Arc::new(DuckDuckGoSource::new(client.clone()))),
                other => {
                    warn!(source = other, "Unknown research source ignored");
                    None
                }
            }
        })
        .collect()
}

/// Cached, rate-limited research over several sources.
pub struct ResearchAggregator {
    sources: Vec<Arc<dyn ResearchSource>>,
    cache: CacheStore,
    rate_limit: Duration,
    cache_ttl: chrono::Duration,
}

impl ResearchAggregator {
    pub fn new(
        sources: Vec<Arc<dyn ResearchSource>>,
        cache: CacheStore,
        rate_limit: Duration,
        cache_ttl: chrono::Duration,
    ) -> Self {
        Self {
            sources,
            cache,
            rate_limit,
            cache_ttl,
        }
    }

    async fn query_sources(&self, topic: &str) -> Vec<ResearchRecord> {
        let mut records = Vec::new();
        let mut seen = HashSet::new();
        for (i, source) in self.sources.iter().enumerate() {
            if i > 0 && !self.rate_limit.is_zero() {
                tokio::time::sleep(self.rate_limit).await;
            }
            match source.search(topic).await {
                Ok(found) => {
                    debug!(source = source.name(), found = found.len(), "Source answered");
                    for record in found {
                        let key = if record.url.is_empty() {
                            record.title.clone()
                        } else {
                            record.url.clone()
                        };
                        if seen.insert(key) {
                            records.push(record);
                        }
                    }
                }
                Err(e) => warn!(source = source.name(), error = %e, "Research source failed"),
            }
        }
        records
    }
}

#[async_trait]
impl ResearchCapability for ResearchAggregator {
    #[instrument(skip(self))]
    async fn research(&self, topic: &str, max_results: usize) -> Vec<ResearchRecord> {
        match self
            .cache
            .get::<Vec<ResearchRecord>>(CacheNamespace::Web, topic)
        {
            Ok(Some(mut cached)) => {
                cached.truncate(max_results);
                return cached;
            }
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Research cache read failed"),
        }

        let mut records = self.query_sources(topic).await;
        if !records.is_empty() {
            if let Err(e) = self
                .cache
                .put(CacheNamespace::Web, topic, &records, self.cache_ttl)
            {
                warn!(error = %e, "Research cache write failed");
            }
        }
        info!(found = records.len(), "Research finished");
        records.truncate(max_results);
        records
    }
}
