//! Image search terms, the Wikimedia Commons source and the cached resolver.

use std::collections::HashSet;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use tracing::{debug, warn};

use crate::cache::{CacheNamespace, CacheStore};
use crate::capabilities::{CapabilityError, ImageCapability};
use crate::model::{ImageDescriptor, SlideContent, SlideType};

const COMMONS_API: &str = "https://commons.wikimedia.org/w/api.php";

/// Images returned for one slide.
const MAX_IMAGES_PER_SLIDE: usize = 3;
/// Terms actually searched per slide.
const TERMS_SEARCHED: usize = 2;
const IMAGES_PER_TERM: usize = 2;

/// Derives up to three image search terms from slide content.
pub fn search_terms(content: &SlideContent, slide_type: SlideType) -> Vec<String> {
    let mut terms = Vec::new();
    if !content.title.trim().is_empty() {
        terms.push(content.title.trim().to_string());
    }
    for point in content.bullet_points.iter().take(2) {
        let words: Vec<&str> = point.split_whitespace().collect();
        if words.len() >= 2 {
            terms.push(words.iter().take(3).copied().collect::<Vec<_>>().join(" "));
        }
    }
    match slide_type {
        SlideType::Title => terms.push("professional presentation".to_string()),
        SlideType::Conclusion => terms.push("success achievement".to_string()),
        _ => {}
    }
    terms.truncate(3);
    terms
}

/// A searchable image source.
#[async_trait]
pub trait ImageSearch: Send + Sync {
    async fn search(&self, term: &str, count: usize)
        -> Result<Vec<ImageDescriptor>, CapabilityError>;
}

#[derive(Debug, Deserialize)]
struct CommonsResponse {
    #[serde(default)]
    query: Option<CommonsQuery>,
}

#[derive(Debug, Deserialize)]
struct CommonsQuery {
    #[serde(default)]
    pages: std::collections::BTreeMap<String, CommonsPage>,
}

#[derive(Debug, Deserialize)]
struct CommonsPage {
    #[serde(default)]
    index: u32,
    #[serde(default)]
    title: String,
    #[serde(default)]
    imageinfo: Vec<CommonsImageInfo>,
}

#[derive(Debug, Deserialize)]
struct CommonsImageInfo {
    url: String,
    #[serde(default)]
    width: u32,
    #[serde(default)]
    height: u32,
}

/// Parses a Commons `generator=search` response in search-rank order.
pub fn parse_commons_response(body: &str) -> Result<Vec<ImageDescriptor>, CapabilityError> {
    let parsed: CommonsResponse =
        serde_json::from_str(body).map_err(|e| CapabilityError::Malformed {
            service: "wikimedia-commons",
            message: e.to_string(),
        })?;
    let mut pages: Vec<CommonsPage> = parsed
        .query
        .map(|q| q.pages.into_values().collect())
        .unwrap_or_default();
    pages.sort_by_key(|p| p.index);

    Ok(pages
        .into_iter()
        .filter_map(|page| {
            let info = page.imageinfo.into_iter().next()?;
            Some(ImageDescriptor {
                url: info.url,
                local_path: None,
                width: info.width,
                height: info.height,
                title: page
                    .title
                    .strip_prefix("File:")
                    .unwrap_or(&page.title)
                    .to_string(),
                source: "Wikimedia Commons".to_string(),
            })
        })
        .collect())
}

/// File search on Wikimedia Commons.
pub struct WikimediaImageSearch {
    client: Client,
}

impl WikimediaImageSearch {
    pub fn new(user_agent: &str, timeout: Duration) -> Result<Self, CapabilityError> {
        let client = Client::builder()
            .user_agent(user_agent)
            .timeout(timeout)
            .build()
            .map_err(|e| CapabilityError::Http {
                service: "wikimedia-commons",
                source: e,
            })?;
        Ok(Self { client })
    }
}

#[async_trait]
impl ImageSearch for WikimediaImageSearch {
    async fn search(
        &self,
        term: &str,
        count: usize,
    ) -> Result<Vec<ImageDescriptor>, CapabilityError> {
        let limit = count.to_string();
        let response = self
            .client
            .get(COMMONS_API)
            .query(&[
                ("action", "query"),
                ("format", "json"),
                ("generator", "search"),
                ("gsrsearch", term),
                ("gsrnamespace", "6"),
                ("gsrlimit", limit.as_str()),
                ("prop", "imageinfo"),
                ("iiprop", "url|size"),
            ])
            .send()
            .await
            .map_err(|e| CapabilityError::Http {
                service: "wikimedia-commons",
                source: e,
            })?;
        if !response.status().is_success() {
            return Err(CapabilityError::Status {
                service: "wikimedia-commons",
                status: response.status().as_u16(),
                message: "image search failed".to_string(),
            });
        }
        let body = response.text().await.map_err(|e| CapabilityError::Http {
            service: "wikimedia-commons",
            source: e,
        })?;
        let mut images = parse_commons_response(&body)?;
        images.truncate(count);
        Ok(images)
    }
}

/// Resolves slide images through a search source, caching per term.
pub struct ImageResolver {
    search: Arc<dyn ImageSearch>,
    cache: CacheStore,
    cache_ttl: chrono::Duration,
}

impl ImageResolver {
    pub fn new(search: Arc<dyn ImageSearch>, cache: CacheStore, cache_ttl: chrono::Duration) -> Self {
        Self {
            search,
            cache,
            cache_ttl,
        }
    }

    async fn images_for_term(&self, term: &str) -> Vec<ImageDescriptor> {
        match self
            .cache
            .get::<Vec<ImageDescriptor>>(CacheNamespace::Images, term)
        {
            Ok(Some(hit)) => return hit,
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Image cache read failed"),
        }

        match self.search.search(term, IMAGES_PER_TERM).await {
            Ok(images) => {
                if !images.is_empty() {
                    if let Err(e) =
                        self.cache
                            .put(CacheNamespace::Images, term, &images, self.cache_ttl)
                    {
                        warn!(error = %e, "Image cache write failed");
                    }
                }
                images
            }
            Err(e) => {
                warn!(term, error = %e, "Image search failed");
                Vec::new()
            }
        }
    }
}

#[async_trait]
impl ImageCapability for ImageResolver {
    async fn images_for_slide(
        &self,
        content: &SlideContent,
        slide_type: SlideType,
    ) -> Vec<ImageDescriptor> {
        let mut seen = HashSet::new();
        let mut images = Vec::new();
        for term in search_terms(content, slide_type).iter().take(TERMS_SEARCHED) {
            for image in self.images_for_term(term).await {
                if images.len() < MAX_IMAGES_PER_SLIDE && seen.insert(image.url.clone()) {
                    images.push(image);
                }
            }
        }
        debug!(found = images.len(), "Resolved slide images");
        images
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::capabilities::mock::MockImageSearch;
    use crate::db::Database;

    fn content(title: &str, bullets: &[&str]) -> SlideContent {
        SlideContent {
            title: title.to_string(),
            bullet_points: bullets.iter().map(|b| b.to_string()).collect(),
            speaker_notes: String::new(),
            visual_suggestions: Vec::new(),
            citations: Vec::new(),
            additional_notes: None,
        }
    }

    #[test]
    fn test_search_terms_for_content_slide() {
        let c = content(
            "Solar power",
            &["Panels convert sunlight efficiently", "Cheap", "Storage matters a lot"],
        );
        assert_eq!(
            search_terms(&c, SlideType::Content),
            vec!["Solar power", "Panels convert sunlight"]
        );
    }

    #[test]
    fn test_search_terms_add_type_hint_and_cap_at_three() {
        let c = content("Welcome", &["Grid scale storage", "Home batteries today"]);
        let terms = search_terms(&c, SlideType::Title);
        assert_eq!(terms.len(), 3);
        assert_eq!(terms[2], "Home batteries today");

        let c = content("Wrap up", &[]);
        assert_eq!(
            search_terms(&c, SlideType::Conclusion),
            vec!["Wrap up", "success achievement"]
        );
    }

    #[test]
    fn test_parse_commons_response_orders_by_index() {
        let body = r#"{"query": {"pages": {
            "11": {"index": 2, "title": "File:B.jpg",
                   "imageinfo": [{"url": "https://u/b.jpg", "width": 800, "height": 600}]},
            "7": {"index": 1, "title": "File:A.png",
                  "imageinfo": [{"url": "https://u/a.png", "width": 10, "height": 20}]},
            "9": {"index": 3, "title": "File:NoInfo.jpg"}
        }}}"#;
        let images = parse_commons_response(body).unwrap();
        assert_eq!(images.len(), 2);
        assert_eq!(images[0].title, "A.png");
        assert_eq!(images[1].width, 800);
        assert!(parse_commons_response("{}").unwrap().is_empty());
        assert!(parse_commons_response("nope").is_err());
    }

    #[tokio::test]
    async fn test_resolver_dedupes_caps_and_caches() {
        let db = Database::open_in_memory().unwrap();
        let search = Arc::new(MockImageSearch::new());
        let resolver = ImageResolver::new(
            search.clone(),
            CacheStore::new(db),
            chrono::Duration::hours(24),
        );
        let c = content("Solar power", &["Panels convert sunlight"]);

        let first = resolver.images_for_slide(&c, SlideType::Content).await;
        assert_eq!(first.len(), 3);
        let urls: HashSet<_> = first.iter().map(|i| i.url.clone()).collect();
        assert_eq!(urls.len(), 3);
        assert_eq!(search.calls(), 2);

        let second = resolver.images_for_slide(&c, SlideType::Content).await;
        assert_eq!(first, second);
        assert_eq!(search.calls(), 2);
    }
}
