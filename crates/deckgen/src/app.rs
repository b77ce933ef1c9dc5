//! Builds the production services from a [`Config`].

use std::sync::Arc;
use std::time::Duration;

use tracing::{info, warn};

use crate::assembler::MarkdownDeckRenderer;
use crate::assets::images::{ImageResolver, WikimediaImageSearch};
use crate::assets::narration::{Narrator, OpenAiSpeech};
use crate::assets::translation::{LibreTranslate, Translator};
use crate::cache::CacheStore;
use crate::capabilities::{Capabilities, ImageCapability, NoImages};
use crate::config::Config;
use crate::db::Database;
use crate::error::Result;
use crate::generator::{ContentGenerator, OpenAiCompletion};
use crate::openai::{OpenAiConfig, DEFAULT_OPENAI_URL};
use crate::orchestrator::{GenerationService, ProgressReporter, ServiceSettings};
use crate::research::{self, ResearchAggregator};
use crate::secrets::resolve_secret_optional;
use crate::storage::FileStorage;

/// Timeout of a translation request.
const TRANSLATION_TIMEOUT: Duration = Duration::from_secs(30);

/// Opened database, storage and generation service.
pub struct App {
    pub config: Config,
    pub db: Database,
    pub storage: FileStorage,
    pub service: GenerationService,
}

impl App {
    /// Opens the configured database and wires every capability.
    pub fn from_config(config: Config, progress: Arc<dyn ProgressReporter>) -> Result<Self> {
        let db = Database::open(&config.database_file())?;
        let storage = FileStorage::new(config.output_dir());
        let capabilities = build_capabilities(&config, &db)?;
        let service = GenerationService::with_progress(
            db.clone(),
            capabilities,
            storage.clone(),
            ServiceSettings::from_config(&config),
            progress,
        );
        Ok(Self {
            config,
            db,
            storage,
            service,
        })
    }

    /// Translation service, if an endpoint is configured.
    pub fn translator(&self) -> Result<Option<Translator>> {
        let Some(endpoint) = self.config.translation.endpoint.as_deref() else {
            return Ok(None);
        };
        let api_key =
            resolve_secret_optional(None, self.config.translation.api_key_env.as_deref())?;
        let backend = LibreTranslate::new(endpoint, api_key, TRANSLATION_TIMEOUT)?;
        Ok(Some(Translator::new(
            self.db.clone(),
            Arc::new(backend),
            chrono::Duration::hours(self.config.translation.cache_ttl_hours),
        )))
    }

    /// Narration service over the completion endpoint's speech API.
    pub fn narrator(&self) -> Result<Narrator> {
        let completion = &self.config.completion;
        let speech = OpenAiSpeech::new(OpenAiConfig {
            base_url: completion.api_base.clone(),
            api_key: resolve_secret_optional(None, completion.api_key_env.as_deref())?,
            model: self.config.speech.model.clone(),
            timeout_secs: completion.timeout_secs,
        })?;
        Ok(Narrator::new(
            self.db.clone(),
            Arc::new(speech),
            self.storage.clone(),
        ))
    }
}

/// Production capabilities: completion-backed content, web research,
/// Wikimedia images and the Markdown renderer.
///
/// Without an API key for the hosted endpoint, content generation runs
/// offline on its deterministic fallbacks.
pub fn build_capabilities(config: &Config, db: &Database) -> Result<Capabilities> {
    let completion = &config.completion;
    let api_key = resolve_secret_optional(None, completion.api_key_env.as_deref())?;
    let hosted = completion.api_base.trim_end_matches('/') == DEFAULT_OPENAI_URL;
    let generator = if api_key.is_none() && hosted {
        warn!("No completion API key configured, using offline content generation");
        ContentGenerator::offline()
    } else {
        ContentGenerator::new(Arc::new(OpenAiCompletion::new(OpenAiConfig {
            base_url: completion.api_base.clone(),
            api_key,
            model: completion.model.clone(),
            timeout_secs: completion.timeout_secs,
        })?))
    };
    let generator = Arc::new(generator);

    let cache = CacheStore::new(db.clone());
    let research_cfg = &config.research;
    let client = research::http_client(
        &research_cfg.user_agent,
        Duration::from_secs(research_cfg.request_timeout_secs),
    )?;
    let sources = research::sources_by_name(&research_cfg.sources, &client);
    info!(sources = sources.len(), "Research sources configured");
    let research = ResearchAggregator::new(
        sources,
        cache.clone(),
        Duration::from_millis(research_cfg.rate_limit_ms),
        chrono::Duration::hours(research_cfg.cache_ttl_hours),
    );

    let images: Arc<dyn ImageCapability> = if config.images.enabled {
        let search = WikimediaImageSearch::new(
            &research_cfg.user_agent,
            Duration::from_secs(research_cfg.request_timeout_secs),
        )?;
        Arc::new(ImageResolver::new(
            Arc::new(search),
            cache,
            chrono::Duration::hours(config.images.cache_ttl_hours),
        ))
    } else {
        Arc::new(NoImages)
    };

    Ok(Capabilities {
        analyze: generator.clone(),
        outline: generator.clone(),
        slide_content: generator,
        research: Arc::new(research),
        images,
        renderer: Arc::new(MarkdownDeckRenderer),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;

    #[test]
    #[serial]
    fn test_build_capabilities_offline_without_key() {
        std::env::remove_var("DECKGEN_TEST_MISSING_KEY");
        let mut config = Config::default();
        config.completion.api_key_env = Some("DECKGEN_TEST_MISSING_KEY".to_string());
        config.images.enabled = false;
        let db = Database::open_in_memory().unwrap();
        let caps = build_capabilities(&config, &db).unwrap();
        assert_eq!(caps.renderer.extension(), "md");
    }

    #[test]
    fn test_app_opens_database_under_data_directory() {
        let dir = tempfile::tempdir().unwrap();
        let mut config = Config::default();
        config.data_directory = Some(dir.path().to_string_lossy().into_owned());
        config.completion.api_key_env = None;
        config.images.enabled = false;
        let app = App::from_config(config, Arc::new(crate::orchestrator::NoopProgress)).unwrap();
        assert!(dir.path().join("data").join("deckgen.db").exists());
        assert!(app.translator().unwrap().is_none());
        assert_eq!(app.service.active_count(), 0);
    }
}
