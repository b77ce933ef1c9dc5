//! Builder patterns for creating test capabilities and configs.

#![allow(dead_code)]

use std::sync::Arc;

use tokio::sync::Notify;

use deckgen::capabilities::mock::{offline_capabilities, sample_records, MockRenderer, MockResearch};
use deckgen::capabilities::{DocumentRenderCapability, ResearchCapability};
use deckgen::config::Config;
use deckgen::Capabilities;

/// Builder for offline `Capabilities` with scripted research and rendering.
pub struct CapabilitiesBuilder {
    research: Arc<dyn ResearchCapability>,
    renderer: Arc<dyn DocumentRenderCapability>,
}

impl CapabilitiesBuilder {
    /// Five research records and a working renderer.
    pub fn new() -> Self {
        Self {
            research: Arc::new(MockResearch::with_records(sample_records(5))),
            renderer: Arc::new(MockRenderer::ok()),
        }
    }

    /// Research returning `count` records.
    pub fn research_records(mut self, count: usize) -> Self {
        self.research = Arc::new(MockResearch::with_records(sample_records(count)));
        self
    }

    /// Research where every source fails.
    pub fn no_research(mut self) -> Self {
        self.research = Arc::new(MockResearch::empty());
        self
    }

    pub fn research(mut self, research: Arc<dyn ResearchCapability>) -> Self {
        self.research = research;
        self
    }

    pub fn renderer(mut self, renderer: Arc<dyn DocumentRenderCapability>) -> Self {
        self.renderer = renderer;
        self
    }

    pub fn failing_renderer(self) -> Self {
        self.renderer(Arc::new(MockRenderer::failing()))
    }

    pub fn build(self) -> Capabilities {
        offline_capabilities(self.research, self.renderer)
    }
}

impl Default for CapabilitiesBuilder {
    fn default() -> Self {
        Self::new()
    }
}

/// Research held until the returned gate is notified, with its entry signal.
pub fn gated_research(count: usize) -> (Arc<MockResearch>, Arc<Notify>, Arc<Notify>) {
    let (research, gate) = MockResearch::gated(sample_records(count));
    let entered = research.entered();
    (Arc::new(research), gate, entered)
}

/// Builder for `Config` documents.
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self {
            config: Config::default(),
        }
    }

    pub fn data_directory(mut self, path: &str) -> Self {
        self.config.data_directory = Some(path.to_string());
        self
    }

    pub fn output_directory(mut self, path: &str) -> Self {
        self.config.output_directory = Some(path.to_string());
        self
    }

    pub fn sources(mut self, sources: &[&str]) -> Self {
        self.config.research.sources = sources.iter().map(|s| s.to_string()).collect();
        self
    }

    pub fn max_slides(mut self, max: u32) -> Self {
        self.config.generation.max_slides = max;
        self
    }

    pub fn recent_log_limit(mut self, limit: u32) -> Self {
        self.config.generation.recent_log_limit = limit;
        self
    }

    pub fn translation_endpoint(mut self, endpoint: &str) -> Self {
        self.config.translation.endpoint = Some(endpoint.to_string());
        self
    }

    pub fn build(self) -> Config {
        self.config
    }

    pub fn to_json(&self) -> String {
        serde_json::to_string_pretty(&self.config).expect("Failed to serialize config")
    }
}

impl Default for ConfigBuilder {
    fn default() -> Self {
        Self::new()
    }
}
