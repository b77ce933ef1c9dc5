//! Capability interfaces consumed by the generation pipeline.
//!
//! Each external collaborator (text completion, research, images, rendering,
//! translation, speech) sits behind a trait so implementations can be swapped
//! without touching the orchestration core. Content-producing capabilities
//! never fail: they return [`Generated::Fallback`] with deterministic data
//! when their backend errs.

use std::collections::HashSet;
use std::sync::Arc;

use async_trait::async_trait;
use thiserror::Error;

use crate::assets::branding::Theme;
use crate::assets::narration::Voice;
use crate::model::{
    ImageDescriptor, Outline, PresentationContext, PromptAnalysis, ResearchBundle, ResearchRecord,
    SlideContent, SlideDescriptor, SlideType,
};

pub mod mock;

/// Errors raised by capability backends.
#[derive(Error, Debug)]
pub enum CapabilityError {
    #[error("Request to {service} failed: {source}")]
    Http {
        service: &'static str,
        #[source]
        source: reqwest::Error,
    },

    #[error("{service} returned {status}: {message}")]
    Status {
        service: &'static str,
        status: u16,
        message: String,
    },

    #[error("Malformed response from {service}: {message}")]
    Malformed {
        service: &'static str,
        message: String,
    },

    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Rendering failed: {0}")]
    Render(String),
}

/// Output of a content-producing capability.
///
/// `Fallback` carries deterministic substitute data plus the reason the
/// backend result could not be used.
#[derive(Debug, Clone, PartialEq)]
pub enum Generated<T> {
    Fresh(T),
    Fallback { value: T, reason: String },
}

impl<T> Generated<T> {
    pub fn fallback(value: T, reason: impl Into<String>) -> Self {
        Generated::Fallback {
            value,
            reason: reason.into(),
        }
    }

    pub fn value(&self) -> &T {
        match self {
            Generated::Fresh(v) => v,
            Generated::Fallback { value, .. } => value,
        }
    }

    pub fn into_value(self) -> T {
        match self {
            Generated::Fresh(v) => v,
            Generated::Fallback { value, .. } => value,
        }
    }

    pub fn is_fallback(&self) -> bool {
        matches!(self, Generated::Fallback { .. })
    }

    pub fn fallback_reason(&self) -> Option<&str> {
        match self {
            Generated::Fresh(_) => None,
            Generated::Fallback { reason, .. } => Some(reason),
        }
    }

    pub fn map<U>(self, f: impl FnOnce(T) -> U) -> Generated<U> {
        match self {
            Generated::Fresh(v) => Generated::Fresh(f(v)),
            Generated::Fallback { value, reason } => Generated::Fallback {
                value: f(value),
                reason,
            },
        }
    }
}

#[async_trait]
pub trait AnalyzeCapability: Send + Sync {
    async fn analyze(&self, prompt: &str) -> Generated<PromptAnalysis>;
}

/// Produces exactly `slide_count` descriptors, numbered from 1.
#[async_trait]
pub trait OutlineCapability: Send + Sync {
    async fn outline(
        &self,
        prompt: &str,
        slide_count: u32,
        analysis: &PromptAnalysis,
    ) -> Generated<Outline>;
}

#[async_trait]
pub trait SlideContentCapability: Send + Sync {
    /// `research` is the subset shown to this slide; citation indices in the
    /// returned content are 1-based positions in it.
    async fn slide_content(
        &self,
        descriptor: &SlideDescriptor,
        research: &[ResearchRecord],
        context: &PresentationContext,
    ) -> Generated<SlideContent>;
}

#[async_trait]
pub trait ResearchCapability: Send + Sync {
    /// Ordered records for `topic`, at most `max_results`. Source failures
    /// yield fewer records, never an error.
    async fn research(&self, topic: &str, max_results: usize) -> Vec<ResearchRecord>;

    /// Researches the topic and up to two subtopics, grouped by content type.
    /// Records already seen under another query are skipped.
    async fn research_topics(
        &self,
        topic: &str,
        subtopics: &[String],
        max_results: usize,
    ) -> ResearchBundle {
        let mut bundle = ResearchBundle::default();
        let mut seen = HashSet::new();
        let queries = std::iter::once(topic).chain(subtopics.iter().take(2).map(String::as_str));
        for query in queries {
            for record in self.research(query, max_results).await {
                let key = if record.url.is_empty() {
                    record.title.clone()
                } else {
                    record.url.clone()
                };
                if seen.insert(key) {
                    bundle.push(record);
                }
            }
        }
        bundle
    }
}

#[async_trait]
pub trait ImageCapability: Send + Sync {
    /// Up to three images for a slide. Failures yield an empty list.
    async fn images_for_slide(
        &self,
        content: &SlideContent,
        slide_type: SlideType,
    ) -> Vec<ImageDescriptor>;
}

/// A slide as handed to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedSlide {
    pub number: u32,
    pub slide_type: SlideType,
    pub title: String,
    pub bullets: Vec<String>,
    pub speaker_notes: String,
    pub image: Option<ImageDescriptor>,
}

/// A citation as handed to the renderer.
#[derive(Debug, Clone, PartialEq)]
pub struct RenderedCitation {
    pub number: u32,
    pub source_type: String,
    pub title: String,
    pub url: String,
    pub accessed_date: String,
}

/// Everything needed to produce one document artifact.
#[derive(Debug, Clone)]
pub struct DeckDocument {
    pub title: String,
    pub theme: Theme,
    pub slides: Vec<RenderedSlide>,
    pub citations: Vec<RenderedCitation>,
}

/// Turns a deck into artifact bytes. CPU-bound and synchronous.
pub trait DocumentRenderCapability: Send + Sync {
    /// File extension of the produced artifact, without the dot.
    fn extension(&self) -> &'static str;

    fn render(&self, deck: &DeckDocument) -> Result<Vec<u8>, CapabilityError>;
}

#[async_trait]
pub trait TranslationCapability: Send + Sync {
    /// Translated text, or `None` when the text could not be translated.
    async fn translate(&self, text: &str, target_lang: &str) -> Option<String>;
}

/// Synthesized audio for one text.
#[derive(Debug, Clone, PartialEq)]
pub struct SpeechClip {
    pub bytes: Vec<u8>,
    pub duration_secs: f64,
    /// File extension of the audio encoding, without the dot.
    pub extension: &'static str,
}

#[async_trait]
pub trait SpeechCapability: Send + Sync {
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<SpeechClip, CapabilityError>;
}

/// Image capability that never finds anything.
pub struct NoImages;

#[async_trait]
impl ImageCapability for NoImages {
    async fn images_for_slide(
        &self,
        _content: &SlideContent,
        _slide_type: SlideType,
    ) -> Vec<ImageDescriptor> {
        Vec::new()
    }
}

/// The capability set a generation run depends on.
#[derive(Clone)]
pub struct Capabilities {
    pub analyze: Arc<dyn AnalyzeCapability>,
    pub outline: Arc<dyn OutlineCapability>,
    pub slide_content: Arc<dyn SlideContentCapability>,
    pub research: Arc<dyn ResearchCapability>,
    pub images: Arc<dyn ImageCapability>,
    pub renderer: Arc<dyn DocumentRenderCapability>,
}
