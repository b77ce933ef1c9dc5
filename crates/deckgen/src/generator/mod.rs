//! Prompt analysis, outline and slide content generation.
//!
//! [`ContentGenerator`] drives a [`CompletionBackend`] and never fails: any
//! backend error or unusable response becomes a [`Generated::Fallback`]
//! carrying deterministic content from [`fallback`].

mod completion;
pub mod fallback;
mod prompts;

use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use tracing::{debug, instrument, warn};

pub use completion::{CompletionBackend, CompletionParams, OpenAiCompletion};

use crate::capabilities::{
    AnalyzeCapability, Generated, OutlineCapability, SlideContentCapability,
};
use crate::model::{
    Outline, PresentationContext, PromptAnalysis, ResearchRecord, SlideContent, SlideDescriptor,
};

/// Bullet points kept per slide.
pub const MAX_BULLETS: usize = 5;

/// Completion-backed implementation of the content capabilities.
///
/// Without a backend every call returns its fallback.
#[derive(Clone, Default)]
pub struct ContentGenerator {
    backend: Option<Arc<dyn CompletionBackend>>,
}

impl ContentGenerator {
    pub fn new(backend: Arc<dyn CompletionBackend>) -> Self {
        Self {
            backend: Some(backend),
        }
    }

    /// Generator that always uses the deterministic fallbacks.
    pub fn offline() -> Self {
        Self { backend: None }
    }

    async fn complete_json<T: DeserializeOwned>(
        &self,
        system: &str,
        user: &str,
        params: CompletionParams,
    ) -> Result<T, String> {
        let backend = self
            .backend
            .as_ref()
            .ok_or_else(|| "completion backend not configured".to_string())?;
        let response = backend
            .complete(system, user, params)
            .await
            .map_err(|e| e.to_string())?;
        let json = extract_json(&response);
        serde_json::from_str(json).map_err(|e| format!("unparseable completion: {}", e))
    }
}

#[async_trait]
impl AnalyzeCapability for ContentGenerator {
    #[instrument(skip_all)]
    async fn analyze(&self, prompt: &str) -> Generated<PromptAnalysis> {
        match self
            .complete_json::<PromptAnalysis>(
                prompts::ANALYZE_SYSTEM,
                &prompts::analyze_user(prompt),
                prompts::ANALYZE_PARAMS,
            )
            .await
        {
            Ok(mut analysis) => {
                if analysis.main_topic.trim().is_empty() {
                    analysis.main_topic = prompt.to_string();
                }
                Generated::Fresh(analysis)
            }
            Err(reason) => {
                warn!(%reason, "Prompt analysis fell back");
                Generated::fallback(PromptAnalysis::from_prompt(prompt), reason)
            }
        }
    }
}

#[async_trait]
impl OutlineCapability for ContentGenerator {
    #[instrument(skip(self, prompt, analysis))]
    async fn outline(
        &self,
        prompt: &str,
        slide_count: u32,
        analysis: &PromptAnalysis,
    ) -> Generated<Outline> {
        let result = self
            .complete_json::<Outline>(
                &prompts::outline_system(slide_count),
                &prompts::outline_user(prompt, slide_count, analysis),
                prompts::OUTLINE_PARAMS,
            )
            .await
            .and_then(|outline| {
                if outline.slides.len() == slide_count as usize {
                    Ok(outline)
                } else {
                    Err(format!(
                        "outline has {} slides, expected {}",
                        outline.slides.len(),
                        slide_count
                    ))
                }
            });

        match result {
            Ok(mut outline) => {
                if outline.title.trim().is_empty() {
                    outline.title = prompt.to_string();
                }
                for (i, slide) in outline.slides.iter_mut().enumerate() {
                    slide.slide_number = i as u32 + 1;
                    slide.main_points.truncate(MAX_BULLETS);
                }
                Generated::Fresh(outline)
            }
            Err(reason) => {
                warn!(%reason, "Outline fell back");
                Generated::fallback(fallback::outline(prompt, slide_count), reason)
            }
        }
    }
}

#[async_trait]
impl SlideContentCapability for ContentGenerator {
    #[instrument(skip_all, fields(slide = descriptor.slide_number))]
    async fn slide_content(
        &self,
        descriptor: &SlideDescriptor,
        research: &[ResearchRecord],
        context: &PresentationContext,
    ) -> Generated<SlideContent> {
        debug!(deck = %context.title, shown = research.len(), "Generating slide content");
        let result = self
            .complete_json::<SlideContent>(
                prompts::SLIDE_SYSTEM,
                &prompts::slide_user(descriptor, research),
                prompts::SLIDE_PARAMS,
            )
            .await
            .and_then(|content| {
                if content.bullet_points.is_empty() {
                    Err("slide content has no bullet points".to_string())
                } else {
                    Ok(content)
                }
            });

        match result {
            Ok(mut content) => {
                if content.title.trim().is_empty() {
                    content.title = descriptor.title.clone();
                }
                content.bullet_points.truncate(MAX_BULLETS);
                Generated::Fresh(content)
            }
            Err(reason) => {
                warn!(%reason, "Slide content fell back");
                Generated::fallback(fallback::slide_content(descriptor), reason)
            }
        }
    }
}

/// Extracts the first balanced JSON object from a completion, skipping any
/// surrounding prose or code fences. Braces inside strings are ignored.
pub fn extract_json(response: &str) -> &str {
    let Some(start) = response.find('{') else {
        return response;
    };

    let mut depth = 0usize;
    let mut in_string = false;
    let mut escape_next = false;
    let mut end = response.len();

    for (i, c) in response[start..].char_indices() {
        if escape_next {
            escape_next = false;
            continue;
        }
        match c {
            '\\' if in_string => escape_next = true,
            '"' => in_string = !in_string,
            '{' if !in_string => depth += 1,
            '}' if !in_string => {
                depth = depth.saturating_sub(1);
                if depth == 0 {
                    end = start + i + 1;
                    break;
                }
            }
            _ => {}
        }
    }

    &response[start..end]
}
