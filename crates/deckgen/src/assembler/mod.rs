//! Document assembly: per-slide content, images, citations and the artifact.

mod render;

use std::sync::Arc;

use chrono::Utc;
use tracing::{debug, info, instrument, warn};

pub use render::MarkdownDeckRenderer;

use crate::assets::branding::resolve_theme;
use crate::capabilities::{Capabilities, DeckDocument, RenderedCitation, RenderedSlide};
use crate::db::citation_repo::{self, NewCitation};
use crate::db::presentation_repo::{self, PresentationRow};
use crate::db::slide_repo::{self, NewSlide};
use crate::db::Database;
use crate::model::{CitationSource, JobStatus, Outline, PresentationContext, ResearchRecord};
use crate::orchestrator::{GenerationError, ProgressEvent, ProgressReporter};
use crate::sanitize::redact_path;
use crate::storage::FileStorage;

/// Research records shown to each slide.
pub const RESEARCH_PER_SLIDE: usize = 3;

/// Progress at the start and end of the slide loop.
const PROGRESS_START: i64 = 50;
const PROGRESS_SPAN: i64 = 40;
const PROGRESS_ASSEMBLING: i64 = 90;

pub const FINALIZING_STEP: &str = "Finalizing presentation file";

/// What a finished assembly produced.
#[derive(Debug, Clone, PartialEq)]
pub struct AssemblySummary {
    pub slides: usize,
    pub citations: usize,
    /// Slides whose content came from the fallback path.
    pub fallback_slides: usize,
    pub file_path: String,
    pub file_size: i64,
}

#[derive(Debug, Clone, PartialEq)]
pub enum AssemblyOutcome {
    Completed(AssemblySummary),
    /// The job has been marked failed with `error`.
    Failed { error: String },
    /// The run lost its registration or the job was marked failed elsewhere.
    Cancelled,
}

/// File stem for an artifact: the title reduced to alphanumerics, spaces,
/// `-` and `_`, then `_` and the first 8 characters of the job id.
pub fn artifact_stem(title: &str, job_id: &str) -> String {
    let safe: String = title
        .chars()
        .filter(|c| c.is_alphanumeric() || matches!(c, ' ' | '-' | '_'))
        .collect();
    let safe = safe.trim_end();
    let safe = if safe.is_empty() { "presentation" } else { safe };
    let short_id: String = job_id.chars().take(8).collect();
    format!("{}_{}", safe, short_id)
}

/// Top records by relevance, ties in original order.
pub fn most_relevant(research: &[ResearchRecord], count: usize) -> Vec<ResearchRecord> {
    let mut ranked: Vec<&ResearchRecord> = research.iter().collect();
    ranked.sort_by(|a, b| b.relevance_score.total_cmp(&a.relevance_score));
    ranked.into_iter().take(count).cloned().collect()
}

/// Builds every slide of an outline, then renders and stores the artifact.
pub struct DocumentAssembler {
    db: Database,
    capabilities: Capabilities,
    storage: FileStorage,
    progress: Arc<dyn ProgressReporter>,
}

impl DocumentAssembler {
    pub fn new(
        db: Database,
        capabilities: Capabilities,
        storage: FileStorage,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            db,
            capabilities,
            storage,
            progress,
        }
    }

    /// Assembles the deck for `job`.
    ///
    /// Never returns an error: failures are recorded on the job (status
    /// `failed`, `error_message`) and reported as [`AssemblyOutcome::Failed`].
    /// `still_current` is checked before every slide.
    #[instrument(skip_all, fields(job = %job.id, slides = outline.slides.len()))]
    pub async fn assemble(
        &self,
        job: &PresentationRow,
        outline: &Outline,
        research: &[ResearchRecord],
        still_current: &(dyn Fn() -> bool + Send + Sync),
    ) -> AssemblyOutcome {
        match self.try_assemble(job, outline, research, still_current).await {
            Ok(outcome) => outcome,
            Err(e) => {
                let error = e.to_string();
                warn!(%error, "Assembly failed");
                if let Err(db_err) = presentation_repo::mark_failed(&self.db, &job.id, &error) {
                    warn!(error = %db_err, "Could not record assembly failure");
                }
                AssemblyOutcome::Failed { error }
            }
        }
    }

    async fn try_assemble(
        &self,
        job: &PresentationRow,
        outline: &Outline,
        research: &[ResearchRecord],
        still_current: &(dyn Fn() -> bool + Send + Sync),
    ) -> Result<AssemblyOutcome, GenerationError> {
        let theme = resolve_theme(&job.theme, job.branding_json.as_deref());
        let context = PresentationContext {
            title: job.title.clone(),
            theme: theme.name.clone(),
            slide_count: outline.slides.len() as u32,
        };
        let shown = most_relevant(research, RESEARCH_PER_SLIDE);
        let accessed_date = Utc::now().format("%Y-%m-%d").to_string();
        let total = outline.slides.len().max(1) as i64;

        let mut rendered_slides = Vec::with_capacity(outline.slides.len());
        let mut rendered_citations = Vec::new();
        let mut fallback_slides = 0usize;

        for (i, descriptor) in outline.slides.iter().enumerate() {
            if !still_current() {
                return Ok(AssemblyOutcome::Cancelled);
            }

            let generated = self
                .capabilities
                .slide_content
                .slide_content(descriptor, &shown, &context)
                .await;
            if let Some(reason) = generated.fallback_reason() {
                debug!(slide = descriptor.slide_number, %reason, "Using fallback slide content");
                fallback_slides += 1;
            }
            let content = generated.into_value();

            let images = self
                .capabilities
                .images
                .images_for_slide(&content, descriptor.slide_type)
                .await;

            let title = if content.title.trim().is_empty() {
                descriptor.title.clone()
            } else {
                content.title.clone()
            };
            let content_json = serde_json::to_string(&content)?;
            let image_urls =
                serde_json::to_string(&images.iter().map(|img| &img.url).collect::<Vec<_>>())?;
            let progress = PROGRESS_START + (i as i64 + 1) * PROGRESS_SPAN / total;
            let step = format!("Generating slide {} of {}", i + 1, total);

            let slide_number = descriptor.slide_number as i64;
            let citations: Vec<&ResearchRecord> = content
                .citations
                .iter()
                .filter(|&&idx| idx >= 1 && idx as usize <= shown.len())
                .map(|&idx| &shown[idx as usize - 1])
                .collect();
            let first_number = rendered_citations.len() as i64 + 1;

            let written = self.db.with_tx(|tx| {
                if !presentation_repo::update_progress_on(tx, &job.id, progress, &step)? {
                    return Ok(false);
                }
                slide_repo::insert_on(
                    tx,
                    &NewSlide {
                        presentation_id: &job.id,
                        slide_number,
                        title: &title,
                        slide_type: descriptor.slide_type.as_str(),
                        content_json: &content_json,
                        speaker_notes: Some(content.speaker_notes.as_str()),
                        image_urls: &image_urls,
                    },
                )?;
                for (offset, source) in citations.iter().enumerate() {
                    citation_repo::insert_on(
                        tx,
                        &NewCitation {
                            presentation_id: &job.id,
                            citation_number: first_number + offset as i64,
                            slide_number,
                            source_type: CitationSource::from_content_type(source.content_type)
                                .as_str(),
                            title: &source.title,
                            url: &source.url,
                            accessed_date: &accessed_date,
                            description: None,
                        },
                    )?;
                }
                Ok(true)
            })?;
            if !written {
                return Ok(AssemblyOutcome::Cancelled);
            }

            for (offset, source) in citations.iter().enumerate() {
                rendered_citations.push(RenderedCitation {
                    number: (first_number + offset as i64) as u32,
                    source_type: CitationSource::from_content_type(source.content_type)
                        .as_str()
                        .to_string(),
                    title: source.title.clone(),
                    url: source.url.clone(),
                    accessed_date: accessed_date.clone(),
                });
            }
            self.progress.report(&ProgressEvent::Stage {
                job_id: job.id.clone(),
                status: JobStatus::Generating,
                progress,
                step,
            });
            rendered_slides.push(RenderedSlide {
                number: descriptor.slide_number,
                slide_type: descriptor.slide_type,
                title,
                bullets: content.bullet_points,
                speaker_notes: content.speaker_notes,
                image: images.into_iter().next(),
            });
        }

        if !still_current()
            || !presentation_repo::advance(
                &self.db,
                &job.id,
                JobStatus::Assembling.as_str(),
                PROGRESS_ASSEMBLING,
                FINALIZING_STEP,
            )?
        {
            return Ok(AssemblyOutcome::Cancelled);
        }
        self.progress.report(&ProgressEvent::Stage {
            job_id: job.id.clone(),
            status: JobStatus::Assembling,
            progress: PROGRESS_ASSEMBLING,
            step: FINALIZING_STEP.to_string(),
        });

        let citation_count = rendered_citations.len();
        let slide_count = rendered_slides.len();
        let deck = DeckDocument {
            title: job.title.clone(),
            theme,
            slides: rendered_slides,
            citations: rendered_citations,
        };
        let renderer = Arc::clone(&self.capabilities.renderer);
        let extension = renderer.extension();
        let bytes = tokio::task::spawn_blocking(move || renderer.render(&deck))
            .await
            .map_err(|e| {
                crate::capabilities::CapabilityError::Render(format!("render task failed: {}", e))
            })??;

        let path = self
            .storage
            .store(&bytes, "", &artifact_stem(&job.title, &job.id), extension)?;
        let file_size = bytes.len() as i64;
        let file_path = path.to_string_lossy().into_owned();
        if !presentation_repo::complete(&self.db, &job.id, &file_path, file_size)? {
            return Ok(AssemblyOutcome::Cancelled);
        }

        info!(
            file = %redact_path(&path),
            size = file_size,
            citations = citation_count,
            "Presentation file written"
        );
        Ok(AssemblyOutcome::Completed(AssemblySummary {
            slides: slide_count,
            citations: citation_count,
            fallback_slides,
            file_path,
            file_size,
        }))
    }
}
