//! The generation service: job creation, background runs, status and cancellation.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Instant;

use chrono::{DateTime, Utc};
use futures_util::FutureExt;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, instrument, warn};

use crate::assembler::{AssemblyOutcome, DocumentAssembler};
use crate::assets::branding::{builtin_theme, BrandingOverrides};
use crate::assets::translation;
use crate::capabilities::Capabilities;
use crate::config::Config;
use crate::db::log_repo::{self, LogRow, NewLogEntry};
use crate::db::presentation_repo::{self, PresentationFilter, PresentationRow};
use crate::db::{now_timestamp, Database};
use crate::model::{JobStatus, LogStatus};
use crate::sanitize::preview;
use crate::storage::FileStorage;

use super::error::GenerationError;
use super::progress::{NoopProgress, ProgressEvent, ProgressReporter};
use super::registry::{JobRegistry, Ticket};

pub const CANCELLED_MESSAGE: &str = "Generation cancelled by user";

/// Stored title length, in characters.
const MAX_TITLE_CHARS: usize = 255;

const RESEARCH_PROGRESS: i64 = 10;
const PLANNING_PROGRESS: i64 = 30;
const GENERATING_PROGRESS: i64 = 50;

const RESEARCH_STEP: &str = "Researching topic";
const PLANNING_STEP: &str = "Creating presentation outline";
const GENERATING_STEP: &str = "Generating slide content";

/// Tunables of the service, usually taken from [`Config`].
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    /// Research records requested per query.
    pub max_results: usize,
    pub max_slides: u32,
    /// Log entries returned by [`GenerationService::get_status`], at most 10.
    pub recent_log_limit: u32,
}

impl Default for ServiceSettings {
    fn default() -> Self {
        Self {
            max_results: 10,
            max_slides: 50,
            recent_log_limit: 10,
        }
    }
}

impl ServiceSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            max_results: config.research.max_results,
            max_slides: config.generation.max_slides,
            recent_log_limit: config.generation.recent_log_limit.clamp(1, 10),
        }
    }
}

/// A request to create a presentation job.
#[derive(Debug, Clone)]
pub struct NewPresentation {
    pub prompt: String,
    pub slide_count: u32,
    pub theme: String,
    pub language: String,
    pub include_tts: bool,
    pub branding: Option<BrandingOverrides>,
}

impl NewPresentation {
    pub fn new(prompt: impl Into<String>) -> Self {
        Self {
            prompt: prompt.into(),
            slide_count: 10,
            theme: "corporate".to_string(),
            language: "en".to_string(),
            include_tts: false,
            branding: None,
        }
    }

    pub fn slides(mut self, slide_count: u32) -> Self {
        self.slide_count = slide_count;
        self
    }

    pub fn theme(mut self, theme: impl Into<String>) -> Self {
        self.theme = theme.into();
        self
    }

    pub fn language(mut self, language: impl Into<String>) -> Self {
        self.language = language.into();
        self
    }
}

/// Snapshot returned by [`GenerationService::get_status`].
#[derive(Debug, Clone, Serialize)]
pub struct GenerationStatus {
    pub id: String,
    pub status: JobStatus,
    pub progress: i64,
    pub current_step: Option<String>,
    pub error_message: Option<String>,
    /// Seconds, set when a run ends.
    pub generation_time: Option<i64>,
    /// Whether a background run is registered for the job.
    pub is_active: bool,
    /// Newest first.
    pub recent_logs: Vec<LogRow>,
}

/// How a run's body ended.
enum RunEnd {
    Completed,
    Failed(String),
    /// Lost its registration or found the job failed by someone else.
    Cancelled,
    /// The job was not startable when the run began; it is left untouched.
    NotStarted,
}

/// Releases a run's registry entry on every exit path, panics included.
struct RunGuard<'a> {
    registry: &'a JobRegistry,
    job_id: &'a str,
    ticket: Ticket,
}

impl Drop for RunGuard<'_> {
    fn drop(&mut self) {
        if self.registry.release(self.job_id, self.ticket) {
            debug!(job = self.job_id, "Released run registration");
        }
    }
}

struct ServiceInner {
    db: Database,
    capabilities: Capabilities,
    storage: FileStorage,
    registry: JobRegistry,
    progress: Arc<dyn ProgressReporter>,
    settings: ServiceSettings,
}

/// Creates presentation jobs and runs them in the background.
///
/// Cheap to clone; clones share one registry. At most one run per job is
/// registered at a time within this service.
#[derive(Clone)]
pub struct GenerationService {
    inner: Arc<ServiceInner>,
}

impl GenerationService {
    pub fn new(
        db: Database,
        capabilities: Capabilities,
        storage: FileStorage,
        settings: ServiceSettings,
    ) -> Self {
        Self::with_progress(db, capabilities, storage, settings, Arc::new(NoopProgress))
    }

    pub fn with_progress(
        db: Database,
        capabilities: Capabilities,
        storage: FileStorage,
        settings: ServiceSettings,
        progress: Arc<dyn ProgressReporter>,
    ) -> Self {
        Self {
            inner: Arc::new(ServiceInner {
                db,
                capabilities,
                storage,
                registry: JobRegistry::new(),
                progress,
                settings,
            }),
        }
    }

    pub fn database(&self) -> &Database {
        &self.inner.db
    }

    /// Validates `request` and inserts a `queued` job.
    pub fn create_presentation(
        &self,
        request: &NewPresentation,
    ) -> Result<PresentationRow, GenerationError> {
        let prompt = request.prompt.trim();
        if prompt.is_empty() {
            return Err(GenerationError::InvalidRequest(
                "prompt must not be empty".to_string(),
            ));
        }
        let max_slides = self.inner.settings.max_slides;
        if request.slide_count == 0 || request.slide_count > max_slides {
            return Err(GenerationError::InvalidRequest(format!(
                "slide count must be between 1 and {}, got {}",
                max_slides, request.slide_count
            )));
        }
        if builtin_theme(&request.theme).is_none() {
            return Err(GenerationError::InvalidRequest(format!(
                "unknown theme '{}'",
                request.theme
            )));
        }
        if !translation::is_supported(&request.language) {
            return Err(GenerationError::UnsupportedLanguage(
                request.language.clone(),
            ));
        }
        let branding_json = match &request.branding {
            Some(overrides) => {
                overrides.validate()?;
                Some(serde_json::to_string(overrides)?)
            }
            None => None,
        };

        let now = now_timestamp();
        let row = PresentationRow {
            id: uuid::Uuid::new_v4().to_string(),
            title: prompt.chars().take(MAX_TITLE_CHARS).collect(),
            original_prompt: prompt.to_string(),
            status: JobStatus::Queued.as_str().to_string(),
            progress: 0,
            current_step: None,
            slide_count: request.slide_count as i64,
            theme: request.theme.clone(),
            language: request.language.clone(),
            include_tts: request.include_tts,
            file_path: None,
            file_size: None,
            generation_time: None,
            error_message: None,
            created_at: now.clone(),
            updated_at: now,
            completed_at: None,
            branding_json,
        };
        presentation_repo::insert(&self.inner.db, &row)?;
        info!(job = %row.id, prompt = %preview(prompt), slides = request.slide_count, "Presentation created");
        Ok(row)
    }

    pub fn get(&self, id: &str) -> Result<PresentationRow, GenerationError> {
        presentation_repo::find_by_id(&self.inner.db, id)?
            .ok_or_else(|| GenerationError::NotFound(id.to_string()))
    }

    /// Newest first, with the total matching the filter.
    pub fn list(
        &self,
        filter: &PresentationFilter,
    ) -> Result<(Vec<PresentationRow>, u64), GenerationError> {
        Ok(presentation_repo::query(&self.inner.db, filter)?)
    }

    /// Stores theme overrides for the next render; `None` clears them.
    pub fn set_branding(
        &self,
        id: &str,
        overrides: Option<&BrandingOverrides>,
    ) -> Result<(), GenerationError> {
        let json = match overrides {
            Some(o) => {
                o.validate()?;
                Some(serde_json::to_string(o)?)
            }
            None => None,
        };
        if !presentation_repo::set_branding(&self.inner.db, id, json.as_deref())? {
            return Err(GenerationError::NotFound(id.to_string()));
        }
        Ok(())
    }

    /// Launches a background run for `id` on the current tokio runtime.
    ///
    /// Returns `Ok(false)` without touching the job if a run is already
    /// registered or the job is neither `queued` nor `failed`. The job's
    /// existence is checked by the run itself.
    #[instrument(skip(self))]
    pub fn start(&self, id: &str) -> Result<bool, GenerationError> {
        let runtime =
            tokio::runtime::Handle::try_current().map_err(|_| GenerationError::NoRuntime)?;
        if let Some(row) = presentation_repo::find_by_id(&self.inner.db, id)? {
            if !JobStatus::parse(&row.status, id).is_startable() {
                debug!(status = %row.status, "Presentation is not startable");
                return Ok(false);
            }
        }
        let Some(ticket) = self.inner.registry.try_register(id) else {
            debug!("Run already registered");
            return Ok(false);
        };

        let inner = Arc::clone(&self.inner);
        let job_id = id.to_string();
        runtime.spawn(async move { inner.run(job_id, ticket).await });
        info!(ticket, "Generation started");
        Ok(true)
    }

    /// Marks a registered job failed and frees its registration.
    ///
    /// The run is not interrupted; it stops at its next checkpoint. Returns
    /// `Ok(false)` if no run is registered for `id`, or if the run has already
    /// completed the job; the registration is freed either way.
    #[instrument(skip(self))]
    pub fn cancel(&self, id: &str) -> Result<bool, GenerationError> {
        if !self.inner.registry.remove(id) {
            return Ok(false);
        }
        let started_at = Utc::now();
        if !presentation_repo::mark_failed(&self.inner.db, id, CANCELLED_MESSAGE)? {
            debug!("Presentation missing or already completed, nothing to cancel");
            return Ok(false);
        }
        self.inner.log_step(
            id,
            "generation_cancelled",
            LogStatus::Completed,
            started_at,
            None,
            None,
        );
        self.inner.progress.report(&ProgressEvent::Finished {
            job_id: id.to_string(),
            status: JobStatus::Failed,
            error: Some(CANCELLED_MESSAGE.to_string()),
        });
        info!("Generation cancelled");
        Ok(true)
    }

    /// Cancels every run registered longer than `max_age`. Returns how many.
    pub fn sweep_stale(&self, max_age: chrono::Duration) -> Result<usize, GenerationError> {
        let cutoff = Utc::now() - max_age;
        let mut cleaned = 0;
        for id in self.inner.registry.started_before(cutoff) {
            if self.cancel(&id)? {
                cleaned += 1;
            }
        }
        if cleaned > 0 {
            info!(cleaned, "Cancelled stale generations");
        }
        Ok(cleaned)
    }

    pub fn get_status(&self, id: &str) -> Result<GenerationStatus, GenerationError> {
        let row = self.get(id)?;
        let recent_logs =
            log_repo::recent(&self.inner.db, id, self.inner.settings.recent_log_limit)?;
        Ok(GenerationStatus {
            status: JobStatus::parse(&row.status, &row.id),
            id: row.id,
            progress: row.progress,
            current_step: row.current_step,
            error_message: row.error_message,
            generation_time: row.generation_time,
            is_active: self.inner.registry.contains(id),
            recent_logs,
        })
    }

    /// Number of registered runs.
    pub fn active_count(&self) -> usize {
        self.inner.registry.len()
    }

    pub fn is_active(&self, id: &str) -> bool {
        self.inner.registry.contains(id)
    }
}

impl ServiceInner {
    /// Appends an audit entry. A failed write is logged and does not stop
    /// the run.
    fn log_step(
        &self,
        id: &str,
        step: &str,
        status: LogStatus,
        started_at: DateTime<Utc>,
        details: Option<serde_json::Value>,
        error: Option<&str>,
    ) {
        let entry = NewLogEntry {
            presentation_id: id,
            step_name: step,
            status: status.as_str(),
            started_at,
            details: details.as_ref(),
            error_message: error,
        };
        if let Err(e) = log_repo::append(&self.db, &entry) {
            warn!(step, error = %e, "Could not write generation log entry");
        }
    }

    fn report_stage(&self, id: &str, status: JobStatus, progress: i64, step: &str) {
        self.progress.report(&ProgressEvent::Stage {
            job_id: id.to_string(),
            status,
            progress,
            step: step.to_string(),
        });
    }

    /// The background unit of one job. Never returns an error: every
    /// outcome ends up on the job row.
    #[instrument(name = "generation", skip_all, fields(job = %job_id, ticket = ticket))]
    async fn run(&self, job_id: String, ticket: Ticket) {
        let _guard = RunGuard {
            registry: &self.registry,
            job_id: &job_id,
            ticket,
        };
        let started = Instant::now();

        let job = match presentation_repo::find_by_id(&self.db, &job_id) {
            Ok(Some(job)) => job,
            Ok(None) => {
                debug!("Presentation not found, nothing to run");
                return;
            }
            Err(e) => {
                warn!(error = %e, "Could not load presentation");
                return;
            }
        };

        let body = AssertUnwindSafe(self.execute(&job, ticket)).catch_unwind().await;
        let end = match body {
            Ok(Ok(end)) => end,
            Ok(Err(e)) => self.fail_unhandled(&job_id, ticket, &e.to_string()),
            Err(panic) => {
                let message = panic
                    .downcast_ref::<&str>()
                    .map(|s| s.to_string())
                    .or_else(|| panic.downcast_ref::<String>().cloned())
                    .unwrap_or_else(|| "generation task panicked".to_string());
                self.fail_unhandled(&job_id, ticket, &message)
            }
        };

        if let RunEnd::NotStarted = end {
            debug!("Presentation is not startable, run skipped");
            return;
        }
        if self.registry.is_superseded(&job_id, ticket) {
            debug!("Run superseded by a newer one, leaving the job alone");
            return;
        }

        let elapsed = started.elapsed().as_secs() as i64;
        if let Err(e) = presentation_repo::set_generation_time(&self.db, &job_id, elapsed) {
            warn!(error = %e, "Could not record generation time");
        }

        match end {
            RunEnd::Cancelled => self.settle_cancelled(&job_id),
            end => self.report_finished(&job_id, end, elapsed),
        }
    }

    /// Reports the outcome as stored, which a late cancel or error may have
    /// changed since the run body returned.
    fn report_finished(&self, id: &str, end: RunEnd, elapsed: i64) {
        let stored = match presentation_repo::find_by_id(&self.db, id) {
            Ok(row) => row.map(|row| (JobStatus::parse(&row.status, id), row.error_message)),
            Err(e) => {
                warn!(error = %e, "Could not reload presentation");
                None
            }
        };
        let (status, error) = match (stored, end) {
            (Some((JobStatus::Completed, _)), _) => (JobStatus::Completed, None),
            (Some((JobStatus::Failed, message)), end) => {
                let fallback = match end {
                    RunEnd::Failed(error) => error,
                    _ => "Generation failed".to_string(),
                };
                (JobStatus::Failed, Some(message.unwrap_or(fallback)))
            }
            (_, RunEnd::Failed(error)) => (JobStatus::Failed, Some(error)),
            _ => (JobStatus::Completed, None),
        };
        match &error {
            None => info!(seconds = elapsed, "Generation completed"),
            Some(error) => warn!(%error, "Generation failed"),
        }
        self.progress.report(&ProgressEvent::Finished {
            job_id: id.to_string(),
            status,
            error,
        });
    }

    /// Stages 2 to 6 of a run.
    async fn execute(&self, job: &PresentationRow, ticket: Ticket) -> Result<RunEnd, GenerationError> {
        let id = job.id.as_str();
        let current = || self.registry.is_current(id, ticket);

        self.log_step(
            id,
            "generation_started",
            LogStatus::Started,
            Utc::now(),
            Some(json!({
                "prompt_preview": preview(&job.original_prompt),
                "slide_count": job.slide_count,
            })),
            None,
        );

        // Research
        if !current() {
            return Ok(RunEnd::Cancelled);
        }
        if !presentation_repo::begin_run(&self.db, id, RESEARCH_PROGRESS, RESEARCH_STEP)? {
            return Ok(RunEnd::NotStarted);
        }
        self.report_stage(id, JobStatus::Researching, RESEARCH_PROGRESS, RESEARCH_STEP);
        let stage_start = Utc::now();
        self.log_step(id, "research", LogStatus::Started, stage_start, None, None);

        let analysis = self.capabilities.analyze.analyze(&job.original_prompt).await;
        let analysis_fallback = analysis.is_fallback();
        let analysis = analysis.into_value();
        let topic = if analysis.main_topic.trim().is_empty() {
            job.original_prompt.as_str()
        } else {
            analysis.main_topic.as_str()
        };
        let research = self
            .capabilities
            .research
            .research_topics(topic, &analysis.subtopics, self.settings.max_results)
            .await
            .flatten();
        self.log_step(
            id,
            "research",
            LogStatus::Completed,
            stage_start,
            Some(json!({
                "sources_found": research.len(),
                "analysis_fallback": analysis_fallback,
            })),
            None,
        );

        // Planning
        if !current()
            || !presentation_repo::advance(
                &self.db,
                id,
                JobStatus::Planning.as_str(),
                PLANNING_PROGRESS,
                PLANNING_STEP,
            )?
        {
            return Ok(RunEnd::Cancelled);
        }
        self.report_stage(id, JobStatus::Planning, PLANNING_PROGRESS, PLANNING_STEP);
        let stage_start = Utc::now();
        self.log_step(id, "planning", LogStatus::Started, stage_start, None, None);

        let slide_count = job.slide_count.clamp(1, u32::MAX as i64) as u32;
        let outline = self
            .capabilities
            .outline
            .outline(&job.original_prompt, slide_count, &analysis)
            .await;
        let outline_fallback = outline.is_fallback();
        let outline = outline.into_value();

        let mut job = job.clone();
        let title = outline.title.trim();
        if !title.is_empty() && title != job.original_prompt {
            let title: String = title.chars().take(MAX_TITLE_CHARS).collect();
            presentation_repo::set_title(&self.db, id, &title)?;
            job.title = title;
        }
        self.log_step(
            id,
            "planning",
            LogStatus::Completed,
            stage_start,
            Some(json!({
                "slides_planned": outline.slides.len(),
                "fallback": outline_fallback,
            })),
            None,
        );

        // Content generation and assembly
        if !current()
            || !presentation_repo::advance(
                &self.db,
                id,
                JobStatus::Generating.as_str(),
                GENERATING_PROGRESS,
                GENERATING_STEP,
            )?
        {
            return Ok(RunEnd::Cancelled);
        }
        self.report_stage(id, JobStatus::Generating, GENERATING_PROGRESS, GENERATING_STEP);
        let stage_start = Utc::now();
        self.log_step(
            id,
            "content_generation",
            LogStatus::Started,
            stage_start,
            None,
            None,
        );

        let assembler = DocumentAssembler::new(
            self.db.clone(),
            self.capabilities.clone(),
            self.storage.clone(),
            Arc::clone(&self.progress),
        );
        match assembler.assemble(&job, &outline, &research, &current).await {
            AssemblyOutcome::Completed(summary) => {
                self.log_step(
                    id,
                    "content_generation",
                    LogStatus::Completed,
                    stage_start,
                    Some(json!({
                        "slides": summary.slides,
                        "citations": summary.citations,
                        "fallback_slides": summary.fallback_slides,
                    })),
                    None,
                );
                self.log_step(
                    id,
                    "generation_completed",
                    LogStatus::Completed,
                    stage_start,
                    Some(json!({ "file_size": summary.file_size })),
                    None,
                );
                Ok(RunEnd::Completed)
            }
            AssemblyOutcome::Failed { error } => {
                self.log_step(
                    id,
                    "content_generation",
                    LogStatus::Failed,
                    stage_start,
                    None,
                    Some(&error),
                );
                Ok(RunEnd::Failed(error))
            }
            AssemblyOutcome::Cancelled => Ok(RunEnd::Cancelled),
        }
    }

    /// Records an error or panic that escaped the run body.
    fn fail_unhandled(&self, id: &str, ticket: Ticket, message: &str) -> RunEnd {
        if self.registry.is_superseded(id, ticket) {
            return RunEnd::Cancelled;
        }
        self.log_step(
            id,
            "generation_error",
            LogStatus::Failed,
            Utc::now(),
            None,
            Some(message),
        );
        if let Err(e) = presentation_repo::mark_failed(&self.db, id, message) {
            warn!(error = %e, "Could not mark presentation failed");
        }
        RunEnd::Failed(message.to_string())
    }

    /// A cancelled run may have moved the job forward after the cancel
    /// marked it failed; put it back.
    fn settle_cancelled(&self, id: &str) {
        match presentation_repo::find_by_id(&self.db, id) {
            Ok(Some(row)) if !JobStatus::parse(&row.status, id).is_terminal() => {
                debug!(status = %row.status, "Re-marking cancelled presentation as failed");
                if let Err(e) = presentation_repo::mark_failed(&self.db, id, CANCELLED_MESSAGE) {
                    warn!(error = %e, "Could not mark cancelled presentation failed");
                }
            }
            Ok(_) => {}
            Err(e) => warn!(error = %e, "Could not reload cancelled presentation"),
        }
    }
}
