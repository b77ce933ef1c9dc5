//! Deterministic capability doubles for tests and offline runs.

use std::collections::VecDeque;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use tokio::sync::Notify;

use super::{
    CapabilityError, Capabilities, DeckDocument, DocumentRenderCapability, Generated,
    ImageCapability, ResearchCapability, SlideContentCapability, SpeechCapability, SpeechClip,
    TranslationCapability,
};
use crate::assets::images::ImageSearch;
use crate::assets::narration::{estimate_duration_secs, Voice};
use crate::generator::{CompletionBackend, CompletionParams, ContentGenerator};
use crate::model::{
    ContentType, ImageDescriptor, PresentationContext, ResearchRecord, SlideContent,
    SlideDescriptor, SlideType,
};
use crate::orchestrator::{ProgressEvent, ProgressReporter};
use crate::research::ResearchSource;

/// Completion backend answering from a script, in order. An exhausted
/// script fails every further call.
pub struct MockCompletion {
    responses: Mutex<VecDeque<Result<String, String>>>,
    calls: AtomicUsize,
}

impl MockCompletion {
    pub fn scripted(responses: Vec<Result<String, String>>) -> Self {
        Self {
            responses: Mutex::new(responses.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self::scripted(Vec::new())
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl CompletionBackend for MockCompletion {
    async fn complete(
        &self,
        _system: &str,
        _user: &str,
        _params: CompletionParams,
    ) -> Result<String, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        let next = self
            .responses
            .lock()
            .ok()
            .and_then(|mut queue| queue.pop_front());
        match next {
            Some(Ok(text)) => Ok(text),
            Some(Err(message)) => Err(CapabilityError::Malformed {
                service: "mock-completion",
                message,
            }),
            None => Err(CapabilityError::Status {
                service: "mock-completion",
                status: 503,
                message: "no scripted response".to_string(),
            }),
        }
    }
}

/// `count` records with strictly decreasing relevance and distinct URLs.
pub fn sample_records(count: usize) -> Vec<ResearchRecord> {
    (0..count)
        .map(|i| {
            ResearchRecord::new(
                format!("Source {}", i + 1),
                format!("Finding number {} is well documented.", i + 1),
                format!("https://research.test/{}", i + 1),
                "mock",
                if i % 2 == 0 {
                    ContentType::Encyclopedia
                } else {
                    ContentType::AcademicPaper
                },
                0.9 - i as f64 * 0.1,
            )
        })
        .collect()
}

/// Research capability returning fixed records, optionally held at a gate.
pub struct MockResearch {
    records: Vec<ResearchRecord>,
    gate: Option<Arc<Notify>>,
    entered: Arc<Notify>,
    calls: AtomicUsize,
}

impl MockResearch {
    pub fn with_records(records: Vec<ResearchRecord>) -> Self {
        Self {
            records,
            gate: None,
            entered: Arc::new(Notify::new()),
            calls: AtomicUsize::new(0),
        }
    }

    /// Simulates every source failing.
    pub fn empty() -> Self {
        Self::with_records(Vec::new())
    }

    /// Research that waits until the returned gate is notified.
    pub fn gated(records: Vec<ResearchRecord>) -> (Self, Arc<Notify>) {
        let gate = Arc::new(Notify::new());
        let mut research = Self::with_records(records);
        research.gate = Some(gate.clone());
        (research, gate)
    }

    /// Notified each time a research call starts.
    pub fn entered(&self) -> Arc<Notify> {
        self.entered.clone()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResearchCapability for MockResearch {
    async fn research(&self, _topic: &str, max_results: usize) -> Vec<ResearchRecord> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.entered.notify_one();
        if let Some(gate) = &self.gate {
            gate.notified().await;
            // pass the permit on to the next call
            gate.notify_one();
        }
        self.records.iter().take(max_results).cloned().collect()
    }
}

/// Slide content citing every record shown, plus one index past the end.
pub struct MockSlideContent;

#[async_trait]
impl SlideContentCapability for MockSlideContent {
    async fn slide_content(
        &self,
        descriptor: &SlideDescriptor,
        research: &[ResearchRecord],
        _context: &PresentationContext,
    ) -> Generated<SlideContent> {
        let mut bullets = descriptor.main_points.clone();
        if bullets.is_empty() {
            bullets.push(format!("About {}", descriptor.title));
        }
        let citations = (1..=research.len() as i64 + 1).collect();
        Generated::Fresh(SlideContent {
            title: descriptor.title.clone(),
            bullet_points: bullets,
            speaker_notes: format!("Notes for {}", descriptor.title),
            visual_suggestions: Vec::new(),
            citations,
            additional_notes: None,
        })
    }
}

/// One image per slide, derived from the slide title.
pub struct MockImages;

#[async_trait]
impl ImageCapability for MockImages {
    async fn images_for_slide(
        &self,
        content: &SlideContent,
        _slide_type: SlideType,
    ) -> Vec<ImageDescriptor> {
        vec![ImageDescriptor {
            url: format!("https://img.test/{}.png", content.title.replace(' ', "_")),
            local_path: None,
            width: 1200,
            height: 800,
            title: content.title.clone(),
            source: "mock".to_string(),
        }]
    }
}

/// Renderer producing a plain-text listing, or always failing.
pub struct MockRenderer {
    fail: bool,
    renders: AtomicUsize,
    last: Mutex<Option<DeckDocument>>,
}

impl MockRenderer {
    pub fn ok() -> Self {
        Self {
            fail: false,
            renders: AtomicUsize::new(0),
            last: Mutex::new(None),
        }
    }

    pub fn failing() -> Self {
        Self {
            fail: true,
            ..Self::ok()
        }
    }

    pub fn renders(&self) -> usize {
        self.renders.load(Ordering::SeqCst)
    }

    /// The most recently rendered deck.
    pub fn last_deck(&self) -> Option<DeckDocument> {
        self.last.lock().ok().and_then(|g| g.clone())
    }
}

impl DocumentRenderCapability for MockRenderer {
    fn extension(&self) -> &'static str {
        "txt"
    }

    fn render(&self, deck: &DeckDocument) -> Result<Vec<u8>, CapabilityError> {
        self.renders.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut last) = self.last.lock() {
            *last = Some(deck.clone());
        }
        if self.fail {
            return Err(CapabilityError::Render("renderer unavailable".to_string()));
        }
        let mut out = format!("{}\n", deck.title);
        for slide in &deck.slides {
            out.push_str(&format!("{}. {}\n", slide.number, slide.title));
        }
        for citation in &deck.citations {
            out.push_str(&format!("[{}] {}\n", citation.number, citation.title));
        }
        Ok(out.into_bytes())
    }
}

/// Translation that prefixes text, or that never translates.
pub struct MockTranslation {
    prefix: Option<String>,
    calls: AtomicUsize,
}

impl MockTranslation {
    pub fn prefixing(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing() -> Self {
        Self {
            prefix: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl TranslationCapability for MockTranslation {
    async fn translate(&self, text: &str, _target_lang: &str) -> Option<String> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.prefix.as_ref().map(|p| format!("{}{}", p, text))
    }
}

/// Speech returning the text bytes as audio, or always failing.
pub struct MockSpeech {
    fail: bool,
}

impl MockSpeech {
    pub fn ok() -> Self {
        Self { fail: false }
    }

    pub fn failing() -> Self {
        Self { fail: true }
    }
}

#[async_trait]
impl SpeechCapability for MockSpeech {
    async fn synthesize(&self, text: &str, _voice: Voice) -> Result<SpeechClip, CapabilityError> {
        if self.fail {
            return Err(CapabilityError::NotConfigured("speech"));
        }
        Ok(SpeechClip {
            bytes: text.as_bytes().to_vec(),
            duration_secs: estimate_duration_secs(text),
            extension: "mp3",
        })
    }
}

/// Progress reporter keeping every event.
#[derive(Default)]
pub struct RecordingProgress {
    events: Mutex<Vec<ProgressEvent>>,
}

impl RecordingProgress {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<ProgressEvent> {
        self.events.lock().map(|g| g.clone()).unwrap_or_default()
    }

    /// Progress values reported for `job_id`, in order.
    pub fn progress_values(&self, job_id: &str) -> Vec<i64> {
        self.events()
            .into_iter()
            .filter_map(|e| match e {
                ProgressEvent::Stage {
                    job_id: id,
                    progress,
                    ..
                } if id == job_id => Some(progress),
                _ => None,
            })
            .collect()
    }
}

impl ProgressReporter for RecordingProgress {
    fn report(&self, event: &ProgressEvent) {
        if let Ok(mut events) = self.events.lock() {
            events.push(event.clone());
        }
    }
}

/// Image search returning `count` synthetic images per term.
#[derive(Default)]
pub struct MockImageSearch {
    calls: AtomicUsize,
}

impl MockImageSearch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ImageSearch for MockImageSearch {
    async fn search(
        &self,
        term: &str,
        count: usize,
    ) -> Result<Vec<ImageDescriptor>, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        Ok((0..count)
            .map(|i| ImageDescriptor {
                url: format!("https://img.test/{}/{}", term.replace(' ', "_"), i),
                local_path: None,
                width: 640,
                height: 480,
                title: format!("{} {}", term, i),
                source: "mock".to_string(),
            })
            .collect())
    }
}

/// Research source with fixed results, or one that always errs.
pub struct MockSource {
    name: &'static str,
    records: Option<Vec<ResearchRecord>>,
    calls: AtomicUsize,
}

impl MockSource {
    pub fn returning(name: &'static str, records: Vec<ResearchRecord>) -> Self {
        Self {
            name,
            records: Some(records),
            calls: AtomicUsize::new(0),
        }
    }

    pub fn failing(name: &'static str) -> Self {
        Self {
            name,
            records: None,
            calls: AtomicUsize::new(0),
        }
    }

    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResearchSource for MockSource {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn search(&self, _query: &str) -> Result<Vec<ResearchRecord>, CapabilityError> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        self.records.clone().ok_or_else(|| CapabilityError::Status {
            service: "mock-source",
            status: 500,
            message: "source down".to_string(),
        })
    }
}

/// Offline analysis and outline, citing slide content and mock images,
/// over the given research and renderer.
pub fn offline_capabilities(
    research: Arc<dyn ResearchCapability>,
    renderer: Arc<dyn DocumentRenderCapability>,
) -> Capabilities {
    let generator = Arc::new(ContentGenerator::offline());
    Capabilities {
        analyze: generator.clone(),
        outline: generator,
        slide_content: Arc::new(MockSlideContent),
        research,
        images: Arc::new(MockImages),
        renderer,
    }
}
