//! Slide narration: text preparation, speech backend and per-slide audio files.

use std::sync::{Arc, LazyLock};

use async_trait::async_trait;
use regex::Regex;
use tracing::{info, instrument, warn};

use crate::capabilities::{CapabilityError, SpeechCapability, SpeechClip};
use crate::db::audio_repo::{self, AudioRow};
use crate::db::{presentation_repo, slide_repo, Database};
use crate::model::SlideContent;
use crate::openai::{OpenAiClient, OpenAiConfig, SpeechRequest};
use crate::orchestrator::GenerationError;
use crate::storage::FileStorage;

/// Texts shorter than this are not narrated.
const MIN_NARRATION_CHARS: usize = 10;

/// Speaking rate used to estimate clip duration.
const WORDS_PER_MINUTE: f64 = 150.0;

static RE_ABBREVIATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"\b(AI|ML|IoT|API|UI|UX|CEO|CTO|ROI|KPI)\b").unwrap()
});

/// Narration voice.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Voice {
    Male,
    Female,
}

impl Voice {
    pub fn as_str(&self) -> &'static str {
        match self {
            Voice::Male => "male_voice",
            Voice::Female => "female_voice",
        }
    }

    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "male_voice" | "male" => Some(Voice::Male),
            "female_voice" | "female" => Some(Voice::Female),
            _ => None,
        }
    }

    /// Voice name understood by the OpenAI speech endpoint.
    pub fn openai_voice(&self) -> &'static str {
        match self {
            Voice::Male => "onyx",
            Voice::Female => "nova",
        }
    }
}

fn expand_abbreviation(abbr: &str) -> &'static str {
    match abbr {
        "AI" => "Artificial Intelligence",
        "ML" => "Machine Learning",
        "IoT" => "Internet of Things",
        "API" => "Application Programming Interface",
        "UI" => "User Interface",
        "UX" => "User Experience",
        "CEO" => "Chief Executive Officer",
        "CTO" => "Chief Technology Officer",
        "ROI" => "Return on Investment",
        "KPI" => "Key Performance Indicator",
        _ => "",
    }
}

/// Builds the narration text for one slide.
pub fn prepare_slide_text(
    slide_number: i64,
    title: &str,
    bullets: &[String],
    speaker_notes: Option<&str>,
) -> String {
    let mut parts = Vec::new();
    if !title.trim().is_empty() {
        parts.push(format!("Slide {}: {}", slide_number, title.trim()));
    }
    parts.extend(
        bullets
            .iter()
            .map(|b| b.trim())
            .filter(|b| !b.is_empty())
            .map(str::to_string),
    );
    if let Some(notes) = speaker_notes.map(str::trim).filter(|n| !n.is_empty()) {
        parts.push(notes.to_string());
    }
    clean_for_speech(&parts.join(". "))
}

/// Normalizes ellipses, ensures a final period and spells out abbreviations.
pub fn clean_for_speech(text: &str) -> String {
    let replaced = text.replace("...", ". ").replace("..", ". ");
    let mut cleaned = replaced.trim_end().to_string();
    if !cleaned.ends_with('.') {
        cleaned.push('.');
    }
    RE_ABBREVIATION
        .replace_all(&cleaned, |caps: &regex::Captures<'_>| {
            expand_abbreviation(&caps[1]).to_string()
        })
        .into_owned()
}

/// Rough spoken duration of `text` in seconds.
pub fn estimate_duration_secs(text: &str) -> f64 {
    let words = text.split_whitespace().count() as f64;
    words / WORDS_PER_MINUTE * 60.0
}

/// Speech backend over an OpenAI-compatible `/audio/speech` endpoint.
pub struct OpenAiSpeech {
    client: OpenAiClient,
}

impl OpenAiSpeech {
    pub fn new(config: OpenAiConfig) -> Result<Self, CapabilityError> {
        Ok(Self {
            client: OpenAiClient::new(config)?,
        })
    }
}

#[async_trait]
impl SpeechCapability for OpenAiSpeech {
    async fn synthesize(&self, text: &str, voice: Voice) -> Result<SpeechClip, CapabilityError> {
        let request = SpeechRequest {
            model: &self.client.config().model,
            input: text,
            voice: voice.openai_voice(),
            response_format: "mp3",
        };
        let response = self
            .client
            .post_json("openai-speech", "/audio/speech", &request)
            .await?;
        let bytes = response
            .bytes()
            .await
            .map_err(|e| CapabilityError::Http {
                service: "openai-speech",
                source: e,
            })?;
        Ok(SpeechClip {
            bytes: bytes.to_vec(),
            duration_secs: estimate_duration_secs(text),
            extension: "mp3",
        })
    }
}

/// Narrates the slides of a finished presentation.
pub struct Narrator {
    db: Database,
    speech: Arc<dyn SpeechCapability>,
    storage: FileStorage,
}

impl Narrator {
    pub fn new(db: Database, speech: Arc<dyn SpeechCapability>, storage: FileStorage) -> Self {
        Self { db, speech, storage }
    }

    /// Synthesizes one audio file per slide and records it.
    ///
    /// Slides whose text is too short, or whose synthesis fails, are skipped.
    /// Returns the recorded rows in slide order.
    #[instrument(skip(self), fields(voice = voice.as_str()))]
    pub async fn narrate(
        &self,
        presentation_id: &str,
        voice: Voice,
    ) -> Result<Vec<AudioRow>, GenerationError> {
        if presentation_repo::find_by_id(&self.db, presentation_id)?.is_none() {
            return Err(GenerationError::NotFound(presentation_id.to_string()));
        }

        let relative_dir = format!("audio/{}", presentation_id);
        for slide in slide_repo::list_for(&self.db, presentation_id)? {
            let bullets = match serde_json::from_str::<SlideContent>(&slide.content_json) {
                Ok(content) => content.bullet_points,
                Err(e) => {
                    warn!(slide = slide.slide_number, error = %e, "Unreadable slide content");
                    Vec::new()
                }
            };
            let text = prepare_slide_text(
                slide.slide_number,
                &slide.title,
                &bullets,
                slide.speaker_notes.as_deref(),
            );
            if text.trim().len() < MIN_NARRATION_CHARS {
                continue;
            }

            let clip = match self.speech.synthesize(&text, voice).await {
                Ok(clip) => clip,
                Err(e) => {
                    warn!(slide = slide.slide_number, error = %e, "Speech synthesis failed");
                    continue;
                }
            };

            let path = self.storage.store(
                &clip.bytes,
                &relative_dir,
                &format!("slide_{:02}_{}", slide.slide_number, voice.as_str()),
                clip.extension,
            )?;
            audio_repo::insert(
                &self.db,
                presentation_id,
                slide.slide_number,
                voice.as_str(),
                &path.to_string_lossy(),
                clip.duration_secs,
                clip.bytes.len() as i64,
            )?;
        }

        let rows = audio_repo::list_for(&self.db, presentation_id)?;
        info!(clips = rows.len(), "Narration finished");
        Ok(rows)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prepare_slide_text_joins_parts() {
        let text = prepare_slide_text(
            2,
            "Why AI matters",
            &["Better ROI".to_string(), "  ".to_string()],
            Some("Talk about the UX..."),
        );
        assert_eq!(
            text,
            "Slide 2: Why Artificial Intelligence matters. Better Return on Investment. \
             Talk about the User Experience."
        );
    }

    #[test]
    fn test_clean_for_speech_ensures_period() {
        assert_eq!(clean_for_speech("Hello"), "Hello.");
        assert_eq!(clean_for_speech("Done."), "Done.");
    }

    #[test]
    fn test_abbreviations_need_word_boundaries() {
        assert_eq!(clean_for_speech("MAIL is not AI."), "MAIL is not Artificial Intelligence.");
    }

    #[test]
    fn test_voice_mapping() {
        assert_eq!(Voice::parse("male_voice"), Some(Voice::Male));
        assert_eq!(Voice::Female.openai_voice(), "nova");
        assert_eq!(Voice::Male.openai_voice(), "onyx");
        assert!(Voice::parse("robot").is_none());
    }

    fn db_with_slides() -> Database {
        use crate::db::slide_repo::NewSlide;

        let db = Database::open_in_memory().unwrap();
        db.with_conn(|conn| {
            conn.execute(
                "INSERT INTO presentations (id, title, original_prompt, slide_count, created_at, updated_at)
                 VALUES ('p', 'Solar', 'Solar', 2, 'x', 'x')",
                [],
            )?;
            Ok(())
        })
        .unwrap();
        db.with_tx(|tx| {
            slide_repo::insert_on(
                tx,
                &NewSlide {
                    presentation_id: "p",
                    slide_number: 1,
                    title: "Solar basics",
                    slide_type: "title",
                    content_json: r#"{"title": "Solar basics", "bullet_points": ["Panels convert light"]}"#,
                    speaker_notes: Some("Open with the KPI"),
                    image_urls: "[]",
                },
            )?;
            // nothing to say: skipped
            slide_repo::insert_on(
                tx,
                &NewSlide {
                    presentation_id: "p",
                    slide_number: 2,
                    title: "",
                    slide_type: "image",
                    content_json: r#"{"title": ""}"#,
                    speaker_notes: None,
                    image_urls: "[]",
                },
            )?;
            Ok(())
        })
        .unwrap();
        db
    }

    #[tokio::test]
    async fn test_narrate_stores_one_clip_per_speakable_slide() {
        use crate::capabilities::mock::MockSpeech;

        let dir = tempfile::tempdir().unwrap();
        let db = db_with_slides();
        let narrator = Narrator::new(
            db.clone(),
            Arc::new(MockSpeech::ok()),
            FileStorage::new(dir.path()),
        );

        let rows = narrator.narrate("p", Voice::Female).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].slide_number, 1);
        assert_eq!(rows[0].voice_type, "female_voice");
        assert!(rows[0].audio_path.ends_with("slide_01_female_voice.mp3"));

        let spoken = std::fs::read_to_string(&rows[0].audio_path).unwrap();
        assert_eq!(
            spoken,
            "Slide 1: Solar basics. Panels convert light. Open with the Key Performance Indicator."
        );
        assert_eq!(rows[0].file_size, spoken.len() as i64);
        assert!(rows[0].duration_secs > 0.0);
    }

    #[tokio::test]
    async fn test_narrate_skips_failed_synthesis_and_unknown_job() {
        use crate::capabilities::mock::MockSpeech;

        let dir = tempfile::tempdir().unwrap();
        let narrator = Narrator::new(
            db_with_slides(),
            Arc::new(MockSpeech::failing()),
            FileStorage::new(dir.path()),
        );
        assert!(narrator.narrate("p", Voice::Male).await.unwrap().is_empty());
        assert!(matches!(
            narrator.narrate("missing", Voice::Male).await,
            Err(GenerationError::NotFound(_))
        ));
    }

    #[test]
    fn test_duration_estimate() {
        let text = vec!["word"; 150].join(" ");
        assert!((estimate_duration_secs(&text) - 60.0).abs() < 1e-9);
    }
}
