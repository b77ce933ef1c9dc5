//! Presentation translation over a pluggable translation backend.

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, instrument, warn};

use crate::cache::{CacheNamespace, CacheStore};
use crate::capabilities::{CapabilityError, TranslationCapability};
use crate::db::{presentation_repo, slide_repo, Database};
use crate::model::SlideContent;
use crate::orchestrator::GenerationError;

/// Supported language codes and display names.
pub const SUPPORTED_LANGUAGES: &[(&str, &str)] = &[
    ("en", "English"),
    ("es", "Spanish"),
    ("fr", "French"),
    ("de", "German"),
    ("it", "Italian"),
    ("pt", "Portuguese"),
    ("ru", "Russian"),
    ("ja", "Japanese"),
    ("ko", "Korean"),
    ("zh", "Chinese (Simplified)"),
    ("ar", "Arabic"),
    ("hi", "Hindi"),
];

/// Source language assumed for generated content.
const SOURCE_LANGUAGE: &str = "en";

pub fn is_supported(code: &str) -> bool {
    SUPPORTED_LANGUAGES.iter().any(|(c, _)| *c == code)
}

/// Display and layout hints for a language.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LanguageInfo {
    pub code: String,
    pub name: String,
    pub rtl: bool,
    pub font_adjustment: f64,
}

pub fn language_info(code: &str) -> LanguageInfo {
    let name = SUPPORTED_LANGUAGES
        .iter()
        .find(|(c, _)| *c == code)
        .map(|(_, n)| *n)
        .unwrap_or("Unknown");
    let (rtl, font_adjustment) = match code {
        "ar" => (true, 1.2),
        "zh" | "ja" | "ko" | "hi" => (false, 1.1),
        "ru" => (false, 1.05),
        _ => (false, 1.0),
    };
    LanguageInfo {
        code: code.to_string(),
        name: name.to_string(),
        rtl,
        font_adjustment,
    }
}

const STOP_WORDS: &[(&str, &[&str])] = &[
    (
        "es",
        &[
            "el", "la", "de", "que", "y", "en", "un", "es", "se", "no", "te", "lo", "le", "da",
            "su", "por", "son", "con", "para", "una", "del", "los", "las",
        ],
    ),
    (
        "fr",
        &[
            "le", "de", "et", "à", "un", "il", "être", "en", "avoir", "que", "pour", "dans", "ce",
            "son", "une", "sur", "avec", "ne", "se", "pas", "tout", "plus", "par",
        ],
    ),
    (
        "de",
        &[
            "der", "die", "und", "in", "den", "von", "zu", "das", "mit", "sich", "des", "auf",
            "für", "ist", "im", "dem", "nicht", "ein", "eine", "als", "auch", "es", "an",
            "werden",
        ],
    ),
    (
        "it",
        &[
            "il", "di", "che", "e", "la", "per", "un", "in", "con", "del", "da", "a", "al", "le",
            "si", "dei", "come", "io", "questo", "qui", "tutto", "ancora", "suo", "della",
        ],
    ),
];

/// Guesses the language of `text` from stop-word frequency.
///
/// Returns the best-scoring candidate when more than 10% of the words are
/// its stop words, otherwise `en`.
pub fn detect_language(text: &str) -> &'static str {
    let lower = text.to_lowercase();
    let words: Vec<&str> = lower.split_whitespace().collect();
    if words.is_empty() {
        return SOURCE_LANGUAGE;
    }

    let mut best = (SOURCE_LANGUAGE, 0.0_f64);
    for (lang, indicators) in STOP_WORDS {
        let hits = words.iter().filter(|w| indicators.contains(w)).count();
        let score = hits as f64 / words.len() as f64;
        if score > best.1 {
            best = (lang, score);
        }
    }
    if best.1 > 0.1 {
        best.0
    } else {
        SOURCE_LANGUAGE
    }
}

#[derive(Debug, Serialize)]
struct LibreTranslateRequest<'a> {
    q: &'a str,
    source: &'a str,
    target: &'a str,
    format: &'a str,
    #[serde(skip_serializing_if = "Option::is_none")]
    api_key: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
struct LibreTranslateResponse {
    #[serde(rename = "translatedText")]
    translated_text: String,
}

/// Translation backend over a LibreTranslate-compatible HTTP API.
pub struct LibreTranslate {
    client: Client,
    endpoint: String,
    api_key: Option<SecretString>,
}

impl LibreTranslate {
    pub fn new(
        endpoint: impl Into<String>,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, CapabilityError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| CapabilityError::Http {
                service: "libretranslate",
                source: e,
            })?;
        Ok(Self {
            client,
            endpoint: endpoint.into(),
            api_key,
        })
    }

    async fn request(&self, text: &str, target: &str) -> Result<String, CapabilityError> {
        let url = format!("{}/translate", self.endpoint.trim_end_matches('/'));
        let body = LibreTranslateRequest {
            q: text,
            source: SOURCE_LANGUAGE,
            target,
            format: "text",
            api_key: self.api_key.as_ref().map(|k| k.expose_secret()),
        };
        let response = self
            .client
            .post(&url)
            .json(&body)
            .send()
            .await
            .map_err(|e| CapabilityError::Http {
                service: "libretranslate",
                source: e,
            })?;
        if !response.status().is_success() {
            return Err(CapabilityError::Status {
                service: "libretranslate",
                status: response.status().as_u16(),
                message: response.text().await.unwrap_or_default(),
            });
        }
        let parsed: LibreTranslateResponse =
            response
                .json()
                .await
                .map_err(|e| CapabilityError::Malformed {
                    service: "libretranslate",
                    message: e.to_string(),
                })?;
        Ok(parsed.translated_text)
    }
}

#[async_trait]
impl TranslationCapability for LibreTranslate {
    async fn translate(&self, text: &str, target_lang: &str) -> Option<String> {
        match self.request(text, target_lang).await {
            Ok(translated) if !translated.trim().is_empty() => Some(translated),
            Ok(_) => None,
            Err(e) => {
                warn!(target_lang, error = %e, "Translation request failed");
                None
            }
        }
    }
}

/// Cached translation payload.
#[derive(Debug, Serialize, Deserialize)]
struct CachedTranslation {
    original_text: String,
    translation: String,
    source_language: String,
    target_language: String,
}

/// Outcome of translating a presentation.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TranslationSummary {
    pub language: String,
    pub slides: usize,
    /// Texts that kept their original wording.
    pub untranslated: usize,
}

/// Translates presentations in place, caching every translated text.
pub struct Translator {
    db: Database,
    cache: CacheStore,
    backend: Arc<dyn TranslationCapability>,
    cache_ttl: chrono::Duration,
}

impl Translator {
    pub fn new(
        db: Database,
        backend: Arc<dyn TranslationCapability>,
        cache_ttl: chrono::Duration,
    ) -> Self {
        Self {
            cache: CacheStore::new(db.clone()),
            db,
            backend,
            cache_ttl,
        }
    }

    /// Translates one text. Blank text is returned unchanged.
    pub async fn translate_text(&self, text: &str, target_lang: &str) -> Option<String> {
        if text.trim().is_empty() {
            return Some(text.to_string());
        }

        let key = format!("{}:{}:{}", SOURCE_LANGUAGE, target_lang, text);
        match self.cache.get::<CachedTranslation>(CacheNamespace::Translation, &key) {
            Ok(Some(hit)) => return Some(hit.translation),
            Ok(None) => {}
            Err(e) => warn!(error = %e, "Translation cache read failed"),
        }

        let translated = self.backend.translate(text, target_lang).await?;
        let entry = CachedTranslation {
            original_text: text.to_string(),
            translation: translated.clone(),
            source_language: SOURCE_LANGUAGE.to_string(),
            target_language: target_lang.to_string(),
        };
        if let Err(e) = self.cache.put(
            CacheNamespace::Translation,
            &key,
            &entry,
            self.cache_ttl,
        ) {
            warn!(error = %e, "Translation cache write failed");
        }
        Some(translated)
    }

    /// Translates title, slide titles, bullets and speaker notes, and records
    /// the new language. Slide numbering is never changed.
    #[instrument(skip(self))]
    pub async fn translate_presentation(
        &self,
        presentation_id: &str,
        target_lang: &str,
    ) -> Result<TranslationSummary, GenerationError> {
        if !is_supported(target_lang) {
            return Err(GenerationError::UnsupportedLanguage(target_lang.to_string()));
        }
        let presentation = presentation_repo::find_by_id(&self.db, presentation_id)?
            .ok_or_else(|| GenerationError::NotFound(presentation_id.to_string()))?;

        let mut untranslated = 0usize;
        let mut translate = |original: String, result: Option<String>| match result {
            Some(t) => t,
            None => {
                untranslated += 1;
                original
            }
        };

        let title = self.translate_text(&presentation.title, target_lang).await;
        let title = translate(presentation.title.clone(), title);

        let slides = slide_repo::list_for(&self.db, presentation_id)?;
        let mut updates = Vec::with_capacity(slides.len());
        for slide in &slides {
            let slide_title = self.translate_text(&slide.title, target_lang).await;
            let slide_title = translate(slide.title.clone(), slide_title);

            let content_json = match serde_json::from_str::<SlideContent>(&slide.content_json) {
                Ok(mut content) => {
                    let mut bullets = Vec::with_capacity(content.bullet_points.len());
                    for point in &content.bullet_points {
                        let t = self.translate_text(point, target_lang).await;
                        bullets.push(translate(point.clone(), t));
                    }
                    content.title = slide_title.clone();
                    content.bullet_points = bullets;
                    serde_json::to_string(&content)?
                }
                Err(e) => {
                    warn!(slide = slide.slide_number, error = %e, "Keeping unreadable slide content");
                    slide.content_json.clone()
                }
            };

            let notes = match slide.speaker_notes.as_deref() {
                Some(n) if !n.trim().is_empty() => {
                    let t = self.translate_text(n, target_lang).await;
                    Some(translate(n.to_string(), t))
                }
                other => other.map(str::to_string),
            };
            updates.push((slide.id, slide_title, content_json, notes));
        }

        self.db.with_tx(|tx| {
            presentation_repo::set_title_on(tx, presentation_id, &title)?;
            for (id, slide_title, content_json, notes) in &updates {
                slide_repo::update_text_on(tx, *id, slide_title, content_json, notes.as_deref())?;
            }
            presentation_repo::set_language_on(tx, presentation_id, target_lang)?;
            Ok(())
        })?;

        debug!(untranslated, "Translation pass finished");
        info!(slides = slides.len(), "Presentation translated");
        Ok(TranslationSummary {
            language: target_lang.to_string(),
            slides: slides.len(),
            untranslated,
        })
    }
}
