use std::path::PathBuf;

use serde::{Deserialize, Serialize};

use crate::research::DEFAULT_USER_AGENT;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: String,
    /// Base for the default database and output locations. `~/.deckgen`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data_directory: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub database_path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub output_directory: Option<String>,
    #[serde(default)]
    pub completion: CompletionConfig,
    #[serde(default)]
    pub research: ResearchConfig,
    #[serde(default)]
    pub images: ImagesConfig,
    #[serde(default)]
    pub translation: TranslationConfig,
    #[serde(default)]
    pub speech: SpeechConfig,
    #[serde(default)]
    pub generation: GenerationConfig,
}

fn default_version() -> String {
    "1.0".to_string()
}

impl Default for Config {
    fn default() -> Self {
        Self {
            version: default_version(),
            data_directory: None,
            database_path: None,
            output_directory: None,
            completion: CompletionConfig::default(),
            research: ResearchConfig::default(),
            images: ImagesConfig::default(),
            translation: TranslationConfig::default(),
            speech: SpeechConfig::default(),
            generation: GenerationConfig::default(),
        }
    }
}

impl Config {
    pub fn data_dir(&self) -> PathBuf {
        match &self.data_directory {
            Some(dir) => PathBuf::from(crate::secrets::expand_home(dir)),
            None => dirs::home_dir()
                .map(|h| h.join(".deckgen"))
                .unwrap_or_else(|| PathBuf::from(".deckgen")),
        }
    }

    pub fn database_file(&self) -> PathBuf {
        match &self.database_path {
            Some(path) => PathBuf::from(crate::secrets::expand_home(path)),
            None => self.data_dir().join("data").join("deckgen.db"),
        }
    }

    pub fn output_dir(&self) -> PathBuf {
        match &self.output_directory {
            Some(dir) => PathBuf::from(crate::secrets::expand_home(dir)),
            None => self.data_dir().join("presentations"),
        }
    }
}

/// OpenAI-compatible chat completion backend.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CompletionConfig {
    #[serde(default = "default_api_base")]
    pub api_base: String,
    /// Name of the environment variable holding the API key.
    #[serde(default = "default_api_key_env")]
    pub api_key_env: Option<String>,
    #[serde(default = "default_completion_model")]
    pub model: String,
    #[serde(default = "default_completion_timeout")]
    pub timeout_secs: u64,
}

fn default_api_base() -> String {
    crate::openai::DEFAULT_OPENAI_URL.to_string()
}

fn default_api_key_env() -> Option<String> {
    Some("OPENAI_API_KEY".to_string())
}

fn default_completion_model() -> String {
    "gpt-4".to_string()
}

fn default_completion_timeout() -> u64 {
    60
}

impl Default for CompletionConfig {
    fn default() -> Self {
        Self {
            api_base: default_api_base(),
            api_key_env: default_api_key_env(),
            model: default_completion_model(),
            timeout_secs: default_completion_timeout(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResearchConfig {
    #[serde(default = "default_sources")]
    pub sources: Vec<String>,
    #[serde(default = "default_max_results")]
    pub max_results: usize,
    /// Delay between two source requests.
    #[serde(default = "default_rate_limit_ms")]
    pub rate_limit_ms: u64,
    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_web_ttl")]
    pub cache_ttl_hours: i64,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

fn default_sources() -> Vec<String> {
    vec![
        "wikipedia".to_string(),
        "arxiv".to_string(),
        "duckduckgo".to_string(),
    ]
}

fn default_max_results() -> usize {
    10
}

fn default_rate_limit_ms() -> u64 {
    1000
}

fn default_request_timeout() -> u64 {
    10
}

fn default_web_ttl() -> i64 {
    24
}

fn default_user_agent() -> String {
    DEFAULT_USER_AGENT.to_string()
}

impl Default for ResearchConfig {
    fn default() -> Self {
        Self {
            sources: default_sources(),
            max_results: default_max_results(),
            rate_limit_ms: default_rate_limit_ms(),
            request_timeout_secs: default_request_timeout(),
            cache_ttl_hours: default_web_ttl(),
            user_agent: default_user_agent(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImagesConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
    #[serde(default = "default_web_ttl")]
    pub cache_ttl_hours: i64,
}

fn default_true() -> bool {
    true
}

impl Default for ImagesConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            cache_ttl_hours: default_web_ttl(),
        }
    }
}

/// LibreTranslate-compatible endpoint. Translation is unavailable without one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TranslationConfig {
    #[serde(default)]
    pub endpoint: Option<String>,
    #[serde(default)]
    pub api_key_env: Option<String>,
    #[serde(default = "default_translation_ttl")]
    pub cache_ttl_hours: i64,
}

fn default_translation_ttl() -> i64 {
    168
}

impl Default for TranslationConfig {
    fn default() -> Self {
        Self {
            endpoint: None,
            api_key_env: None,
            cache_ttl_hours: default_translation_ttl(),
        }
    }
}

/// Speech synthesis; shares the completion endpoint and key.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SpeechConfig {
    #[serde(default = "default_speech_model")]
    pub model: String,
}

fn default_speech_model() -> String {
    "tts-1".to_string()
}

impl Default for SpeechConfig {
    fn default() -> Self {
        Self {
            model: default_speech_model(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GenerationConfig {
    /// Registry entries older than this are cancelled by a stale sweep.
    #[serde(default = "default_stale_after_hours")]
    pub stale_after_hours: i64,
    #[serde(default = "default_recent_log_limit")]
    pub recent_log_limit: u32,
    #[serde(default = "default_max_slides")]
    pub max_slides: u32,
}

fn default_stale_after_hours() -> i64 {
    2
}

fn default_recent_log_limit() -> u32 {
    10
}

fn default_max_slides() -> u32 {
    50
}

impl Default for GenerationConfig {
    fn default() -> Self {
        Self {
            stale_after_hours: default_stale_after_hours(),
            recent_log_limit: default_recent_log_limit(),
            max_slides: default_max_slides(),
        }
    }
}
