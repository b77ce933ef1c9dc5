//! Shared client plumbing for OpenAI-compatible HTTP APIs.

use std::time::Duration;

use reqwest::Client;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};

use crate::capabilities::CapabilityError;

/// Default OpenAI API endpoint.
pub const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";

/// Connection settings for an OpenAI-compatible endpoint.
#[derive(Debug)]
pub struct OpenAiConfig {
    pub base_url: String,
    /// Optional for local endpoints.
    pub api_key: Option<SecretString>,
    pub model: String,
    pub timeout_secs: u64,
}

/// Thin authenticated HTTP client.
pub struct OpenAiClient {
    client: Client,
    config: OpenAiConfig,
}

impl OpenAiClient {
    pub fn new(config: OpenAiConfig) -> Result<Self, CapabilityError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs))
            .build()
            .map_err(|e| CapabilityError::Http {
                service: "openai",
                source: e,
            })?;
        Ok(Self { client, config })
    }

    pub fn config(&self) -> &OpenAiConfig {
        &self.config
    }

    /// Builds a JSON POST with authentication if configured.
    pub fn build_request(&self, endpoint: &str) -> reqwest::RequestBuilder {
        let url = format!("{}{}", self.config.base_url.trim_end_matches('/'), endpoint);
        let mut req = self.client.post(&url);

        if let Some(ref api_key) = self.config.api_key {
            req = req.header(
                "Authorization",
                format!("Bearer {}", api_key.expose_secret()),
            );
        }

        req.header("Content-Type", "application/json")
    }

    /// Sends `body` to `endpoint`, mapping transport and non-success
    /// responses to [`CapabilityError`].
    pub async fn post_json<B: Serialize + ?Sized>(
        &self,
        service: &'static str,
        endpoint: &str,
        body: &B,
    ) -> Result<reqwest::Response, CapabilityError> {
        let response = self
            .build_request(endpoint)
            .json(body)
            .send()
            .await
            .map_err(|e| CapabilityError::Http { service, source: e })?;

        if !response.status().is_success() {
            let status = response.status();
            let body: OpenAiErrorResponse =
                response.json().await.unwrap_or_else(|_| OpenAiErrorResponse {
                    error: OpenAiError {
                        message: "Unknown error".to_string(),
                    },
                });
            return Err(CapabilityError::Status {
                service,
                status: status.as_u16(),
                message: body.error.message,
            });
        }
        Ok(response)
    }
}

/// Request body for the chat completions endpoint.
#[derive(Debug, Serialize)]
pub struct ChatCompletionRequest {
    pub model: String,
    pub messages: Vec<ChatMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub temperature: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub max_tokens: Option<u32>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: String,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: "system".to_string(),
            content: content.into(),
        }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: content.into(),
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChatCompletionResponse {
    pub choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
pub struct ChatChoice {
    pub message: ChatMessage,
}

/// Request body for the speech endpoint.
#[derive(Debug, Serialize)]
pub struct SpeechRequest<'a> {
    pub model: &'a str,
    pub input: &'a str,
    pub voice: &'a str,
    pub response_format: &'a str,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiErrorResponse {
    pub error: OpenAiError,
}

#[derive(Debug, Deserialize)]
pub struct OpenAiError {
    pub message: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_chat_request_serialization_skips_unset_fields() {
        let request = ChatCompletionRequest {
            model: "gpt-4".to_string(),
            messages: vec![ChatMessage::system("s"), ChatMessage::user("u")],
            temperature: Some(0.3),
            max_tokens: None,
        };
        let json = serde_json::to_value(&request).unwrap();
        assert_eq!(json["messages"][1]["role"], "user");
        assert!(json.get("max_tokens").is_none());
    }

    #[test]
    fn test_error_response_parsing() {
        let body = r#"{"error": {"message": "Invalid key", "type": "auth", "code": null}}"#;
        let parsed: OpenAiErrorResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.error.message, "Invalid key");
    }

    #[test]
    fn test_completion_response_parsing() {
        let body = r#"{"id": "x", "choices": [{"index": 0, "message": {"role": "assistant", "content": "{}"}}]}"#;
        let parsed: ChatCompletionResponse = serde_json::from_str(body).unwrap();
        assert_eq!(parsed.choices[0].message.content, "{}");
    }
}
