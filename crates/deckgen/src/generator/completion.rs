//! Text completion backend over an OpenAI-compatible chat endpoint.

use async_trait::async_trait;
use tracing::debug;

use crate::capabilities::CapabilityError;
use crate::openai::{
    ChatCompletionRequest, ChatCompletionResponse, ChatMessage, OpenAiClient, OpenAiConfig,
};

/// Sampling settings for one completion call.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CompletionParams {
    pub temperature: f32,
    pub max_tokens: u32,
}

/// Raw chat completion: system plus user message in, assistant text out.
#[async_trait]
pub trait CompletionBackend: Send + Sync {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        params: CompletionParams,
    ) -> Result<String, CapabilityError>;
}

pub struct OpenAiCompletion {
    client: OpenAiClient,
}

impl OpenAiCompletion {
    pub fn new(config: OpenAiConfig) -> Result<Self, CapabilityError> {
        Ok(Self {
            client: OpenAiClient::new(config)?,
        })
    }
}

#[async_trait]
impl CompletionBackend for OpenAiCompletion {
    async fn complete(
        &self,
        system: &str,
        user: &str,
        params: CompletionParams,
    ) -> Result<String, CapabilityError> {
        let request = ChatCompletionRequest {
            model: self.client.config().model.clone(),
            messages: vec![ChatMessage::system(system), ChatMessage::user(user)],
            temperature: Some(params.temperature),
            max_tokens: Some(params.max_tokens),
        };
        let response = self
            .client
            .post_json("openai-chat", "/chat/completions", &request)
            .await?;
        let parsed: ChatCompletionResponse =
            response
                .json()
                .await
                .map_err(|e| CapabilityError::Malformed {
                    service: "openai-chat",
                    message: e.to_string(),
                })?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|c| c.message.content)
            .ok_or_else(|| CapabilityError::Malformed {
                service: "openai-chat",
                message: "response has no choices".to_string(),
            })?;
        debug!(chars = content.len(), "Completion received");
        Ok(content)
    }
}
