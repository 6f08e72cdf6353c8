//! OpenAI chat-completions generator.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error};

use super::{OpenAIConfig, PROVIDER, error_detail};
use crate::config::DEFAULT_LLM_MODEL;
use crate::error::{RagError, Result};
use crate::generation::Generator;

/// A [`Generator`] backed by `POST {base}/chat/completions`.
///
/// The prompt is sent as a single user message with no streaming.
pub struct OpenAIChatGenerator {
    client: reqwest::Client,
    config: OpenAIConfig,
    model: String,
    temperature: f32,
}

impl OpenAIChatGenerator {
    /// Create a generator for the default model at temperature 0.1.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Generation`] if the API key is empty or the HTTP
    /// client cannot be built.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(Self::generation_error("API key must not be empty"));
        }

        let client = config
            .http_client()
            .map_err(|e| Self::generation_error(format!("failed to build HTTP client: {e}")))?;

        Ok(Self { client, config, model: DEFAULT_LLM_MODEL.into(), temperature: 0.1 })
    }

    /// Set the model name.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }

    /// Set the sampling temperature.
    pub fn with_temperature(mut self, temperature: f32) -> Self {
        self.temperature = temperature;
        self
    }

    fn generation_error(message: impl Into<String>) -> RagError {
        RagError::Generation { provider: PROVIDER.into(), message: message.into() }
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    temperature: f32,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatResponseMessage,
}

#[derive(Deserialize)]
struct ChatResponseMessage {
    content: Option<String>,
}

#[async_trait]
impl Generator for OpenAIChatGenerator {
    async fn generate(&self, prompt: &str) -> Result<String> {
        debug!(provider = PROVIDER, model = %self.model, prompt_len = prompt.len(), "generating");

        let request_body = ChatRequest {
            model: &self.model,
            messages: [ChatMessage { role: "user", content: prompt }],
            temperature: self.temperature,
        };

        let response = self
            .client
            .post(self.config.endpoint("chat/completions"))
            .bearer_auth(&self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "chat request failed");
                Self::generation_error(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let detail = error_detail(response).await;
            error!(provider = PROVIDER, %detail, "chat API error");
            return Err(Self::generation_error(detail));
        }

        let parsed: ChatResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse chat response");
            Self::generation_error(format!("failed to parse response: {e}"))
        })?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| Self::generation_error("response contained no message content"))
    }

    fn model(&self) -> &str {
        &self.model
    }
}
