//! OpenAI-compatible providers: embeddings and chat completions over `reqwest`.

mod chat;
mod embedding;

pub use chat::OpenAIChatGenerator;
pub use embedding::OpenAIEmbeddingProvider;

use std::time::Duration;

use serde::Deserialize;

use crate::config::DEFAULT_OPENAI_BASE_URL;

/// Provider label used in errors and logs.
pub(crate) const PROVIDER: &str = "OpenAI";

/// Connection settings shared by both OpenAI clients.
#[derive(Clone)]
pub struct OpenAIConfig {
    /// API key sent as a bearer token.
    pub api_key: String,
    /// API base URL, without a trailing slash.
    pub base_url: String,
    /// Deadline for each HTTP request.
    pub timeout: Option<Duration>,
}

impl std::fmt::Debug for OpenAIConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OpenAIConfig")
            .field("api_key", &"<redacted>")
            .field("base_url", &self.base_url)
            .field("timeout", &self.timeout)
            .finish()
    }
}

impl OpenAIConfig {
    /// Create a config for the public OpenAI API.
    pub fn new(api_key: impl Into<String>) -> Self {
        Self { api_key: api_key.into(), base_url: DEFAULT_OPENAI_BASE_URL.into(), timeout: None }
    }

    /// Point the clients at an OpenAI-compatible server.
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Apply a per-request deadline.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub(crate) fn endpoint(&self, path: &str) -> String {
        format!("{}/{path}", self.base_url)
    }

    pub(crate) fn http_client(&self) -> reqwest::Result<reqwest::Client> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = self.timeout {
            builder = builder.timeout(timeout);
        }
        builder.build()
    }
}

#[derive(Deserialize)]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Deserialize)]
struct ErrorDetail {
    message: String,
}

/// Read a failed response body, preferring the API's structured message.
pub(crate) async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    let body = response.text().await.unwrap_or_default();
    let detail =
        serde_json::from_str::<ErrorResponse>(&body).map(|e| e.error.message).unwrap_or(body);
    format!("API returned {status}: {detail}")
}
