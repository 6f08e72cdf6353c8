//! OpenAI embedding provider using the `/embeddings` endpoint.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, error, info};

use super::{OpenAIConfig, PROVIDER, error_detail};
use crate::config::DEFAULT_EMBEDDING_MODEL;
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};

/// The default dimensionality for `text-embedding-3-small`.
const DEFAULT_DIMENSIONS: usize = 1536;

/// Inputs sent per HTTP request when embedding a large batch.
const DEFAULT_MAX_BATCH_SIZE: usize = 256;

/// An [`EmbeddingProvider`] backed by `POST {base}/embeddings`.
///
/// Large batches are split into requests of at most `max_batch_size`
/// inputs (256 by default). The API may return vectors out of order; each
/// response is re-sorted by its `index` field before being handed back, so
/// output `i` always belongs to input `i`.
///
/// ```rust,ignore
/// use docqa_rag::openai::{OpenAIConfig, OpenAIEmbeddingProvider};
///
/// let provider = OpenAIEmbeddingProvider::new(OpenAIConfig::new(api_key))?
///     .with_model("text-embedding-3-large");
/// let vectors = provider.embed_batch(&chunk_texts).await?;
/// ```
pub struct OpenAIEmbeddingProvider {
    client: reqwest::Client,
    config: OpenAIConfig,
    model: String,
    dimensions: usize,
    /// Sent as `dimensions` when the caller asked for truncated vectors.
    request_dimensions: Option<usize>,
    max_batch_size: usize,
}

impl OpenAIEmbeddingProvider {
    /// Create a new provider with the default model and dimensions.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingService`] if the API key is empty or the
    /// HTTP client cannot be built.
    pub fn new(config: OpenAIConfig) -> Result<Self> {
        if config.api_key.trim().is_empty() {
            return Err(RagError::EmbeddingService {
                provider: PROVIDER.into(),
                message: "API key must not be empty".into(),
            });
        }

        let client = config.http_client().map_err(|e| RagError::EmbeddingService {
            provider: PROVIDER.into(),
            message: format!("failed to build HTTP client: {e}"),
        })?;

        Ok(Self {
            client,
            config,
            model: DEFAULT_EMBEDDING_MODEL.into(),
            dimensions: DEFAULT_DIMENSIONS,
            request_dimensions: None,
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
        })
    }

    /// Set the model name (e.g. `text-embedding-3-large`).
    ///
    /// `text-embedding-3-large` defaults to 3072 dimensions; other models
    /// keep 1536 unless [`with_dimensions`](Self::with_dimensions) is used.
    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        if self.request_dimensions.is_none() {
            self.dimensions = if self.model == "text-embedding-3-large" { 3072 } else { 1536 };
        }
        self
    }

    /// Request truncated vectors of `dims` components.
    pub fn with_dimensions(mut self, dims: usize) -> Self {
        self.dimensions = dims;
        self.request_dimensions = Some(dims);
        self
    }

    /// Ask the server how long its vectors are by embedding a short string.
    ///
    /// The built-in table only knows OpenAI's own models; an
    /// OpenAI-compatible server may serve anything. Skipped when
    /// [`with_dimensions`](Self::with_dimensions) fixed the length.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingService`] if the request fails or the
    /// server returns an empty vector.
    pub async fn detect_dimensions(mut self) -> Result<Self> {
        if self.request_dimensions.is_some() {
            return Ok(self);
        }

        let detected = self
            .embed_request(&["dimension check"])
            .await?
            .into_iter()
            .next()
            .map(|v| v.len())
            .unwrap_or_default();
        if detected == 0 {
            return Err(Self::service_error(format!(
                "model '{}' returned an empty embedding",
                self.model
            )));
        }

        if detected != self.dimensions {
            info!(
                provider = PROVIDER,
                model = %self.model,
                assumed = self.dimensions,
                detected,
                "using server-reported embedding dimensions"
            );
            self.dimensions = detected;
        }
        Ok(self)
    }

    /// Set the maximum number of inputs sent in one request.
    pub fn with_max_batch_size(mut self, size: usize) -> Self {
        self.max_batch_size = size.max(1);
        self
    }

    fn service_error(message: impl Into<String>) -> RagError {
        RagError::EmbeddingService { provider: PROVIDER.into(), message: message.into() }
    }

    async fn embed_request(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let request_body = EmbeddingRequest {
            model: &self.model,
            input: texts,
            dimensions: self.request_dimensions,
        };

        let response = self
            .client
            .post(self.config.endpoint("embeddings"))
            .bearer_auth(&self.config.api_key)
            .json(&request_body)
            .send()
            .await
            .map_err(|e| {
                error!(provider = PROVIDER, error = %e, "embedding request failed");
                Self::service_error(format!("request failed: {e}"))
            })?;

        if !response.status().is_success() {
            let detail = error_detail(response).await;
            error!(provider = PROVIDER, %detail, "embedding API error");
            return Err(Self::service_error(detail));
        }

        let mut parsed: EmbeddingResponse = response.json().await.map_err(|e| {
            error!(provider = PROVIDER, error = %e, "failed to parse embedding response");
            Self::service_error(format!("failed to parse response: {e}"))
        })?;

        if parsed.data.len() != texts.len() {
            return Err(Self::service_error(format!(
                "expected {} embeddings, got {}",
                texts.len(),
                parsed.data.len()
            )));
        }

        parsed.data.sort_by_key(|d| d.index);
        Ok(parsed.data.into_iter().map(|d| d.embedding).collect())
    }
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [&'a str],
    #[serde(skip_serializing_if = "Option::is_none")]
    dimensions: Option<usize>,
}

#[derive(Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Deserialize)]
struct EmbeddingData {
    #[serde(default)]
    index: usize,
    embedding: Vec<f32>,
}

#[async_trait]
impl EmbeddingProvider for OpenAIEmbeddingProvider {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        debug!(provider = PROVIDER, text_len = text.len(), "embedding single text");

        let results = self.embed_request(&[text]).await?;
        results.into_iter().next().ok_or_else(|| Self::service_error("API returned empty response"))
    }

    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        debug!(
            provider = PROVIDER,
            batch_size = texts.len(),
            model = %self.model,
            "embedding batch"
        );

        let mut embeddings = Vec::with_capacity(texts.len());
        for batch in texts.chunks(self.max_batch_size) {
            embeddings.extend(self.embed_request(batch).await?);
        }
        Ok(embeddings)
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    fn model(&self) -> &str {
        &self.model
    }
}
