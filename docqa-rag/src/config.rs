//! Configuration for the ingestion and query pipelines.

use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{RagError, Result};

/// Default generator model id.
pub const DEFAULT_LLM_MODEL: &str = "gpt-4.1-mini";

/// Default embedding model id.
pub const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-3-small";

/// Default OpenAI-compatible API base URL.
pub const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";

/// Tunable parameters shared by both pipelines.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct RagConfig {
    /// Maximum chunk size in Unicode code points.
    pub chunk_size: usize,
    /// Number of code points shared by consecutive chunks.
    pub chunk_overlap: usize,
    /// Number of entries returned by retrieval.
    pub top_k: usize,
    /// Sampling temperature for the generator.
    pub temperature: f32,
}

impl Default for RagConfig {
    fn default() -> Self {
        Self { chunk_size: 1000, chunk_overlap: 200, top_k: 4, temperature: 0.1 }
    }
}

impl RagConfig {
    /// Create a new builder for constructing a [`RagConfig`].
    pub fn builder() -> RagConfigBuilder {
        RagConfigBuilder::default()
    }
}

/// Builder for constructing a validated [`RagConfig`].
#[derive(Debug, Clone, Default)]
pub struct RagConfigBuilder {
    config: RagConfig,
}

impl RagConfigBuilder {
    /// Set the maximum chunk size in code points.
    pub fn chunk_size(mut self, size: usize) -> Self {
        self.config.chunk_size = size;
        self
    }

    /// Set the overlap between consecutive chunks in code points.
    pub fn chunk_overlap(mut self, overlap: usize) -> Self {
        self.config.chunk_overlap = overlap;
        self
    }

    /// Set the number of entries to retrieve per question.
    pub fn top_k(mut self, k: usize) -> Self {
        self.config.top_k = k;
        self
    }

    /// Set the generator sampling temperature.
    pub fn temperature(mut self, temperature: f32) -> Self {
        self.config.temperature = temperature;
        self
    }

    /// Build the [`RagConfig`], validating that parameters are consistent.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if:
    /// - `chunk_size == 0`
    /// - `chunk_overlap >= chunk_size`
    /// - `top_k == 0`
    /// - `temperature` is negative or not finite
    pub fn build(self) -> Result<RagConfig> {
        if self.config.chunk_size == 0 {
            return Err(RagError::Config("chunk_size must be greater than zero".to_string()));
        }
        if self.config.chunk_overlap >= self.config.chunk_size {
            return Err(RagError::Config(format!(
                "chunk_overlap ({}) must be less than chunk_size ({})",
                self.config.chunk_overlap, self.config.chunk_size
            )));
        }
        if self.config.top_k == 0 {
            return Err(RagError::Config("top_k must be greater than zero".to_string()));
        }
        if !self.config.temperature.is_finite() || self.config.temperature < 0.0 {
            return Err(RagError::Config(format!(
                "temperature ({}) must be a non-negative number",
                self.config.temperature
            )));
        }
        Ok(self.config)
    }
}

/// Process-wide settings resolved once at startup.
///
/// Construction fails when the provider credential is absent, so a
/// misconfigured deployment stops before serving its first question.
#[derive(Clone)]
pub struct Settings {
    /// Provider API key.
    pub openai_api_key: String,
    /// Provider API base URL.
    pub openai_base_url: String,
    /// Generator model id.
    pub llm_model_name: String,
    /// Embedding model id.
    pub embedding_model_name: String,
    /// Directory scanned by ingestion.
    pub data_dir: PathBuf,
    /// Directory holding the durable vector index.
    pub vectorstore_dir: PathBuf,
    /// Deadline applied to each provider request.
    pub request_timeout: Duration,
    /// Pipeline parameters.
    pub rag: RagConfig,
}

impl std::fmt::Debug for Settings {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Settings")
            .field("openai_api_key", &"<redacted>")
            .field("openai_base_url", &self.openai_base_url)
            .field("llm_model_name", &self.llm_model_name)
            .field("embedding_model_name", &self.embedding_model_name)
            .field("data_dir", &self.data_dir)
            .field("vectorstore_dir", &self.vectorstore_dir)
            .field("request_timeout", &self.request_timeout)
            .field("rag", &self.rag)
            .finish()
    }
}

impl Settings {
    /// Load settings from the process environment, reading `.env` first if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Resolve settings through an arbitrary key lookup.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if `OPENAI_API_KEY` is missing or empty,
    /// if a numeric variable does not parse, or if the resulting
    /// [`RagConfig`] is invalid.
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|value| !value.trim().is_empty());

        let openai_api_key = get("OPENAI_API_KEY")
            .ok_or_else(|| RagError::Config("OPENAI_API_KEY is not set".to_string()))?;

        let defaults = RagConfig::default();
        let rag = RagConfig::builder()
            .chunk_size(parse_or(&get, "CHUNK_SIZE", defaults.chunk_size)?)
            .chunk_overlap(parse_or(&get, "CHUNK_OVERLAP", defaults.chunk_overlap)?)
            .top_k(parse_or(&get, "RETRIEVAL_TOP_K", defaults.top_k)?)
            .temperature(parse_or(&get, "LLM_TEMPERATURE", defaults.temperature)?)
            .build()?;

        Ok(Self {
            openai_api_key,
            openai_base_url: get("OPENAI_BASE_URL")
                .unwrap_or_else(|| DEFAULT_OPENAI_BASE_URL.to_string()),
            llm_model_name: get("LLM_MODEL_NAME").unwrap_or_else(|| DEFAULT_LLM_MODEL.to_string()),
            embedding_model_name: get("EMBEDDING_MODEL_NAME")
                .unwrap_or_else(|| DEFAULT_EMBEDDING_MODEL.to_string()),
            data_dir: get("DATA_DIR").map(PathBuf::from).unwrap_or_else(|| PathBuf::from("data")),
            vectorstore_dir: get("VECTORSTORE_DIR")
                .map(PathBuf::from)
                .unwrap_or_else(|| PathBuf::from("storage/vector_index")),
            request_timeout: Duration::from_secs(parse_or(&get, "REQUEST_TIMEOUT_SECS", 60)?),
            rag,
        })
    }
}

fn parse_or<T, F>(get: &F, key: &str, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    F: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|e| RagError::Config(format!("{key} has invalid value '{raw}': {e}"))),
        None => Ok(default),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> =
            pairs.iter().map(|(k, v)| (k.to_string(), v.to_string())).collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_reference_deployment() {
        let settings =
            Settings::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-test")])).unwrap();
        assert_eq!(settings.llm_model_name, "gpt-4.1-mini");
        assert_eq!(settings.embedding_model_name, "text-embedding-3-small");
        assert_eq!(settings.data_dir, PathBuf::from("data"));
        assert_eq!(settings.vectorstore_dir, PathBuf::from("storage/vector_index"));
        assert_eq!(settings.rag, RagConfig::default());
        assert_eq!(settings.rag.top_k, 4);
        assert_eq!(settings.request_timeout, Duration::from_secs(60));
    }

    #[test]
    fn missing_credential_fails_fast() {
        let err = Settings::from_lookup(lookup_from(&[("LLM_MODEL_NAME", "gpt-x")])).unwrap_err();
        assert!(matches!(err, RagError::Config(ref msg) if msg.contains("OPENAI_API_KEY")));
    }

    #[test]
    fn blank_credential_is_treated_as_missing() {
        let err = Settings::from_lookup(lookup_from(&[("OPENAI_API_KEY", "   ")])).unwrap_err();
        assert!(matches!(err, RagError::Config(_)));
    }

    #[test]
    fn overrides_are_applied() {
        let settings = Settings::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("LLM_MODEL_NAME", "gpt-4o"),
            ("EMBEDDING_MODEL_NAME", "text-embedding-3-large"),
            ("DATA_DIR", "/srv/docs"),
            ("VECTORSTORE_DIR", "/srv/index"),
            ("RETRIEVAL_TOP_K", "8"),
            ("CHUNK_SIZE", "500"),
            ("CHUNK_OVERLAP", "50"),
            ("LLM_TEMPERATURE", "0"),
        ]))
        .unwrap();
        assert_eq!(settings.llm_model_name, "gpt-4o");
        assert_eq!(settings.embedding_model_name, "text-embedding-3-large");
        assert_eq!(settings.data_dir, PathBuf::from("/srv/docs"));
        assert_eq!(settings.vectorstore_dir, PathBuf::from("/srv/index"));
        assert_eq!(settings.rag.top_k, 8);
        assert_eq!(settings.rag.chunk_size, 500);
        assert_eq!(settings.rag.chunk_overlap, 50);
        assert_eq!(settings.rag.temperature, 0.0);
    }

    #[test]
    fn unparsable_number_is_a_config_error() {
        let err = Settings::from_lookup(lookup_from(&[
            ("OPENAI_API_KEY", "sk-test"),
            ("RETRIEVAL_TOP_K", "four"),
        ]))
        .unwrap_err();
        assert!(matches!(err, RagError::Config(ref msg) if msg.contains("RETRIEVAL_TOP_K")));
    }

    #[test]
    fn debug_output_redacts_credential() {
        let settings =
            Settings::from_lookup(lookup_from(&[("OPENAI_API_KEY", "sk-secret")])).unwrap();
        assert!(!format!("{settings:?}").contains("sk-secret"));
    }

    #[test]
    fn builder_rejects_inconsistent_parameters() {
        assert!(RagConfig::builder().chunk_size(100).chunk_overlap(100).build().is_err());
        assert!(RagConfig::builder().chunk_size(0).chunk_overlap(0).build().is_err());
        assert!(RagConfig::builder().top_k(0).build().is_err());
        assert!(RagConfig::builder().temperature(-0.5).build().is_err());
        assert!(RagConfig::builder().chunk_size(100).chunk_overlap(10).top_k(2).build().is_ok());
    }
}
