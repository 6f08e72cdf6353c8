//! Ingestion and query orchestration.
//!
//! [`IngestionPipeline`] runs chunk → embed → append for batches of
//! documents. [`RagPipeline`] runs retrieve → assemble → prompt → generate →
//! format for one question.
//!
//! # Example
//!
//! ```rust,ignore
//! use docqa_rag::{RagPipeline, RagConfig, InMemoryVectorStore};
//!
//! let pipeline = Arc::new(
//!     RagPipeline::builder()
//!         .config(RagConfig::default())
//!         .embedding_provider(Arc::new(my_embedder))
//!         .vector_store(Arc::new(InMemoryVectorStore::new()))
//!         .generator(Arc::new(my_generator))
//!         .build()?,
//! );
//!
//! let result = pipeline.answer("What is the capital of Francia?").await?;
//! ```

use std::path::Path;
use std::sync::Arc;

use tracing::{error, info, warn};

use crate::answer::{AnswerResult, format_answer};
use crate::chunking::{Chunker, RecursiveChunker};
use crate::config::{RagConfig, Settings};
use crate::context::assemble_context;
use crate::document::{Document, IndexEntry, RetrievedSet};
use crate::embedding::EmbeddingProvider;
use crate::error::{RagError, Result};
use crate::generation::Generator;
use crate::loader::DocumentLoader;
use crate::local::LocalVectorStore;
use crate::openai::{OpenAIChatGenerator, OpenAIConfig, OpenAIEmbeddingProvider};
use crate::prompt::PromptBuilder;
use crate::retriever::Retriever;
use crate::vectorstore::VectorStore;

/// The query pipeline.
///
/// Built once at startup and shared as `Arc<RagPipeline>`; it holds no
/// per-request state, so concurrent calls to [`answer`](Self::answer) never
/// wait on each other. Construct one via [`RagPipeline::builder()`].
pub struct RagPipeline {
    config: RagConfig,
    retriever: Retriever,
    prompt_builder: PromptBuilder,
    generator: Arc<dyn Generator>,
}

impl RagPipeline {
    /// Create a new [`RagPipelineBuilder`].
    pub fn builder() -> RagPipelineBuilder {
        RagPipelineBuilder::default()
    }

    /// Wire the OpenAI providers and open the existing on-disk index.
    ///
    /// # Errors
    ///
    /// Fails before any question is served if the credential is unusable or
    /// the index at `settings.vectorstore_dir` cannot be opened.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let openai = openai_config(settings);
        let embedder = OpenAIEmbeddingProvider::new(openai.clone())?
            .with_model(settings.embedding_model_name.as_str());
        let generator = OpenAIChatGenerator::new(openai)?
            .with_model(settings.llm_model_name.as_str())
            .with_temperature(settings.rag.temperature);
        let store =
            LocalVectorStore::open(&settings.vectorstore_dir, &settings.embedding_model_name)
                .await?;

        Self::builder()
            .config(settings.rag.clone())
            .embedding_provider(Arc::new(embedder))
            .vector_store(Arc::new(store))
            .generator(Arc::new(generator))
            .build()
    }

    /// Return a reference to the pipeline configuration.
    pub fn config(&self) -> &RagConfig {
        &self.config
    }

    /// Embed the question and fetch the top-K entries.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingService`] or [`RagError::Index`].
    pub async fn retrieve(&self, question: &str) -> Result<RetrievedSet> {
        self.retriever.retrieve(question).await
    }

    /// Answer a question from the indexed corpus.
    ///
    /// A retrieval of zero entries is not an error: the generator receives
    /// an empty context and is instructed to refuse.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::EmbeddingService`], [`RagError::Index`], or
    /// [`RagError::Generation`]. No fallback answer is ever fabricated.
    pub async fn answer(&self, question: &str) -> Result<AnswerResult> {
        let retrieved = self.retriever.retrieve(question).await?;
        let context = assemble_context(&retrieved);
        let prompt = self.prompt_builder.build(question, &context);

        let raw_answer = self.generator.generate(&prompt).await.inspect_err(|e| {
            error!(model = self.generator.model(), error = %e, "generation failed");
        })?;

        let result = format_answer(raw_answer, &retrieved);
        info!(
            retrieved = retrieved.len(),
            sources = result.sources.len(),
            "answered question"
        );
        Ok(result)
    }
}

fn openai_config(settings: &Settings) -> OpenAIConfig {
    OpenAIConfig::new(settings.openai_api_key.as_str())
        .with_base_url(settings.openai_base_url.as_str())
        .with_timeout(settings.request_timeout)
}

/// Builder for constructing a [`RagPipeline`].
///
/// `config`, `embedding_provider`, `vector_store`, and `generator` are
/// required; `prompt_builder` defaults to [`PromptBuilder::new()`].
#[derive(Default)]
pub struct RagPipelineBuilder {
    config: Option<RagConfig>,
    embedding_provider: Option<Arc<dyn EmbeddingProvider>>,
    vector_store: Option<Arc<dyn VectorStore>>,
    generator: Option<Arc<dyn Generator>>,
    prompt_builder: Option<PromptBuilder>,
}

impl RagPipelineBuilder {
    /// Set the pipeline configuration.
    pub fn config(mut self, config: RagConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding provider.
    pub fn embedding_provider(mut self, provider: Arc<dyn EmbeddingProvider>) -> Self {
        self.embedding_provider = Some(provider);
        self
    }

    /// Set the vector store backend.
    pub fn vector_store(mut self, store: Arc<dyn VectorStore>) -> Self {
        self.vector_store = Some(store);
        self
    }

    /// Set the language model.
    pub fn generator(mut self, generator: Arc<dyn Generator>) -> Self {
        self.generator = Some(generator);
        self
    }

    /// Replace the default grounding prompt.
    pub fn prompt_builder(mut self, prompt_builder: PromptBuilder) -> Self {
        self.prompt_builder = Some(prompt_builder);
        self
    }

    /// Build the [`RagPipeline`], validating that all required fields are set.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] if any required field is missing.
    pub fn build(self) -> Result<RagPipeline> {
        let config =
            self.config.ok_or_else(|| RagError::Config("config is required".to_string()))?;
        let embedding_provider = self
            .embedding_provider
            .ok_or_else(|| RagError::Config("embedding_provider is required".to_string()))?;
        let vector_store = self
            .vector_store
            .ok_or_else(|| RagError::Config("vector_store is required".to_string()))?;
        let generator =
            self.generator.ok_or_else(|| RagError::Config("generator is required".to_string()))?;

        Ok(RagPipeline {
            retriever: Retriever::new(embedding_provider, vector_store, config.top_k),
            config,
            prompt_builder: self.prompt_builder.unwrap_or_default(),
            generator,
        })
    }
}

/// A source that could not be ingested.
#[derive(Debug)]
pub struct IngestFailure {
    /// The `source` of the affected documents, or the failing path.
    pub source: String,
    /// Why it failed.
    pub error: RagError,
}

/// Counts and failures from one ingestion run.
#[derive(Debug, Default)]
pub struct IngestReport {
    /// Documents handed to the pipeline.
    pub documents_loaded: usize,
    /// Chunks produced by the chunker.
    pub chunks_created: usize,
    /// Entries appended to the index.
    pub entries_written: usize,
    /// Sources skipped because of load or embedding errors.
    pub failures: Vec<IngestFailure>,
}

/// The batch ingestion pipeline: chunk → embed → append.
pub struct IngestionPipeline {
    chunker: Arc<dyn Chunker>,
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
}

impl IngestionPipeline {
    /// Create an ingestion pipeline from its three stages.
    pub fn new(
        chunker: Arc<dyn Chunker>,
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
    ) -> Self {
        Self { chunker, embedding_provider, vector_store }
    }

    /// Wire the recursive chunker, the OpenAI embedder, and the on-disk
    /// index at `settings.vectorstore_dir`, creating the index if needed.
    /// Vector length is taken from the embedding server, so models outside
    /// OpenAI's own catalogue work too.
    ///
    /// # Errors
    ///
    /// Returns an error if the credential is unusable, the embedding server
    /// is unreachable, or the index cannot be created or belongs to a
    /// different embedding model.
    pub async fn from_settings(settings: &Settings) -> Result<Self> {
        let chunker = RecursiveChunker::from_config(&settings.rag)?;
        let embedder = OpenAIEmbeddingProvider::new(openai_config(settings))?
            .with_model(settings.embedding_model_name.as_str())
            .detect_dimensions()
            .await?;
        let store = LocalVectorStore::create_or_open(
            &settings.vectorstore_dir,
            embedder.model(),
            embedder.dimensions(),
        )
        .await?;

        Ok(Self::new(Arc::new(chunker), Arc::new(embedder), Arc::new(store)))
    }

    /// Load every supported file in `dir` and ingest the result.
    ///
    /// Unreadable files are recorded in the report alongside embedding
    /// failures.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Load`] if `dir` itself is unusable, or the first
    /// index write failure.
    pub async fn ingest_directory(
        &self,
        loader: &DocumentLoader,
        dir: &Path,
    ) -> Result<IngestReport> {
        let load = {
            let loader = loader.clone();
            let owned_dir = dir.to_path_buf();
            tokio::task::spawn_blocking(move || loader.load_directory(&owned_dir))
                .await
                .map_err(|e| RagError::load(dir, format!("loader task failed: {e}")))??
        };

        let mut report = self.ingest(&load.documents).await?;
        report.failures.extend(load.failures.into_iter().map(|error| IngestFailure {
            source: match &error {
                RagError::Load { path, .. } => path.display().to_string(),
                other => other.to_string(),
            },
            error,
        }));
        Ok(report)
    }

    /// Ingest documents, one source at a time.
    ///
    /// An embedding failure skips that source and is recorded in the
    /// report. An index write failure stops the run; entries already
    /// appended stay in the index.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Index`] (or whatever the store reports) on the
    /// first failed write.
    pub async fn ingest(&self, documents: &[Document]) -> Result<IngestReport> {
        let mut report = IngestReport { documents_loaded: documents.len(), ..Default::default() };

        for (source, group) in group_by_source(documents) {
            let chunks = self.chunker.split(group);
            report.chunks_created += chunks.len();
            if chunks.is_empty() {
                info!(source, chunk_count = 0, "ingested source (empty)");
                continue;
            }

            let texts: Vec<&str> = chunks.iter().map(|c| c.text.as_str()).collect();
            let embeddings = match self.embedding_provider.embed_batch(&texts).await {
                Ok(embeddings) if embeddings.len() == chunks.len() => embeddings,
                Ok(embeddings) => {
                    let error = RagError::EmbeddingService {
                        provider: self.embedding_provider.model().to_string(),
                        message: format!(
                            "expected {} embeddings, got {}",
                            chunks.len(),
                            embeddings.len()
                        ),
                    };
                    warn!(source, error = %error, "skipping source");
                    report.failures.push(IngestFailure { source: source.to_string(), error });
                    continue;
                }
                Err(error) => {
                    warn!(source, error = %error, "embedding failed, skipping source");
                    report.failures.push(IngestFailure { source: source.to_string(), error });
                    continue;
                }
            };

            let entries: Vec<IndexEntry> = chunks
                .iter()
                .zip(embeddings)
                .map(|(chunk, embedding)| IndexEntry::from_chunk(chunk, embedding))
                .collect();
            let count = entries.len();

            self.vector_store.add(entries).await.inspect_err(|e| {
                error!(source, error = %e, "index write failed, aborting ingestion");
            })?;

            report.entries_written += count;
            info!(source, chunk_count = count, "ingested source");
        }

        Ok(report)
    }
}

/// Split documents into runs sharing a `source`, keeping first-seen order.
fn group_by_source(documents: &[Document]) -> Vec<(&str, &[Document])> {
    let mut groups: Vec<(&str, &[Document])> = Vec::new();
    let mut start = 0;

    for i in 1..=documents.len() {
        let boundary = i == documents.len()
            || documents[i].metadata.source != documents[start].metadata.source;
        if boundary {
            groups.push((documents[start].metadata.source.as_str(), &documents[start..i]));
            start = i;
        }
    }

    groups
}
