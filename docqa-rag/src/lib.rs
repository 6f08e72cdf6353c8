//! Retrieval-augmented question answering over a local document corpus.
//!
//! Two pipelines share one durable vector index:
//!
//! - **Ingestion**: [`DocumentLoader`] → [`RecursiveChunker`] →
//!   [`EmbeddingProvider`] → [`VectorStore::add`], driven by
//!   [`IngestionPipeline`].
//! - **Query**: [`Retriever`] → [`assemble_context`] → [`PromptBuilder`] →
//!   [`Generator`] → [`format_answer`], driven by [`RagPipeline::answer`].
//!
//! External calls (embeddings, generation) are never retried here; callers
//! own retry policy. Answers are grounded: the model is told to reply with
//! [`REFUSAL_PHRASE`] when the retrieved context does not contain the answer.

pub mod answer;
pub mod chunking;
pub mod config;
pub mod context;
pub mod document;
pub mod embedding;
pub mod error;
pub mod generation;
pub mod inmemory;
pub mod loader;
pub mod local;
pub mod openai;
pub mod pipeline;
pub mod prompt;
pub mod retriever;
pub mod vectorstore;

pub use answer::{AnswerResult, QueryRequest, QueryResponse, UNKNOWN_SOURCE, format_answer};
pub use chunking::{Chunker, RecursiveChunker};
pub use config::{RagConfig, RagConfigBuilder, Settings};
pub use context::assemble_context;
pub use document::{Chunk, Document, IndexEntry, Metadata, RetrievedSet, SearchResult};
pub use embedding::EmbeddingProvider;
pub use error::{RagError, Result};
pub use generation::Generator;
pub use inmemory::InMemoryVectorStore;
pub use loader::{DocumentLoader, FileKind, LoadReport};
pub use local::{IndexManifest, LocalVectorStore};
pub use openai::{OpenAIChatGenerator, OpenAIConfig, OpenAIEmbeddingProvider};
pub use pipeline::{IngestFailure, IngestReport, IngestionPipeline, RagPipeline, RagPipelineBuilder};
pub use prompt::{PromptBuilder, REFUSAL_PHRASE};
pub use retriever::Retriever;
pub use vectorstore::{VectorStore, cosine_similarity};
