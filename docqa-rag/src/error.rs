//! Error types for the `docqa-rag` crate.

use std::path::PathBuf;

use thiserror::Error;

/// Errors that can occur in ingestion or query operations.
#[derive(Debug, Error)]
pub enum RagError {
    /// A source document could not be read or parsed.
    #[error("Load error ({}): {message}", path.display())]
    Load {
        /// The file or directory that failed to load.
        path: PathBuf,
        /// A description of the failure.
        message: String,
    },

    /// The embedding provider was unreachable or rejected the request.
    #[error("Embedding service error ({provider}): {message}")]
    EmbeddingService {
        /// The embedding provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// The vector index could not be read or written.
    #[error("Index error: {message}")]
    Index {
        /// A description of the failure.
        message: String,
    },

    /// The language model was unreachable, rejected the request, or
    /// returned a malformed response.
    #[error("Generation error ({provider}): {message}")]
    Generation {
        /// The generation provider that produced the error.
        provider: String,
        /// A description of the failure.
        message: String,
    },

    /// An error occurred during document chunking.
    #[error("Chunking error: {0}")]
    Chunking(String),

    /// A configuration validation error.
    #[error("Configuration error: {0}")]
    Config(String),
}

impl RagError {
    pub(crate) fn load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::Load { path: path.into(), message: message.into() }
    }

    pub(crate) fn index(message: impl Into<String>) -> Self {
        Self::Index { message: message.into() }
    }
}

/// A convenience result type for RAG operations.
pub type Result<T> = std::result::Result<T, RagError>;
