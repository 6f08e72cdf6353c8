//! Embedding provider trait for generating vector embeddings from text.

use async_trait::async_trait;

use crate::error::Result;

/// A provider that generates vector embeddings from text input.
///
/// The same provider (same [`model`](EmbeddingProvider::model)) must be used
/// at ingestion and query time, otherwise similarity scores are meaningless.
/// The on-disk index records the model id and refuses to mix models.
///
/// Failures surface as [`RagError::EmbeddingService`](crate::RagError::EmbeddingService)
/// and are never retried by the provider.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::EmbeddingProvider;
///
/// let embedding = provider.embed("hello world").await?;
/// assert_eq!(embedding.len(), provider.dimensions());
/// ```
#[async_trait]
pub trait EmbeddingProvider: Send + Sync {
    /// Generate an embedding vector for a single text input.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embedding vectors for a batch of text inputs.
    ///
    /// The output is 1:1 with the input and in the same order. The default
    /// implementation calls [`embed`](EmbeddingProvider::embed) sequentially.
    async fn embed_batch(&self, texts: &[&str]) -> Result<Vec<Vec<f32>>> {
        let mut results = Vec::with_capacity(texts.len());
        for text in texts {
            results.push(self.embed(text).await?);
        }
        Ok(results)
    }

    /// Return the dimensionality of embeddings produced by this provider.
    fn dimensions(&self) -> usize;

    /// Return the versioned model identifier.
    fn model(&self) -> &str;
}
