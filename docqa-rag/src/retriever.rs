//! Question → top-K entries.

use std::sync::Arc;

use tracing::{debug, error};

use crate::document::RetrievedSet;
use crate::embedding::EmbeddingProvider;
use crate::error::Result;
use crate::vectorstore::VectorStore;

/// Embeds a question and returns the `top_k` nearest index entries unchanged.
///
/// There is no re-ranking or score threshold: the ranking is exactly the
/// vector store's.
#[derive(Clone)]
pub struct Retriever {
    embedding_provider: Arc<dyn EmbeddingProvider>,
    vector_store: Arc<dyn VectorStore>,
    top_k: usize,
}

impl Retriever {
    /// Create a retriever over the given provider and store.
    pub fn new(
        embedding_provider: Arc<dyn EmbeddingProvider>,
        vector_store: Arc<dyn VectorStore>,
        top_k: usize,
    ) -> Self {
        Self { embedding_provider, vector_store, top_k }
    }

    /// The configured K.
    pub fn top_k(&self) -> usize {
        self.top_k
    }

    /// Retrieve the ranked entries for `question`.
    ///
    /// # Errors
    ///
    /// Propagates [`RagError::EmbeddingService`](crate::RagError::EmbeddingService)
    /// from the provider and [`RagError::Index`](crate::RagError::Index) from the store.
    pub async fn retrieve(&self, question: &str) -> Result<RetrievedSet> {
        let query_embedding = self.embedding_provider.embed(question).await.inspect_err(|e| {
            error!(error = %e, "embedding failed during retrieval");
        })?;

        let results =
            self.vector_store.search(&query_embedding, self.top_k).await.inspect_err(|e| {
                error!(error = %e, "vector store search failed");
            })?;

        debug!(top_k = self.top_k, result_count = results.len(), "retrieved");
        Ok(results)
    }
}
