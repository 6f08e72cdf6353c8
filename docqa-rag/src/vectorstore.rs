//! Vector store trait for storing and searching vector embeddings.

use std::cmp::Ordering;

use async_trait::async_trait;

use crate::document::{IndexEntry, SearchResult};
use crate::error::Result;

/// An append-only storage backend for embeddings with similarity search.
///
/// Searches may run concurrently with each other. Implementations serialize
/// appends so two writers never interleave partial entries.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.add(entries).await?;
/// let results = store.search(&query_embedding, 4).await?;
/// ```
#[async_trait]
pub trait VectorStore: Send + Sync {
    /// Append entries. Re-adding identical content creates duplicates.
    async fn add(&self, entries: Vec<IndexEntry>) -> Result<()>;

    /// Return the `top_k` most similar entries to `embedding`, best first.
    ///
    /// Returns `min(top_k, len)` results; an under-populated store is not
    /// an error.
    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>>;

    /// Number of stored entries.
    async fn len(&self) -> Result<usize>;

    /// Whether the store holds no entries.
    async fn is_empty(&self) -> Result<bool> {
        Ok(self.len().await? == 0)
    }
}

/// Compute cosine similarity between two vectors.
///
/// Returns 0.0 if either vector has zero magnitude.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let dot: f32 = a.iter().zip(b.iter()).map(|(x, y)| x * y).sum();
    let norm_a: f32 = a.iter().map(|x| x * x).sum::<f32>().sqrt();
    let norm_b: f32 = b.iter().map(|x| x * x).sum::<f32>().sqrt();
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a * norm_b)
}

/// Exact nearest-neighbour ranking over a slice of entries.
///
/// The sort is stable, so equal scores keep insertion order.
pub(crate) fn rank(entries: &[IndexEntry], embedding: &[f32], top_k: usize) -> Vec<SearchResult> {
    let mut scored: Vec<(usize, f32)> = entries
        .iter()
        .enumerate()
        .map(|(i, entry)| (i, cosine_similarity(&entry.embedding, embedding)))
        .collect();

    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(Ordering::Equal));
    scored.truncate(top_k);

    scored
        .into_iter()
        .map(|(i, score)| SearchResult { entry: entries[i].clone(), score })
        .collect()
}
