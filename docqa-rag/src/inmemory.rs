//! In-memory vector store using cosine similarity.
//!
//! [`InMemoryVectorStore`] keeps entries in a `Vec` behind a
//! `tokio::sync::RwLock`. It is suitable for tests and ephemeral use; see
//! [`LocalVectorStore`](crate::LocalVectorStore) for a durable index.

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::document::{IndexEntry, SearchResult};
use crate::error::Result;
use crate::vectorstore::{VectorStore, rank};

/// An in-memory, append-only vector store.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::{InMemoryVectorStore, VectorStore};
///
/// let store = InMemoryVectorStore::new();
/// store.add(entries).await?;
/// ```
#[derive(Debug, Default)]
pub struct InMemoryVectorStore {
    entries: RwLock<Vec<IndexEntry>>,
}

impl InMemoryVectorStore {
    /// Create a new empty in-memory vector store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a store pre-populated with entries.
    pub fn with_entries(entries: Vec<IndexEntry>) -> Self {
        Self { entries: RwLock::new(entries) }
    }
}

#[async_trait]
impl VectorStore for InMemoryVectorStore {
    async fn add(&self, entries: Vec<IndexEntry>) -> Result<()> {
        self.entries.write().await.extend(entries);
        Ok(())
    }

    async fn search(&self, embedding: &[f32], top_k: usize) -> Result<Vec<SearchResult>> {
        let entries = self.entries.read().await;
        Ok(rank(&entries, embedding, top_k))
    }

    async fn len(&self) -> Result<usize> {
        Ok(self.entries.read().await.len())
    }
}
