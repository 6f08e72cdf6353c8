//! Data types for documents, chunks, index entries, and search results.

use std::collections::{BTreeMap, HashMap};

use serde::{Deserialize, Serialize};

/// Metadata key holding the originating file identifier.
pub const SOURCE_KEY: &str = "source";

/// Metadata key holding a chunk's position within its document.
pub const CHUNK_INDEX_KEY: &str = "chunk_index";

/// Typed document metadata: a required `source` plus open extension fields.
///
/// Serializes as a flat map, so `{"source": "a.pdf", "page": "3"}`
/// round-trips through [`Metadata::extra`].
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct Metadata {
    /// The originating file name.
    pub source: String,
    /// Optional fields such as `page`.
    #[serde(flatten)]
    pub extra: BTreeMap<String, String>,
}

impl Metadata {
    /// Create metadata for the given source with no extra fields.
    pub fn new(source: impl Into<String>) -> Self {
        Self { source: source.into(), extra: BTreeMap::new() }
    }

    /// Add an extension field.
    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.extra.insert(key.into(), value.into());
        self
    }

    /// Flatten into the untyped payload map stored alongside an index entry.
    pub fn to_map(&self) -> HashMap<String, String> {
        let mut map: HashMap<String, String> =
            self.extra.iter().map(|(k, v)| (k.clone(), v.clone())).collect();
        map.insert(SOURCE_KEY.to_string(), self.source.clone());
        map
    }
}

/// A raw source unit, typically one page of a file.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Document {
    /// The text content of the document.
    pub content: String,
    /// Metadata stamped by the loader.
    pub metadata: Metadata,
}

impl Document {
    /// Create a document with the given content and metadata.
    pub fn new(content: impl Into<String>, metadata: Metadata) -> Self {
        Self { content: content.into(), metadata }
    }
}

/// A bounded-size slice of a [`Document`]'s content.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Chunk {
    /// The chunk text, at most `chunk_size` code points long.
    pub text: String,
    /// Metadata copied unchanged from the parent document.
    pub metadata: Metadata,
    /// Position of this chunk within its parent document.
    pub index: usize,
}

/// A persisted (embedding, text, metadata) tuple inside the vector index.
///
/// The payload metadata is an untyped map: entries written by other tools
/// or older versions may lack a `source` key.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct IndexEntry {
    /// Unique identifier for the entry.
    pub id: String,
    /// The chunk text.
    pub text: String,
    /// The vector embedding of `text`.
    pub embedding: Vec<f32>,
    /// Key-value payload metadata.
    #[serde(default)]
    pub metadata: HashMap<String, String>,
}

impl IndexEntry {
    /// Build an entry from a chunk and its embedding.
    pub fn from_chunk(chunk: &Chunk, embedding: Vec<f32>) -> Self {
        let mut metadata = chunk.metadata.to_map();
        metadata.insert(CHUNK_INDEX_KEY.to_string(), chunk.index.to_string());
        Self { id: uuid::Uuid::new_v4().to_string(), text: chunk.text.clone(), embedding, metadata }
    }

    /// The `source` payload value, if present.
    pub fn source(&self) -> Option<&str> {
        self.metadata.get(SOURCE_KEY).map(String::as_str)
    }
}

/// A retrieved [`IndexEntry`] paired with a relevance score.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SearchResult {
    /// The retrieved entry.
    pub entry: IndexEntry,
    /// The similarity score (higher is more relevant).
    pub score: f32,
}

/// The ranked top-K results for one question, best first.
pub type RetrievedSet = Vec<SearchResult>;
