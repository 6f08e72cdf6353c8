//! Document chunking.
//!
//! [`RecursiveChunker`] cuts text at the most natural boundary that fits:
//! paragraphs, then lines, then sentences, then words, and finally a hard
//! character cut. Lengths are counted in Unicode code points, never bytes.
//!
//! Consecutive chunks of a document share exactly `chunk_overlap` code
//! points: chunk `i + 1` starts `chunk_overlap` code points before chunk `i`
//! ends.

use crate::config::RagConfig;
use crate::document::{Chunk, Document};
use crate::error::{RagError, Result};

/// Separators tried in priority order. Each stays attached to the text before it.
const SEPARATORS: &[&str] = &["\n\n", "\n", ". ", "! ", "? ", " "];

/// A strategy for splitting documents into chunks.
///
/// Implementations must be deterministic: the same document and parameters
/// always yield the same chunk sequence.
pub trait Chunker: Send + Sync {
    /// Split a document into chunks.
    ///
    /// Returns an empty `Vec` if the document has no non-whitespace content.
    fn chunk(&self, document: &Document) -> Vec<Chunk>;

    /// Split every document, preserving document order.
    fn split(&self, documents: &[Document]) -> Vec<Chunk> {
        documents.iter().flat_map(|document| self.chunk(document)).collect()
    }
}

/// Splits text hierarchically at natural boundaries with a fixed overlap.
///
/// # Example
///
/// ```rust,ignore
/// use docqa_rag::RecursiveChunker;
///
/// let chunker = RecursiveChunker::new(1000, 200)?;
/// let chunks = chunker.split(&documents);
/// ```
#[derive(Debug, Clone)]
pub struct RecursiveChunker {
    chunk_size: usize,
    chunk_overlap: usize,
}

impl RecursiveChunker {
    /// Create a new `RecursiveChunker`.
    ///
    /// # Arguments
    ///
    /// * `chunk_size`: maximum number of code points per chunk
    /// * `chunk_overlap`: number of code points shared by consecutive chunks
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Chunking`] unless `chunk_overlap < chunk_size`.
    pub fn new(chunk_size: usize, chunk_overlap: usize) -> Result<Self> {
        if chunk_overlap >= chunk_size {
            return Err(RagError::Chunking(format!(
                "chunk_overlap ({chunk_overlap}) must be less than chunk_size ({chunk_size})"
            )));
        }
        Ok(Self { chunk_size, chunk_overlap })
    }

    /// Create a chunker from a validated [`RagConfig`].
    pub fn from_config(config: &RagConfig) -> Result<Self> {
        Self::new(config.chunk_size, config.chunk_overlap)
    }

    /// Split raw text into chunk strings.
    pub fn split_text(&self, text: &str) -> Vec<String> {
        if text.trim().is_empty() {
            return Vec::new();
        }

        let chars: Vec<char> = text.chars().collect();
        let mut chunks = Vec::new();
        let mut start = 0;

        loop {
            if chars.len() - start <= self.chunk_size {
                chunks.push(chars[start..].iter().collect());
                break;
            }

            let end = self.find_break(&chars, start);
            chunks.push(chars[start..end].iter().collect());
            start = end - self.chunk_overlap;
        }

        chunks
    }

    /// Pick the end (exclusive) of the chunk beginning at `start`.
    ///
    /// The end lies in `(start + chunk_overlap, start + chunk_size]`, so the
    /// next start always advances.
    fn find_break(&self, chars: &[char], start: usize) -> usize {
        let limit = start + self.chunk_size;
        let floor = start + self.chunk_overlap;

        for separator in SEPARATORS {
            let sep: Vec<char> = separator.chars().collect();
            if let Some(end) = last_separator_end(&chars[..limit], &sep, floor) {
                return end;
            }
        }

        limit
    }
}

/// Return the end index of the last `sep` occurrence in `window` that ends
/// strictly after `floor`.
fn last_separator_end(window: &[char], sep: &[char], floor: usize) -> Option<usize> {
    if sep.len() > window.len() {
        return None;
    }
    (0..=window.len() - sep.len())
        .rev()
        .map(|pos| (pos, pos + sep.len()))
        .take_while(|&(_, end)| end > floor)
        .find(|&(pos, end)| window[pos..end] == *sep)
        .map(|(_, end)| end)
}

impl Chunker for RecursiveChunker {
    fn chunk(&self, document: &Document) -> Vec<Chunk> {
        self.split_text(&document.content)
            .into_iter()
            .enumerate()
            .map(|(index, text)| Chunk { text, metadata: document.metadata.clone(), index })
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::document::Metadata;

    fn char_len(s: &str) -> usize {
        s.chars().count()
    }

    fn suffix(s: &str, n: usize) -> String {
        let chars: Vec<char> = s.chars().collect();
        chars[chars.len() - n..].iter().collect()
    }

    fn prefix(s: &str, n: usize) -> String {
        s.chars().take(n).collect()
    }

    #[test]
    fn rejects_overlap_not_smaller_than_size() {
        assert!(matches!(RecursiveChunker::new(10, 10), Err(RagError::Chunking(_))));
        assert!(RecursiveChunker::new(10, 9).is_ok());
    }

    #[test]
    fn short_text_is_a_single_chunk() {
        let chunker = RecursiveChunker::new(100, 20).unwrap();
        let doc = Document::new("The capital of Francia is Paris.", Metadata::new("geo.pdf"));
        let chunks = chunker.chunk(&doc);
        assert_eq!(chunks.len(), 1);
        assert_eq!(chunks[0].text, "The capital of Francia is Paris.");
        assert_eq!(chunks[0].metadata, doc.metadata);
        assert_eq!(chunks[0].index, 0);
    }

    #[test]
    fn blank_text_yields_no_chunks() {
        let chunker = RecursiveChunker::new(100, 20).unwrap();
        assert!(chunker.split_text("").is_empty());
        assert!(chunker.split_text(" \n\n\t ").is_empty());
    }

    #[test]
    fn prefers_paragraph_boundaries() {
        let chunker = RecursiveChunker::new(40, 5).unwrap();
        let text = "First paragraph is here.\n\nSecond paragraph follows on.";
        let chunks = chunker.split_text(text);
        assert_eq!(chunks[0], "First paragraph is here.\n\n");
        assert!(chunks[1].ends_with("Second paragraph follows on."));
    }

    #[test]
    fn falls_back_to_word_then_hard_cut() {
        let chunker = RecursiveChunker::new(10, 2).unwrap();

        let words = chunker.split_text("alpha beta gamma delta");
        assert_eq!(words[0], "alpha ");

        let solid = chunker.split_text("abcdefghijklmnopqrstuvwxyz");
        assert_eq!(solid[0], "abcdefghij");
        assert_eq!(solid[1], "ijklmnopqr");
    }

    #[test]
    fn consecutive_chunks_overlap_exactly() {
        let chunker = RecursiveChunker::new(30, 8).unwrap();
        let text = "Rust is fast. Rust is safe. Rust has no garbage collector. \
                    Ownership rules keep memory correct. Borrowing allows sharing.";
        let chunks = chunker.split_text(text);
        assert!(chunks.len() > 2);
        for pair in chunks.windows(2) {
            assert!(char_len(&pair[0]) <= 30);
            assert_eq!(suffix(&pair[0], 8), prefix(&pair[1], 8));
        }
    }

    #[test]
    fn counts_code_points_not_bytes() {
        let chunker = RecursiveChunker::new(4, 1).unwrap();
        let chunks = chunker.split_text("ééééééé");
        assert!(chunks.iter().all(|c| char_len(c) <= 4));
        assert_eq!(chunks[0], "éééé");
    }

    #[test]
    fn indexes_restart_per_document() {
        let chunker = RecursiveChunker::new(10, 2).unwrap();
        let docs = vec![
            Document::new("aaaa bbbb cccc dddd", Metadata::new("a.pdf")),
            Document::new("eeee ffff gggg", Metadata::new("b.pdf")),
        ];
        let chunks = chunker.split(&docs);
        let b_first = chunks.iter().position(|c| c.metadata.source == "b.pdf").unwrap();
        assert_eq!(chunks[b_first].index, 0);
        assert!(chunks[..b_first].iter().all(|c| c.metadata.source == "a.pdf"));
    }
}
