//! Joins retrieved chunk texts into the prompt context.

use crate::document::SearchResult;

/// Separator placed between consecutive chunk texts.
pub const CONTEXT_SEPARATOR: &str = "\n\n";

/// Concatenate chunk texts in ranked order, separated by a blank line.
///
/// An empty retrieved set yields an empty string.
pub fn assemble_context(retrieved: &[SearchResult]) -> String {
    retrieved.iter().map(|r| r.entry.text.as_str()).collect::<Vec<_>>().join(CONTEXT_SEPARATOR)
}
