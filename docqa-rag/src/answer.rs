//! Answer and request/response types.

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};

use crate::document::SearchResult;

/// Source label used when an entry carries no `source` metadata.
pub const UNKNOWN_SOURCE: &str = "unknown";

/// A generated answer with the deduplicated sources it was grounded on.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct AnswerResult {
    /// The raw model answer.
    pub answer: String,
    /// Distinct `source` values of the retrieved entries.
    pub sources: BTreeSet<String>,
}

/// Pair a raw answer with the distinct sources of the retrieved set.
///
/// Entries without a `source` contribute [`UNKNOWN_SOURCE`].
pub fn format_answer(raw_answer: impl Into<String>, retrieved: &[SearchResult]) -> AnswerResult {
    let sources = retrieved
        .iter()
        .map(|r| r.entry.source().unwrap_or(UNKNOWN_SOURCE).to_string())
        .collect();
    AnswerResult { answer: raw_answer.into(), sources }
}

/// Query entrypoint input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryRequest {
    /// The user's question.
    pub question: String,
}

/// Query entrypoint output.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct QueryResponse {
    /// The generated answer.
    pub answer: String,
    /// Distinct sources, sorted.
    pub sources: Vec<String>,
}

impl From<AnswerResult> for QueryResponse {
    fn from(result: AnswerResult) -> Self {
        Self { answer: result.answer, sources: result.sources.into_iter().collect() }
    }
}
