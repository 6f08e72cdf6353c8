//! Language model trait used for grounded answering.

use async_trait::async_trait;

use crate::error::Result;

/// A single-shot text generator.
///
/// One prompt in, one completion out: no conversation state, no tools, no
/// streaming. Failures surface as [`RagError::Generation`](crate::RagError::Generation)
/// and are never retried by the generator.
#[async_trait]
pub trait Generator: Send + Sync {
    /// Generate a completion for `prompt`.
    async fn generate(&self, prompt: &str) -> Result<String>;

    /// Return the model identifier.
    fn model(&self) -> &str;
}
