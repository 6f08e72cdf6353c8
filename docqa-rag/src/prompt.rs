//! Grounding prompt construction.

use crate::error::{RagError, Result};

/// The literal answer the model is instructed to give when the context does
/// not contain the answer.
pub const REFUSAL_PHRASE: &str = "I don't know.";

/// The default grounding template.
pub const DEFAULT_TEMPLATE: &str = "Answer the question ONLY using the context below.
If the answer is not in the context, say \"I don't know.\"

Question:
{question}

Context:
{context}

Answer:";

const QUESTION_SLOT: &str = "{question}";
const CONTEXT_SLOT: &str = "{context}";

#[derive(Debug, Clone, PartialEq)]
enum Segment {
    Literal(String),
    Question,
    Context,
}

/// Renders a fixed template with `{question}` and `{context}` slots.
///
/// Substitution is single-pass: braces inside the question or context are
/// never interpreted as slots.
#[derive(Debug, Clone)]
pub struct PromptBuilder {
    segments: Vec<Segment>,
}

impl Default for PromptBuilder {
    fn default() -> Self {
        Self { segments: parse_template(DEFAULT_TEMPLATE) }
    }
}

impl PromptBuilder {
    /// Create a builder with the default grounding template.
    pub fn new() -> Self {
        Self::default()
    }

    /// Use a custom template.
    ///
    /// # Errors
    ///
    /// Returns [`RagError::Config`] unless the template contains both
    /// `{question}` and `{context}`.
    pub fn with_template(template: &str) -> Result<Self> {
        for slot in [QUESTION_SLOT, CONTEXT_SLOT] {
            if !template.contains(slot) {
                return Err(RagError::Config(format!("prompt template is missing {slot}")));
            }
        }
        Ok(Self { segments: parse_template(template) })
    }

    /// Render the prompt for one question.
    pub fn build(&self, question: &str, context: &str) -> String {
        let mut prompt = String::with_capacity(question.len() + context.len() + 256);
        for segment in &self.segments {
            match segment {
                Segment::Literal(text) => prompt.push_str(text),
                Segment::Question => prompt.push_str(question),
                Segment::Context => prompt.push_str(context),
            }
        }
        prompt
    }
}

fn parse_template(template: &str) -> Vec<Segment> {
    let mut segments = Vec::new();
    let mut rest = template;

    loop {
        let next = [(QUESTION_SLOT, Segment::Question), (CONTEXT_SLOT, Segment::Context)]
            .into_iter()
            .filter_map(|(slot, segment)| rest.find(slot).map(|pos| (pos, slot, segment)))
            .min_by_key(|(pos, _, _)| *pos);

        match next {
            Some((pos, slot, segment)) => {
                if pos > 0 {
                    segments.push(Segment::Literal(rest[..pos].to_string()));
                }
                segments.push(segment);
                rest = &rest[pos + slot.len()..];
            }
            None => {
                if !rest.is_empty() {
                    segments.push(Segment::Literal(rest.to_string()));
                }
                return segments;
            }
        }
    }
}
