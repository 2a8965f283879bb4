//! Answer synthesis: turns a question plus context into one chat completion.

use std::sync::Arc;

use docchat_core::traits::Generator;
use docchat_core::types::{ChatMessage, ScoredPassage};
use docchat_core::{Error, Result};
use tracing::debug;

pub mod generator;

pub use generator::RemoteGenerator;

const GROUNDED_INSTRUCTION: &str = "You are a helpful assistant answering questions about a small document collection. \
Answer using only the context below. If the context does not contain the answer, say that you don't know.";

const UNGROUNDED_INSTRUCTION: &str = "You are a helpful assistant. No reference material is available for this question. \
Answer from general knowledge if you can, and state clearly that the answer is not based on the provided documents.";

/// Material the answer must be grounded in.
#[derive(Debug, Clone, Copy)]
pub enum AnswerContext<'a> {
    /// Passages retrieved from the index, best first.
    Passages(&'a [ScoredPassage]),
    /// Full document text, used when no index is available.
    Fallback(&'a str),
}

impl AnswerContext<'_> {
    pub fn is_empty(&self) -> bool {
        match self {
            Self::Passages(p) => p.is_empty(),
            Self::Fallback(text) => text.trim().is_empty(),
        }
    }

    pub fn render(&self) -> String {
        match self {
            Self::Passages(passages) => passages
                .iter()
                .map(|p| format!("[{}#{}]\n{}", p.passage.doc_id, p.passage.chunk_index, p.passage.content))
                .collect::<Vec<_>>()
                .join("\n\n"),
            Self::Fallback(text) => text.to_string(),
        }
    }
}

/// Build the system + user turns sent to the generator.
pub fn build_messages(question: &str, context: AnswerContext<'_>) -> Vec<ChatMessage> {
    let system = if context.is_empty() {
        UNGROUNDED_INSTRUCTION.to_string()
    } else {
        format!("{GROUNDED_INSTRUCTION}\n\nContext:\n{}", context.render())
    };
    vec![ChatMessage::system(system), ChatMessage::user(question)]
}

#[derive(Clone)]
pub struct Synthesizer {
    generator: Arc<dyn Generator>,
}

impl Synthesizer {
    pub fn new(generator: Arc<dyn Generator>) -> Self {
        Self { generator }
    }

    pub fn generator_id(&self) -> &str {
        self.generator.generator_id()
    }

    pub async fn synthesize(&self, question: &str, context: AnswerContext<'_>) -> Result<String> {
        let messages = build_messages(question, context);
        debug!(
            generator = self.generator.generator_id(),
            system_chars = messages[0].content.len(),
            grounded = !context.is_empty(),
            "synthesizing answer"
        );
        let answer = self.generator.complete(&messages).await?;
        let answer = answer.trim();
        if answer.is_empty() {
            return Err(Error::Generation("generator returned an empty answer".into()));
        }
        Ok(answer.to_string())
    }
}
