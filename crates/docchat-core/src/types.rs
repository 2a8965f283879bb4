//! Domain types shared by the loader, the index and the answer pipeline.

use serde::{Deserialize, Serialize};

pub type PassageId = String;

/// A source file loaded from the data directory.
///
/// `id` is the path relative to the data directory with `/` separators,
/// e.g. `notes/team.txt`. Documents are never mutated after loading.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    pub content: String,
}

impl Document {
    pub fn new(id: impl Into<String>, content: impl Into<String>) -> Self {
        Self { id: id.into(), content: content.into() }
    }
}

/// A contiguous slice of a document that is embedded and retrieved on its own.
///
/// - `id`: `<doc_id>:<chunk_index>`
/// - `doc_id`: identifier of the originating [`Document`]
/// - `offset`: start position within the document, in characters
/// - `chunk_index`/`total_chunks`: position within the parent document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Passage {
    pub id: PassageId,
    pub doc_id: String,
    pub content: String,
    pub offset: usize,
    pub chunk_index: usize,
    pub total_chunks: usize,
}

impl Passage {
    /// Length in characters, the unit the chunker measures in.
    pub fn char_len(&self) -> usize {
        self.content.chars().count()
    }
}

/// A retrieved passage with its similarity to the query. Higher is better.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoredPassage {
    pub passage: Passage,
    pub score: f32,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    User,
}

/// One turn of a chat completion request.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self { role: Role::System, content: content.into() }
    }

    pub fn user(content: impl Into<String>) -> Self {
        Self { role: Role::User, content: content.into() }
    }
}
