//! In-memory embedding index.
//!
//! The index is built once from a passage list and is read-only afterwards, so
//! it can be shared behind an `Arc` by concurrent requests without locking.

mod index;
mod search;

pub use index::{EmbeddingIndex, IndexedPassage};
pub use search::cosine_similarity;
