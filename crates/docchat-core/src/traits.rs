use futures::future::BoxFuture;

use crate::error::Result;
use crate::types::ChatMessage;

/// Text → vector capability backing the embedding index.
///
/// Implementations must return exactly one vector per input, in input order,
/// and the same dimensionality for every call.
pub trait Embedder: Send + Sync {
    /// Stable identifier for the provider/model (e.g. `remote:text-embedding-3-small`).
    fn embedder_id(&self) -> &str;
    /// Compute embeddings for a batch of input texts.
    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>>;
}

/// Chat completion capability used by the answer synthesizer.
pub trait Generator: Send + Sync {
    fn generator_id(&self) -> &str;
    fn complete<'a>(&'a self, messages: &'a [ChatMessage]) -> BoxFuture<'a, Result<String>>;
}
