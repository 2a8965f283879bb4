use std::sync::Arc;
use std::time::Instant;

use docchat_core::traits::Embedder;
use docchat_core::types::Passage;
use docchat_core::{Error, Result};
use tracing::{debug, info};

#[derive(Debug, Clone)]
pub struct IndexedPassage {
    pub passage: Passage,
    pub vector: Vec<f32>,
}

pub struct EmbeddingIndex {
    pub(crate) embedder: Arc<dyn Embedder>,
    pub(crate) entries: Vec<IndexedPassage>,
    pub(crate) dim: Option<usize>,
}

impl std::fmt::Debug for EmbeddingIndex {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EmbeddingIndex")
            .field("embedder", &self.embedder.embedder_id())
            .field("entries", &self.entries.len())
            .field("dim", &self.dim)
            .finish()
    }
}

impl EmbeddingIndex {
    pub async fn build(passages: Vec<Passage>, embedder: Arc<dyn Embedder>, batch_size: usize) -> Result<Self> {
        Self::build_with_progress(passages, embedder, batch_size, |_, _| {}).await
    }

    /// Embed every passage in batches of `batch_size`, calling `on_progress(done, total)`
    /// after each batch. Any failed batch fails the whole build.
    pub async fn build_with_progress<F>(
        passages: Vec<Passage>,
        embedder: Arc<dyn Embedder>,
        batch_size: usize,
        mut on_progress: F,
    ) -> Result<Self>
    where
        F: FnMut(usize, usize),
    {
        if batch_size == 0 {
            return Err(Error::InvalidConfig("embed batch size must be at least 1".into()));
        }
        let started = Instant::now();
        let total = passages.len();
        let mut entries = Vec::with_capacity(total);
        let mut dim: Option<usize> = None;

        for batch in passages.chunks(batch_size) {
            let texts: Vec<String> = batch.iter().map(|p| p.content.clone()).collect();
            let vectors = embedder.embed_batch(&texts).await?;
            if vectors.len() != batch.len() {
                return Err(Error::EmbeddingService(format!(
                    "embedder returned {} vectors for {} passages",
                    vectors.len(),
                    batch.len()
                )));
            }
            for (passage, vector) in batch.iter().zip(vectors) {
                let expected = *dim.get_or_insert(vector.len());
                if vector.len() != expected || expected == 0 {
                    return Err(Error::EmbeddingService(format!(
                        "inconsistent embedding dimension for {}: expected {}, got {}",
                        passage.id,
                        expected,
                        vector.len()
                    )));
                }
                if vector.iter().any(|x| !x.is_finite()) {
                    return Err(Error::EmbeddingService(format!("non-finite embedding value for {}", passage.id)));
                }
                entries.push(IndexedPassage { passage: passage.clone(), vector });
            }
            debug!(done = entries.len(), total, "embedded batch");
            on_progress(entries.len(), total);
        }

        info!(
            passages = entries.len(),
            dim = dim.unwrap_or(0),
            embedder = embedder.embedder_id(),
            elapsed_ms = started.elapsed().as_millis() as u64,
            "embedding index built"
        );
        Ok(Self { embedder, entries, dim })
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Vector dimensionality; `None` for an empty index.
    pub fn dim(&self) -> Option<usize> {
        self.dim
    }

    pub fn entries(&self) -> &[IndexedPassage] {
        &self.entries
    }

    pub fn embedder_id(&self) -> &str {
        self.embedder.embedder_id()
    }
}
