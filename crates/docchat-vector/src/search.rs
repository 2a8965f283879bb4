use docchat_core::types::ScoredPassage;
use docchat_core::{Error, Result};
use tracing::debug;

use crate::index::EmbeddingIndex;

/// Cosine similarity in `[-1, 1]`; 0 when either vector has zero norm.
/// Accumulates in f64 so finite inputs near `f32::MAX` cannot overflow.
pub fn cosine_similarity(a: &[f32], b: &[f32]) -> f32 {
    let (mut dot, mut na, mut nb) = (0f64, 0f64, 0f64);
    for (&x, &y) in a.iter().zip(b) {
        let (x, y) = (f64::from(x), f64::from(y));
        dot += x * y;
        na += x * x;
        nb += y * y;
    }
    if na == 0.0 || nb == 0.0 {
        return 0.0;
    }
    (dot / (na.sqrt() * nb.sqrt())) as f32
}

impl EmbeddingIndex {
    /// Top-`k` passages by cosine similarity to `text`, best first.
    /// Equal scores keep insertion order.
    pub async fn query(&self, text: &str, k: usize) -> Result<Vec<ScoredPassage>> {
        if k == 0 {
            return Err(Error::RequestValidation("k must be at least 1".into()));
        }
        if self.entries.is_empty() {
            return Ok(Vec::new());
        }

        let query = [text.to_string()];
        let query_vec = self
            .embedder
            .embed_batch(&query)
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| Error::EmbeddingService("embedder returned no vector for the query".into()))?;
        if Some(query_vec.len()) != self.dim {
            return Err(Error::EmbeddingService(format!(
                "query embedding has dimension {}, index has {}",
                query_vec.len(),
                self.dim.unwrap_or(0)
            )));
        }

        if query_vec.iter().any(|x| !x.is_finite()) {
            return Err(Error::EmbeddingService("non-finite value in query embedding".into()));
        }

        let mut scored: Vec<(usize, f32)> = self
            .entries
            .iter()
            .enumerate()
            .map(|(i, e)| (i, cosine_similarity(&query_vec, &e.vector)))
            .collect();
        scored.sort_by(|a, b| b.1.total_cmp(&a.1).then(a.0.cmp(&b.0)));
        scored.truncate(k);

        debug!(k, hits = scored.len(), top = scored.first().map(|s| s.1), "index query");
        Ok(scored
            .into_iter()
            .map(|(i, score)| ScoredPassage { passage: self.entries[i].passage.clone(), score })
            .collect())
    }
}
