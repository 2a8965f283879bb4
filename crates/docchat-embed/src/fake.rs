use std::hash::{Hash, Hasher};

use docchat_core::traits::Embedder;
use docchat_core::Result;
use futures::future::{self, BoxFuture, FutureExt};
use twox_hash::XxHash64;

/// Deterministic bag-of-words embedder: every lowercase token is hashed into
/// one bucket and the vector is L2-normalized. Texts sharing words land close
/// together, which is enough for development and tests without a model.
pub struct FakeEmbedder {
    dim: usize,
    id: String,
}

impl FakeEmbedder {
    pub fn new(dim: usize) -> Self {
        Self { dim: dim.max(1), id: format!("fake:xxh64:d{}", dim.max(1)) }
    }

    pub fn dim(&self) -> usize {
        self.dim
    }

    pub fn embed_text(&self, text: &str) -> Vec<f32> {
        let mut v = vec![0f32; self.dim];
        for token in text.split(|c: char| !c.is_alphanumeric()).filter(|t| !t.is_empty()) {
            let mut hasher = XxHash64::with_seed(0);
            token.to_lowercase().hash(&mut hasher);
            let h = hasher.finish();
            let idx = (h % self.dim as u64) as usize;
            v[idx] += 1.0;
        }
        let norm = v.iter().map(|x| x * x).sum::<f32>().sqrt();
        if norm > 0.0 {
            for x in &mut v {
                *x /= norm;
            }
        }
        v
    }
}

impl Embedder for FakeEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
        future::ready(Ok(texts.iter().map(|t| self.embed_text(t)).collect())).boxed()
    }
}
