//! Embedding providers.
//!
//! [`RemoteEmbedder`] calls a hosted OpenAI-compatible API; [`FakeEmbedder`]
//! is a deterministic hashing embedder for development and tests.

use std::sync::Arc;

use anyhow::Result;
use docchat_core::config::{EmbeddingProvider, Settings};
use docchat_core::traits::Embedder;
use tracing::info;

pub mod fake;
pub mod remote;

pub use fake::FakeEmbedder;
pub use remote::RemoteEmbedder;

/// `APP_USE_FAKE_EMBEDDINGS=1|true` forces the fake embedder regardless of settings.
pub fn fake_embeddings_forced() -> bool {
    std::env::var("APP_USE_FAKE_EMBEDDINGS")
        .ok()
        .map(|v| v == "1" || v.eq_ignore_ascii_case("true"))
        .unwrap_or(false)
}

pub fn get_default_embedder(settings: &Settings) -> Result<Arc<dyn Embedder>> {
    if fake_embeddings_forced() || settings.embedding.provider == EmbeddingProvider::Fake {
        info!(dim = settings.embedding.fake_dim, "using fake embedder");
        return Ok(Arc::new(FakeEmbedder::new(settings.embedding.fake_dim)));
    }
    info!(model = %settings.embedding.model, base_url = %settings.service.base_url, "using remote embedder");
    Ok(Arc::new(RemoteEmbedder::new(settings.service.http_config(), settings.embedding.model.clone())?))
}
