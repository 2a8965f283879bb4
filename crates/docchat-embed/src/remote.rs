use docchat_core::remote::{HttpClient, HttpClientConfig};
use docchat_core::traits::Embedder;
use docchat_core::{Error, Result};
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize)]
struct EmbedRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Deserialize)]
struct EmbedResponse {
    data: Vec<EmbedData>,
}

#[derive(Deserialize)]
struct EmbedData {
    #[serde(default)]
    index: Option<usize>,
    embedding: Vec<f32>,
}

/// Embedding provider for OpenAI-compatible `POST /embeddings` endpoints.
pub struct RemoteEmbedder {
    client: HttpClient,
    model: String,
    id: String,
}

impl RemoteEmbedder {
    pub fn new(config: HttpClientConfig, model: impl Into<String>) -> Result<Self> {
        let model = model.into();
        let id = format!("remote:{model}");
        Ok(Self { client: HttpClient::new(config)?, model, id })
    }

    async fn request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }
        debug!(model = %self.model, inputs = texts.len(), "requesting embeddings");
        let body = EmbedRequest { model: &self.model, input: texts };
        let response: EmbedResponse = self
            .client
            .post_json("/embeddings", &body)
            .await
            .map_err(|e| Error::EmbeddingService(e.message))?;

        if response.data.len() != texts.len() {
            return Err(Error::EmbeddingService(format!(
                "expected {} embeddings, service returned {}",
                texts.len(),
                response.data.len()
            )));
        }
        let mut data = response.data;
        // The API may return items out of order; `index` is authoritative when present.
        if data.iter().all(|d| d.index.is_some()) {
            data.sort_by_key(|d| d.index);
            if let Some((position, item)) = data.iter().enumerate().find(|(i, d)| d.index != Some(*i)) {
                return Err(Error::EmbeddingService(format!(
                    "embedding indices are not 0..{}: position {position} holds index {:?}",
                    texts.len(),
                    item.index
                )));
            }
        }
        Ok(data.into_iter().map(|d| d.embedding).collect())
    }
}

impl Embedder for RemoteEmbedder {
    fn embedder_id(&self) -> &str {
        &self.id
    }

    fn embed_batch<'a>(&'a self, texts: &'a [String]) -> BoxFuture<'a, Result<Vec<Vec<f32>>>> {
        self.request(texts).boxed()
    }
}
