use docchat_core::remote::{HttpClient, HttpClientConfig};
use docchat_core::traits::Generator;
use docchat_core::types::ChatMessage;
use docchat_core::{Error, Result};
use futures::future::{BoxFuture, FutureExt};
use serde::{Deserialize, Serialize};
use tracing::debug;

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: &'a [ChatMessage],
    temperature: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    max_tokens: Option<u32>,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<Choice>,
}

#[derive(Deserialize)]
struct Choice {
    message: Option<ResponseMessage>,
    #[serde(default)]
    finish_reason: Option<String>,
}

#[derive(Deserialize)]
struct ResponseMessage {
    #[serde(default)]
    content: Option<String>,
}

/// Generator for OpenAI-compatible `POST /chat/completions` endpoints.
pub struct RemoteGenerator {
    client: HttpClient,
    model: String,
    temperature: f32,
    max_tokens: Option<u32>,
    id: String,
}

impl RemoteGenerator {
    pub fn new(config: HttpClientConfig, model: impl Into<String>, temperature: f32, max_tokens: Option<u32>) -> Result<Self> {
        let model = model.into();
        let id = format!("remote:{model}");
        Ok(Self { client: HttpClient::new(config)?, model, temperature, max_tokens, id })
    }

    async fn request(&self, messages: &[ChatMessage]) -> Result<String> {
        let body = ChatRequest {
            model: &self.model,
            messages,
            temperature: self.temperature,
            max_tokens: self.max_tokens,
        };
        let response: ChatResponse = self
            .client
            .post_json("/chat/completions", &body)
            .await
            .map_err(|e| Error::Generation(e.message))?;

        let choice = response
            .choices
            .into_iter()
            .next()
            .ok_or_else(|| Error::Generation("completion returned no choices".into()))?;
        if choice.finish_reason.as_deref() == Some("content_filter") {
            return Err(Error::Generation("completion rejected by content filter".into()));
        }
        let content = choice.message.and_then(|m| m.content).unwrap_or_default();
        debug!(model = %self.model, chars = content.len(), finish_reason = ?choice.finish_reason, "completion received");
        Ok(content)
    }
}

impl Generator for RemoteGenerator {
    fn generator_id(&self) -> &str {
        &self.id
    }

    fn complete<'a>(&'a self, messages: &'a [ChatMessage]) -> BoxFuture<'a, Result<String>> {
        self.request(messages).boxed()
    }
}
