//! HTTP client for OpenAI-compatible hosted model APIs.
//!
//! Wraps `reqwest` with bearer auth, a per-request timeout and the
//! [`RetryPolicy`] loop. Responses are classified into transient and fatal
//! [`CallError`]s; the embedding and generation clients map those into
//! their own error kinds.

use std::time::Duration;

use reqwest::StatusCode;
use serde::de::DeserializeOwned;
use serde::Serialize;

use crate::error::{Error, Result};
use crate::retry::{CallError, RetryPolicy};

#[derive(Debug, Clone)]
pub struct HttpClientConfig {
    /// Base URL of the API, e.g. `https://api.openai.com/v1`.
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout: Duration,
    pub retry: RetryPolicy,
}

impl Default for HttpClientConfig {
    fn default() -> Self {
        Self {
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            timeout: Duration::from_secs(30),
            retry: RetryPolicy::default(),
        }
    }
}

#[derive(Debug, Clone)]
pub struct HttpClient {
    client: reqwest::Client,
    base_url: String,
    api_key: Option<String>,
    retry: RetryPolicy,
}

impl HttpClient {
    pub fn new(config: HttpClientConfig) -> Result<Self> {
        let client = reqwest::Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| Error::InvalidConfig(format!("failed to build HTTP client: {e}")))?;
        Ok(Self {
            client,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            api_key: config.api_key.filter(|k| !k.trim().is_empty()),
            retry: config.retry,
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// POST `body` as JSON to `{base_url}{path}` and decode the JSON reply.
    pub async fn post_json<Req, Resp>(&self, path: &str, body: &Req) -> std::result::Result<Resp, CallError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}{}", self.base_url, path);
        self.retry.run(path, || self.post_once::<Req, Resp>(&url, body)).await
    }

    async fn post_once<Req, Resp>(&self, url: &str, body: &Req) -> std::result::Result<Resp, CallError>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let mut request = self.client.post(url).json(body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key);
        }
        let response = request.send().await.map_err(classify_transport)?;
        let status = response.status();
        if !status.is_success() {
            let detail = response.text().await.unwrap_or_default();
            let message = format!("{url} returned {status}: {}", truncate(&detail, 300));
            return Err(if is_transient_status(status) {
                CallError::transient(message)
            } else {
                CallError::fatal(message)
            });
        }
        response
            .json::<Resp>()
            .await
            .map_err(|e| CallError::fatal(format!("malformed response from {url}: {e}")))
    }
}

pub fn is_transient_status(status: StatusCode) -> bool {
    status == StatusCode::REQUEST_TIMEOUT
        || status == StatusCode::TOO_MANY_REQUESTS
        || status.is_server_error()
}

fn classify_transport(err: reqwest::Error) -> CallError {
    if err.is_timeout() || err.is_connect() || err.is_request() {
        CallError::transient(format!("request failed: {err}"))
    } else {
        CallError::fatal(format!("request failed: {err}"))
    }
}

fn truncate(s: &str, max_chars: usize) -> String {
    match s.char_indices().nth(max_chars) {
        Some((idx, _)) => format!("{}…", &s[..idx]),
        None => s.to_string(),
    }
}
