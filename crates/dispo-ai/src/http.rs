//! HTTP text-generation backend.

use std::time::Duration;

use async_trait::async_trait;
use serde::Deserialize;
use tracing::info;

use crate::InferenceError;
use crate::generator::{GenerateRequest, Generation, TextGenerator};

/// Posts requests to a model server's `/generate` endpoint.
///
/// The server takes `{system_prompt, user_prompt, max_tokens, temperature}`
/// and answers `{text, token_probs}`.
pub struct HttpGenerator {
    client: reqwest::Client,
    base_url: String,
}

#[derive(Deserialize)]
struct GenerateResponse {
    text: String,
    #[serde(default)]
    token_probs: Vec<f64>,
}

impl HttpGenerator {
    /// `base_url` should be like `http://localhost:8000`; a trailing slash
    /// is dropped.
    pub fn new(base_url: String) -> Self {
        Self {
            client: reqwest::Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    pub fn with_timeout(base_url: String, timeout: Duration) -> Result<Self, InferenceError> {
        Ok(Self {
            client: reqwest::Client::builder().timeout(timeout).build()?,
            base_url: base_url.trim_end_matches('/').to_string(),
        })
    }

    pub fn base_url(&self) -> &str {
        &self.base_url
    }
}

#[async_trait]
impl TextGenerator for HttpGenerator {
    async fn generate(&self, request: &GenerateRequest) -> Result<Generation, InferenceError> {
        let url = format!("{}/generate", self.base_url);

        info!(url = %url, max_tokens = request.max_tokens, "requesting generation");
        let resp = self.client.post(&url).json(request).send().await?;
        let status = resp.status();
        if !status.is_success() {
            let body = resp.text().await.unwrap_or_default();
            return Err(InferenceError::Server {
                status: status.as_u16(),
                body,
            });
        }

        let result: GenerateResponse = resp.json().await?;
        info!(tokens = result.token_probs.len(), "generation received");
        Ok(Generation {
            text: result.text,
            token_probs: result.token_probs,
        })
    }
}
