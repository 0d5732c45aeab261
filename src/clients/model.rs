//! Language-model backend over an OpenAI-compatible chat completions endpoint.
//!
//! Works with Ollama (the default, serving `codellama`), OpenAI, vLLM and any
//! other server exposing `/v1/chat/completions`. Non-streaming only.

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::Deserialize;
use std::time::Duration;
use tracing::{debug, warn};

use crate::error::ModelError;

/// Prompt in, generated text out.
#[async_trait]
pub trait LanguageModel: Send + Sync {
    /// Model identifier shown in the front-end banner.
    fn name(&self) -> &str;

    async fn generate(&self, prompt: &str) -> Result<String, ModelError>;
}

pub struct OpenAiCompatModel {
    base_url: String,
    model: String,
    api_key: Option<SecretString>,
    client: reqwest::Client,
}

impl OpenAiCompatModel {
    pub fn new(
        base_url: &str,
        model: &str,
        api_key: Option<SecretString>,
        timeout: Duration,
    ) -> Result<Self, ModelError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ModelError::Network(e.to_string()))?;

        Ok(Self {
            base_url: base_url.trim_end_matches('/').to_string(),
            model: model.to_string(),
            api_key,
            client,
        })
    }
}

#[async_trait]
impl LanguageModel for OpenAiCompatModel {
    fn name(&self) -> &str {
        &self.model
    }

    async fn generate(&self, prompt: &str) -> Result<String, ModelError> {
        let url = format!("{}/chat/completions", self.base_url);
        let body = serde_json::json!({
            "model": self.model,
            "messages": [{ "role": "user", "content": prompt }],
            "stream": false,
        });

        debug!(model = %self.model, prompt_len = prompt.len(), "sending completion request");

        let mut request = self.client.post(&url).json(&body);
        if let Some(key) = &self.api_key {
            request = request.bearer_auth(key.expose_secret());
        }

        let response = request
            .send()
            .await
            .map_err(|e| ModelError::Network(e.to_string()))?;

        let status = response.status().as_u16();
        if !response.status().is_success() {
            let message = response.text().await.unwrap_or_default();
            warn!(status, body = %message, "model backend returned error");
            return Err(ModelError::Api { status, message });
        }

        let parsed: ApiResponse = response.json().await.map_err(|e| ModelError::Api {
            status,
            message: format!("failed to parse response: {e}"),
        })?;

        extract_text(parsed)
    }
}

fn extract_text(response: ApiResponse) -> Result<String, ModelError> {
    response
        .choices
        .into_iter()
        .next()
        .and_then(|c| c.message.content)
        .map(|text| text.trim().to_string())
        .filter(|text| !text.is_empty())
        .ok_or(ModelError::EmptyResponse)
}

#[derive(Deserialize)]
struct ApiResponse {
    #[serde(default)]
    choices: Vec<ApiChoice>,
}

#[derive(Deserialize)]
struct ApiChoice {
    message: ApiMessage,
}

#[derive(Deserialize)]
struct ApiMessage {
    content: Option<String>,
}
