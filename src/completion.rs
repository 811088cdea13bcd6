//! Completion API bindings
//!
//! Both providers sit behind [`CompletionClient`] so the handler never knows
//! which remote service produced the answer.

use crate::config::{Config, GenerationParams, ProviderConfig};
use crate::error::QueryError;
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use tracing::warn;

const ANTHROPIC_VERSION: &str = "2023-06-01";

/// One prompt plus the fixed generation parameters
#[derive(Debug, Clone)]
pub struct CompletionRequest {
    pub prompt: String,
    pub params: GenerationParams,
}

/// A remote text-generation service
#[async_trait]
pub trait CompletionClient: Send + Sync {
    /// Sends the prompt and returns the raw completion text.
    ///
    /// A non-success status is reported as [`QueryError::Upstream`].
    async fn complete(&self, request: &CompletionRequest) -> Result<String, QueryError>;

    /// Provider name for logging
    fn name(&self) -> &str;
}

/// Builds the client selected by the configuration.
pub fn client_from_config(config: &Config) -> Arc<dyn CompletionClient> {
    match &config.provider {
        ProviderConfig::Anthropic { api_key, api_url } => {
            Arc::new(AnthropicClient::new(api_key.clone(), api_url.clone()))
        }
        ProviderConfig::Ollama { api_key, base_url } => {
            Arc::new(OllamaClient::new(api_key.clone(), base_url.clone()))
        }
    }
}

/// Reads the body and turns a non-success status into an upstream error.
///
/// The upstream status wins even when its body cannot be read.
async fn read_success_body(response: reqwest::Response) -> Result<String, QueryError> {
    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_else(|e| {
            warn!(status = status.as_u16(), "Failed to read upstream error body: {}", e);
            String::new()
        });
        return Err(QueryError::Upstream {
            status: status.as_u16(),
            body,
        });
    }
    Ok(response.text().await?)
}

// ============================================================================
// Anthropic
// ============================================================================

/// Anthropic text completions API client
pub struct AnthropicClient {
    client: Client,
    api_key: String,
    api_url: String,
}

#[derive(Debug, Serialize)]
struct AnthropicRequest<'a> {
    prompt: &'a str,
    model: &'a str,
    max_tokens_to_sample: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct AnthropicResponse {
    #[serde(default)]
    completion: String,
}

impl AnthropicClient {
    pub fn new(api_key: impl Into<String>, api_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key: api_key.into(),
            api_url: api_url.into(),
        }
    }

    fn request_body(request: &CompletionRequest) -> AnthropicRequest<'_> {
        AnthropicRequest {
            prompt: &request.prompt,
            model: &request.params.model,
            max_tokens_to_sample: request.params.max_tokens_to_sample,
            temperature: request.params.temperature,
        }
    }

    fn parse_completion(body: &str) -> Result<String, QueryError> {
        let parsed: AnthropicResponse = serde_json::from_str(body)?;
        Ok(parsed.completion)
    }
}

#[async_trait]
impl CompletionClient for AnthropicClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, QueryError> {
        let response = self
            .client
            .post(&self.api_url)
            .header("content-type", "application/json")
            .header("x-api-key", &self.api_key)
            .header("anthropic-version", ANTHROPIC_VERSION)
            .json(&Self::request_body(request))
            .send()
            .await?;

        let body = read_success_body(response).await?;
        Self::parse_completion(&body)
    }

    fn name(&self) -> &str {
        "anthropic"
    }
}

// ============================================================================
// Ollama
// ============================================================================

/// Ollama generate API client
pub struct OllamaClient {
    client: Client,
    api_key: Option<String>,
    base_url: String,
}

#[derive(Debug, Serialize)]
struct OllamaRequest<'a> {
    model: &'a str,
    prompt: &'a str,
    stream: bool,
    options: OllamaOptions,
}

#[derive(Debug, Serialize)]
struct OllamaOptions {
    num_predict: u32,
    temperature: f32,
}

#[derive(Debug, Deserialize)]
struct OllamaResponse {
    #[serde(default)]
    response: String,
}

impl OllamaClient {
    pub fn new(api_key: Option<String>, base_url: impl Into<String>) -> Self {
        Self {
            client: Client::new(),
            api_key,
            base_url: base_url.into(),
        }
    }

    fn request_body(request: &CompletionRequest) -> OllamaRequest<'_> {
        OllamaRequest {
            model: &request.params.model,
            prompt: &request.prompt,
            stream: false,
            options: OllamaOptions {
                num_predict: request.params.max_tokens_to_sample,
                temperature: request.params.temperature,
            },
        }
    }

    fn parse_completion(body: &str) -> Result<String, QueryError> {
        let parsed: OllamaResponse = serde_json::from_str(body)?;
        Ok(parsed.response)
    }
}

#[async_trait]
impl CompletionClient for OllamaClient {
    async fn complete(&self, request: &CompletionRequest) -> Result<String, QueryError> {
        let url = format!("{}/api/generate", self.base_url.trim_end_matches('/'));
        let mut builder = self
            .client
            .post(url)
            .header("content-type", "application/json")
            .json(&Self::request_body(request));
        if let Some(key) = &self.api_key {
            builder = builder.bearer_auth(key);
        }

        let body = read_success_body(builder.send().await?).await?;
        Self::parse_completion(&body)
    }

    fn name(&self) -> &str {
        "ollama"
    }
}
