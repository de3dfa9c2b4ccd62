//! OpenAI-compatible HTTP client
//!
//! Provides async completions and embeddings with:
//! - Bearer authentication
//! - Rate limit handling with exponential backoff
//! - Status-code mapping onto crate errors

use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client as HttpClient;
use serde::Serialize;
use serde::de::DeserializeOwned;
use tracing::{debug, warn};

use crate::config::{Config, EmbeddingConfig, LlmConfig};
use crate::domain::provider::{CompletionProvider, EmbeddingProvider};
use crate::error::{Error, Result};

use super::types::{ChatRequest, ChatResponse, EmbeddingRequest, EmbeddingResponse, Message};

/// Maximum number of attempts for rate-limited requests
const MAX_RETRY_ATTEMPTS: u32 = 3;

/// Base delay for exponential backoff (in milliseconds)
const BACKOFF_BASE_MS: u64 = 1000;

/// Client for chat completions and embeddings
#[derive(Clone)]
pub struct LlmClient {
    http_client: HttpClient,
    config: LlmConfig,
    embedding: EmbeddingConfig,
    api_key: String,
    base_url: String,
}

impl std::fmt::Debug for LlmClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("LlmClient")
            .field("base_url", &self.base_url)
            .field("completion_model", &self.config.completion_model)
            .field("embedding_model", &self.embedding.model)
            .finish()
    }
}

/// Builder for creating an LlmClient
#[derive(Default)]
pub struct LlmClientBuilder {
    config: Option<LlmConfig>,
    embedding: Option<EmbeddingConfig>,
    api_key: Option<String>,
    base_url: Option<String>,
    timeout_secs: Option<u64>,
}

impl LlmClientBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the completion settings
    pub fn config(mut self, config: LlmConfig) -> Self {
        self.config = Some(config);
        self
    }

    /// Set the embedding settings
    pub fn embedding(mut self, embedding: EmbeddingConfig) -> Self {
        self.embedding = Some(embedding);
        self
    }

    pub fn api_key(mut self, api_key: impl Into<String>) -> Self {
        self.api_key = Some(api_key.into());
        self
    }

    /// Override the base URL from the config
    pub fn base_url(mut self, url: impl Into<String>) -> Self {
        self.base_url = Some(url.into());
        self
    }

    pub fn timeout_secs(mut self, secs: u64) -> Self {
        self.timeout_secs = Some(secs);
        self
    }

    pub fn build(self) -> Result<LlmClient> {
        let config = self.config.unwrap_or_default();
        let api_key = self
            .api_key
            .filter(|k| !k.is_empty())
            .ok_or_else(|| Error::LLMError("API key is required".to_string()))?;

        let timeout_secs = self.timeout_secs.unwrap_or(config.timeout_secs);
        let http_client = HttpClient::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .build()
            .map_err(Error::NetworkError)?;

        let base_url = self
            .base_url
            .unwrap_or_else(|| config.base_url.clone())
            .trim_end_matches('/')
            .to_string();

        Ok(LlmClient {
            http_client,
            config,
            embedding: self.embedding.unwrap_or_default(),
            api_key,
            base_url,
        })
    }
}

impl LlmClient {
    pub fn builder() -> LlmClientBuilder {
        LlmClientBuilder::new()
    }

    /// Build a client from loaded configuration and the environment API key
    pub fn from_config(config: &Config) -> Result<Self> {
        let api_key = config
            .llm
            .resolved_api_key()
            .map_err(|e| Error::ConfigError(e.to_string()))?
            .ok_or_else(|| {
                Error::ConfigError(
                    "No API key found. Set WIKIGRAPH_API_KEY or OPENAI_API_KEY.".to_string(),
                )
            })?;

        LlmClientBuilder::new()
            .config(config.llm.clone())
            .embedding(config.embedding.clone())
            .api_key(api_key)
            .build()
    }

    pub fn completion_model(&self) -> &str {
        &self.config.completion_model
    }

    pub fn embedding_model(&self) -> &str {
        &self.embedding.model
    }

    /// Run a chat completion and return the first choice's text
    pub async fn complete_messages(&self, messages: Vec<Message>) -> Result<String> {
        let request = ChatRequest::new(&self.config.completion_model, messages)
            .with_temperature(self.config.temperature)
            .with_max_tokens(self.config.max_tokens);

        debug!(
            model = %request.model,
            messages = request.messages.len(),
            "Sending chat completion request"
        );

        let response: ChatResponse = self.post_with_retry("chat/completions", &request).await?;
        if response.truncated() {
            warn!(model = %response.model, "Completion stopped at max_tokens");
        }

        response
            .first_content()
            .map(str::to_string)
            .ok_or_else(|| Error::LLMError("Empty response from API".to_string()))
    }

    /// Embed one text
    pub async fn embed_text(&self, text: &str) -> Result<Vec<f32>> {
        let request = EmbeddingRequest::new(&self.embedding.model, text)
            .with_dimensions(self.embedding.dimensions);

        let response: EmbeddingResponse = self.post_with_retry("embeddings", &request).await?;
        response
            .into_vectors()
            .into_iter()
            .next()
            .ok_or_else(|| Error::EmbeddingUnavailable("Empty embedding response".to_string()))
    }

    /// Embed several texts in one request, in input order
    pub async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let expected = texts.len();
        let request = EmbeddingRequest::batch(&self.embedding.model, texts)
            .with_dimensions(self.embedding.dimensions);

        let response: EmbeddingResponse = self.post_with_retry("embeddings", &request).await?;
        let vectors = response.into_vectors();
        if vectors.len() != expected {
            return Err(Error::EmbeddingUnavailable(format!(
                "Expected {} embeddings, got {}",
                expected,
                vectors.len()
            )));
        }
        Ok(vectors)
    }

    async fn post_with_retry<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let mut attempts = 0;

        loop {
            attempts += 1;

            match self.post(path, body).await {
                Err(Error::RateLimited(wait_secs)) if attempts < MAX_RETRY_ATTEMPTS => {
                    let backoff = calculate_backoff(attempts, wait_secs);
                    warn!(
                        attempt = attempts,
                        wait_ms = backoff,
                        endpoint = %path,
                        "Rate limited, retrying after backoff"
                    );
                    tokio::time::sleep(Duration::from_millis(backoff)).await;
                }
                result => return result,
            }
        }
    }

    async fn post<Req, Resp>(&self, path: &str, body: &Req) -> Result<Resp>
    where
        Req: Serialize + ?Sized,
        Resp: DeserializeOwned,
    {
        let url = format!("{}/{}", self.base_url, path);

        let response = self
            .http_client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(body)
            .send()
            .await
            .map_err(Error::NetworkError)?;

        let status = response.status();
        if !status.is_success() {
            return handle_error_response(status, response).await;
        }

        response
            .json()
            .await
            .map_err(|e| Error::LLMError(format!("Failed to parse response from {}: {}", path, e)))
    }
}

#[async_trait]
impl CompletionProvider for LlmClient {
    async fn complete(&self, prompt: &str) -> Result<String> {
        self.complete_messages(vec![Message::user(prompt)]).await
    }
}

#[async_trait]
impl EmbeddingProvider for LlmClient {
    async fn embed(&self, text: &str) -> Result<Vec<f32>> {
        self.embed_text(text).await
    }
}

/// Map a non-success response onto a crate error
async fn handle_error_response<T>(status: reqwest::StatusCode, response: reqwest::Response) -> Result<T> {
    let header_wait = response
        .headers()
        .get(reqwest::header::RETRY_AFTER)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.trim().parse::<u64>().ok());
    let body = response.text().await.unwrap_or_default();

    match status.as_u16() {
        401 => Err(Error::LLMError(
            "Unauthorized: Invalid API key. Set WIKIGRAPH_API_KEY or OPENAI_API_KEY environment variable."
                .to_string(),
        )),
        429 => {
            let wait_secs = header_wait.or_else(|| extract_retry_after(&body)).unwrap_or(60);
            Err(Error::RateLimited(wait_secs))
        }
        400 => Err(Error::LLMError(format!("Bad request: {}", body))),
        402 => Err(Error::LLMError(
            "Payment required: insufficient credits on the API account".to_string(),
        )),
        403 => Err(Error::LLMError(format!("Forbidden: {}", body))),
        404 => Err(Error::LLMError(format!(
            "Model not found or endpoint unavailable: {}",
            body
        ))),
        500..=599 => Err(Error::LLMError(format!("Server error ({}): {}", status, body))),
        _ => Err(Error::LLMError(format!("HTTP error {}: {}", status, body))),
    }
}

/// Calculate backoff delay with jitter
fn calculate_backoff(attempt: u32, suggested_wait: u64) -> u64 {
    let base = BACKOFF_BASE_MS * 2u64.pow(attempt.saturating_sub(1));
    let delay = base.max(suggested_wait.saturating_mul(1000));

    // 10% jitter
    let jitter = delay / 10;
    delay + (rand_jitter() % jitter.max(1))
}

fn rand_jitter() -> u64 {
    use std::time::SystemTime;
    SystemTime::now()
        .duration_since(SystemTime::UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64 % 1000)
        .unwrap_or(0)
}

/// Extract a retry-after value from an error body
fn extract_retry_after(body: &str) -> Option<u64> {
    let json = serde_json::from_str::<serde_json::Value>(body).ok()?;
    json.get("retry_after")
        .and_then(|v| v.as_u64())
        .or_else(|| {
            json.get("error")
                .and_then(|e| e.get("retry_after"))
                .and_then(|v| v.as_u64())
        })
}
