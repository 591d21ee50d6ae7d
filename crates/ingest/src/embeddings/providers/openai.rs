//! OpenAI embedding provider.
//!
//! Calls the `/embeddings` endpoint, which accepts many inputs per request.
//! Inputs larger than `request_batch_size` are sent as consecutive requests
//! and stitched back together in order.

use crate::embeddings::EmbeddingProvider;
use async_trait::async_trait;
use docvec_core::config::EmbeddingSettings;
use docvec_core::{AppError, AppResult};
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, instrument, warn};

const DEFAULT_OPENAI_URL: &str = "https://api.openai.com/v1";
const EMBEDDING_ENDPOINT: &str = "/embeddings";

/// Maximum attempts for transient failures (429, 5xx, connection errors)
const MAX_RETRIES: u32 = 3;

/// Initial backoff duration in milliseconds
const INITIAL_BACKOFF_MS: u64 = 200;

/// OpenAI embedding provider
#[derive(Debug, Clone)]
pub struct OpenAiProvider {
    client: Client,
    base_url: String,
    api_key: String,
    model: String,
    dimensions: usize,
    request_batch_size: usize,
}

#[derive(Debug, Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a [String],
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
    index: usize,
}

#[derive(Debug, Deserialize)]
struct ErrorResponse {
    error: ErrorBody,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

impl EmbeddingResponse {
    /// Order vectors by their `index` field and check that every input got one.
    fn into_ordered(self, expected: usize) -> AppResult<Vec<Vec<f32>>> {
        if self.data.len() != expected {
            return Err(AppError::Embedding(format!(
                "OpenAI returned {} embeddings for {} inputs",
                self.data.len(),
                expected
            )));
        }

        let mut slots: Vec<Option<Vec<f32>>> = vec![None; expected];
        for item in self.data {
            let slot = slots.get_mut(item.index).ok_or_else(|| {
                AppError::Embedding(format!("OpenAI returned out-of-range index {}", item.index))
            })?;
            *slot = Some(item.embedding);
        }

        slots
            .into_iter()
            .enumerate()
            .map(|(i, slot)| {
                slot.ok_or_else(|| {
                    AppError::Embedding(format!("OpenAI response is missing index {}", i))
                })
            })
            .collect()
    }
}

impl OpenAiProvider {
    /// Create a new OpenAI provider.
    pub fn new(settings: &EmbeddingSettings, dimensions: usize, api_key: &str) -> AppResult<Self> {
        if api_key.trim().is_empty() {
            return Err(AppError::Config("OpenAI API key is empty".to_string()));
        }

        let client = Client::builder()
            .timeout(Duration::from_secs(settings.timeout_secs))
            .build()
            .map_err(|e| {
                AppError::Embedding(format!("Failed to create HTTP client for OpenAI: {}", e))
            })?;

        let base_url = settings
            .endpoint
            .as_deref()
            .unwrap_or(DEFAULT_OPENAI_URL)
            .trim_end_matches('/')
            .to_string();

        Ok(Self {
            client,
            base_url,
            api_key: api_key.trim().to_string(),
            model: settings.model.clone(),
            dimensions,
            request_batch_size: settings.request_batch_size.max(1),
        })
    }

    /// Get the base URL of the embeddings API.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    #[instrument(skip(self, texts), fields(inputs = texts.len(), model = %self.model))]
    async fn embed_with_retries(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        let mut attempt = 0;
        loop {
            match self.embed_request(texts).await {
                Ok(embeddings) => return Ok(embeddings),
                Err((err, retryable)) => {
                    attempt += 1;
                    if !retryable || attempt >= MAX_RETRIES {
                        return Err(err);
                    }
                    let backoff_ms = INITIAL_BACKOFF_MS * 2_u64.pow(attempt);
                    warn!(
                        "Embedding request failed (attempt {}/{}), retrying in {}ms: {}",
                        attempt, MAX_RETRIES, backoff_ms, err
                    );
                    tokio::time::sleep(Duration::from_millis(backoff_ms)).await;
                }
            }
        }
    }

    /// One HTTP round trip. The flag says whether the failure is worth retrying.
    async fn embed_request(&self, texts: &[String]) -> Result<Vec<Vec<f32>>, (AppError, bool)> {
        let url = format!("{}{}", self.base_url, EMBEDDING_ENDPOINT);
        let request = EmbeddingRequest {
            model: &self.model,
            input: texts,
        };

        let response = self
            .client
            .post(&url)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                let retryable = e.is_timeout() || e.is_connect();
                (
                    AppError::Embedding(format!("Failed to send request to OpenAI: {}", e)),
                    retryable,
                )
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let message = serde_json::from_str::<ErrorResponse>(&body)
                .map(|e| e.error.message)
                .unwrap_or(body);
            return Err((
                AppError::Embedding(format!("OpenAI API error ({}): {}", status, message)),
                should_retry(status),
            ));
        }

        let body: EmbeddingResponse = response.json().await.map_err(|e| {
            (
                AppError::Embedding(format!("Failed to parse OpenAI response: {}", e)),
                false,
            )
        })?;

        body.into_ordered(texts.len()).map_err(|e| (e, false))
    }
}

fn should_retry(status: StatusCode) -> bool {
    status == StatusCode::TOO_MANY_REQUESTS || status.is_server_error()
}

#[async_trait]
impl EmbeddingProvider for OpenAiProvider {
    fn provider_name(&self) -> &str {
        "openai"
    }

    fn model_name(&self) -> &str {
        &self.model
    }

    fn dimensions(&self) -> usize {
        self.dimensions
    }

    #[instrument(skip(self, texts), fields(batch_size = texts.len(), provider = "openai", model = %self.model))]
    async fn embed_batch(&self, texts: &[String]) -> AppResult<Vec<Vec<f32>>> {
        if texts.is_empty() {
            return Ok(Vec::new());
        }

        let mut embeddings = Vec::with_capacity(texts.len());
        for request_texts in texts.chunks(self.request_batch_size) {
            let part = self.embed_with_retries(request_texts).await?;
            embeddings.extend(part);
        }

        debug!("Generated {} embeddings", embeddings.len());
        Ok(embeddings)
    }
}
