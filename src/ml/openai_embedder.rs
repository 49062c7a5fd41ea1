use crate::config::Config;
use crate::ml::{preview, Embedder};
use crate::models::EmbeddingVector;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, error};

// Text processing limits
const MAX_TEXT_PREVIEW_LENGTH: usize = 100;
const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Error, Debug)]
pub enum EmbeddingError {
    #[error("Cannot embed empty text")]
    EmptyInput,

    #[error("Embedding request failed: {0}")]
    Request(String),

    #[error("Embedding provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Failed to parse embedding response: {0}")]
    MalformedResponse(String),

    #[error("Embedding provider returned no vector")]
    EmptyResponse,

    #[error("Embedding dimension mismatch: expected {expected}, got {got}")]
    DimensionMismatch { expected: usize, got: usize },
}

/// Embeds text through an OpenAI-compatible `/embeddings` endpoint.
#[derive(Clone)]
pub struct OpenAiEmbedder {
    client: Client,
    api_key: String,
    endpoint: String,
    model_name: String,
    dimensions: usize,
}

#[derive(Serialize)]
struct EmbeddingRequest<'a> {
    model: &'a str,
    input: &'a str,
}

#[derive(Debug, Deserialize)]
struct EmbeddingResponse {
    #[serde(default)]
    data: Vec<EmbeddingData>,
}

#[derive(Debug, Deserialize)]
struct EmbeddingData {
    embedding: Vec<f32>,
}

impl OpenAiEmbedder {
    /// Creates an embedder sharing the given HTTP client.
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            api_key: config.openai_api_key.clone(),
            endpoint: format!("{}/embeddings", config.openai_base_url.trim_end_matches('/')),
            model_name: config.embedding_model.clone(),
            dimensions: config.embedding_dimensions,
        }
    }

    pub fn model_name(&self) -> &str {
        &self.model_name
    }

    async fn process_api_response(
        &self,
        response: reqwest::Response,
    ) -> Result<Vec<f32>, EmbeddingError> {
        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();

            if status == StatusCode::UNAUTHORIZED || status == StatusCode::FORBIDDEN {
                error!("Embedding provider rejected the API key");
            } else if status == StatusCode::TOO_MANY_REQUESTS {
                error!("Embedding provider rate limit exceeded");
            }

            return Err(EmbeddingError::Status {
                status: status.as_u16(),
                body: preview(&text, MAX_ERROR_BODY_LENGTH),
            });
        }

        let parsed: EmbeddingResponse = response
            .json()
            .await
            .map_err(|e| EmbeddingError::MalformedResponse(e.to_string()))?;

        let embedding = parsed
            .data
            .into_iter()
            .next()
            .map(|d| d.embedding)
            .filter(|e| !e.is_empty())
            .ok_or(EmbeddingError::EmptyResponse)?;

        if embedding.len() != self.dimensions {
            return Err(EmbeddingError::DimensionMismatch {
                expected: self.dimensions,
                got: embedding.len(),
            });
        }

        debug!(
            "Got embedding of size {} from {}",
            embedding.len(),
            self.model_name
        );
        Ok(embedding)
    }
}

#[async_trait]
impl Embedder for OpenAiEmbedder {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError> {
        let input = text.trim();
        if input.is_empty() {
            return Err(EmbeddingError::EmptyInput);
        }

        debug!(
            "Encoding text (length: {}): {}",
            input.len(),
            preview(input, MAX_TEXT_PREVIEW_LENGTH)
        );

        let request = EmbeddingRequest {
            model: &self.model_name,
            input,
        };

        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&request)
            .send()
            .await
            .map_err(|e| EmbeddingError::Request(e.to_string()))?;

        self.process_api_response(response).await
    }
}
