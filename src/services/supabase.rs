use crate::config::Config;
use crate::models::{NewChunk, RetrievalMatch};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;
use tracing::{debug, error};

/// Structured error body returned by PostgREST (`{ code, message, details, hint }`).
#[derive(Debug, Clone, Default, PartialEq, Eq, Deserialize)]
pub struct PostgrestError {
    #[serde(default)]
    pub code: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default)]
    pub details: Option<String>,
    #[serde(default)]
    pub hint: Option<String>,
}

impl fmt::Display for PostgrestError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.message.as_deref().unwrap_or("no message"))?;
        if let Some(code) = &self.code {
            write!(f, " (code: {})", code)?;
        }
        if let Some(details) = &self.details {
            write!(f, " details: {}", details)?;
        }
        if let Some(hint) = &self.hint {
            write!(f, " hint: {}", hint)?;
        }
        Ok(())
    }
}

#[derive(Error, Debug)]
pub enum StoreError {
    /// The request never produced an HTTP response.
    #[error("Vector store request failed: {message}")]
    Transport {
        message: String,
        timeout: bool,
        connect: bool,
    },

    /// The store answered with a non-success status.
    #[error("Vector store returned {status}: {body}")]
    Api { status: u16, body: PostgrestError },

    #[error("Failed to parse vector store response: {0}")]
    MalformedResponse(String),
}

impl StoreError {
    fn from_transport(err: reqwest::Error) -> Self {
        StoreError::Transport {
            timeout: err.is_timeout(),
            connect: err.is_connect(),
            message: err.to_string(),
        }
    }
}

/// Persistence for pre-embedded chunks.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait ChunkStore: Send + Sync {
    /// Runs the similarity search procedure.
    async fn match_chunks(
        &self,
        query_embedding: &[f32],
        match_threshold: f32,
        match_count: usize,
    ) -> Result<Vec<RetrievalMatch>, StoreError>;

    /// Bulk inserts chunks produced by the ingestion job.
    async fn insert_chunks(&self, chunks: &[NewChunk]) -> Result<(), StoreError>;
}

#[derive(Debug, Clone)]
pub struct SupabaseClient {
    client: Client,
    base_url: String,
    api_key: String,
    match_function: String,
    chunks_table: String,
}

#[derive(Serialize)]
struct MatchChunksParams<'a> {
    p_query_embedding: &'a [f32],
    p_match_threshold: f32,
    p_match_count: usize,
}

impl SupabaseClient {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            base_url: config.supabase_url.trim_end_matches('/').to_string(),
            api_key: config.supabase_anon_key.clone(),
            match_function: config.match_function.clone(),
            chunks_table: config.chunks_table.clone(),
        }
    }

    fn rpc_url(&self) -> String {
        format!("{}/rest/v1/rpc/{}", self.base_url, self.match_function)
    }

    fn table_url(&self) -> String {
        format!("{}/rest/v1/{}", self.base_url, self.chunks_table)
    }

    async fn api_error(response: reqwest::Response) -> StoreError {
        let status = response.status();
        let text = response.text().await.unwrap_or_default();
        let body = serde_json::from_str::<PostgrestError>(&text).unwrap_or_else(|_| {
            PostgrestError {
                message: Some(text),
                ..Default::default()
            }
        });
        error!("Vector store error ({}): {}", status, body);
        StoreError::Api {
            status: status.as_u16(),
            body,
        }
    }
}

#[async_trait]
impl ChunkStore for SupabaseClient {
    async fn match_chunks(
        &self,
        query_embedding: &[f32],
        match_threshold: f32,
        match_count: usize,
    ) -> Result<Vec<RetrievalMatch>, StoreError> {
        let params = MatchChunksParams {
            p_query_embedding: query_embedding,
            p_match_threshold: match_threshold,
            p_match_count: match_count,
        };

        debug!("Calling {} with threshold {}", self.rpc_url(), match_threshold);
        let response = self
            .client
            .post(self.rpc_url())
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .json(&params)
            .send()
            .await
            .map_err(StoreError::from_transport)?;

        match response.status() {
            StatusCode::OK => {
                let rows: Option<Vec<RetrievalMatch>> = response
                    .json()
                    .await
                    .map_err(|e| StoreError::MalformedResponse(e.to_string()))?;
                Ok(rows.unwrap_or_default())
            }
            _ => Err(Self::api_error(response).await),
        }
    }

    async fn insert_chunks(&self, chunks: &[NewChunk]) -> Result<(), StoreError> {
        if chunks.is_empty() {
            return Ok(());
        }

        let response = self
            .client
            .post(self.table_url())
            .header("apikey", &self.api_key)
            .header("Authorization", format!("Bearer {}", self.api_key))
            .header("Prefer", "return=minimal")
            .json(chunks)
            .send()
            .await
            .map_err(StoreError::from_transport)?;

        match response.status() {
            StatusCode::CREATED | StatusCode::NO_CONTENT | StatusCode::OK => Ok(()),
            _ => Err(Self::api_error(response).await),
        }
    }
}
