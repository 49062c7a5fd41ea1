//! Clients for the hosted models: text embeddings and chat completions.

pub mod chat_generator;
pub mod openai_embedder;

use crate::models::EmbeddingVector;
use crate::services::prompt::Prompt;
use async_trait::async_trait;

pub use chat_generator::{GenerationError, OpenAiChatGenerator};
pub use openai_embedder::{EmbeddingError, OpenAiEmbedder};

/// Turns text into a fixed-dimension vector.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Embedder: Send + Sync {
    async fn embed(&self, text: &str) -> Result<EmbeddingVector, EmbeddingError>;
}

/// Sends an assembled prompt to a generative model and returns its raw reply.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait Generator: Send + Sync {
    async fn generate(
        &self,
        prompt: &Prompt,
        temperature: f32,
    ) -> Result<String, GenerationError>;
}

/// Shorten provider payloads before they end up in logs or error details.
pub(crate) fn preview(text: &str, max_chars: usize) -> String {
    let mut chars = text.chars();
    let head: String = chars.by_ref().take(max_chars).collect();
    if chars.next().is_some() {
        format!("{}...", head)
    } else {
        head
    }
}
