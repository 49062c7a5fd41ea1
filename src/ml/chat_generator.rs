use crate::config::Config;
use crate::ml::{preview, Generator};
use crate::services::prompt::Prompt;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{debug, warn};

const MAX_ERROR_BODY_LENGTH: usize = 500;

#[derive(Error, Debug)]
pub enum GenerationError {
    #[error("Chat completion request failed: {0}")]
    Request(String),

    #[error("Chat completion rate limited: {0}")]
    RateLimited(String),

    #[error("Chat provider returned {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Malformed chat completion response: {0}")]
    MalformedResponse(String),
}

/// Generates replies through an OpenAI-compatible `/chat/completions` endpoint.
#[derive(Clone)]
pub struct OpenAiChatGenerator {
    client: Client,
    api_key: String,
    endpoint: String,
    model: String,
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    temperature: f32,
    messages: [ChatMessage<'a>; 2],
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Debug, Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Debug, Deserialize)]
struct ChatChoice {
    message: AssistantMessage,
}

#[derive(Debug, Deserialize)]
struct AssistantMessage {
    content: Option<String>,
}

impl OpenAiChatGenerator {
    pub fn new(client: Client, config: &Config) -> Self {
        Self {
            client,
            api_key: config.openai_api_key.clone(),
            endpoint: format!(
                "{}/chat/completions",
                config.openai_base_url.trim_end_matches('/')
            ),
            model: config.chat_model.clone(),
        }
    }
}

#[async_trait]
impl Generator for OpenAiChatGenerator {
    async fn generate(
        &self,
        prompt: &Prompt,
        temperature: f32,
    ) -> Result<String, GenerationError> {
        let body = ChatRequest {
            model: &self.model,
            temperature,
            messages: [
                ChatMessage {
                    role: "system",
                    content: &prompt.system_instructions,
                },
                ChatMessage {
                    role: "user",
                    content: &prompt.user_content,
                },
            ],
        };

        debug!("Sending request to {} with model {}", self.endpoint, self.model);
        let response = self
            .client
            .post(&self.endpoint)
            .bearer_auth(&self.api_key)
            .json(&body)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    GenerationError::Request(format!("timed out: {}", e))
                } else {
                    GenerationError::Request(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let text = preview(&text, MAX_ERROR_BODY_LENGTH);
            if status == StatusCode::TOO_MANY_REQUESTS {
                warn!("Chat provider rate limit exceeded");
                return Err(GenerationError::RateLimited(text));
            }
            return Err(GenerationError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| GenerationError::MalformedResponse(e.to_string()))?;

        parsed
            .choices
            .into_iter()
            .next()
            .and_then(|choice| choice.message.content)
            .ok_or_else(|| {
                GenerationError::MalformedResponse("response contained no message content".into())
            })
    }
}
