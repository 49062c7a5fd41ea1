pub mod classifier;
pub mod decoder;
pub mod prompt;
pub mod recommendation;
pub mod retriever;
pub mod supabase;
pub mod text_splitter;

use crate::config::Config;
use crate::error::{ApiError, Result};
use std::time::Duration;

// Re-export public types
pub use recommendation::{PipelineOutcome, PipelineSettings, RecommendationPipeline};
pub use retriever::VectorRetriever;
pub use supabase::{ChunkStore, SupabaseClient};
pub use text_splitter::TextSplitter;

/// Builds the HTTP client shared by every outbound integration.
pub fn build_http_client(config: &Config) -> Result<reqwest::Client> {
    reqwest::Client::builder()
        .timeout(Duration::from_secs(config.request_timeout_secs))
        .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .map_err(|e| ApiError::Configuration(format!("Failed to build HTTP client: {}", e)))
}
