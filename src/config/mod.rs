use crate::error::{ApiError, Result};
use serde::Deserialize;

const DEFAULT_OPENAI_BASE_URL: &str = "https://api.openai.com/v1";
const DEFAULT_EMBEDDING_MODEL: &str = "text-embedding-ada-002";
const DEFAULT_CHAT_MODEL: &str = "gpt-4-turbo";

/// Process-wide settings, assembled once at startup and never mutated.
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    pub host: String,
    pub port: u16,

    #[serde(default)]
    pub supabase_url: String,
    #[serde(default)]
    pub supabase_anon_key: String,
    #[serde(default)]
    pub openai_api_key: String,
    pub openai_base_url: String,

    pub embedding_model: String,
    pub embedding_dimensions: usize,
    pub chat_model: String,
    pub temperature: f32,

    pub match_function: String,
    pub chunks_table: String,
    pub match_threshold: f32,
    pub match_count: usize,
    pub max_recommendations: usize,

    pub request_timeout_secs: u64,
    pub connect_timeout_secs: u64,
}

impl Config {
    /// Load configuration from `.env` and the process environment, then validate it.
    pub fn load() -> Result<Self> {
        dotenv::dotenv().ok();

        let settings = Self::defaults()?
            .add_source(config::Environment::default().try_parsing(true))
            .build()?;

        Self::from_settings(settings)
    }

    fn defaults() -> Result<config::ConfigBuilder<config::builder::DefaultState>> {
        Ok(config::Config::builder()
            .set_default("host", "0.0.0.0")?
            .set_default("port", 8080)?
            .set_default("openai_base_url", DEFAULT_OPENAI_BASE_URL)?
            .set_default("embedding_model", DEFAULT_EMBEDDING_MODEL)?
            .set_default("embedding_dimensions", 1536)?
            .set_default("chat_model", DEFAULT_CHAT_MODEL)?
            .set_default("temperature", 0.7)?
            .set_default("match_function", "match_island_chunks")?
            .set_default("chunks_table", "island_chunks")?
            .set_default("match_threshold", 0.75)?
            .set_default("match_count", 3)?
            .set_default("max_recommendations", 3)?
            .set_default("request_timeout_secs", 60)?
            .set_default("connect_timeout_secs", 10)?)
    }

    fn from_settings(settings: config::Config) -> Result<Self> {
        let config: Config = settings.try_deserialize()?;
        config.validate()?;
        Ok(config)
    }

    /// Reject configurations that would make every request fail.
    pub fn validate(&self) -> Result<()> {
        let missing: Vec<&str> = [
            ("SUPABASE_URL", &self.supabase_url),
            ("SUPABASE_ANON_KEY", &self.supabase_anon_key),
            ("OPENAI_API_KEY", &self.openai_api_key),
        ]
        .into_iter()
        .filter(|(_, value)| value.trim().is_empty())
        .map(|(name, _)| name)
        .collect();

        if !missing.is_empty() {
            return Err(ApiError::Configuration(format!(
                "Missing required environment variables: {}",
                missing.join(", ")
            )));
        }

        if !(-1.0..=1.0).contains(&self.match_threshold) {
            return Err(ApiError::Configuration(format!(
                "MATCH_THRESHOLD must be within [-1, 1], got {}",
                self.match_threshold
            )));
        }
        if self.match_count == 0 {
            return Err(ApiError::Configuration(
                "MATCH_COUNT must be at least 1".to_string(),
            ));
        }
        if self.max_recommendations == 0 {
            return Err(ApiError::Configuration(
                "MAX_RECOMMENDATIONS must be at least 1".to_string(),
            ));
        }
        if !(0.0..=2.0).contains(&self.temperature) {
            return Err(ApiError::Configuration(format!(
                "TEMPERATURE must be within [0, 2], got {}",
                self.temperature
            )));
        }

        Ok(())
    }
}

/// Fully populated configuration pointing at an unroutable local port.
#[cfg(test)]
pub(crate) fn test_config() -> Config {
    Config {
        host: "127.0.0.1".to_string(),
        port: 0,
        supabase_url: "http://127.0.0.1:9".to_string(),
        supabase_anon_key: "anon".to_string(),
        openai_api_key: "sk-test".to_string(),
        openai_base_url: "http://127.0.0.1:9/v1/".to_string(),
        embedding_model: DEFAULT_EMBEDDING_MODEL.to_string(),
        embedding_dimensions: 1536,
        chat_model: DEFAULT_CHAT_MODEL.to_string(),
        temperature: 0.7,
        match_function: "match_island_chunks".to_string(),
        chunks_table: "island_chunks".to_string(),
        match_threshold: 0.75,
        match_count: 3,
        max_recommendations: 3,
        request_timeout_secs: 1,
        connect_timeout_secs: 1,
    }
}
