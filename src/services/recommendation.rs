use crate::config::Config;
use crate::error::Result;
use crate::ml::{Embedder, Generator};
use crate::models::{RecommendationItem, UserPreferences};
use crate::services::classifier::{classify, PipelineFailure};
use crate::services::decoder::decode;
use crate::services::prompt::{build_prompt, query_sentence, PromptPlan};
use crate::services::retriever::VectorRetriever;
use crate::services::supabase::ChunkStore;
use std::fmt;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, error, info};
use uuid::Uuid;

/// Stages a single request moves through, in order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Stage {
    Embedding,
    Retrieving,
    Assembling,
    Generating,
    Decoding,
}

impl fmt::Display for Stage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Stage::Embedding => "embedding",
            Stage::Retrieving => "retrieving",
            Stage::Assembling => "assembling",
            Stage::Generating => "generating",
            Stage::Decoding => "decoding",
        };
        f.write_str(name)
    }
}

/// Successful end state of a pipeline run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineOutcome {
    Matched(Vec<RecommendationItem>),
    /// Retrieval found nothing relevant; generation was skipped.
    NoMatch { message: String },
}

/// Tunables read once from [`Config`].
#[derive(Debug, Clone, Copy)]
pub struct PipelineSettings {
    pub match_threshold: f32,
    pub match_count: usize,
    pub temperature: f32,
    pub max_recommendations: usize,
}

impl From<&Config> for PipelineSettings {
    fn from(config: &Config) -> Self {
        Self {
            match_threshold: config.match_threshold,
            match_count: config.match_count,
            temperature: config.temperature,
            max_recommendations: config.max_recommendations,
        }
    }
}

/// Runs embedding, retrieval, prompt assembly, generation and decoding for one
/// request. Holds no per-request state, so one instance serves every request.
#[derive(Clone)]
pub struct RecommendationPipeline {
    embedder: Arc<dyn Embedder>,
    retriever: VectorRetriever,
    generator: Arc<dyn Generator>,
    settings: PipelineSettings,
}

impl RecommendationPipeline {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        store: Arc<dyn ChunkStore>,
        generator: Arc<dyn Generator>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            embedder,
            retriever: VectorRetriever::new(store),
            generator,
            settings,
        }
    }

    /// Produces recommendations for `preferences`, or a classified error.
    pub async fn recommend(&self, preferences: &UserPreferences) -> Result<PipelineOutcome> {
        let request_id = Uuid::new_v4();
        let started = Instant::now();
        info!(
            %request_id,
            tier = %preferences.luxury_tier(),
            vibe = preferences.vibe(),
            "Starting recommendation pipeline"
        );

        match self.run(request_id, preferences).await {
            Ok(outcome) => {
                let count = match &outcome {
                    PipelineOutcome::Matched(items) => items.len(),
                    PipelineOutcome::NoMatch { .. } => 0,
                };
                info!(
                    %request_id,
                    recommendations = count,
                    elapsed_ms = started.elapsed().as_millis() as u64,
                    "Recommendation pipeline finished"
                );
                Ok(outcome)
            }
            Err((stage, failure)) => {
                let kind = classify(&failure);
                error!(
                    %request_id,
                    %stage,
                    error_type = %kind,
                    retryable = kind.is_transient(),
                    "Pipeline failed: {}",
                    failure
                );
                Err(failure.into())
            }
        }
    }

    async fn run(
        &self,
        request_id: Uuid,
        preferences: &UserPreferences,
    ) -> std::result::Result<PipelineOutcome, (Stage, PipelineFailure)> {
        let query = query_sentence(preferences);
        debug!(%request_id, stage = %Stage::Embedding, "Query sentence: {}", query);
        let embedding = self
            .embedder
            .embed(&query)
            .await
            .map_err(|e| (Stage::Embedding, PipelineFailure::from(e)))?;

        info!(
            %request_id,
            stage = %Stage::Retrieving,
            dimensions = embedding.len(),
            "Query embedded"
        );
        let matches = self
            .retriever
            .retrieve(
                &embedding,
                self.settings.match_threshold,
                self.settings.match_count,
            )
            .await
            .map_err(|e| (Stage::Retrieving, PipelineFailure::from(e)))?;

        info!(%request_id, stage = %Stage::Assembling, matches = matches.len(), "Chunks retrieved");
        let prompt = match build_prompt(&matches, preferences) {
            PromptPlan::Generate(prompt) => prompt,
            PromptPlan::NoMatch { message } => {
                info!(%request_id, "No chunks above threshold, skipping generation");
                return Ok(PipelineOutcome::NoMatch {
                    message: message.to_string(),
                });
            }
        };

        info!(%request_id, stage = %Stage::Generating, "Prompt assembled");
        let raw = self
            .generator
            .generate(&prompt, self.settings.temperature)
            .await
            .map_err(|e| (Stage::Generating, PipelineFailure::from(e)))?;

        info!(%request_id, stage = %Stage::Decoding, raw_len = raw.len(), "Reply received");
        let mut items = decode(&raw).map_err(|e| (Stage::Decoding, PipelineFailure::from(e)))?;
        items.truncate(self.settings.max_recommendations);

        Ok(PipelineOutcome::Matched(items))
    }
}
