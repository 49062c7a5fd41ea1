use crate::error::{ApiError, Result};
use serde::{Deserialize, Serialize};

pub use island::{
    EmbeddingVector, IslandDescription, LuxuryTier, NewChunk, RecommendationItem, RetrievalMatch,
    UserPreferences,
};

mod island;

/// Request body for island recommendations
///
/// Every field is optional at the wire level so that missing fields surface as
/// validation errors instead of opaque deserialization failures.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendationRequest {
    /// How luxurious the stay should be, from 1 (rustic) to 10 (luxurious)
    pub luxury_scale: Option<i64>,
    /// Preferred island vibe, e.g. "Beach" or "Adventure"
    pub vibe: Option<String>,
    /// Activities the traveller is interested in, in order of preference
    pub interests: Option<Vec<String>>,
}

impl RecommendationRequest {
    pub fn into_preferences(self) -> Result<UserPreferences> {
        let luxury_scale = match self.luxury_scale {
            Some(scale @ 1..=10) => scale as u8,
            Some(scale) => {
                return Err(ApiError::InvalidInput(format!(
                    "luxuryScale must be between 1 and 10, got {}",
                    scale
                )))
            }
            None => return Err(ApiError::InvalidInput("luxuryScale is required".to_string())),
        };

        let vibe = self
            .vibe
            .map(|v| v.trim().to_string())
            .filter(|v| !v.is_empty())
            .ok_or_else(|| ApiError::InvalidInput("vibe is required".to_string()))?;

        let interests: Vec<String> = self
            .interests
            .ok_or_else(|| ApiError::InvalidInput("interests is required".to_string()))?
            .into_iter()
            .map(|i| i.trim().to_string())
            .filter(|i| !i.is_empty())
            .collect();

        if interests.is_empty() {
            return Err(ApiError::InvalidInput(
                "interests must contain at least one entry".to_string(),
            ));
        }

        Ok(UserPreferences::new(luxury_scale, vibe, interests))
    }
}

/// Success envelope for island recommendations
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RecommendationResponse {
    /// Recommended islands, most relevant first; empty when nothing matched
    pub recommendation: Vec<RecommendationItem>,
    /// Friendly explanation shown when nothing matched
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Health check response structure
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HealthResponse {
    pub status: String,
    /// Current timestamp in RFC3339 format
    pub timestamp: String,
}
