use serde::{Deserialize, Serialize};
use std::fmt;

pub type EmbeddingVector = Vec<f32>;

/// How fancy the traveller wants their stay to be, bucketed from the 1-10 scale.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LuxuryTier {
    Rustic,
    Comfortable,
    Luxurious,
}

impl LuxuryTier {
    pub fn from_scale(scale: u8) -> Self {
        match scale {
            0..=3 => LuxuryTier::Rustic,
            4..=7 => LuxuryTier::Comfortable,
            _ => LuxuryTier::Luxurious,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            LuxuryTier::Rustic => "rustic",
            LuxuryTier::Comfortable => "comfortable",
            LuxuryTier::Luxurious => "luxurious",
        }
    }
}

impl fmt::Display for LuxuryTier {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Validated travel preferences for a single request.
///
/// Only constructed through `RecommendationRequest::into_preferences`, which
/// guarantees a scale in `[1, 10]`, a non-blank vibe and at least one interest.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct UserPreferences {
    luxury_scale: u8,
    vibe: String,
    interests: Vec<String>,
}

impl UserPreferences {
    pub(crate) fn new(luxury_scale: u8, vibe: String, interests: Vec<String>) -> Self {
        Self {
            luxury_scale,
            vibe,
            interests,
        }
    }

    pub fn luxury_scale(&self) -> u8 {
        self.luxury_scale
    }

    pub fn luxury_tier(&self) -> LuxuryTier {
        LuxuryTier::from_scale(self.luxury_scale)
    }

    pub fn vibe(&self) -> &str {
        &self.vibe
    }

    pub fn interests(&self) -> &[String] {
        &self.interests
    }
}

/// A chunk row as returned by the similarity search procedure.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RetrievalMatch {
    pub destination: String,
    pub chunk_text: String,
    pub similarity: f32,
}

/// A chunk ready to be persisted by the ingestion job.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NewChunk {
    pub destination: String,
    pub chunk_text: String,
    pub embedding: EmbeddingVector,
}

/// Source record read by the ingestion job.
#[derive(Debug, Clone, Deserialize)]
pub struct IslandDescription {
    pub destination: String,
    #[serde(default)]
    pub description: Option<String>,
}

/// One recommended destination, as rendered by the UI.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RecommendationItem {
    pub country_name: String,
    pub desc: String,
    pub country_continent_location: String,
}
