use crate::models::RetrievalMatch;
use crate::services::supabase::{ChunkStore, StoreError};
use std::cmp::Ordering;
use std::sync::Arc;
use tracing::{debug, warn};

/// Nearest-neighbour lookup over pre-embedded island chunks.
///
/// The store is trusted to do the heavy lifting, but its output is normalised
/// here so callers always get at most `match_count` rows, all at or above
/// `match_threshold`, most similar first.
#[derive(Clone)]
pub struct VectorRetriever {
    store: Arc<dyn ChunkStore>,
}

impl VectorRetriever {
    pub fn new(store: Arc<dyn ChunkStore>) -> Self {
        Self { store }
    }

    pub async fn retrieve(
        &self,
        query: &[f32],
        match_threshold: f32,
        match_count: usize,
    ) -> Result<Vec<RetrievalMatch>, StoreError> {
        if match_count == 0 {
            return Ok(Vec::new());
        }

        let rows = self
            .store
            .match_chunks(query, match_threshold, match_count)
            .await?;
        let returned = rows.len();

        let matches = rank_matches(rows, match_threshold, match_count);
        if matches.len() < returned {
            warn!(
                "Store returned {} rows, kept {} after threshold/limit",
                returned,
                matches.len()
            );
        }
        debug!(
            "Retrieved chunks: {:?}",
            matches
                .iter()
                .map(|m| (m.destination.as_str(), m.similarity))
                .collect::<Vec<_>>()
        );

        Ok(matches)
    }
}

fn rank_matches(
    mut rows: Vec<RetrievalMatch>,
    match_threshold: f32,
    match_count: usize,
) -> Vec<RetrievalMatch> {
    rows.retain(|m| m.similarity.is_finite() && m.similarity >= match_threshold);
    rows.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(Ordering::Equal)
            .then_with(|| a.destination.cmp(&b.destination))
            .then_with(|| a.chunk_text.cmp(&b.chunk_text))
    });
    rows.truncate(match_count);
    rows
}
