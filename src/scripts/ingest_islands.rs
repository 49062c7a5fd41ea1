use crate::{
    config::Config,
    ml::{Embedder, OpenAiEmbedder},
    models::{IslandDescription, NewChunk},
    services::{build_http_client, supabase::StoreError, ChunkStore, SupabaseClient, TextSplitter},
};
use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use std::{fs, path::Path};

pub const DEFAULT_DATA_FILE: &str = "islands_data.json";

/// Totals reported at the end of an ingestion run.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct IngestionSummary {
    pub destinations: usize,
    pub skipped_destinations: usize,
    pub chunks_created: usize,
    pub chunks_embedded: usize,
    pub chunks_stored: usize,
    pub failed_inserts: usize,
}

/// A destination whose description has already been chunked.
#[derive(Debug, Clone, PartialEq, Eq)]
struct ChunkedIsland {
    destination: String,
    chunks: Vec<String>,
}

fn load_records(path: &Path) -> anyhow::Result<Vec<IslandDescription>> {
    let raw = fs::read_to_string(path)
        .with_context(|| format!("Failed to read {}", path.display()))?;
    serde_json::from_str(&raw)
        .with_context(|| format!("{} is not an array of island descriptions", path.display()))
}

fn chunk_records(
    records: Vec<IslandDescription>,
    splitter: &TextSplitter,
    summary: &mut IngestionSummary,
) -> Vec<ChunkedIsland> {
    records
        .into_iter()
        .filter_map(|record| {
            let destination = record.destination.trim().to_string();
            let description = record
                .description
                .as_deref()
                .map(str::trim)
                .filter(|d| !d.is_empty());

            let Some(description) = description else {
                warn!("⚠️  Skipping '{}': no description", destination);
                summary.skipped_destinations += 1;
                return None;
            };

            let chunks = splitter.split_text(description);
            summary.chunks_created += chunks.len();
            Some(ChunkedIsland {
                destination,
                chunks,
            })
        })
        .collect()
}

fn progress_bar(len: usize) -> ProgressBar {
    let bar = ProgressBar::new(len as u64);
    bar.set_style(
        ProgressStyle::default_bar()
            .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}")
            .progress_chars("#>-"),
    );
    bar
}

fn log_insert_failure(destination: &str, err: &StoreError) {
    match err {
        StoreError::Api { status, body } => {
            let details = body.details.as_deref().or(body.message.as_deref());
            error!(
                "❌ Failed to store chunks for {} ({}): code={} details={}",
                destination,
                status,
                body.code.as_deref().unwrap_or("none"),
                details.unwrap_or("none")
            )
        }
        other => error!("❌ Failed to store chunks for {}: {}", destination, other),
    }
}

async fn store_islands(
    islands: Vec<ChunkedIsland>,
    embedder: &dyn Embedder,
    store: &dyn ChunkStore,
    summary: &mut IngestionSummary,
) {
    let bar = progress_bar(summary.chunks_created);

    for island in islands {
        bar.set_message(island.destination.clone());
        let mut rows = Vec::with_capacity(island.chunks.len());

        for (index, chunk) in island.chunks.into_iter().enumerate() {
            match embedder.embed(&chunk).await {
                Ok(embedding) => rows.push(NewChunk {
                    destination: island.destination.clone(),
                    chunk_text: chunk,
                    embedding,
                }),
                Err(e) => error!(
                    "❌ Failed to embed chunk {} of {}: {}",
                    index + 1,
                    island.destination,
                    e
                ),
            }
            bar.inc(1);
        }

        summary.destinations += 1;
        summary.chunks_embedded += rows.len();
        if rows.is_empty() {
            warn!("⚠️  No chunks embedded for {}", island.destination);
            continue;
        }

        match store.insert_chunks(&rows).await {
            Ok(()) => summary.chunks_stored += rows.len(),
            Err(e) => {
                summary.failed_inserts += 1;
                log_insert_failure(&island.destination, &e);
            }
        }
    }

    bar.finish_with_message("done");
}

/// Chunks, embeds and stores every island description in `path`.
pub async fn ingest_islands(config: &Config, path: &Path) -> anyhow::Result<IngestionSummary> {
    info!("🚀 Starting island ingestion...");
    info!("📁 Data file: {}", path.display());

    let records = load_records(path)?;
    info!("📖 Loaded {} island records", records.len());

    let client = build_http_client(config)?;
    let embedder = OpenAiEmbedder::new(client.clone(), config);
    let store = SupabaseClient::new(client, config);

    let mut summary = IngestionSummary::default();
    let islands = chunk_records(records, &TextSplitter::default(), &mut summary);
    if islands.is_empty() {
        warn!("⚠️  No island descriptions to ingest");
        return Ok(summary);
    }

    store_islands(islands, &embedder, &store, &mut summary).await;

    info!("🎉 Ingestion complete!");
    info!("================================================");
    info!("   🏝️  Destinations processed: {}", summary.destinations);
    info!("   ⏭️  Destinations skipped: {}", summary.skipped_destinations);
    info!("   ✂️  Chunks created: {}", summary.chunks_created);
    info!("   🧮 Chunks embedded: {}", summary.chunks_embedded);
    info!("   ✅ Chunks stored: {}", summary.chunks_stored);
    info!("================================================");

    if summary.failed_inserts > 0 {
        warn!(
            "⚠️  {} destinations failed to store. Consider re-running the ingestion.",
            summary.failed_inserts
        );
    }

    Ok(summary)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::ml::{EmbeddingError, MockEmbedder};
    use crate::services::supabase::{MockChunkStore, PostgrestError};

    fn record(destination: &str, description: Option<&str>) -> IslandDescription {
        IslandDescription {
            destination: destination.to_string(),
            description: description.map(str::to_string),
        }
    }

    #[test]
    fn test_load_records() {
        let path = std::env::temp_dir().join(format!("islands-{}.json", uuid::Uuid::new_v4()));
        fs::write(
            &path,
            r#"[{"destination": "Fiji", "description": "Reefs."}, {"destination": "Tonga"}]"#,
        )
        .unwrap();

        let records = load_records(&path).unwrap();
        fs::remove_file(&path).ok();

        assert_eq!(records.len(), 2);
        assert_eq!(records[0].description.as_deref(), Some("Reefs."));
        assert!(records[1].description.is_none());
    }

    #[test]
    fn test_load_records_rejects_object() {
        let path = std::env::temp_dir().join(format!("islands-{}.json", uuid::Uuid::new_v4()));
        fs::write(&path, r#"{"destination": "Fiji"}"#).unwrap();

        let result = load_records(&path);
        fs::remove_file(&path).ok();

        assert!(result.is_err());
    }

    #[test]
    fn test_blank_descriptions_are_skipped() {
        let mut summary = IngestionSummary::default();
        let islands = chunk_records(
            vec![
                record("Fiji", Some("Coral reefs and kava ceremonies.")),
                record("Tonga", None),
                record("Samoa", Some("   ")),
            ],
            &TextSplitter::default(),
            &mut summary,
        );

        assert_eq!(islands.len(), 1);
        assert_eq!(islands[0].destination, "Fiji");
        assert_eq!(summary.skipped_destinations, 2);
        assert_eq!(summary.chunks_created, 1);
    }

    #[tokio::test]
    async fn test_failed_embeddings_are_skipped() {
        let islands = vec![ChunkedIsland {
            destination: "Fiji".to_string(),
            chunks: vec!["good".to_string(), "bad".to_string()],
        }];
        let mut embedder = MockEmbedder::new();
        embedder.expect_embed().returning(|text| {
            if text == "bad" {
                Err(EmbeddingError::EmptyResponse)
            } else {
                Ok(vec![0.5; 4])
            }
        });
        let mut store = MockChunkStore::new();
        store
            .expect_insert_chunks()
            .withf(|rows| rows.len() == 1 && rows[0].chunk_text == "good")
            .times(1)
            .returning(|_| Ok(()));

        let mut summary = IngestionSummary {
            chunks_created: 2,
            ..Default::default()
        };
        store_islands(islands, &embedder, &store, &mut summary).await;

        assert_eq!(summary.chunks_embedded, 1);
        assert_eq!(summary.chunks_stored, 1);
    }

    #[tokio::test]
    async fn test_insert_failure_does_not_stop_run() {
        let islands = vec![
            ChunkedIsland {
                destination: "Fiji".to_string(),
                chunks: vec!["reefs".to_string()],
            },
            ChunkedIsland {
                destination: "Bali".to_string(),
                chunks: vec!["temples".to_string(), "rice terraces".to_string()],
            },
        ];
        let mut embedder = MockEmbedder::new();
        embedder.expect_embed().returning(|_| Ok(vec![0.5; 4]));
        let mut store = MockChunkStore::new();
        store
            .expect_insert_chunks()
            .times(2)
            .returning(|rows| match rows[0].destination.as_str() {
                "Fiji" => Err(StoreError::Api {
                    status: 409,
                    body: PostgrestError {
                        code: Some("23505".to_string()),
                        ..Default::default()
                    },
                }),
                _ => Ok(()),
            });

        let mut summary = IngestionSummary {
            chunks_created: 3,
            ..Default::default()
        };
        store_islands(islands, &embedder, &store, &mut summary).await;

        assert_eq!(summary.destinations, 2);
        assert_eq!(summary.failed_inserts, 1);
        assert_eq!(summary.chunks_stored, 2);
    }
}
