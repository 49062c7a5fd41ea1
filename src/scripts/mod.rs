pub mod ingest_islands;

pub use ingest_islands::{ingest_islands, IngestionSummary, DEFAULT_DATA_FILE};
