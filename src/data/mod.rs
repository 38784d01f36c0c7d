//! Data ingestion and storage
//!
//! CSV archive readers, SQLite storage for seeds and processed datasets, and
//! the traits the processor uses to reach them.

pub mod archive;
pub mod database;
pub mod dataset;
pub mod export;
pub mod sources;

pub use archive::CsvArchive;
pub use database::{Database, DatabaseStats};
pub use dataset::{FeatureRow, NormalizedDataset};
pub use export::CsvSink;
pub use sources::{
    extract_player_ids, DatasetSink, MatchSource, RankingSource, SeedSnapshot, SeedSource,
    TourneySource, YearRange,
};
