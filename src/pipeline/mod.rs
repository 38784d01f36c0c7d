//! Match processing pipeline
//!
//! Loads everything the processor needs, then folds the sorted match stream
//! into feature rows.

pub mod processor;

pub use processor::{MatchProcessor, ProcessorSettings, ProcessorState};

use crate::data::sources::{
    extract_player_ids, MatchSource, RankingSource, SeedSnapshot, SeedSource, TourneySource,
    YearRange,
};
use crate::features::{RankingLookup, TourneyDirectory};
use crate::{Config, MatchRecord, Result};

/// Everything a processor run consumes
#[derive(Debug, Clone, Default)]
pub struct ProcessorInputs {
    /// Matches of the processed seasons
    pub matches: Vec<MatchRecord>,
    /// Previous season, used to pre-fill the recent form window
    pub warmup: Vec<MatchRecord>,
    pub rankings: RankingLookup,
    pub tourneys: TourneyDirectory,
    pub seed: SeedSnapshot,
}

/// Load the match stream, warm-up matches, rankings, tournaments and seed
pub fn load_inputs<A, S>(config: &Config, archive: &A, seed: &S) -> Result<ProcessorInputs>
where
    A: MatchSource + RankingSource + TourneySource + Sync,
    S: SeedSource + ?Sized,
{
    let years = YearRange::new(config.processing.from_year, config.processing.to_year);

    let (rankings, tourneys) = rayon::join(|| archive.load_rankings(), || archive.load_tourneys());
    let rankings = RankingLookup::new(rankings?);
    let tourneys = TourneyDirectory::new(tourneys?);

    let matches = archive.load_matches(years, None)?;
    let players = extract_player_ids(&matches);
    let warmup = archive.load_matches(years.previous(), Some(&players))?;
    log::info!("Warm-up matches from {}: {}", years.previous().from, warmup.len());

    let seed = seed.load_seed()?;

    Ok(ProcessorInputs {
        matches,
        warmup,
        rankings,
        tourneys,
        seed,
    })
}
