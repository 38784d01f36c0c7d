//! Collaborator interfaces
//!
//! The processor only talks to archives, seed stores and sinks through these
//! traits.

use std::collections::{HashMap, HashSet};
use std::ops::RangeInclusive;

use crate::data::dataset::NormalizedDataset;
use crate::features::{HeadToHeadStore, PlayerAggregate, PlayerStatStore, RankingPoint, TourneyInfo};
use crate::{MatchRecord, PlayerId, Result, Surface};

/// Inclusive range of seasons
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub from: i32,
    pub to: i32,
}

impl YearRange {
    pub fn new(from: i32, to: i32) -> Self {
        YearRange { from, to }
    }

    pub fn years(&self) -> RangeInclusive<i32> {
        self.from..=self.to
    }

    /// The single season before this range
    pub fn previous(&self) -> Self {
        YearRange::new(self.from - 1, self.from - 1)
    }
}

/// Source of match records
pub trait MatchSource {
    /// Matches of the given seasons, optionally restricted to matches with at
    /// least one player from `player_ids`
    fn load_matches(
        &self,
        years: YearRange,
        player_ids: Option<&HashSet<PlayerId>>,
    ) -> Result<Vec<MatchRecord>>;
}

/// Source of the full ranking history
pub trait RankingSource {
    fn load_rankings(&self) -> Result<Vec<RankingPoint>>;
}

/// Source of tournament metadata
pub trait TourneySource {
    fn load_tourneys(&self) -> Result<Vec<TourneyInfo>>;
}

/// Source of the pre-computed aggregate tables
pub trait SeedSource {
    fn load_seed(&self) -> Result<SeedSnapshot>;
}

/// Destination for the finished dataset
pub trait DatasetSink {
    /// Persist the dataset, returning the number of rows written
    fn write_dataset(&mut self, dataset: &NormalizedDataset) -> Result<usize>;
}

/// Every player that appears in the given matches
pub fn extract_player_ids(matches: &[MatchRecord]) -> HashSet<PlayerId> {
    let players: HashSet<PlayerId> = matches
        .iter()
        .flat_map(|m| [m.winner, m.loser])
        .collect();
    log::info!("Players loaded, number of players: {}", players.len());
    players
}

/// Starting state of the statistics stores
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SeedSnapshot {
    /// Per surface: (player, opponent) -> weighted wins of player over opponent
    pub mutual_wins: [HashMap<(PlayerId, PlayerId), i64>; Surface::COUNT],
    /// (player, opponent) -> weighted games won by player against opponent
    pub mutual_games: HashMap<(PlayerId, PlayerId), i64>,
    /// Conditional win/loss statistics per player
    pub cond_stats: HashMap<PlayerId, PlayerAggregate>,
}

impl SeedSnapshot {
    pub fn is_empty(&self) -> bool {
        self.mutual_wins.iter().all(HashMap::is_empty)
            && self.mutual_games.is_empty()
            && self.cond_stats.is_empty()
    }

    /// Build the player and head-to-head stores from this snapshot
    pub fn into_stores(self) -> (PlayerStatStore, HeadToHeadStore) {
        let mut head_to_head = HeadToHeadStore::new();
        for surface in Surface::ALL {
            for (&(a, b), &wins) in &self.mutual_wins[surface.index()] {
                head_to_head.add_wins(a, b, surface, wins);
            }
        }
        for (&(a, b), &games) in &self.mutual_games {
            head_to_head.add_games(a, b, games);
        }

        (PlayerStatStore::from_aggregates(self.cond_stats), head_to_head)
    }
}
