//! Head-to-head tracking
//!
//! Weighted wins per surface and weighted games won, for every ordered pair
//! of players. Tables are asymmetric: `(a, b)` holds what `a` achieved
//! against `b`.

use std::collections::HashMap;

use crate::features::time_weight::UpdateWeights;
use crate::{PlayerId, Surface};

/// What one player achieved against one opponent
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PairAggregate {
    pub wins_on_surface: [i64; Surface::COUNT],
    pub games_won: i64,
}

impl PairAggregate {
    /// Wins over all surfaces
    pub fn wins(&self) -> i64 {
        self.wins_on_surface.iter().sum()
    }
}

/// Pairwise statistics for all players
#[derive(Debug, Clone, Default)]
pub struct HeadToHeadStore {
    /// (player, opponent) -> aggregate
    pairs: HashMap<(PlayerId, PlayerId), PairAggregate>,
}

impl HeadToHeadStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a pre-computed snapshot
    pub fn from_pairs(pairs: HashMap<(PlayerId, PlayerId), PairAggregate>) -> Self {
        HeadToHeadStore { pairs }
    }

    /// What `a` achieved against `b`
    pub fn get(&self, a: PlayerId, b: PlayerId) -> PairAggregate {
        self.pairs.get(&(a, b)).copied().unwrap_or_default()
    }

    /// Weighted wins of `a` over `b` minus those of `b` over `a`
    pub fn get_mutual_wins(&self, a: PlayerId, b: PlayerId) -> i64 {
        self.get(a, b).wins() - self.get(b, a).wins()
    }

    /// Same as [`get_mutual_wins`](Self::get_mutual_wins), on one surface
    pub fn get_mutual_surface_wins(&self, a: PlayerId, b: PlayerId, surface: Surface) -> i64 {
        let idx = surface.index();
        self.get(a, b).wins_on_surface[idx] - self.get(b, a).wins_on_surface[idx]
    }

    /// Weighted games won by `a` against `b` minus the reverse
    pub fn get_mutual_games(&self, a: PlayerId, b: PlayerId) -> i64 {
        self.get(a, b).games_won - self.get(b, a).games_won
    }

    /// Update tables after a match (call AFTER reading features)
    pub fn apply_outcome(
        &mut self,
        winner: PlayerId,
        loser: PlayerId,
        surface: Surface,
        weights: &UpdateWeights,
        winner_games: u32,
        loser_games: u32,
    ) {
        let forward = self.pairs.entry((winner, loser)).or_default();
        forward.wins_on_surface[surface.index()] += weights.decay();
        forward.games_won += weights.games(winner_games);

        let backward = self.pairs.entry((loser, winner)).or_default();
        backward.games_won += weights.games(loser_games);
    }

    /// Add raw weighted wins, used when seeding
    pub fn add_wins(&mut self, a: PlayerId, b: PlayerId, surface: Surface, wins: i64) {
        self.pairs.entry((a, b)).or_default().wins_on_surface[surface.index()] += wins;
    }

    /// Add raw weighted games, used when seeding
    pub fn add_games(&mut self, a: PlayerId, b: PlayerId, games: i64) {
        self.pairs.entry((a, b)).or_default().games_won += games;
    }

    /// Number of ordered pairs with any history
    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    pub fn all(&self) -> &HashMap<(PlayerId, PlayerId), PairAggregate> {
        &self.pairs
    }
}
