//! Feature extraction for a single match
//!
//! Reads every store as it stands before the match and assembles the
//! winner-oriented feature vector.

use crate::features::head_to_head::HeadToHeadStore;
use crate::features::player_stats::PlayerStatStore;
use crate::features::ranking::RankingLookup;
use crate::features::recent_form::RecentFormWindow;
use crate::features::venue::TourneyDirectory;
use crate::{Climate, MatchRecord};

/// Numeric features of one match, oriented from player 1's point of view
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct MatchFeatures {
    /// Total win ratio difference, scaled by base weight
    pub rel_total_wins: i64,
    /// Surface win ratio difference, scaled by base weight
    pub rel_surface_wins: i64,
    /// Weighted head-to-head wins difference
    pub mutual_wins: i64,
    /// Weighted head-to-head wins difference on this surface
    pub mutual_surface_wins: i64,
    /// Weighted head-to-head games difference
    pub mutual_games: i64,
    /// Rank difference (negative = player 1 ranked better)
    pub rank_diff: i64,
    /// Difference of one-year ranking points gains
    pub points_grad_diff: i64,
    /// +1 player 1 at home, -1 player 2 at home
    pub home_advantage: i64,
    /// Climate win ratio difference, scaled by base weight
    pub rel_climate_wins: i64,
    /// Recent-window win ratio difference, scaled by base weight
    pub rel_recent_wins: i64,
    /// Games won earlier in this tournament, difference
    pub rel_tourney_games: i64,
    /// Age difference in years
    pub age_diff: f64,
    /// 1 if player 1 won, -1 otherwise
    pub outcome: i64,
}

impl MatchFeatures {
    /// The same match seen from the other player's side. `None` when a value
    /// cannot be negated (integer overflow, non-finite age difference).
    pub fn negated(&self) -> Option<Self> {
        if !self.age_diff.is_finite() {
            return None;
        }
        Some(MatchFeatures {
            rel_total_wins: self.rel_total_wins.checked_neg()?,
            rel_surface_wins: self.rel_surface_wins.checked_neg()?,
            mutual_wins: self.mutual_wins.checked_neg()?,
            mutual_surface_wins: self.mutual_surface_wins.checked_neg()?,
            mutual_games: self.mutual_games.checked_neg()?,
            rank_diff: self.rank_diff.checked_neg()?,
            points_grad_diff: self.points_grad_diff.checked_neg()?,
            home_advantage: self.home_advantage.checked_neg()?,
            rel_climate_wins: self.rel_climate_wins.checked_neg()?,
            rel_recent_wins: self.rel_recent_wins.checked_neg()?,
            rel_tourney_games: self.rel_tourney_games.checked_neg()?,
            age_diff: -self.age_diff,
            outcome: self.outcome.checked_neg()?,
        })
    }
}

/// Read-only view over all stores for feature computation
pub struct FeatureExtractor<'a> {
    pub player_stats: &'a PlayerStatStore,
    pub head_to_head: &'a HeadToHeadStore,
    pub rankings: &'a RankingLookup,
    pub recent_form: &'a RecentFormWindow,
    pub tourneys: &'a TourneyDirectory,
    pub base_weight: i64,
}

impl<'a> FeatureExtractor<'a> {
    fn scale(&self, ratio: f64) -> i64 {
        (self.base_weight as f64 * ratio).round() as i64
    }

    /// Compute features for a match (call BEFORE updating any store)
    pub fn extract(&self, record: &MatchRecord, climate: Climate) -> MatchFeatures {
        let winner = record.winner;
        let loser = record.loser;

        let (rank_diff, points_grad_diff) =
            self.rankings.get_ranking_deltas(winner, loser, record.date);

        MatchFeatures {
            rel_total_wins: self.scale(self.player_stats.get_relative_total_wins(winner, loser)),
            rel_surface_wins: self.scale(self.player_stats.get_relative_surface_wins(
                winner,
                loser,
                record.surface,
            )),
            mutual_wins: self.head_to_head.get_mutual_wins(winner, loser),
            mutual_surface_wins: self
                .head_to_head
                .get_mutual_surface_wins(winner, loser, record.surface),
            mutual_games: self.head_to_head.get_mutual_games(winner, loser),
            rank_diff,
            points_grad_diff,
            home_advantage: self.tourneys.home_advantage(record),
            rel_climate_wins: self.scale(
                self.player_stats
                    .get_relative_climate_wins(winner, loser, climate),
            ),
            rel_recent_wins: self.scale(
                self.recent_form
                    .get_recent_performance(winner, loser, record.date),
            ),
            rel_tourney_games: self.recent_form.get_tournament_progress(
                winner,
                loser,
                &record.tourney_id,
                record.match_num,
            ),
            age_diff: record.age_diff(),
            outcome: 1,
        }
    }
}
