//! As-of ranking lookups
//!
//! Ranking snapshots are sparse (weekly at best), so every query returns the
//! last entry at or before the requested date.

use std::collections::{BTreeMap, HashMap};

use chrono::{Months, NaiveDate};
use serde::{Deserialize, Serialize};

use crate::PlayerId;

/// One row of the ranking archive
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RankingPoint {
    pub player: PlayerId,
    pub date: NaiveDate,
    pub rank: i64,
    pub points: i64,
}

/// Read-only ranking history for all players
#[derive(Debug, Clone, Default)]
pub struct RankingLookup {
    series: HashMap<PlayerId, BTreeMap<NaiveDate, (i64, i64)>>,
    /// Rank given to players without an entry
    unranked: i64,
}

impl RankingLookup {
    /// Build the lookup. When several entries share a player and date, the
    /// first one wins.
    pub fn new(points: impl IntoIterator<Item = RankingPoint>) -> Self {
        let mut series: HashMap<PlayerId, BTreeMap<NaiveDate, (i64, i64)>> = HashMap::new();
        let mut max_rank = 0;

        for p in points {
            max_rank = max_rank.max(p.rank);
            series
                .entry(p.player)
                .or_default()
                .entry(p.date)
                .or_insert((p.rank, p.points));
        }

        log::debug!(
            "Ranking lookup built for {} players, max rank {}",
            series.len(),
            max_rank
        );

        RankingLookup {
            series,
            unranked: max_rank + 1,
        }
    }

    /// Rank assigned to players with no ranking as of a date
    pub fn unranked(&self) -> i64 {
        self.unranked
    }

    fn floor(&self, player: PlayerId, date: NaiveDate) -> Option<(i64, i64)> {
        self.series
            .get(&player)?
            .range(..=date)
            .next_back()
            .map(|(_, entry)| *entry)
    }

    /// Most recent (rank, points) at or before `date`, or (unranked, 0)
    pub fn get_rank_and_points_asof(&self, player: PlayerId, date: NaiveDate) -> (i64, i64) {
        self.floor(player, date).unwrap_or((self.unranked, 0))
    }

    fn points_year_before(&self, player: PlayerId, date: NaiveDate) -> i64 {
        date.checked_sub_months(Months::new(12))
            .and_then(|d| self.floor(player, d))
            .map(|(_, points)| points)
            .unwrap_or(0)
    }

    /// (winner rank - loser rank, winner points gain over the last year -
    /// loser points gain over the last year)
    pub fn get_ranking_deltas(
        &self,
        winner: PlayerId,
        loser: PlayerId,
        date: NaiveDate,
    ) -> (i64, i64) {
        let (winner_rank, winner_points) = self.get_rank_and_points_asof(winner, date);
        let (loser_rank, loser_points) = self.get_rank_and_points_asof(loser, date);

        let winner_grad = winner_points - self.points_year_before(winner, date);
        let loser_grad = loser_points - self.points_year_before(loser, date);

        (winner_rank - loser_rank, winner_grad - loser_grad)
    }
}
