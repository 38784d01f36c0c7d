//! Per-player conditional statistics
//!
//! Time-weighted win/loss counters per player: overall, per surface and per
//! climate bucket.

use std::collections::HashMap;

use crate::{Climate, PlayerId, Surface};

/// Weighted win and loss counters
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WinLoss {
    pub wins: i64,
    pub losses: i64,
}

impl WinLoss {
    pub fn new(wins: i64, losses: i64) -> Self {
        WinLoss { wins, losses }
    }

    pub fn played(&self) -> i64 {
        self.wins + self.losses
    }

    /// Win ratio (0-1), 0 when nothing has been played
    pub fn win_ratio(&self) -> f64 {
        let played = self.played();
        if played == 0 {
            0.0
        } else {
            self.wins as f64 / played as f64
        }
    }

    fn add(&mut self, outcome: Outcome, weight: i64) {
        match outcome {
            Outcome::Win => self.wins += weight,
            Outcome::Loss => self.losses += weight,
        }
    }
}

/// Side of a result from one player's point of view
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Win,
    Loss,
}

/// Aggregated statistics for one player
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlayerAggregate {
    pub total: WinLoss,
    pub surface: [WinLoss; Surface::COUNT],
    pub climate: [WinLoss; Climate::COUNT],
}

impl PlayerAggregate {
    pub fn on_surface(&self, surface: Surface) -> WinLoss {
        self.surface[surface.index()]
    }

    pub fn in_climate(&self, climate: Climate) -> WinLoss {
        self.climate[climate.index()]
    }

    /// Record one result. Totals use the level weight, the conditional
    /// counters use the plain decay weight.
    pub fn record(
        &mut self,
        outcome: Outcome,
        surface: Surface,
        climate: Climate,
        decay_weight: i64,
        level_weight: i64,
    ) {
        self.total.add(outcome, level_weight);
        self.surface[surface.index()].add(outcome, decay_weight);
        self.climate[climate.index()].add(outcome, decay_weight);
    }
}

/// Conditional statistics for every player seen so far
#[derive(Debug, Clone, Default)]
pub struct PlayerStatStore {
    stats: HashMap<PlayerId, PlayerAggregate>,
}

impl PlayerStatStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Start from a pre-computed snapshot
    pub fn from_aggregates(stats: HashMap<PlayerId, PlayerAggregate>) -> Self {
        PlayerStatStore { stats }
    }

    /// Get statistics for a player, or empty ones if never seen
    pub fn get(&self, player: PlayerId) -> PlayerAggregate {
        self.stats.get(&player).cloned().unwrap_or_default()
    }

    /// Winner's total win ratio minus loser's
    pub fn get_relative_total_wins(&self, winner: PlayerId, loser: PlayerId) -> f64 {
        self.relative(winner, loser, |agg| agg.total)
    }

    /// Winner's win ratio on `surface` minus loser's
    pub fn get_relative_surface_wins(
        &self,
        winner: PlayerId,
        loser: PlayerId,
        surface: Surface,
    ) -> f64 {
        self.relative(winner, loser, |agg| agg.on_surface(surface))
    }

    /// Winner's win ratio in `climate` minus loser's
    pub fn get_relative_climate_wins(
        &self,
        winner: PlayerId,
        loser: PlayerId,
        climate: Climate,
    ) -> f64 {
        self.relative(winner, loser, |agg| agg.in_climate(climate))
    }

    fn relative<F>(&self, winner: PlayerId, loser: PlayerId, select: F) -> f64
    where
        F: Fn(&PlayerAggregate) -> WinLoss,
    {
        let ratio = |player: PlayerId| {
            self.stats
                .get(&player)
                .map(|agg| select(agg).win_ratio())
                .unwrap_or(0.0)
        };
        ratio(winner) - ratio(loser)
    }

    /// Update statistics after a match (call AFTER reading features)
    pub fn apply_outcome(
        &mut self,
        winner: PlayerId,
        loser: PlayerId,
        surface: Surface,
        climate: Climate,
        decay_weight: i64,
        level_weight: i64,
    ) {
        self.stats.entry(winner).or_default().record(
            Outcome::Win,
            surface,
            climate,
            decay_weight,
            level_weight,
        );
        self.stats.entry(loser).or_default().record(
            Outcome::Loss,
            surface,
            climate,
            decay_weight,
            level_weight,
        );
    }

    /// Number of players with statistics
    pub fn len(&self) -> usize {
        self.stats.len()
    }

    pub fn is_empty(&self) -> bool {
        self.stats.is_empty()
    }

    /// All player statistics
    pub fn all(&self) -> &HashMap<PlayerId, PlayerAggregate> {
        &self.stats
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_players_are_neutral() {
        let mut store = PlayerStatStore::new();
        store.apply_outcome(PlayerId(1), PlayerId(2), Surface::Clay, Climate::Dry, 10, 10);

        // Neither player 3 nor 4 has played
        assert_eq!(store.get_relative_total_wins(PlayerId(3), PlayerId(4)), 0.0);
        assert_eq!(
            store.get_relative_surface_wins(PlayerId(3), PlayerId(4), Surface::Grass),
            0.0
        );
        // Player 1 only ever won; player 3 has no matches and counts as 0
        assert_eq!(store.get_relative_total_wins(PlayerId(1), PlayerId(3)), 1.0);
    }

    #[test]
    fn test_apply_outcome_splits_weights() {
        let mut store = PlayerStatStore::new();
        store.apply_outcome(PlayerId(1), PlayerId(2), Surface::Grass, Climate::Tropical, 90, 45);

        let winner = store.get(PlayerId(1));
        assert_eq!(winner.total, WinLoss::new(45, 0));
        assert_eq!(winner.on_surface(Surface::Grass), WinLoss::new(90, 0));
        assert_eq!(winner.in_climate(Climate::Tropical), WinLoss::new(90, 0));
        assert_eq!(winner.on_surface(Surface::Clay), WinLoss::default());

        let loser = store.get(PlayerId(2));
        assert_eq!(loser.total, WinLoss::new(0, 45));
        assert_eq!(loser.on_surface(Surface::Grass), WinLoss::new(0, 90));
    }

    #[test]
    fn test_relative_ratios() {
        let mut store = PlayerStatStore::new();
        // Player 1: 3 wins, 1 loss on clay
        for opp in 10..13 {
            store.apply_outcome(PlayerId(1), PlayerId(opp), Surface::Clay, Climate::Tempered, 1, 1);
        }
        store.apply_outcome(PlayerId(20), PlayerId(1), Surface::Clay, Climate::Tempered, 1, 1);
        // Player 2: 1 win, 1 loss on hard
        store.apply_outcome(PlayerId(2), PlayerId(30), Surface::Hard, Climate::Dry, 1, 1);
        store.apply_outcome(PlayerId(31), PlayerId(2), Surface::Hard, Climate::Dry, 1, 1);

        let total = store.get_relative_total_wins(PlayerId(1), PlayerId(2));
        assert!((total - 0.25).abs() < 1e-12);

        let clay = store.get_relative_surface_wins(PlayerId(1), PlayerId(2), Surface::Clay);
        assert!((clay - 0.75).abs() < 1e-12);

        let dry = store.get_relative_climate_wins(PlayerId(1), PlayerId(2), Climate::Dry);
        assert!((dry + 0.5).abs() < 1e-12);
    }
}
