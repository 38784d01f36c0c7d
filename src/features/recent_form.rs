//! Recent form window
//!
//! Keeps the matches of the last few months to measure short-term form and
//! progress within the running tournament.

use chrono::{Months, NaiveDate};

use crate::features::player_stats::WinLoss;
use crate::features::score::parse_score;
use crate::{MatchRecord, PlayerId};

/// A processed match as remembered by the window
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WindowEntry {
    pub date: NaiveDate,
    pub tourney_id: String,
    pub match_num: i64,
    pub winner: PlayerId,
    pub loser: PlayerId,
    pub winner_games: u32,
    pub loser_games: u32,
}

impl WindowEntry {
    pub fn from_match(record: &MatchRecord) -> Self {
        let (winner_games, loser_games) = parse_score(record.score.as_deref());
        WindowEntry {
            date: record.date,
            tourney_id: record.tourney_id.clone(),
            match_num: record.match_num,
            winner: record.winner,
            loser: record.loser,
            winner_games,
            loser_games,
        }
    }

    /// Games won by a player in this match
    pub fn games_for(&self, player: PlayerId) -> Option<u32> {
        if player == self.winner {
            Some(self.winner_games)
        } else if player == self.loser {
            Some(self.loser_games)
        } else {
            None
        }
    }
}

/// Sliding window over recently processed matches
#[derive(Debug, Clone)]
pub struct RecentFormWindow {
    span_months: u32,
    /// Date of the most recent tournament the window was advanced to
    reference: Option<NaiveDate>,
    /// Matches before this date have been dropped
    cutoff: Option<NaiveDate>,
    matches: Vec<WindowEntry>,
}

impl RecentFormWindow {
    pub fn new(span_months: u32) -> Self {
        RecentFormWindow {
            span_months,
            reference: None,
            cutoff: None,
            matches: Vec::new(),
        }
    }

    pub fn reference_date(&self) -> Option<NaiveDate> {
        self.reference
    }

    pub fn cutoff_date(&self) -> Option<NaiveDate> {
        self.cutoff
    }

    pub fn len(&self) -> usize {
        self.matches.len()
    }

    pub fn is_empty(&self) -> bool {
        self.matches.is_empty()
    }

    pub fn entries(&self) -> &[WindowEntry] {
        &self.matches
    }

    /// Move the window forward. Returns true if the reference date changed.
    pub fn advance(&mut self, new_date: NaiveDate) -> bool {
        if self.reference.is_some_and(|r| new_date <= r) {
            return false;
        }

        let cutoff = new_date
            .checked_sub_months(Months::new(self.span_months))
            .unwrap_or(NaiveDate::MIN);
        self.reference = Some(new_date);
        self.cutoff = Some(cutoff);

        let before = self.matches.len();
        self.matches.retain(|m| m.date >= cutoff);
        let dropped = before - self.matches.len();
        if dropped > 0 {
            log::debug!(
                "Recent window advanced to {}: dropped {} matches before {}",
                new_date,
                dropped,
                cutoff
            );
        }
        true
    }

    /// Add a just-processed match (call AFTER reading its features)
    pub fn append(&mut self, record: &MatchRecord) {
        self.matches.push(WindowEntry::from_match(record));
    }

    /// Pre-fill the window, e.g. with the tail of the previous season
    pub fn extend<'a>(&mut self, records: impl IntoIterator<Item = &'a MatchRecord>) {
        let cutoff = self.cutoff;
        self.matches.extend(
            records
                .into_iter()
                .filter(|r| cutoff.map_or(true, |c| r.date >= c))
                .map(WindowEntry::from_match),
        );
    }

    /// Window records of both players, gathered in one pass
    fn records_for(
        &self,
        winner: PlayerId,
        loser: PlayerId,
        as_of_date: NaiveDate,
    ) -> (WinLoss, WinLoss) {
        let mut winner_record = WinLoss::default();
        let mut loser_record = WinLoss::default();
        for m in self.matches.iter().filter(|m| m.date <= as_of_date) {
            for (player, record) in [(winner, &mut winner_record), (loser, &mut loser_record)] {
                if m.winner == player {
                    record.wins += 1;
                } else if m.loser == player {
                    record.losses += 1;
                }
            }
        }
        (winner_record, loser_record)
    }

    /// Winner's win ratio inside the window minus loser's
    pub fn get_recent_performance(
        &self,
        winner: PlayerId,
        loser: PlayerId,
        as_of_date: NaiveDate,
    ) -> f64 {
        let (winner_record, loser_record) = self.records_for(winner, loser, as_of_date);
        winner_record.win_ratio() - loser_record.win_ratio()
    }

    /// Games won so far in this tournament by the winner minus the loser
    pub fn get_tournament_progress(
        &self,
        winner: PlayerId,
        loser: PlayerId,
        tourney_id: &str,
        match_num: i64,
    ) -> i64 {
        self.matches
            .iter()
            .filter(|m| m.match_num < match_num && m.tourney_id == tourney_id)
            .map(|m| {
                let games = |player| m.games_for(player).map_or(0, i64::from);
                games(winner) - games(loser)
            })
            .sum()
    }
}
