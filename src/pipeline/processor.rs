//! Sequential match processor
//!
//! Walks the date-sorted match stream once. For each match the features are
//! read from the stores as they stand, the row is balanced and written, and
//! only then are the stores updated with the result. No row ever sees its own
//! match or any later one.

use std::collections::{BTreeMap, BTreeSet};

use crate::data::dataset::{unix_seconds, FeatureRow};
use crate::data::sources::SeedSnapshot;
use crate::features::{
    parse_score, FeatureExtractor, HeadToHeadStore, PlayerStatStore, RankingLookup,
    RecentFormWindow, TourneyDirectory, UpdateWeights,
};
use crate::pipeline::ProcessorInputs;
use crate::{Climate, Config, MatchRecord, Result, Surface, TennisError};

/// Processor lifecycle
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProcessorState {
    Init,
    ReadFeatures,
    Balance,
    WriteRow,
    UpdateStores,
    Advance,
    Done,
}

/// Settings consumed by the processor
#[derive(Debug, Clone)]
pub struct ProcessorSettings {
    pub base_weight: i64,
    /// Last processed season; time weights are measured from the year after
    pub base_year: i32,
    pub t_weights: BTreeMap<String, f64>,
    pub t_levels: BTreeMap<String, i64>,
    pub surfaces: BTreeMap<String, i64>,
    pub recent_months: u32,
    /// Log progress every this many matches (0 disables)
    pub progress_interval: usize,
}

impl ProcessorSettings {
    pub fn from_config(config: &Config) -> Self {
        ProcessorSettings {
            base_weight: config.processing.base_weight,
            base_year: config.processing.to_year,
            t_weights: config.weights.t_weights.clone(),
            t_levels: config.encoding.t_levels.clone(),
            surfaces: config.encoding.surfaces.clone(),
            recent_months: config.processing.recent_months,
            progress_interval: config.processing.progress_interval,
        }
    }

    fn surface_code(&self, surface: Surface) -> Result<i64> {
        self.surfaces.get(surface.label()).copied().ok_or_else(|| {
            TennisError::Config(format!("encoding.surfaces has no entry for '{}'", surface))
        })
    }

    fn level_code(&self, level: &str) -> Result<i64> {
        self.t_levels
            .get(level)
            .copied()
            .ok_or_else(|| TennisError::UnknownTourneyLevel(level.to_string()))
    }

    fn level_weight(&self, level: &str) -> Result<f64> {
        self.t_weights
            .get(level)
            .copied()
            .ok_or_else(|| TennisError::UnknownTourneyLevel(level.to_string()))
    }
}

impl Default for ProcessorSettings {
    fn default() -> Self {
        Self::from_config(&Config::default())
    }
}

/// Turns the match stream into balanced feature rows
pub struct MatchProcessor {
    settings: ProcessorSettings,
    state: ProcessorState,
    matches: Vec<MatchRecord>,
    warmup: Vec<MatchRecord>,
    seed: Option<SeedSnapshot>,
    rankings: RankingLookup,
    tourneys: TourneyDirectory,
    player_stats: PlayerStatStore,
    head_to_head: HeadToHeadStore,
    recent_form: RecentFormWindow,
    /// Index of the match being processed
    index: usize,
    pending: Option<FeatureRow>,
    /// Venue climate of the match being processed
    climate: Climate,
    rows: Vec<FeatureRow>,
}

impl MatchProcessor {
    pub fn new(settings: ProcessorSettings, inputs: ProcessorInputs) -> Self {
        let recent_form = RecentFormWindow::new(settings.recent_months);
        MatchProcessor {
            state: ProcessorState::Init,
            matches: inputs.matches,
            warmup: inputs.warmup,
            seed: Some(inputs.seed),
            rankings: inputs.rankings,
            tourneys: inputs.tourneys,
            player_stats: PlayerStatStore::new(),
            head_to_head: HeadToHeadStore::new(),
            recent_form,
            index: 0,
            pending: None,
            climate: Climate::default(),
            rows: Vec::new(),
            settings,
        }
    }

    pub fn state(&self) -> ProcessorState {
        self.state
    }

    pub fn player_stats(&self) -> &PlayerStatStore {
        &self.player_stats
    }

    pub fn head_to_head(&self) -> &HeadToHeadStore {
        &self.head_to_head
    }

    pub fn recent_form(&self) -> &RecentFormWindow {
        &self.recent_form
    }

    pub fn rows(&self) -> &[FeatureRow] {
        &self.rows
    }

    /// Matches in processing order (sorted once initialised)
    pub fn matches(&self) -> &[MatchRecord] {
        &self.matches
    }

    /// Final rows and stores
    pub fn into_parts(self) -> (Vec<FeatureRow>, PlayerStatStore, HeadToHeadStore) {
        (self.rows, self.player_stats, self.head_to_head)
    }

    /// Execute the current state and move to the next one
    pub fn step(&mut self) -> Result<ProcessorState> {
        self.state = match self.state {
            ProcessorState::Init => self.init()?,
            ProcessorState::ReadFeatures => self.read_features()?,
            ProcessorState::Balance => self.balance()?,
            ProcessorState::WriteRow => self.write_row(),
            ProcessorState::UpdateStores => self.update_stores()?,
            ProcessorState::Advance => self.advance(),
            ProcessorState::Done => ProcessorState::Done,
        };
        Ok(self.state)
    }

    /// Run one full match cycle. Returns the row it wrote, or `None` once the
    /// stream is exhausted.
    pub fn process_next(&mut self) -> Result<Option<FeatureRow>> {
        if self.state == ProcessorState::Init {
            self.step()?;
        }
        if self.state == ProcessorState::Done {
            return Ok(None);
        }

        let written = self.rows.len();
        loop {
            match self.step()? {
                ProcessorState::ReadFeatures | ProcessorState::Done => break,
                _ => {}
            }
        }
        Ok(self.rows.get(written).cloned())
    }

    /// Process the whole stream
    pub fn run(&mut self) -> Result<&[FeatureRow]> {
        while self.state != ProcessorState::Done {
            self.step()?;
        }
        Ok(&self.rows)
    }

    fn init(&mut self) -> Result<ProcessorState> {
        // Stable: same-day matches keep archive order
        self.matches.sort_by_key(|m| m.date);

        let levels: BTreeSet<&str> = self
            .matches
            .iter()
            .map(|m| m.tourney_level.as_str())
            .collect();
        for level in levels {
            self.settings.level_weight(level)?;
            self.settings.level_code(level)?;
        }
        for surface in Surface::ALL {
            self.settings.surface_code(surface)?;
        }

        let (player_stats, head_to_head) = self.seed.take().unwrap_or_default().into_stores();
        self.player_stats = player_stats;
        self.head_to_head = head_to_head;

        let Some(first) = self.matches.first() else {
            log::warn!("No matches to process");
            return Ok(ProcessorState::Done);
        };
        self.recent_form.advance(first.date);
        let warmup = std::mem::take(&mut self.warmup);
        self.recent_form.extend(warmup.iter());

        log::info!(
            "Processing {} matches, {} seeded players, {} warm-up matches in window",
            self.matches.len(),
            self.player_stats.len(),
            self.recent_form.len()
        );
        Ok(ProcessorState::ReadFeatures)
    }

    fn read_features(&mut self) -> Result<ProcessorState> {
        let record = &self.matches[self.index];
        self.climate = self.tourneys.climate_for(&record.tourney_name);

        let extractor = FeatureExtractor {
            player_stats: &self.player_stats,
            head_to_head: &self.head_to_head,
            rankings: &self.rankings,
            recent_form: &self.recent_form,
            tourneys: &self.tourneys,
            base_weight: self.settings.base_weight,
        };
        let features = extractor.extract(record, self.climate);

        let row = FeatureRow {
            tourney_date: unix_seconds(record.date),
            player_1: record.winner,
            player_2: record.loser,
            tourney_level: self.settings.level_code(&record.tourney_level)?,
            surface: self.settings.surface_code(record.surface)?,
            features,
        };
        self.pending = Some(row);
        Ok(ProcessorState::Balance)
    }

    /// Even rows are flipped to the loser's point of view
    fn balance(&mut self) -> Result<ProcessorState> {
        if self.index % 2 != 0 {
            return Ok(ProcessorState::WriteRow);
        }
        let Some(row) = self.pending.as_mut() else {
            return Ok(ProcessorState::WriteRow);
        };

        match row.features.negated() {
            Some(flipped) => {
                row.features = flipped;
                std::mem::swap(&mut row.player_1, &mut row.player_2);
                Ok(ProcessorState::WriteRow)
            }
            None => {
                log::error!("Cannot negate features of row {}: {:?}", self.index, row);
                Err(TennisError::StructuralInconsistency {
                    index: self.index,
                    detail: format!("features not negatable: {:?}", row.features),
                })
            }
        }
    }

    fn write_row(&mut self) -> ProcessorState {
        if let Some(row) = self.pending.take() {
            self.rows.push(row);
        }
        ProcessorState::UpdateStores
    }

    fn update_stores(&mut self) -> Result<ProcessorState> {
        let record = &self.matches[self.index];
        let weights = UpdateWeights::new(
            self.settings.base_weight,
            self.settings.base_year,
            record.date,
            self.settings.level_weight(&record.tourney_level)?,
        );
        self.player_stats.apply_outcome(
            record.winner,
            record.loser,
            record.surface,
            self.climate,
            weights.decay(),
            weights.level(),
        );

        let (winner_games, loser_games) = parse_score(record.score.as_deref());
        self.head_to_head.apply_outcome(
            record.winner,
            record.loser,
            record.surface,
            &weights,
            winner_games,
            loser_games,
        );

        self.recent_form.append(record);
        Ok(ProcessorState::Advance)
    }

    fn advance(&mut self) -> ProcessorState {
        self.index += 1;
        let total = self.matches.len();

        let interval = self.settings.progress_interval;
        if interval > 0 && self.index % interval == 0 {
            log::info!(
                "{} matches ({:.2}%) processed",
                self.index,
                100.0 * self.index as f64 / total as f64
            );
        }

        match self.matches.get(self.index) {
            Some(next) => {
                self.recent_form.advance(next.date);
                ProcessorState::ReadFeatures
            }
            None => {
                log::info!("Finished processing {} matches", total);
                ProcessorState::Done
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::RankingPoint;
    use crate::PlayerId;
    use chrono::NaiveDate;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    fn make_match(date: NaiveDate, match_num: i64, winner: i64, loser: i64) -> MatchRecord {
        MatchRecord {
            date,
            tourney_id: format!("{}-001", date.format("%Y")),
            tourney_name: "Brisbane".to_string(),
            tourney_level: "A".to_string(),
            surface: Surface::Hard,
            match_num,
            winner: PlayerId(winner),
            loser: PlayerId(loser),
            score: Some("6-4 6-4".to_string()),
            winner_age: Some(25.0),
            loser_age: Some(23.0),
            winner_country: None,
            loser_country: None,
        }
    }

    fn processor(matches: Vec<MatchRecord>) -> MatchProcessor {
        let mut settings = ProcessorSettings::default();
        settings.base_year = 2018;
        MatchProcessor::new(
            settings,
            ProcessorInputs {
                matches,
                ..Default::default()
            },
        )
    }

    #[test]
    fn test_state_sequence() {
        let mut p = processor(vec![make_match(date(2018, 1, 1), 1, 1, 2)]);
        assert_eq!(p.state(), ProcessorState::Init);
        assert_eq!(p.step().unwrap(), ProcessorState::ReadFeatures);
        assert_eq!(p.step().unwrap(), ProcessorState::Balance);
        assert_eq!(p.step().unwrap(), ProcessorState::WriteRow);
        assert_eq!(p.step().unwrap(), ProcessorState::UpdateStores);
        assert_eq!(p.step().unwrap(), ProcessorState::Advance);
        assert_eq!(p.step().unwrap(), ProcessorState::Done);
        assert_eq!(p.step().unwrap(), ProcessorState::Done);
        assert_eq!(p.rows().len(), 1);
    }

    #[test]
    fn test_empty_stream() {
        let mut p = processor(Vec::new());
        assert!(p.run().unwrap().is_empty());
        assert_eq!(p.state(), ProcessorState::Done);
        assert_eq!(p.process_next().unwrap(), None);
    }

    #[test]
    fn test_balancing_counts() {
        let matches: Vec<MatchRecord> = (0..7)
            .map(|i| make_match(date(2018, 1, 1 + i as u32), i, 10 + i, 20 + i))
            .collect();
        let mut p = processor(matches);
        let rows = p.run().unwrap();

        let negative = rows.iter().filter(|r| r.features.outcome == -1).count();
        let positive = rows.iter().filter(|r| r.features.outcome == 1).count();
        assert_eq!(negative, 4);
        assert_eq!(positive, 3);

        // Flipped rows carry the loser in slot 1
        assert_eq!(rows[0].player_1, PlayerId(20));
        assert_eq!(rows[0].player_2, PlayerId(10));
        assert_eq!(rows[0].features.age_diff, -2.0);
        assert_eq!(rows[1].player_1, PlayerId(11));
        assert_eq!(rows[1].features.age_diff, 2.0);
    }

    #[test]
    fn test_features_only_see_earlier_matches() {
        let mut p = processor(vec![
            make_match(date(2018, 3, 1), 1, 1, 2),
            make_match(date(2018, 3, 8), 1, 1, 2),
        ]);

        let first = p.process_next().unwrap().unwrap();
        // Flipped, but nothing known yet
        assert_eq!(first.features.rel_total_wins, 0);
        assert_eq!(first.features.mutual_wins, 0);
        assert_eq!(first.features.rel_recent_wins, 0);

        let second = p.process_next().unwrap().unwrap();
        assert_eq!(second.player_1, PlayerId(1));
        assert_eq!(second.features.rel_total_wins, 100);
        assert!(second.features.mutual_wins > 0);
        assert_eq!(second.features.rel_recent_wins, 100);
        assert!(second.features.mutual_games > 0);

        assert_eq!(p.process_next().unwrap(), None);
    }

    #[test]
    fn test_stream_is_sorted_by_date() {
        let mut p = processor(vec![
            make_match(date(2018, 5, 1), 1, 3, 4),
            make_match(date(2018, 2, 1), 1, 1, 2),
        ]);
        p.run().unwrap();
        assert_eq!(p.matches()[0].winner, PlayerId(1));
        // First row (flipped) belongs to the February match
        assert_eq!(p.rows()[0].player_1, PlayerId(2));
    }

    #[test]
    fn test_unknown_level_fails_before_processing() {
        let mut record = make_match(date(2018, 1, 1), 1, 1, 2);
        record.tourney_level = "X".to_string();
        let mut p = processor(vec![record]);

        let err = p.step().unwrap_err();
        assert!(matches!(err, TennisError::UnknownTourneyLevel(ref l) if l == "X"));
        assert!(p.rows().is_empty());
    }

    #[test]
    fn test_unnegatable_row_aborts() {
        let mut seed = SeedSnapshot::default();
        seed.mutual_games.insert((PlayerId(1), PlayerId(2)), i64::MIN);
        let mut p = MatchProcessor::new(
            ProcessorSettings::default(),
            ProcessorInputs {
                matches: vec![make_match(date(2018, 1, 1), 1, 1, 2)],
                seed,
                ..Default::default()
            },
        );

        let err = p.run().unwrap_err();
        assert!(matches!(err, TennisError::StructuralInconsistency { index: 0, .. }));
        assert!(p.rows().is_empty());
    }

    #[test]
    fn test_venue_climate_feeds_features_and_stores() {
        use crate::features::TourneyInfo;

        let mut first = make_match(date(2018, 3, 1), 1, 1, 2);
        first.tourney_name = "Doha".to_string();
        let mut second = make_match(date(2018, 3, 8), 1, 1, 3);
        second.tourney_name = "Brisbane".to_string();
        let mut third = make_match(date(2018, 3, 15), 1, 1, 2);
        third.tourney_name = "Doha".to_string();

        let tourneys = TourneyDirectory::new(vec![TourneyInfo {
            name: "Doha".to_string(),
            location: "Doha".to_string(),
            country: None,
            climate: Climate::Dry,
        }]);
        let mut settings = ProcessorSettings::default();
        settings.base_year = 2018;
        let mut p = MatchProcessor::new(
            settings,
            ProcessorInputs {
                matches: vec![first, second, third],
                tourneys,
                ..Default::default()
            },
        );
        let rows = p.run().unwrap().to_vec();

        let p1 = p.player_stats().get(PlayerId(1));
        assert!(p1.in_climate(Climate::Dry).wins > 0);
        assert!(p1.in_climate(Climate::Tempered).wins > 0);
        assert_eq!(p.player_stats().get(PlayerId(2)).in_climate(Climate::Tempered).losses, 0);
        assert_eq!(p.player_stats().get(PlayerId(3)).in_climate(Climate::Dry).losses, 0);

        // Third match is in Doha: only the first match counts, 1 of 1 vs 0 of 1
        assert_eq!(rows[2].features.rel_climate_wins, -100);
        // Second match in Brisbane: nothing tempered known yet
        assert_eq!(rows[1].features.rel_climate_wins, 0);
    }

    #[test]
    fn test_seed_and_rankings_are_used() {
        let mut seed = SeedSnapshot::default();
        seed.mutual_games.insert((PlayerId(1), PlayerId(2)), 250);

        let rankings = RankingLookup::new(vec![
            RankingPoint {
                player: PlayerId(1),
                date: date(2017, 12, 25),
                rank: 3,
                points: 4000,
            },
            RankingPoint {
                player: PlayerId(2),
                date: date(2017, 12, 25),
                rank: 10,
                points: 2000,
            },
        ]);

        let mut settings = ProcessorSettings::default();
        settings.base_year = 2018;
        let mut p = MatchProcessor::new(
            settings,
            ProcessorInputs {
                matches: vec![make_match(date(2018, 1, 1), 1, 1, 2)],
                rankings,
                seed,
                ..Default::default()
            },
        );

        let row = p.process_next().unwrap().unwrap();
        // Flipped: loser's point of view
        assert_eq!(row.features.mutual_games, -250);
        assert_eq!(row.features.rank_diff, 7);
        assert_eq!(row.features.points_grad_diff, -2000);
        assert_eq!(row.tourney_level, 3);
        assert_eq!(row.surface, 2);
    }
}
