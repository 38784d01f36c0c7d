//! Processed dataset rows and column standardisation
//!
//! One [`FeatureRow`] per match. Before persisting, the scaled columns are
//! z-score normalised column by column and merged back with the columns that
//! bypass scaling.

use chrono::{NaiveDate, NaiveTime};
use rayon::prelude::*;

use crate::features::MatchFeatures;
use crate::PlayerId;

/// Columns that are standardised before persisting
pub const SCALED_COLUMNS: [&str; 11] = [
    "rel_total_wins",
    "rel_surface_wins",
    "mutual_wins",
    "mutual_surface_wins",
    "mutual_games",
    "rank_diff",
    "points_grad_diff",
    "rel_climate_wins",
    "rel_recent_wins",
    "rel_tourney_games",
    "age_diff",
];

/// Columns persisted as-is
pub const UNSCALED_COLUMNS: [&str; 7] = [
    "tourney_date",
    "home_advantage",
    "tourney_level",
    "player_1",
    "player_2",
    "surface",
    "outcome",
];

/// Unix timestamp (seconds) of midnight UTC on `date`
pub fn unix_seconds(date: NaiveDate) -> i64 {
    date.and_time(NaiveTime::MIN).and_utc().timestamp()
}

/// One processed match
#[derive(Debug, Clone, PartialEq)]
pub struct FeatureRow {
    pub tourney_date: i64,
    pub player_1: PlayerId,
    pub player_2: PlayerId,
    /// Encoded tournament level
    pub tourney_level: i64,
    /// Encoded surface
    pub surface: i64,
    pub features: MatchFeatures,
}

impl FeatureRow {
    pub fn scaled_values(&self) -> [f64; SCALED_COLUMNS.len()] {
        let f = &self.features;
        [
            f.rel_total_wins as f64,
            f.rel_surface_wins as f64,
            f.mutual_wins as f64,
            f.mutual_surface_wins as f64,
            f.mutual_games as f64,
            f.rank_diff as f64,
            f.points_grad_diff as f64,
            f.rel_climate_wins as f64,
            f.rel_recent_wins as f64,
            f.rel_tourney_games as f64,
            f.age_diff,
        ]
    }

    pub fn unscaled_values(&self) -> [i64; UNSCALED_COLUMNS.len()] {
        [
            self.tourney_date,
            self.features.home_advantage,
            self.tourney_level,
            self.player_1.0,
            self.player_2.0,
            self.surface,
            self.features.outcome,
        ]
    }
}

/// Mean and standard deviation used to scale one column
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ColumnScaling {
    pub mean: f64,
    pub std: f64,
}

impl ColumnScaling {
    pub fn fit(values: &[f64]) -> Self {
        ColumnScaling {
            mean: mean(values),
            std: std(values),
        }
    }

    /// Constant columns keep a unit scale and become all zeros
    pub fn apply(&self, value: f64) -> f64 {
        let scale = if self.std > 0.0 { self.std } else { 1.0 };
        (value - self.mean) / scale
    }
}

fn mean(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    values.iter().sum::<f64>() / values.len() as f64
}

/// Population standard deviation
fn std(values: &[f64]) -> f64 {
    if values.is_empty() {
        return 0.0;
    }
    let m = mean(values);
    let variance = values.iter().map(|x| (x - m).powi(2)).sum::<f64>() / values.len() as f64;
    variance.sqrt()
}

/// A dataset ready to persist: standardised columns plus raw ones
#[derive(Debug, Clone, Default)]
pub struct NormalizedDataset {
    /// Column-major, in [`SCALED_COLUMNS`] order
    scaled: Vec<Vec<f64>>,
    /// Row-major, in [`UNSCALED_COLUMNS`] order
    unscaled: Vec<[i64; UNSCALED_COLUMNS.len()]>,
    scaling: Vec<ColumnScaling>,
}

impl NormalizedDataset {
    /// Standardise every scaled column independently
    pub fn from_rows(rows: &[FeatureRow]) -> Self {
        let raw: Vec<[f64; SCALED_COLUMNS.len()]> = rows.iter().map(|r| r.scaled_values()).collect();

        let (scaling, scaled): (Vec<_>, Vec<_>) = (0..SCALED_COLUMNS.len())
            .into_par_iter()
            .map(|col| {
                let values: Vec<f64> = raw.iter().map(|r| r[col]).collect();
                let scaling = ColumnScaling::fit(&values);
                let scaled = values.iter().map(|v| scaling.apply(*v)).collect::<Vec<_>>();
                (scaling, scaled)
            })
            .unzip();

        NormalizedDataset {
            scaled,
            unscaled: rows.iter().map(|r| r.unscaled_values()).collect(),
            scaling,
        }
    }

    pub fn len(&self) -> usize {
        self.unscaled.len()
    }

    pub fn is_empty(&self) -> bool {
        self.unscaled.is_empty()
    }

    /// Column names of a merged row: scaled columns first
    pub fn columns() -> Vec<&'static str> {
        SCALED_COLUMNS.iter().chain(UNSCALED_COLUMNS.iter()).copied().collect()
    }

    pub fn scaling(&self) -> &[ColumnScaling] {
        &self.scaling
    }

    pub fn scaled_column(&self, name: &str) -> Option<&[f64]> {
        let idx = SCALED_COLUMNS.iter().position(|c| *c == name)?;
        self.scaled.get(idx).map(Vec::as_slice)
    }

    /// Merged row `index`
    pub fn row(&self, index: usize) -> Option<MergedRow> {
        let unscaled = *self.unscaled.get(index)?;
        let scaled = self.scaled.iter().map(|col| col[index]).collect();
        Some(MergedRow { scaled, unscaled })
    }

    pub fn rows(&self) -> impl Iterator<Item = MergedRow> + '_ {
        (0..self.len()).filter_map(move |i| self.row(i))
    }
}

/// One persisted row
#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub scaled: Vec<f64>,
    pub unscaled: [i64; UNSCALED_COLUMNS.len()],
}

impl MergedRow {
    pub fn unscaled_value(&self, name: &str) -> Option<i64> {
        let idx = UNSCALED_COLUMNS.iter().position(|c| *c == name)?;
        Some(self.unscaled[idx])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(rel_total_wins: i64, rank_diff: i64, outcome: i64) -> FeatureRow {
        FeatureRow {
            tourney_date: unix_seconds(NaiveDate::from_ymd_opt(2018, 1, 1).unwrap()),
            player_1: PlayerId(1),
            player_2: PlayerId(2),
            tourney_level: 3,
            surface: 2,
            features: MatchFeatures {
                rel_total_wins,
                rank_diff,
                home_advantage: outcome,
                outcome,
                ..Default::default()
            },
        }
    }

    #[test]
    fn test_unix_seconds() {
        assert_eq!(unix_seconds(NaiveDate::from_ymd_opt(1970, 1, 2).unwrap()), 86_400);
        assert_eq!(unix_seconds(NaiveDate::from_ymd_opt(2018, 1, 1).unwrap()), 1_514_764_800);
    }

    #[test]
    fn test_standardisation() {
        let rows = vec![row(10, 5, 1), row(20, 5, -1), row(30, 5, 1)];
        let dataset = NormalizedDataset::from_rows(&rows);
        assert_eq!(dataset.len(), 3);

        let total = dataset.scaled_column("rel_total_wins").unwrap();
        let std = (200.0f64 / 3.0).sqrt();
        assert!((total[0] + 10.0 / std).abs() < 1e-12);
        assert!(total[1].abs() < 1e-12);
        assert!((total[2] - 10.0 / std).abs() < 1e-12);

        // Constant column collapses to zero
        let rank = dataset.scaled_column("rank_diff").unwrap();
        assert!(rank.iter().all(|v| *v == 0.0));
        assert_eq!(dataset.scaling()[5].mean, 5.0);
    }

    #[test]
    fn test_unscaled_columns_bypass_scaling() {
        let rows = vec![row(10, 5, 1), row(20, 5, -1)];
        let dataset = NormalizedDataset::from_rows(&rows);
        let merged = dataset.row(1).unwrap();

        assert_eq!(merged.scaled.len(), SCALED_COLUMNS.len());
        assert_eq!(merged.unscaled_value("outcome"), Some(-1));
        assert_eq!(merged.unscaled_value("home_advantage"), Some(-1));
        assert_eq!(merged.unscaled_value("player_1"), Some(1));
        assert_eq!(merged.unscaled_value("tourney_date"), Some(1_514_764_800));
        assert_eq!(NormalizedDataset::columns().len(), 18);
    }

    #[test]
    fn test_empty_dataset() {
        let dataset = NormalizedDataset::from_rows(&[]);
        assert!(dataset.is_empty());
        assert_eq!(dataset.rows().count(), 0);
    }
}
