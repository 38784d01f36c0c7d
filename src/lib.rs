//! Tennis match pre-processing
//!
//! Turns a chronological archive of tennis matches into a balanced, numeric
//! feature matrix for win prediction. Every feature is computed from state
//! accumulated over earlier matches only.

pub mod data;
pub mod features;
pub mod pipeline;

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use thiserror::Error;

/// Unique identifier for a player
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct PlayerId(pub i64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "Player({})", self.0)
    }
}

/// Court surface
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Surface {
    Clay,
    Grass,
    Hard,
}

impl Surface {
    pub const COUNT: usize = 3;
    pub const ALL: [Surface; Self::COUNT] = [Surface::Clay, Surface::Grass, Surface::Hard];

    pub fn index(&self) -> usize {
        match self {
            Surface::Clay => 0,
            Surface::Grass => 1,
            Surface::Hard => 2,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Surface::Clay => "clay",
            Surface::Grass => "grass",
            Surface::Hard => "hard",
        }
    }

    /// Parse a surface label. Anything unknown (carpet, empty, "nan") is
    /// played as hard.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "clay" => Surface::Clay,
            "grass" => Surface::Grass,
            _ => Surface::Hard,
        }
    }
}

impl fmt::Display for Surface {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// Coarse climate classification of a tournament venue
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Climate {
    Tropical,
    Dry,
    #[default]
    Tempered,
    Continental,
    Polar,
}

impl Climate {
    pub const COUNT: usize = 5;
    pub const ALL: [Climate; Self::COUNT] = [
        Climate::Tropical,
        Climate::Dry,
        Climate::Tempered,
        Climate::Continental,
        Climate::Polar,
    ];

    pub fn index(&self) -> usize {
        match self {
            Climate::Tropical => 0,
            Climate::Dry => 1,
            Climate::Tempered => 2,
            Climate::Continental => 3,
            Climate::Polar => 4,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Climate::Tropical => "tropical",
            Climate::Dry => "dry",
            Climate::Tempered => "tempered",
            Climate::Continental => "continental",
            Climate::Polar => "polar",
        }
    }

    /// Parse a climate label. Unknown venues (often indoor) are tempered.
    pub fn from_label(label: &str) -> Self {
        match label.trim().to_lowercase().as_str() {
            "tropical" => Climate::Tropical,
            "dry" | "arid" => Climate::Dry,
            "continental" => Climate::Continental,
            "polar" => Climate::Polar,
            _ => Climate::Tempered,
        }
    }
}

impl fmt::Display for Climate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.label())
    }
}

/// A single match as read from the archive, in winner/loser orientation
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MatchRecord {
    pub date: NaiveDate,
    pub tourney_id: String,
    pub tourney_name: String,
    pub tourney_level: String,
    pub surface: Surface,
    pub match_num: i64,
    pub winner: PlayerId,
    pub loser: PlayerId,
    pub score: Option<String>,
    pub winner_age: Option<f64>,
    pub loser_age: Option<f64>,
    /// IOC country code
    pub winner_country: Option<String>,
    pub loser_country: Option<String>,
}

impl MatchRecord {
    /// Age difference winner - loser, 0 when either age is unknown
    pub fn age_diff(&self) -> f64 {
        match (self.winner_age, self.loser_age) {
            (Some(w), Some(l)) if w.is_finite() && l.is_finite() => w - l,
            _ => 0.0,
        }
    }
}

/// Application-wide errors
#[derive(Debug, Error)]
pub enum TennisError {
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown tournament level '{0}': add it to weights.t_weights and encoding.t_levels")]
    UnknownTourneyLevel(String),

    #[error("Structural inconsistency in row {index}: {detail}")]
    StructuralInconsistency { index: usize, detail: String },

    #[error("Parse error: {0}")]
    Parse(String),
}

pub type Result<T> = std::result::Result<T, TennisError>;

/// Application configuration loaded from config.toml
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    pub processing: ProcessingConfig,
    pub weights: WeightsConfig,
    pub encoding: EncodingConfig,
    pub data: DataConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingConfig {
    pub from_year: i32,
    pub to_year: i32,
    /// Integer scale applied to ratio features and update weights
    pub base_weight: i64,
    pub recent_months: u32,
    pub progress_interval: usize,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WeightsConfig {
    /// Tournament level -> weight multiplier for total win/loss updates
    pub t_weights: BTreeMap<String, f64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EncodingConfig {
    pub t_levels: BTreeMap<String, i64>,
    pub surfaces: BTreeMap<String, i64>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataConfig {
    pub raw_dir: String,
    pub ranking_files: Vec<String>,
    pub tourneys_path: String,
    pub database_path: String,
    pub output_csv: String,
}

impl Default for Config {
    fn default() -> Self {
        let t_weights = [
            ("G", 1.0),
            ("F", 0.9),
            ("M", 0.85),
            ("A", 0.75),
            ("D", 0.6),
            ("C", 0.5),
            ("S", 0.3),
        ]
        .into_iter()
        .map(|(k, v)| (k.to_string(), v))
        .collect();

        let t_levels = ["G", "F", "M", "A", "D", "C", "S"]
            .into_iter()
            .enumerate()
            .map(|(i, k)| (k.to_string(), i as i64))
            .collect();

        let surfaces = Surface::ALL
            .iter()
            .map(|s| (s.label().to_string(), s.index() as i64))
            .collect();

        Config {
            processing: ProcessingConfig {
                from_year: 2010,
                to_year: 2019,
                base_weight: 100,
                recent_months: 3,
                progress_interval: 10_000,
            },
            weights: WeightsConfig { t_weights },
            encoding: EncodingConfig { t_levels, surfaces },
            data: DataConfig {
                raw_dir: "data/raw".to_string(),
                ranking_files: vec![
                    "atp_rankings_10s.csv".to_string(),
                    "atp_rankings_current.csv".to_string(),
                ],
                tourneys_path: "data/tourneys.csv".to_string(),
                database_path: "data/tennis.db".to_string(),
                output_csv: "data/processed_matches.csv".to_string(),
            },
        }
    }
}

impl Config {
    pub fn load(path: &str) -> Result<Self> {
        let content = std::fs::read_to_string(path).map_err(|e| {
            TennisError::Config(format!("Failed to read config file {}: {}", path, e))
        })?;
        let config: Config = toml::from_str(&content)
            .map_err(|e| TennisError::Config(format!("Failed to parse config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    pub fn save(&self, path: &str) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| TennisError::Config(format!("Failed to serialize config: {}", e)))?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn validate(&self) -> Result<()> {
        let p = &self.processing;
        if p.from_year > p.to_year {
            return Err(TennisError::Config(format!(
                "from_year {} is after to_year {}",
                p.from_year, p.to_year
            )));
        }
        if p.base_weight <= 0 {
            return Err(TennisError::Config("base_weight must be positive".to_string()));
        }
        if p.recent_months == 0 {
            return Err(TennisError::Config("recent_months must be at least 1".to_string()));
        }
        for surface in Surface::ALL {
            if !self.encoding.surfaces.contains_key(surface.label()) {
                return Err(TennisError::Config(format!(
                    "encoding.surfaces has no entry for '{}'",
                    surface
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_unknown_surface_is_hard() {
        assert_eq!(Surface::from_label("Clay"), Surface::Clay);
        assert_eq!(Surface::from_label("Carpet"), Surface::Hard);
        assert_eq!(Surface::from_label(""), Surface::Hard);
    }

    #[test]
    fn test_unknown_climate_is_tempered() {
        assert_eq!(Climate::from_label("Tropical"), Climate::Tropical);
        assert_eq!(Climate::from_label("indoor"), Climate::Tempered);
    }

    #[test]
    fn test_default_config_round_trips_through_toml() {
        let config = Config::default();
        let text = toml::to_string_pretty(&config).unwrap();
        let parsed: Config = toml::from_str(&text).unwrap();
        assert_eq!(parsed.processing.base_weight, 100);
        assert_eq!(parsed.weights.t_weights.get("G"), Some(&1.0));
        parsed.validate().unwrap();
    }

    #[test]
    fn test_validate_rejects_inverted_years() {
        let mut config = Config::default();
        config.processing.from_year = 2020;
        config.processing.to_year = 2019;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_age_diff_defaults_to_zero() {
        let record = MatchRecord {
            date: NaiveDate::from_ymd_opt(2018, 1, 1).unwrap(),
            tourney_id: "2018-001".to_string(),
            tourney_name: "Brisbane".to_string(),
            tourney_level: "A".to_string(),
            surface: Surface::Hard,
            match_num: 1,
            winner: PlayerId(1),
            loser: PlayerId(2),
            score: None,
            winner_age: Some(25.5),
            loser_age: None,
            winner_country: None,
            loser_country: None,
        };
        assert_eq!(record.age_diff(), 0.0);
    }
}
