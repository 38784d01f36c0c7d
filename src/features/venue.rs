//! Tournament venue metadata
//!
//! Climate per tournament location and home country per tournament name.
//! Lookups that miss fall back to a tempered climate and no home advantage.

use std::collections::HashMap;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::{Climate, MatchRecord};

/// Archive name suffixes that do not belong to the location
/// ("Rome Masters", "Atlanta CH", "Great Britain F5", "Sydney Q").
const NAME_SUFFIX: &str = r"(?i)\s+(masters|ch|q|f\d+|\d+|wct|nb)$";

/// One row of the tournament metadata file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TourneyInfo {
    pub name: String,
    pub location: String,
    /// IOC code of the host country
    pub country: Option<String>,
    pub climate: Climate,
}

/// Lookup tables for tournament climate and home country
#[derive(Debug, Clone)]
pub struct TourneyDirectory {
    climate_by_location: HashMap<String, Climate>,
    country_by_name: HashMap<String, String>,
    suffix: Regex,
}

impl Default for TourneyDirectory {
    fn default() -> Self {
        Self::new(Vec::new())
    }
}

impl TourneyDirectory {
    pub fn new(tourneys: impl IntoIterator<Item = TourneyInfo>) -> Self {
        let mut climate_by_location = HashMap::new();
        let mut country_by_name = HashMap::new();

        for t in tourneys {
            climate_by_location
                .entry(normalize(&t.location))
                .or_insert(t.climate);
            if let Some(country) = t.country.filter(|c| !c.trim().is_empty()) {
                country_by_name
                    .entry(normalize(&t.name))
                    .or_insert(country.trim().to_uppercase());
            }
        }

        TourneyDirectory {
            climate_by_location,
            country_by_name,
            suffix: Regex::new(NAME_SUFFIX).expect("suffix pattern is valid"),
        }
    }

    /// Location part of an archive tournament name
    pub fn location_from_name(&self, tourney_name: &str) -> String {
        let mut location = tourney_name.trim().to_string();
        loop {
            let stripped = self.suffix.replace(&location, "").into_owned();
            if stripped == location {
                break;
            }
            location = stripped;
        }
        normalize(&location)
    }

    /// Climate of the tournament's location, tempered if unknown
    pub fn climate_for(&self, tourney_name: &str) -> Climate {
        self.climate_by_location
            .get(&self.location_from_name(tourney_name))
            .copied()
            .unwrap_or_default()
    }

    pub fn home_country(&self, tourney_name: &str) -> Option<&str> {
        self.country_by_name
            .get(&normalize(tourney_name))
            .map(String::as_str)
    }

    /// +1 if only the winner plays at home, -1 if only the loser does, else 0
    pub fn home_advantage(&self, record: &MatchRecord) -> i64 {
        let Some(home) = self.home_country(&record.tourney_name) else {
            return 0;
        };
        let is_home = |country: &Option<String>| {
            country
                .as_deref()
                .is_some_and(|c| c.trim().eq_ignore_ascii_case(home))
        };

        match (is_home(&record.winner_country), is_home(&record.loser_country)) {
            (true, false) => 1,
            (false, true) => -1,
            _ => 0,
        }
    }
}

fn normalize(s: &str) -> String {
    s.trim().to_lowercase()
}
