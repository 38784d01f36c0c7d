//! CSV match archive
//!
//! Reads ATP-style CSV files: one match file per season and tour
//! (`atp_matches_{year}.csv`, `atp_matches_qual_chall_{year}.csv`,
//! `atp_matches_futures_{year}.csv`), ranking snapshot files, and a
//! tournament metadata file with `name,location,country,climate` columns.

use std::collections::HashSet;
use std::fs::File;
use std::io::Read;
use std::path::{Path, PathBuf};

use chrono::NaiveDate;
use serde::Deserialize;

use crate::data::sources::{MatchSource, RankingSource, TourneySource, YearRange};
use crate::features::{RankingPoint, TourneyInfo};
use crate::{Climate, DataConfig, MatchRecord, PlayerId, Result, Surface};

/// Match file prefixes per season, lowest tour first
const MATCH_FILE_PREFIXES: [&str; 3] = [
    "atp_matches_futures_",
    "atp_matches_qual_chall_",
    "atp_matches_",
];

#[derive(Debug, Deserialize)]
struct RawMatch {
    tourney_id: String,
    tourney_name: String,
    surface: Option<String>,
    tourney_level: String,
    tourney_date: String,
    match_num: i64,
    winner_id: i64,
    winner_ioc: Option<String>,
    winner_age: Option<f64>,
    loser_id: i64,
    loser_ioc: Option<String>,
    loser_age: Option<f64>,
    score: Option<String>,
}

#[derive(Debug, Deserialize)]
struct RawRanking {
    ranking_date: String,
    rank: i64,
    player: i64,
    points: Option<f64>,
}

#[derive(Debug, Deserialize)]
struct RawTourney {
    name: String,
    location: String,
    country: Option<String>,
    climate: Option<String>,
}

/// Archive dates are written as `YYYYMMDD`
fn parse_archive_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();
    NaiveDate::parse_from_str(s, "%Y%m%d")
        .or_else(|_| NaiveDate::parse_from_str(s, "%Y-%m-%d"))
        .ok()
}

fn non_empty(s: Option<String>) -> Option<String> {
    s.map(|v| v.trim().to_string()).filter(|v| !v.is_empty())
}

fn read_matches<R: Read>(rdr: R) -> std::result::Result<Vec<MatchRecord>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut matches = Vec::new();
    for result in reader.deserialize::<RawMatch>() {
        match result {
            Ok(raw) => {
                let Some(date) = parse_archive_date(&raw.tourney_date) else {
                    log::warn!(
                        "skipping match {}#{}: bad date '{}'",
                        raw.tourney_id,
                        raw.match_num,
                        raw.tourney_date
                    );
                    continue;
                };
                matches.push(MatchRecord {
                    date,
                    tourney_id: raw.tourney_id.trim().to_string(),
                    tourney_name: raw.tourney_name.trim().to_string(),
                    tourney_level: raw.tourney_level.trim().to_string(),
                    surface: Surface::from_label(raw.surface.as_deref().unwrap_or("")),
                    match_num: raw.match_num,
                    winner: PlayerId(raw.winner_id),
                    loser: PlayerId(raw.loser_id),
                    score: non_empty(raw.score),
                    winner_age: raw.winner_age,
                    loser_age: raw.loser_age,
                    winner_country: non_empty(raw.winner_ioc),
                    loser_country: non_empty(raw.loser_ioc),
                });
            }
            Err(e) => log::warn!("skipping malformed match row: {}", e),
        }
    }
    Ok(matches)
}

fn read_rankings<R: Read>(rdr: R) -> std::result::Result<Vec<RankingPoint>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut points = Vec::new();
    for result in reader.deserialize::<RawRanking>() {
        match result {
            Ok(raw) => {
                let Some(date) = parse_archive_date(&raw.ranking_date) else {
                    log::warn!("skipping ranking row: bad date '{}'", raw.ranking_date);
                    continue;
                };
                points.push(RankingPoint {
                    player: PlayerId(raw.player),
                    date,
                    rank: raw.rank,
                    points: raw.points.filter(|p| p.is_finite()).unwrap_or(0.0).round() as i64,
                });
            }
            Err(e) => log::warn!("skipping malformed ranking row: {}", e),
        }
    }
    Ok(points)
}

fn read_tourneys<R: Read>(rdr: R) -> std::result::Result<Vec<TourneyInfo>, csv::Error> {
    let mut reader = csv::Reader::from_reader(rdr);
    let mut tourneys = Vec::new();
    for result in reader.deserialize::<RawTourney>() {
        match result {
            Ok(raw) => tourneys.push(TourneyInfo {
                name: raw.name.trim().to_string(),
                location: raw.location.trim().to_string(),
                country: non_empty(raw.country),
                climate: Climate::from_label(raw.climate.as_deref().unwrap_or("")),
            }),
            Err(e) => log::warn!("skipping malformed tourney row: {}", e),
        }
    }
    Ok(tourneys)
}

/// CSV archive on disk
#[derive(Debug, Clone)]
pub struct CsvArchive {
    raw_dir: PathBuf,
    ranking_files: Vec<String>,
    tourneys_path: PathBuf,
}

impl CsvArchive {
    pub fn new<P: AsRef<Path>>(raw_dir: P, ranking_files: Vec<String>, tourneys_path: P) -> Self {
        CsvArchive {
            raw_dir: raw_dir.as_ref().to_path_buf(),
            ranking_files,
            tourneys_path: tourneys_path.as_ref().to_path_buf(),
        }
    }

    pub fn from_config(config: &DataConfig) -> Self {
        Self::new(
            &config.raw_dir,
            config.ranking_files.clone(),
            &config.tourneys_path,
        )
    }

    fn open(path: &Path) -> Result<File> {
        Ok(File::open(path)?)
    }
}

impl MatchSource for CsvArchive {
    fn load_matches(
        &self,
        years: YearRange,
        player_ids: Option<&HashSet<PlayerId>>,
    ) -> Result<Vec<MatchRecord>> {
        let mut matches = Vec::new();

        for year in years.years() {
            for prefix in MATCH_FILE_PREFIXES {
                let path = self.raw_dir.join(format!("{}{}.csv", prefix, year));
                if !path.exists() {
                    log::warn!("Match file {} not found, skipping", path.display());
                    continue;
                }
                log::debug!("Loading {}", path.display());
                matches.extend(read_matches(Self::open(&path)?)?);
            }
        }

        if let Some(ids) = player_ids {
            matches.retain(|m| ids.contains(&m.winner) || ids.contains(&m.loser));
        }

        log::info!("Matches loaded, number of matches: {}", matches.len());
        Ok(matches)
    }
}

impl RankingSource for CsvArchive {
    fn load_rankings(&self) -> Result<Vec<RankingPoint>> {
        let mut points = Vec::new();
        for file in &self.ranking_files {
            let path = self.raw_dir.join(file);
            points.extend(read_rankings(Self::open(&path)?)?);
        }
        // Stable, so equal dates keep file order
        points.sort_by_key(|p| p.date);
        log::info!("Rankings loaded, {} entries", points.len());
        Ok(points)
    }
}

impl TourneySource for CsvArchive {
    fn load_tourneys(&self) -> Result<Vec<TourneyInfo>> {
        if !self.tourneys_path.exists() {
            log::warn!(
                "Tournament file {} not found, all climates default to tempered",
                self.tourneys_path.display()
            );
            return Ok(Vec::new());
        }
        let tourneys = read_tourneys(Self::open(&self.tourneys_path)?)?;
        log::info!("Tournament details loaded, {} entries", tourneys.len());
        Ok(tourneys)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MATCHES: &str = "\
tourney_id,tourney_name,surface,draw_size,tourney_level,tourney_date,match_num,winner_id,winner_name,winner_ioc,winner_age,loser_id,loser_name,loser_ioc,loser_age,score,best_of
2018-0339,Brisbane,Hard,32,A,20180101,271,105683,Milos Raonic,CAN,26.97,105992,Ryan Harrison,USA,25.6,6-4 6-4,3
2018-0339,Brisbane,,32,A,20180101,272,106000,Somebody,,,105992,Ryan Harrison,USA,25.6,W/O,3
2018-0339,Brisbane,Hard,32,A,notadate,273,1,A,USA,20,2,B,USA,20,6-0 6-0,3
";

    #[test]
    fn test_read_matches() {
        let matches = read_matches(MATCHES.as_bytes()).unwrap();
        assert_eq!(matches.len(), 2);

        let first = &matches[0];
        assert_eq!(first.date, NaiveDate::from_ymd_opt(2018, 1, 1).unwrap());
        assert_eq!(first.winner, PlayerId(105683));
        assert_eq!(first.loser, PlayerId(105992));
        assert_eq!(first.surface, Surface::Hard);
        assert_eq!(first.winner_country.as_deref(), Some("CAN"));
        assert_eq!(first.score.as_deref(), Some("6-4 6-4"));

        let second = &matches[1];
        // Missing surface is played as hard, missing age and country are None
        assert_eq!(second.surface, Surface::Hard);
        assert_eq!(second.winner_age, None);
        assert_eq!(second.winner_country, None);
    }

    #[test]
    fn test_read_rankings() {
        let csv = "ranking_date,rank,player,points\n20180101,1,104925,10600\n20180108,2,104745,\n";
        let points = read_rankings(csv.as_bytes()).unwrap();
        assert_eq!(points.len(), 2);
        assert_eq!(points[0].points, 10600);
        assert_eq!(points[1].points, 0);
        assert_eq!(points[1].date, NaiveDate::from_ymd_opt(2018, 1, 8).unwrap());
    }

    #[test]
    fn test_read_tourneys() {
        let csv = "name,location,country,climate\nMiami Masters,Miami,USA,tropical\nParis Masters,Paris,FRA,\n";
        let tourneys = read_tourneys(csv.as_bytes()).unwrap();
        assert_eq!(tourneys.len(), 2);
        assert_eq!(tourneys[0].climate, Climate::Tropical);
        assert_eq!(tourneys[1].climate, Climate::Tempered);
        assert_eq!(tourneys[1].country.as_deref(), Some("FRA"));
    }

    #[test]
    fn test_missing_files_are_skipped() {
        let archive = CsvArchive::new(
            "/nonexistent/tennis/raw",
            Vec::new(),
            "/nonexistent/tennis/tourneys.csv",
        );
        let matches = archive.load_matches(YearRange::new(2018, 2018), None).unwrap();
        assert!(matches.is_empty());
        assert!(archive.load_tourneys().unwrap().is_empty());
    }
}
