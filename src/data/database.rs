//! SQLite storage for seed aggregates and processed datasets

use crate::data::dataset::{NormalizedDataset, SCALED_COLUMNS, UNSCALED_COLUMNS};
use crate::data::sources::{DatasetSink, SeedSnapshot, SeedSource};
use crate::features::{HeadToHeadStore, PlayerAggregate, PlayerStatStore, WinLoss};
use crate::{Climate, Config, PlayerId, Result, Surface, TennisError};
use chrono::{DateTime, NaiveDate};
use rusqlite::types::Value;
use rusqlite::{params, params_from_iter, Connection, OptionalExtension};
use std::collections::HashMap;
use std::path::Path;

/// Database connection and operations
pub struct Database {
    conn: Connection,
}

impl Database {
    /// Open or create database at the given path
    pub fn open<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(path)?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Create an in-memory database (for testing)
    pub fn in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()?;
        let db = Database { conn };
        db.init_schema()?;
        Ok(db)
    }

    /// Initialize database schema
    fn init_schema(&self) -> Result<()> {
        self.conn.execute_batch(
            r#"
            CREATE TABLE IF NOT EXISTS seed_player_stats (
                player_id INTEGER PRIMARY KEY,
                total_wins INTEGER NOT NULL DEFAULT 0,
                total_losses INTEGER NOT NULL DEFAULT 0,
                clay_wins INTEGER NOT NULL DEFAULT 0,
                clay_losses INTEGER NOT NULL DEFAULT 0,
                grass_wins INTEGER NOT NULL DEFAULT 0,
                grass_losses INTEGER NOT NULL DEFAULT 0,
                hard_wins INTEGER NOT NULL DEFAULT 0,
                hard_losses INTEGER NOT NULL DEFAULT 0
            );

            CREATE TABLE IF NOT EXISTS seed_climate_stats (
                player_id INTEGER NOT NULL,
                climate TEXT NOT NULL,
                wins INTEGER NOT NULL DEFAULT 0,
                losses INTEGER NOT NULL DEFAULT 0,
                PRIMARY KEY (player_id, climate)
            );

            CREATE TABLE IF NOT EXISTS seed_mutual_wins (
                player_id INTEGER NOT NULL,
                opponent_id INTEGER NOT NULL,
                surface TEXT NOT NULL,
                wins INTEGER NOT NULL,
                PRIMARY KEY (player_id, opponent_id, surface)
            );

            CREATE TABLE IF NOT EXISTS seed_mutual_games (
                player_id INTEGER NOT NULL,
                opponent_id INTEGER NOT NULL,
                games INTEGER NOT NULL,
                PRIMARY KEY (player_id, opponent_id)
            );

            CREATE TABLE IF NOT EXISTS processed_matches (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                rel_total_wins REAL NOT NULL,
                rel_surface_wins REAL NOT NULL,
                mutual_wins REAL NOT NULL,
                mutual_surface_wins REAL NOT NULL,
                mutual_games REAL NOT NULL,
                rank_diff REAL NOT NULL,
                points_grad_diff REAL NOT NULL,
                rel_climate_wins REAL NOT NULL,
                rel_recent_wins REAL NOT NULL,
                rel_tourney_games REAL NOT NULL,
                age_diff REAL NOT NULL,
                tourney_date INTEGER NOT NULL,
                home_advantage INTEGER NOT NULL,
                tourney_level INTEGER NOT NULL,
                player_1 INTEGER NOT NULL,
                player_2 INTEGER NOT NULL,
                surface INTEGER NOT NULL,
                outcome INTEGER NOT NULL
            );

            CREATE TABLE IF NOT EXISTS processing_runs (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                created_at TEXT NOT NULL DEFAULT (datetime('now')),
                config TEXT NOT NULL,
                row_count INTEGER NOT NULL
            );

            CREATE INDEX IF NOT EXISTS idx_processed_date ON processed_matches(tourney_date);
            "#,
        )?;
        Ok(())
    }

    // ==================== Seed Operations ====================

    /// Replace the seed tables with the contents of the given stores
    pub fn save_seed(&mut self, players: &PlayerStatStore, h2h: &HeadToHeadStore) -> Result<()> {
        let tx = self.conn.transaction()?;
        tx.execute_batch(
            "DELETE FROM seed_player_stats;
             DELETE FROM seed_climate_stats;
             DELETE FROM seed_mutual_wins;
             DELETE FROM seed_mutual_games;",
        )?;

        {
            let mut player_stmt = tx.prepare(
                "INSERT INTO seed_player_stats (player_id, total_wins, total_losses,
                    clay_wins, clay_losses, grass_wins, grass_losses, hard_wins, hard_losses)
                 VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9)",
            )?;
            let mut climate_stmt = tx.prepare(
                "INSERT INTO seed_climate_stats (player_id, climate, wins, losses)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;

            for (player, agg) in players.all() {
                let clay = agg.on_surface(Surface::Clay);
                let grass = agg.on_surface(Surface::Grass);
                let hard = agg.on_surface(Surface::Hard);
                player_stmt.execute(params![
                    player.0,
                    agg.total.wins,
                    agg.total.losses,
                    clay.wins,
                    clay.losses,
                    grass.wins,
                    grass.losses,
                    hard.wins,
                    hard.losses,
                ])?;

                for climate in Climate::ALL {
                    let record = agg.in_climate(climate);
                    if record.played() != 0 {
                        climate_stmt.execute(params![
                            player.0,
                            climate.label(),
                            record.wins,
                            record.losses
                        ])?;
                    }
                }
            }

            let mut wins_stmt = tx.prepare(
                "INSERT INTO seed_mutual_wins (player_id, opponent_id, surface, wins)
                 VALUES (?1, ?2, ?3, ?4)",
            )?;
            let mut games_stmt = tx.prepare(
                "INSERT INTO seed_mutual_games (player_id, opponent_id, games)
                 VALUES (?1, ?2, ?3)",
            )?;

            for (&(a, b), pair) in h2h.all() {
                for surface in Surface::ALL {
                    let wins = pair.wins_on_surface[surface.index()];
                    if wins != 0 {
                        wins_stmt.execute(params![a.0, b.0, surface.label(), wins])?;
                    }
                }
                if pair.games_won != 0 {
                    games_stmt.execute(params![a.0, b.0, pair.games_won])?;
                }
            }
        }

        tx.commit()?;
        log::info!(
            "Saved seed: {} players, {} head-to-head pairs",
            players.len(),
            h2h.len()
        );
        Ok(())
    }

    fn load_player_stats(&self) -> Result<HashMap<PlayerId, PlayerAggregate>> {
        let mut stats: HashMap<PlayerId, PlayerAggregate> = HashMap::new();

        let mut stmt = self.conn.prepare(
            "SELECT player_id, total_wins, total_losses, clay_wins, clay_losses,
                    grass_wins, grass_losses, hard_wins, hard_losses
             FROM seed_player_stats",
        )?;
        let rows = stmt
            .query_map([], |row| {
                let mut agg = PlayerAggregate {
                    total: WinLoss::new(row.get(1)?, row.get(2)?),
                    ..Default::default()
                };
                agg.surface[Surface::Clay.index()] = WinLoss::new(row.get(3)?, row.get(4)?);
                agg.surface[Surface::Grass.index()] = WinLoss::new(row.get(5)?, row.get(6)?);
                agg.surface[Surface::Hard.index()] = WinLoss::new(row.get(7)?, row.get(8)?);
                Ok((PlayerId(row.get(0)?), agg))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        stats.extend(rows);

        let mut stmt = self
            .conn
            .prepare("SELECT player_id, climate, wins, losses FROM seed_climate_stats")?;
        let climate_rows = stmt
            .query_map([], |row| {
                let label: String = row.get(1)?;
                Ok((
                    PlayerId(row.get(0)?),
                    Climate::from_label(&label),
                    WinLoss::new(row.get(2)?, row.get(3)?),
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;

        for (player, climate, record) in climate_rows {
            let agg = stats.entry(player).or_default();
            let slot = &mut agg.climate[climate.index()];
            slot.wins += record.wins;
            slot.losses += record.losses;
        }

        Ok(stats)
    }

    // ==================== Dataset Operations ====================

    /// Number of rows in the processed dataset table
    pub fn processed_row_count(&self) -> Result<usize> {
        let count: i64 =
            self.conn
                .query_row("SELECT COUNT(*) FROM processed_matches", [], |row| row.get(0))?;
        Ok(count as usize)
    }

    /// Outcome column of the processed dataset, in insertion order
    pub fn processed_outcomes(&self) -> Result<Vec<i64>> {
        let mut stmt = self
            .conn
            .prepare("SELECT outcome FROM processed_matches ORDER BY id")?;
        let outcomes = stmt
            .query_map([], |row| row.get(0))?
            .collect::<std::result::Result<Vec<i64>, _>>()?;
        Ok(outcomes)
    }

    /// Record a finished run with the configuration it used
    pub fn record_run(&self, config: &Config, row_count: usize) -> Result<()> {
        let config_json =
            serde_json::to_string(config).map_err(|e| TennisError::Parse(e.to_string()))?;
        self.conn.execute(
            "INSERT INTO processing_runs (config, row_count) VALUES (?1, ?2)",
            params![config_json, row_count as i64],
        )?;
        Ok(())
    }

    // ==================== Statistics ====================

    /// Get database statistics
    pub fn get_stats(&self) -> Result<DatabaseStats> {
        let count = |table: &str| -> Result<usize> {
            let n: i64 = self.conn.query_row(
                &format!("SELECT COUNT(*) FROM {}", table),
                [],
                |row| row.get(0),
            )?;
            Ok(n as usize)
        };

        let (min_date, max_date): (Option<i64>, Option<i64>) = self.conn.query_row(
            "SELECT MIN(tourney_date), MAX(tourney_date) FROM processed_matches",
            [],
            |row| Ok((row.get(0)?, row.get(1)?)),
        )?;

        let last_run: Option<String> = self
            .conn
            .query_row(
                "SELECT created_at FROM processing_runs ORDER BY id DESC LIMIT 1",
                [],
                |row| row.get(0),
            )
            .optional()?;

        Ok(DatabaseStats {
            seed_player_count: count("seed_player_stats")?,
            seed_pair_count: count("seed_mutual_games")?,
            processed_row_count: count("processed_matches")?,
            run_count: count("processing_runs")?,
            earliest_match: min_date.and_then(date_from_unix),
            latest_match: max_date.and_then(date_from_unix),
            last_run,
        })
    }
}

fn date_from_unix(seconds: i64) -> Option<NaiveDate> {
    DateTime::from_timestamp(seconds, 0).map(|dt| dt.date_naive())
}

impl SeedSource for Database {
    fn load_seed(&self) -> Result<SeedSnapshot> {
        let mut seed = SeedSnapshot {
            cond_stats: self.load_player_stats()?,
            ..Default::default()
        };

        let mut stmt = self
            .conn
            .prepare("SELECT player_id, opponent_id, surface, wins FROM seed_mutual_wins")?;
        let wins = stmt
            .query_map([], |row| {
                let label: String = row.get(2)?;
                Ok((
                    PlayerId(row.get(0)?),
                    PlayerId(row.get(1)?),
                    Surface::from_label(&label),
                    row.get::<_, i64>(3)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        for (a, b, surface, n) in wins {
            *seed.mutual_wins[surface.index()].entry((a, b)).or_insert(0) += n;
        }

        let mut stmt = self
            .conn
            .prepare("SELECT player_id, opponent_id, games FROM seed_mutual_games")?;
        let games = stmt
            .query_map([], |row| {
                Ok((
                    (PlayerId(row.get(0)?), PlayerId(row.get(1)?)),
                    row.get::<_, i64>(2)?,
                ))
            })?
            .collect::<std::result::Result<Vec<_>, _>>()?;
        seed.mutual_games.extend(games);

        log::info!(
            "Seed loaded: {} players, {} game pairs",
            seed.cond_stats.len(),
            seed.mutual_games.len()
        );
        Ok(seed)
    }
}

impl DatasetSink for Database {
    /// Replace the processed dataset table
    fn write_dataset(&mut self, dataset: &NormalizedDataset) -> Result<usize> {
        let columns = NormalizedDataset::columns();
        let placeholders = (1..=columns.len())
            .map(|i| format!("?{}", i))
            .collect::<Vec<_>>()
            .join(", ");
        let sql = format!(
            "INSERT INTO processed_matches ({}) VALUES ({})",
            columns.join(", "),
            placeholders
        );

        let tx = self.conn.transaction()?;
        tx.execute("DELETE FROM processed_matches", [])?;

        let mut count = 0;
        {
            let mut stmt = tx.prepare(&sql)?;
            for row in dataset.rows() {
                let mut values: Vec<Value> =
                    Vec::with_capacity(SCALED_COLUMNS.len() + UNSCALED_COLUMNS.len());
                values.extend(row.scaled.iter().map(|v| Value::Real(*v)));
                values.extend(row.unscaled.iter().map(|v| Value::Integer(*v)));
                stmt.execute(params_from_iter(values))?;
                count += 1;
            }
        }

        tx.commit()?;
        log::info!("Wrote {} rows to processed_matches", count);
        Ok(count)
    }
}

/// Database statistics
#[derive(Debug, Clone)]
pub struct DatabaseStats {
    pub seed_player_count: usize,
    pub seed_pair_count: usize,
    pub processed_row_count: usize,
    pub run_count: usize,
    pub earliest_match: Option<NaiveDate>,
    pub latest_match: Option<NaiveDate>,
    pub last_run: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::dataset::{unix_seconds, FeatureRow};
    use crate::features::{MatchFeatures, UpdateWeights};

    #[test]
    fn test_create_database() {
        let db = Database::in_memory().unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.seed_player_count, 0);
        assert_eq!(stats.processed_row_count, 0);
        assert!(stats.earliest_match.is_none());
        assert!(db.load_seed().unwrap().is_empty());
    }

    #[test]
    fn test_seed_round_trip() {
        let mut db = Database::in_memory().unwrap();

        let mut players = PlayerStatStore::new();
        players.apply_outcome(PlayerId(1), PlayerId(2), Surface::Clay, Climate::Dry, 80, 60);
        players.apply_outcome(PlayerId(2), PlayerId(1), Surface::Grass, Climate::Tempered, 90, 70);

        let mut h2h = HeadToHeadStore::new();
        let weights = UpdateWeights::new(100, 2018, NaiveDate::from_ymd_opt(2019, 1, 1).unwrap(), 1.0);
        h2h.apply_outcome(PlayerId(1), PlayerId(2), Surface::Clay, &weights, 12, 7);

        db.save_seed(&players, &h2h).unwrap();
        let (loaded_players, loaded_h2h) = db.load_seed().unwrap().into_stores();

        assert_eq!(loaded_players.get(PlayerId(1)), players.get(PlayerId(1)));
        assert_eq!(loaded_players.get(PlayerId(2)), players.get(PlayerId(2)));
        assert_eq!(
            loaded_h2h.get_mutual_surface_wins(PlayerId(1), PlayerId(2), Surface::Clay),
            100
        );
        assert_eq!(loaded_h2h.get_mutual_games(PlayerId(1), PlayerId(2)), 1200 - 700);

        let stats = db.get_stats().unwrap();
        assert_eq!(stats.seed_player_count, 2);
        assert_eq!(stats.seed_pair_count, 2);
    }

    #[test]
    fn test_write_dataset_replaces_rows() {
        let mut db = Database::in_memory().unwrap();
        let date = NaiveDate::from_ymd_opt(2018, 1, 1).unwrap();
        let rows: Vec<FeatureRow> = [(1, -1), (2, 1), (3, -1)]
            .iter()
            .map(|&(p, outcome)| FeatureRow {
                tourney_date: unix_seconds(date),
                player_1: PlayerId(p),
                player_2: PlayerId(p + 10),
                tourney_level: 0,
                surface: 2,
                features: MatchFeatures {
                    rel_total_wins: p * 10,
                    outcome,
                    ..Default::default()
                },
            })
            .collect();

        let dataset = NormalizedDataset::from_rows(&rows);
        assert_eq!(db.write_dataset(&dataset).unwrap(), 3);
        assert_eq!(db.write_dataset(&dataset).unwrap(), 3);
        assert_eq!(db.processed_row_count().unwrap(), 3);
        assert_eq!(db.processed_outcomes().unwrap(), vec![-1, 1, -1]);

        db.record_run(&Config::default(), 3).unwrap();
        let stats = db.get_stats().unwrap();
        assert_eq!(stats.run_count, 1);
        assert_eq!(stats.earliest_match, Some(date));
        assert_eq!(stats.latest_match, Some(date));
        assert!(stats.last_run.is_some());
    }
}
