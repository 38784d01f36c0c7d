//! Tennis match pre-processing CLI
//!
//! Builds a balanced feature dataset from an ATP match archive.

use clap::{Parser, Subcommand};
use tennis::{Config, Result};

#[derive(Parser)]
#[command(name = "tennis")]
#[command(about = "Tennis match feature pre-processing", long_about = None)]
struct Cli {
    /// Config file path
    #[arg(short, long, default_value = "config.toml")]
    config: String,

    /// Enable verbose logging
    #[arg(short, long)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Initialize a new project with default config
    Init,
    /// Process the match archive into a feature dataset
    Process {
        /// Override first processed season
        #[arg(long)]
        from: Option<i32>,
        /// Override last processed season
        #[arg(long)]
        to: Option<i32>,
        /// Store the final statistics as the seed for later runs
        #[arg(long)]
        save_seed: bool,
        /// Skip the CSV export
        #[arg(long)]
        no_csv: bool,
    },
    /// Show database status
    Status,
}

fn main() {
    let cli = Cli::parse();

    // Initialize logging
    let log_level = if cli.verbose { "debug" } else { "info" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(log_level))
        .format_timestamp(None)
        .init();

    // Load or create config
    let config = if std::path::Path::new(&cli.config).exists() {
        match Config::load(&cli.config) {
            Ok(c) => c,
            Err(e) => {
                eprintln!("Error loading config: {}", e);
                std::process::exit(1);
            }
        }
    } else {
        Config::default()
    };

    let result = match cli.command {
        Commands::Init => commands::init(&cli.config),
        Commands::Process {
            from,
            to,
            save_seed,
            no_csv,
        } => commands::process(&config, from, to, save_seed, no_csv),
        Commands::Status => commands::status(&config),
    };

    if let Err(e) = result {
        eprintln!("Error: {}", e);
        std::process::exit(1);
    }
}

mod commands {
    use super::*;
    use tennis::data::{CsvArchive, CsvSink, Database, DatasetSink, NormalizedDataset};
    use tennis::pipeline::{load_inputs, MatchProcessor, ProcessorSettings};

    pub fn init(config_path: &str) -> Result<()> {
        let config = Config::default();
        config.save(config_path)?;
        println!("Created default config at {}", config_path);

        std::fs::create_dir_all(&config.data.raw_dir)?;
        println!("Created {} directory", config.data.raw_dir);

        println!("\nNext steps:");
        println!("  1. Edit {} to customize settings", config_path);
        println!(
            "  2. Put atp_matches_YYYY.csv and ranking files into {}",
            config.data.raw_dir
        );
        println!("  3. Run 'tennis process' to build the dataset");

        Ok(())
    }

    pub fn process(
        config: &Config,
        from: Option<i32>,
        to: Option<i32>,
        save_seed: bool,
        no_csv: bool,
    ) -> Result<()> {
        let mut config = config.clone();
        if let Some(y) = from {
            config.processing.from_year = y;
        }
        if let Some(y) = to {
            config.processing.to_year = y;
        }
        config.validate()?;

        println!(
            "Processing seasons {}-{}...",
            config.processing.from_year, config.processing.to_year
        );

        let archive = CsvArchive::from_config(&config.data);
        let mut db = Database::open(&config.data.database_path)?;
        let inputs = load_inputs(&config, &archive, &db)?;

        let mut processor = MatchProcessor::new(ProcessorSettings::from_config(&config), inputs);
        processor.run()?;
        let (rows, players, h2h) = processor.into_parts();
        println!("Processed {} matches", rows.len());

        let dataset = NormalizedDataset::from_rows(&rows);
        let count = db.write_dataset(&dataset)?;
        println!("Stored {} rows in {}", count, config.data.database_path);

        if !no_csv {
            let mut sink = CsvSink::new(&config.data.output_csv);
            sink.write_dataset(&dataset)?;
            println!("Exported dataset to {}", sink.path().display());
        }

        db.record_run(&config, count)?;

        if save_seed {
            db.save_seed(&players, &h2h)?;
            println!(
                "Saved seed: {} players, {} head-to-head pairs",
                players.len(),
                h2h.len()
            );
        }

        Ok(())
    }

    pub fn status(config: &Config) -> Result<()> {
        let db = Database::open(&config.data.database_path)?;
        let stats = db.get_stats()?;

        println!("Database Status");
        println!("───────────────────────────────");
        println!("  Path:          {}", config.data.database_path);
        println!("  Seed players:  {}", stats.seed_player_count);
        println!("  Seed pairs:    {}", stats.seed_pair_count);
        println!("  Dataset rows:  {}", stats.processed_row_count);
        println!("  Runs:          {}", stats.run_count);
        if let (Some(earliest), Some(latest)) = (stats.earliest_match, stats.latest_match) {
            println!("  Range:         {} to {}", earliest, latest);
        }
        if let Some(last) = stats.last_run {
            println!("  Last run:      {}", last);
        }

        Ok(())
    }
}
