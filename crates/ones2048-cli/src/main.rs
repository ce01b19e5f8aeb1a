mod config;
mod player;
mod storage;

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use env_logger::Env;
use log::info;
use rand::rngs::StdRng;
use rand::SeedableRng;

use ones2048_core::Session;

use config::Config;
use storage::SqliteStorage;

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Drive the ones2048 board engine from the terminal"
)]
struct Cli {
    /// Optional TOML configuration for the move loops
    #[arg(long, value_name = "FILE")]
    config: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Resume (or start) the persistent game kept in a SQLite save file
    Play {
        /// Save database path
        #[arg(long, value_name = "FILE")]
        db: PathBuf,

        /// Seed for the move/spawn RNG (defaults to entropy)
        #[arg(long, value_name = "N")]
        seed: Option<u64>,

        /// Discard the persisted game before playing
        #[arg(long)]
        fresh: bool,
    },
    /// Self-play independent games in parallel and report a summary
    Batch {
        /// Number of games (overrides the config)
        #[arg(long, value_name = "N")]
        games: Option<u32>,

        /// Base seed; game i uses base + i (overrides the config)
        #[arg(long, value_name = "N")]
        seed: Option<u64>,

        /// Stop each game after this many moves (overrides the config)
        #[arg(long, value_name = "N")]
        max_moves: Option<u64>,
    },
}

fn main() -> Result<()> {
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();
    let cli = Cli::parse();

    let config = match &cli.config {
        Some(path) => Config::from_toml(path)?,
        None => Config::default(),
    };

    match cli.command {
        Command::Play { db, seed, fresh } => play(db, seed, fresh, &config.play),
        Command::Batch {
            games,
            seed,
            max_moves,
        } => {
            let mut opts = config.batch.clone();
            if let Some(games) = games {
                opts.games = games;
            }
            if let Some(seed) = seed {
                opts.base_seed = seed;
            }
            if let Some(cap) = max_moves {
                opts.max_moves = Some(cap);
            }
            batch(&opts)
        }
    }
}

fn play(db: PathBuf, seed: Option<u64>, fresh: bool, opts: &config::Play) -> Result<()> {
    let storage = SqliteStorage::open(&db)
        .with_context(|| format!("failed to open save database {}", db.display()))?;
    let mut rng = match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    };
    let mut session = Session::new(storage, &mut rng);
    if fresh {
        session.restart(&mut rng);
    }
    info!(
        "resuming at score {} (best {})",
        session.score(),
        session.best()
    );

    let committed = player::run_game(&mut session, &mut rng, opts);
    info!(
        "stopped after {} move(s): score {}, best {}, highest tile {}{}",
        committed,
        session.score(),
        session.best(),
        session.highest_value().map_or(0, |v| v.value()),
        if session.is_game_over() {
            " (game over)"
        } else {
            ""
        },
    );
    Ok(())
}

fn batch(opts: &config::Batch) -> Result<()> {
    let summaries = player::run_batch(opts);
    for summary in &summaries {
        info!(
            "seed {}: {} moves, score {}, highest {}",
            summary.seed, summary.moves, summary.score, summary.highest
        );
    }
    let games = summaries.len().max(1) as u64;
    let total_score: u64 = summaries.iter().map(|s| u64::from(s.score)).sum();
    let top = summaries.iter().map(|s| s.score).max().unwrap_or(0);
    info!(
        "completed {} game(s): mean score {}, top score {}",
        summaries.len(),
        total_score / games,
        top
    );
    Ok(())
}
