//! Scoreboard operator CLI
//!
//! Reports, confirms and inspects pool and foosball results stored in a
//! SQLite file shared with other scoreboard processes.

mod render;

use anyhow::{bail, Context, Result};
use chrono::Utc;
use clap::{Parser, Subcommand};
use scoreboard_core::{
    GameMode, HistoryFilter, PlayerId, ProposalId, RankingSort, ScoreboardConfig, SortField,
};
use scoreboard_store::{
    watch_changes, Repository, SqliteRepository, SyncedScoreboard, DEFAULT_POLL_INTERVAL,
};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::broadcast::error::RecvError;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(name = "scoreboard")]
#[command(about = "Club pool and foosball scoreboard")]
struct Cli {
    /// SQLite database file
    #[arg(long, global = true, default_value = "data/scoreboard.db")]
    db: PathBuf,
    /// Configuration file (defaults to scoreboard.toml if present)
    #[arg(long, global = true)]
    config: Option<PathBuf>,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Report a result for a losing player to confirm
    Propose {
        /// Game mode, e.g. pool-1v1 or foosball-2v2
        mode: GameMode,
        /// Winning player(s)
        #[arg(short, long, num_args = 1..=2, required = true)]
        winners: Vec<PlayerId>,
        /// Losing player(s)
        #[arg(short, long, num_args = 1..=2, required = true)]
        losers: Vec<PlayerId>,
    },
    /// Confirm a pending result with a losing player's code
    Confirm { id: ProposalId, code: String },
    /// Reject a pending result with a losing player's code
    Reject { id: ProposalId, code: String },
    /// List results awaiting confirmation
    Pending,
    /// Show a player's rating and history in one mode
    Rating { player: PlayerId, mode: GameMode },
    /// Show the ranking table of one mode
    Rankings {
        mode: GameMode,
        /// name, rating, wins, losses or winrate
        #[arg(short, long, default_value = "rating")]
        sort: SortField,
        /// Reverse the sort order
        #[arg(short, long)]
        reverse: bool,
    },
    /// List confirmed matches, most recent first
    History {
        #[arg(short, long)]
        player: Option<PlayerId>,
        #[arg(short, long)]
        mode: Option<GameMode>,
        /// Maximum number of matches to show
        #[arg(short = 'n', long, default_value = "20")]
        limit: usize,
    },
    /// Show a player's totals across all modes
    Player { name: PlayerId },
    /// Show club totals, recent matches and leaders
    Overview,
    /// Show the cohort head-to-head tally
    Tally,
    /// Set or replace a player's confirmation code
    SetCode { player: PlayerId, code: String },
    /// Win probability and stakes between two ratings
    Calc {
        #[arg(allow_negative_numbers = true)]
        rating_a: f64,
        #[arg(allow_negative_numbers = true)]
        rating_b: f64,
    },
    /// Follow changes made by other processes until interrupted
    Watch {
        /// Polling interval in milliseconds
        #[arg(long)]
        interval_ms: Option<u64>,
    },
}

fn init_tracing() {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

fn load_config(path: Option<&Path>) -> Result<ScoreboardConfig> {
    let config = match path {
        Some(path) => ScoreboardConfig::load_from(path)
            .with_context(|| format!("Failed to load config from {}", path.display()))?,
        None => ScoreboardConfig::load().context("Failed to load scoreboard.toml")?,
    };
    Ok(config)
}

fn open_repository(path: &Path) -> Result<SqliteRepository> {
    if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create {}", dir.display()))?;
    }
    SqliteRepository::open(path).with_context(|| format!("Failed to open {}", path.display()))
}

#[tokio::main]
async fn main() -> Result<()> {
    init_tracing();
    let cli = Cli::parse();
    let config = load_config(cli.config.as_deref())?;

    if let Commands::Watch { interval_ms } = cli.command {
        let period = interval_ms.map_or(DEFAULT_POLL_INTERVAL, Duration::from_millis);
        return watch(config, &cli.db, period).await;
    }

    let board = SyncedScoreboard::open(config, open_repository(&cli.db)?)?;
    run(&board, cli.command)
}

fn run<R: Repository>(board: &SyncedScoreboard<R>, command: Commands) -> Result<()> {
    let now = Utc::now();

    match command {
        Commands::Propose {
            mode,
            winners,
            losers,
        } => {
            let proposal = board.propose_at(mode, winners, losers, now)?;
            println!("{}", render::proposal(&proposal));
            println!("A losing player confirms with: scoreboard confirm {} <code>", proposal.id);
        }
        Commands::Confirm { id, code } => {
            let record = board.confirm_at(id, &code, now)?;
            println!("Confirmed: {}", render::confirmed(&record));
        }
        Commands::Reject { id, code } => {
            board.reject_at(id, &code, now)?;
            println!("Rejected #{id}");
        }
        Commands::Pending => {
            board.prune_expired(now)?;
            let pending = board.board().list_pending(now);
            if pending.is_empty() {
                println!("No pending results");
            }
            for proposal in &pending {
                println!("{}", render::proposal(proposal));
            }
        }
        Commands::Rating { player, mode } => {
            let record = board.board().rating_of(&player, mode);
            print!("{}", render::rating(&player, mode, &record));
        }
        Commands::Rankings {
            mode,
            sort,
            reverse,
        } => {
            let rows = board.board().rankings(
                mode,
                RankingSort {
                    field: sort,
                    reversed: reverse,
                },
            );
            print!("{}", render::rankings(mode, &rows));
        }
        Commands::History {
            player,
            mode,
            limit,
        } => {
            let records = board.board().history(&HistoryFilter { player, mode });
            if records.is_empty() {
                println!("No matches yet");
            }
            for record in records.iter().take(limit) {
                println!("{}", render::confirmed(record));
            }
        }
        Commands::Player { name } => {
            print!("{}", render::summary(&board.board().player_summary(&name)));
        }
        Commands::Overview => {
            print!("{}", render::overview(&board.board().overview(now)));
        }
        Commands::Tally => {
            let tally = board.board().cohort_tally();
            println!("{}", render::tally(&tally, &board.board().config().cohorts));
        }
        Commands::SetCode { player, code } => {
            board.set_credential(&player, &code)?;
            println!("Code set for {player}");
        }
        Commands::Calc { rating_a, rating_b } => {
            let calc = board.board().config().calculator().calculate(rating_a, rating_b);
            println!("{}", render::calculation(rating_a, rating_b, &calc));
        }
        Commands::Watch { .. } => bail!("watch is handled before opening the scoreboard"),
    }
    Ok(())
}

async fn watch(config: ScoreboardConfig, db: &Path, period: Duration) -> Result<()> {
    let repo = Arc::new(open_repository(db)?);
    let board = Arc::new(SyncedScoreboard::open(config, Arc::clone(&repo))?);

    let mut events = repo.subscribe();
    let following = tokio::spawn(Arc::clone(&board).follow(repo.subscribe()));
    let watcher = tokio::spawn(watch_changes(Arc::clone(&repo), period));
    tracing::info!(db = %db.display(), ?period, "Watching for changes");

    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            event = events.recv() => match event {
                Ok(event) => println!("{} changed (revision {})", event.path, event.revision),
                Err(RecvError::Lagged(skipped)) => println!("missed {skipped} change(s)"),
                Err(RecvError::Closed) => break,
            },
        }
    }

    watcher.abort();
    following.abort();
    Ok(())
}
