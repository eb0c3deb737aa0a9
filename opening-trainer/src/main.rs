//! Opening trainer command line.
//!
//! Every subcommand opens the trainer database in the data directory (see
//! [`trainer::config`]), acts for one user, and exits. `train` and `review`
//! run an interactive session on stdin/stdout; logs go to a daily file in
//! the data directory so they never mix with the board.

use std::path::PathBuf;

use chess::Side;
use clap::{Parser, Subcommand};
use trainer::config;
use trainer::persistence::sqlite::DEFAULT_USERNAME;
use trainer::session::TrainingError;
use trainer::{LibraryError, PersistenceError, TimeRange};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

mod app;
mod board_text;
mod drill;
mod report;

/// Top-level CLI arguments.
#[derive(Parser)]
#[command(name = "opening-trainer", about = "Drill chess opening repertoires")]
struct Cli {
    /// Local user whose repertoire and mistakes are used.
    #[arg(short, long, global = true, default_value = DEFAULT_USERNAME)]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Add a PGN file to the repertoire.
    Import {
        name: String,
        pgn: PathBuf,
        /// Color you play in this opening.
        #[arg(short, long)]
        side: Side,
    },
    /// Remove an opening and its recorded mistakes.
    Remove {
        name: String,
        #[arg(short, long)]
        side: Side,
    },
    /// List openings in the repertoire.
    List,
    /// Print every line of an opening.
    Lines {
        name: String,
        #[arg(short, long)]
        side: Side,
    },
    /// Train the lines of an opening.
    Train {
        name: String,
        #[arg(short, long)]
        side: Side,
    },
    /// Review recorded mistakes in random order.
    Review {
        /// Only mistakes missed since midnight (UTC).
        #[arg(long)]
        today: bool,
    },
    /// Compare played games with the repertoire and record deviations.
    Analyze {
        /// PGN export of played games.
        games: PathBuf,
        /// today, 7d or 30d
        #[arg(short, long, default_value = "today")]
        range: TimeRange,
        /// Player name in the games. Defaults to the stored Lichess username.
        #[arg(long)]
        player: Option<String>,
        /// Review the mistakes found right after the analysis.
        #[arg(long)]
        review: bool,
    },
    /// Show or change user settings.
    Settings {
        #[arg(long)]
        lichess_username: Option<String>,
        /// Pause before the opponent's reply, in milliseconds.
        #[arg(long)]
        opponent_delay_ms: Option<u64>,
        /// How long a wrong move stays on screen, in milliseconds.
        #[arg(long)]
        error_delay_ms: Option<u64>,
    },
}

/// Error type for CLI operations.
#[derive(Debug, thiserror::Error)]
pub enum CliError {
    #[error(transparent)]
    Persistence(#[from] PersistenceError),

    #[error(transparent)]
    Library(#[from] LibraryError),

    #[error("cannot start training: {0}")]
    Training(#[from] TrainingError),

    #[error("no opening '{name}' for {side}")]
    UnknownOpening { name: String, side: Side },

    #[error("no player name given and no Lichess username stored")]
    NoPlayer,

    #[error("failed to read input: {0}")]
    Input(#[from] std::io::Error),
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    let data_dir = config::get_data_dir();

    // Set up tracing with file output in the data directory
    let log_dir = config::log_dir(&data_dir);
    std::fs::create_dir_all(&log_dir).ok();
    let file_appender = tracing_appender::rolling::daily(&log_dir, "opening-trainer");
    let (non_blocking, _guard) = tracing_appender::non_blocking(file_appender);

    tracing_subscriber::registry()
        .with(
            fmt::layer()
                .with_writer(non_blocking)
                .with_ansi(false)
                .with_target(true)
                .with_line_number(true),
        )
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    tracing::info!("Using data directory: {}", data_dir.display());

    let mut app = app::App::open(&data_dir, &cli.user).await?;
    match cli.command {
        Commands::Import { name, pgn, side } => app.import(&name, &pgn, side).await?,
        Commands::Remove { name, side } => app.remove(&name, side).await?,
        Commands::List => app.list(),
        Commands::Lines { name, side } => app.lines(&name, side)?,
        Commands::Train { name, side } => app.train(&name, side).await?,
        Commands::Review { today } => app.review(today).await?,
        Commands::Analyze {
            games,
            range,
            player,
            review,
        } => app.analyze(games, range, player, review).await?,
        Commands::Settings {
            lichess_username,
            opponent_delay_ms,
            error_delay_ms,
        } => {
            app.settings(lichess_username, opponent_delay_ms, error_delay_ms)
                .await?
        }
    }

    tracing::info!("Done");
    Ok(())
}
