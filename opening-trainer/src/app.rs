//! Subcommand implementations over one user's data.

use std::path::{Path, PathBuf};
use std::time::Duration;

use chess::Side;
use trainer::config;
use trainer::persistence::sqlite::{
    Database, SqliteMistakeRepository, SqliteOpeningRepository, SqliteUserRepository,
};
use trainer::persistence::{Mistake, MistakeRepository, UserRecord, UserRepository};
use trainer::session::{event_channel, SessionDelays};
use trainer::{
    Opening, OpeningLibrary, PerformanceAnalyzer, PgnArchive, ProgressStore, ReviewSession,
    TimeRange, TrainingSession,
};

use crate::drill::{run_drill, MistakeSink};
use crate::report::print_report;
use crate::CliError;

pub struct App {
    db: Database,
    data_dir: PathBuf,
    user: UserRecord,
    library: OpeningLibrary<SqliteOpeningRepository>,
}

impl App {
    pub async fn open(data_dir: &Path, username: &str) -> Result<Self, CliError> {
        let db = Database::open_in(data_dir).await?;
        let user = SqliteUserRepository::new(db.pool().clone())
            .get_or_create_user(username)
            .await?;
        let library =
            OpeningLibrary::load(SqliteOpeningRepository::new(db.pool().clone()), user.id).await?;
        Ok(Self {
            db,
            data_dir: data_dir.to_path_buf(),
            user,
            library,
        })
    }

    fn mistakes(&self) -> SqliteMistakeRepository {
        SqliteMistakeRepository::new(self.db.pool().clone())
    }

    fn opening(&self, name: &str, side: Side) -> Result<&Opening, CliError> {
        self.library
            .find(name, side)
            .ok_or_else(|| CliError::UnknownOpening {
                name: name.to_string(),
                side,
            })
    }

    pub async fn import(&mut self, name: &str, pgn: &Path, side: Side) -> Result<(), CliError> {
        let opening = self.library.add_opening(name, pgn, side).await?;
        println!(
            "Added {} with {} lines.",
            opening.display_name(),
            opening.lines.len()
        );
        Ok(())
    }

    pub async fn remove(&mut self, name: &str, side: Side) -> Result<(), CliError> {
        self.library.remove_opening(name, side).await?;
        println!("Removed {} ({}).", name, side);
        Ok(())
    }

    pub fn list(&self) {
        if self.library.openings().is_empty() {
            println!("No openings yet. Add one with `import`.");
            return;
        }
        for opening in self.library.openings() {
            let status = if opening.is_valid() {
                format!("{} lines", opening.lines.len())
            } else {
                format!("unreadable: {}", opening.pgn_path.display())
            };
            println!("{:<40} {}", opening.display_name(), status);
        }
    }

    pub fn lines(&self, name: &str, side: Side) -> Result<(), CliError> {
        let opening = self.opening(name, side)?;
        for index in 0..opening.lines.len() {
            match opening.line_san(index) {
                Some(moves) => println!("{:>3}. {}", index + 1, moves.join(" ")),
                None => println!("{:>3}. (cannot be replayed)", index + 1),
            }
        }
        Ok(())
    }

    pub async fn train(&self, name: &str, side: Side) -> Result<(), CliError> {
        let opening = self.opening(name, side)?;
        let progress = ProgressStore::open(config::progress_path(&self.data_dir));
        let delays =
            SessionDelays::from_millis(self.user.training_delay_ms, self.user.error_display_delay_ms);
        let (tx, rx) = event_channel();
        let session = TrainingSession::new(opening, progress, delays, tx)?;

        let sink = MistakeSink {
            repo: self.mistakes(),
            user_id: self.user.id,
            opening_id: opening.id,
        };
        println!("Training {}", opening.display_name());
        run_drill(session, &opening.display_name(), rx, Some(&sink), Some(side)).await
    }

    pub async fn review(&self, today: bool) -> Result<(), CliError> {
        let repo = self.mistakes();
        let mistakes = if today {
            let since = TimeRange::Today.since(chrono::Utc::now()).timestamp();
            repo.mistakes_since(self.user.id, u64::try_from(since).unwrap_or_default())
                .await?
        } else {
            repo.list_mistakes(self.user.id).await?
        };
        self.run_review(mistakes).await
    }

    /// Review `mistakes`, dropping any whose opening is gone.
    async fn run_review(&self, mistakes: Vec<Mistake>) -> Result<(), CliError> {
        let mistakes: Vec<Mistake> = mistakes
            .into_iter()
            .filter(|m| m.opening_id.is_none_or(|id| self.library.by_id(id).is_some()))
            .collect();
        if mistakes.is_empty() {
            println!("No mistakes to review.");
            return Ok(());
        }

        let (tx, rx) = event_channel();
        let delay = Duration::from_millis(config::REVIEW_FEEDBACK_DELAY_MS);
        let session = ReviewSession::new(mistakes, delay, tx);
        run_drill(session, "review", rx, None, None).await
    }

    pub async fn analyze(
        &self,
        games: PathBuf,
        range: TimeRange,
        player: Option<String>,
        review: bool,
    ) -> Result<(), CliError> {
        let player = player
            .or_else(|| self.user.lichess_username.clone())
            .ok_or(CliError::NoPlayer)?;
        let repo = self.mistakes();
        let analyzer =
            PerformanceAnalyzer::new(&repo, self.user.id, &player, self.library.openings());
        let report = analyzer.analyze(&PgnArchive::new(games), range).await;
        print_report(&report);

        if review && !report.mistakes.is_empty() {
            self.run_review(report.mistakes).await?;
        }
        Ok(())
    }

    pub async fn settings(
        &mut self,
        lichess_username: Option<String>,
        opponent_delay_ms: Option<u64>,
        error_delay_ms: Option<u64>,
    ) -> Result<(), CliError> {
        let mut settings = self.user.settings();
        let changed =
            lichess_username.is_some() || opponent_delay_ms.is_some() || error_delay_ms.is_some();
        if let Some(name) = lichess_username {
            settings.lichess_username = Some(name).filter(|n| !n.is_empty());
        }
        if let Some(ms) = opponent_delay_ms {
            settings.training_delay_ms = ms;
        }
        if let Some(ms) = error_delay_ms {
            settings.error_display_delay_ms = ms;
        }

        if changed {
            SqliteUserRepository::new(self.db.pool().clone())
                .save_settings(self.user.id, &settings)
                .await?;
            self.user.lichess_username = settings.lichess_username.clone();
            self.user.training_delay_ms = settings.training_delay_ms;
            self.user.error_display_delay_ms = settings.error_display_delay_ms;
        }

        println!("User:            {}", self.user.username);
        println!(
            "Lichess:         {}",
            settings.lichess_username.as_deref().unwrap_or("-")
        );
        println!("Opponent delay:  {} ms", settings.training_delay_ms);
        println!("Error delay:     {} ms", settings.error_display_delay_ms);
        Ok(())
    }
}
