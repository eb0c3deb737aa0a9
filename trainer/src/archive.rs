//! Finished games to analyze, and where they come from.

use std::collections::HashMap;
use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;

use chess::{parse_fen, parse_pgn_games, FenError, PgnGame, Side};
use chrono::{DateTime, Duration, NaiveDate, Utc};
use cozy_chess::{Board, Move};

use crate::config::MAX_ARCHIVE_GAMES;

/// A finished game: its headers and the moves actually played.
#[derive(Debug, Clone)]
pub struct ArchivedGame {
    pub headers: HashMap<String, String>,
    pub moves: Vec<Move>,
}

impl ArchivedGame {
    pub fn from_pgn(game: PgnGame) -> Self {
        let moves = game.tree.mainline();
        Self {
            headers: game.tags,
            moves,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).map(String::as_str)
    }

    /// Header value or `"?"`, for display.
    pub fn header_or_unknown(&self, name: &str) -> String {
        self.header(name).unwrap_or("?").to_string()
    }

    /// Which side `username` played, compared case-insensitively.
    pub fn player_side(&self, username: &str) -> Option<Side> {
        let matches = |header: &str| {
            self.header(header)
                .is_some_and(|name| name.eq_ignore_ascii_case(username))
        };
        if matches("White") {
            Some(Side::White)
        } else if matches("Black") {
            Some(Side::Black)
        } else {
            None
        }
    }

    /// Games without a `Variant` header are standard chess.
    pub fn is_standard(&self) -> bool {
        self.header("Variant")
            .is_none_or(|variant| variant.eq_ignore_ascii_case("standard"))
    }

    /// Start position, honoring a `FEN` header.
    pub fn start_board(&self) -> Result<Board, FenError> {
        match self.header("FEN") {
            Some(fen) => parse_fen(fen),
            None => Ok(Board::default()),
        }
    }

    /// Date the game was played, from `UTCDate` or `Date`.
    pub fn played_on(&self) -> Option<NaiveDate> {
        ["UTCDate", "Date"]
            .iter()
            .filter_map(|name| self.header(name))
            .find_map(|value| NaiveDate::parse_from_str(value, "%Y.%m.%d").ok())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum ArchiveError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("Archive unavailable: {0}")]
    Unavailable(String),
}

/// Source of a user's finished games.
pub trait GameArchive: Send + Sync {
    /// Standard-chess games of `username` played on or after `since`.
    fn fetch_games(
        &self,
        username: &str,
        since: DateTime<Utc>,
    ) -> impl Future<Output = Result<Vec<ArchivedGame>, ArchiveError>> + Send;
}

/// Games read from a local PGN export.
pub struct PgnArchive {
    path: PathBuf,
    max_games: usize,
}

impl PgnArchive {
    pub fn new(path: PathBuf) -> Self {
        Self {
            path,
            max_games: MAX_ARCHIVE_GAMES,
        }
    }

    pub fn with_max_games(mut self, max_games: usize) -> Self {
        self.max_games = max_games;
        self
    }
}

impl GameArchive for PgnArchive {
    async fn fetch_games(
        &self,
        username: &str,
        since: DateTime<Utc>,
    ) -> Result<Vec<ArchivedGame>, ArchiveError> {
        let text = tokio::fs::read_to_string(&self.path).await?;
        let since_day = since.date_naive();

        let mut games = Vec::new();
        for (index, parsed) in parse_pgn_games(&text).into_iter().enumerate() {
            let game = match parsed {
                Ok(game) => ArchivedGame::from_pgn(game),
                Err(e) => {
                    tracing::warn!("Skipping game {} in {:?}: {}", index + 1, self.path, e);
                    continue;
                }
            };
            if !game.is_standard() || game.player_side(username).is_none() {
                continue;
            }
            // Undated games are kept
            if game.played_on().is_some_and(|day| day < since_day) {
                continue;
            }
            games.push(game);
            if games.len() >= self.max_games {
                break;
            }
        }

        tracing::info!("Fetched {} games for {} from {:?}", games.len(), username, self.path);
        Ok(games)
    }
}

/// Window of games to analyze, ending now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TimeRange {
    Today,
    Last7Days,
    Last30Days,
}

impl TimeRange {
    /// Start of the window relative to `now`. "Today" starts at midnight UTC.
    pub fn since(self, now: DateTime<Utc>) -> DateTime<Utc> {
        match self {
            Self::Today => now
                .date_naive()
                .and_hms_opt(0, 0, 0)
                .map(|midnight| midnight.and_utc())
                .unwrap_or(now),
            Self::Last7Days => now - Duration::days(7),
            Self::Last30Days => now - Duration::days(30),
        }
    }
}

impl FromStr for TimeRange {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "today" => Ok(Self::Today),
            "7d" | "week" => Ok(Self::Last7Days),
            "30d" | "month" => Ok(Self::Last30Days),
            _ => Err(format!("Unknown time range: {}", s)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    const GAMES: &str = r#"[Event "Rated Blitz game"]
[White "Alice"]
[Black "bob"]
[UTCDate "2024.03.10"]
[Result "1-0"]

1. e4 e5 2. Nf3 Nc6 3. Bc4 1-0

[Event "Chess960"]
[White "alice"]
[Black "carol"]
[Variant "Chess960"]
[UTCDate "2024.03.10"]
[Result "0-1"]

1. d4 d5 0-1

[Event "Old game"]
[White "dave"]
[Black "ALICE"]
[Date "2023.01.01"]
[Result "1/2-1/2"]

1. e4 c5 1/2-1/2

[Event "Undated"]
[White "erin"]
[Black "alice"]
[Result "*"]

1. d4 Nf6 *

[Event "Not hers"]
[White "frank"]
[Black "grace"]
[Result "*"]

1. c4 *
"#;

    fn archive(dir: &tempfile::TempDir) -> PgnArchive {
        let path = dir.path().join("games.pgn");
        std::fs::write(&path, GAMES).unwrap();
        PgnArchive::new(path)
    }

    fn since() -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 3, 1, 0, 0, 0).unwrap()
    }

    #[tokio::test]
    async fn filters_variant_player_and_date() {
        let dir = tempfile::tempdir().unwrap();
        let games = archive(&dir).fetch_games("alice", since()).await.unwrap();
        let events: Vec<String> = games.iter().map(|g| g.header_or_unknown("Event")).collect();
        assert_eq!(events, vec!["Rated Blitz game", "Undated"]);
        assert_eq!(games[0].player_side("alice"), Some(Side::White));
        assert_eq!(games[1].player_side("ALICE"), Some(Side::Black));
        assert_eq!(games[0].moves.len(), 5);
    }

    #[tokio::test]
    async fn respects_the_game_limit() {
        let dir = tempfile::tempdir().unwrap();
        let games = archive(&dir)
            .with_max_games(1)
            .fetch_games("alice", since())
            .await
            .unwrap();
        assert_eq!(games.len(), 1);
    }

    #[tokio::test]
    async fn missing_file_is_an_error() {
        let archive = PgnArchive::new(PathBuf::from("/definitely/not/here.pgn"));
        assert!(matches!(
            archive.fetch_games("alice", since()).await,
            Err(ArchiveError::Io(_))
        ));
    }

    #[test]
    fn time_ranges() {
        let now = Utc.with_ymd_and_hms(2024, 3, 10, 15, 30, 0).unwrap();
        assert_eq!(
            TimeRange::Today.since(now),
            Utc.with_ymd_and_hms(2024, 3, 10, 0, 0, 0).unwrap()
        );
        assert_eq!(
            TimeRange::Last7Days.since(now),
            Utc.with_ymd_and_hms(2024, 3, 3, 15, 30, 0).unwrap()
        );
        assert_eq!("30d".parse::<TimeRange>().unwrap(), TimeRange::Last30Days);
        assert!("forever".parse::<TimeRange>().is_err());
    }

    #[test]
    fn played_on_prefers_utc_date() {
        let mut headers = HashMap::new();
        headers.insert("Date".to_string(), "2020.01.01".to_string());
        headers.insert("UTCDate".to_string(), "2020.01.02".to_string());
        let game = ArchivedGame {
            headers,
            moves: Vec::new(),
        };
        assert_eq!(game.played_on(), NaiveDate::from_ymd_opt(2020, 1, 2));
        assert!(game.is_standard());
    }
}
