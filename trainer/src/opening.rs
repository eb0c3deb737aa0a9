//! Openings in the user's repertoire and the library that manages them.

use std::path::{Path, PathBuf};

use chess::{parse_pgn, Game, MoveTree, Side, StartPosition};

use crate::lines::{extract_lines, Line};
use crate::persistence::{NewOpening, OpeningRecord, OpeningRepository, PersistenceError};

/// A repertoire entry with its move tree and extracted lines.
#[derive(Debug, Clone)]
pub struct Opening {
    pub id: i64,
    pub name: String,
    pub pgn_path: PathBuf,
    /// The color the user plays.
    pub side: Side,
    /// None when the PGN could not be read or parsed.
    pub tree: Option<MoveTree>,
    pub lines: Vec<Line>,
}

impl Opening {
    /// Build an opening from PGN text. A parse failure leaves the opening
    /// without a tree and without lines.
    pub fn from_pgn_text(id: i64, name: &str, side: Side, pgn: &str) -> Self {
        let tree = match parse_pgn(pgn) {
            Ok(game) => Some(game.tree),
            Err(e) => {
                tracing::warn!("Could not parse PGN for opening '{}': {}", name, e);
                None
            }
        };
        let lines = extract_lines(tree.as_ref());
        Self {
            id,
            name: name.to_string(),
            pgn_path: PathBuf::new(),
            side,
            tree,
            lines,
        }
    }

    /// Read and parse the PGN file behind a stored record.
    pub fn load(record: &OpeningRecord) -> Self {
        let path = PathBuf::from(&record.pgn_path);
        let mut opening = match std::fs::read_to_string(&path) {
            Ok(text) => Self::from_pgn_text(record.id, &record.name, record.side, &text),
            Err(e) => {
                tracing::warn!("Could not read PGN {:?} for '{}': {}", path, record.name, e);
                Self {
                    id: record.id,
                    name: record.name.clone(),
                    pgn_path: PathBuf::new(),
                    side: record.side,
                    tree: None,
                    lines: Vec::new(),
                }
            }
        };
        opening.pgn_path = path;
        opening
    }

    /// An opening is usable only if it yields at least one line.
    pub fn is_valid(&self) -> bool {
        !self.lines.is_empty()
    }

    pub fn start_position(&self) -> StartPosition {
        match &self.tree {
            Some(tree) if tree.has_custom_start() => StartPosition::Fen(tree.start_fen().to_string()),
            _ => StartPosition::Standard,
        }
    }

    /// `"Name (white)"`
    pub fn display_name(&self) -> String {
        format!("{} ({})", self.name, self.side)
    }

    /// Line `index` in SAN, or None if it does not exist or cannot be
    /// replayed.
    pub fn line_san(&self, index: usize) -> Option<Vec<String>> {
        let line = self.lines.get(index)?;
        let game = Game::replay(self.start_position(), line).ok()?;
        Some(game.history().iter().map(|entry| entry.san.clone()).collect())
    }
}

#[derive(Debug, thiserror::Error)]
pub enum LibraryError {
    #[error("Opening '{name}' for {side} already exists")]
    Duplicate { name: String, side: Side },
    #[error("No opening '{name}' for {side}")]
    NotFound { name: String, side: Side },
    #[error("Cannot read {path:?}: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("{0:?} contains no playable lines")]
    NoLines(PathBuf),
    #[error(transparent)]
    Persistence(PersistenceError),
}

impl From<PersistenceError> for LibraryError {
    fn from(e: PersistenceError) -> Self {
        match e {
            PersistenceError::DuplicateOpening { name, side } => Self::Duplicate { name, side },
            other => Self::Persistence(other),
        }
    }
}

/// A user's openings, loaded from the repository with their trees.
pub struct OpeningLibrary<R> {
    repo: R,
    user_id: i64,
    openings: Vec<Opening>,
}

impl<R: OpeningRepository> OpeningLibrary<R> {
    /// Load every opening of `user_id`. Openings whose PGN cannot be read
    /// are kept, without lines, so they can still be removed.
    pub async fn load(repo: R, user_id: i64) -> Result<Self, LibraryError> {
        let records = repo.list_openings(user_id).await?;
        let openings: Vec<Opening> = records.iter().map(Opening::load).collect();
        tracing::info!("Loaded {} openings for user {}", openings.len(), user_id);
        Ok(Self {
            repo,
            user_id,
            openings,
        })
    }

    pub fn openings(&self) -> &[Opening] {
        &self.openings
    }

    pub fn find(&self, name: &str, side: Side) -> Option<&Opening> {
        self.openings
            .iter()
            .find(|o| o.name == name && o.side == side)
    }

    pub fn by_id(&self, id: i64) -> Option<&Opening> {
        self.openings.iter().find(|o| o.id == id)
    }

    /// Openings the user plays as `side`.
    pub fn by_side(&self, side: Side) -> Vec<&Opening> {
        self.openings.iter().filter(|o| o.side == side).collect()
    }

    pub fn names(&self) -> Vec<String> {
        self.openings.iter().map(Opening::display_name).collect()
    }

    /// Parse the PGN at `path` and store it as a new opening. Nothing is
    /// stored if the name is taken for that side or the file has no lines.
    pub async fn add_opening(
        &mut self,
        name: &str,
        path: &Path,
        side: Side,
    ) -> Result<&Opening, LibraryError> {
        if self.find(name, side).is_some() {
            return Err(LibraryError::Duplicate {
                name: name.to_string(),
                side,
            });
        }

        let text = std::fs::read_to_string(path).map_err(|source| LibraryError::Unreadable {
            path: path.to_path_buf(),
            source,
        })?;
        let mut opening = Opening::from_pgn_text(0, name, side, &text);
        if !opening.is_valid() {
            return Err(LibraryError::NoLines(path.to_path_buf()));
        }

        let pgn_path = std::fs::canonicalize(path).unwrap_or_else(|_| path.to_path_buf());
        let record = self
            .repo
            .insert_opening(&NewOpening {
                user_id: self.user_id,
                name: name.to_string(),
                pgn_path: pgn_path.display().to_string(),
                side,
            })
            .await?;

        opening.id = record.id;
        opening.pgn_path = pgn_path;
        tracing::info!(
            "Added opening '{}' ({} lines)",
            opening.display_name(),
            opening.lines.len()
        );
        self.openings.push(opening);
        let index = self.openings.len() - 1;
        Ok(&self.openings[index])
    }

    /// Remove an opening and, through the repository, its mistakes.
    pub async fn remove_opening(&mut self, name: &str, side: Side) -> Result<(), LibraryError> {
        let Some(index) = self
            .openings
            .iter()
            .position(|o| o.name == name && o.side == side)
        else {
            return Err(LibraryError::NotFound {
                name: name.to_string(),
                side,
            });
        };

        self.repo.delete_opening(self.openings[index].id).await?;
        let removed = self.openings.remove(index);
        tracing::info!("Removed opening '{}'", removed.display_name());
        Ok(())
    }
}
