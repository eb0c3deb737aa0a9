//! Batch comparison of played games against the user's repertoire.
//!
//! Every game is aligned with each opening the user plays for that side.
//! The first move where the user left the book becomes a mistake, at most
//! one per game and opening.

use std::collections::BTreeMap;

use chess::{format_fen, to_standard_uci, FenError, Side};

use crate::archive::{ArchivedGame, GameArchive, TimeRange};
use crate::deviation::{find_alignment, find_deviation_from};
use crate::opening::Opening;
use crate::persistence::{now_timestamp, Mistake, MistakeKey, MistakeRepository};

/// One departure from the repertoire in one game.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DeviationDetail {
    pub opening_id: i64,
    pub opening_name: String,
    pub opening_side: Side,
    pub event: String,
    pub white: String,
    pub black: String,
    pub date: String,
    pub result: String,
    pub site: String,
    pub user_color: Side,
    /// Position before the user's move.
    pub fen: String,
    pub user_move: String,
    /// Book moves from the position, in UCI.
    pub correct_moves: Vec<String>,
    pub move_number: u16,
}

impl DeviationDetail {
    pub fn position_description(&self) -> String {
        format!("{} to move, move {}", self.user_color, self.move_number)
    }
}

#[derive(Debug, Clone, Default)]
pub struct AnalysisReport {
    pub total_games: usize,
    pub total_deviations: usize,
    /// Stored mistakes touched by this batch, one per position and opening.
    pub mistakes: Vec<Mistake>,
    pub deviations: Vec<DeviationDetail>,
    /// Why no games could be analyzed, if the archive failed.
    pub error: Option<String>,
}

impl AnalysisReport {
    pub fn unique_mistakes(&self) -> usize {
        self.mistakes.len()
    }

    /// Deviations grouped by opening name.
    pub fn by_opening(&self) -> BTreeMap<&str, Vec<&DeviationDetail>> {
        let mut grouped: BTreeMap<&str, Vec<&DeviationDetail>> = BTreeMap::new();
        for detail in &self.deviations {
            grouped.entry(detail.opening_name.as_str()).or_default().push(detail);
        }
        grouped
    }

    fn absorb(&mut self, game: GameAnalysis) {
        self.total_games += 1;
        self.total_deviations += game.recorded;
        self.deviations.extend(game.deviations);
        for mistake in game.mistakes {
            let same = |m: &Mistake| m.fen == mistake.fen && m.opening_id == mistake.opening_id;
            match self.mistakes.iter_mut().find(|m| same(m)) {
                Some(existing) => *existing = mistake,
                None => self.mistakes.push(mistake),
            }
        }
    }
}

#[derive(Debug, Default)]
struct GameAnalysis {
    deviations: Vec<DeviationDetail>,
    mistakes: Vec<Mistake>,
    recorded: usize,
}

#[derive(Debug, thiserror::Error)]
enum GameFault {
    #[error("bad start position: {0}")]
    StartPosition(#[from] FenError),
}

pub struct PerformanceAnalyzer<'a, M> {
    mistakes: &'a M,
    user_id: i64,
    username: String,
    openings: &'a [Opening],
}

impl<'a, M: MistakeRepository> PerformanceAnalyzer<'a, M> {
    pub fn new(mistakes: &'a M, user_id: i64, username: &str, openings: &'a [Opening]) -> Self {
        Self {
            mistakes,
            user_id,
            username: username.to_string(),
            openings,
        }
    }

    /// Fetch the user's games for `range` and analyze them. An archive
    /// failure produces an empty report carrying the cause.
    pub async fn analyze<A: GameArchive>(&self, archive: &A, range: TimeRange) -> AnalysisReport {
        let since = range.since(chrono::Utc::now());
        match archive.fetch_games(&self.username, since).await {
            Ok(games) => self.analyze_games(&games).await,
            Err(e) => {
                tracing::warn!("Could not fetch games for {}: {}", self.username, e);
                AnalysisReport {
                    error: Some(e.to_string()),
                    ..AnalysisReport::default()
                }
            }
        }
    }

    /// Analyze `games`. A game that cannot be analyzed is logged and skipped.
    pub async fn analyze_games(&self, games: &[ArchivedGame]) -> AnalysisReport {
        let batch_time = now_timestamp();
        let mut report = AnalysisReport::default();

        for (index, game) in games.iter().enumerate() {
            let Some(side) = game.player_side(&self.username) else {
                tracing::debug!("Game {} does not involve {}", index + 1, self.username);
                continue;
            };
            match self.analyze_game(game, side, batch_time).await {
                Ok(analysis) => report.absorb(analysis),
                Err(e) => tracing::error!("Skipping game {}: {}", index + 1, e),
            }
        }

        tracing::info!(
            "Analyzed {} games: {} deviations, {} unique mistakes",
            report.total_games,
            report.total_deviations,
            report.unique_mistakes()
        );
        report
    }

    async fn analyze_game(
        &self,
        game: &ArchivedGame,
        side: Side,
        batch_time: u64,
    ) -> Result<GameAnalysis, GameFault> {
        let start = game.start_board()?;
        let mut analysis = GameAnalysis::default();

        for opening in self.openings.iter().filter(|o| o.side == side) {
            let Some(tree) = opening.tree.as_ref() else {
                tracing::debug!("Opening '{}' has no tree, skipping", opening.name);
                continue;
            };
            let Some((aligned_at, board)) = find_alignment(&start, &game.moves, tree.start_fen()) else {
                tracing::debug!("Game never reaches the start of '{}'", opening.name);
                continue;
            };
            let Some(deviation) = find_deviation_from(
                tree,
                tree.root(),
                board,
                &game.moves[aligned_at..],
                side,
                aligned_at,
            ) else {
                continue;
            };

            let correct_moves: Vec<String> = tree
                .children(deviation.node)
                .iter()
                .filter_map(|&child| tree.move_of(child))
                .filter(|&mv| deviation.board.is_legal(mv))
                .map(|mv| to_standard_uci(&deviation.board, mv))
                .collect();
            let Some(correct) = correct_moves.first().cloned() else {
                // Played past the end of the book
                continue;
            };

            let fen = format_fen(&deviation.board);
            let user_move = to_standard_uci(&deviation.board, deviation.played);
            tracing::info!(
                "Deviation in '{}' at move {}: played {}, book {:?}",
                opening.name,
                deviation.board.fullmove_number(),
                user_move,
                correct_moves
            );

            analysis.deviations.push(DeviationDetail {
                opening_id: opening.id,
                opening_name: opening.name.clone(),
                opening_side: opening.side,
                event: game.header_or_unknown("Event"),
                white: game.header_or_unknown("White"),
                black: game.header_or_unknown("Black"),
                date: game
                    .header("UTCDate")
                    .or_else(|| game.header("Date"))
                    .unwrap_or("?")
                    .to_string(),
                result: game.header_or_unknown("Result"),
                site: game.header_or_unknown("Site"),
                user_color: side,
                fen: fen.clone(),
                user_move,
                correct_moves,
                move_number: deviation.board.fullmove_number(),
            });

            let key = MistakeKey {
                fen,
                user_id: self.user_id,
                opening_id: Some(opening.id),
            };
            match self.mistakes.upsert_mistake(&key, &correct, batch_time).await {
                Ok(mistake) => {
                    analysis.recorded += 1;
                    analysis.mistakes.push(mistake);
                }
                Err(e) => tracing::error!("Failed to save mistake for '{}': {}", opening.name, e),
            }
        }

        Ok(analysis)
    }
}
