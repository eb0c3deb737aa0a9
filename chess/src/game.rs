use cozy_chess::{Board, Move};

use crate::pgn::san::{format_san, SanError};
use crate::types::Side;

/// A board plus the moves that led to it from a fixed start position.
#[derive(Debug, Clone)]
pub struct Game {
    position: Board,
    history: Vec<HistoryEntry>,
}

/// One applied move with its notation and the resulting position.
#[derive(Debug, Clone)]
pub struct HistoryEntry {
    pub mv: Move,
    pub san: String, // Standard Algebraic Notation
    pub fen: String, // FEN after this move
}

/// Starting position of the game
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StartPosition {
    Standard,
    Fen(String),
}

impl StartPosition {
    pub fn board(&self) -> Result<Board, GameError> {
        match self {
            Self::Standard => Ok(Board::default()),
            Self::Fen(fen) => Ok(crate::fen::parse_fen(fen)?),
        }
    }
}

impl Game {
    pub fn from_start(start_position: StartPosition) -> Result<Self, GameError> {
        Ok(Self {
            position: start_position.board()?,
            history: Vec::new(),
        })
    }

    /// Play `moves` from `start`, stopping with an error at the first illegal one.
    pub fn replay(start: StartPosition, moves: &[Move]) -> Result<Self, GameError> {
        let mut game = Self::from_start(start)?;
        for &mv in moves {
            game.make_move(mv)?;
        }
        Ok(game)
    }

    /// Get the current board position
    pub fn position(&self) -> &Board {
        &self.position
    }

    /// Get the move history
    pub fn history(&self) -> &[HistoryEntry] {
        &self.history
    }

    /// Make a move on the board
    pub fn make_move(&mut self, mv: Move) -> Result<&HistoryEntry, GameError> {
        let san = format_san(&self.position, mv).map_err(|_| GameError::IllegalMove)?;
        self.position.play_unchecked(mv);

        let entry = HistoryEntry {
            mv,
            san,
            fen: self.to_fen(),
        };
        self.history.push(entry);

        self.history.last().ok_or(GameError::IllegalMove)
    }

    /// SAN for a move from the current position.
    pub fn san(&self, mv: Move) -> Result<String, SanError> {
        format_san(&self.position, mv)
    }

    /// Get the side to move
    pub fn side_to_move(&self) -> Side {
        self.position.side_to_move().into()
    }

    /// Export position to FEN string
    pub fn to_fen(&self) -> String {
        crate::fen::format_fen(&self.position)
    }
}

/// All legal moves in `board`.
pub fn legal_moves(board: &Board) -> Vec<Move> {
    let mut moves = Vec::new();
    board.generate_moves(|mvs| {
        moves.extend(mvs);
        false
    });
    moves
}

#[derive(Debug, thiserror::Error)]
pub enum GameError {
    #[error("Illegal move")]
    IllegalMove,
    #[error("FEN parse error: {0}")]
    FenError(#[from] crate::fen::FenError),
}
