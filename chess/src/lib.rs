pub mod fen;
pub mod game;
pub mod pgn;
pub mod types;
pub mod uci;

pub use fen::{board_placement, format_fen, parse_fen, placement, FenError, STARTING_FEN};
pub use game::{legal_moves, Game, GameError, HistoryEntry, StartPosition};
pub use pgn::{
    format_san, parse_pgn, parse_pgn_games, parse_san, GameResult, MoveNode, MoveTree, NodeId,
    PgnError, PgnGame, SanError,
};
pub use types::{ParseSideError, Side};
pub use uci::{
    convert_uci_castling_to_cozy, format_uci_move, parse_uci_coordinates, parse_uci_move,
    to_standard_uci, UciError,
};
