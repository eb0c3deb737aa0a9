use cozy_chess::Board;

/// FEN of the standard starting position.
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

/// Parse a FEN string into a Board.
///
/// Accepts the four-field form (no move clocks) by assuming `0 1`.
pub fn parse_fen(fen: &str) -> Result<Board, FenError> {
    let parts: Vec<&str> = fen.split_whitespace().collect();
    match parts.len() {
        0 => Err(FenError::InvalidFormat),
        4 => format!("{} 0 1", parts.join(" "))
            .parse()
            .map_err(|_| FenError::InvalidBoardLayout),
        6 => parts
            .join(" ")
            .parse()
            .map_err(|_| FenError::InvalidBoardLayout),
        _ => Err(FenError::InvalidFormat),
    }
}

/// Format a Board as a FEN string
pub fn format_fen(board: &Board) -> String {
    board.to_string()
}

/// The piece-placement field of a FEN, ignoring side to move, castling,
/// en passant and clocks.
pub fn placement(fen: &str) -> &str {
    fen.split_whitespace().next().unwrap_or("")
}

/// Piece placement of a board, comparable with [`placement`].
pub fn board_placement(board: &Board) -> String {
    placement(&format_fen(board)).to_string()
}

#[derive(Debug, thiserror::Error)]
pub enum FenError {
    #[error("Invalid FEN format")]
    InvalidFormat,
    #[error("Invalid board layout")]
    InvalidBoardLayout,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn starting_fen_roundtrips() {
        let board = parse_fen(STARTING_FEN).unwrap();
        assert_eq!(format_fen(&board), STARTING_FEN);
        assert_eq!(board, Board::default());
    }

    #[test]
    fn accepts_fen_without_clocks() {
        let board = parse_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq -").unwrap();
        assert_eq!(
            board_placement(&board),
            "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR"
        );
    }

    #[test]
    fn rejects_garbage() {
        assert!(matches!(parse_fen(""), Err(FenError::InvalidFormat)));
        assert!(parse_fen("not a fen at all x y").is_err());
        assert!(parse_fen("rnbqkbnr/pppppppp/9/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1").is_err());
    }

    #[test]
    fn placement_ignores_state_fields() {
        assert_eq!(
            placement("8/8/8/8/8/8/8/K6k w - - 3 40"),
            placement("8/8/8/8/8/8/8/K6k b - - 0 1")
        );
    }
}
