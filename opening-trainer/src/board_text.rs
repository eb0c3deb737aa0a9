//! Plain-text rendering of positions for the terminal.

use chess::uci::format_piece;
use chess::{parse_fen, Side};
use cozy_chess::{Board, Color, File, Rank, Square};

/// Render `board` as eight rows of piece letters, uppercase for White,
/// seen from `perspective`.
pub fn render_board(board: &Board, perspective: Side) -> String {
    let flipped = perspective == Side::Black;
    let mut out = String::new();

    for row in 0..8 {
        let rank = if flipped { row } else { 7 - row };
        out.push_str(&format!("{} ", rank + 1));
        for col in 0..8 {
            let file = if flipped { 7 - col } else { col };
            let square = Square::new(File::index(file), Rank::index(rank));
            let symbol = match (board.piece_on(square), board.color_on(square)) {
                (Some(piece), Some(Color::White)) => format_piece(piece).to_ascii_uppercase(),
                (Some(piece), Some(Color::Black)) => format_piece(piece),
                _ => '.',
            };
            out.push(symbol);
            out.push(' ');
        }
        out.push('\n');
    }

    let files = if flipped { "h g f e d c b a" } else { "a b c d e f g h" };
    out.push_str("  ");
    out.push_str(files);
    out
}

/// Render a FEN, from the side to move when no perspective is given.
/// An unreadable FEN is returned as-is.
pub fn render_fen(fen: &str, perspective: Option<Side>) -> String {
    match parse_fen(fen) {
        Ok(board) => {
            let side = perspective.unwrap_or_else(|| Side::from(board.side_to_move()));
            render_board(&board, side)
        }
        Err(_) => fen.to_string(),
    }
}
