//! UCI (Universal Chess Interface) move notation

use cozy_chess::{Board, File, Move, Piece, Rank, Square};

use crate::game::legal_moves;

/// Convert UCI castling notation to cozy_chess notation
///
/// UCI uses standard notation (king moves 2 squares): e1g1, e1c1, e8g8, e8c8
/// cozy_chess uses king-to-rook notation: e1h1, e1a1, e8h8, e8a8
///
/// This function checks if the move is a castling move and converts it to the
/// appropriate cozy_chess format by finding the matching legal move.
pub fn convert_uci_castling_to_cozy(mv: Move, legal_moves: &[Move]) -> Move {
    let is_rank_1_or_8 = matches!(mv.from.rank(), Rank::First | Rank::Eighth);
    let is_e_file = matches!(mv.from.file(), File::E);
    let is_g_or_c_file = matches!(mv.to.file(), File::G | File::C);

    if is_rank_1_or_8 && is_e_file && is_g_or_c_file && mv.promotion.is_none() {
        let target_square = match mv.to.file() {
            File::G => Square::new(File::H, mv.from.rank()),
            File::C => Square::new(File::A, mv.from.rank()),
            _ => return mv,
        };

        let converted = Move {
            from: mv.from,
            to: target_square,
            promotion: None,
        };

        // A plain king step to g1/c1 stays as-is; only rewrite real castles
        if !legal_moves.contains(&mv) && legal_moves.contains(&converted) {
            return converted;
        }
    }

    mv
}

/// Format a move in UCI notation (e.g., "e2e4", "e7e8q"), exactly as stored
/// by cozy_chess. Castling comes out king-to-rook; see [`to_standard_uci`].
pub fn format_uci_move(mv: Move) -> String {
    let mut s = format!("{}{}", format_square(mv.from), format_square(mv.to));
    if let Some(promo) = mv.promotion {
        s.push(format_piece(promo));
    }
    s
}

/// Format a move played from `board` in standard UCI notation, rendering
/// castling as the two-square king step (e1g1) rather than king-takes-rook.
pub fn to_standard_uci(board: &Board, mv: Move) -> String {
    if is_castling(board, mv) {
        let file = if mv.to.file() as u8 > mv.from.file() as u8 {
            File::G
        } else {
            File::C
        };
        let to = Square::new(file, mv.from.rank());
        return format!("{}{}", format_square(mv.from), format_square(to));
    }
    format_uci_move(mv)
}

/// Parse a UCI move string against `board`, accepting both castling
/// notations. The move must be legal in the position.
pub fn parse_uci_move(board: &Board, text: &str) -> Result<Move, UciError> {
    let mv = parse_uci_coordinates(text)?;
    let legal = legal_moves(board);
    let mv = convert_uci_castling_to_cozy(mv, &legal);
    if legal.contains(&mv) {
        Ok(mv)
    } else {
        Err(UciError::IllegalMove(text.to_string()))
    }
}

/// Parse the coordinates of a UCI move without checking legality.
pub fn parse_uci_coordinates(text: &str) -> Result<Move, UciError> {
    let text = text.trim();
    let chars: Vec<char> = text.chars().collect();
    if chars.len() != 4 && chars.len() != 5 {
        return Err(UciError::InvalidFormat(text.to_string()));
    }

    let from = parse_square(chars[0], chars[1])
        .ok_or_else(|| UciError::InvalidFormat(text.to_string()))?;
    let to = parse_square(chars[2], chars[3])
        .ok_or_else(|| UciError::InvalidFormat(text.to_string()))?;
    let promotion = match chars.get(4) {
        None => None,
        Some(c) => Some(
            parse_promotion(*c).ok_or_else(|| UciError::InvalidFormat(text.to_string()))?,
        ),
    };

    Ok(Move {
        from,
        to,
        promotion,
    })
}

/// Whether `mv` is a castling move in cozy_chess's king-takes-rook form.
pub fn is_castling(board: &Board, mv: Move) -> bool {
    board.piece_on(mv.from) == Some(Piece::King)
        && board.color_on(mv.to).is_some()
        && board.color_on(mv.to) == board.color_on(mv.from)
}

pub fn format_square(sq: Square) -> String {
    format!("{}{}", file_to_char(sq.file()), rank_to_char(sq.rank()))
}

pub fn format_piece(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'p',
        Piece::Knight => 'n',
        Piece::Bishop => 'b',
        Piece::Rook => 'r',
        Piece::Queen => 'q',
        Piece::King => 'k',
    }
}

pub(crate) fn file_to_char(file: File) -> char {
    (b'a' + file as u8) as char
}

pub(crate) fn rank_to_char(rank: Rank) -> char {
    (b'1' + rank as u8) as char
}

pub(crate) fn char_to_file(c: char) -> Option<File> {
    match c {
        'a'..='h' => Some(File::ALL[(c as u8 - b'a') as usize]),
        _ => None,
    }
}

pub(crate) fn char_to_rank(c: char) -> Option<Rank> {
    match c {
        '1'..='8' => Some(Rank::ALL[(c as u8 - b'1') as usize]),
        _ => None,
    }
}

pub(crate) fn parse_square(file: char, rank: char) -> Option<Square> {
    Some(Square::new(char_to_file(file)?, char_to_rank(rank)?))
}

fn parse_promotion(c: char) -> Option<Piece> {
    match c.to_ascii_lowercase() {
        'q' => Some(Piece::Queen),
        'r' => Some(Piece::Rook),
        'b' => Some(Piece::Bishop),
        'n' => Some(Piece::Knight),
        _ => None,
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum UciError {
    #[error("Invalid UCI move: {0}")]
    InvalidFormat(String),
    #[error("Illegal move: {0}")]
    IllegalMove(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_uci_move() {
        let mv = Move {
            from: Square::new(File::E, Rank::Second),
            to: Square::new(File::E, Rank::Fourth),
            promotion: None,
        };
        assert_eq!(format_uci_move(mv), "e2e4");
    }

    #[test]
    fn test_format_uci_move_with_promotion() {
        let mv = Move {
            from: Square::new(File::E, Rank::Seventh),
            to: Square::new(File::E, Rank::Eighth),
            promotion: Some(Piece::Queen),
        };
        assert_eq!(format_uci_move(mv), "e7e8q");
    }

    #[test]
    fn parses_legal_move_from_start() {
        let board = Board::default();
        let mv = parse_uci_move(&board, "g1f3").unwrap();
        assert_eq!(format_uci_move(mv), "g1f3");
        assert!(matches!(
            parse_uci_move(&board, "e2e5"),
            Err(UciError::IllegalMove(_))
        ));
        assert!(matches!(
            parse_uci_move(&board, "zz"),
            Err(UciError::InvalidFormat(_))
        ));
    }

    #[test]
    fn castling_converts_both_ways() {
        let board: Board = "r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1"
            .parse()
            .unwrap();
        let short = parse_uci_move(&board, "e1g1").unwrap();
        assert_eq!(format_uci_move(short), "e1h1");
        assert_eq!(to_standard_uci(&board, short), "e1g1");

        let long = parse_uci_move(&board, "e1a1").unwrap();
        assert_eq!(to_standard_uci(&board, long), "e1c1");
    }

    #[test]
    fn plain_king_step_is_not_rewritten() {
        let board: Board = "4k3/8/8/8/8/8/8/4K2R w - - 0 1".parse().unwrap();
        let step = parse_uci_move(&board, "e1f1").unwrap();
        assert_eq!(to_standard_uci(&board, step), "e1f1");
    }
}
