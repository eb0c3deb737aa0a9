use cozy_chess::{Board, GameStatus, Move, Piece, Square};

use crate::game::legal_moves;
use crate::uci::{char_to_file, char_to_rank, file_to_char, is_castling, parse_square, rank_to_char};

/// Parse Standard Algebraic Notation (SAN) move
pub fn parse_san(board: &Board, san: &str) -> Result<Move, SanError> {
    let text = san.trim().trim_end_matches(['+', '#', '!', '?']);
    if text.is_empty() {
        return Err(SanError::InvalidFormat(san.to_string()));
    }

    let legal = legal_moves(board);

    match text {
        "O-O" | "0-0" => return find_castle(board, &legal, true, san),
        "O-O-O" | "0-0-0" => return find_castle(board, &legal, false, san),
        _ => {}
    }

    let mut chars: Vec<char> = text.chars().filter(|c| *c != 'x' && *c != ':').collect();

    let piece = match chars.first() {
        Some('N') => Piece::Knight,
        Some('B') => Piece::Bishop,
        Some('R') => Piece::Rook,
        Some('Q') => Piece::Queen,
        Some('K') => Piece::King,
        Some(c) if c.is_ascii_lowercase() => Piece::Pawn,
        _ => return Err(SanError::InvalidFormat(san.to_string())),
    };
    if piece != Piece::Pawn {
        chars.remove(0);
    }

    // Promotion: trailing "=Q" or bare "Q"
    let mut promotion = None;
    if let Some(&last) = chars.last() {
        if last.is_ascii_uppercase() {
            promotion = Some(match last {
                'Q' => Piece::Queen,
                'R' => Piece::Rook,
                'B' => Piece::Bishop,
                'N' => Piece::Knight,
                _ => return Err(SanError::InvalidPromotion(san.to_string())),
            });
            chars.pop();
            if chars.last() == Some(&'=') {
                chars.pop();
            }
        }
    }

    if chars.len() < 2 {
        return Err(SanError::InvalidFormat(san.to_string()));
    }
    let rank_char = chars[chars.len() - 1];
    let file_char = chars[chars.len() - 2];
    let to = parse_square(file_char, rank_char)
        .ok_or_else(|| SanError::InvalidSquare(format!("{}{}", file_char, rank_char)))?;

    let mut from_file = None;
    let mut from_rank = None;
    for &c in &chars[..chars.len() - 2] {
        if let Some(f) = char_to_file(c) {
            from_file = Some(f);
        } else if let Some(r) = char_to_rank(c) {
            from_rank = Some(r);
        } else {
            return Err(SanError::InvalidFormat(san.to_string()));
        }
    }

    let candidates: Vec<Move> = legal
        .iter()
        .copied()
        .filter(|mv| {
            mv.to == to
                && board.piece_on(mv.from) == Some(piece)
                && mv.promotion == promotion
                && !is_castling(board, *mv)
                && from_file.is_none_or(|f| mv.from.file() == f)
                && from_rank.is_none_or(|r| mv.from.rank() == r)
        })
        .collect();

    match candidates.as_slice() {
        [mv] => Ok(*mv),
        [] => Err(SanError::NoLegalMove(san.to_string())),
        _ => Err(SanError::AmbiguousMove(san.to_string())),
    }
}

fn find_castle(board: &Board, legal: &[Move], kingside: bool, san: &str) -> Result<Move, SanError> {
    legal
        .iter()
        .copied()
        .find(|mv| {
            is_castling(board, *mv) && ((mv.to.file() as u8 > mv.from.file() as u8) == kingside)
        })
        .ok_or_else(|| SanError::NoLegalMove(san.to_string()))
}

/// Format a move as SAN. The move must be legal in `board`.
pub fn format_san(board: &Board, mv: Move) -> Result<String, SanError> {
    let legal = legal_moves(board);
    if !legal.contains(&mv) {
        return Err(SanError::NoLegalMove(crate::uci::format_uci_move(mv)));
    }

    let mut san = String::new();

    if is_castling(board, mv) {
        if mv.to.file() as u8 > mv.from.file() as u8 {
            san.push_str("O-O");
        } else {
            san.push_str("O-O-O");
        }
    } else {
        let piece = board
            .piece_on(mv.from)
            .ok_or_else(|| SanError::NoLegalMove(crate::uci::format_uci_move(mv)))?;
        let is_capture =
            board.piece_on(mv.to).is_some() || (piece == Piece::Pawn && mv.from.file() != mv.to.file());

        match piece {
            Piece::Pawn => {
                if is_capture {
                    san.push(file_to_char(mv.from.file()));
                }
            }
            _ => {
                san.push(piece_letter(piece));
                san.push_str(&disambiguation(board, &legal, mv, piece));
            }
        }

        if is_capture {
            san.push('x');
        }
        san.push_str(&square_str(mv.to));

        if let Some(promo) = mv.promotion {
            san.push('=');
            san.push(piece_letter(promo));
        }
    }

    let mut after = board.clone();
    after.play_unchecked(mv);
    if !after.checkers().is_empty() {
        if after.status() == GameStatus::Won {
            san.push('#');
        } else {
            san.push('+');
        }
    }

    Ok(san)
}

fn disambiguation(board: &Board, legal: &[Move], mv: Move, piece: Piece) -> String {
    let rivals: Vec<Square> = legal
        .iter()
        .filter(|other| {
            other.to == mv.to
                && other.from != mv.from
                && board.piece_on(other.from) == Some(piece)
                && !is_castling(board, **other)
        })
        .map(|other| other.from)
        .collect();

    if rivals.is_empty() {
        String::new()
    } else if rivals.iter().all(|sq| sq.file() != mv.from.file()) {
        file_to_char(mv.from.file()).to_string()
    } else if rivals.iter().all(|sq| sq.rank() != mv.from.rank()) {
        rank_to_char(mv.from.rank()).to_string()
    } else {
        square_str(mv.from)
    }
}

fn piece_letter(piece: Piece) -> char {
    match piece {
        Piece::Pawn => 'P',
        Piece::Knight => 'N',
        Piece::Bishop => 'B',
        Piece::Rook => 'R',
        Piece::Queen => 'Q',
        Piece::King => 'K',
    }
}

fn square_str(sq: Square) -> String {
    format!("{}{}", file_to_char(sq.file()), rank_to_char(sq.rank()))
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SanError {
    #[error("No legal move found for: {0}")]
    NoLegalMove(String),
    #[error("Ambiguous move: {0}")]
    AmbiguousMove(String),
    #[error("Invalid format: {0}")]
    InvalidFormat(String),
    #[error("Invalid square: {0}")]
    InvalidSquare(String),
    #[error("Invalid promotion: {0}")]
    InvalidPromotion(String),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::game::legal_moves;
    use proptest::prelude::*;

    fn board(fen: &str) -> Board {
        fen.parse().unwrap()
    }

    #[test]
    fn parses_basic_moves() {
        let b = Board::default();
        assert_eq!(crate::format_uci_move(parse_san(&b, "e4").unwrap()), "e2e4");
        assert_eq!(crate::format_uci_move(parse_san(&b, "Nf3").unwrap()), "g1f3");
        assert_eq!(crate::format_uci_move(parse_san(&b, "Nc3!?").unwrap()), "b1c3");
        assert!(matches!(parse_san(&b, "e5"), Err(SanError::NoLegalMove(_))));
        assert!(matches!(parse_san(&b, "Zz9"), Err(SanError::InvalidFormat(_))));
    }

    #[test]
    fn disambiguates_by_file_and_rank() {
        // Knights on b1 and f1 can both reach d2
        let b = board("4k3/8/8/8/8/8/8/1N2KN2 w - - 0 1");
        assert!(matches!(parse_san(&b, "Nd2"), Err(SanError::AmbiguousMove(_))));
        let mv = parse_san(&b, "Nbd2").unwrap();
        assert_eq!(format_san(&b, mv).unwrap(), "Nbd2");

        // Rooks on a1 and a5 both reach a3
        let b = board("4k3/8/8/R7/8/8/8/R3K3 w - - 0 1");
        let mv = parse_san(&b, "R1a3").unwrap();
        assert_eq!(format_san(&b, mv).unwrap(), "R1a3");
    }

    #[test]
    fn castling_and_promotion() {
        let b = board("r3k2r/pppppppp/8/8/8/8/PPPPPPPP/R3K2R w KQkq - 0 1");
        let short = parse_san(&b, "O-O").unwrap();
        assert_eq!(format_san(&b, short).unwrap(), "O-O");
        let long = parse_san(&b, "0-0-0").unwrap();
        assert_eq!(format_san(&b, long).unwrap(), "O-O-O");

        let b = board("8/P6k/8/8/8/8/8/K7 w - - 0 1");
        let mv = parse_san(&b, "a8=Q").unwrap();
        assert_eq!(mv.promotion, Some(Piece::Queen));
        assert_eq!(format_san(&b, mv).unwrap(), "a8=Q");
        assert_eq!(parse_san(&b, "a8N").unwrap().promotion, Some(Piece::Knight));
    }

    #[test]
    fn check_and_mate_suffixes() {
        // Fool's mate
        let b = board("rnbqkbnr/pppp1ppp/8/4p3/6P1/5P2/PPPPP2P/RNBQKBNR b KQkq - 0 2");
        let mv = parse_san(&b, "Qh4").unwrap();
        assert_eq!(format_san(&b, mv).unwrap(), "Qh4#");

        let b = board("4k3/8/8/8/8/8/8/R3K3 w - - 0 1");
        let mv = parse_san(&b, "Ra8+").unwrap();
        assert_eq!(format_san(&b, mv).unwrap(), "Ra8+");
    }

    #[test]
    fn pawn_captures_include_file() {
        let b = board("rnbqkbnr/ppp1pppp/8/3p4/4P3/8/PPPP1PPP/RNBQKBNR w KQkq - 0 2");
        let mv = parse_san(&b, "exd5").unwrap();
        assert_eq!(format_san(&b, mv).unwrap(), "exd5");
    }

    #[test]
    fn illegal_move_cannot_be_formatted() {
        let b = Board::default();
        let mv = crate::uci::parse_uci_coordinates("e2e5").unwrap();
        assert!(format_san(&b, mv).is_err());
    }

    proptest! {
        #[test]
        fn formatted_san_parses_back_to_the_same_move(choices in proptest::collection::vec(0usize..64, 0..40)) {
            let mut b = Board::default();
            for choice in choices {
                let legal = legal_moves(&b);
                if legal.is_empty() {
                    break;
                }
                let mv = legal[choice % legal.len()];
                let san = format_san(&b, mv).unwrap();
                prop_assert_eq!(parse_san(&b, &san).unwrap(), mv);
                b.play_unchecked(mv);
            }
        }
    }
}
