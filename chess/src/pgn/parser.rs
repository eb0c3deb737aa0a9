use cozy_chess::Board;
use std::collections::HashMap;

use super::san::{parse_san, SanError};
use super::tree::{MoveTree, NodeId};
use crate::fen::{parse_fen, FenError};

/// A parsed PGN game
#[derive(Debug, Clone)]
pub struct PgnGame {
    pub tags: HashMap<String, String>,
    pub tree: MoveTree,
    pub result: GameResult,
}

impl PgnGame {
    pub fn tag(&self, name: &str) -> Option<&str> {
        self.tags.get(name).map(String::as_str)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
    Ongoing,
}

impl GameResult {
    fn from_token(token: &str) -> Option<Self> {
        match token {
            "1-0" => Some(Self::WhiteWins),
            "0-1" => Some(Self::BlackWins),
            "1/2-1/2" => Some(Self::Draw),
            "*" => Some(Self::Ongoing),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
enum Token {
    Tag(String, String),
    BadTag(String),
    San(String),
    Nag(u8),
    Comment(String),
    VariationStart,
    VariationEnd,
    Result(GameResult),
}

/// Parse the first game of a PGN string, keeping every variation.
pub fn parse_pgn(input: &str) -> Result<PgnGame, PgnError> {
    split_games(tokenize(input))
        .into_iter()
        .next()
        .ok_or(PgnError::Empty)
        .and_then(build_game)
}

/// Parse every game of a multi-game PGN string. Each entry fails or
/// succeeds on its own, so one broken game does not hide the rest.
pub fn parse_pgn_games(input: &str) -> Vec<Result<PgnGame, PgnError>> {
    split_games(tokenize(input))
        .into_iter()
        .map(build_game)
        .collect()
}

fn tokenize(input: &str) -> Vec<Token> {
    let mut tokens = Vec::new();
    let mut chars = input.chars().peekable();
    let mut at_line_start = true;

    while let Some(c) = chars.next() {
        match c {
            '\n' => {
                at_line_start = true;
                continue;
            }
            c if c.is_whitespace() => continue,
            '%' if at_line_start => {
                // escape mechanism: ignore the rest of the line
                for c in chars.by_ref() {
                    if c == '\n' {
                        break;
                    }
                }
            }
            '[' => {
                let mut raw = String::new();
                let mut in_quotes = false;
                for c in chars.by_ref() {
                    match c {
                        '"' => {
                            in_quotes = !in_quotes;
                            raw.push(c);
                        }
                        ']' if !in_quotes => break,
                        _ => raw.push(c),
                    }
                }
                tokens.push(parse_tag(&raw));
            }
            '{' => {
                let comment: String = chars.by_ref().take_while(|&c| c != '}').collect();
                tokens.push(Token::Comment(comment.trim().to_string()));
            }
            ';' => {
                let comment: String = chars.by_ref().take_while(|&c| c != '\n').collect();
                tokens.push(Token::Comment(comment.trim().to_string()));
                at_line_start = true;
                continue;
            }
            '(' => tokens.push(Token::VariationStart),
            ')' => tokens.push(Token::VariationEnd),
            '$' => {
                let mut digits = String::new();
                while let Some(d) = chars.peek().copied().filter(char::is_ascii_digit) {
                    digits.push(d);
                    chars.next();
                }
                if let Ok(n) = digits.parse() {
                    tokens.push(Token::Nag(n));
                }
            }
            _ => {
                let mut word = String::from(c);
                while let Some(&next) = chars.peek() {
                    if next.is_whitespace() || "(){}[];".contains(next) {
                        break;
                    }
                    word.push(next);
                    chars.next();
                }
                if let Some(token) = classify_word(&word) {
                    tokens.push(token);
                }
            }
        }
        at_line_start = false;
    }

    tokens
}

fn parse_tag(raw: &str) -> Token {
    let raw = raw.trim();
    let Some((name, rest)) = raw.split_once(char::is_whitespace) else {
        return Token::BadTag(raw.to_string());
    };
    let value = rest.trim();
    if value.len() < 2 || !value.starts_with('"') || !value.ends_with('"') {
        return Token::BadTag(raw.to_string());
    }
    let value = value[1..value.len() - 1].replace("\\\"", "\"");
    Token::Tag(name.to_string(), value)
}

fn classify_word(word: &str) -> Option<Token> {
    if let Some(result) = GameResult::from_token(word) {
        return Some(Token::Result(result));
    }

    // Strip a leading move number: "12.", "12...", "12.e4"
    let digits = word.chars().take_while(char::is_ascii_digit).count();
    let rest = &word[digits..];
    let rest = if digits > 0 && rest.starts_with('.') {
        rest.trim_start_matches('.')
    } else if digits > 0 && rest.is_empty() {
        ""
    } else {
        word
    };
    let rest = rest.trim_start_matches('.');

    // Bare annotation glyphs such as "!?" carry no move
    if rest.is_empty() || rest.chars().all(|c| c == '!' || c == '?') {
        return None;
    }
    Some(Token::San(rest.to_string()))
}

/// Group tokens into games: a tag after movetext, or a result, closes a game.
fn split_games(tokens: Vec<Token>) -> Vec<Vec<Token>> {
    let mut games = Vec::new();
    let mut current = Vec::new();
    let mut seen_movetext = false;

    for token in tokens {
        match token {
            Token::Tag(..) | Token::BadTag(_) if seen_movetext => {
                games.push(std::mem::take(&mut current));
                seen_movetext = false;
                current.push(token);
            }
            Token::Result(_) => {
                current.push(token);
                games.push(std::mem::take(&mut current));
                seen_movetext = false;
            }
            Token::Tag(..) | Token::BadTag(_) => current.push(token),
            _ => {
                seen_movetext = true;
                current.push(token);
            }
        }
    }
    if !current.is_empty() {
        games.push(current);
    }
    games
}

/// Where the next move attaches, plus the position before the last move so
/// a variation can branch from it.
#[derive(Clone)]
struct Cursor {
    node: NodeId,
    board: Board,
    prev: Option<(NodeId, Board)>,
}

fn build_game(tokens: Vec<Token>) -> Result<PgnGame, PgnError> {
    let mut tags = HashMap::new();
    for token in &tokens {
        match token {
            Token::Tag(name, value) => {
                tags.insert(name.clone(), value.clone());
            }
            Token::BadTag(raw) => return Err(PgnError::InvalidTag(raw.clone())),
            _ => {}
        }
    }

    let start_fen = tags.get("FEN").cloned();
    let mut tree = MoveTree::new(start_fen);
    let start_board = tree.start_board()?;

    let mut cursor = Cursor {
        node: tree.root(),
        board: start_board,
        prev: None,
    };
    let mut stack: Vec<Cursor> = Vec::new();
    let mut result = tags
        .get("Result")
        .and_then(|r| GameResult::from_token(r))
        .unwrap_or(GameResult::Ongoing);

    for token in tokens {
        match token {
            Token::Tag(..) | Token::BadTag(_) => {}
            Token::San(san) => {
                let mv = parse_san(&cursor.board, &san)?;
                let clean = san.trim_end_matches(['!', '?']).to_string();
                let child = tree.add_child(cursor.node, mv, clean);
                let mut next = cursor.board.clone();
                next.play_unchecked(mv);
                let before = std::mem::replace(&mut cursor.board, next);
                cursor.prev = Some((cursor.node, before));
                cursor.node = child;
            }
            Token::Nag(n) => tree.node_mut(cursor.node).nags.push(n),
            Token::Comment(text) => {
                if !text.is_empty() {
                    tree.node_mut(cursor.node).comment = Some(text);
                }
            }
            Token::VariationStart => {
                let (node, board) = cursor.prev.clone().ok_or(PgnError::InvalidFormat(
                    "variation without a preceding move".to_string(),
                ))?;
                stack.push(cursor);
                cursor = Cursor {
                    node,
                    board,
                    prev: None,
                };
            }
            Token::VariationEnd => {
                cursor = stack.pop().ok_or(PgnError::InvalidFormat(
                    "unbalanced ')'".to_string(),
                ))?;
            }
            Token::Result(r) => {
                if stack.is_empty() {
                    result = r;
                }
            }
        }
    }

    if !stack.is_empty() {
        return Err(PgnError::InvalidFormat("unclosed variation".to_string()));
    }

    Ok(PgnGame { tags, tree, result })
}

#[derive(Debug, thiserror::Error)]
pub enum PgnError {
    #[error("No game found in PGN")]
    Empty,
    #[error("Invalid PGN format: {0}")]
    InvalidFormat(String),
    #[error("Invalid tag: {0}")]
    InvalidTag(String),
    #[error("SAN parse error: {0}")]
    SanError(#[from] SanError),
    #[error("FEN error: {0}")]
    FenError(#[from] FenError),
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::uci::format_uci_move;

    const ITALIAN: &str = r#"[Event "Italian repertoire"]
[Site "?"]
[Result "*"]

1. e4 e5 2. Nf3 Nc6 (2... Nf6 {Petrov} 3. Nxe5) 3. Bc4 $1 Bc5 (3... Nf6 4. Ng5) *
"#;

    fn uci_line(tree: &MoveTree, mut node: NodeId) -> Vec<String> {
        let mut out = Vec::new();
        while let Some(&next) = tree.children(node).first() {
            out.push(format_uci_move(tree.move_of(next).unwrap()));
            node = next;
        }
        out
    }

    #[test]
    fn parses_tags_and_mainline() {
        let game = parse_pgn(ITALIAN).unwrap();
        assert_eq!(game.tag("Event"), Some("Italian repertoire"));
        assert_eq!(game.result, GameResult::Ongoing);
        assert_eq!(
            uci_line(&game.tree, game.tree.root()),
            vec!["e2e4", "e7e5", "g1f3", "b8c6", "f1c4", "f8c5"]
        );
    }

    #[test]
    fn variations_branch_from_the_preceding_move() {
        let game = parse_pgn(ITALIAN).unwrap();
        let tree = &game.tree;
        let e4 = tree.children(tree.root())[0];
        let e5 = tree.children(e4)[0];
        let nf3 = tree.children(e5)[0];
        let replies: Vec<&str> = tree
            .children(nf3)
            .iter()
            .map(|id| tree.node(*id).san.as_str())
            .collect();
        assert_eq!(replies, vec!["Nc6", "Nf6"]);

        let nf6 = tree.children(nf3)[1];
        assert_eq!(tree.node(nf6).comment.as_deref(), Some("Petrov"));
        assert_eq!(tree.node(tree.children(nf6)[0]).san, "Nxe5");
    }

    #[test]
    fn nags_attach_to_the_move() {
        let game = parse_pgn(ITALIAN).unwrap();
        let tree = &game.tree;
        let mut node = tree.root();
        for _ in 0..5 {
            node = tree.children(node)[0];
        }
        assert_eq!(tree.node(node).san, "Bc4");
        assert_eq!(tree.node(node).nags, vec![1]);
    }

    #[test]
    fn fen_tag_sets_start_position() {
        let pgn = r#"[FEN "rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1"]

1... c5 2. Nf3 *"#;
        let game = parse_pgn(pgn).unwrap();
        assert!(game.tree.has_custom_start());
        assert_eq!(game.tree.mainline().len(), 2);
    }

    #[test]
    fn illegal_san_fails_the_game() {
        let err = parse_pgn("1. e4 e4 *").unwrap_err();
        assert!(matches!(err, PgnError::SanError(_)));
    }

    #[test]
    fn unbalanced_variations_are_rejected() {
        assert!(matches!(
            parse_pgn("1. e4 (1. d4 *"),
            Err(PgnError::InvalidFormat(_))
        ));
        assert!(matches!(
            parse_pgn("( 1. e4 ) *"),
            Err(PgnError::InvalidFormat(_))
        ));
    }

    #[test]
    fn empty_input_is_an_error() {
        assert!(matches!(parse_pgn("   \n"), Err(PgnError::Empty)));
    }

    #[test]
    fn multi_game_files_keep_good_games() {
        let pgn = r#"[White "alice"]
[Black "bob"]
[Result "1-0"]

1. e4 e5 2. Qh5 Nc6 3. Bc4 Nf6 4. Qxf7# 1-0

[White "carol"]
[Black "alice"]

1. d4 d4 0-1

[White "alice"]
[Black "dave"]
[Result "1/2-1/2"]

1. c4 e5 1/2-1/2
"#;
        let games = parse_pgn_games(pgn);
        assert_eq!(games.len(), 3);
        let first = games[0].as_ref().unwrap();
        assert_eq!(first.result, GameResult::WhiteWins);
        assert_eq!(first.tree.mainline().len(), 7);
        assert!(games[1].is_err());
        assert_eq!(games[2].as_ref().unwrap().result, GameResult::Draw);
    }

    #[test]
    fn castling_with_zeros_is_not_a_move_number() {
        let pgn = "1. e4 e5 2. Nf3 Nc6 3. Bc4 Bc5 4. 0-0 *";
        let game = parse_pgn(pgn).unwrap();
        let last = *game.tree.mainline().last().unwrap();
        assert_eq!(format_uci_move(last), "e1h1");
    }
}
