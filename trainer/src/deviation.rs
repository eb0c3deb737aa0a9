//! Locating where a played game leaves the user's repertoire.

use chess::{board_placement, placement, MoveTree, NodeId, Side};
use cozy_chess::{Board, Move};

/// The first player move that is not annotated in the tree.
#[derive(Debug, Clone)]
pub struct Deviation {
    /// Last tree node both the game and the repertoire reached.
    pub node: NodeId,
    /// The move the player chose instead.
    pub played: Move,
    /// Index of `played` within the scanned move slice, offset by the
    /// caller's starting ply.
    pub ply: usize,
    /// Position before `played`.
    pub board: Board,
}

/// Walk `moves` through `tree` from its root and return the first ply
/// where `player` departs from the repertoire.
///
/// Returns None when the moves stay in book, when the opponent leaves the
/// book first, or when a move cannot be played at all.
pub fn find_deviation(tree: &MoveTree, moves: &[Move], player: Side) -> Option<Deviation> {
    let board = tree.start_board().ok()?;
    find_deviation_from(tree, tree.root(), board, moves, player, 0)
}

/// As [`find_deviation`], starting at `node` with the live `board` and
/// numbering plies from `first_ply`.
pub fn find_deviation_from(
    tree: &MoveTree,
    node: NodeId,
    board: Board,
    moves: &[Move],
    player: Side,
    first_ply: usize,
) -> Option<Deviation> {
    let mut board = board;
    let mut node = node;
    // The tree's own position, tracked separately so a misaligned start
    // cannot produce a deviation at a position the repertoire never has.
    let mut book_board = tree_position(tree, node)?;

    for (offset, &mv) in moves.iter().enumerate() {
        let ply = first_ply + offset;
        let mover = Side::from(board.side_to_move());

        match tree.find_child(node, mv) {
            Some(child) => {
                if board.try_play(mv).is_err() || book_board.try_play(mv).is_err() {
                    tracing::warn!("Book move at ply {} is not playable, stopping", ply);
                    return None;
                }
                node = child;
            }
            None if mover == player => {
                if !board.is_legal(mv) {
                    tracing::warn!("Played move at ply {} is illegal, stopping", ply);
                    return None;
                }
                if consistent(&book_board, &board) {
                    return Some(Deviation {
                        node,
                        played: mv,
                        ply,
                        board,
                    });
                }
                tracing::debug!("Skipping deviation at ply {}: book and game positions differ", ply);
                board.play_unchecked(mv);
            }
            None => {
                tracing::debug!("Opponent left the book at ply {}", ply);
                return None;
            }
        }
    }

    None
}

/// Board at `target`, replayed from the tree's start.
fn tree_position(tree: &MoveTree, target: NodeId) -> Option<Board> {
    let mut board = tree.start_board().ok()?;
    if target == tree.root() {
        return Some(board);
    }
    let path = path_to(tree, tree.root(), target)?;
    for mv in path {
        board.try_play(mv).ok()?;
    }
    Some(board)
}

fn path_to(tree: &MoveTree, from: NodeId, target: NodeId) -> Option<Vec<Move>> {
    for &child in tree.children(from) {
        let mv = tree.move_of(child)?;
        if child == target {
            return Some(vec![mv]);
        }
        if let Some(mut rest) = path_to(tree, child, target) {
            rest.insert(0, mv);
            return Some(rest);
        }
    }
    None
}

fn consistent(book: &Board, live: &Board) -> bool {
    book.side_to_move() == live.side_to_move() && board_placement(book) == board_placement(live)
}

/// Index into `moves` (played from `start`) at which the position's piece
/// placement equals that of `target_fen`, together with the board there.
///
/// Side to move, castling rights and clocks are ignored. Returns None when
/// no prefix of the game reaches that placement.
pub fn find_alignment(start: &Board, moves: &[Move], target_fen: &str) -> Option<(usize, Board)> {
    let target = placement(target_fen);
    let mut board = start.clone();
    for index in 0..=moves.len() {
        if board_placement(&board) == target {
            return Some((index, board));
        }
        let mv = *moves.get(index)?;
        board.try_play(mv).ok()?;
    }
    None
}
