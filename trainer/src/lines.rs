//! Enumeration of every root-to-leaf path of an opening tree.

use chess::{MoveTree, NodeId};
use cozy_chess::Move;

/// One complete line of an opening, in play order from the tree's start.
pub type Line = Vec<Move>;

/// Every root-to-leaf move sequence of `tree`, depth first in child order.
///
/// A missing tree (the PGN did not parse) and a tree without moves both
/// yield no lines.
pub fn extract_lines(tree: Option<&MoveTree>) -> Vec<Line> {
    let Some(tree) = tree else {
        return Vec::new();
    };

    let mut lines = Vec::new();
    let mut path = Vec::new();
    collect(tree, tree.root(), &mut path, &mut lines);
    lines
}

fn collect(tree: &MoveTree, node: NodeId, path: &mut Line, lines: &mut Vec<Line>) {
    if tree.is_leaf(node) {
        if !path.is_empty() {
            lines.push(path.clone());
        }
        return;
    }
    for &child in tree.children(node) {
        let Some(mv) = tree.move_of(child) else {
            continue;
        };
        path.push(mv);
        collect(tree, child, path, lines);
        path.pop();
    }
}

/// Number of leaves below the root, which is how many lines
/// [`extract_lines`] returns for a non-empty tree.
pub fn count_leaves(tree: &MoveTree) -> usize {
    let mut stack = vec![tree.root()];
    let mut leaves = 0;
    while let Some(node) = stack.pop() {
        if tree.is_leaf(node) {
            if node != tree.root() {
                leaves += 1;
            }
        } else {
            stack.extend(tree.children(node).iter().copied());
        }
    }
    leaves
}

#[cfg(test)]
mod tests {
    use super::*;
    use chess::{format_uci_move, parse_pgn};

    fn uci_lines(lines: &[Line]) -> Vec<Vec<String>> {
        lines
            .iter()
            .map(|line| line.iter().map(|&mv| format_uci_move(mv)).collect())
            .collect()
    }

    #[test]
    fn missing_tree_has_no_lines() {
        assert!(extract_lines(None).is_empty());
    }

    #[test]
    fn tree_without_moves_has_no_lines() {
        let tree = MoveTree::new(None);
        assert!(extract_lines(Some(&tree)).is_empty());
        assert_eq!(count_leaves(&tree), 0);
    }

    #[test]
    fn one_line_per_leaf_in_child_order() {
        let game = parse_pgn("1. e4 e5 (1... c5 2. Nf3) 2. Nf3 Nc6 (2... Nf6) *").unwrap();
        let lines = extract_lines(Some(&game.tree));

        assert_eq!(lines.len(), count_leaves(&game.tree));
        assert_eq!(
            uci_lines(&lines),
            vec![
                vec!["e2e4", "e7e5", "g1f3", "b8c6"],
                vec!["e2e4", "e7e5", "g1f3", "g8f6"],
                vec!["e2e4", "c7c5", "g1f3"],
            ]
        );
    }

    #[test]
    fn every_line_is_legal_from_the_start() {
        let game = parse_pgn("1. d4 d5 2. c4 (2. Nf3 Nf6 3. Bf4) 2... e6 (2... c6 3. Nc3) *")
            .unwrap();
        for line in extract_lines(Some(&game.tree)) {
            let mut board = game.tree.start_board().unwrap();
            for mv in line {
                assert!(board.try_play(mv).is_ok());
            }
        }
    }

    #[test]
    fn lines_are_distinct() {
        // The same continuation written twice is merged by the tree.
        let game = parse_pgn("1. e4 (1. e4 e5) 1... e5 *").unwrap();
        let lines = extract_lines(Some(&game.tree));
        assert_eq!(lines.len(), 1);
    }
}
