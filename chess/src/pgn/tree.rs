//! Arena-backed move tree for annotated games with variations.
//!
//! Nodes are addressed by [`NodeId`]; each node stores the move that leads
//! into it and the ordered list of its children. Traversal is root-down only,
//! so no parent links are kept.

use cozy_chess::{Board, Move};

use crate::fen::{parse_fen, FenError, STARTING_FEN};

/// Index of a node inside a [`MoveTree`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// A position in the tree, reached by `mv` from its parent.
#[derive(Debug, Clone)]
pub struct MoveNode {
    /// `None` only for the root.
    pub mv: Option<Move>,
    pub san: String,
    pub comment: Option<String>,
    pub nags: Vec<u8>, // Numeric Annotation Glyphs (!!, ?, etc.)
    children: Vec<NodeId>,
}

#[derive(Debug, Clone)]
pub struct MoveTree {
    nodes: Vec<MoveNode>,
    start_fen: Option<String>,
}

impl MoveTree {
    /// An empty tree rooted at the standard start or at `start_fen`.
    pub fn new(start_fen: Option<String>) -> Self {
        Self {
            nodes: vec![MoveNode {
                mv: None,
                san: String::new(),
                comment: None,
                nags: Vec::new(),
                children: Vec::new(),
            }],
            start_fen,
        }
    }

    pub fn root(&self) -> NodeId {
        NodeId(0)
    }

    pub fn node(&self, id: NodeId) -> &MoveNode {
        &self.nodes[id.0]
    }

    pub(crate) fn node_mut(&mut self, id: NodeId) -> &mut MoveNode {
        &mut self.nodes[id.0]
    }

    pub fn children(&self, id: NodeId) -> &[NodeId] {
        &self.nodes[id.0].children
    }

    pub fn is_leaf(&self, id: NodeId) -> bool {
        self.nodes[id.0].children.is_empty()
    }

    pub fn move_of(&self, id: NodeId) -> Option<Move> {
        self.nodes[id.0].mv
    }

    /// Number of nodes including the root.
    pub fn node_count(&self) -> usize {
        self.nodes.len()
    }

    /// The child of `parent` reached by exactly `mv`, if annotated.
    pub fn find_child(&self, parent: NodeId, mv: Move) -> Option<NodeId> {
        self.children(parent)
            .iter()
            .copied()
            .find(|&child| self.nodes[child.0].mv == Some(mv))
    }

    /// Append `mv` under `parent`. A move already present as a child is
    /// merged into the existing node rather than duplicated.
    pub fn add_child(&mut self, parent: NodeId, mv: Move, san: impl Into<String>) -> NodeId {
        if let Some(existing) = self.find_child(parent, mv) {
            return existing;
        }
        let id = NodeId(self.nodes.len());
        self.nodes.push(MoveNode {
            mv: Some(mv),
            san: san.into(),
            comment: None,
            nags: Vec::new(),
            children: Vec::new(),
        });
        self.nodes[parent.0].children.push(id);
        id
    }

    /// Moves along the first child at every node.
    pub fn mainline(&self) -> Vec<Move> {
        let mut moves = Vec::new();
        let mut current = self.root();
        while let Some(&next) = self.children(current).first() {
            if let Some(mv) = self.move_of(next) {
                moves.push(mv);
            }
            current = next;
        }
        moves
    }

    /// FEN of the root position.
    pub fn start_fen(&self) -> &str {
        self.start_fen.as_deref().unwrap_or(STARTING_FEN)
    }

    pub fn has_custom_start(&self) -> bool {
        self.start_fen.is_some()
    }

    pub fn start_board(&self) -> Result<Board, FenError> {
        match &self.start_fen {
            Some(fen) => parse_fen(fen),
            None => Ok(Board::default()),
        }
    }
}
