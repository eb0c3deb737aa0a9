//! PGN reading: annotated games with nested variations become a
//! [`MoveTree`]; SAN is resolved against the position it is played from.

pub mod parser;
pub mod san;
pub mod tree;

pub use parser::{parse_pgn, parse_pgn_games, GameResult, PgnError, PgnGame};
pub use san::{format_san, parse_san, SanError};
pub use tree::{MoveNode, MoveTree, NodeId};
