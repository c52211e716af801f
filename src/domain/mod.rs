//! Pure domain layer: rules adapter, move tree, PGN in and out.

pub mod chess;
pub mod export;
pub mod import;
pub mod move_tree;
pub mod pgn;

pub use chess::{
    Board, ChessError, MoveInput, PieceColor, PieceKind, PlayedMove, STARTING_FEN, parse_square,
};
pub use export::{export_document, export_movetext};
pub use import::{ImportReport, ParseFailure, SkippedGame, TruncatedGame, fold_games, merge_texts};
pub use move_tree::{GameStats, MoveNode, MoveNodeId, MoveTree, ROOT_ID, TreeError};
pub use pgn::{GameResult, MAX_VARIATION_DEPTH, PgnError, PgnGame, PgnMove, parse_games};
