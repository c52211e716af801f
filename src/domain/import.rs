//! Folding parsed games into the move tree.
//!
//! Every game is replayed from the root. Moves already present under the
//! walking node (same SAN) are shared, new ones become children, and each
//! node the game passes through counts the game's result. A move the rules
//! reject ends that game only.

use log::{info, warn};

use super::chess::{Board, ChessError, MoveInput};
use super::move_tree::{MoveNodeId, MoveTree, ROOT_ID};
use super::pgn::{GameResult, PgnError, PgnGame, PgnMove, parse_games};

/// A game whose movetext stopped folding at an illegal move
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TruncatedGame {
    /// Index of the game in the batch
    pub game: usize,
    /// Half-moves folded before the failure
    pub ply: usize,
    pub token: String,
    pub error: ChessError,
}

/// A game that was not folded at all
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SkippedGame {
    pub game: usize,
    pub reason: String,
}

/// A game of the batch that did not parse
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseFailure {
    /// Index of the text in the batch
    pub text: usize,
    /// Index of the game within its text
    pub game: usize,
    pub error: PgnError,
}

/// What an import did
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImportReport {
    pub texts: usize,
    pub games_parsed: usize,
    /// Games whose whole main line was folded
    pub games_folded: usize,
    pub truncated: Vec<TruncatedGame>,
    pub skipped: Vec<SkippedGame>,
    pub parse_failures: Vec<ParseFailure>,
}

impl ImportReport {
    /// True when every game parsed and folded completely
    pub fn is_clean(&self) -> bool {
        self.truncated.is_empty() && self.skipped.is_empty() && self.parse_failures.is_empty()
    }
}

/// Where a line stopped folding
struct FoldStop {
    ply: usize,
    token: String,
    error: ChessError,
}

/// A line being folded: the node the next move is played from and the
/// moves still to play
struct LineCursor<'a> {
    node: MoveNodeId,
    moves: &'a [PgnMove],
    ply: usize,
}

impl<'a> LineCursor<'a> {
    fn new(node: MoveNodeId, moves: &'a [PgnMove]) -> Self {
        Self { node, moves, ply: 0 }
    }
}

/// Parse every text and fold all games onto the existing tree.
///
/// A game that fails to parse is reported and skipped; the other games of
/// its text and the rest of the batch still fold.
pub fn merge_texts<S: AsRef<str>>(tree: &mut MoveTree, texts: &[S]) -> ImportReport {
    let mut report = ImportReport {
        texts: texts.len(),
        ..ImportReport::default()
    };

    for (index, text) in texts.iter().enumerate() {
        let games = parsed_games(index, text.as_ref(), &mut report);
        fold_games(tree, &games, &mut report);
    }

    info!(
        "imported {} of {} game(s) from {} text(s), {} truncated, {} skipped, {} unparsable",
        report.games_folded,
        report.games_parsed,
        report.texts,
        report.truncated.len(),
        report.skipped.len(),
        report.parse_failures.len()
    );
    report
}

/// The games of one text that parsed; the others go to `report`
pub(crate) fn parsed_games(
    text_index: usize,
    text: &str,
    report: &mut ImportReport,
) -> Vec<PgnGame> {
    let mut games = Vec::new();
    for (game, parsed) in parse_games(text).into_iter().enumerate() {
        match parsed {
            Ok(parsed) => games.push(parsed),
            Err(error) => {
                warn!("PGN text {text_index}, game {game} failed to parse: {error}");
                report.parse_failures.push(ParseFailure {
                    text: text_index,
                    game,
                    error,
                });
            }
        }
    }
    games
}

/// Fold games onto the tree, recording the outcome of each in `report`.
///
/// Games with a `FEN` tag different from the root position are skipped.
pub fn fold_games(tree: &mut MoveTree, games: &[PgnGame], report: &mut ImportReport) {
    let root_fen = tree.root().board.fen();

    for game in games {
        let index = report.games_parsed;
        report.games_parsed += 1;

        if let Some(fen) = game.starting_fen() {
            let same_start = Board::from_fen(fen).is_ok_and(|board| board.fen() == root_fen);
            if !same_start {
                warn!("game {index}: starts from '{fen}', not the study root; skipped");
                report.skipped.push(SkippedGame {
                    game: index,
                    reason: format!("starting position '{fen}' differs from the root"),
                });
                continue;
            }
        }

        // a comment before the first move belongs to the root
        if let (Some(comment), Some(root)) = (&game.comment, tree.get_mut(ROOT_ID)) {
            root.comment.get_or_insert_with(|| comment.clone());
        }

        match fold_game(tree, game) {
            Ok(()) => report.games_folded += 1,
            Err(stop) => {
                warn!(
                    "game {index}: stopped after {} ply at '{}': {}",
                    stop.ply, stop.token, stop.error
                );
                report.truncated.push(TruncatedGame {
                    game: index,
                    ply: stop.ply,
                    token: stop.token,
                    error: stop.error,
                });
            }
        }
    }
}

/// Fold a game's main line and variations from the root.
///
/// Lines wait on an explicit stack, so a variation is folded completely
/// before the line it branches from goes on. Only the main line records
/// the result; a failing variation is logged and dropped, a failing main
/// line ends the game.
fn fold_game(tree: &mut MoveTree, game: &PgnGame) -> Result<(), FoldStop> {
    let result = game.result();
    let mut lines = vec![LineCursor::new(ROOT_ID, &game.moves)];

    while let Some(depth) = lines.len().checked_sub(1) {
        let cursor = &mut lines[depth];
        let moves = cursor.moves;
        let Some(mv) = moves.get(cursor.ply) else {
            lines.pop();
            continue;
        };

        let stats = (depth == 0).then_some(result);
        match fold_move(tree, cursor.node, mv, stats) {
            Ok(child) => {
                // alternatives branch from the position before this move
                let parent = cursor.node;
                cursor.node = child;
                cursor.ply += 1;
                lines.extend(
                    mv.variations
                        .iter()
                        .rev()
                        .map(|variation| LineCursor::new(parent, variation)),
                );
            }
            Err(error) => {
                let stop = FoldStop {
                    ply: cursor.ply,
                    token: mv.san.clone(),
                    error,
                };
                if depth == 0 {
                    return Err(stop);
                }
                warn!(
                    "variation stopped after {} ply at '{}': {}",
                    stop.ply, stop.token, stop.error
                );
                lines.pop();
            }
        }
    }
    Ok(())
}

/// Play one move below `from`, merging by SAN. `result` is `None` for
/// variations, which record no statistics.
fn fold_move(
    tree: &mut MoveTree,
    from: MoveNodeId,
    mv: &PgnMove,
    result: Option<GameResult>,
) -> Result<MoveNodeId, ChessError> {
    let (board, played) = tree
        .node(from)
        .board
        .apply(&MoveInput::San(mv.san.clone()))?;
    let (child, _) = tree
        .add_child(from, board, played)
        .map_err(|_| ChessError::IllegalMove(mv.san.clone()))?;

    if let Some(node) = tree.get_mut(child) {
        if let Some(result) = result {
            node.stats.get_or_insert_with(Default::default).record(result);
        }
        if node.comment.is_none() {
            node.comment = mv.comment.clone();
        }
    }
    Ok(child)
}
