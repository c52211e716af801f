//! Study model - the owned repertoire store every front end mutates through.
//!
//! All mutation goes through `&mut self`, so a single owner serialises
//! interactive moves, imports, deletions and clears.

use std::collections::{BTreeMap, BTreeSet};

use log::{info, warn};
use shakmaty::Square;

use crate::config::StudyConfig;
use crate::domain::{
    Board, ChessError, GameStats, ImportReport, MoveInput, MoveNode, MoveNodeId, MoveTree,
    PieceKind, TreeError, export_document, export_movetext, fold_games, merge_texts,
};
use crate::domain::import::parsed_games;
use crate::models::snapshot::StudySnapshot;

/// The main study model containing the repertoire tree
#[derive(Clone, Debug)]
pub struct Study {
    /// The move tree containing all positions and variations
    tree: MoveTree,
    /// Root position used by `clear`
    start: Board,
    /// Promotion piece for coordinate moves that leave it open
    promotion: PieceKind,
}

impl Study {
    /// A study from the standard starting position
    pub fn new() -> Self {
        Self::with_start(Board::new())
    }

    /// A study rooted at `start`
    pub fn with_start(start: Board) -> Self {
        Self {
            tree: MoveTree::with_root(start.clone()),
            start,
            promotion: PieceKind::Queen,
        }
    }

    pub fn from_config(config: &StudyConfig) -> anyhow::Result<Self> {
        let mut study = Self::with_start(config.start_board()?);
        study.promotion = config.promotion;
        Ok(study)
    }

    /// Get a reference to the move tree
    pub fn tree(&self) -> &MoveTree {
        &self.tree
    }

    /// Get the active node ID
    pub fn active_id(&self) -> MoveNodeId {
        self.tree.current_id()
    }

    /// Get the active node
    pub fn active(&self) -> &MoveNode {
        self.tree.current()
    }

    /// Get the active position
    pub fn active_board(&self) -> &Board {
        &self.tree.current().board
    }

    /// Legal moves from the active position, by origin square
    pub fn legal_destinations(&self) -> BTreeMap<Square, BTreeSet<Square>> {
        self.active_board().legal_destinations()
    }

    /// Play a move from the active node by square names.
    ///
    /// An existing child with the same SAN becomes active instead of a new
    /// node being created. On error the study is unchanged.
    pub fn make_move(&mut self, from: &str, to: &str) -> Result<MoveNodeId, ChessError> {
        self.make_move_with_promotion(from, to, None)
    }

    pub fn make_move_with_promotion(
        &mut self,
        from: &str,
        to: &str,
        promotion: Option<PieceKind>,
    ) -> Result<MoveNodeId, ChessError> {
        let input = MoveInput::from_squares(from, to, Some(promotion.unwrap_or(self.promotion)))?;
        self.play(&input)
    }

    /// Play a SAN move from the active node
    pub fn make_san_move(&mut self, san: &str) -> Result<MoveNodeId, ChessError> {
        self.play(&MoveInput::San(san.to_string()))
    }

    fn play(&mut self, input: &MoveInput) -> Result<MoveNodeId, ChessError> {
        let (board, played) = self.active_board().apply(input)?;
        Ok(self.tree.add_move(board, played))
    }

    /// Try to make a move from one square to another. Returns true if successful.
    pub fn try_move(&mut self, from: &str, to: &str) -> bool {
        self.make_move(from, to).is_ok()
    }

    /// Navigate to a specific node by ID
    pub fn navigate_to(&mut self, id: MoveNodeId) -> Result<(), TreeError> {
        self.tree.go_to(id)
    }

    /// Go back one move; nothing happens at the root
    pub fn navigate_back(&mut self) {
        self.tree.go_back();
    }

    /// Go forward one move along the main line; nothing happens at a leaf
    pub fn navigate_forward(&mut self) {
        self.tree.go_forward();
    }

    /// Delete a node with everything below it. Returns the number of nodes
    /// removed.
    pub fn delete_subtree(&mut self, id: MoveNodeId) -> Result<usize, TreeError> {
        self.tree.delete_subtree(id)
    }

    /// Go back to the root without touching the tree
    pub fn reset(&mut self) {
        self.tree.go_to_root();
    }

    /// Throw the tree away and start again from the configured root
    pub fn clear(&mut self) {
        self.tree.clear(self.start.clone());
    }

    /// Set a node's comment; empty text removes it
    pub fn set_comment(&mut self, id: MoveNodeId, text: &str) -> Result<(), TreeError> {
        let text = text.trim();
        let comment = (!text.is_empty()).then(|| text.to_string());
        self.tree.set_comment(id, comment)
    }

    /// Replace the study with the games of one PGN text.
    ///
    /// The tree is cleared only once at least one game parses; a game with
    /// a `FEN` tag moves the new root to that position. When no game
    /// parses the study is left as it was.
    pub fn import_replace(&mut self, text: &str) -> ImportReport {
        let mut report = ImportReport {
            texts: 1,
            ..ImportReport::default()
        };
        let games = parsed_games(0, text, &mut report);
        if games.is_empty() && !report.parse_failures.is_empty() {
            warn!("PGN import failed, study left unchanged");
            return report;
        }

        let root = games
            .iter()
            .find_map(|game| game.starting_fen())
            .and_then(|fen| match Board::from_fen(fen) {
                Ok(board) => Some(board),
                Err(error) => {
                    warn!("ignoring starting position: {error}");
                    None
                }
            })
            .unwrap_or_else(|| self.start.clone());

        self.tree.clear(root);
        fold_games(&mut self.tree, &games, &mut report);
        info!(
            "replaced study with {} game(s), {} nodes",
            report.games_parsed,
            self.tree.len()
        );
        report
    }

    /// Fold many PGN texts onto the existing tree
    pub fn import_merge<S: AsRef<str>>(&mut self, texts: &[S]) -> ImportReport {
        merge_texts(&mut self.tree, texts)
    }

    /// The whole tree as PGN movetext
    pub fn export(&self) -> String {
        export_movetext(&self.tree)
    }

    /// The whole tree as a PGN game with tag pairs
    pub fn export_document(&self, headers: &[(String, String)]) -> String {
        export_document(&self.tree, headers)
    }

    /// Serializable view of the tree for external renderers
    pub fn snapshot(&self) -> StudySnapshot {
        StudySnapshot::of(&self.tree)
    }

    /// Statistics along the main line, one entry per move up to `depth`
    /// moves deep
    pub fn main_line_stats(&self, depth: usize) -> Vec<LineEntry> {
        self.tree
            .main_line()
            .into_iter()
            .skip(1)
            .take(depth)
            .filter_map(|id| self.tree.get(id))
            .map(|node| {
                let alternatives = node
                    .parent_id
                    .and_then(|parent| self.tree.get(parent))
                    .map(|parent| parent.variation_children().len())
                    .unwrap_or(0);
                LineEntry {
                    node_id: node.id,
                    san: node.san().unwrap_or_default().to_string(),
                    stats: node.stats,
                    alternatives,
                }
            })
            .collect()
    }
}

impl Default for Study {
    fn default() -> Self {
        Self::new()
    }
}

/// A main line move with its statistics
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LineEntry {
    pub node_id: MoveNodeId,
    pub san: String,
    pub stats: Option<GameStats>,
    /// Number of variations branching at this move
    pub alternatives: usize,
}
