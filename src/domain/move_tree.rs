//! Move tree data structure for representing a repertoire with variations.
//!
//! This is a pure domain module with no I/O dependencies.

use std::collections::HashMap;

use log::debug;
use schemars::JsonSchema;
use serde::Serialize;
use thiserror::Error;

use super::chess::{Board, PlayedMove};
use super::pgn::GameResult;

/// Unique identifier for a node in the move tree.
/// Ids are never reused while the tree lives.
pub type MoveNodeId = usize;

/// Id of the root node
pub const ROOT_ID: MoveNodeId = 0;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum TreeError {
    #[error("node {0} not found")]
    NotFound(MoveNodeId),

    #[error("the root node cannot be deleted")]
    RootProtected,
}

/// Outcome counters of the imported games that passed through a node.
///
/// `total` also counts unfinished games, so it may exceed the sum of the
/// three buckets.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, JsonSchema)]
pub struct GameStats {
    pub white: u32,
    pub black: u32,
    pub draw: u32,
    pub total: u32,
}

impl GameStats {
    pub fn record(&mut self, result: GameResult) {
        self.total += 1;
        match result {
            GameResult::WhiteWins => self.white += 1,
            GameResult::BlackWins => self.black += 1,
            GameResult::Draw => self.draw += 1,
            GameResult::Unknown => {}
        }
    }
}

/// A node in the move tree representing a position after a move
#[derive(Clone, Debug)]
pub struct MoveNode {
    /// Unique identifier for this node
    pub id: MoveNodeId,
    /// Parent node ID (None for root)
    pub parent_id: Option<MoveNodeId>,
    /// The chess position at this node
    pub board: Board,
    /// The move that led to this position (None for root)
    pub played: Option<PlayedMove>,
    /// Child node IDs - first child is the main line continuation, rest are variations
    pub children: Vec<MoveNodeId>,
    pub comment: Option<String>,
    /// Present once an imported game passed through this node
    pub stats: Option<GameStats>,
}

impl MoveNode {
    /// Create a new root node
    pub fn root(board: Board) -> Self {
        Self {
            id: ROOT_ID,
            parent_id: None,
            board,
            played: None,
            children: Vec::new(),
            comment: None,
            stats: None,
        }
    }

    /// Create a new node from a move
    pub fn new(id: MoveNodeId, parent_id: MoveNodeId, board: Board, played: PlayedMove) -> Self {
        Self {
            id,
            parent_id: Some(parent_id),
            board,
            played: Some(played),
            children: Vec::new(),
            comment: None,
            stats: None,
        }
    }

    /// The SAN of the move that led here
    pub fn san(&self) -> Option<&str> {
        self.played.as_ref().map(|m| m.san.as_str())
    }

    /// Check if this is the root node
    pub fn is_root(&self) -> bool {
        self.parent_id.is_none()
    }

    /// Check if this node has variations (more than one child)
    pub fn has_variations(&self) -> bool {
        self.children.len() > 1
    }

    /// Get the main line continuation (first child), if any
    pub fn main_line_child(&self) -> Option<MoveNodeId> {
        self.children.first().copied()
    }

    /// Get variation children (all children except the first)
    pub fn variation_children(&self) -> &[MoveNodeId] {
        if self.children.len() > 1 {
            &self.children[1..]
        } else {
            &[]
        }
    }
}

/// A tree structure representing a repertoire with variations
#[derive(Clone, Debug)]
pub struct MoveTree {
    /// All live nodes, keyed by their ID
    nodes: HashMap<MoveNodeId, MoveNode>,
    /// The currently viewed node
    current_id: MoveNodeId,
    next_id: MoveNodeId,
}

impl MoveTree {
    /// Create a new tree with just the root (starting position)
    pub fn new() -> Self {
        Self::with_root(Board::new())
    }

    /// Create a new tree rooted at the given position
    pub fn with_root(board: Board) -> Self {
        let mut nodes = HashMap::new();
        nodes.insert(ROOT_ID, MoveNode::root(board));
        Self {
            nodes,
            current_id: ROOT_ID,
            next_id: ROOT_ID + 1,
        }
    }

    /// Get a node by ID
    pub fn get(&self, id: MoveNodeId) -> Option<&MoveNode> {
        self.nodes.get(&id)
    }

    /// Get a mutable reference to a node by ID
    pub(crate) fn get_mut(&mut self, id: MoveNodeId) -> Option<&mut MoveNode> {
        self.nodes.get_mut(&id)
    }

    /// Node lookup for ids the tree itself handed out
    pub(crate) fn node(&self, id: MoveNodeId) -> &MoveNode {
        &self.nodes[&id]
    }

    pub fn contains(&self, id: MoveNodeId) -> bool {
        self.nodes.contains_key(&id)
    }

    /// Get the root node
    pub fn root(&self) -> &MoveNode {
        self.node(ROOT_ID)
    }

    /// Get the currently viewed node
    pub fn current(&self) -> &MoveNode {
        self.node(self.current_id)
    }

    /// Get the current node ID
    pub fn current_id(&self) -> MoveNodeId {
        self.current_id
    }

    /// Navigate to a specific node
    pub fn go_to(&mut self, id: MoveNodeId) -> Result<(), TreeError> {
        if !self.contains(id) {
            return Err(TreeError::NotFound(id));
        }
        self.current_id = id;
        Ok(())
    }

    /// Navigate to the root
    pub fn go_to_root(&mut self) {
        self.current_id = ROOT_ID;
    }

    /// Navigate to parent (go back one move)
    pub fn go_back(&mut self) -> bool {
        if let Some(parent_id) = self.current().parent_id {
            self.current_id = parent_id;
            true
        } else {
            false
        }
    }

    /// Navigate to main line child (go forward one move)
    pub fn go_forward(&mut self) -> bool {
        if let Some(child_id) = self.current().main_line_child() {
            self.current_id = child_id;
            true
        } else {
            false
        }
    }

    /// Check if we're at the root
    pub fn is_at_root(&self) -> bool {
        self.current_id == ROOT_ID
    }

    /// Check if we're at a leaf node (no children)
    pub fn is_at_leaf(&self) -> bool {
        self.current().children.is_empty()
    }

    /// Find the child of `parent_id` reached by the move with this SAN
    pub fn child_with_san(&self, parent_id: MoveNodeId, san: &str) -> Option<MoveNodeId> {
        let parent = self.get(parent_id)?;
        parent
            .children
            .iter()
            .copied()
            .find(|&child_id| self.node(child_id).san() == Some(san))
    }

    /// Add a move below `parent_id`, merging with an existing child of the
    /// same SAN. Returns the child's ID and whether it was created.
    ///
    /// The caller guarantees that `board` is `played` applied to the parent.
    pub(crate) fn add_child(
        &mut self,
        parent_id: MoveNodeId,
        board: Board,
        played: PlayedMove,
    ) -> Result<(MoveNodeId, bool), TreeError> {
        if !self.contains(parent_id) {
            return Err(TreeError::NotFound(parent_id));
        }
        if let Some(existing) = self.child_with_san(parent_id, &played.san) {
            return Ok((existing, false));
        }

        let new_id = self.next_id;
        self.next_id += 1;
        debug!("node {new_id}: {} after node {parent_id}", played.san);
        self.nodes
            .insert(new_id, MoveNode::new(new_id, parent_id, board, played));
        if let Some(parent) = self.nodes.get_mut(&parent_id) {
            parent.children.push(new_id);
        }
        Ok((new_id, true))
    }

    /// Add a new move from the current position
    /// Returns the ID of the new or existing node
    ///
    /// If a child with the same SAN exists, navigates to it.
    /// Otherwise, creates a new node and navigates to it.
    pub(crate) fn add_move(&mut self, board: Board, played: PlayedMove) -> MoveNodeId {
        let parent_id = self.current_id;
        // current_id always names a live node
        let (id, _) = match self.add_child(parent_id, board, played) {
            Ok(added) => added,
            Err(_) => return parent_id,
        };
        self.current_id = id;
        id
    }

    /// Remove a node and everything below it.
    /// Returns the number of nodes removed.
    ///
    /// The root is never removed. If the current node was inside the removed
    /// subtree, the deleted node's parent becomes current.
    pub fn delete_subtree(&mut self, id: MoveNodeId) -> Result<usize, TreeError> {
        let parent_id = match self.get(id) {
            None => return Err(TreeError::NotFound(id)),
            Some(node) => node.parent_id.ok_or(TreeError::RootProtected)?,
        };

        let mut removed = 0;
        let mut current_removed = false;
        let mut stack = vec![id];
        while let Some(next) = stack.pop() {
            if let Some(node) = self.nodes.remove(&next) {
                removed += 1;
                current_removed |= next == self.current_id;
                stack.extend(node.children);
            }
        }

        if let Some(parent) = self.nodes.get_mut(&parent_id) {
            parent.children.retain(|&child| child != id);
        }
        if current_removed {
            self.current_id = parent_id;
        }
        debug!("deleted {removed} node(s) under node {parent_id}");
        Ok(removed)
    }

    /// Discard every node and start over from a single root
    pub fn clear(&mut self, board: Board) {
        *self = Self::with_root(board);
    }

    /// Set or remove (`None`) the comment of a node
    pub fn set_comment(
        &mut self,
        id: MoveNodeId,
        comment: Option<String>,
    ) -> Result<(), TreeError> {
        let node = self.get_mut(id).ok_or(TreeError::NotFound(id))?;
        node.comment = comment;
        Ok(())
    }

    /// Get the main line as a sequence of node IDs (from root to end)
    pub fn main_line(&self) -> Vec<MoveNodeId> {
        let mut line = vec![ROOT_ID];
        let mut current = self.root();
        while let Some(child_id) = current.main_line_child() {
            line.push(child_id);
            current = self.node(child_id);
        }
        line
    }

    /// Get the path from root to current position
    pub fn path_to_current(&self) -> Vec<MoveNodeId> {
        let mut path = Vec::new();
        let mut id = self.current_id;
        loop {
            path.push(id);
            if let Some(parent_id) = self.node(id).parent_id {
                id = parent_id;
            } else {
                break;
            }
        }
        path.reverse();
        path
    }

    /// All node IDs in pre-order: parents before children, main line before
    /// variations
    pub fn preorder(&self) -> Vec<MoveNodeId> {
        let mut order = Vec::with_capacity(self.nodes.len());
        let mut stack = vec![ROOT_ID];
        while let Some(id) = stack.pop() {
            order.push(id);
            stack.extend(self.node(id).children.iter().rev());
        }
        order
    }

    /// Get the total number of nodes
    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    /// Check if tree is empty (only root)
    pub fn is_empty(&self) -> bool {
        self.nodes.len() == 1
    }
}

impl Default for MoveTree {
    fn default() -> Self {
        Self::new()
    }
}
