//! Serializable view of a study, for graph renderers and other consumers
//! that live outside the process.

use schemars::JsonSchema;
use serde::Serialize;

use crate::domain::{GameStats, MoveNode, MoveNodeId, MoveTree, PieceKind, PlayedMove};

#[derive(Clone, Debug, PartialEq, Eq, Serialize, JsonSchema)]
pub struct StudySnapshot {
    pub root: MoveNodeId,
    pub active: MoveNodeId,
    /// Every node in pre-order: root first, main lines before variations
    pub nodes: Vec<NodeSnapshot>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, JsonSchema)]
pub struct NodeSnapshot {
    pub id: MoveNodeId,
    pub parent: Option<MoveNodeId>,
    pub fen: String,
    #[serde(rename = "move")]
    pub played: Option<MoveSnapshot>,
    pub children: Vec<MoveNodeId>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub comment: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub stats: Option<GameStats>,
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, JsonSchema)]
pub struct MoveSnapshot {
    pub from: String,
    pub to: String,
    pub san: String,
    pub promotion: Option<PieceKind>,
}

impl From<&PlayedMove> for MoveSnapshot {
    fn from(played: &PlayedMove) -> Self {
        Self {
            from: played.from.to_string(),
            to: played.to.to_string(),
            san: played.san.clone(),
            promotion: played.promotion,
        }
    }
}

impl From<&MoveNode> for NodeSnapshot {
    fn from(node: &MoveNode) -> Self {
        Self {
            id: node.id,
            parent: node.parent_id,
            fen: node.board.fen(),
            played: node.played.as_ref().map(MoveSnapshot::from),
            children: node.children.clone(),
            comment: node.comment.clone(),
            stats: node.stats,
        }
    }
}

impl StudySnapshot {
    pub fn of(tree: &MoveTree) -> Self {
        Self {
            root: tree.root().id,
            active: tree.current_id(),
            nodes: tree
                .preorder()
                .into_iter()
                .filter_map(|id| tree.get(id))
                .map(NodeSnapshot::from)
                .collect(),
        }
    }

    /// JSON schema of the snapshot format
    pub fn json_schema() -> serde_json::Value {
        serde_json::to_value(schemars::schema_for!(StudySnapshot)).unwrap_or_default()
    }
}
