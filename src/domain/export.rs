//! PGN output for the move tree.
//!
//! The whole tree is written as one movetext: the first child of every node
//! continues the line, other children become parenthesised variations at the
//! point where they diverge.

use super::chess::{PieceColor, STARTING_FEN};
use super::move_tree::{MoveNode, MoveNodeId, MoveTree, ROOT_ID};

/// Render the tree as PGN movetext (no tag pairs, no termination marker)
pub fn export_movetext(tree: &MoveTree) -> String {
    let mut out = String::new();
    if let Some(comment) = &tree.root().comment {
        write_comment(comment, &mut out);
    }
    write_lines(tree, &mut out);
    out.truncate(out.trim_end().len());
    out
}

/// Render the tree as a complete PGN game.
///
/// The caller's tag pairs come first. A non-standard root adds `SetUp` and
/// `FEN`, and a missing `Result` tag becomes `*`. The movetext ends with the
/// result as termination marker.
pub fn export_document(tree: &MoveTree, headers: &[(String, String)]) -> String {
    let mut tags: Vec<(String, String)> = headers
        .iter()
        .filter(|(name, _)| name != "SetUp" && name != "FEN")
        .cloned()
        .collect();

    let root_fen = tree.root().board.fen();
    if root_fen != STARTING_FEN {
        tags.push(("SetUp".to_string(), "1".to_string()));
        tags.push(("FEN".to_string(), root_fen));
    }
    if !tags.iter().any(|(name, _)| name == "Result") {
        tags.push(("Result".to_string(), "*".to_string()));
    }
    let result = tags
        .iter()
        .find(|(name, _)| name == "Result")
        .map(|(_, value)| value.clone())
        .unwrap_or_else(|| "*".to_string());

    let mut out = String::new();
    for (name, value) in &tags {
        let escaped = value.replace('\\', "\\\\").replace('"', "\\\"");
        out.push_str(&format!("[{name} \"{escaped}\"]\n"));
    }
    out.push('\n');

    let movetext = export_movetext(tree);
    if !movetext.is_empty() {
        out.push_str(&movetext);
        out.push(' ');
    }
    out.push_str(&result);
    out.push('\n');
    out
}

/// Pending output while walking the tree
enum Step {
    /// Continue the line below a node; the flag forces a `N...` prefix on
    /// a first Black move
    Line(MoveNodeId, bool),
    /// Open a variation: its parent and its first move
    Variation(MoveNodeId, MoveNodeId),
    Close,
}

/// Write every line of the tree with variations interleaved at the point
/// where they diverge. Steps wait on an explicit stack so nesting depth is
/// not bounded by the call stack.
fn write_lines(tree: &MoveTree, out: &mut String) {
    let mut steps = vec![Step::Line(ROOT_ID, true)];

    while let Some(step) = steps.pop() {
        match step {
            Step::Line(id, number_black) => {
                let node = tree.node(id);
                let Some(main_id) = node.main_line_child() else {
                    continue;
                };
                write_move(node, tree.node(main_id), number_black, out);

                // resuming after variations needs the number again
                steps.push(Step::Line(main_id, node.has_variations()));
                for &variation_id in node.variation_children().iter().rev() {
                    steps.push(Step::Close);
                    steps.push(Step::Line(variation_id, false));
                    steps.push(Step::Variation(id, variation_id));
                }
            }
            Step::Variation(parent_id, first_id) => {
                out.push_str("( ");
                write_move(tree.node(parent_id), tree.node(first_id), true, out);
            }
            Step::Close => out.push_str(") "),
        }
    }
}

/// Write one move made from `parent` to reach `child`, with its comment
fn write_move(parent: &MoveNode, child: &MoveNode, number_black: bool, out: &mut String) {
    let number = parent.board.fullmove_number();
    match parent.board.turn() {
        PieceColor::White => out.push_str(&format!("{number}. ")),
        PieceColor::Black if number_black => out.push_str(&format!("{number}... ")),
        PieceColor::Black => {}
    }

    out.push_str(child.san().unwrap_or_default());
    out.push(' ');

    if let Some(comment) = &child.comment {
        write_comment(comment, out);
    }
}

fn write_comment(comment: &str, out: &mut String) {
    // a brace inside would end the comment early
    out.push_str(&format!("{{ {} }} ", comment.replace('}', ")")));
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::chess::{Board, MoveInput};
    use crate::domain::import::merge_texts;
    use crate::domain::pgn::parse_games;

    fn tree_of(texts: &[&str]) -> MoveTree {
        let mut tree = MoveTree::new();
        merge_texts(&mut tree, texts);
        tree
    }

    #[test]
    fn test_empty_tree() {
        assert_eq!(export_movetext(&MoveTree::new()), "");
    }

    #[test]
    fn test_linear_game() {
        let tree = tree_of(&["1. e4 e5 2. Nf3 Nc6 3. Bb5"]);
        assert_eq!(export_movetext(&tree), "1. e4 e5 2. Nf3 Nc6 3. Bb5");
    }

    #[test]
    fn test_variations_are_nested() {
        let tree = tree_of(&["1. e4 e5 2. Nf3", "1. e4 e5 2. Nc3", "1. d4 d5"]);
        assert_eq!(
            export_movetext(&tree),
            "1. e4 ( 1. d4 d5 ) 1... e5 2. Nf3 ( 2. Nc3 )"
        );
    }

    #[test]
    fn test_black_variation_numbering() {
        let tree = tree_of(&["1. e4 e5 2. Nf3 Nc6", "1. e4 c5 2. Nf3 d6"]);
        assert_eq!(
            export_movetext(&tree),
            "1. e4 e5 ( 1... c5 2. Nf3 d6 ) 2. Nf3 Nc6"
        );
    }

    #[test]
    fn test_comments() {
        let mut tree = tree_of(&["1. e4 e5", "1. d4"]);
        tree.set_comment(1, Some("king pawn".to_string())).unwrap();
        tree.set_comment(3, Some("queen pawn".to_string())).unwrap();
        assert_eq!(
            export_movetext(&tree),
            "1. e4 { king pawn } ( 1. d4 { queen pawn } ) 1... e5"
        );
    }

    #[test]
    fn test_black_to_move_root() {
        let board = Board::from_fen("rnbqkbnr/pppppppp/8/8/4P3/8/PPPP1PPP/RNBQKBNR b KQkq - 0 1")
            .unwrap();
        let mut tree = MoveTree::with_root(board);
        merge_texts(&mut tree, &["1... c5 2. Nf3"]);
        assert_eq!(export_movetext(&tree), "1... c5 2. Nf3");
    }

    #[test]
    fn test_export_reimports_to_same_tree() {
        let tree = tree_of(&[
            "1. e4 e5 2. Nf3 Nc6 3. Bb5 a6",
            "1. e4 c5 2. Nf3 d6",
            "1. e4 e5 2. Nc3",
            "1. d4 Nf6 2. c4 e6",
        ]);
        let text = export_movetext(&tree);

        let mut copy = MoveTree::new();
        let report = merge_texts(&mut copy, &[text.as_str()]);
        assert!(report.is_clean());
        assert_eq!(export_movetext(&copy), text);
        assert_eq!(copy.len(), tree.len());
    }

    #[test]
    fn test_root_comment_leads_movetext() {
        let mut tree = tree_of(&["1. e4 e5"]);
        tree.set_comment(ROOT_ID, Some("open games".to_string())).unwrap();
        let text = export_movetext(&tree);
        assert_eq!(text, "{ open games } 1. e4 e5");

        let copy = tree_of(&[text.as_str()]);
        assert_eq!(copy.root().comment.as_deref(), Some("open games"));
    }

    #[test]
    fn test_deep_variation_nesting() {
        // every step descends through a variation: the main line child is
        // a pawn move, the knight shuffle continues as the alternative
        let mut tree = MoveTree::new();
        let shuffle = ["Nf3", "Nf6", "Ng1", "Ng8"];
        for ply in 0..200 {
            let parent = tree.current_id();
            let board = tree.current().board.clone();
            let pawn = if ply % 2 == 0 { "h3" } else { "h6" };
            for san in [pawn, shuffle[ply % 4]] {
                tree.go_to(parent).unwrap();
                let (next, played) = board.apply(&MoveInput::San(san.to_string())).unwrap();
                tree.add_move(next, played);
            }
        }

        let text = export_movetext(&tree);
        assert_eq!(text.matches('(').count(), 200);
        assert!(text.starts_with("1. h3 ( 1. Nf3 h6 ( 1... Nf6 2. h3 ( 2. Ng1"));

        let copy = tree_of(&[text.as_str()]);
        assert_eq!(copy.len(), tree.len());
        assert_eq!(export_movetext(&copy), text);
    }

    #[test]
    fn test_document() {
        let tree = tree_of(&["1. e4 e5"]);
        let doc = export_document(&tree, &[("Event".to_string(), "Study \"A\"".to_string())]);
        assert_eq!(
            doc,
            "[Event \"Study \\\"A\\\"\"]\n[Result \"*\"]\n\n1. e4 e5 *\n"
        );
        let game = parse_games(&doc).remove(0).unwrap();
        assert_eq!(game.header("Event"), Some("Study \"A\""));
        assert_eq!(game.sans(), vec!["e4", "e5"]);
    }

    #[test]
    fn test_document_with_custom_root() {
        let fen = "4k3/8/8/8/8/8/8/4K2R w K - 0 1";
        let mut tree = MoveTree::with_root(Board::from_fen(fen).unwrap());
        merge_texts(&mut tree, &["1. O-O Kd7"]);
        let doc = export_document(&tree, &[]);
        assert!(doc.starts_with(&format!("[SetUp \"1\"]\n[FEN \"{fen}\"]\n")));
        assert!(doc.ends_with("1. O-O Kd7 *\n"));
    }
}
