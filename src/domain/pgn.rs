//! PGN (Portable Game Notation) reading.
//!
//! Turns PGN text holding any number of games into structured records:
//! tag pairs plus the movetext as SAN tokens, with comments and nested
//! variations attached to the moves they follow. Lexing is done by
//! `pgn-reader`; moves are not checked against the rules here, that happens
//! when a game is folded into the tree.
//!
//! Each game is read on its own. A structural error ends that game and the
//! reader resumes at the next one.

use std::ops::ControlFlow;

use log::debug;
use pgn_reader::{Outcome, RawComment, RawTag, Reader, SanPlus, Skip, Visitor};
use thiserror::Error;

/// Deepest variation nesting accepted in one game
pub const MAX_VARIATION_DEPTH: usize = 512;

/// Structural errors in one PGN game
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PgnError {
    #[error("')' without matching '('")]
    UnmatchedClose,

    #[error("variation not closed before end of game")]
    UnclosedVariation,

    #[error("variation does not follow a move")]
    OrphanVariation,

    #[error("variations nested deeper than {limit}")]
    NestedTooDeep { limit: usize },

    #[error("unreadable PGN: {0}")]
    Unreadable(String),
}

/// Represents the result of a chess game
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum GameResult {
    WhiteWins,
    BlackWins,
    Draw,
    /// `*` or anything unrecognised
    Unknown,
}

impl GameResult {
    /// Parse a result string from PGN format
    pub fn from_pgn_str(s: &str) -> Self {
        match s.trim() {
            "1-0" => GameResult::WhiteWins,
            "0-1" => GameResult::BlackWins,
            "1/2-1/2" => GameResult::Draw,
            _ => GameResult::Unknown,
        }
    }

    /// Convert to PGN result string
    pub fn as_pgn_str(self) -> &'static str {
        match self {
            GameResult::WhiteWins => "1-0",
            GameResult::BlackWins => "0-1",
            GameResult::Draw => "1/2-1/2",
            GameResult::Unknown => "*",
        }
    }
}

/// One move of the movetext
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PgnMove {
    /// SAN token; annotation glyphs (`!`, `?!`, ...) are not part of it
    pub san: String,
    /// Comment that followed the move
    pub comment: Option<String>,
    /// Alternatives to this move, each a line starting from the position
    /// before it
    pub variations: Vec<Vec<PgnMove>>,
}

impl PgnMove {
    pub fn new(san: impl Into<String>) -> Self {
        Self {
            san: san.into(),
            ..Self::default()
        }
    }
}

/// A parsed game: tag pairs in order of appearance plus the main line
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PgnGame {
    pub headers: Vec<(String, String)>,
    /// Comment written before the first move
    pub comment: Option<String>,
    pub moves: Vec<PgnMove>,
    /// Game termination marker, if the movetext had one
    pub termination: Option<String>,
}

impl PgnGame {
    /// Value of a tag pair
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers
            .iter()
            .find(|(key, _)| key == name)
            .map(|(_, value)| value.as_str())
    }

    /// The game result from the `Result` tag, else the termination marker
    pub fn result(&self) -> GameResult {
        self.header("Result")
            .or(self.termination.as_deref())
            .map(GameResult::from_pgn_str)
            .unwrap_or(GameResult::Unknown)
    }

    /// Starting position given by a `FEN` tag
    pub fn starting_fen(&self) -> Option<&str> {
        self.header("FEN").filter(|fen| !fen.trim().is_empty())
    }

    /// Main line SAN tokens
    pub fn sans(&self) -> Vec<&str> {
        self.moves.iter().map(|m| m.san.as_str()).collect()
    }
}

/// Movetext of the game being read
struct GameBuilder {
    headers: Vec<(String, String)>,
    comment: Option<String>,
    main: Vec<PgnMove>,
    /// Open variations, innermost last
    open: Vec<Vec<PgnMove>>,
    termination: Option<String>,
}

impl GameBuilder {
    fn new(headers: Vec<(String, String)>) -> Self {
        Self {
            headers,
            comment: None,
            main: Vec::new(),
            open: Vec::new(),
            termination: None,
        }
    }

    fn current_line(&mut self) -> &mut Vec<PgnMove> {
        match self.open.last_mut() {
            Some(line) => line,
            None => &mut self.main,
        }
    }

    fn attach_comment(&mut self, text: String) {
        let slot = match self.open.last_mut() {
            Some(line) => match line.last_mut() {
                Some(last) => &mut last.comment,
                None => {
                    debug!("dropping comment before the first move of a variation: {text}");
                    return;
                }
            },
            None => match self.main.last_mut() {
                Some(last) => &mut last.comment,
                None => &mut self.comment,
            },
        };
        *slot = Some(match slot.take() {
            Some(existing) => format!("{existing} {text}"),
            None => text,
        });
    }

    fn finish(self) -> Result<PgnGame, PgnError> {
        if !self.open.is_empty() {
            return Err(PgnError::UnclosedVariation);
        }
        Ok(PgnGame {
            headers: self.headers,
            comment: self.comment,
            moves: self.main,
            termination: self.termination,
        })
    }
}

/// Builds one `PgnGame` per game the reader visits
struct GameCollector;

impl Visitor for GameCollector {
    type Tags = Vec<(String, String)>;
    type Movetext = GameBuilder;
    type Output = Result<PgnGame, PgnError>;

    fn begin_tags(&mut self) -> ControlFlow<Self::Output, Self::Tags> {
        ControlFlow::Continue(Vec::new())
    }

    fn tag(
        &mut self,
        tags: &mut Self::Tags,
        name: &[u8],
        value: RawTag<'_>,
    ) -> ControlFlow<Self::Output> {
        tags.push((
            String::from_utf8_lossy(name).into_owned(),
            value.decode_utf8_lossy().into_owned(),
        ));
        ControlFlow::Continue(())
    }

    fn begin_movetext(&mut self, tags: Self::Tags) -> ControlFlow<Self::Output, Self::Movetext> {
        ControlFlow::Continue(GameBuilder::new(tags))
    }

    fn san(&mut self, game: &mut GameBuilder, san_plus: SanPlus) -> ControlFlow<Self::Output> {
        if game.termination.is_some() {
            debug!("ignoring {san_plus} after the termination marker");
        } else {
            game.current_line().push(PgnMove::new(san_plus.to_string()));
        }
        ControlFlow::Continue(())
    }

    fn comment(
        &mut self,
        game: &mut GameBuilder,
        comment: RawComment<'_>,
    ) -> ControlFlow<Self::Output> {
        let text = String::from_utf8_lossy(comment.as_bytes())
            .split_whitespace()
            .collect::<Vec<_>>()
            .join(" ");
        if !text.is_empty() {
            game.attach_comment(text);
        }
        ControlFlow::Continue(())
    }

    fn begin_variation(&mut self, game: &mut GameBuilder) -> ControlFlow<Self::Output, Skip> {
        if game.current_line().is_empty() {
            return ControlFlow::Break(Err(PgnError::OrphanVariation));
        }
        if game.open.len() >= MAX_VARIATION_DEPTH {
            return ControlFlow::Break(Err(PgnError::NestedTooDeep {
                limit: MAX_VARIATION_DEPTH,
            }));
        }
        game.open.push(Vec::new());
        ControlFlow::Continue(Skip(false))
    }

    fn end_variation(&mut self, game: &mut GameBuilder) -> ControlFlow<Self::Output> {
        let Some(variation) = game.open.pop() else {
            return ControlFlow::Break(Err(PgnError::UnmatchedClose));
        };
        if !variation.is_empty() {
            if let Some(replaced) = game.current_line().last_mut() {
                replaced.variations.push(variation);
            }
        }
        ControlFlow::Continue(())
    }

    fn outcome(&mut self, game: &mut GameBuilder, outcome: Outcome) -> ControlFlow<Self::Output> {
        if game.open.is_empty() {
            game.termination.get_or_insert_with(|| outcome.to_string());
        }
        ControlFlow::Continue(())
    }

    fn end_game(&mut self, game: GameBuilder) -> Self::Output {
        game.finish()
    }
}

/// Parse PGN text into games, one entry per game in order of appearance.
///
/// Empty text yields no games. A game with a structural error becomes an
/// `Err` entry and reading goes on with the next game.
pub fn parse_games(text: &str) -> Vec<Result<PgnGame, PgnError>> {
    let mut reader = Reader::new(text.as_bytes());
    let mut games = Vec::new();
    loop {
        match reader.read_game(&mut GameCollector) {
            Ok(Some(game)) => games.push(game),
            Ok(None) => break,
            Err(error) => games.push(Err(PgnError::Unreadable(error.to_string()))),
        }
    }
    games
}

#[cfg(test)]
mod tests {
    use super::*;

    fn parse_ok(text: &str) -> Vec<PgnGame> {
        parse_games(text)
            .into_iter()
            .collect::<Result<_, _>>()
            .unwrap()
    }

    #[test]
    fn test_loose_inputs() {
        for (text, count) in [
            ("1. e4 e5", 1),
            ("1. e4 e5 *", 1),
            ("[Event \"Test\"] 1. e4 e5", 1),
            ("1. e4", 1),
            ("e4", 1),
            ("", 0),
            ("   \n  ", 0),
        ] {
            let games = parse_ok(text);
            assert_eq!(games.len(), count, "input {text:?}");
        }
    }

    #[test]
    fn test_parse_simple_pgn() {
        let pgn = r#"[White "Magnus Carlsen"]
[Black "Hikaru Nakamura"]
[Result "1-0"]

1. e4 e5 2. Nf3 Nc6 3. Bb5 1-0"#;

        let games = parse_ok(pgn);
        assert_eq!(games.len(), 1);
        let game = &games[0];
        assert_eq!(game.header("White"), Some("Magnus Carlsen"));
        assert_eq!(game.result(), GameResult::WhiteWins);
        assert_eq!(game.sans(), vec!["e4", "e5", "Nf3", "Nc6", "Bb5"]);
        assert_eq!(game.termination.as_deref(), Some("1-0"));
    }

    #[test]
    fn test_multiple_games() {
        let pgn = r#"[Event "A"]
[Result "1/2-1/2"]

1. d4 d5 1/2-1/2

[Event "B"]
[Result "0-1"]

1. e4 c5 0-1
"#;
        let games = parse_ok(pgn);
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].result(), GameResult::Draw);
        assert_eq!(games[1].header("Event"), Some("B"));
        assert_eq!(games[1].sans(), vec!["e4", "c5"]);
    }

    #[test]
    fn test_new_tags_start_new_game_without_marker() {
        let pgn = "[Event \"A\"]\n1. e4\n[Event \"B\"]\n1. d4";
        let games = parse_ok(pgn);
        assert_eq!(games.len(), 2);
        assert_eq!(games[0].sans(), vec!["e4"]);
        assert_eq!(games[1].sans(), vec!["d4"]);
        assert_eq!(games[1].result(), GameResult::Unknown);
    }

    #[test]
    fn test_result_falls_back_to_marker() {
        let games = parse_ok("1. e4 e5 0-1");
        assert_eq!(games[0].result(), GameResult::BlackWins);
    }

    #[test]
    fn test_comments_nags_and_glyphs() {
        let pgn = "% exported by a tool\n1. e4! {King's pawn} e5?! $6 ; classical\n2. Nf3!! 2... Nc6 3.Bb5 a6 *";
        let games = parse_ok(pgn);
        let game = &games[0];
        assert_eq!(game.sans(), vec!["e4", "e5", "Nf3", "Nc6", "Bb5", "a6"]);
        assert_eq!(game.moves[0].comment.as_deref(), Some("King's pawn"));
        assert_eq!(game.moves[1].comment, None);
    }

    #[test]
    fn test_multiline_comment_is_collapsed() {
        let games = parse_ok("1. e4 {a\n   long\tnote} e5");
        assert_eq!(games[0].moves[0].comment.as_deref(), Some("a long note"));
    }

    #[test]
    fn test_leading_comments() {
        let games = parse_ok("{Sicilian ideas} 1. e4 c5 ( {old} 1... e5 ) 2. Nf3 *");
        assert_eq!(games[0].comment.as_deref(), Some("Sicilian ideas"));
        let e5 = &games[0].moves[1].variations[0][0];
        assert_eq!(e5.san, "e5");
        assert_eq!(e5.comment, None);
    }

    #[test]
    fn test_nested_variations() {
        let pgn = "1. e4 e5 (1... c5 2. Nf3 (2. c3 d5) 2... d6) 2. Nf3 *";
        let games = parse_ok(pgn);
        let moves = &games[0].moves;
        assert_eq!(games[0].sans(), vec!["e4", "e5", "Nf3"]);

        let sicilian = &moves[1].variations[0];
        assert_eq!(
            sicilian.iter().map(|m| m.san.as_str()).collect::<Vec<_>>(),
            vec!["c5", "Nf3", "d6"]
        );
        let alapin = &sicilian[1].variations[0];
        assert_eq!(alapin[0].san, "c3");
        assert_eq!(alapin[1].san, "d5");
    }

    #[test]
    fn test_zero_castling_and_escaped_tags() {
        let pgn = "[White \"A \\\"Quoted\\\" Name\"]\n1. e4 e5 2. Nf3 Nc6 3. Bc4 Bc5 4. 0-0 *";
        let games = parse_ok(pgn);
        assert_eq!(games[0].header("White"), Some("A \"Quoted\" Name"));
        assert_eq!(games[0].moves[6].san, "O-O");
    }

    #[test]
    fn test_headers_only_game() {
        let games = parse_ok("[Event \"Empty\"]\n[Result \"*\"]\n\n*");
        assert_eq!(games.len(), 1);
        assert!(games[0].moves.is_empty());
    }

    #[test]
    fn test_structural_errors() {
        assert_eq!(
            parse_games("1. e4 e5\n2. Nf3 )"),
            vec![Err(PgnError::UnmatchedClose)]
        );
        assert_eq!(
            parse_games("1. e4 (1. d4 d5"),
            vec![Err(PgnError::UnclosedVariation)]
        );
        assert_eq!(
            parse_games("( 1. e4 )"),
            vec![Err(PgnError::OrphanVariation)]
        );
        assert!(matches!(
            parse_games("1. e4 {never closed").as_slice(),
            [Err(PgnError::Unreadable(_))]
        ));
    }

    #[test]
    fn test_bad_game_does_not_hide_its_neighbours() {
        let pgn = "[Event \"A\"]\n1. e4 e5 1-0\n\n[Event \"B\"]\n1. d4 ) d5 0-1\n\n[Event \"C\"]\n1. c4 c5 1/2-1/2\n";
        let games = parse_games(pgn);
        assert_eq!(games.len(), 3);
        assert_eq!(games[0].as_ref().unwrap().sans(), vec!["e4", "e5"]);
        assert_eq!(games[1], Err(PgnError::UnmatchedClose));
        let last = games[2].as_ref().unwrap();
        assert_eq!(last.header("Event"), Some("C"));
        assert_eq!(last.sans(), vec!["c4", "c5"]);
    }

    #[test]
    fn test_deep_nesting_is_rejected() {
        let pgn = format!("1. e4 {}", "( 1. d4 ".repeat(MAX_VARIATION_DEPTH + 1));
        assert_eq!(
            parse_games(&pgn),
            vec![Err(PgnError::NestedTooDeep {
                limit: MAX_VARIATION_DEPTH
            })]
        );
    }

    #[test]
    fn test_long_runs_of_move_numbers() {
        let pgn = format!("{}e4", "1. ".repeat(200_000));
        let games = parse_ok(&pgn);
        assert_eq!(games[0].sans(), vec!["e4"]);
    }

    #[test]
    fn test_fen_tag() {
        let pgn = "[SetUp \"1\"]\n[FEN \"8/8/8/8/8/8/k7/4K3 w - - 0 1\"]\n1. Kd2 *";
        let games = parse_ok(pgn);
        assert_eq!(
            games[0].starting_fen(),
            Some("8/8/8/8/8/8/k7/4K3 w - - 0 1")
        );
    }
}
