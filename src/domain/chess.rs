//! Pure chess domain types and the rules engine adapter.
//! No tree or I/O dependencies - this is the domain layer.

use std::collections::{BTreeMap, BTreeSet};

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use shakmaty::fen::Fen;
use shakmaty::san::{San, SanPlus};
use shakmaty::{
    CastlingMode, Chess, Color as SColor, EnPassantMode, File, Move, Position, Role, Square,
};
use thiserror::Error;

/// FEN of the standard starting position
pub const STARTING_FEN: &str = "rnbqkbnr/pppppppp/8/8/8/8/PPPPPPPP/RNBQKBNR w KQkq - 0 1";

#[derive(Clone, Copy, PartialEq, Eq, Debug, Hash, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "lowercase")]
pub enum PieceKind {
    Pawn,
    Rook,
    Knight,
    Bishop,
    Queen,
    King,
}

impl PieceKind {
    /// Whether a pawn may promote to this piece
    pub fn is_promotion_piece(self) -> bool {
        matches!(
            self,
            PieceKind::Knight | PieceKind::Bishop | PieceKind::Rook | PieceKind::Queen
        )
    }

    /// Parse a piece from a letter (`q`, `N`, ...) or a full name (`queen`)
    pub fn parse(text: &str) -> Option<Self> {
        match text.to_ascii_lowercase().as_str() {
            "p" | "pawn" => Some(PieceKind::Pawn),
            "r" | "rook" => Some(PieceKind::Rook),
            "n" | "knight" => Some(PieceKind::Knight),
            "b" | "bishop" => Some(PieceKind::Bishop),
            "q" | "queen" => Some(PieceKind::Queen),
            "k" | "king" => Some(PieceKind::King),
            _ => None,
        }
    }

    fn role(self) -> Role {
        match self {
            PieceKind::Pawn => Role::Pawn,
            PieceKind::Knight => Role::Knight,
            PieceKind::Bishop => Role::Bishop,
            PieceKind::Rook => Role::Rook,
            PieceKind::Queen => Role::Queen,
            PieceKind::King => Role::King,
        }
    }
}

/// Convert a shakmaty role to our domain piece kind
fn role_to_kind(role: Role) -> PieceKind {
    match role {
        Role::Pawn => PieceKind::Pawn,
        Role::Knight => PieceKind::Knight,
        Role::Bishop => PieceKind::Bishop,
        Role::Rook => PieceKind::Rook,
        Role::Queen => PieceKind::Queen,
        Role::King => PieceKind::King,
    }
}

#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum PieceColor {
    White,
    Black,
}

/// Errors reported by the rules engine adapter
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ChessError {
    #[error("invalid square '{0}'")]
    InvalidSquare(String),

    #[error("invalid FEN '{fen}': {reason}")]
    InvalidFen { fen: String, reason: String },

    #[error("invalid SAN '{0}'")]
    InvalidSan(String),

    #[error("illegal move {0}")]
    IllegalMove(String),
}

/// A move requested from a position: either board coordinates or SAN text
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum MoveInput {
    Coords {
        from: Square,
        to: Square,
        /// Piece to promote to; `None` lets the caller's default apply
        promotion: Option<PieceKind>,
    },
    San(String),
}

impl MoveInput {
    /// Build a coordinate move from square names such as `e2` and `e4`
    pub fn from_squares(
        from: &str,
        to: &str,
        promotion: Option<PieceKind>,
    ) -> Result<Self, ChessError> {
        Ok(MoveInput::Coords {
            from: parse_square(from)?,
            to: parse_square(to)?,
            promotion,
        })
    }
}

/// Parse a square name (`e4`)
pub fn parse_square(text: &str) -> Result<Square, ChessError> {
    text.trim()
        .parse::<Square>()
        .map_err(|_| ChessError::InvalidSquare(text.to_string()))
}

/// The move that produced a position, as stored in the move tree
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlayedMove {
    pub from: Square,
    pub to: Square,
    /// SAN including the `+`/`#` suffix
    pub san: String,
    pub promotion: Option<PieceKind>,
}

/// A board position with the rules applied by shakmaty
#[derive(Clone, Debug, Default)]
pub struct Board {
    position: Chess,
}

impl Board {
    /// The standard starting position
    pub fn new() -> Self {
        Self::default()
    }

    /// Load a position from FEN
    pub fn from_fen(fen: &str) -> Result<Self, ChessError> {
        let invalid = |reason: String| ChessError::InvalidFen {
            fen: fen.to_string(),
            reason,
        };
        let parsed: Fen = fen.trim().parse().map_err(|e| invalid(format!("{e}")))?;
        let position = parsed
            .into_position::<Chess>(CastlingMode::Standard)
            .map_err(|e| invalid(format!("{e}")))?;
        Ok(Self { position })
    }

    /// Canonical FEN of this position
    pub fn fen(&self) -> String {
        Fen::from_position(&self.position, EnPassantMode::Legal).to_string()
    }

    /// Whether this is the standard starting position
    pub fn is_standard_start(&self) -> bool {
        self.fen() == STARTING_FEN
    }

    /// The side to move
    pub fn turn(&self) -> PieceColor {
        match self.position.turn() {
            SColor::White => PieceColor::White,
            SColor::Black => PieceColor::Black,
        }
    }

    /// Full-move counter, starting at 1 and incremented after Black moves
    pub fn fullmove_number(&self) -> u32 {
        self.position.fullmoves().get()
    }

    /// Legal destination squares keyed by origin square.
    ///
    /// Castling is listed as the king's two-square move.
    pub fn legal_destinations(&self) -> BTreeMap<Square, BTreeSet<Square>> {
        let mut dests: BTreeMap<Square, BTreeSet<Square>> = BTreeMap::new();
        for m in &self.position.legal_moves() {
            if let Some((from, to)) = coordinates(m) {
                dests.entry(from).or_default().insert(to);
            }
        }
        dests
    }

    /// Apply a move, returning the resulting board and the move as played.
    /// The board itself is left untouched.
    pub fn apply(&self, input: &MoveInput) -> Result<(Board, PlayedMove), ChessError> {
        let m = match input {
            MoveInput::Coords {
                from,
                to,
                promotion,
            } => self.find_coordinate_move(*from, *to, promotion.unwrap_or(PieceKind::Queen))?,
            MoveInput::San(text) => {
                let san_plus: SanPlus = text
                    .parse()
                    .map_err(|_| ChessError::InvalidSan(text.clone()))?;
                san_plus
                    .san
                    .to_move(&self.position)
                    .map_err(|_| ChessError::IllegalMove(text.clone()))?
            }
        };
        self.play(m)
    }

    fn find_coordinate_move(
        &self,
        from: Square,
        to: Square,
        promotion: PieceKind,
    ) -> Result<Move, ChessError> {
        for m in &self.position.legal_moves() {
            if coordinates(m) != Some((from, to)) {
                continue;
            }
            // Promotions appear once per piece; pick the requested one
            match m.promotion() {
                Some(role) if role != promotion.role() => continue,
                _ => return Ok(*m),
            }
        }
        Err(ChessError::IllegalMove(format!("{from}{to}")))
    }

    fn play(&self, m: Move) -> Result<(Board, PlayedMove), ChessError> {
        let (from, to) = coordinates(&m).ok_or_else(|| ChessError::IllegalMove(format!("{m:?}")))?;
        let san = San::from_move(&self.position, m).to_string();
        let promotion = m.promotion().map(role_to_kind);

        let next = self
            .position
            .clone()
            .play(m)
            .map_err(|_| ChessError::IllegalMove(san.clone()))?;

        let suffix = if next.is_checkmate() {
            "#"
        } else if next.is_check() {
            "+"
        } else {
            ""
        };

        Ok((
            Board { position: next },
            PlayedMove {
                from,
                to,
                san: format!("{san}{suffix}"),
                promotion,
            },
        ))
    }
}

/// Origin and destination of a move as a user would drag it.
/// Drops have no origin and yield `None`.
fn coordinates(m: &Move) -> Option<(Square, Square)> {
    match m {
        Move::Normal { from, to, .. } => Some((*from, *to)),
        Move::EnPassant { from, to, .. } => Some((*from, *to)),
        Move::Castle { king, rook } => {
            // For castling, user drags king to destination (g1/g8 or c1/c8)
            let king_dest = if rook.file() == File::H {
                Square::from_coords(File::G, rook.rank())
            } else {
                Square::from_coords(File::C, rook.rank())
            };
            Some((*king, king_dest))
        }
        Move::Put { .. } => None,
    }
}
