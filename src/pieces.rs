use std::fmt::Display;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::ParseError;
use crate::pieces::Color::{Black, White};
use crate::tiles::Square;

/// The two sides of the game.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Color {
    White,
    Black,
}

impl Color {
    /// Return the other color.
    pub fn other(&self) -> Self {
        match self {
            White => Black,
            Black => White,
        }
    }

    /// Index into per-color arrays.
    pub fn index(&self) -> usize {
        match self {
            White => 0,
            Black => 1,
        }
    }

    /// The forward rank direction for this color (+1 for white, -1 for black).
    pub fn forward(&self) -> i8 {
        match self {
            White => 1,
            Black => -1,
        }
    }
}

impl Display for Color {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            White => write!(f, "white"),
            Black => write!(f, "black"),
        }
    }
}

impl FromStr for Color {
    type Err = ParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "white" => Ok(White),
            "black" => Ok(Black),
            other => Err(ParseError::BadString(other.to_string())),
        }
    }
}

/// The drafting/placement tier of a piece type. Slot caps and placement zones distinguish
/// pawns, pieces and royalty; the `Other` tier counts against the piece slots.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Tier {
    Pawn,
    Piece,
    Royalty,
    Other,
}

/// How a piece captures. `Standard` is displacement capture (move onto the victim's square);
/// all other kinds resolve on a square different from the victim's.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaptureKind {
    Standard,
    Withdrawal,
    Coordinator,
    Boxer,
    Thief,
    LongLeap,
    Chameleon,
    Cannon,
    None,
}

/// The sliding channel of a movement pattern. A slide continues through empty squares until
/// blocked.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum Slides {
    None,
    Orthogonal,
    Diagonal,
    All,
}

/// A single leap offset. When `symmetric` is set the offset expands to all eight reflections
/// and rotations of the vector; otherwise only the literal offset applies.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub struct Leap {
    pub file: i8,
    pub rank: i8,
    pub symmetric: bool,
}

impl Leap {
    pub const fn symmetric(file: i8, rank: i8) -> Self {
        Self {
            file,
            rank,
            symmetric: true,
        }
    }
}

/// Tagged special movement behaviors. Each tag is a fixed algorithm in the move generator.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash)]
pub enum SpecialMove {
    /// One square forward if empty; two from the starting band.
    PawnForward,
    /// The two diagonally-forward squares, capture (or en-passant) only.
    PawnCaptureDiagonal,
    /// One square forward, quiet move or displacement capture.
    ShogiPawn,
    /// One (two on first move) diagonally forward, non-capturing.
    PeasantDiagonal,
    /// Straight forward, capture only.
    PeasantCaptureForward,
    /// The eight neighboring squares.
    KingOneSquare,
    /// Swap positions with an adjacent friendly piece.
    SwapAdjacent,
    /// Exactly two squares orthogonally, blocked by an occupied intermediate.
    HeraldOrthogonal,
    /// Queen slide when the owner's other royalty is gone, short step otherwise.
    RegentConditional,
    /// Diagonal slide reflecting off board edges.
    Bounce,
    /// Queen-line quiet slides plus chained jumps over single enemies.
    LongLeap,
    /// Quiet queen slides plus captures mimicking each victim's own method.
    Chameleon,
    /// Slide to the first occupied square and land immediately beyond it.
    Grasshopper,
    /// Rook-like quiet moves; captures require exactly one screen.
    CannonMove,
    /// Knight vector repeated in a fixed direction until blocked.
    Nightrider,
}

/// The catalog id of a piece type. Serialized as the stable snake_case string id that
/// appears in draft submissions and promotion choices.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PieceKind {
    King,
    Queen,
    Rook,
    Bishop,
    Knight,
    Pawn,
    ShogiPawn,
    Peasant,
    Herald,
    Gorgon,
    Regent,
    PhantomKing,
    Chamberlain,
    Coordinator,
    Withdrawer,
    LongLeaper,
    Chameleon,
    Cannon,
    Boxer,
    Thief,
    Fool,
    Jester,
    Pontiff,
    Grasshopper,
    Nightrider,
}

impl Display for PieceKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.def().name)
    }
}

/// A unique identifier for a piece instance within one game.
pub type PieceId = u32;

/// A piece in play. Created at the draft-to-placement transition with no position, placed
/// during placement, and mutated by move execution. A `None` position means the piece has
/// been captured; it never returns to the board.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PieceInstance {
    pub id: PieceId,
    pub kind: PieceKind,
    pub owner: Color,
    pub position: Option<Square>,
    pub has_moved: bool,
    pub frozen: bool,
}

impl PieceInstance {
    /// Create a new unplaced piece of the given kind and owner.
    pub fn new(id: PieceId, kind: PieceKind, owner: Color) -> Self {
        Self {
            id,
            kind,
            owner,
            position: None,
            has_moved: false,
            frozen: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use crate::pieces::{Color, PieceKind};

    #[test]
    fn test_color_other() {
        assert_eq!(Color::White.other(), Color::Black);
        assert_eq!(Color::Black.other(), Color::White);
        assert_eq!(Color::White.forward(), 1);
        assert_eq!(Color::Black.forward(), -1);
    }

    #[test]
    fn test_kind_serde_ids() {
        assert_eq!(
            serde_json::to_string(&PieceKind::LongLeaper).unwrap(),
            "\"long_leaper\""
        );
        assert_eq!(
            serde_json::from_str::<PieceKind>("\"phantom_king\"").unwrap(),
            PieceKind::PhantomKing
        );
        assert!(serde_json::from_str::<PieceKind>("\"warlock\"").is_err());
    }
}
