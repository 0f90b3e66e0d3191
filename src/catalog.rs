//! The read-only piece catalog: one immutable [`PieceDef`] per piece type, indexed by
//! [`PieceKind`].

use crate::pieces::CaptureKind::{
    Boxer, Cannon, Chameleon, Coordinator, LongLeap, Standard, Thief, Withdrawal,
};
use crate::pieces::PieceKind;
use crate::pieces::SpecialMove::{
    Bounce, CannonMove, Grasshopper, HeraldOrthogonal, KingOneSquare, Nightrider,
    PawnCaptureDiagonal, PawnForward, PeasantCaptureForward, PeasantDiagonal, RegentConditional,
    ShogiPawn, SwapAdjacent,
};
use crate::pieces::Tier::{Other, Pawn, Piece, Royalty};
use crate::pieces::{CaptureKind, Leap, SpecialMove, Slides, Tier};

/// The immutable definition of a piece type.
#[derive(Debug, Clone)]
pub struct PieceDef {
    pub kind: PieceKind,
    /// Human-readable display name.
    pub name: &'static str,
    pub tier: Tier,
    /// Draft cost against the army budget.
    pub cost: u32,
    /// Score contributed while on the board; totaled to resolve stalemates. May be negative.
    pub victory_points: i32,
    /// Whether checkmating this piece ends the game for its owner.
    pub royal: bool,
    /// Auto-included in every army (only the King).
    pub mandatory: bool,
    /// May be drafted in place of, never in addition to, the mandatory King.
    pub replaces_king: bool,
    /// May act as the partner piece in castling.
    pub can_castle: bool,
    /// Whether the piece can be captured at all (Fool and Jester cannot).
    pub can_be_captured: bool,
    /// Whether proximity to this piece freezes enemies.
    pub can_freeze: bool,
    /// Whether long-leap style jumps may pass over this piece.
    pub can_be_jumped: bool,
    pub slides: Slides,
    pub leaps: &'static [Leap],
    pub specials: &'static [SpecialMove],
    pub capture: CaptureKind,
    /// Per-type cap on drafted copies, where one applies.
    pub draft_cap: Option<u8>,
}

const KNIGHT_LEAP: &[Leap] = &[Leap::symmetric(2, 1)];

const DEF: PieceDef = PieceDef {
    kind: PieceKind::Pawn,
    name: "",
    tier: Piece,
    cost: 0,
    victory_points: 0,
    royal: false,
    mandatory: false,
    replaces_king: false,
    can_castle: false,
    can_be_captured: true,
    can_freeze: false,
    can_be_jumped: true,
    slides: Slides::None,
    leaps: &[],
    specials: &[],
    capture: Standard,
    draft_cap: None,
};

/// Every piece type in the game. Order matches the [`PieceKind`] discriminants so lookup is
/// a plain index.
pub static CATALOG: [PieceDef; 25] = [
    PieceDef {
        kind: PieceKind::King,
        name: "King",
        tier: Royalty,
        royal: true,
        mandatory: true,
        specials: &[KingOneSquare],
        ..DEF
    },
    PieceDef {
        kind: PieceKind::Queen,
        name: "Queen",
        tier: Royalty,
        cost: 90,
        victory_points: 90,
        slides: Slides::All,
        ..DEF
    },
    PieceDef {
        kind: PieceKind::Rook,
        name: "Rook",
        cost: 50,
        victory_points: 50,
        can_castle: true,
        slides: Slides::Orthogonal,
        ..DEF
    },
    PieceDef {
        kind: PieceKind::Bishop,
        name: "Bishop",
        cost: 35,
        victory_points: 35,
        slides: Slides::Diagonal,
        ..DEF
    },
    PieceDef {
        kind: PieceKind::Knight,
        name: "Knight",
        cost: 30,
        victory_points: 30,
        leaps: KNIGHT_LEAP,
        ..DEF
    },
    PieceDef {
        kind: PieceKind::Pawn,
        name: "Pawn",
        tier: Pawn,
        cost: 10,
        victory_points: 10,
        specials: &[PawnForward, PawnCaptureDiagonal],
        ..DEF
    },
    PieceDef {
        kind: PieceKind::ShogiPawn,
        name: "Shogi Pawn",
        tier: Pawn,
        cost: 10,
        victory_points: 10,
        specials: &[ShogiPawn],
        ..DEF
    },
    PieceDef {
        kind: PieceKind::Peasant,
        name: "Peasant",
        tier: Pawn,
        cost: 10,
        victory_points: 10,
        specials: &[PeasantDiagonal, PeasantCaptureForward],
        ..DEF
    },
    PieceDef {
        kind: PieceKind::Herald,
        name: "Herald",
        cost: 25,
        victory_points: 25,
        can_freeze: true,
        specials: &[HeraldOrthogonal],
        capture: CaptureKind::None,
        draft_cap: Some(2),
        ..DEF
    },
    PieceDef {
        kind: PieceKind::Gorgon,
        name: "Gorgon",
        cost: 55,
        victory_points: 55,
        can_freeze: true,
        slides: Slides::Diagonal,
        specials: &[KingOneSquare],
        ..DEF
    },
    PieceDef {
        kind: PieceKind::Regent,
        name: "Regent",
        tier: Royalty,
        cost: 80,
        victory_points: 80,
        royal: true,
        replaces_king: true,
        specials: &[RegentConditional],
        ..DEF
    },
    PieceDef {
        kind: PieceKind::PhantomKing,
        name: "Phantom King",
        tier: Royalty,
        cost: 65,
        victory_points: 65,
        royal: true,
        replaces_king: true,
        specials: &[KingOneSquare, SwapAdjacent],
        ..DEF
    },
    PieceDef {
        kind: PieceKind::Chamberlain,
        name: "Chamberlain",
        cost: 40,
        victory_points: 40,
        can_castle: true,
        specials: &[KingOneSquare, SwapAdjacent],
        ..DEF
    },
    PieceDef {
        kind: PieceKind::Coordinator,
        name: "Coordinator",
        cost: 45,
        victory_points: 45,
        slides: Slides::All,
        capture: Coordinator,
        ..DEF
    },
    PieceDef {
        kind: PieceKind::Withdrawer,
        name: "Withdrawer",
        cost: 45,
        victory_points: 45,
        slides: Slides::All,
        capture: Withdrawal,
        ..DEF
    },
    PieceDef {
        kind: PieceKind::LongLeaper,
        name: "Long Leaper",
        cost: 55,
        victory_points: 55,
        specials: &[SpecialMove::LongLeap],
        capture: LongLeap,
        ..DEF
    },
    PieceDef {
        kind: PieceKind::Chameleon,
        name: "Chameleon",
        cost: 60,
        victory_points: 60,
        specials: &[SpecialMove::Chameleon],
        capture: Chameleon,
        ..DEF
    },
    PieceDef {
        kind: PieceKind::Cannon,
        name: "Cannon",
        cost: 45,
        victory_points: 45,
        specials: &[CannonMove],
        capture: Cannon,
        ..DEF
    },
    PieceDef {
        kind: PieceKind::Boxer,
        name: "Boxer",
        cost: 50,
        victory_points: 50,
        slides: Slides::All,
        capture: Boxer,
        ..DEF
    },
    PieceDef {
        kind: PieceKind::Thief,
        name: "Thief",
        cost: 50,
        victory_points: 50,
        slides: Slides::All,
        capture: Thief,
        ..DEF
    },
    PieceDef {
        kind: PieceKind::Fool,
        name: "Fool",
        tier: Pawn,
        cost: 20,
        can_be_captured: false,
        can_be_jumped: false,
        specials: &[PawnForward],
        capture: CaptureKind::None,
        ..DEF
    },
    PieceDef {
        kind: PieceKind::Jester,
        name: "Jester",
        tier: Other,
        cost: 30,
        victory_points: -15,
        can_be_captured: false,
        specials: &[KingOneSquare],
        capture: CaptureKind::None,
        ..DEF
    },
    PieceDef {
        kind: PieceKind::Pontiff,
        name: "Pontiff",
        cost: 40,
        victory_points: 40,
        specials: &[Bounce],
        ..DEF
    },
    PieceDef {
        kind: PieceKind::Grasshopper,
        name: "Grasshopper",
        cost: 30,
        victory_points: 30,
        specials: &[Grasshopper],
        ..DEF
    },
    PieceDef {
        kind: PieceKind::Nightrider,
        name: "Nightrider",
        cost: 55,
        victory_points: 55,
        specials: &[Nightrider],
        ..DEF
    },
];

impl PieceKind {
    /// The catalog definition for this kind.
    pub fn def(self) -> &'static PieceDef {
        &CATALOG[self as usize]
    }

    /// Whether this kind moves like a pawn for promotion purposes.
    pub fn is_pawn_like(self) -> bool {
        self.def()
            .specials
            .iter()
            .any(|s| matches!(s, PawnForward | ShogiPawn | PeasantDiagonal))
    }
}

/// The promotion choices offered when the computed option set is empty.
pub const PROMOTION_FALLBACK: [PieceKind; 4] = [
    PieceKind::Queen,
    PieceKind::Rook,
    PieceKind::Bishop,
    PieceKind::Knight,
];
