use serde::{Deserialize, Serialize};

use crate::pieces::{Color, PieceKind};
use crate::tiles::Square;

/// A requested move: source and destination squares plus a promotion choice where one is
/// required. This is the engine's only move input; castling, swaps and en-passant are
/// recognized from the squares themselves.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Move {
    pub from: Square,
    pub to: Square,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<PieceKind>,
}

impl Move {
    pub fn new(from: Square, to: Square) -> Self {
        Self {
            from,
            to,
            promotion: None,
        }
    }

    pub fn promoting(from: Square, to: Square, promotion: PieceKind) -> Self {
        Self {
            from,
            to,
            promotion: Some(promotion),
        }
    }
}

/// A record of one executed move, kept in the game's history.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MoveRecord {
    pub turn_number: u32,
    pub color: Color,
    pub kind: PieceKind,
    pub from: Square,
    pub to: Square,
    /// The kinds of every piece this move removed from the board, side-effect captures
    /// included.
    pub captures: Vec<PieceKind>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub promotion: Option<PieceKind>,
    pub castled: bool,
    pub swapped: bool,
    pub gave_check: bool,
}

/// Why a finished game ended.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum EndReason {
    /// The side to move has no legal moves and is in check (or has lost its royal piece).
    Checkmate,
    /// The side to move has no legal moves and is not in check; resolved by victory points.
    Stalemate,
    /// A stalemate whose victory-point totals were equal.
    DrawVpTie,
    /// Both players agreed to a draw.
    DrawAgreement,
    Resignation,
    Timeout,
}

/// The outcome of a finished game.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct GameResult {
    /// `None` for drawn games.
    pub winner: Option<Color>,
    pub reason: EndReason,
}

impl GameResult {
    pub fn win(winner: Color, reason: EndReason) -> Self {
        Self {
            winner: Some(winner),
            reason,
        }
    }

    pub fn draw(reason: EndReason) -> Self {
        Self {
            winner: None,
            reason,
        }
    }
}
