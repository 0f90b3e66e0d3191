//! A rules engine and authoritative session core for a fairy-chess variant in which each
//! side drafts a point-budgeted army, places it on its back ranks, and plays a check-based
//! game. The engine (catalog, board, move generation, attack oracle, legality, draft and
//! placement validation) is pure and transport-agnostic; the [`server`] module drives the
//! draft → placement → play lifecycle for two remote clients over an injected transport.

mod attacks;
mod board;
mod catalog;
mod draft;
mod error;
mod game;
mod game_logic;
mod movegen;
mod pieces;
mod placement;
mod play;
pub mod server;
mod tiles;

pub use crate::{
    attacks::{is_attacked, is_in_check},
    board::Board,
    catalog::{PieceDef, CATALOG, PROMOTION_FALLBACK},
    draft::{slot_caps, PlayerDraft, Selection, SlotCaps, SlotsUsed},
    error::{InvalidDraft, InvalidMove, InvalidPlacement, ParseError},
    game::{BoardSize, GamePhase, GameState, PerSide, SideLedger},
    game_logic::{
        castle_destinations, detect_end, home_rank, legal_destinations, promotion_options,
        promotion_rank,
    },
    movegen::pseudo_legal,
    pieces::{
        CaptureKind, Color, Leap, PieceId, PieceInstance, PieceKind, Slides, SpecialMove, Tier,
    },
    placement::{pawn_rank, PawnSwap, PlacedPiece, PlacementState},
    play::{EndReason, GameResult, Move, MoveRecord},
    tiles::{Coords, Delta, Square},
};
