//! The typed message surface between clients and the session core. Every message travels
//! as an internally-tagged JSON record wrapped in an [`Envelope`] that stamps the send
//! time.

use serde::{Deserialize, Serialize};

use crate::draft::{PlayerDraft, Selection};
use crate::game::{BoardSize, GameState, PerSide};
use crate::pieces::{Color, PieceId, PieceKind};
use crate::placement::{PawnSwap, PlacementState};
use crate::play::{GameResult, MoveRecord};
use crate::server::deps::Timestamp;
use crate::server::room::{RoomPhase, RoomSettings};
use crate::tiles::Square;

/// Wraps a message with its send timestamp (milliseconds since the epoch).
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
pub struct Envelope<M> {
    pub timestamp: Timestamp,
    #[serde(flatten)]
    pub msg: M,
}

impl<M> Envelope<M> {
    pub fn new(timestamp: Timestamp, msg: M) -> Self {
        Self { timestamp, msg }
    }
}

/// Everything a client may send.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ClientMessage {
    CreateRoom {
        player_name: String,
        #[serde(default)]
        settings: RoomSettings,
    },
    JoinRoom {
        room_code: String,
        player_name: String,
    },
    LeaveRoom,
    DraftSubmit {
        draft: Vec<Selection>,
    },
    PlacePiece {
        piece_id: PieceId,
        position: Square,
    },
    MakeMove {
        from: Square,
        to: Square,
        #[serde(default)]
        promotion_piece_type: Option<PieceKind>,
    },
    OfferDraw,
    RespondDraw {
        accept: bool,
    },
    Resign,
    Reconnect {
        room_code: String,
        player_id: String,
    },
    Ping,
}

/// A player as seen by clients.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerInfo {
    pub id: String,
    pub name: String,
    pub color: Color,
    pub connected: bool,
}

/// Routing-level error kinds surfaced to the sender.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RoomErrorKind {
    NotFound,
    Full,
    AlreadyStarted,
    InvalidCode,
}

/// Why a player is no longer in the room.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum LeaveReason {
    Left,
    Disconnected,
    Timeout,
}

/// Why a move was not accepted.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MoveRejectReason {
    InvalidMove,
    NotYourTurn,
    GameOver,
}

/// Draft-phase submission status, included in state syncs during drafting.
#[derive(Debug, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftSyncState {
    pub submitted: PerSide<bool>,
    pub deadline: Option<Timestamp>,
}

/// Everything the server may send.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(
    tag = "type",
    rename_all = "SCREAMING_SNAKE_CASE",
    rename_all_fields = "camelCase"
)]
pub enum ServerMessage {
    RoomCreated {
        room_code: String,
        player_id: String,
        role: Color,
        settings: RoomSettings,
    },
    RoomJoined {
        room_code: String,
        player_id: String,
        role: Color,
        settings: RoomSettings,
        players: Vec<PlayerInfo>,
        phase: RoomPhase,
    },
    PlayerJoined {
        player: PlayerInfo,
    },
    PlayerLeft {
        player_id: String,
        reason: LeaveReason,
    },
    RoomError {
        error: RoomErrorKind,
        message: String,
    },
    DraftCountdown {
        time_remaining: u64,
    },
    DraftStart {
        budget: u32,
        board_size: BoardSize,
        time_limit: Option<u64>,
    },
    /// Reveals only that a player has submitted, never the army itself.
    DraftSubmitted {
        player_id: String,
    },
    DraftRejected {
        message: String,
    },
    DraftReveal {
        white_draft: PlayerDraft,
        black_draft: PlayerDraft,
    },
    DraftTimeout {
        defaulted_player: String,
    },
    PlacementStart {
        placement_state: PlacementState,
    },
    PiecePlaced {
        piece_id: PieceId,
        position: Square,
        actual_position: Square,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        pawn_swap: Option<PawnSwap>,
        next_placer: Option<Color>,
        placement_state: PlacementState,
        game_state: GameState,
    },
    PlacementError {
        message: String,
        placement_state: PlacementState,
    },
    GameStart {
        game_state: GameState,
    },
    MoveMade {
        #[serde(rename = "move")]
        mv: MoveRecord,
        game_state: GameState,
    },
    MoveRejected {
        reason: MoveRejectReason,
        correct_state: GameState,
    },
    GameOver {
        result: GameResult,
        final_state: GameState,
    },
    DrawOffered {
        player_id: String,
    },
    DrawDeclined {
        player_id: String,
    },
    PlayerDisconnected {
        player_id: String,
        timeout_seconds: u64,
    },
    PlayerReconnected {
        player_id: String,
    },
    SyncState {
        phase: RoomPhase,
        settings: RoomSettings,
        players: Vec<PlayerInfo>,
        my_color: Option<Color>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        game_state: Option<GameState>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        placement_state: Option<PlacementState>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        white_draft: Option<PlayerDraft>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        black_draft: Option<PlayerDraft>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        draft_state: Option<DraftSyncState>,
    },
    Pong {
        server_time: Timestamp,
    },
}
