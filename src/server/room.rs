//! The per-room state machine: waiting → drafting → placement → playing → ended. The room
//! owns the authoritative game state, enforces turn ownership, and drives every timer
//! (countdown ticks, draft deadline, reveal delay, disconnect grace) off deadlines that the
//! runtime polls.

use rand::RngCore;
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::{info, warn};

use crate::draft::{PlayerDraft, Selection};
use crate::error::InvalidMove;
use crate::game::{BoardSize, GamePhase, GameState, PerSide};
use crate::pieces::{Color, PieceId};
use crate::play::{EndReason, GameResult, Move};
use crate::server::deps::Timestamp;
use crate::server::messages::{
    DraftSyncState, LeaveReason, MoveRejectReason, PlayerInfo, RoomErrorKind, ServerMessage,
};
use crate::tiles::Square;

/// One countdown tick per second, three ticks before drafting begins.
const COUNTDOWN_TICKS: u64 = 3;
const COUNTDOWN_TICK_MS: u64 = 1_000;
/// How long both revealed armies stay on screen before placement starts.
const REVEAL_DELAY_MS: u64 = 3_000;
/// How long a disconnected player may return before forfeiting.
const DISCONNECT_GRACE_MS: u64 = 60_000;
const DISCONNECT_GRACE_SECS: u64 = DISCONNECT_GRACE_MS / 1_000;
/// Ended rooms idle this long are reaped by the sweeper.
const STALE_AFTER_MS: u64 = 3_600_000;

/// The budget values offered by clients. The engine itself only requires budget ≥ 0.
pub const BUDGET_PRESETS: [u32; 7] = [260, 360, 400, 500, 600, 700, 900];

/// Room configuration fixed at creation.
#[derive(Debug, Clone, Copy, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RoomSettings {
    pub budget: u32,
    pub board_size: BoardSize,
    /// Seconds both players have to submit their drafts.
    pub draft_time_limit: Option<u64>,
    /// Reserved; no per-move timer is started while this is `None`.
    pub move_time_limit: Option<u64>,
}

impl Default for RoomSettings {
    fn default() -> Self {
        Self {
            budget: 400,
            board_size: BoardSize::Size8x8,
            draft_time_limit: Some(60),
            move_time_limit: None,
        }
    }
}

/// The lifecycle phase of a room. Mirrors [`GamePhase`] with the extra `waiting` state
/// before the second player arrives.
#[derive(Debug, Copy, Clone, Eq, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RoomPhase {
    Waiting,
    Drafting,
    Placement,
    Playing,
    Ended,
}

/// Errors surfaced while routing a player into a room.
#[derive(Debug, Error, Eq, PartialEq)]
pub enum RoomError {
    #[error("room {0} not found")]
    NotFound(String),
    #[error("room {0} is full")]
    Full(String),
    #[error("the game in room {0} has already started")]
    AlreadyStarted(String),
    #[error("invalid room code {0:?}")]
    InvalidCode(String),
    #[error("room code space exhausted")]
    CodesExhausted,
}

impl RoomError {
    pub fn kind(&self) -> RoomErrorKind {
        match self {
            RoomError::NotFound(_) => RoomErrorKind::NotFound,
            RoomError::Full(_) => RoomErrorKind::Full,
            RoomError::AlreadyStarted(_) => RoomErrorKind::AlreadyStarted,
            RoomError::InvalidCode(_) | RoomError::CodesExhausted => RoomErrorKind::InvalidCode,
        }
    }
}

/// One seated player.
#[derive(Debug, Clone)]
pub struct PlayerSeat {
    pub id: String,
    pub name: String,
    pub color: Color,
    pub connected: bool,
    pub last_seen: Timestamp,
}

impl PlayerSeat {
    fn info(&self) -> PlayerInfo {
        PlayerInfo {
            id: self.id.clone(),
            name: self.name.clone(),
            color: self.color,
            connected: self.connected,
        }
    }
}

/// Who an outbound message goes to.
#[derive(Debug, Copy, Clone, Eq, PartialEq)]
pub enum Audience {
    /// Only the player whose input produced this message.
    Sender,
    /// Both players in the room.
    Room,
}

/// An outbound message paired with its audience.
#[derive(Debug, Clone)]
pub struct Outgoing {
    pub audience: Audience,
    pub message: ServerMessage,
}

impl Outgoing {
    fn to_sender(message: ServerMessage) -> Self {
        Self {
            audience: Audience::Sender,
            message,
        }
    }

    fn to_room(message: ServerMessage) -> Self {
        Self {
            audience: Audience::Room,
            message,
        }
    }
}

#[derive(Debug, Default)]
struct Countdown {
    remaining: u64,
    next_tick_at: Timestamp,
}

/// All pending deadlines. A `None` timer is not running.
#[derive(Debug, Default)]
struct Timers {
    countdown: Option<Countdown>,
    draft_deadline: Option<Timestamp>,
    reveal_at: Option<Timestamp>,
    grace: PerSide<Option<Timestamp>>,
}

impl Timers {
    fn next_deadline(&self) -> Option<Timestamp> {
        [
            self.countdown.as_ref().map(|c| c.next_tick_at),
            self.draft_deadline,
            self.reveal_at,
            self.grace.white,
            self.grace.black,
        ]
        .into_iter()
        .flatten()
        .min()
    }
}

/// The outcome of a successful join.
#[derive(Debug)]
pub struct JoinOutcome {
    pub player_id: String,
    pub color: Color,
    pub events: Vec<Outgoing>,
}

/// A single game room. All mutation is serialized by the owner of the room handle; the
/// methods here are pure state transitions that return the messages to deliver.
pub struct Room {
    code: String,
    settings: RoomSettings,
    phase: RoomPhase,
    players: Vec<PlayerSeat>,
    drafts: PerSide<Option<PlayerDraft>>,
    placement: Option<crate::placement::PlacementState>,
    game: Option<GameState>,
    draw_offer: Option<Color>,
    timers: Timers,
    last_activity: Timestamp,
}

impl Room {
    pub fn new(code: String, settings: RoomSettings, now: Timestamp) -> Self {
        Self {
            code,
            settings,
            phase: RoomPhase::Waiting,
            players: Vec::with_capacity(2),
            drafts: PerSide::default(),
            placement: None,
            game: None,
            draw_offer: None,
            timers: Timers::default(),
            last_activity: now,
        }
    }

    pub fn code(&self) -> &str {
        &self.code
    }

    pub fn phase(&self) -> RoomPhase {
        self.phase
    }

    pub fn settings(&self) -> &RoomSettings {
        &self.settings
    }

    pub fn is_empty(&self) -> bool {
        self.players.is_empty()
    }

    /// Whether the sweeper may evict this room.
    pub fn is_stale(&self, now: Timestamp) -> bool {
        self.phase == RoomPhase::Ended && now.saturating_sub(self.last_activity) >= STALE_AFTER_MS
    }

    /// The earliest instant at which [`Room::on_tick`] has work to do.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.timers.next_deadline()
    }

    fn touch(&mut self, now: Timestamp) {
        self.last_activity = now;
    }

    fn seat(&self, player_id: &str) -> Option<&PlayerSeat> {
        self.players.iter().find(|p| p.id == player_id)
    }

    fn seat_mut(&mut self, player_id: &str) -> Option<&mut PlayerSeat> {
        self.players.iter_mut().find(|p| p.id == player_id)
    }

    fn seat_of_color(&self, color: Color) -> Option<&PlayerSeat> {
        self.players.iter().find(|p| p.color == color)
    }

    /// The seated players as clients see them.
    pub fn players(&self) -> Vec<PlayerInfo> {
        self.players.iter().map(|p| p.info()).collect()
    }

    /// Seat a new player. The first joiner is white, the second is black and starts the
    /// pre-draft countdown.
    pub fn join(
        &mut self,
        name: &str,
        rng: &mut dyn RngCore,
        now: Timestamp,
    ) -> Result<JoinOutcome, RoomError> {
        if self.phase != RoomPhase::Waiting {
            return Err(RoomError::AlreadyStarted(self.code.clone()));
        }
        if self.players.len() >= 2 {
            return Err(RoomError::Full(self.code.clone()));
        }
        self.touch(now);
        let color = if self.players.is_empty() {
            Color::White
        } else {
            Color::Black
        };
        let name: String = name.trim().chars().take(20).collect();
        let seat = PlayerSeat {
            id: player_token(rng),
            name,
            color,
            connected: true,
            last_seen: now,
        };
        let player_id = seat.id.clone();
        let info = seat.info();
        self.players.push(seat);
        info!(room = %self.code, player = %player_id, %color, "player joined");

        let mut events = vec![Outgoing::to_room(ServerMessage::PlayerJoined {
            player: info,
        })];
        if self.players.len() == 2 {
            self.timers.countdown = Some(Countdown {
                remaining: COUNTDOWN_TICKS,
                next_tick_at: now + COUNTDOWN_TICK_MS,
            });
            events.push(Outgoing::to_room(ServerMessage::DraftCountdown {
                time_remaining: COUNTDOWN_TICKS,
            }));
        }
        Ok(JoinOutcome {
            player_id,
            color,
            events,
        })
    }

    /// Fire every timer that is due. Called by the runtime whenever a deadline passes.
    pub fn on_tick(&mut self, now: Timestamp) -> Vec<Outgoing> {
        let mut events = Vec::new();

        let mut drafting_due = false;
        if let Some(countdown) = &mut self.timers.countdown {
            while countdown.next_tick_at <= now && countdown.remaining > 0 {
                countdown.remaining -= 1;
                countdown.next_tick_at += COUNTDOWN_TICK_MS;
                if countdown.remaining > 0 {
                    events.push(Outgoing::to_room(ServerMessage::DraftCountdown {
                        time_remaining: countdown.remaining,
                    }));
                }
            }
            drafting_due = countdown.remaining == 0;
        }
        if drafting_due {
            self.timers.countdown = None;
            events.extend(self.enter_drafting(now));
        }

        if self.timers.draft_deadline.is_some_and(|d| d <= now) {
            self.timers.draft_deadline = None;
            events.extend(self.default_missing_drafts(now));
        }

        if self.timers.reveal_at.is_some_and(|d| d <= now) {
            self.timers.reveal_at = None;
            events.extend(self.enter_placement(now));
        }

        for color in [Color::White, Color::Black] {
            if self.timers.grace.get(color).is_some_and(|d| d <= now) {
                *self.timers.grace.get_mut(color) = None;
                events.extend(self.grace_expired(color, now));
            }
        }

        events
    }

    fn enter_drafting(&mut self, now: Timestamp) -> Vec<Outgoing> {
        self.phase = RoomPhase::Drafting;
        self.timers.draft_deadline = self
            .settings
            .draft_time_limit
            .map(|secs| now + secs * 1_000);
        info!(room = %self.code, "drafting started");
        vec![Outgoing::to_room(ServerMessage::DraftStart {
            budget: self.settings.budget,
            board_size: self.settings.board_size,
            time_limit: self.settings.draft_time_limit,
        })]
    }

    /// Fill any missing draft with the fallback army, then reveal.
    fn default_missing_drafts(&mut self, now: Timestamp) -> Vec<Outgoing> {
        let mut events = Vec::new();
        for color in [Color::White, Color::Black] {
            if self.drafts.get(color).is_none() {
                *self.drafts.get_mut(color) = Some(PlayerDraft::fallback());
                let player_id = self
                    .seat_of_color(color)
                    .map(|p| p.id.clone())
                    .unwrap_or_default();
                warn!(room = %self.code, %color, "draft timed out, using fallback army");
                events.push(Outgoing::to_room(ServerMessage::DraftTimeout {
                    defaulted_player: player_id,
                }));
            }
        }
        events.extend(self.begin_reveal(now));
        events
    }

    fn begin_reveal(&mut self, now: Timestamp) -> Vec<Outgoing> {
        self.timers.draft_deadline = None;
        self.timers.reveal_at = Some(now + REVEAL_DELAY_MS);
        let (Some(white), Some(black)) = (self.drafts.white.clone(), self.drafts.black.clone())
        else {
            return self.fail("reveal without both drafts");
        };
        vec![Outgoing::to_room(ServerMessage::DraftReveal {
            white_draft: white,
            black_draft: black,
        })]
    }

    fn enter_placement(&mut self, now: Timestamp) -> Vec<Outgoing> {
        let (Some(white), Some(black)) = (self.drafts.white.clone(), self.drafts.black.clone())
        else {
            return self.fail("placement without both drafts");
        };
        self.phase = RoomPhase::Placement;
        self.touch(now);

        let mut game = GameState::new(self.settings.board_size, self.settings.budget);
        game.record_budgets(white.budget_spent(), black.budget_spent());
        game.phase = GamePhase::Placement;

        // Instance ids are local to this game, assigned here at the draft-to-placement
        // transition.
        let mut next_id: PieceId = 1;
        let white_pool = white.instantiate_army(Color::White, &mut next_id);
        let black_pool = black.instantiate_army(Color::Black, &mut next_id);
        let placement = crate::placement::PlacementState::new(white_pool, black_pool);

        self.game = Some(game);
        let events = vec![Outgoing::to_room(ServerMessage::PlacementStart {
            placement_state: placement.clone(),
        })];
        self.placement = Some(placement);
        info!(room = %self.code, "placement started");
        events
    }

    /// Accept a draft submission. Each player may submit once; the army is validated
    /// against the room's budget and board.
    pub fn handle_draft_submit(
        &mut self,
        player_id: &str,
        selections: Vec<Selection>,
        now: Timestamp,
    ) -> Vec<Outgoing> {
        if self.phase != RoomPhase::Drafting {
            return vec![Outgoing::to_sender(ServerMessage::DraftRejected {
                message: "the room is not drafting".into(),
            })];
        }
        let Some(color) = self.seat(player_id).map(|p| p.color) else {
            return vec![self.not_in_room()];
        };
        if self.drafts.get(color).is_some() {
            return vec![Outgoing::to_sender(ServerMessage::DraftRejected {
                message: "draft already submitted".into(),
            })];
        }
        let draft = PlayerDraft::from_selections(selections);
        if let Err(err) = draft.validate(self.settings.budget, self.settings.board_size) {
            info!(room = %self.code, %color, ?err, "draft rejected");
            return vec![Outgoing::to_sender(ServerMessage::DraftRejected {
                message: format!("{err:?}"),
            })];
        }
        self.touch(now);
        *self.drafts.get_mut(color) = Some(draft);
        info!(room = %self.code, %color, "draft accepted");
        let mut events = vec![Outgoing::to_room(ServerMessage::DraftSubmitted {
            player_id: player_id.to_string(),
        })];
        if self.drafts.white.is_some() && self.drafts.black.is_some() {
            events.extend(self.begin_reveal(now));
        }
        events
    }

    /// Place one piece for the current placer.
    pub fn handle_place(
        &mut self,
        player_id: &str,
        piece_id: PieceId,
        position: Square,
        now: Timestamp,
    ) -> Vec<Outgoing> {
        let Some(color) = self.seat(player_id).map(|p| p.color) else {
            return vec![self.not_in_room()];
        };
        if self.phase != RoomPhase::Placement {
            let snapshot = self.placement.clone();
            return vec![Outgoing::to_sender(ServerMessage::PlacementError {
                message: "the room is not placing".into(),
                placement_state: match snapshot {
                    Some(p) => p,
                    None => crate::placement::PlacementState::new(Vec::new(), Vec::new()),
                },
            })];
        }
        if self.placement.is_none() || self.game.is_none() {
            return self.fail("placement phase without placement state");
        }
        let Some(placement) = self.placement.as_mut() else {
            return Vec::new();
        };
        let Some(game) = self.game.as_mut() else {
            return Vec::new();
        };
        match placement.place(&mut game.board, color, piece_id, position) {
            Ok(placed) => {
                let placement_snapshot = placement.clone();
                let game_snapshot = game.clone();
                let done = placed.next_placer.is_none();
                let mut events = vec![Outgoing::to_room(ServerMessage::PiecePlaced {
                    piece_id: placed.piece_id,
                    position: placed.position,
                    actual_position: placed.actual_position,
                    pawn_swap: placed.pawn_swap,
                    next_placer: placed.next_placer,
                    placement_state: placement_snapshot,
                    game_state: game_snapshot,
                })];
                self.touch(now);
                if done {
                    events.extend(self.start_game(now));
                }
                events
            }
            Err(err) => {
                let snapshot = placement.clone();
                info!(room = %self.code, %color, ?err, "placement rejected");
                vec![Outgoing::to_sender(ServerMessage::PlacementError {
                    message: format!("{err:?}"),
                    placement_state: snapshot,
                })]
            }
        }
    }

    fn start_game(&mut self, now: Timestamp) -> Vec<Outgoing> {
        if self.game.is_none() {
            return self.fail("game start without game state");
        }
        let Some(game) = self.game.as_mut() else {
            return Vec::new();
        };
        game.start_play();
        let snapshot = game.clone();
        self.phase = RoomPhase::Playing;
        self.placement = None;
        self.touch(now);
        info!(room = %self.code, "game started");
        vec![Outgoing::to_room(ServerMessage::GameStart {
            game_state: snapshot,
        })]
    }

    /// Validate and apply a move for the side to move.
    pub fn handle_move(
        &mut self,
        player_id: &str,
        from: Square,
        to: Square,
        promotion: Option<crate::pieces::PieceKind>,
        now: Timestamp,
    ) -> Vec<Outgoing> {
        let Some(color) = self.seat(player_id).map(|p| p.color) else {
            return vec![self.not_in_room()];
        };
        let reject = |reason, game: &GameState| {
            vec![Outgoing::to_sender(ServerMessage::MoveRejected {
                reason,
                correct_state: game.clone(),
            })]
        };
        let Some(game) = self.game.as_ref() else {
            return vec![self.not_in_room()];
        };
        if self.phase == RoomPhase::Ended {
            return reject(MoveRejectReason::GameOver, game);
        }
        if self.phase != RoomPhase::Playing {
            return reject(MoveRejectReason::InvalidMove, game);
        }
        if game.current_turn != color {
            return reject(MoveRejectReason::NotYourTurn, game);
        }
        let Some(game) = self.game.as_mut() else {
            return Vec::new();
        };
        let mv = Move {
            from,
            to,
            promotion,
        };
        match game.make_move(mv) {
            Ok(record) => {
                let game = game.clone();
                self.draw_offer = None;
                self.touch(now);
                info!(room = %self.code, %color, mv = %format_args!("{from}-{to}"), "move accepted");
                let mut events = vec![Outgoing::to_room(ServerMessage::MoveMade {
                    mv: record,
                    game_state: game.clone(),
                })];
                if let Some(result) = game.result {
                    events.extend(self.finish_game(result, now));
                }
                events
            }
            Err(err) => {
                let reason = match err {
                    InvalidMove::GameOver => MoveRejectReason::GameOver,
                    InvalidMove::WrongPlayer => MoveRejectReason::NotYourTurn,
                    _ => MoveRejectReason::InvalidMove,
                };
                info!(room = %self.code, %color, ?err, "move rejected");
                reject(reason, game)
            }
        }
    }

    /// Mark the room ended and cancel the per-player grace timers.
    fn finish_game(&mut self, result: GameResult, now: Timestamp) -> Vec<Outgoing> {
        self.phase = RoomPhase::Ended;
        self.timers.grace = PerSide::default();
        self.draw_offer = None;
        self.touch(now);
        if let Some(game) = self.game.as_mut() {
            if game.result.is_none() {
                game.inject_result(result);
            }
            info!(room = %self.code, ?result, "game over");
            vec![Outgoing::to_room(ServerMessage::GameOver {
                result,
                final_state: game.clone(),
            })]
        } else {
            Vec::new()
        }
    }

    pub fn handle_resign(&mut self, player_id: &str, now: Timestamp) -> Vec<Outgoing> {
        let Some(color) = self.seat(player_id).map(|p| p.color) else {
            return vec![self.not_in_room()];
        };
        if self.phase != RoomPhase::Playing {
            return Vec::new();
        }
        self.finish_game(GameResult::win(color.other(), EndReason::Resignation), now)
    }

    pub fn handle_offer_draw(&mut self, player_id: &str, now: Timestamp) -> Vec<Outgoing> {
        let Some(color) = self.seat(player_id).map(|p| p.color) else {
            return vec![self.not_in_room()];
        };
        if self.phase != RoomPhase::Playing || self.draw_offer.is_some() {
            return Vec::new();
        }
        self.draw_offer = Some(color);
        self.touch(now);
        vec![Outgoing::to_room(ServerMessage::DrawOffered {
            player_id: player_id.to_string(),
        })]
    }

    pub fn handle_respond_draw(
        &mut self,
        player_id: &str,
        accept: bool,
        now: Timestamp,
    ) -> Vec<Outgoing> {
        let Some(color) = self.seat(player_id).map(|p| p.color) else {
            return vec![self.not_in_room()];
        };
        let Some(offerer) = self.draw_offer else {
            return Vec::new();
        };
        if offerer == color || self.phase != RoomPhase::Playing {
            return Vec::new();
        }
        self.draw_offer = None;
        if accept {
            self.finish_game(GameResult::draw(EndReason::DrawAgreement), now)
        } else {
            vec![Outgoing::to_room(ServerMessage::DrawDeclined {
                player_id: player_id.to_string(),
            })]
        }
    }

    /// A player deliberately left. During play this forfeits the game; a waiting room
    /// simply frees the seat.
    pub fn handle_leave(&mut self, player_id: &str, now: Timestamp) -> Vec<Outgoing> {
        let Some(color) = self.seat(player_id).map(|p| p.color) else {
            return Vec::new();
        };
        self.touch(now);
        let mut events = vec![Outgoing::to_room(ServerMessage::PlayerLeft {
            player_id: player_id.to_string(),
            reason: LeaveReason::Left,
        })];
        match self.phase {
            RoomPhase::Waiting => {
                self.players.retain(|p| p.id != player_id);
                self.timers.countdown = None;
                if self.players.is_empty() {
                    // Nobody left; let the sweeper reclaim the room.
                    self.phase = RoomPhase::Ended;
                }
            }
            RoomPhase::Playing => {
                events.extend(
                    self.finish_game(GameResult::win(color.other(), EndReason::Resignation), now),
                );
            }
            RoomPhase::Ended => {}
            _ => {
                // A departure mid-draft or mid-placement abandons the game with no winner.
                self.phase = RoomPhase::Ended;
            }
        }
        events
    }

    /// The transport dropped a player's connection. During an active game a grace timer
    /// starts; in a waiting room the seat is freed.
    pub fn on_disconnect(&mut self, player_id: &str, now: Timestamp) -> Vec<Outgoing> {
        let Some(seat) = self.seat_mut(player_id) else {
            return Vec::new();
        };
        seat.connected = false;
        seat.last_seen = now;
        let color = seat.color;
        self.touch(now);
        match self.phase {
            RoomPhase::Waiting => {
                self.players.retain(|p| p.id != player_id);
                self.timers.countdown = None;
                if self.players.is_empty() {
                    self.phase = RoomPhase::Ended;
                }
                vec![Outgoing::to_room(ServerMessage::PlayerLeft {
                    player_id: player_id.to_string(),
                    reason: LeaveReason::Disconnected,
                })]
            }
            RoomPhase::Ended => Vec::new(),
            _ => {
                *self.timers.grace.get_mut(color) = Some(now + DISCONNECT_GRACE_MS);
                info!(room = %self.code, player = %player_id, "disconnected, grace started");
                vec![Outgoing::to_room(ServerMessage::PlayerDisconnected {
                    player_id: player_id.to_string(),
                    timeout_seconds: DISCONNECT_GRACE_SECS,
                })]
            }
        }
    }

    fn grace_expired(&mut self, color: Color, now: Timestamp) -> Vec<Outgoing> {
        let Some(seat) = self.seat_of_color(color) else {
            return Vec::new();
        };
        if seat.connected {
            return Vec::new();
        }
        let player_id = seat.id.clone();
        warn!(room = %self.code, player = %player_id, "grace expired");
        let mut events = vec![Outgoing::to_room(ServerMessage::PlayerLeft {
            player_id,
            reason: LeaveReason::Timeout,
        })];
        if self.phase == RoomPhase::Playing {
            events.extend(self.finish_game(GameResult::win(color.other(), EndReason::Timeout), now));
        } else {
            self.phase = RoomPhase::Ended;
        }
        events
    }

    /// A player returned with their room code and player id: cancel the grace timer and
    /// send them a state snapshot sufficient to resume.
    pub fn reconnect(&mut self, player_id: &str, now: Timestamp) -> Result<Vec<Outgoing>, RoomError> {
        let code = self.code.clone();
        let Some(seat) = self.seat_mut(player_id) else {
            return Err(RoomError::NotFound(code));
        };
        seat.connected = true;
        seat.last_seen = now;
        let color = seat.color;
        *self.timers.grace.get_mut(color) = None;
        self.touch(now);
        info!(room = %self.code, player = %player_id, "reconnected");
        Ok(vec![
            Outgoing::to_room(ServerMessage::PlayerReconnected {
                player_id: player_id.to_string(),
            }),
            Outgoing::to_sender(self.sync_state(Some(color))),
        ])
    }

    /// A state snapshot tailored to one player. Unrevealed drafts are only included for
    /// their owner; both appear once the reveal has happened.
    pub fn sync_state(&self, my_color: Option<Color>) -> ServerMessage {
        let drafting = self.phase == RoomPhase::Drafting || self.phase == RoomPhase::Waiting;
        let visible = |color: Color| -> Option<PlayerDraft> {
            let draft = self.drafts.get(color).clone()?;
            if drafting && my_color != Some(color) {
                None
            } else {
                Some(draft)
            }
        };
        ServerMessage::SyncState {
            phase: self.phase,
            settings: self.settings,
            players: self.players(),
            my_color,
            game_state: self.game.clone(),
            placement_state: self.placement.clone(),
            white_draft: visible(Color::White),
            black_draft: visible(Color::Black),
            draft_state: drafting.then(|| DraftSyncState {
                submitted: PerSide {
                    white: self.drafts.white.is_some(),
                    black: self.drafts.black.is_some(),
                },
                deadline: self.timers.draft_deadline,
            }),
        }
    }

    fn not_in_room(&self) -> Outgoing {
        Outgoing::to_sender(ServerMessage::RoomError {
            error: RoomErrorKind::NotFound,
            message: "player is not seated in this room".into(),
        })
    }

    /// An internal invariant was violated: log it and terminate the room with no winner
    /// rather than corrupt state.
    pub fn fail(&mut self, fault: &str) -> Vec<Outgoing> {
        warn!(room = %self.code, fault, "internal fault, terminating room");
        self.phase = RoomPhase::Ended;
        self.timers = Timers::default();
        if let Some(game) = self.game.as_mut() {
            game.phase = GamePhase::Ended;
        }
        Vec::new()
    }
}

/// A short opaque player id drawn from the unambiguous alphabet.
fn player_token(rng: &mut dyn RngCore) -> String {
    use crate::server::directory::CODE_ALPHABET;
    (0..12)
        .map(|_| {
            let i = (rng.next_u32() as usize) % CODE_ALPHABET.len();
            CODE_ALPHABET[i] as char
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use std::str::FromStr;

    use rand::rngs::StdRng;
    use rand::SeedableRng;

    use crate::draft::{PlayerDraft, Selection};
    use crate::pieces::Color::{Black, White};
    use crate::pieces::PieceKind;
    use crate::server::messages::{LeaveReason, MoveRejectReason, ServerMessage};
    use crate::server::room::{Audience, Outgoing, Room, RoomPhase, RoomSettings};
    use crate::tiles::Square;

    fn sq(s: &str) -> Square {
        Square::from_str(s).unwrap()
    }

    fn selections(picks: &[(PieceKind, u8)]) -> Vec<Selection> {
        picks
            .iter()
            .map(|&(kind, count)| Selection { kind, count })
            .collect()
    }

    /// Drive a fresh room to the drafting phase. Returns (room, white id, black id, now).
    fn drafting_room() -> (Room, String, String, u64) {
        let mut rng = StdRng::seed_from_u64(7);
        let mut room = Room::new("AB23CD".into(), RoomSettings::default(), 0);
        let white = room.join("alice", &mut rng, 0).unwrap();
        let black = room.join("bob", &mut rng, 10).unwrap();
        assert_eq!(white.color, White);
        assert_eq!(black.color, Black);
        // Countdown ticks at 1s intervals, then drafting starts.
        let events = room.on_tick(10 + 3_000);
        assert!(events
            .iter()
            .any(|e| matches!(e.message, ServerMessage::DraftStart { .. })));
        assert_eq!(room.phase(), RoomPhase::Drafting);
        (room, white.player_id, black.player_id, 3_010)
    }

    fn has_room_message(events: &[Outgoing], f: impl Fn(&ServerMessage) -> bool) -> bool {
        events
            .iter()
            .any(|e| e.audience == Audience::Room && f(&e.message))
    }

    #[test]
    fn test_third_join_rejected() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut room = Room::new("AB23CD".into(), RoomSettings::default(), 0);
        room.join("a", &mut rng, 0).unwrap();
        room.join("b", &mut rng, 0).unwrap();
        assert!(room.join("c", &mut rng, 0).is_err());
    }

    #[test]
    fn test_countdown_emits_per_second() {
        let mut rng = StdRng::seed_from_u64(7);
        let mut room = Room::new("AB23CD".into(), RoomSettings::default(), 0);
        room.join("a", &mut rng, 0).unwrap();
        let join = room.join("b", &mut rng, 0).unwrap();
        assert!(join
            .events
            .iter()
            .any(|e| matches!(e.message, ServerMessage::DraftCountdown { time_remaining: 3 })));
        let events = room.on_tick(1_000);
        assert!(has_room_message(&events, |m| matches!(
            m,
            ServerMessage::DraftCountdown { time_remaining: 2 }
        )));
        let events = room.on_tick(2_000);
        assert!(has_room_message(&events, |m| matches!(
            m,
            ServerMessage::DraftCountdown { time_remaining: 1 }
        )));
        let events = room.on_tick(3_000);
        assert!(has_room_message(&events, |m| matches!(
            m,
            ServerMessage::DraftStart { .. }
        )));
    }

    #[test]
    fn test_draft_submit_once() {
        let (mut room, white_id, _black_id, now) = drafting_room();
        let picks = selections(&[(PieceKind::Pawn, 2)]);
        let events = room.handle_draft_submit(&white_id, picks.clone(), now);
        assert!(has_room_message(&events, |m| matches!(
            m,
            ServerMessage::DraftSubmitted { .. }
        )));
        let events = room.handle_draft_submit(&white_id, picks, now);
        assert!(events
            .iter()
            .any(|e| matches!(e.message, ServerMessage::DraftRejected { .. })));
    }

    #[test]
    fn test_invalid_draft_rejected_to_sender_only() {
        let (mut room, white_id, _black, now) = drafting_room();
        let events =
            room.handle_draft_submit(&white_id, selections(&[(PieceKind::Queen, 3)]), now);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].audience, Audience::Sender);
        assert!(matches!(
            events[0].message,
            ServerMessage::DraftRejected { .. }
        ));
    }

    #[test]
    fn test_both_drafts_trigger_reveal_then_placement() {
        let (mut room, white_id, black_id, now) = drafting_room();
        room.handle_draft_submit(&white_id, selections(&[(PieceKind::Pawn, 1)]), now);
        let events =
            room.handle_draft_submit(&black_id, selections(&[(PieceKind::Pawn, 1)]), now);
        assert!(has_room_message(&events, |m| matches!(
            m,
            ServerMessage::DraftReveal { .. }
        )));
        // Still drafting until the reveal delay passes.
        assert_eq!(room.phase(), RoomPhase::Drafting);
        let events = room.on_tick(now + 3_000);
        assert!(has_room_message(&events, |m| matches!(
            m,
            ServerMessage::PlacementStart { .. }
        )));
        assert_eq!(room.phase(), RoomPhase::Placement);
    }

    #[test]
    fn test_draft_timeout_defaults_both() {
        let (mut room, _w, _b, now) = drafting_room();
        // Neither player submits; the 60s deadline passes.
        let events = room.on_tick(now + 60_000);
        let timeouts = events
            .iter()
            .filter(|e| matches!(e.message, ServerMessage::DraftTimeout { .. }))
            .count();
        assert_eq!(timeouts, 2);
        assert!(has_room_message(&events, |m| matches!(
            m,
            ServerMessage::DraftReveal { .. }
        )));
        // The reveal carries the fallback armies.
        let reveal = events
            .iter()
            .find_map(|e| match &e.message {
                ServerMessage::DraftReveal {
                    white_draft,
                    black_draft,
                } => Some((white_draft.clone(), black_draft.clone())),
                _ => None,
            })
            .unwrap();
        assert_eq!(reveal.0, PlayerDraft::fallback());
        assert_eq!(reveal.1, PlayerDraft::fallback());
        let events = room.on_tick(now + 63_000);
        assert!(has_room_message(&events, |m| matches!(
            m,
            ServerMessage::PlacementStart { .. }
        )));
    }

    /// Drive a room through drafting and placement to the playing phase with tiny armies.
    fn playing_room() -> (Room, String, String, u64) {
        let (mut room, white_id, black_id, now) = drafting_room();
        room.handle_draft_submit(&white_id, selections(&[]), now);
        room.handle_draft_submit(&black_id, selections(&[]), now);
        room.on_tick(now + 3_000);
        assert_eq!(room.phase(), RoomPhase::Placement);
        // Each army is just the mandatory king.
        let white_king = room.placement.as_ref().unwrap().pool(White)[0].id;
        let black_king = room.placement.as_ref().unwrap().pool(Black)[0].id;
        room.handle_place(&white_id, white_king, sq("d1"), now + 3_100);
        let events = room.handle_place(&black_id, black_king, sq("d8"), now + 3_200);
        assert!(has_room_message(&events, |m| matches!(
            m,
            ServerMessage::GameStart { .. }
        )));
        assert_eq!(room.phase(), RoomPhase::Playing);
        (room, white_id, black_id, now + 3_300)
    }

    #[test]
    fn test_turn_ownership_enforced() {
        let (mut room, _white_id, black_id, now) = playing_room();
        let events = room.handle_move(&black_id, sq("d8"), sq("d7"), None, now);
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].audience, Audience::Sender);
        assert!(matches!(
            events[0].message,
            ServerMessage::MoveRejected {
                reason: MoveRejectReason::NotYourTurn,
                ..
            }
        ));
    }

    #[test]
    fn test_move_broadcast_and_reject() {
        let (mut room, white_id, _black_id, now) = playing_room();
        let events = room.handle_move(&white_id, sq("d1"), sq("d2"), None, now);
        assert!(has_room_message(&events, |m| matches!(
            m,
            ServerMessage::MoveMade { .. }
        )));
        // An illegal follow-up from the same player is rejected to them alone.
        let events = room.handle_move(&white_id, sq("d2"), sq("d3"), None, now);
        assert!(matches!(
            events[0].message,
            ServerMessage::MoveRejected {
                reason: MoveRejectReason::NotYourTurn,
                ..
            }
        ));
    }

    #[test]
    fn test_resign_ends_game() {
        let (mut room, white_id, _black_id, now) = playing_room();
        let events = room.handle_resign(&white_id, now);
        assert!(has_room_message(&events, |m| matches!(
            m,
            ServerMessage::GameOver { .. }
        )));
        assert_eq!(room.phase(), RoomPhase::Ended);
    }

    #[test]
    fn test_draw_offer_flow() {
        let (mut room, white_id, black_id, now) = playing_room();
        let events = room.handle_offer_draw(&white_id, now);
        assert!(has_room_message(&events, |m| matches!(
            m,
            ServerMessage::DrawOffered { .. }
        )));
        // The offerer cannot accept their own offer.
        assert!(room.handle_respond_draw(&white_id, true, now).is_empty());
        let events = room.handle_respond_draw(&black_id, true, now);
        assert!(has_room_message(&events, |m| matches!(
            m,
            ServerMessage::GameOver { .. }
        )));
    }

    #[test]
    fn test_draw_offer_cleared_by_move() {
        let (mut room, white_id, black_id, now) = playing_room();
        room.handle_offer_draw(&white_id, now);
        room.handle_move(&white_id, sq("d1"), sq("d2"), None, now);
        // The offer no longer stands.
        assert!(room.handle_respond_draw(&black_id, true, now).is_empty());
    }

    #[test]
    fn test_disconnect_grace_and_timeout() {
        let (mut room, white_id, _black_id, now) = playing_room();
        let events = room.on_disconnect(&white_id, now);
        assert!(has_room_message(&events, |m| matches!(
            m,
            ServerMessage::PlayerDisconnected {
                timeout_seconds: 60,
                ..
            }
        )));
        assert_eq!(room.next_deadline(), Some(now + 60_000));
        let events = room.on_tick(now + 60_000);
        assert!(has_room_message(&events, |m| matches!(
            m,
            ServerMessage::PlayerLeft {
                reason: LeaveReason::Timeout,
                ..
            }
        )));
        assert!(has_room_message(&events, |m| matches!(
            m,
            ServerMessage::GameOver { .. }
        )));
    }

    #[test]
    fn test_reconnect_cancels_grace_and_syncs() {
        let (mut room, white_id, _black_id, now) = playing_room();
        room.on_disconnect(&white_id, now);
        let events = room.reconnect(&white_id, now + 45_000).unwrap();
        assert!(has_room_message(&events, |m| matches!(
            m,
            ServerMessage::PlayerReconnected { .. }
        )));
        let sync = events
            .iter()
            .find(|e| e.audience == Audience::Sender)
            .expect("sync goes to the reconnecting player");
        match &sync.message {
            ServerMessage::SyncState {
                phase,
                my_color,
                game_state,
                ..
            } => {
                assert_eq!(*phase, RoomPhase::Playing);
                assert_eq!(*my_color, Some(White));
                assert!(game_state.is_some());
            }
            other => panic!("unexpected message: {other:?}"),
        }
        // The grace timer no longer fires.
        assert!(room.on_tick(now + 60_000).is_empty());
        assert_eq!(room.phase(), RoomPhase::Playing);
    }

    #[test]
    fn test_sync_hides_unrevealed_enemy_draft() {
        let (mut room, white_id, _black_id, now) = drafting_room();
        room.handle_draft_submit(&white_id, selections(&[(PieceKind::Pawn, 1)]), now);
        match room.sync_state(Some(Black)) {
            ServerMessage::SyncState {
                white_draft,
                black_draft,
                draft_state,
                ..
            } => {
                assert!(white_draft.is_none());
                assert!(black_draft.is_none());
                let ds = draft_state.unwrap();
                assert!(ds.submitted.white);
                assert!(!ds.submitted.black);
            }
            other => panic!("unexpected message: {other:?}"),
        }
        // The owner sees their own submission.
        match room.sync_state(Some(White)) {
            ServerMessage::SyncState { white_draft, .. } => assert!(white_draft.is_some()),
            other => panic!("unexpected message: {other:?}"),
        }
    }

    #[test]
    fn test_leave_during_play_forfeits() {
        let (mut room, _white_id, black_id, now) = playing_room();
        let events = room.handle_leave(&black_id, now);
        assert!(has_room_message(&events, |m| matches!(
            m,
            ServerMessage::PlayerLeft {
                reason: LeaveReason::Left,
                ..
            }
        )));
        let result = events
            .iter()
            .find_map(|e| match &e.message {
                ServerMessage::GameOver { result, .. } => Some(*result),
                _ => None,
            })
            .unwrap();
        assert_eq!(result.winner, Some(White));
    }

    #[test]
    fn test_stale_room_detection() {
        let (mut room, white_id, _b, now) = playing_room();
        room.handle_resign(&white_id, now);
        assert!(!room.is_stale(now + 10));
        assert!(room.is_stale(now + 3_600_000));
    }
}
