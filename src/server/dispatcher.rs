//! Binds one transport connection to at most one (room, player) pair and routes inbound
//! messages to the owning room. The dispatcher holds no game state of its own; it decodes,
//! routes, and fans the room's outgoing messages back through the transport.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use tracing::warn;

use crate::server::deps::{ConnectionId, Deps};
use crate::server::directory::{lock_room, normalize_code, RoomDirectory};
use crate::server::messages::{ClientMessage, Envelope, RoomErrorKind, ServerMessage};
use crate::server::room::{Audience, Outgoing, Room, RoomError, RoomSettings};

/// The (room, player) pair a connection is bound to.
#[derive(Debug, Clone)]
struct Binding {
    room_code: String,
    player_id: String,
}

/// One dispatcher per transport connection.
pub struct SessionDispatcher {
    directory: Arc<RoomDirectory>,
    deps: Deps,
    binding: Option<Binding>,
}

impl SessionDispatcher {
    pub fn new(directory: Arc<RoomDirectory>, deps: Deps) -> Self {
        Self {
            directory,
            deps,
            binding: None,
        }
    }

    /// The player id this connection is bound to, if any.
    pub fn player_id(&self) -> Option<&str> {
        self.binding.as_ref().map(|b| b.player_id.as_str())
    }

    /// The room code this connection is bound to, if any.
    pub fn room_code(&self) -> Option<&str> {
        self.binding.as_ref().map(|b| b.room_code.as_str())
    }

    /// Decode and handle one raw frame. Malformed frames are dropped with an error back to
    /// the sender.
    pub fn handle_text(&mut self, conn: ConnectionId, text: &str) {
        match serde_json::from_str::<Envelope<ClientMessage>>(text) {
            Ok(envelope) => self.handle_message(conn, envelope.msg),
            Err(err) => {
                warn!(%conn, %err, "dropping malformed message");
                self.send(
                    conn,
                    ServerMessage::RoomError {
                        error: RoomErrorKind::InvalidCode,
                        message: "malformed message".into(),
                    },
                );
            }
        }
    }

    /// Route one decoded message.
    pub fn handle_message(&mut self, conn: ConnectionId, msg: ClientMessage) {
        match msg {
            ClientMessage::CreateRoom {
                player_name,
                settings,
            } => self.create_room(conn, &player_name, settings),
            ClientMessage::JoinRoom {
                room_code,
                player_name,
            } => self.join_room(conn, &room_code, &player_name),
            ClientMessage::Reconnect {
                room_code,
                player_id,
            } => self.reconnect(conn, &room_code, &player_id),
            ClientMessage::Ping => {
                let now = self.deps.now();
                self.send(conn, ServerMessage::Pong { server_time: now });
            }
            ClientMessage::LeaveRoom => {
                self.with_room(conn, |room, player_id, now| room.handle_leave(player_id, now));
                self.binding = None;
            }
            ClientMessage::DraftSubmit { draft } => {
                self.with_room(conn, |room, player_id, now| {
                    room.handle_draft_submit(player_id, draft, now)
                });
            }
            ClientMessage::PlacePiece { piece_id, position } => {
                self.with_room(conn, |room, player_id, now| {
                    room.handle_place(player_id, piece_id, position, now)
                });
            }
            ClientMessage::MakeMove {
                from,
                to,
                promotion_piece_type,
            } => {
                self.with_room(conn, |room, player_id, now| {
                    room.handle_move(player_id, from, to, promotion_piece_type, now)
                });
            }
            ClientMessage::OfferDraw => {
                self.with_room(conn, |room, player_id, now| {
                    room.handle_offer_draw(player_id, now)
                });
            }
            ClientMessage::RespondDraw { accept } => {
                self.with_room(conn, |room, player_id, now| {
                    room.handle_respond_draw(player_id, accept, now)
                });
            }
            ClientMessage::Resign => {
                self.with_room(conn, |room, player_id, now| room.handle_resign(player_id, now));
            }
        }
    }

    /// The transport closed this connection.
    pub fn on_close(&mut self, conn: ConnectionId) {
        self.with_room(conn, |room, player_id, now| room.on_disconnect(player_id, now));
        self.binding = None;
    }

    fn create_room(&mut self, conn: ConnectionId, player_name: &str, settings: RoomSettings) {
        let now = self.deps.now();
        let result = {
            let mut rng = self.lock_rng();
            self.directory.create_room(settings, &mut **rng, now)
        };
        let (code, handle) = match result {
            Ok(pair) => pair,
            Err(err) => return self.send_room_error(conn, err),
        };
        let join = {
            let mut rng = self.lock_rng();
            let mut room = lock_room(&handle);
            room.join(player_name, &mut **rng, now)
        };
        match join {
            Ok(outcome) => {
                self.binding = Some(Binding {
                    room_code: code.clone(),
                    player_id: outcome.player_id.clone(),
                });
                self.send(
                    conn,
                    ServerMessage::RoomCreated {
                        room_code: code.clone(),
                        player_id: outcome.player_id,
                        role: outcome.color,
                        settings,
                    },
                );
                self.dispatch(conn, &code, outcome.events);
            }
            Err(err) => self.send_room_error(conn, err),
        }
    }

    fn join_room(&mut self, conn: ConnectionId, raw_code: &str, player_name: &str) {
        let now = self.deps.now();
        let code = match normalize_code(raw_code) {
            Ok(code) => code,
            Err(err) => return self.send_room_error(conn, err),
        };
        let Some(handle) = self.directory.get(&code) else {
            return self.send_room_error(conn, RoomError::NotFound(code));
        };
        let join = {
            let mut rng = self.lock_rng();
            let mut room = lock_room(&handle);
            room.join(player_name, &mut **rng, now)
        };
        match join {
            Ok(outcome) => {
                self.binding = Some(Binding {
                    room_code: code.clone(),
                    player_id: outcome.player_id.clone(),
                });
                let (settings, players, phase) = {
                    let room = lock_room(&handle);
                    (*room.settings(), room.players(), room.phase())
                };
                self.send(
                    conn,
                    ServerMessage::RoomJoined {
                        room_code: code.clone(),
                        player_id: outcome.player_id,
                        role: outcome.color,
                        settings,
                        players,
                        phase,
                    },
                );
                self.dispatch(conn, &code, outcome.events);
            }
            Err(err) => self.send_room_error(conn, err),
        }
    }

    fn reconnect(&mut self, conn: ConnectionId, raw_code: &str, player_id: &str) {
        let now = self.deps.now();
        let code = match normalize_code(raw_code) {
            Ok(code) => code,
            Err(err) => return self.send_room_error(conn, err),
        };
        let Some(handle) = self.directory.get(&code) else {
            return self.send_room_error(conn, RoomError::NotFound(code));
        };
        let result = {
            let mut room = lock_room(&handle);
            room.reconnect(player_id, now)
        };
        match result {
            Ok(events) => {
                self.binding = Some(Binding {
                    room_code: code.clone(),
                    player_id: player_id.to_string(),
                });
                self.dispatch(conn, &code, events);
            }
            Err(err) => self.send_room_error(conn, err),
        }
    }

    /// Run a handler against the bound room, shielding the room from handler panics: a
    /// panicking room is terminated rather than left corrupt.
    fn with_room<F>(&mut self, conn: ConnectionId, f: F)
    where
        F: FnOnce(&mut Room, &str, u64) -> Vec<Outgoing>,
    {
        let Some(binding) = self.binding.clone() else {
            return self.send(
                conn,
                ServerMessage::RoomError {
                    error: RoomErrorKind::NotFound,
                    message: "connection is not bound to a room".into(),
                },
            );
        };
        let Some(handle) = self.directory.get(&binding.room_code) else {
            return self.send_room_error(conn, RoomError::NotFound(binding.room_code));
        };
        let now = self.deps.now();
        let events = {
            let mut room = lock_room(&handle);
            match catch_unwind(AssertUnwindSafe(|| f(&mut room, &binding.player_id, now))) {
                Ok(events) => events,
                Err(_) => room.fail("handler panicked"),
            }
        };
        self.dispatch(conn, &binding.room_code, events);
    }

    /// Fan outgoing messages to their audiences.
    fn dispatch(&self, conn: ConnectionId, room_code: &str, events: Vec<Outgoing>) {
        let now = self.deps.now();
        for event in events {
            let envelope = Envelope::new(now, event.message);
            match event.audience {
                Audience::Sender => self.deps.transport.send_to_connection(conn, &envelope),
                Audience::Room => self.deps.transport.broadcast_to_room(room_code, &envelope),
            }
        }
    }

    fn send(&self, conn: ConnectionId, message: ServerMessage) {
        let envelope = Envelope::new(self.deps.now(), message);
        self.deps.transport.send_to_connection(conn, &envelope);
    }

    fn send_room_error(&self, conn: ConnectionId, err: RoomError) {
        self.send(
            conn,
            ServerMessage::RoomError {
                error: err.kind(),
                message: err.to_string(),
            },
        );
    }

    fn lock_rng(&self) -> std::sync::MutexGuard<'_, Box<dyn rand::RngCore + Send>> {
        match self.deps.rng.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}
