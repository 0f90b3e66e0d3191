//! Injected dependencies of the session core: a clock, a random source and a message
//! transport. Nothing in the server reaches for process globals.

use std::sync::{Arc, Mutex};
use std::time::{SystemTime, UNIX_EPOCH};

use rand::RngCore;

use crate::server::messages::{Envelope, ServerMessage};

/// An opaque identifier for one transport connection.
pub type ConnectionId = u64;

/// Milliseconds since the Unix epoch.
pub type Timestamp = u64;

/// The session core's view of time.
pub trait Clock: Send + Sync {
    fn now(&self) -> Timestamp;
}

/// Wall-clock time.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> Timestamp {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_millis() as u64)
            .unwrap_or(0)
    }
}

/// Outbound message delivery. The core never sees the wire format beyond these two
/// primitives; it hands over typed envelopes and the transport encodes them.
pub trait Transport: Send + Sync {
    /// Deliver a message to a single connection.
    fn send_to_connection(&self, conn: ConnectionId, msg: &Envelope<ServerMessage>);

    /// Deliver a message to every player in the given room.
    fn broadcast_to_room(&self, room_code: &str, msg: &Envelope<ServerMessage>);
}

/// The bundle of external collaborators threaded through the session layer.
#[derive(Clone)]
pub struct Deps {
    pub clock: Arc<dyn Clock>,
    pub transport: Arc<dyn Transport>,
    pub rng: Arc<Mutex<Box<dyn RngCore + Send>>>,
}

impl Deps {
    pub fn new(
        clock: Arc<dyn Clock>,
        transport: Arc<dyn Transport>,
        rng: Box<dyn RngCore + Send>,
    ) -> Self {
        Self {
            clock,
            transport,
            rng: Arc::new(Mutex::new(rng)),
        }
    }

    pub fn now(&self) -> Timestamp {
        self.clock.now()
    }
}
