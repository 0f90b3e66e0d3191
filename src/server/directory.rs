//! Allocation and lookup of rooms by code. The map is lock-protected so lookups are atomic
//! with insertions and removals; each room is further wrapped in its own lock, which is
//! what serializes all mutation of a single room.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use rand::RngCore;
use tracing::info;

use crate::server::deps::Timestamp;
use crate::server::room::{Room, RoomError, RoomSettings};

/// Room codes avoid visually ambiguous glyphs (no I, L, O, 0, 1).
pub const CODE_ALPHABET: &[u8] = b"ABCDEFGHJKMNPQRSTUVWXYZ23456789";

/// Length of a room code.
pub const CODE_LEN: usize = 6;

/// How many collisions to tolerate before giving up on allocation.
const MAX_CODE_ATTEMPTS: usize = 100;

pub type RoomHandle = Arc<Mutex<Room>>;

/// The registry of live rooms.
#[derive(Default)]
pub struct RoomDirectory {
    rooms: Mutex<HashMap<String, RoomHandle>>,
}

impl RoomDirectory {
    pub fn new() -> Self {
        Self::default()
    }

    /// Allocate a fresh code and create a room. Collisions are retried a bounded number of
    /// times; running out is an allocation failure, not a panic.
    pub fn create_room(
        &self,
        settings: RoomSettings,
        rng: &mut dyn RngCore,
        now: Timestamp,
    ) -> Result<(String, RoomHandle), RoomError> {
        let mut rooms = self.lock_rooms();
        for _ in 0..MAX_CODE_ATTEMPTS {
            let code = generate_code(rng);
            if rooms.contains_key(&code) {
                continue;
            }
            let handle = Arc::new(Mutex::new(Room::new(code.clone(), settings, now)));
            rooms.insert(code.clone(), handle.clone());
            info!(room = %code, "room created");
            return Ok((code, handle));
        }
        Err(RoomError::CodesExhausted)
    }

    /// Look up a room by its (normalized) code.
    pub fn get(&self, code: &str) -> Option<RoomHandle> {
        self.lock_rooms().get(code).cloned()
    }

    pub fn remove(&self, code: &str) {
        self.lock_rooms().remove(code);
    }

    /// Snapshot of every live room handle, for the timer loop.
    pub fn all(&self) -> Vec<RoomHandle> {
        self.lock_rooms().values().cloned().collect()
    }

    /// The earliest timer deadline across all rooms.
    pub fn next_deadline(&self) -> Option<Timestamp> {
        self.all()
            .iter()
            .filter_map(|handle| lock_room(handle).next_deadline())
            .min()
    }

    /// Evict ended rooms with no recent activity. Returns how many were reaped.
    pub fn sweep(&self, now: Timestamp) -> usize {
        let mut rooms = self.lock_rooms();
        let stale: Vec<String> = rooms
            .iter()
            .filter(|(_, handle)| lock_room(handle).is_stale(now))
            .map(|(code, _)| code.clone())
            .collect();
        for code in &stale {
            rooms.remove(code);
            info!(room = %code, "stale room evicted");
        }
        stale.len()
    }

    pub fn len(&self) -> usize {
        self.lock_rooms().len()
    }

    pub fn is_empty(&self) -> bool {
        self.lock_rooms().is_empty()
    }

    fn lock_rooms(&self) -> MutexGuard<'_, HashMap<String, RoomHandle>> {
        match self.rooms.lock() {
            Ok(guard) => guard,
            Err(poisoned) => poisoned.into_inner(),
        }
    }
}

/// Lock a room handle, recovering from a poisoned lock (a panicking handler must not take
/// the whole directory down with it).
pub fn lock_room(handle: &RoomHandle) -> MutexGuard<'_, Room> {
    match handle.lock() {
        Ok(guard) => guard,
        Err(poisoned) => poisoned.into_inner(),
    }
}

/// Draw a 6-character code from the unambiguous alphabet.
pub fn generate_code(rng: &mut dyn RngCore) -> String {
    (0..CODE_LEN)
        .map(|_| {
            let i = (rng.next_u32() as usize) % CODE_ALPHABET.len();
            CODE_ALPHABET[i] as char
        })
        .collect()
}

/// Uppercase and validate a client-supplied room code.
pub fn normalize_code(input: &str) -> Result<String, RoomError> {
    let code = input.trim().to_ascii_uppercase();
    if code.len() != CODE_LEN || !code.bytes().all(|b| CODE_ALPHABET.contains(&b)) {
        return Err(RoomError::InvalidCode(input.to_string()));
    }
    Ok(code)
}
