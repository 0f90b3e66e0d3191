//! The timer loop: a background thread that sleeps until the earliest room deadline, fires
//! due timers, broadcasts the resulting events, and periodically sweeps stale rooms.

use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Duration;

use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender};
use tracing::{info, warn};

use crate::server::deps::Deps;
use crate::server::directory::{lock_room, RoomDirectory};
use crate::server::messages::Envelope;
use crate::server::room::{Audience, Outgoing};

/// How often stale rooms are reaped.
const SWEEP_INTERVAL_MS: u64 = 300_000;
/// Upper bound on one sleep, so sweeps and newly armed timers are never starved.
const MAX_IDLE_MS: u64 = 1_000;

/// Handle to the running timer thread. Dropping it without calling
/// [`ServerRuntime::shutdown`] detaches the thread.
pub struct ServerRuntime {
    stop: Sender<()>,
    handle: Option<JoinHandle<()>>,
}

impl ServerRuntime {
    /// Spawn the timer loop over the given directory.
    pub fn start(directory: Arc<RoomDirectory>, deps: Deps) -> Self {
        let (stop, stop_rx) = bounded::<()>(1);
        let handle = std::thread::spawn(move || run_loop(directory, deps, stop_rx));
        Self {
            stop,
            handle: Some(handle),
        }
    }

    /// Stop the loop and wait for it to exit.
    pub fn shutdown(mut self) {
        let _ = self.stop.send(());
        if let Some(handle) = self.handle.take() {
            let _ = handle.join();
        }
    }
}

fn run_loop(directory: Arc<RoomDirectory>, deps: Deps, stop: Receiver<()>) {
    info!("room timer loop started");
    let mut next_sweep = deps.now() + SWEEP_INTERVAL_MS;
    loop {
        let now = deps.now();
        let wait_ms = directory
            .next_deadline()
            .map(|d| d.saturating_sub(now))
            .unwrap_or(MAX_IDLE_MS)
            .min(MAX_IDLE_MS);
        match stop.recv_timeout(Duration::from_millis(wait_ms)) {
            Ok(()) | Err(RecvTimeoutError::Disconnected) => break,
            Err(RecvTimeoutError::Timeout) => {}
        }

        let now = deps.now();
        for handle in directory.all() {
            let (code, events) = {
                let mut room = lock_room(&handle);
                if room.next_deadline().is_none_or(|d| d > now) {
                    continue;
                }
                let code = room.code().to_string();
                let events =
                    match catch_unwind(AssertUnwindSafe(|| room.on_tick(now))) {
                        Ok(events) => events,
                        Err(_) => room.fail("timer handler panicked"),
                    };
                (code, events)
            };
            broadcast_events(&deps, &code, events);
        }

        if now >= next_sweep {
            next_sweep = now + SWEEP_INTERVAL_MS;
            let evicted = directory.sweep(now);
            if evicted > 0 {
                info!(evicted, "sweep complete");
            }
        }
    }
    info!("room timer loop stopped");
}

/// Timer-driven events have no originating sender; anything room-wide is broadcast and
/// anything else has nowhere to go.
fn broadcast_events(deps: &Deps, code: &str, events: Vec<Outgoing>) {
    let now = deps.now();
    for event in events {
        match event.audience {
            Audience::Room => {
                let envelope = Envelope::new(now, event.message);
                deps.transport.broadcast_to_room(code, &envelope);
            }
            Audience::Sender => {
                warn!(room = %code, "dropping sender-addressed event from timer context");
            }
        }
    }
}
