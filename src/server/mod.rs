//! The authoritative multiplayer session core: rooms, the directory that allocates them,
//! the dispatcher that binds transport connections to players, and the timer runtime.
//!
//! The session layer never interprets moves itself; it trusts the rules engine's verdicts
//! and only decides who may submit what, when, and who hears about it.

pub mod deps;
pub mod directory;
pub mod dispatcher;
pub mod messages;
pub mod room;
pub mod runtime;
