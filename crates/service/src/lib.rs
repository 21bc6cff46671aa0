//! The roster: the authoritative mapping from username to a connected
//! participant's outbound handle and published public key.
//!
//! This crate knows nothing about sockets or TLS. It is generic over the
//! outbound handle type `O` the caller uses to reach a connection (in the
//! server binary, an `mpsc::UnboundedSender<Frame>`), so that actual async
//! I/O stays in the crate that owns the runtime.

pub mod roster;

pub use roster::{JoinFanout, LeaveFanout, Roster, RosterError};
