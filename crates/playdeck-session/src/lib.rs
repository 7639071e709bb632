//! Player connection lifecycle for Playdeck.
//!
//! This crate turns a raw port into a logical player:
//!
//! 1. **Port**: the synchronous sending side of one transport connection
//!    ([`Port`] trait, [`MemoryPort`] for in-process use)
//! 2. **Handshake**: validating that the first message is a well-formed
//!    `init_player` ([`Connection`], [`ConnectionState`])
//! 3. **Player**: the handle callers use to command the remote endpoint
//!    once the handshake succeeded ([`Player`])
//!
//! # How it fits in the stack
//!
//! ```text
//! Roster (above)  ← listens for player found / disconnected events
//!     ↕
//! Session (this crate)  ← handshake state machine, player handles
//!     ↕
//! Protocol (below)  ← InboundMessage / OutboundMessage
//! ```
//!
//! Everything here is single-threaded: handlers run synchronously inside
//! the call that triggered them, and no locks are taken.

mod connection;
mod error;
mod player;
mod port;

pub use connection::{Connection, ConnectionState};
pub use error::{ProtocolViolation, SessionError};
pub use player::{PlaybackState, Player};
pub use port::{MemoryPort, Port};
