//! Wire protocol for Playdeck.
//!
//! This crate defines the messages that travel between the controller and
//! a remote player endpoint:
//!
//! - **Types** ([`InboundMessage`], [`OutboundMessage`], [`PlayerId`]):
//!   the records that travel on the wire.
//! - **Codec** ([`Codec`] trait, [`JsonCodec`]): how those records
//!   are converted to/from bytes.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between transport (raw bytes) and session
//! (handshake state machine). It doesn't decide whether a message is
//! allowed at a given moment; it only knows how to read and write them.
//!
//! ```text
//! Transport (bytes) → Protocol (InboundMessage) → Session (Connection, Player)
//! ```

mod codec;
mod error;
mod types;

pub use codec::{Codec, JsonCodec};
pub use error::ProtocolError;
pub use types::{
    InboundMessage, OutboundMessage, PlayerId, COMMAND_PAUSE, COMMAND_PLAY,
    INIT_PLAYER,
};
