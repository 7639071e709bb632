//! Transport abstraction layer for Playdeck.
//!
//! Provides the [`Transport`] and [`Connection`] traits that abstract over
//! the channel a remote player endpoint uses to reach the controller. The
//! transport only moves framed messages and reports when a peer goes away;
//! it knows nothing about handshakes or players.
//!
//! # Feature Flags
//!
//! - `websocket` (default): WebSocket transport via `tokio-tungstenite`

#![allow(async_fn_in_trait)]

mod error;
#[cfg(feature = "websocket")]
mod websocket;

pub use error::TransportError;
#[cfg(feature = "websocket")]
pub use websocket::{HANDSHAKE_TIMEOUT, WebSocketConnection, WebSocketHandshake, WebSocketTransport};

use std::fmt;
use std::net::SocketAddr;

/// Opaque identifier for a connection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConnectionId(u64);

impl ConnectionId {
    /// Creates a new `ConnectionId` from a raw `u64`.
    pub fn new(id: u64) -> Self {
        Self(id)
    }

    /// Returns the underlying `u64` value.
    pub fn into_inner(self) -> u64 {
        self.0
    }
}

impl fmt::Display for ConnectionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "conn-{}", self.0)
    }
}

/// Accepts new incoming connections.
///
/// Accepting is split in two: [`accept`](Self::accept) returns as soon as a
/// peer shows up, and the returned [`Handshake`] finishes the
/// protocol-level setup. A peer that stalls mid-handshake then only stalls
/// itself.
pub trait Transport: Send + Sync + 'static {
    /// A peer that still has to complete its handshake.
    type Handshake: Handshake<Connection = Self::Connection, Error = Self::Error>;
    /// The connection type produced by this transport.
    type Connection: Connection;
    /// The error type for transport operations.
    type Error: std::error::Error + Send + Sync;

    /// Waits for the next incoming peer.
    async fn accept(&mut self) -> Result<Self::Handshake, Self::Error>;

    /// Returns the address the transport is listening on.
    fn local_addr(&self) -> std::io::Result<SocketAddr>;
}

/// An accepted peer whose handshake has not run yet.
pub trait Handshake: Send + 'static {
    /// The connection produced on success.
    type Connection: Connection;
    /// The error type for a failed handshake.
    type Error: std::error::Error + Send + Sync;

    /// Runs the handshake and yields the ready connection.
    async fn complete(self) -> Result<Self::Connection, Self::Error>;

    /// Returns the address of the remote peer.
    fn peer_addr(&self) -> SocketAddr;
}

/// A single connection that can send and receive framed messages.
///
/// Sending and receiving may happen concurrently from different tasks:
/// a reader can sit in [`recv`](Self::recv) while a writer calls
/// [`send`](Self::send) on the same connection.
pub trait Connection: Send + Sync + 'static {
    /// The error type for connection operations.
    type Error: std::error::Error + Send + Sync;

    /// Sends data to the remote peer.
    async fn send(&self, data: &[u8]) -> Result<(), Self::Error>;

    /// Receives the next message from the remote peer.
    ///
    /// Returns `Ok(None)` when the connection is cleanly closed.
    async fn recv(&self) -> Result<Option<Vec<u8>>, Self::Error>;

    /// Closes the connection.
    async fn close(&self) -> Result<(), Self::Error>;

    /// Returns the unique identifier for this connection.
    fn id(&self) -> ConnectionId;

    /// Returns the address of the remote peer.
    fn peer_addr(&self) -> SocketAddr;
}
