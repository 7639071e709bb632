//! The per-connection handshake state machine.
//!
//! A [`Connection`] wraps one [`Port`] and validates what the remote end
//! sends. The first message must be `init_player` with a name; when it
//! arrives, the connection creates a [`Player`] and announces it on
//! [`on_player_found`](Connection::on_player_found). Anything else that
//! breaks the rules gets the connection dropped.
//!
//! ```text
//!                 init_player{name}
//!   AwaitingInit ──────────────────→ Initialized
//!        │                                │
//!        │ violation / disconnect         │ violation / disconnect
//!        ▼                                ▼
//!   Disconnected ←────────────────────────┘
//! ```
//!
//! State only moves forward. Once `Disconnected`, the port is released
//! and nothing else is ever sent.

use std::cell::{Cell, RefCell};
use std::fmt;
use std::rc::{Rc, Weak};

use playdeck_events::EventBus;
use playdeck_protocol::{INIT_PLAYER, InboundMessage, OutboundMessage};
use playdeck_transport::ConnectionId;
use serde_json::Value;

use crate::{Player, Port, ProtocolViolation, SessionError};

/// Where a connection is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConnectionState {
    /// Waiting for the `init_player` handshake.
    AwaitingInit,
    /// Handshake done; a player exists for this connection.
    Initialized,
    /// Terminal. The port has been released.
    Disconnected,
}

/// One remote player endpoint, from accept until disconnect.
pub struct Connection {
    id: ConnectionId,
    peer: String,
    port: RefCell<Option<Rc<dyn Port>>>,
    state: Cell<ConnectionState>,
    me: Weak<Connection>,

    on_disconnected: EventBus<ConnectionId>,
    on_player_found: EventBus<Rc<Player>>,
    on_message: EventBus<InboundMessage>,
}

impl Connection {
    /// Wraps a freshly accepted port.
    pub fn new(id: ConnectionId, port: impl Port + 'static) -> Rc<Self> {
        let peer = port.peer().to_owned();
        let port: Rc<dyn Port> = Rc::new(port);
        let connection = Rc::new_cyclic(|me| Self {
            id,
            peer,
            port: RefCell::new(Some(port)),
            state: Cell::new(ConnectionState::AwaitingInit),
            me: me.clone(),
            on_disconnected: EventBus::new("connection.on_disconnected"),
            on_player_found: EventBus::new("connection.on_player_found"),
            on_message: EventBus::new("connection.on_message"),
        });
        tracing::info!(conn_id = %id, peer = %connection.peer, "connection created");
        connection
    }

    /// This connection's id.
    pub fn id(&self) -> ConnectionId {
        self.id
    }

    /// The remote end, as described by the port.
    pub fn peer(&self) -> &str {
        &self.peer
    }

    /// Current lifecycle state.
    pub fn state(&self) -> ConnectionState {
        self.state.get()
    }

    /// Returns `true` once the port has been released.
    pub fn is_disconnected(&self) -> bool {
        self.state.get() == ConnectionState::Disconnected
    }

    /// Fires once, with this connection's id, when it disconnects for any
    /// reason.
    pub fn on_disconnected(&self) -> &EventBus<ConnectionId> {
        &self.on_disconnected
    }

    /// Fires once, with the new player, when the handshake succeeds.
    pub fn on_player_found(&self) -> &EventBus<Rc<Player>> {
        &self.on_player_found
    }

    /// Fires for every message accepted after the handshake. The core does
    /// not interpret these; whoever speaks the player's command dialect
    /// subscribes here.
    pub fn on_message(&self) -> &EventBus<InboundMessage> {
        &self.on_message
    }

    /// Feeds one inbound message through the state machine.
    pub fn handle_message(&self, message: InboundMessage) {
        tracing::debug!(conn_id = %self.id, ?message, "received message");

        if self.is_disconnected() {
            tracing::debug!(conn_id = %self.id, "ignoring message after disconnect");
            return;
        }

        let Some(message_type) = message.message_type() else {
            return self.reject(ProtocolViolation::MissingType);
        };

        if message_type == INIT_PLAYER {
            if self.state.get() == ConnectionState::Initialized {
                return self.reject(ProtocolViolation::DuplicateInit);
            }
            let Some(name) = message.name() else {
                return self.reject(ProtocolViolation::MissingName);
            };
            let Some(me) = self.me.upgrade() else {
                return;
            };

            // Advance before publishing so handlers see the new state.
            self.state.set(ConnectionState::Initialized);
            let player = Player::new(&me, name);
            tracing::info!(conn_id = %self.id, player_id = %player.id(), name, "player found");
            self.on_player_found.publish(&player);
            return;
        }

        if self.state.get() == ConnectionState::AwaitingInit {
            return self.reject(ProtocolViolation::InitNotFirst);
        }

        self.on_message.publish(&message);
    }

    /// Handles the transport reporting that the peer went away.
    ///
    /// Publishes [`on_disconnected`](Self::on_disconnected) unless the
    /// connection was already disconnected.
    pub fn handle_disconnect(&self) {
        if self.release_port().is_none() {
            tracing::debug!(conn_id = %self.id, "disconnect signal after teardown");
            return;
        }
        tracing::info!(conn_id = %self.id, peer = %self.peer, "port disconnected");
        self.on_disconnected.publish(&self.id);
    }

    /// Closes the connection from our side.
    ///
    /// Asks the transport to close, then publishes
    /// [`on_disconnected`](Self::on_disconnected). Calling this on a
    /// connection that is already disconnected does nothing.
    pub fn disconnect(&self) {
        let Some(port) = self.release_port() else {
            tracing::debug!(conn_id = %self.id, "already disconnected");
            return;
        };
        tracing::info!(conn_id = %self.id, peer = %self.peer, "disconnecting port");
        port.disconnect();
        self.on_disconnected.publish(&self.id);
    }

    /// Drops the connection for breaking the protocol.
    ///
    /// Logs the violation and disconnects. The host also calls this for
    /// frames it could not decode.
    pub fn reject(&self, violation: ProtocolViolation) {
        tracing::warn!(
            conn_id = %self.id,
            peer = %self.peer,
            %violation,
            "invalid message, dropping connection"
        );
        self.disconnect();
    }

    /// Sends `{type: "command", command, args}` to the remote end.
    ///
    /// # Errors
    /// Returns [`SessionError::Disconnected`] if the port has already been
    /// released, or whatever the port reports if it can't queue the
    /// message.
    pub fn send_command(&self, command: &str, args: Option<Value>) -> Result<(), SessionError> {
        // Clone the port out so no borrow is held while it runs.
        let port = self
            .port
            .borrow()
            .clone()
            .ok_or(SessionError::Disconnected(self.id))?;
        tracing::debug!(conn_id = %self.id, command, ?args, "sending command");
        port.post_message(&OutboundMessage::command(command, args))
    }

    /// Moves to `Disconnected` and hands back the port, or `None` if that
    /// already happened.
    fn release_port(&self) -> Option<Rc<dyn Port>> {
        self.state.set(ConnectionState::Disconnected);
        self.port.borrow_mut().take()
    }
}

impl fmt::Debug for Connection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer", &self.peer)
            .field("state", &self.state.get())
            .finish_non_exhaustive()
    }
}

// =========================================================================
// Tests
// =========================================================================
