//! The sending half of a transport connection, as seen by the core.
//!
//! The transport itself is async and lives on other tasks. The handshake
//! state machine is synchronous, so it talks to the transport through a
//! [`Port`]: a handle that queues outbound messages and close requests
//! without waiting for them to hit the wire.

use std::cell::RefCell;
use std::rc::Rc;

use playdeck_protocol::OutboundMessage;

use crate::SessionError;

/// Synchronous handle to one transport connection.
///
/// A port is exclusively owned by its [`Connection`](crate::Connection);
/// nothing else writes to it.
pub trait Port {
    /// Hands a message to the transport for delivery.
    ///
    /// # Errors
    /// Returns [`SessionError::Transport`] if the transport is gone, or
    /// [`SessionError::Protocol`] if the message can't be encoded.
    fn post_message(&self, message: &OutboundMessage) -> Result<(), SessionError>;

    /// Asks the transport to close the connection.
    fn disconnect(&self);

    /// Human-readable description of the remote end, for logs.
    fn peer(&self) -> &str;
}

#[derive(Debug, Default)]
struct MemoryPortLog {
    sent: Vec<OutboundMessage>,
    disconnects: usize,
}

/// An in-process [`Port`] that records what was sent to it.
///
/// Clones share the same log, so keep one clone to inspect while the
/// connection owns the other. Useful for embedding the core without a
/// network, and in tests.
#[derive(Debug, Clone, Default)]
pub struct MemoryPort {
    log: Rc<RefCell<MemoryPortLog>>,
}

impl MemoryPort {
    /// Creates a port with an empty log.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every message posted so far, oldest first.
    pub fn sent(&self) -> Vec<OutboundMessage> {
        self.log.borrow().sent.clone()
    }

    /// How many times `disconnect` was called.
    pub fn disconnect_count(&self) -> usize {
        self.log.borrow().disconnects
    }
}

impl Port for MemoryPort {
    fn post_message(&self, message: &OutboundMessage) -> Result<(), SessionError> {
        self.log.borrow_mut().sent.push(message.clone());
        Ok(())
    }

    fn disconnect(&self) {
        self.log.borrow_mut().disconnects += 1;
    }

    fn peer(&self) -> &str {
        "memory"
    }
}
