//! Error types for the session layer.

use playdeck_protocol::{PlayerId, ProtocolError};
use playdeck_transport::{ConnectionId, TransportError};

/// Errors returned to callers of the session layer.
///
/// These are caller-side failures, mostly commands aimed at something that
/// is already gone. Misbehaving remote peers never produce a
/// `SessionError`; see [`ProtocolViolation`].
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// A command was sent on a connection that already released its port.
    #[error("connection {0} is disconnected")]
    Disconnected(ConnectionId),

    /// A command was sent through a player whose connection has closed.
    #[error("player {0} is no longer attached to a connection")]
    PlayerDetached(PlayerId),

    /// The port could not hand the message to the transport.
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// The outbound message could not be encoded.
    #[error(transparent)]
    Protocol(#[from] ProtocolError),
}

/// Why a connection was dropped for misbehaving.
///
/// Violations are recovered locally: the connection logs the reason and
/// disconnects itself. They are never returned to the caller.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolViolation {
    /// The message had no usable `type` field.
    #[error("missing message type")]
    MissingType,

    /// `init_player` arrived without a usable `name`.
    #[error("init_player missing name")]
    MissingName,

    /// Something other than `init_player` arrived before the handshake.
    #[error("init_player must be first message")]
    InitNotFirst,

    /// `init_player` arrived after the handshake already succeeded.
    #[error("init_player can only be sent once")]
    DuplicateInit,

    /// The frame could not be decoded into a message at all.
    #[error("malformed message: {0}")]
    Malformed(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_violation_messages_match_diagnostics() {
        assert_eq!(ProtocolViolation::MissingType.to_string(), "missing message type");
        assert_eq!(ProtocolViolation::MissingName.to_string(), "init_player missing name");
        assert_eq!(
            ProtocolViolation::InitNotFirst.to_string(),
            "init_player must be first message"
        );
        assert_eq!(
            ProtocolViolation::DuplicateInit.to_string(),
            "init_player can only be sent once"
        );
    }

    #[test]
    fn test_session_error_display_names_the_target() {
        let err = SessionError::Disconnected(ConnectionId::new(3));
        assert!(err.to_string().contains("conn-3"));

        let err = SessionError::PlayerDetached(PlayerId(3));
        assert!(err.to_string().contains("P-3"));
    }
}
