//! Unified error type for Playdeck.

use playdeck_protocol::ProtocolError;
use playdeck_session::SessionError;
use playdeck_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum PlaydeckError {
    /// A transport-level error (bind, accept, send, recv).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A session-level error (command on a closed connection or player).
    #[error(transparent)]
    Session(#[from] SessionError),

    /// Setting up logging failed.
    #[error("logging setup failed: {0}")]
    Logging(String),
}
