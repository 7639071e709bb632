/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The connection was closed.
    #[error("connection closed: {0}")]
    ConnectionClosed(String),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Receiving data failed.
    #[error("receive failed: {0}")]
    ReceiveFailed(#[source] std::io::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The peer did not finish its handshake in time.
    #[error("handshake timed out: {0}")]
    HandshakeTimeout(std::net::SocketAddr),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_handshake_timeout_display_names_peer() {
        let addr: std::net::SocketAddr = "127.0.0.1:4000".parse().unwrap();
        let err = TransportError::HandshakeTimeout(addr);
        assert_eq!(err.to_string(), "handshake timed out: 127.0.0.1:4000");
    }
}
