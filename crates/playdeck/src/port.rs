//! Bridges the synchronous [`Port`] the core talks to and the async
//! socket tasks that own the real connection.

use playdeck_protocol::{Codec, OutboundMessage};
use playdeck_session::{Port, SessionError};
use playdeck_transport::TransportError;
use tokio::sync::mpsc;

/// What a socket's writer task should do next.
#[derive(Debug)]
pub(crate) enum PortCommand {
    /// Write one encoded frame.
    Send(Vec<u8>),
    /// Close the socket and stop.
    Close,
}

/// A [`Port`] that queues encoded frames for a socket writer task.
///
/// Posting never waits: the frame goes into an unbounded channel and the
/// writer task drains it in order.
pub(crate) struct ChannelPort<C: Codec> {
    peer: String,
    codec: C,
    outbound: mpsc::UnboundedSender<PortCommand>,
}

impl<C: Codec> ChannelPort<C> {
    pub(crate) fn new(
        peer: String,
        codec: C,
        outbound: mpsc::UnboundedSender<PortCommand>,
    ) -> Self {
        Self {
            peer,
            codec,
            outbound,
        }
    }
}

impl<C: Codec> Port for ChannelPort<C> {
    fn post_message(&self, message: &OutboundMessage) -> Result<(), SessionError> {
        let bytes = self.codec.encode(message)?;
        self.outbound
            .send(PortCommand::Send(bytes))
            .map_err(|_| TransportError::ConnectionClosed(self.peer.clone()))?;
        Ok(())
    }

    fn disconnect(&self) {
        // The writer may already be gone; then the socket is closed anyway.
        let _ = self.outbound.send(PortCommand::Close);
    }

    fn peer(&self) -> &str {
        &self.peer
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use playdeck_protocol::JsonCodec;

    fn port() -> (ChannelPort<JsonCodec>, mpsc::UnboundedReceiver<PortCommand>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (ChannelPort::new("127.0.0.1:5555".into(), JsonCodec, tx), rx)
    }

    #[test]
    fn test_post_message_queues_encoded_frame() {
        let (port, mut rx) = port();

        port.post_message(&OutboundMessage::command("play", None))
            .unwrap();

        match rx.try_recv() {
            Ok(PortCommand::Send(bytes)) => assert_eq!(
                bytes,
                br#"{"type":"command","command":"play","args":null}"#
            ),
            other => panic!("expected a frame, got {other:?}"),
        }
    }

    #[test]
    fn test_disconnect_queues_close() {
        let (port, mut rx) = port();

        port.disconnect();

        assert!(matches!(rx.try_recv(), Ok(PortCommand::Close)));
    }

    #[test]
    fn test_post_message_after_writer_gone_returns_transport_error() {
        let (port, rx) = port();
        drop(rx);

        let result = port.post_message(&OutboundMessage::command("pause", None));

        assert!(matches!(
            result,
            Err(SessionError::Transport(TransportError::ConnectionClosed(_)))
        ));
    }

    #[test]
    fn test_disconnect_after_writer_gone_is_silent() {
        let (port, rx) = port();
        drop(rx);

        port.disconnect();
        assert_eq!(port.peer(), "127.0.0.1:5555");
    }
}
