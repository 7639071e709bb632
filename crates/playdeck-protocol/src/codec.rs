//! Codec trait and implementations for serializing/deserializing messages.
//!
//! A "codec" (coder/decoder) converts between Rust types and raw bytes.
//! Player endpoints speak JSON, so [`JsonCodec`] is the only
//! implementation, but the host is written against the [`Codec`] trait.

use serde::{Serialize, de::DeserializeOwned};

use crate::ProtocolError;

/// A codec that can encode Rust types to bytes and decode bytes back.
///
/// `Send + Sync + 'static` because the codec is moved into the tasks that
/// own a socket's outbound queue.
pub trait Codec: Send + Sync + 'static {
    /// Serializes a value into bytes.
    ///
    /// # Errors
    /// Returns `ProtocolError::Encode` if serialization fails.
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError>;

    /// Deserializes bytes back into a value.
    ///
    /// # Errors
    /// Returns `ProtocolError::Decode` if the bytes are malformed,
    /// incomplete, or don't match the expected type.
    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError>;
}

/// A [`Codec`] that uses JSON (via `serde_json`).
///
/// ## Example
///
/// ```rust
/// use playdeck_protocol::{Codec, InboundMessage, JsonCodec, OutboundMessage};
///
/// let codec = JsonCodec;
///
/// let bytes = codec.encode(&OutboundMessage::command("play", None)).unwrap();
/// assert_eq!(bytes, br#"{"type":"command","command":"play","args":null}"#);
///
/// let msg: InboundMessage = codec.decode(br#"{"type":"init_player","name":"Alice"}"#).unwrap();
/// assert_eq!(msg.name(), Some("Alice"));
/// ```
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl Codec for JsonCodec {
    fn encode<T: Serialize>(&self, value: &T) -> Result<Vec<u8>, ProtocolError> {
        serde_json::to_vec(value).map_err(ProtocolError::Encode)
    }

    fn decode<T: DeserializeOwned>(&self, data: &[u8]) -> Result<T, ProtocolError> {
        serde_json::from_slice(data).map_err(ProtocolError::Decode)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{InboundMessage, OutboundMessage};

    #[test]
    fn test_decode_non_object_returns_decode_error() {
        let result: Result<InboundMessage, _> = JsonCodec.decode(b"[1, 2, 3]");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_decode_garbage_returns_decode_error() {
        let result: Result<InboundMessage, _> = JsonCodec.decode(b"not json");
        assert!(matches!(result, Err(ProtocolError::Decode(_))));
    }

    #[test]
    fn test_encode_command_with_args() {
        let msg = OutboundMessage::command(
            "seek",
            Some(serde_json::json!({ "position": 42 })),
        );
        let bytes = JsonCodec.encode(&msg).unwrap();
        let value: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(value["type"], "command");
        assert_eq!(value["command"], "seek");
        assert_eq!(value["args"]["position"], 42);
    }
}
