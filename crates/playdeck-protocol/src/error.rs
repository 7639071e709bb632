//! Error types for the protocol layer.

/// Errors that can occur in the protocol layer.
///
/// These are codec failures. Messages that decode fine but arrive at the
/// wrong moment are not errors here; the session layer treats those as
/// protocol violations and drops the connection.
#[derive(Debug, thiserror::Error)]
pub enum ProtocolError {
    /// Serialization failed (turning a Rust type into bytes).
    #[error("encode failed: {0}")]
    Encode(serde_json::Error),

    /// Deserialization failed (turning bytes into a Rust type).
    ///
    /// Common causes: malformed JSON, or a frame that is valid JSON but
    /// not an object.
    #[error("decode failed: {0}")]
    Decode(serde_json::Error),
}
