//! Protocol types for the player wire format.
//!
//! Inbound traffic is deliberately loose: a player may send any JSON
//! object, and the only fields the controller reads are `type` and, for
//! the handshake, `name`. Everything else rides along untouched so it can
//! be handed to whatever interprets post-handshake messages.
//!
//! Outbound traffic is a closed set: the controller only ever sends
//! commands.

use std::fmt;

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// The handshake message type. Must be the first message a player sends.
pub const INIT_PLAYER: &str = "init_player";

/// Command name that asks the remote player to start playback.
pub const COMMAND_PLAY: &str = "play";

/// Command name that asks the remote player to pause playback.
pub const COMMAND_PAUSE: &str = "pause";

// ---------------------------------------------------------------------------
// Identity
// ---------------------------------------------------------------------------

/// A unique identifier for a player.
///
/// A player is bound 1:1 to the connection that performed its handshake,
/// so the id is derived from the connection id rather than allocated
/// separately.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PlayerId(pub u64);

impl fmt::Display for PlayerId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "P-{}", self.0)
    }
}

// ---------------------------------------------------------------------------
// InboundMessage
// ---------------------------------------------------------------------------

/// A message received from a player endpoint.
///
/// This wraps the raw JSON object. Decoding only fails when the frame is
/// not a JSON object at all; missing or oddly typed fields are reported
/// through the accessors returning `None`, and the session layer decides
/// what that means.
///
/// ```text
/// { "type": "init_player", "name": "Living room" }
/// { "type": "status", "playing": true }
/// ```
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct InboundMessage {
    fields: Map<String, Value>,
}

impl InboundMessage {
    /// Builds a message from an already-parsed JSON object.
    pub fn from_fields(fields: Map<String, Value>) -> Self {
        Self { fields }
    }

    /// Shorthand for the handshake message.
    pub fn init_player(name: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("type".into(), Value::from(INIT_PLAYER));
        fields.insert("name".into(), Value::from(name));
        Self { fields }
    }

    /// Shorthand for a message carrying only a `type`.
    pub fn of_type(message_type: &str) -> Self {
        let mut fields = Map::new();
        fields.insert("type".into(), Value::from(message_type));
        Self { fields }
    }

    /// The `type` field, if present as a non-empty string.
    pub fn message_type(&self) -> Option<&str> {
        self.non_empty_str("type")
    }

    /// The `name` field, if present as a non-empty string.
    pub fn name(&self) -> Option<&str> {
        self.non_empty_str("name")
    }

    /// Looks up any other field.
    pub fn get(&self, key: &str) -> Option<&Value> {
        self.fields.get(key)
    }

    /// The full decoded object.
    pub fn fields(&self) -> &Map<String, Value> {
        &self.fields
    }

    fn non_empty_str(&self, key: &str) -> Option<&str> {
        self.fields
            .get(key)
            .and_then(Value::as_str)
            .filter(|s| !s.is_empty())
    }
}

// ---------------------------------------------------------------------------
// OutboundMessage
// ---------------------------------------------------------------------------

/// A message the controller sends to a player endpoint.
///
/// `#[serde(tag = "type")]` produces internally tagged JSON, and `args`
/// is always written, as `null` when absent:
///
/// ```text
/// { "type": "command", "command": "play", "args": null }
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum OutboundMessage {
    /// Ask the player to do something.
    Command {
        command: String,
        args: Option<Value>,
    },
}

impl OutboundMessage {
    /// Builds a command message.
    pub fn command(command: impl Into<String>, args: Option<Value>) -> Self {
        Self::Command {
            command: command.into(),
            args,
        }
    }
}
