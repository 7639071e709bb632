//! # Playdeck
//!
//! A controller host that discovers remote media players and commands them.
//!
//! Players connect over WebSocket, introduce themselves with an
//! `init_player` handshake, and then accept `play`/`pause` commands. The
//! host keeps a live [`Roster`] of them and brings up a
//! [`ControlSurface`] the first time one appears.
//!
//! ```text
//! transport → Connection (handshake) → Roster (add/remove) → ControlSurface
//! ```
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use playdeck::prelude::*;
//!
//! # async fn demo() -> Result<(), PlaydeckError> {
//! let server = PlaydeckServer::builder()
//!     .bind("0.0.0.0:8080")
//!     .build(LoggingListener)
//!     .await?;
//! server.run().await
//! # }
//! ```

mod control;
mod error;
mod logging;
mod port;
mod server;

pub use control::{Activation, ControlListener, ControlSurface, LoggingListener};
pub use error::PlaydeckError;
pub use logging::init_logging;
pub use server::{
    DEFAULT_BIND_ADDR, DEFAULT_CLOSE_TIMEOUT, PlaydeckServer, PlaydeckServerBuilder, ServerConfig,
};

pub use playdeck_events as events;
pub use playdeck_protocol as protocol;
pub use playdeck_roster as roster;
pub use playdeck_session as session;
pub use playdeck_transport as transport;

/// Everything a host application usually needs.
pub mod prelude {
    pub use crate::{
        Activation, ControlListener, ControlSurface, LoggingListener, PlaydeckError,
        PlaydeckServer, PlaydeckServerBuilder, ServerConfig, init_logging,
    };
    pub use playdeck_events::{EventBus, Handler};
    pub use playdeck_protocol::{InboundMessage, OutboundMessage, PlayerId};
    pub use playdeck_roster::Roster;
    pub use playdeck_session::{
        Connection, ConnectionState, MemoryPort, PlaybackState, Player, ProtocolViolation,
        SessionError,
    };
    pub use std::ops::ControlFlow;
}
