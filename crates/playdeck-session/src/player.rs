//! The logical player behind a connection.
//!
//! A [`Player`] exists only after its connection completed the handshake.
//! It holds a weak back-reference to that connection, used solely to send
//! commands. When the connection goes away the reference is cleared, the
//! player announces its own disconnect, and every later command fails with
//! [`SessionError::PlayerDetached`].

use std::cell::{Cell, RefCell};
use std::ops::ControlFlow;
use std::rc::{Rc, Weak};

use playdeck_events::EventBus;
use playdeck_protocol::{COMMAND_PAUSE, COMMAND_PLAY, PlayerId};
use serde_json::Value;

use crate::{Connection, SessionError};

/// What the controller believes the remote player is doing.
///
/// Informational only: `play`/`pause` neither read nor update it.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PlaybackState {
    pub playing: bool,
}

/// A remote player the controller can command.
#[derive(Debug)]
pub struct Player {
    id: PlayerId,
    name: String,
    connection: RefCell<Option<Weak<Connection>>>,
    state: Cell<PlaybackState>,
    on_disconnected: EventBus<PlayerId>,
}

impl Player {
    /// Creates the player for `connection` and hooks it to the
    /// connection's disconnect event.
    pub(crate) fn new(connection: &Rc<Connection>, name: &str) -> Rc<Self> {
        let id = PlayerId(connection.id().into_inner());
        let player = Rc::new(Self {
            id,
            name: name.to_owned(),
            connection: RefCell::new(Some(Rc::downgrade(connection))),
            state: Cell::new(PlaybackState::default()),
            on_disconnected: EventBus::new("player.on_disconnected"),
        });

        let weak = Rc::downgrade(&player);
        connection.on_disconnected().subscribe_fn(move |_| {
            if let Some(player) = weak.upgrade() {
                player.handle_connection_closed();
            }
            ControlFlow::Continue(())
        });

        tracing::info!(player_id = %id, name, "player created");
        player
    }

    /// This player's id. Matches the id of the connection it came from.
    pub fn id(&self) -> PlayerId {
        self.id
    }

    /// The name the player announced in its handshake.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Last known playback state.
    pub fn state(&self) -> PlaybackState {
        self.state.get()
    }

    /// Records a playback state reported by whoever interprets the
    /// player's post-handshake messages.
    pub fn set_playing(&self, playing: bool) {
        self.state.set(PlaybackState { playing });
    }

    /// Returns `true` while the player can still send commands.
    pub fn is_attached(&self) -> bool {
        self.connection.borrow().is_some()
    }

    /// Fires once, with this player's id, when its connection closes.
    pub fn on_disconnected(&self) -> &EventBus<PlayerId> {
        &self.on_disconnected
    }

    /// Asks the remote player to start playback.
    pub fn play(&self) -> Result<(), SessionError> {
        self.send_command(COMMAND_PLAY, None)
    }

    /// Asks the remote player to pause playback.
    pub fn pause(&self) -> Result<(), SessionError> {
        self.send_command(COMMAND_PAUSE, None)
    }

    /// Sends an arbitrary command through the player's connection.
    ///
    /// # Errors
    /// Returns [`SessionError::PlayerDetached`] once the connection has
    /// closed.
    pub fn send_command(&self, command: &str, args: Option<Value>) -> Result<(), SessionError> {
        let connection = self
            .connection
            .borrow()
            .as_ref()
            .and_then(Weak::upgrade)
            .ok_or(SessionError::PlayerDetached(self.id))?;
        connection.send_command(command, args)
    }

    fn handle_connection_closed(&self) {
        if self.connection.borrow_mut().take().is_none() {
            return;
        }
        tracing::info!(player_id = %self.id, name = %self.name, "player connection closed");
        self.on_disconnected.publish(&self.id);
    }
}
