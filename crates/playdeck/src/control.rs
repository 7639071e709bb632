//! The control surface: the outward-facing service that comes up once
//! there is something to control.
//!
//! [`ControlSurface`] watches the roster. Nothing happens while it is
//! empty; the first time a player is added, the surface switches to
//! [`Activation::Active`] and starts its [`ControlListener`]. It never
//! switches back, even if every player later leaves.
//!
//! What "start listening" means is up to the listener implementation.
//! [`LoggingListener`] only records that it happened.

use std::cell::Cell;
use std::ops::ControlFlow;
use std::rc::{Rc, Weak};

use playdeck_roster::Roster;
use playdeck_session::Player;

/// Whether the control surface has started.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    /// No player has appeared yet.
    Idle,
    /// The listener has been started. Terminal.
    Active,
}

/// The service a [`ControlSurface`] starts on first activation.
pub trait ControlListener {
    /// Called exactly once, when the first player joins the roster.
    fn start(&self);
}

/// A [`ControlListener`] that just logs.
#[derive(Debug, Clone, Copy, Default)]
pub struct LoggingListener;

impl ControlListener for LoggingListener {
    fn start(&self) {
        tracing::info!("control listener started");
    }
}

/// Lazily activates a [`ControlListener`] when the roster first gains a
/// player.
pub struct ControlSurface {
    roster: Rc<Roster>,
    listener: Box<dyn ControlListener>,
    activation: Cell<Activation>,
}

impl ControlSurface {
    /// Creates an idle surface and subscribes it to `roster`.
    pub fn new(roster: &Rc<Roster>, listener: impl ControlListener + 'static) -> Rc<Self> {
        let surface = Rc::new(Self {
            roster: Rc::clone(roster),
            listener: Box::new(listener),
            activation: Cell::new(Activation::Idle),
        });

        let weak: Weak<Self> = Rc::downgrade(&surface);
        roster.on_player_added().subscribe_fn(move |player: &Rc<Player>| {
            if let Some(surface) = weak.upgrade() {
                surface.handle_player_added(player);
            }
            ControlFlow::Continue(())
        });

        let weak: Weak<Self> = Rc::downgrade(&surface);
        roster.on_player_removed().subscribe_fn(move |player: &Rc<Player>| {
            if let Some(surface) = weak.upgrade() {
                surface.handle_player_removed(player);
            }
            ControlFlow::Continue(())
        });

        tracing::info!("control surface created");
        surface
    }

    /// Current activation state.
    pub fn activation(&self) -> Activation {
        self.activation.get()
    }

    /// Returns `true` once the listener has been started.
    pub fn is_active(&self) -> bool {
        self.activation.get() == Activation::Active
    }

    /// The roster this surface watches.
    pub fn roster(&self) -> &Rc<Roster> {
        &self.roster
    }

    fn handle_player_added(&self, player: &Rc<Player>) {
        tracing::info!(player_id = %player.id(), name = player.name(), "control surface: player added");
        if self.activation.get() == Activation::Idle {
            // Flip first so a re-entrant add can't start the listener twice.
            self.activation.set(Activation::Active);
            tracing::info!(players = self.roster.count_players(), "starting control listener");
            self.listener.start();
        }
    }

    fn handle_player_removed(&self, player: &Rc<Player>) {
        tracing::info!(
            player_id = %player.id(),
            remaining = self.roster.count_players(),
            "control surface: player removed"
        );
    }
}
