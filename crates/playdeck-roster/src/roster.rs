//! The roster: tracks live connections and the players they produced.
//!
//! # Lifecycle
//!
//! ```text
//! add_connection() ──→ [connection tracked]
//!                          │
//!                          ├── on_player_found ──→ [player tracked] ──→ on_player_added
//!                          │                            │
//!                          ▼                            ▼
//!                  on_disconnected ──→ [untracked]  player.on_disconnected ──→ on_player_removed
//! ```
//!
//! A connection's disconnect handler is registered before the player
//! exists, so the connection leaves the set first and its player follows
//! within the same dispatch.
//!
//! # Concurrency note
//!
//! `Roster` is single-threaded (`Rc`/`RefCell`) and is meant to be owned by
//! the one task that processes connection events. No borrow is held while
//! events are published, so handlers may call back into the roster.

use std::cell::RefCell;
use std::ops::ControlFlow;
use std::rc::{Rc, Weak};

use playdeck_events::EventBus;
use playdeck_protocol::PlayerId;
use playdeck_session::{Connection, Player};
use playdeck_transport::ConnectionId;

/// The live set of connections and players.
///
/// One roster is created at startup and shared by reference for the life
/// of the process.
pub struct Roster {
    /// Tracked connections, in the order they were added.
    connections: RefCell<Vec<Rc<Connection>>>,

    /// Tracked players, in the order their handshakes completed.
    players: RefCell<Vec<Rc<Player>>>,

    on_player_added: EventBus<Rc<Player>>,
    on_player_removed: EventBus<Rc<Player>>,
    me: Weak<Roster>,
}

impl Roster {
    /// Creates an empty roster.
    pub fn new() -> Rc<Self> {
        let roster = Rc::new_cyclic(|me| Self {
            connections: RefCell::new(Vec::new()),
            players: RefCell::new(Vec::new()),
            on_player_added: EventBus::new("roster.on_player_added"),
            on_player_removed: EventBus::new("roster.on_player_removed"),
            me: me.clone(),
        });
        tracing::info!("roster created");
        roster
    }

    /// Fires after a player joins the roster.
    pub fn on_player_added(&self) -> &EventBus<Rc<Player>> {
        &self.on_player_added
    }

    /// Fires after a player leaves the roster.
    pub fn on_player_removed(&self) -> &EventBus<Rc<Player>> {
        &self.on_player_removed
    }

    /// Starts tracking a connection.
    ///
    /// The roster listens for the connection's player and for its
    /// disconnect. Adding a connection twice, or one that has already
    /// disconnected, does nothing.
    pub fn add_connection(&self, connection: Rc<Connection>) {
        let conn_id = connection.id();
        if connection.is_disconnected() {
            tracing::warn!(%conn_id, "not tracking a connection that already disconnected");
            return;
        }
        if self.connection_index(conn_id).is_some() {
            tracing::debug!(%conn_id, "connection already tracked");
            return;
        }

        let me = self.me.clone();
        connection.on_player_found().subscribe_fn(move |player: &Rc<Player>| {
            if let Some(roster) = me.upgrade() {
                roster.handle_player_found(conn_id, player);
            }
            ControlFlow::Continue(())
        });

        let me = self.me.clone();
        connection.on_disconnected().subscribe_fn(move |conn_id: &ConnectionId| {
            if let Some(roster) = me.upgrade() {
                roster.remove_connection(*conn_id);
            }
            ControlFlow::Continue(())
        });

        self.connections.borrow_mut().push(connection);
        tracing::info!(%conn_id, "connection added");
    }

    /// A snapshot of the live players.
    ///
    /// The returned `Vec` is independent: later roster changes don't show
    /// up in it.
    pub fn list_players(&self) -> Vec<Rc<Player>> {
        self.players.borrow().clone()
    }

    /// Number of live players.
    pub fn count_players(&self) -> usize {
        self.players.borrow().len()
    }

    /// Number of tracked connections, including ones still waiting for
    /// their handshake.
    pub fn connection_count(&self) -> usize {
        self.connections.borrow().len()
    }

    /// Looks up a live player by id.
    pub fn find_player(&self, player_id: PlayerId) -> Option<Rc<Player>> {
        self.players
            .borrow()
            .iter()
            .find(|p| p.id() == player_id)
            .cloned()
    }

    fn handle_player_found(&self, conn_id: ConnectionId, player: &Rc<Player>) {
        if self.connection_index(conn_id).is_none() {
            tracing::warn!(%conn_id, player_id = %player.id(), "player from untracked connection ignored");
            return;
        }

        self.players.borrow_mut().push(Rc::clone(player));

        let me = self.me.clone();
        player.on_disconnected().subscribe_fn(move |player_id: &PlayerId| {
            if let Some(roster) = me.upgrade() {
                roster.remove_player(*player_id);
            }
            ControlFlow::Continue(())
        });

        tracing::info!(player_id = %player.id(), name = player.name(), "player added");
        self.on_player_added.publish(player);
    }

    fn remove_connection(&self, conn_id: ConnectionId) {
        let removed = {
            let mut connections = self.connections.borrow_mut();
            let idx = connections.iter().position(|c| c.id() == conn_id);
            idx.map(|idx| connections.remove(idx))
        };
        if removed.is_some() {
            tracing::info!(%conn_id, "connection removed");
        }
    }

    fn remove_player(&self, player_id: PlayerId) {
        let removed = {
            let mut players = self.players.borrow_mut();
            let idx = players.iter().position(|p| p.id() == player_id);
            idx.map(|idx| players.remove(idx))
        };
        if let Some(player) = removed {
            tracing::info!(%player_id, name = player.name(), "player removed");
            self.on_player_removed.publish(&player);
        }
    }

    fn connection_index(&self, conn_id: ConnectionId) -> Option<usize> {
        self.connections
            .borrow()
            .iter()
            .position(|c| c.id() == conn_id)
    }
}

// =========================================================================
// Tests
// =========================================================================

#[cfg(test)]
mod tests {
    //! Unit tests for `Roster`, driven through real connections backed by
    //! `MemoryPort`s.

    use super::*;
    use std::cell::Cell;

    use playdeck_protocol::{InboundMessage, OutboundMessage};
    use playdeck_session::MemoryPort;

    // -- Helpers ----------------------------------------------------------

    fn connection(id: u64) -> (Rc<Connection>, MemoryPort) {
        let port = MemoryPort::new();
        let conn = Connection::new(ConnectionId::new(id), port.clone());
        (conn, port)
    }

    fn names(players: &[Rc<Player>]) -> Vec<String> {
        players.iter().map(|p| p.name().to_owned()).collect()
    }

    /// Collects the names of players published on a roster event.
    fn record(bus: &EventBus<Rc<Player>>) -> Rc<RefCell<Vec<String>>> {
        let log = Rc::new(RefCell::new(Vec::new()));
        let sink = Rc::clone(&log);
        bus.subscribe_fn(move |p: &Rc<Player>| {
            sink.borrow_mut().push(p.name().to_owned());
            ControlFlow::Continue(())
        });
        log
    }

    // =====================================================================
    // add_connection()
    // =====================================================================

    #[test]
    fn test_add_connection_tracks_connection_without_player() {
        let roster = Roster::new();
        let (conn, _) = connection(1);

        roster.add_connection(conn);

        assert_eq!(roster.connection_count(), 1);
        assert_eq!(roster.count_players(), 0);
    }

    #[test]
    fn test_add_connection_twice_is_noop() {
        let roster = Roster::new();
        let (conn, _) = connection(1);
        let added = record(roster.on_player_added());

        roster.add_connection(Rc::clone(&conn));
        roster.add_connection(Rc::clone(&conn));
        conn.handle_message(InboundMessage::init_player("Alice"));

        assert_eq!(roster.connection_count(), 1);
        assert_eq!(roster.count_players(), 1);
        assert_eq!(*added.borrow(), vec!["Alice"]);
    }

    #[test]
    fn test_add_connection_already_disconnected_is_ignored() {
        let roster = Roster::new();
        let (conn, _) = connection(1);
        conn.handle_disconnect();

        roster.add_connection(conn);

        assert_eq!(roster.connection_count(), 0);
    }

    // =====================================================================
    // Player found / removed
    // =====================================================================

    #[test]
    fn test_player_found_adds_player_and_publishes() {
        let roster = Roster::new();
        let (conn, _) = connection(1);
        roster.add_connection(Rc::clone(&conn));
        let added = record(roster.on_player_added());

        conn.handle_message(InboundMessage::init_player("Alice"));

        assert_eq!(roster.count_players(), 1);
        assert_eq!(names(&roster.list_players()), vec!["Alice"]);
        assert_eq!(*added.borrow(), vec!["Alice"]);
    }

    #[test]
    fn test_player_added_handler_sees_player_in_roster() {
        let roster = Roster::new();
        let (conn, _) = connection(1);
        roster.add_connection(Rc::clone(&conn));
        let seen = Rc::new(Cell::new(0));
        {
            let seen = Rc::clone(&seen);
            let weak = Rc::downgrade(&roster);
            roster.on_player_added().subscribe_fn(move |_| {
                seen.set(weak.upgrade().map_or(0, |r| r.count_players()));
                ControlFlow::Continue(())
            });
        }

        conn.handle_message(InboundMessage::init_player("Alice"));

        assert_eq!(seen.get(), 1);
    }

    #[test]
    fn test_connection_disconnect_removes_connection_and_player() {
        let roster = Roster::new();
        let (conn, _) = connection(1);
        roster.add_connection(Rc::clone(&conn));
        conn.handle_message(InboundMessage::init_player("Alice"));
        let removed = record(roster.on_player_removed());

        conn.handle_disconnect();

        assert_eq!(roster.count_players(), 0);
        assert_eq!(roster.connection_count(), 0);
        assert!(roster.list_players().is_empty());
        assert_eq!(*removed.borrow(), vec!["Alice"]);
    }

    #[test]
    fn test_disconnect_before_handshake_removes_connection_only() {
        let roster = Roster::new();
        let (conn, _) = connection(1);
        roster.add_connection(Rc::clone(&conn));
        let removed = record(roster.on_player_removed());

        conn.handle_disconnect();

        assert_eq!(roster.connection_count(), 0);
        assert!(removed.borrow().is_empty());
    }

    #[test]
    fn test_protocol_violation_removes_player_once() {
        let roster = Roster::new();
        let (conn, port) = connection(1);
        roster.add_connection(Rc::clone(&conn));
        conn.handle_message(InboundMessage::init_player("Alice"));
        let removed = record(roster.on_player_removed());

        conn.handle_message(InboundMessage::init_player("Alice again"));
        conn.handle_disconnect();

        assert_eq!(port.disconnect_count(), 1);
        assert_eq!(roster.count_players(), 0);
        assert_eq!(*removed.borrow(), vec!["Alice"]);
    }

    #[test]
    fn test_rejected_handshake_never_adds_player() {
        let roster = Roster::new();
        let (conn, _) = connection(1);
        roster.add_connection(Rc::clone(&conn));
        let added = record(roster.on_player_added());

        conn.handle_message(InboundMessage::of_type("play"));

        assert!(added.borrow().is_empty());
        assert_eq!(roster.connection_count(), 0);
    }

    // =====================================================================
    // list_players() / count_players() / find_player()
    // =====================================================================

    #[test]
    fn test_list_players_snapshot_survives_removal() {
        let roster = Roster::new();
        let (conn, _) = connection(1);
        roster.add_connection(Rc::clone(&conn));
        conn.handle_message(InboundMessage::init_player("Alice"));

        let snapshot = roster.list_players();
        conn.handle_disconnect();

        assert_eq!(roster.count_players(), 0);
        assert_eq!(names(&snapshot), vec!["Alice"]);
    }

    #[test]
    fn test_list_players_preserves_handshake_order() {
        let roster = Roster::new();
        let (a, _) = connection(1);
        let (b, _) = connection(2);
        let (c, _) = connection(3);
        for conn in [&a, &b, &c] {
            roster.add_connection(Rc::clone(conn));
        }

        c.handle_message(InboundMessage::init_player("Carol"));
        a.handle_message(InboundMessage::init_player("Alice"));
        b.handle_message(InboundMessage::init_player("Bob"));
        a.handle_disconnect();

        assert_eq!(names(&roster.list_players()), vec!["Carol", "Bob"]);
        assert_eq!(roster.count_players(), 2);
    }

    #[test]
    fn test_duplicate_names_are_both_kept() {
        let roster = Roster::new();
        let (a, _) = connection(1);
        let (b, _) = connection(2);
        roster.add_connection(Rc::clone(&a));
        roster.add_connection(Rc::clone(&b));

        a.handle_message(InboundMessage::init_player("Speaker"));
        b.handle_message(InboundMessage::init_player("Speaker"));

        assert_eq!(roster.count_players(), 2);
    }

    #[test]
    fn test_find_player_returns_live_player_only() {
        let roster = Roster::new();
        let (conn, port) = connection(7);
        roster.add_connection(Rc::clone(&conn));
        conn.handle_message(InboundMessage::init_player("Alice"));

        let player = roster.find_player(PlayerId(7)).expect("player is live");
        player.play().unwrap();
        assert_eq!(port.sent(), vec![OutboundMessage::command("play", None)]);

        conn.handle_disconnect();
        assert!(roster.find_player(PlayerId(7)).is_none());
    }

    #[test]
    fn test_removed_handler_can_query_roster() {
        let roster = Roster::new();
        let (conn, _) = connection(1);
        roster.add_connection(Rc::clone(&conn));
        conn.handle_message(InboundMessage::init_player("Alice"));
        let seen = Rc::new(Cell::new(usize::MAX));
        {
            let seen = Rc::clone(&seen);
            let weak = Rc::downgrade(&roster);
            roster.on_player_removed().subscribe_fn(move |_| {
                seen.set(weak.upgrade().map_or(usize::MAX, |r| r.count_players()));
                ControlFlow::Continue(())
            });
        }

        conn.disconnect();

        assert_eq!(seen.get(), 0);
    }
}
