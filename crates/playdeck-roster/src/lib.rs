//! Player roster for Playdeck.
//!
//! The [`Roster`] is the aggregation layer between individual connections
//! and whatever builds on top of the set of players (a control surface,
//! a UI). It owns every live [`Connection`](playdeck_session::Connection)
//! and every live [`Player`](playdeck_session::Player), and turns their
//! per-connection events into two roster-level events:
//! [`on_player_added`](Roster::on_player_added) and
//! [`on_player_removed`](Roster::on_player_removed).

mod roster;

pub use roster::Roster;
