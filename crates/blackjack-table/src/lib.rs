//! Blackjack tables for the blackjack protocol.
//!
//! Tables are plain owned values held by a [`Lobby`]. There is no global
//! game state and no task per table: the server loop passes decoded
//! messages to [`Lobby::handle`] and sends whatever comes back.
//!
//! # Key types
//!
//! - [`Lobby`]: connected players, display names, routing to tables
//! - [`Table`]: seats, spectators, turn order, dealer play
//! - [`TablePhase`]: round state machine
//! - [`TableConfig`]: seat limits and dealer rule
//! - [`Deck`] / [`Hand`]: cards

mod config;
mod deck;
mod error;
mod hand;
mod lobby;
mod table;

use blackjack_protocol::Message;
use blackjack_transport::Destination;

pub use config::{TableConfig, TablePhase};
pub use deck::{DECK_SIZE, Deck};
pub use error::TableError;
pub use hand::{BLACKJACK, Hand};
pub use lobby::{Lobby, MAX_NAME_CHARS, PlayerInfo};
pub use table::{Outcome, Seating, Table};

/// Messages a table or the lobby wants sent, in order.
pub type Outgoing = Vec<(Destination, Message)>;
