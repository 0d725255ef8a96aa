//! # Blackjack
//!
//! Multiplayer blackjack over a small binary peer protocol.
//!
//! Every packet is either one message or a batch of messages headed by a
//! count. Each message starts with a one-byte type tag. The protocol crate
//! decodes packets into owned [`Message`]s; the table crate applies them;
//! this crate runs the loop that connects the two to a transport.
//!
//! ## Layers
//!
//! - `blackjack-transport`: [`Peer`] trait, in-memory and WebSocket peers
//! - `blackjack-protocol`: wire codec, registry, framer, dispatcher, outbox
//! - `blackjack-table`: lobby, tables, decks, hands
//! - this crate: [`Endpoint`], [`BlackjackServer`], [`BlackjackClient`]
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use blackjack::prelude::*;
//!
//! # async fn serve() -> Result<(), BlackjackError> {
//! blackjack::logging::init();
//! let peer = WebSocketPeer::bind("0.0.0.0:7777", WebSocketConfig::default()).await?;
//! let server = BlackjackServerBuilder::new().tables(2).build(peer);
//! server.run().await;
//! # Ok(())
//! # }
//! ```

mod client;
mod endpoint;
mod error;
pub mod logging;
mod server;

pub use client::{BlackjackClient, ClientEvent, TableView};
pub use endpoint::Endpoint;
pub use error::BlackjackError;
pub use server::{BlackjackServer, BlackjackServerBuilder, ServerConfig};

pub use blackjack_protocol::{Message, MessageBody};
pub use blackjack_transport::Peer;

/// Sub-crates, for anything the prelude leaves out.
pub use blackjack_protocol as protocol;
pub use blackjack_table as table;
pub use blackjack_transport as transport;

/// Common imports for servers and clients.
pub mod prelude {
    pub use crate::{
        BlackjackClient, BlackjackError, BlackjackServer, BlackjackServerBuilder, ClientEvent,
        Endpoint, ServerConfig, TableView,
    };
    pub use blackjack_protocol::{
        CardRank, Message, MessageBody, Notification, PlayerAction, PlayerActiveOrder,
        PlayerCardDrawn, PlayerChat, PlayerMove, ProtocolConfig, UnknownTagPolicy,
    };
    pub use blackjack_table::{TableConfig, TablePhase};
    pub use blackjack_transport::{
        Destination, MemoryNetwork, MemoryPeer, Peer, PeerAddr, Reliability, TransportEvent,
    };
    #[cfg(feature = "websocket")]
    pub use blackjack_transport::{WebSocketConfig, WebSocketPeer};
}
