//! Wire protocol for the blackjack peers.
//!
//! This crate defines the "language" that clients and servers speak:
//!
//! - **Catalog** ([`Message`], [`MessageBody`] and the payload structs):
//!   the messages that travel on the wire.
//! - **Codec** ([`WirePayload`], [`WireReader`], [`WireWriter`]): how each
//!   message is turned into bytes and back.
//! - **Registry** ([`Registry`]): which decoder handles which tag.
//! - **Framing** ([`Framer`], [`Dispatcher`], [`Outbox`]): many messages
//!   per packet, sender attached on the way in, grouped per destination on
//!   the way out.
//! - **Errors** ([`ProtocolError`]): what can go wrong during
//!   encoding/decoding.
//!
//! # Architecture
//!
//! The protocol layer sits between the transport (raw bytes) and the table
//! (game rules). It doesn't know about connections or seats. It only
//! knows how to pack messages into packets and unpack them again.
//!
//! ```text
//! Transport (bytes) → Dispatcher → Vec<Message> → Table
//! Table → Outbox → Framer → Transport (bytes)
//! ```

// ---------------------------------------------------------------------------
// Module declarations
// ---------------------------------------------------------------------------

mod codec;
mod config;
mod dispatcher;
mod error;
mod framer;
mod message;
mod outbox;
mod registry;
mod wire;

// ---------------------------------------------------------------------------
// Re-exports
// ---------------------------------------------------------------------------

pub use codec::{encode_message, WirePayload};
pub use config::{ProtocolConfig, UnknownTagPolicy};
pub use dispatcher::{DispatchStats, Dispatcher};
pub use error::ProtocolError;
pub use framer::Framer;
pub use message::{
    tag, CardRank, DisplayNameChange, Extension, Message, MessageBody,
    Notification, PlayerAction, PlayerActiveOrder, PlayerCardDrawn,
    PlayerChat, PlayerJoinGameRequest, PlayerMove, PlayerSpectatorChoice,
    Timestamp,
};
pub use outbox::{OutboundPacket, Outbox};
pub use registry::{DecodeFn, Entry, Registry};
pub use wire::{WireReader, WireWriter};
