//! Transport abstraction layer for the blackjack protocol.
//!
//! The protocol core never opens sockets. It talks to a [`Peer`]: something
//! that can send a byte buffer to a [`Destination`] with a [`Reliability`]
//! class, and that hands back received buffers tagged with the [`PeerAddr`]
//! they came from.
//!
//! Connection lifecycle changes (accepted, lost, refused) are delivered
//! through the same receive path as one-byte packets carrying a
//! [`TransportEvent`] tag, so the layers above see them as ordinary
//! tag-only messages.
//!
//! # Implementations
//!
//! - [`MemoryNetwork`] / [`MemoryPeer`]: in-process links for tests and
//!   single-process demos
//! - `WebSocketPeer` (feature `websocket`, default): real sockets via
//!   `tokio-tungstenite`

mod addr;
mod error;
mod memory;
#[cfg(feature = "websocket")]
mod websocket;

pub use addr::PeerAddr;
pub use error::TransportError;
pub use memory::{MemoryNetwork, MemoryPeer};
#[cfg(feature = "websocket")]
pub use websocket::{WebSocketConfig, WebSocketPeer};

/// Delivery guarantee requested for an outbound packet.
///
/// Transports that cannot honor a weaker class deliver it as
/// [`Reliability::ReliableOrdered`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum Reliability {
    /// Delivered in order, no loss.
    #[default]
    ReliableOrdered,

    /// Delivered, but possibly out of order.
    ReliableUnordered,

    /// May be lost or reordered.
    Unreliable,
}

/// Where an outbound packet should go.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Destination {
    /// One specific peer.
    Peer(PeerAddr),

    /// Every peer we have a link to.
    Broadcast,

    /// Every linked peer except one.
    AllExcept(PeerAddr),
}

impl Destination {
    /// Returns `true` if a packet for this destination should reach `addr`.
    pub fn includes(&self, addr: PeerAddr) -> bool {
        match self {
            Self::Peer(target) => *target == addr,
            Self::Broadcast => true,
            Self::AllExcept(excluded) => *excluded != addr,
        }
    }
}

/// Connection lifecycle events raised by a transport.
///
/// Each event travels up the stack as a one-byte packet holding
/// [`TransportEvent::tag`].
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TransportEvent {
    /// Our outgoing connection attempt was accepted.
    ConnectionRequestAccepted,
    /// A remote peer connected to us.
    NewIncomingConnection,
    /// The remote side refused us because it is full.
    NoFreeIncomingConnections,
    /// The remote side closed the link cleanly.
    DisconnectionNotification,
    /// The link dropped without a clean close.
    ConnectionLost,
}

impl TransportEvent {
    /// Every event, in tag order.
    pub const ALL: [TransportEvent; 5] = [
        Self::ConnectionRequestAccepted,
        Self::NewIncomingConnection,
        Self::NoFreeIncomingConnections,
        Self::DisconnectionNotification,
        Self::ConnectionLost,
    ];

    /// The wire tag carried by the event packet.
    pub const fn tag(self) -> u8 {
        match self {
            Self::ConnectionRequestAccepted => 0x10,
            Self::NewIncomingConnection => 0x11,
            Self::NoFreeIncomingConnections => 0x12,
            Self::DisconnectionNotification => 0x13,
            Self::ConnectionLost => 0x14,
        }
    }

    /// Maps a wire tag back to its event, if it is one.
    pub fn from_tag(tag: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|event| event.tag() == tag)
    }
}

/// A packet handed up by the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Inbound {
    /// The peer the bytes came from.
    pub source: PeerAddr,
    /// The raw packet.
    pub data: Vec<u8>,
}

impl Inbound {
    /// Builds the one-byte packet that announces a lifecycle event.
    pub fn event(source: PeerAddr, event: TransportEvent) -> Self {
        Self {
            source,
            data: vec![event.tag()],
        }
    }
}

/// One endpoint of the network: a client or a server.
///
/// Both methods are non-blocking. `receive` returning `None` is not an
/// error; it just means nothing arrived since the last call.
pub trait Peer: Send + 'static {
    /// The address other peers see us as.
    fn local_addr(&self) -> PeerAddr;

    /// Sends one packet.
    fn send(
        &self,
        data: &[u8],
        destination: Destination,
        reliability: Reliability,
    ) -> Result<(), TransportError>;

    /// Takes the next received packet, if any.
    fn receive(&mut self) -> Option<Inbound>;
}
