//! Peer address handle.

use std::fmt;
use std::net::{IpAddr, Ipv6Addr, SocketAddr};

/// Opaque identifier for a network peer.
///
/// Layers above the transport only compare these for equality, hash them,
/// and copy them onto the wire as [`PeerAddr::ENCODED_LEN`] raw bytes.
/// The layout (16 address octets with IPv4 stored IPv4-mapped, then a
/// big-endian port) is private to this crate.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct PeerAddr {
    octets: [u8; 16],
    port: u16,
}

impl PeerAddr {
    /// Size of the wire form in bytes.
    pub const ENCODED_LEN: usize = 18;

    /// The "no peer" handle. Used on the wire where a field has no target
    /// (the dealer, a broadcast chat).
    pub const UNASSIGNED: PeerAddr = PeerAddr {
        octets: [0; 16],
        port: 0,
    };

    /// Returns `true` for [`PeerAddr::UNASSIGNED`].
    pub fn is_unassigned(&self) -> bool {
        *self == Self::UNASSIGNED
    }

    /// The fixed-size wire form.
    pub fn to_bytes(&self) -> [u8; Self::ENCODED_LEN] {
        let mut out = [0u8; Self::ENCODED_LEN];
        out[..16].copy_from_slice(&self.octets);
        out[16..].copy_from_slice(&self.port.to_be_bytes());
        out
    }

    /// Rebuilds a handle from its wire form.
    pub fn from_bytes(bytes: [u8; Self::ENCODED_LEN]) -> Self {
        let mut octets = [0u8; 16];
        octets.copy_from_slice(&bytes[..16]);
        Self {
            octets,
            port: u16::from_be_bytes([bytes[16], bytes[17]]),
        }
    }

    /// The socket address this handle stands for.
    pub fn socket_addr(&self) -> SocketAddr {
        let ip = Ipv6Addr::from(self.octets);
        match ip.to_ipv4_mapped() {
            Some(v4) => SocketAddr::new(IpAddr::V4(v4), self.port),
            None => SocketAddr::new(IpAddr::V6(ip), self.port),
        }
    }
}

impl From<SocketAddr> for PeerAddr {
    fn from(addr: SocketAddr) -> Self {
        let octets = match addr.ip() {
            IpAddr::V4(v4) => v4.to_ipv6_mapped().octets(),
            IpAddr::V6(v6) => v6.octets(),
        };
        Self {
            octets,
            port: addr.port(),
        }
    }
}

impl fmt::Display for PeerAddr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_unassigned() {
            write!(f, "unassigned")
        } else {
            write!(f, "{}", self.socket_addr())
        }
    }
}
