//! Unified error type for the blackjack crates.

use blackjack_protocol::ProtocolError;
use blackjack_table::TableError;
use blackjack_transport::TransportError;

/// Top-level error that wraps all crate-specific errors.
///
/// When using the `blackjack` meta-crate, you deal with this single
/// error type instead of importing errors from each sub-crate.
/// The `#[from]` attribute on each variant auto-generates `From` impls,
/// so the `?` operator converts sub-crate errors automatically.
#[derive(Debug, thiserror::Error)]
pub enum BlackjackError {
    /// A transport-level error (bind, connect, send).
    #[error(transparent)]
    Transport(#[from] TransportError),

    /// A protocol-level error (encode, decode, framing).
    #[error(transparent)]
    Protocol(#[from] ProtocolError),

    /// A table rule was broken (full table, wrong turn, ...).
    #[error(transparent)]
    Table(#[from] TableError),
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use blackjack_transport::PeerAddr;

    use super::*;

    fn addr() -> PeerAddr {
        PeerAddr::from(SocketAddr::from(([127, 0, 0, 1], 4000)))
    }

    #[test]
    fn test_from_transport_error() {
        let err = TransportError::NotConnected(addr());
        let blackjack_err: BlackjackError = err.into();
        assert!(matches!(blackjack_err, BlackjackError::Transport(_)));
        assert!(blackjack_err.to_string().contains("127.0.0.1:4000"));
    }

    #[test]
    fn test_from_protocol_error() {
        let err = ProtocolError::UnknownType(0x42);
        let blackjack_err: BlackjackError = err.into();
        assert!(matches!(blackjack_err, BlackjackError::Protocol(_)));
    }

    #[test]
    fn test_from_table_error() {
        let err = TableError::NoSuchTable(9);
        let blackjack_err: BlackjackError = err.into();
        assert!(matches!(blackjack_err, BlackjackError::Table(_)));
        assert!(blackjack_err.to_string().contains('9'));
    }
}
