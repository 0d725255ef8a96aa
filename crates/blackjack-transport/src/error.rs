use crate::PeerAddr;

/// Errors that can occur in the transport layer.
#[derive(Debug, thiserror::Error)]
pub enum TransportError {
    /// The destination peer has no open link to us.
    #[error("no connection to {0}")]
    NotConnected(PeerAddr),

    /// Another peer is already bound to this address.
    #[error("address {0} already in use")]
    AddrInUse(PeerAddr),

    /// Connecting to a remote peer failed.
    #[error("connect failed: {0}")]
    ConnectFailed(#[source] std::io::Error),

    /// Sending data failed.
    #[error("send failed: {0}")]
    SendFailed(#[source] std::io::Error),

    /// Binding or accepting connections failed.
    #[error("accept failed: {0}")]
    AcceptFailed(#[source] std::io::Error),

    /// The transport was shut down.
    #[error("transport shut down")]
    Shutdown,
}
