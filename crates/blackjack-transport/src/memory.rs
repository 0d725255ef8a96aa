//! In-process transport: peers exchange packets through channels.
//!
//! Every packet is delivered reliably and in order, whatever reliability
//! class is requested. Links are explicit: a peer only reaches the peers
//! it has connected to (or that connected to it).

use std::collections::{BTreeSet, HashMap};
use std::net::SocketAddr;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tokio::sync::mpsc;

use crate::{
    Destination, Inbound, Peer, PeerAddr, Reliability, TransportError,
    TransportEvent,
};

/// A shared in-memory network that [`MemoryPeer`]s bind to.
///
/// Cheap to clone; clones refer to the same network.
#[derive(Clone, Default)]
pub struct MemoryNetwork {
    inner: Arc<Mutex<NetworkInner>>,
}

#[derive(Default)]
struct NetworkInner {
    mailboxes: HashMap<PeerAddr, mpsc::UnboundedSender<Inbound>>,
    links: HashMap<PeerAddr, BTreeSet<PeerAddr>>,
    max_incoming: HashMap<PeerAddr, usize>,
}

impl NetworkInner {
    fn deliver(&self, to: PeerAddr, packet: Inbound) {
        if let Some(mailbox) = self.mailboxes.get(&to) {
            // A closed mailbox means the peer is being dropped.
            let _ = mailbox.send(packet);
        }
    }

    fn linked(&self, a: PeerAddr, b: PeerAddr) -> bool {
        self.links.get(&a).is_some_and(|set| set.contains(&b))
    }

    fn unlink(&mut self, a: PeerAddr, b: PeerAddr) -> bool {
        let removed = self.links.get_mut(&a).is_some_and(|set| set.remove(&b));
        if let Some(set) = self.links.get_mut(&b) {
            set.remove(&a);
        }
        removed
    }
}

impl MemoryNetwork {
    /// Creates an empty network.
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, NetworkInner> {
        self.inner.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Binds a new peer at `addr`.
    ///
    /// # Errors
    /// [`TransportError::AddrInUse`] if another live peer holds `addr`.
    pub fn bind(&self, addr: SocketAddr) -> Result<MemoryPeer, TransportError> {
        let addr = PeerAddr::from(addr);
        let mut inner = self.lock();
        if inner.mailboxes.contains_key(&addr) {
            return Err(TransportError::AddrInUse(addr));
        }
        let (tx, rx) = mpsc::unbounded_channel();
        inner.mailboxes.insert(addr, tx);
        inner.links.insert(addr, BTreeSet::new());
        tracing::debug!(%addr, "memory peer bound");

        Ok(MemoryPeer {
            addr,
            network: self.clone(),
            inbox: rx,
        })
    }
}

/// A peer on a [`MemoryNetwork`].
///
/// Dropping the peer tears down its links; each remote side receives a
/// [`TransportEvent::ConnectionLost`] packet.
pub struct MemoryPeer {
    addr: PeerAddr,
    network: MemoryNetwork,
    inbox: mpsc::UnboundedReceiver<Inbound>,
}

impl MemoryPeer {
    /// Caps how many peers may connect to this one. Further attempts are
    /// refused with [`TransportEvent::NoFreeIncomingConnections`].
    pub fn set_max_incoming(&self, max: usize) {
        self.network.lock().max_incoming.insert(self.addr, max);
    }

    /// Opens a link to `remote`.
    ///
    /// The outcome arrives through [`Peer::receive`]: either
    /// `ConnectionRequestAccepted` or `NoFreeIncomingConnections`, with
    /// `remote` as the source. The remote side sees
    /// `NewIncomingConnection` from us.
    ///
    /// # Errors
    /// [`TransportError::ConnectFailed`] if nothing is bound at `remote`.
    pub fn connect(&self, remote: SocketAddr) -> Result<(), TransportError> {
        let remote = PeerAddr::from(remote);
        let mut inner = self.network.lock();
        if !inner.mailboxes.contains_key(&remote) {
            return Err(TransportError::ConnectFailed(std::io::Error::new(
                std::io::ErrorKind::ConnectionRefused,
                format!("nothing bound at {remote}"),
            )));
        }
        if inner.linked(self.addr, remote) {
            return Ok(());
        }

        let incoming = inner.links.get(&remote).map_or(0, BTreeSet::len);
        let full = inner
            .max_incoming
            .get(&remote)
            .is_some_and(|max| incoming >= *max);
        if full {
            tracing::debug!(local = %self.addr, %remote, "remote is full");
            inner.deliver(
                self.addr,
                Inbound::event(remote, TransportEvent::NoFreeIncomingConnections),
            );
            return Ok(());
        }

        inner.links.entry(self.addr).or_default().insert(remote);
        inner.links.entry(remote).or_default().insert(self.addr);
        inner.deliver(
            self.addr,
            Inbound::event(remote, TransportEvent::ConnectionRequestAccepted),
        );
        inner.deliver(
            remote,
            Inbound::event(self.addr, TransportEvent::NewIncomingConnection),
        );
        tracing::debug!(local = %self.addr, %remote, "memory link opened");
        Ok(())
    }

    /// Closes the link to `remote`, which receives a
    /// `DisconnectionNotification`.
    pub fn disconnect(&self, remote: PeerAddr) {
        let mut inner = self.network.lock();
        if inner.unlink(self.addr, remote) {
            inner.deliver(
                remote,
                Inbound::event(self.addr, TransportEvent::DisconnectionNotification),
            );
        }
    }

    /// Peers we currently have a link to.
    pub fn connections(&self) -> Vec<PeerAddr> {
        self.network
            .lock()
            .links
            .get(&self.addr)
            .map(|set| set.iter().copied().collect())
            .unwrap_or_default()
    }
}

impl Peer for MemoryPeer {
    fn local_addr(&self) -> PeerAddr {
        self.addr
    }

    fn send(
        &self,
        data: &[u8],
        destination: Destination,
        _reliability: Reliability,
    ) -> Result<(), TransportError> {
        let inner = self.network.lock();
        if let Destination::Peer(target) = destination {
            if !inner.linked(self.addr, target) {
                return Err(TransportError::NotConnected(target));
            }
        }

        let targets = inner.links.get(&self.addr).into_iter().flatten();
        for target in targets.filter(|t| destination.includes(**t)) {
            inner.deliver(
                *target,
                Inbound {
                    source: self.addr,
                    data: data.to_vec(),
                },
            );
        }
        Ok(())
    }

    fn receive(&mut self) -> Option<Inbound> {
        self.inbox.try_recv().ok()
    }
}

impl Drop for MemoryPeer {
    fn drop(&mut self) {
        let mut inner = self.network.lock();
        inner.mailboxes.remove(&self.addr);
        inner.max_incoming.remove(&self.addr);
        let remotes = inner.links.remove(&self.addr).unwrap_or_default();
        for remote in remotes {
            if let Some(set) = inner.links.get_mut(&remote) {
                set.remove(&self.addr);
            }
            inner.deliver(
                remote,
                Inbound::event(self.addr, TransportEvent::ConnectionLost),
            );
        }
        tracing::debug!(addr = %self.addr, "memory peer dropped");
    }
}
