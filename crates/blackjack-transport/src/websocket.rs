//! WebSocket transport implementation using `tokio-tungstenite`.
//!
//! Socket I/O runs on background Tokio tasks. Those tasks only feed an
//! unbounded channel; [`WebSocketPeer::receive`] drains it with
//! `try_recv`, so the owning loop never blocks on the network.

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use futures_util::{SinkExt, StreamExt};
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio_tungstenite::WebSocketStream;
use tokio_tungstenite::tungstenite::Message;

use crate::{
    Destination, Inbound, Peer, PeerAddr, Reliability, TransportError,
    TransportEvent,
};

/// Settings for a listening [`WebSocketPeer`].
#[derive(Debug, Clone)]
pub struct WebSocketConfig {
    /// Connections accepted at once. Extra clients get a
    /// `NoFreeIncomingConnections` packet and are closed.
    pub max_clients: usize,
}

impl Default for WebSocketConfig {
    fn default() -> Self {
        Self { max_clients: 10 }
    }
}

/// What the socket tasks report to the owning peer.
enum LinkEvent {
    Opened {
        remote: PeerAddr,
        writer: mpsc::UnboundedSender<Vec<u8>>,
        event: TransportEvent,
    },
    Data(Inbound),
    Closed {
        remote: PeerAddr,
        event: TransportEvent,
    },
    Refused {
        remote: PeerAddr,
    },
}

/// A [`Peer`] backed by WebSocket connections.
///
/// Created either listening ([`WebSocketPeer::bind`]) or connected to a
/// server ([`WebSocketPeer::connect`]). Every reliability class is sent
/// as a binary frame over the ordered stream.
pub struct WebSocketPeer {
    local: PeerAddr,
    events: mpsc::UnboundedReceiver<LinkEvent>,
    links: HashMap<PeerAddr, mpsc::UnboundedSender<Vec<u8>>>,
    accept_task: Option<JoinHandle<()>>,
}

impl WebSocketPeer {
    /// Starts listening on `addr`.
    pub async fn bind(
        addr: &str,
        config: WebSocketConfig,
    ) -> Result<Self, TransportError> {
        let listener = TcpListener::bind(addr)
            .await
            .map_err(TransportError::AcceptFailed)?;
        let local_sock = listener
            .local_addr()
            .map_err(TransportError::AcceptFailed)?;
        tracing::info!(addr = %local_sock, "WebSocket peer listening");

        let (tx, rx) = mpsc::unbounded_channel();
        let accept_task = tokio::spawn(accept_loop(listener, config, tx));

        Ok(Self {
            local: PeerAddr::from(local_sock),
            events: rx,
            links: HashMap::new(),
            accept_task: Some(accept_task),
        })
    }

    /// Connects to a listening peer at `addr` (`host:port`).
    ///
    /// The first packet received is the `ConnectionRequestAccepted` event
    /// (or `NoFreeIncomingConnections` if the server is full).
    pub async fn connect(addr: &str) -> Result<Self, TransportError> {
        let (ws, _) = tokio_tungstenite::connect_async(format!("ws://{addr}"))
            .await
            .map_err(|e| {
                TransportError::ConnectFailed(std::io::Error::new(
                    std::io::ErrorKind::ConnectionRefused,
                    e,
                ))
            })?;

        let (local_sock, remote_sock) = match ws.get_ref() {
            tokio_tungstenite::MaybeTlsStream::Plain(stream) => (
                stream.local_addr().map_err(TransportError::ConnectFailed)?,
                stream.peer_addr().map_err(TransportError::ConnectFailed)?,
            ),
            _ => {
                return Err(TransportError::ConnectFailed(std::io::Error::new(
                    std::io::ErrorKind::Unsupported,
                    "only plain ws:// links are supported",
                )));
            }
        };

        let (tx, rx) = mpsc::unbounded_channel();
        let remote = PeerAddr::from(remote_sock);
        tokio::spawn(run_link(
            ws,
            remote,
            TransportEvent::ConnectionRequestAccepted,
            tx,
            None,
        ));
        tracing::debug!(local = %local_sock, %remote, "WebSocket peer connected");

        Ok(Self {
            local: PeerAddr::from(local_sock),
            events: rx,
            links: HashMap::new(),
            accept_task: None,
        })
    }

    /// Closes the link to `remote` without notifying ourselves.
    pub fn disconnect(&mut self, remote: PeerAddr) {
        // Dropping the writer ends the link task, which closes the socket.
        if self.links.remove(&remote).is_some() {
            tracing::debug!(%remote, "closing WebSocket link");
        }
    }

    /// Peers we currently have an open link to.
    pub fn connections(&self) -> Vec<PeerAddr> {
        self.links.keys().copied().collect()
    }
}

impl Peer for WebSocketPeer {
    fn local_addr(&self) -> PeerAddr {
        self.local
    }

    fn send(
        &self,
        data: &[u8],
        destination: Destination,
        _reliability: Reliability,
    ) -> Result<(), TransportError> {
        if let Destination::Peer(target) = destination {
            if !self.links.contains_key(&target) {
                return Err(TransportError::NotConnected(target));
            }
        }

        for (remote, writer) in &self.links {
            if destination.includes(*remote) && writer.send(data.to_vec()).is_err() {
                // The link task already exited; its Closed event is queued.
                tracing::trace!(%remote, "dropping packet for closing link");
            }
        }
        Ok(())
    }

    fn receive(&mut self) -> Option<Inbound> {
        loop {
            match self.events.try_recv().ok()? {
                LinkEvent::Opened {
                    remote,
                    writer,
                    event,
                } => {
                    self.links.insert(remote, writer);
                    return Some(Inbound::event(remote, event));
                }
                LinkEvent::Data(packet) => {
                    if self.links.contains_key(&packet.source) {
                        return Some(packet);
                    }
                }
                LinkEvent::Closed { remote, event } => {
                    if self.links.remove(&remote).is_some() {
                        return Some(Inbound::event(remote, event));
                    }
                }
                LinkEvent::Refused { remote } => {
                    self.links.remove(&remote);
                    return Some(Inbound::event(
                        remote,
                        TransportEvent::NoFreeIncomingConnections,
                    ));
                }
            }
        }
    }
}

impl Drop for WebSocketPeer {
    fn drop(&mut self) {
        if let Some(task) = self.accept_task.take() {
            task.abort();
        }
    }
}

async fn accept_loop(
    listener: TcpListener,
    config: WebSocketConfig,
    events: mpsc::UnboundedSender<LinkEvent>,
) {
    let open = Arc::new(AtomicUsize::new(0));

    loop {
        let (stream, sock) = match listener.accept().await {
            Ok(accepted) => accepted,
            Err(e) => {
                tracing::error!(error = %e, "accept failed");
                continue;
            }
        };

        let mut ws = match tokio_tungstenite::accept_async(stream).await {
            Ok(ws) => ws,
            Err(e) => {
                tracing::debug!(%sock, error = %e, "WebSocket handshake failed");
                continue;
            }
        };

        if open.load(Ordering::Relaxed) >= config.max_clients {
            tracing::info!(%sock, "refusing connection, server is full");
            let refusal = vec![TransportEvent::NoFreeIncomingConnections.tag()];
            let _ = ws.send(Message::Binary(refusal.into())).await;
            let _ = ws.close(None).await;
            continue;
        }

        open.fetch_add(1, Ordering::Relaxed);
        let remote = PeerAddr::from(sock);
        tracing::debug!(%remote, "accepted WebSocket connection");
        tokio::spawn(run_link(
            ws,
            remote,
            TransportEvent::NewIncomingConnection,
            events.clone(),
            Some(Arc::clone(&open)),
        ));

        if events.is_closed() {
            break;
        }
    }
}

/// Pumps one connection until either side closes it.
async fn run_link<S>(
    ws: WebSocketStream<S>,
    remote: PeerAddr,
    opened: TransportEvent,
    events: mpsc::UnboundedSender<LinkEvent>,
    open_count: Option<Arc<AtomicUsize>>,
) where
    S: AsyncRead + AsyncWrite + Unpin + Send + 'static,
{
    let (writer_tx, mut writer_rx) = mpsc::unbounded_channel::<Vec<u8>>();
    let (mut sink, mut stream) = ws.split();

    let _ = events.send(LinkEvent::Opened {
        remote,
        writer: writer_tx,
        event: opened,
    });

    let closed = loop {
        tokio::select! {
            outgoing = writer_rx.recv() => match outgoing {
                Some(data) => {
                    if let Err(e) = sink.send(Message::Binary(data.into())).await {
                        tracing::debug!(%remote, error = %e, "send failed");
                        break Some(TransportEvent::ConnectionLost);
                    }
                }
                None => {
                    // Closed locally.
                    let _ = sink.close().await;
                    break None;
                }
            },
            incoming = stream.next() => match incoming {
                Some(Ok(Message::Binary(data))) => {
                    let packet = Inbound { source: remote, data: data.to_vec() };
                    if is_refusal(&packet.data) && opened == TransportEvent::ConnectionRequestAccepted {
                        let _ = events.send(LinkEvent::Refused { remote });
                        break None;
                    }
                    let _ = events.send(LinkEvent::Data(packet));
                }
                Some(Ok(Message::Close(_))) | None => {
                    break Some(TransportEvent::DisconnectionNotification);
                }
                Some(Ok(_)) => {} // skip text/ping/pong/frame
                Some(Err(e)) => {
                    tracing::debug!(%remote, error = %e, "recv error");
                    break Some(TransportEvent::ConnectionLost);
                }
            },
        }
    };

    if let Some(event) = closed {
        let _ = events.send(LinkEvent::Closed { remote, event });
    }
    if let Some(count) = open_count {
        count.fetch_sub(1, Ordering::Relaxed);
    }
    tracing::debug!(%remote, "WebSocket link finished");
}

fn is_refusal(data: &[u8]) -> bool {
    data == [TransportEvent::NoFreeIncomingConnections.tag()]
}
