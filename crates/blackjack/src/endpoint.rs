//! One peer's message loop: transport in, messages out, batches back.
//!
//! An [`Endpoint`] owns a [`Peer`] and the protocol state around it. A
//! tick has three phases, always in this order:
//!
//! 1. **Input**: [`Endpoint::poll_transport`] drains every packet the
//!    transport has and decodes it into the inbound queue.
//! 2. **Update**: the application takes [`Endpoint::poll_inbound`],
//!    applies it, and queues replies with [`Endpoint::enqueue_outbound`].
//! 3. **Output**: [`Endpoint::flush`] batches the queued replies per
//!    destination and hands them to the transport.
//!
//! Nothing here blocks or locks. Servers and clients both use it.

use blackjack_protocol::{
    DispatchStats, Dispatcher, Framer, Message, Outbox, ProtocolConfig,
};
use blackjack_transport::{Destination, Peer, PeerAddr, Reliability};

pub struct Endpoint<P: Peer> {
    peer: P,
    dispatcher: Dispatcher,
    outbox: Outbox,
}

impl<P: Peer> Endpoint<P> {
    pub fn new(peer: P, config: ProtocolConfig) -> Self {
        let config = config.validated();
        Self {
            peer,
            dispatcher: Dispatcher::new(config),
            outbox: Outbox::new(),
        }
    }

    pub fn local_addr(&self) -> PeerAddr {
        self.peer.local_addr()
    }

    pub fn peer(&self) -> &P {
        &self.peer
    }

    pub fn peer_mut(&mut self) -> &mut P {
        &mut self.peer
    }

    pub fn framer(&self) -> &Framer {
        self.dispatcher.framer()
    }

    pub fn stats(&self) -> DispatchStats {
        self.dispatcher.stats()
    }

    // -----------------------------------------------------------------------
    // Input phase
    // -----------------------------------------------------------------------

    /// Decodes everything the transport has buffered.
    ///
    /// Returns the number of packets read. Malformed packets are dropped
    /// by the dispatcher; messages decoded before the fault stay queued.
    pub fn poll_transport(&mut self) -> usize {
        let mut packets = 0;
        while let Some(inbound) = self.peer.receive() {
            packets += 1;
            // Failures are logged and counted by the dispatcher.
            let _ = self.dispatcher.dispatch(&inbound.data, inbound.source);
        }
        packets
    }

    /// Takes every decoded message, oldest first.
    pub fn poll_inbound(&mut self) -> Vec<Message> {
        self.dispatcher.poll_inbound()
    }

    // -----------------------------------------------------------------------
    // Output phase
    // -----------------------------------------------------------------------

    /// Queues `message` for the next flush, reliable and ordered.
    pub fn enqueue_outbound(&mut self, destination: Destination, message: Message) {
        self.enqueue_outbound_with(destination, Reliability::ReliableOrdered, message);
    }

    pub fn enqueue_outbound_with(
        &mut self,
        destination: Destination,
        reliability: Reliability,
        message: Message,
    ) {
        self.outbox.push(destination, reliability, message);
    }

    /// Messages waiting for the next flush.
    pub fn queued(&self) -> usize {
        self.outbox.len()
    }

    /// Drops everything queued since the last flush and returns how many
    /// messages were dropped.
    pub fn discard_outbound(&mut self) -> usize {
        let dropped = self.outbox.len();
        self.outbox.clear();
        if dropped > 0 {
            tracing::debug!(messages = dropped, "discarded outbound queue");
        }
        dropped
    }

    /// Encodes the queued messages and sends them.
    ///
    /// Returns how many packets the transport accepted. A failed send
    /// only loses that packet: the usual cause is a peer that left during
    /// this tick, and its disconnect event is already on the way.
    pub fn flush(&mut self) -> usize {
        let packets = self.outbox.drain_batches(self.dispatcher.framer());
        let mut sent = 0;
        for packet in packets {
            match self
                .peer
                .send(&packet.data, packet.destination, packet.reliability)
            {
                Ok(()) => sent += 1,
                Err(e) => tracing::debug!(
                    destination = ?packet.destination,
                    error = %e,
                    "dropping outbound packet"
                ),
            }
        }
        if sent > 0 {
            tracing::trace!(packets = sent, "flushed");
        }
        sent
    }
}
