//! Inbound side: raw packets in, owned messages out.
//!
//! The dispatcher owns the inbound queue. Each call to
//! [`Dispatcher::dispatch`] decodes one packet and appends its messages;
//! [`Dispatcher::poll_inbound`] hands the whole queue to the application
//! and leaves it empty. Messages are moved, never shared.

use std::collections::VecDeque;

use blackjack_transport::PeerAddr;

use crate::framer::Framer;
use crate::message::Message;
use crate::{ProtocolConfig, ProtocolError};

/// Running counters, mostly for logs and tests.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DispatchStats {
    /// Packets handed to `dispatch`.
    pub packets: u64,
    /// Messages enqueued, including those from packets that later failed.
    pub messages: u64,
    /// Packets that failed to decode completely.
    pub dropped_packets: u64,
}

#[derive(Debug, Default)]
pub struct Dispatcher {
    framer: Framer,
    inbound: VecDeque<Message>,
    stats: DispatchStats,
}

impl Dispatcher {
    pub fn new(config: ProtocolConfig) -> Self {
        Self::with_framer(Framer::new(config))
    }

    pub fn with_framer(framer: Framer) -> Self {
        Self {
            framer,
            inbound: VecDeque::new(),
            stats: DispatchStats::default(),
        }
    }

    pub fn framer(&self) -> &Framer {
        &self.framer
    }

    /// Decodes `data` from `sender` into the inbound queue.
    ///
    /// Returns how many messages were enqueued. On error the packet is
    /// dropped from the failing message onward, but whatever decoded
    /// before it stays queued.
    pub fn dispatch(&mut self, data: &[u8], sender: PeerAddr) -> Result<usize, ProtocolError> {
        self.stats.packets += 1;
        let before = self.inbound.len();

        match self.framer.unframe_into(data, sender, &mut self.inbound) {
            Ok(count) => {
                self.stats.messages += count as u64;
                tracing::trace!(%sender, count, "dispatched packet");
                Ok(count)
            }
            Err(e) => {
                let kept = self.inbound.len() - before;
                self.stats.messages += kept as u64;
                self.stats.dropped_packets += 1;
                tracing::debug!(
                    %sender,
                    kept,
                    len = data.len(),
                    error = %e,
                    "dropping corrupt packet"
                );
                Err(e)
            }
        }
    }

    /// Takes every queued message, oldest first.
    pub fn poll_inbound(&mut self) -> Vec<Message> {
        self.inbound.drain(..).collect()
    }

    /// Messages waiting to be polled.
    pub fn pending(&self) -> usize {
        self.inbound.len()
    }

    pub fn stats(&self) -> DispatchStats {
        self.stats
    }
}
