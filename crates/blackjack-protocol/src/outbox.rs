//! Outbound side: queue messages during a tick, send packets at the end.
//!
//! Messages pushed to the [`Outbox`] are grouped by destination and
//! reliability class. Each group becomes one batch, so a tick that sends
//! five messages to the same player costs one packet.

use std::collections::HashMap;

use blackjack_transport::{Destination, Reliability};

use crate::framer::Framer;
use crate::message::{tag, Message};

/// A framed packet ready for `Peer::send`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OutboundPacket {
    pub destination: Destination,
    pub reliability: Reliability,
    pub data: Vec<u8>,
}

#[derive(Debug, Default)]
pub struct Outbox {
    pending: Vec<(Destination, Reliability, Message)>,
}

impl Outbox {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, destination: Destination, reliability: Reliability, message: Message) {
        self.pending.push((destination, reliability, message));
    }

    pub fn len(&self) -> usize {
        self.pending.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pending.is_empty()
    }

    /// Discards everything queued.
    pub fn clear(&mut self) {
        self.pending.clear();
    }

    /// Empties the outbox into framed packets.
    ///
    /// Groups come out in the order their first message was pushed, and
    /// messages keep their push order inside a group. A group larger than
    /// `max_batch_messages` is cut into consecutive batches. A message
    /// that fails to encode is logged and skipped; the rest of its group
    /// still goes out.
    pub fn drain_batches(&mut self, framer: &Framer) -> Vec<OutboundPacket> {
        let mut order: Vec<(Destination, Reliability)> = Vec::new();
        let mut groups: HashMap<(Destination, Reliability), Vec<Vec<u8>>> = HashMap::new();

        for (destination, reliability, message) in self.pending.drain(..) {
            let encoded = match framer.encode_message(&message) {
                Ok(bytes) => bytes,
                Err(e) => {
                    tracing::warn!(
                        tag = message.tag(),
                        ?destination,
                        error = %e,
                        "dropping message that failed to encode"
                    );
                    continue;
                }
            };
            let key = (destination, reliability);
            groups
                .entry(key)
                .or_insert_with(|| {
                    order.push(key);
                    Vec::new()
                })
                .push(encoded);
        }

        let config = framer.config();
        let chunk_size = config.max_batch_messages as usize;
        let mut packets = Vec::new();

        for key in order {
            let Some(parts) = groups.remove(&key) else {
                continue;
            };
            let (destination, reliability) = key;

            // A lone timestamp still needs a batch header to be decodable.
            let bare_stamp = parts.len() == 1 && parts[0].first() == Some(&tag::TIMESTAMP);
            if config.unbatched_singletons && parts.len() == 1 && !bare_stamp {
                packets.extend(parts.into_iter().map(|data| OutboundPacket {
                    destination,
                    reliability,
                    data,
                }));
                continue;
            }

            for chunk in parts.chunks(chunk_size) {
                match framer.frame_encoded(chunk) {
                    Ok(data) => packets.push(OutboundPacket {
                        destination,
                        reliability,
                        data,
                    }),
                    Err(e) => {
                        tracing::warn!(?destination, error = %e, "dropping batch");
                    }
                }
            }
        }

        packets
    }
}
