//! Packet framing: many messages in, one buffer out, and back.
//!
//! ## Packet layouts
//!
//! ```text
//! batch       [0x86][count: u32][msg 1][msg 2]...[msg count]
//! single      [msg]
//! stamped     [0x1B][millis: u64][msg]
//! ```
//!
//! Each `msg` is `[tag][payload]` with no length in front. The only way to
//! find where one ends is to decode it, which is why a bad message
//! poisons the rest of its packet.

use std::collections::VecDeque;

use blackjack_transport::PeerAddr;

use crate::codec::encode_message;
use crate::message::{tag, Message, MessageBody, Timestamp};
use crate::registry::Registry;
use crate::wire::{WireReader, WireWriter};
use crate::{ProtocolConfig, ProtocolError};

/// Encodes and decodes whole packets.
#[derive(Debug, Clone, Default)]
pub struct Framer {
    registry: Registry,
    config: ProtocolConfig,
}

impl Framer {
    /// A framer with the standard registry.
    pub fn new(config: ProtocolConfig) -> Self {
        Self::with_registry(Registry::standard(), config)
    }

    pub fn with_registry(registry: Registry, config: ProtocolConfig) -> Self {
        Self {
            registry,
            config: config.validated(),
        }
    }

    pub fn config(&self) -> &ProtocolConfig {
        &self.config
    }

    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    // -----------------------------------------------------------------------
    // Encoding
    // -----------------------------------------------------------------------

    fn writer(&self) -> WireWriter {
        WireWriter::new(self.config.max_string_len)
    }

    /// Encodes one message as `[tag][payload]`.
    pub fn encode_message(&self, message: &Message) -> Result<Vec<u8>, ProtocolError> {
        let mut w = self.writer();
        encode_message(message.body(), &mut w)?;
        Ok(w.into_bytes())
    }

    /// Writes the batch header followed by every message, in order.
    ///
    /// # Errors
    /// `BatchTooLarge` if there are more messages than
    /// `max_batch_messages`, or the first encoding error hit.
    pub fn frame(&self, messages: &[Message]) -> Result<Vec<u8>, ProtocolError> {
        let count = self.batch_count(messages.len())?;
        let mut w = self.writer();
        w.put_u8(tag::PACKAGED_PACKET);
        w.put_u32(count);
        for message in messages {
            encode_message(message.body(), &mut w)?;
        }
        Ok(w.into_bytes())
    }

    /// Builds a batch out of messages that are already encoded.
    pub(crate) fn frame_encoded(&self, parts: &[Vec<u8>]) -> Result<Vec<u8>, ProtocolError> {
        let count = self.batch_count(parts.len())?;
        let mut w = self.writer();
        w.put_u8(tag::PACKAGED_PACKET);
        w.put_u32(count);
        for part in parts {
            w.put_raw(part);
        }
        Ok(w.into_bytes())
    }

    fn batch_count(&self, len: usize) -> Result<u32, ProtocolError> {
        let max = self.config.max_batch_messages;
        u32::try_from(len)
            .ok()
            .filter(|count| *count <= max)
            .ok_or(ProtocolError::BatchTooLarge { count: len, max })
    }

    /// Encodes one message with no batch header.
    ///
    /// A bare [`Timestamp`] is the exception: unbatched, it would read as
    /// the prefix of a missing message, so it goes out as a batch of one.
    pub fn encode_single(&self, message: &Message) -> Result<Vec<u8>, ProtocolError> {
        if matches!(message.body(), MessageBody::Timestamp(_)) {
            return self.frame(std::slice::from_ref(message));
        }
        self.encode_message(message)
    }

    /// Encodes `message` behind a timestamp, unbatched.
    pub fn encode_timestamped(
        &self,
        time: Timestamp,
        message: &Message,
    ) -> Result<Vec<u8>, ProtocolError> {
        let mut w = self.writer();
        encode_message(&MessageBody::Timestamp(time), &mut w)?;
        encode_message(message.body(), &mut w)?;
        Ok(w.into_bytes())
    }

    // -----------------------------------------------------------------------
    // Decoding
    // -----------------------------------------------------------------------

    /// Decodes a whole packet. All or nothing: on error no messages are
    /// returned.
    pub fn unframe(&self, data: &[u8], sender: PeerAddr) -> Result<Vec<Message>, ProtocolError> {
        let mut out = VecDeque::new();
        self.unframe_into(data, sender, &mut out)?;
        Ok(out.into())
    }

    /// Decodes a packet, pushing each message onto `out` as soon as it is
    /// complete. Every message gets `sender` attached.
    ///
    /// Stops at the first failure. Messages pushed before the failure stay
    /// in `out`. Returns the number of messages pushed.
    pub fn unframe_into(
        &self,
        data: &[u8],
        sender: PeerAddr,
        out: &mut VecDeque<Message>,
    ) -> Result<usize, ProtocolError> {
        let mut r = WireReader::new(data, self.config.max_string_len);
        let first = r.read_u8("tag")?;

        if first != tag::PACKAGED_PACKET {
            return self.unframe_single(first, &mut r, sender, out);
        }

        let declared = r.read_u32("batch count")?;
        if declared > self.config.max_batch_messages {
            return Err(ProtocolError::BatchTooLarge {
                count: declared as usize,
                max: self.config.max_batch_messages,
            });
        }

        let mut decoded = 0u32;
        while decoded < declared {
            if r.is_empty() {
                return Err(ProtocolError::CountMismatch {
                    declared,
                    decoded,
                    trailing: 0,
                });
            }
            let next = r.read_u8("tag")?;
            out.push_back(self.decode_one(next, &mut r, sender)?);
            decoded += 1;
        }

        if !r.is_empty() {
            return Err(ProtocolError::CountMismatch {
                declared,
                decoded,
                trailing: r.remaining(),
            });
        }
        Ok(decoded as usize)
    }

    fn unframe_single(
        &self,
        first: u8,
        r: &mut WireReader<'_>,
        sender: PeerAddr,
        out: &mut VecDeque<Message>,
    ) -> Result<usize, ProtocolError> {
        let message = self.decode_one(first, r, sender)?;
        let mut count = 1;

        if matches!(message.body(), MessageBody::Timestamp(_)) {
            // An unbatched stamp always prefixes exactly one message.
            let next = r.read_u8("tag")?;
            if next == tag::PACKAGED_PACKET {
                return Err(ProtocolError::malformed("tag", "batch behind a timestamp"));
            }
            let stamped = self.decode_one(next, r, sender)?;
            out.push_back(message);
            out.push_back(stamped);
            count += 1;
        } else {
            out.push_back(message);
        }

        if !r.is_empty() {
            return Err(ProtocolError::malformed(
                "packet",
                format!("{} trailing bytes after unbatched message", r.remaining()),
            ));
        }
        Ok(count)
    }

    fn decode_one(
        &self,
        tag_byte: u8,
        r: &mut WireReader<'_>,
        sender: PeerAddr,
    ) -> Result<Message, ProtocolError> {
        let body = self.registry.decode_body(tag_byte, r, self.config.unknown_tags)?;
        Ok(Message::new(body).received_from(sender))
    }
}
