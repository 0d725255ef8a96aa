//! Bounds-checked primitives for the binary wire format.
//!
//! ```text
//! integers   big-endian, fixed width
//! bool       1 byte, 0 = false, anything else = true
//! string     [len: u32][len bytes of UTF-8, no terminator]
//! sequence   [count: u32][count elements]
//! peer       [PeerAddr::ENCODED_LEN raw bytes]
//! ```
//!
//! Every read checks the remaining length first, so a short buffer turns
//! into [`ProtocolError::Truncated`] instead of a panic or garbage. Length
//! and count prefixes are checked against what is left before anything is
//! allocated.

use blackjack_transport::PeerAddr;
use bytes::{Buf, BufMut};

use crate::ProtocolError;

/// Cursor over an inbound packet.
#[derive(Debug)]
pub struct WireReader<'a> {
    src: &'a [u8],
    max_string_len: usize,
}

impl<'a> WireReader<'a> {
    /// Wraps `src`. Strings longer than `max_string_len` are rejected.
    pub fn new(src: &'a [u8], max_string_len: usize) -> Self {
        Self {
            src,
            max_string_len,
        }
    }

    /// Bytes not read yet.
    pub fn remaining(&self) -> usize {
        self.src.remaining()
    }

    /// Returns `true` once every byte has been consumed.
    pub fn is_empty(&self) -> bool {
        self.src.is_empty()
    }

    fn ensure(&self, needed: usize, field: &'static str) -> Result<(), ProtocolError> {
        let available = self.src.remaining();
        if available < needed {
            Err(ProtocolError::Truncated {
                field,
                needed,
                available,
            })
        } else {
            Ok(())
        }
    }

    pub fn read_u8(&mut self, field: &'static str) -> Result<u8, ProtocolError> {
        self.ensure(1, field)?;
        Ok(self.src.get_u8())
    }

    pub fn read_i16(&mut self, field: &'static str) -> Result<i16, ProtocolError> {
        self.ensure(2, field)?;
        Ok(self.src.get_i16())
    }

    pub fn read_u32(&mut self, field: &'static str) -> Result<u32, ProtocolError> {
        self.ensure(4, field)?;
        Ok(self.src.get_u32())
    }

    pub fn read_u64(&mut self, field: &'static str) -> Result<u64, ProtocolError> {
        self.ensure(8, field)?;
        Ok(self.src.get_u64())
    }

    pub fn read_bool(&mut self, field: &'static str) -> Result<bool, ProtocolError> {
        Ok(self.read_u8(field)? != 0)
    }

    pub fn read_peer(&mut self, field: &'static str) -> Result<PeerAddr, ProtocolError> {
        self.ensure(PeerAddr::ENCODED_LEN, field)?;
        let mut raw = [0u8; PeerAddr::ENCODED_LEN];
        self.src.copy_to_slice(&mut raw);
        Ok(PeerAddr::from_bytes(raw))
    }

    /// Reads a peer handle where [`PeerAddr::UNASSIGNED`] means "nobody".
    pub fn read_optional_peer(
        &mut self,
        field: &'static str,
    ) -> Result<Option<PeerAddr>, ProtocolError> {
        let addr = self.read_peer(field)?;
        Ok((!addr.is_unassigned()).then_some(addr))
    }

    pub fn read_string(&mut self, field: &'static str) -> Result<String, ProtocolError> {
        let len = self.read_u32(field)? as usize;
        if len > self.max_string_len {
            return Err(ProtocolError::StringTooLong {
                len,
                max: self.max_string_len,
            });
        }
        let raw = self.read_bytes(len, field)?;
        String::from_utf8(raw)
            .map_err(|e| ProtocolError::malformed(field, format!("invalid UTF-8: {e}")))
    }

    pub fn read_peer_list(&mut self, field: &'static str) -> Result<Vec<PeerAddr>, ProtocolError> {
        let count = self.read_u32(field)? as usize;
        let needed = count.saturating_mul(PeerAddr::ENCODED_LEN);
        self.ensure(needed, field)?;
        let mut peers = Vec::with_capacity(count);
        for _ in 0..count {
            peers.push(self.read_peer(field)?);
        }
        Ok(peers)
    }

    /// Reads exactly `len` raw bytes.
    pub fn read_bytes(&mut self, len: usize, field: &'static str) -> Result<Vec<u8>, ProtocolError> {
        self.ensure(len, field)?;
        let (head, tail) = self.src.split_at(len);
        self.src = tail;
        Ok(head.to_vec())
    }
}

/// Growable outbound buffer.
#[derive(Debug)]
pub struct WireWriter {
    buf: Vec<u8>,
    max_string_len: usize,
}

impl WireWriter {
    /// Creates an empty writer. Strings longer than `max_string_len` are
    /// refused.
    pub fn new(max_string_len: usize) -> Self {
        Self {
            buf: Vec::new(),
            max_string_len,
        }
    }

    /// Bytes written so far.
    pub fn len(&self) -> usize {
        self.buf.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buf.is_empty()
    }

    /// Consumes the writer and returns the bytes.
    pub fn into_bytes(self) -> Vec<u8> {
        self.buf
    }

    pub fn put_u8(&mut self, value: u8) {
        self.buf.put_u8(value);
    }

    pub fn put_i16(&mut self, value: i16) {
        self.buf.put_i16(value);
    }

    pub fn put_u32(&mut self, value: u32) {
        self.buf.put_u32(value);
    }

    pub fn put_u64(&mut self, value: u64) {
        self.buf.put_u64(value);
    }

    pub fn put_bool(&mut self, value: bool) {
        self.buf.put_u8(u8::from(value));
    }

    pub fn put_peer(&mut self, addr: PeerAddr) {
        self.buf.put_slice(&addr.to_bytes());
    }

    /// Writes `None` as [`PeerAddr::UNASSIGNED`].
    pub fn put_optional_peer(&mut self, addr: Option<PeerAddr>) {
        self.put_peer(addr.unwrap_or(PeerAddr::UNASSIGNED));
    }

    pub fn put_string(&mut self, value: &str) -> Result<(), ProtocolError> {
        if value.len() > self.max_string_len {
            return Err(ProtocolError::StringTooLong {
                len: value.len(),
                max: self.max_string_len,
            });
        }
        self.put_length_prefixed(value.as_bytes(), "string")
    }

    pub fn put_peer_list(&mut self, peers: &[PeerAddr]) -> Result<(), ProtocolError> {
        let count = u32::try_from(peers.len())
            .map_err(|_| ProtocolError::malformed("peer list", "more than u32::MAX entries"))?;
        self.buf.put_u32(count);
        for peer in peers {
            self.put_peer(*peer);
        }
        Ok(())
    }

    /// Writes `[len: u32][bytes]`.
    pub fn put_length_prefixed(
        &mut self,
        bytes: &[u8],
        field: &'static str,
    ) -> Result<(), ProtocolError> {
        let len = u32::try_from(bytes.len())
            .map_err(|_| ProtocolError::malformed(field, "longer than u32::MAX bytes"))?;
        self.buf.put_u32(len);
        self.buf.put_slice(bytes);
        Ok(())
    }

    /// Appends bytes that were already encoded.
    pub fn put_raw(&mut self, bytes: &[u8]) {
        self.buf.put_slice(bytes);
    }
}
