//! Error types for the protocol layer.
//!
//! Every failure here is local to one packet: the caller drops the rest of
//! that buffer and carries on with the next one.

/// Errors that can occur while encoding or decoding packets.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ProtocolError {
    /// The buffer ended before a field was complete.
    #[error("truncated {field}: need {needed} bytes, {available} left")]
    Truncated {
        field: &'static str,
        needed: usize,
        available: usize,
    },

    /// A batch held a different number of messages than its header
    /// declared. `trailing` is the number of bytes left over after the
    /// last message that was decoded.
    #[error(
        "batch declared {declared} messages but held {decoded} \
         ({trailing} trailing bytes)"
    )]
    CountMismatch {
        declared: u32,
        decoded: u32,
        trailing: usize,
    },

    /// A field decoded to a value outside its domain (a move that is
    /// neither stand nor hit, a card rank of 12, invalid UTF-8).
    #[error("malformed {field}: {reason}")]
    Malformed {
        field: &'static str,
        reason: String,
    },

    /// The tag is not in the registry and the receiver is configured to
    /// reject unknown tags.
    #[error("unknown message type 0x{0:02X}")]
    UnknownType(u8),

    /// A tag was used where it is not allowed, e.g. a notification built
    /// with a tag that belongs to a payload-carrying message.
    #[error("tag 0x{0:02X} is not valid here")]
    InvalidTag(u8),

    /// The batch holds more messages than the configured limit.
    #[error("batch of {count} messages exceeds limit of {max}")]
    BatchTooLarge { count: usize, max: u32 },

    /// A string is longer than the configured limit.
    #[error("string of {len} bytes exceeds limit of {max}")]
    StringTooLong { len: usize, max: usize },
}

impl ProtocolError {
    pub(crate) fn malformed(field: &'static str, reason: impl Into<String>) -> Self {
        Self::Malformed {
            field,
            reason: reason.into(),
        }
    }
}
