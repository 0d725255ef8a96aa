//! Tag → decoder lookup.
//!
//! The registry is a flat 256-entry table indexed by tag. Lookup is one
//! array index and never fails.

use std::fmt;

use crate::codec::{decode_extension, WirePayload};
use crate::config::UnknownTagPolicy;
use crate::message::{
    tag, DisplayNameChange, MessageBody, Notification, PlayerActiveOrder,
    PlayerCardDrawn, PlayerChat, PlayerJoinGameRequest, PlayerMove,
    PlayerSpectatorChoice, Timestamp,
};
use crate::wire::WireReader;
use crate::ProtocolError;

/// Reads one payload whose tag is already consumed.
pub type DecodeFn = fn(&mut WireReader<'_>) -> Result<MessageBody, ProtocolError>;

/// How a tag is decoded.
#[derive(Clone, Copy)]
pub enum Entry {
    /// A fixed-layout payload follows the tag.
    Payload(DecodeFn),
    /// A known zero-width tag.
    Notification,
    /// A length-prefixed extension payload follows the tag.
    Extension,
    /// The batch header. Never valid inside a batch.
    Batch,
    /// Never registered. Treated as zero-width unless the policy rejects it.
    Unknown,
}

impl fmt::Debug for Entry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Payload(_) => f.write_str("Payload"),
            Self::Notification => f.write_str("Notification"),
            Self::Extension => f.write_str("Extension"),
            Self::Batch => f.write_str("Batch"),
            Self::Unknown => f.write_str("Unknown"),
        }
    }
}

fn decode_as<T>(r: &mut WireReader<'_>) -> Result<MessageBody, ProtocolError>
where
    T: WirePayload + Into<MessageBody>,
{
    T::decode_body(r).map(Into::into)
}

/// Maps every tag to its [`Entry`].
#[derive(Clone)]
pub struct Registry {
    entries: [Entry; 256],
}

impl Registry {
    /// A registry that knows nothing. Every tag except the extension range
    /// and the batch header resolves to [`Entry::Unknown`].
    pub fn empty() -> Self {
        let mut entries = [Entry::Unknown; 256];
        for t in tag::EXTENSION_START..=u8::MAX {
            entries[usize::from(t)] = Entry::Extension;
        }
        entries[usize::from(tag::PACKAGED_PACKET)] = Entry::Batch;
        Self { entries }
    }

    /// The full catalog: every payload shape, the transport events, and
    /// `GAME_START`.
    pub fn standard() -> Self {
        let mut registry = Self::empty();
        registry.register::<Timestamp>();
        registry.register::<DisplayNameChange>();
        registry.register::<PlayerMove>();
        registry.register::<PlayerCardDrawn>();
        registry.register::<PlayerJoinGameRequest>();
        registry.register::<PlayerChat>();
        registry.register::<PlayerSpectatorChoice>();
        registry.register::<PlayerActiveOrder>();
        for event in blackjack_transport::TransportEvent::ALL {
            registry.register_notification(event.tag());
        }
        registry.register_notification(tag::GAME_START);
        registry
    }

    /// Installs the decoder for `T` under `T::TAG`.
    pub fn register<T>(&mut self)
    where
        T: WirePayload + Into<MessageBody>,
    {
        self.entries[usize::from(T::TAG)] = Entry::Payload(decode_as::<T>);
    }

    /// Marks `tag` as a known zero-width notification. Tags that can't be
    /// notifications are ignored with a warning.
    pub fn register_notification(&mut self, tag: u8) {
        if Notification::try_new(tag).is_err() {
            tracing::warn!(tag, "tag cannot be a notification, not registering");
            return;
        }
        self.entries[usize::from(tag)] = Entry::Notification;
    }

    pub fn resolve(&self, tag: u8) -> Entry {
        self.entries[usize::from(tag)]
    }

    /// Returns `true` if the tag resolves to anything but
    /// [`Entry::Unknown`].
    pub fn is_known(&self, tag: u8) -> bool {
        !matches!(self.resolve(tag), Entry::Unknown)
    }

    /// Decodes the payload for `tag`. The tag byte is already consumed.
    pub fn decode_body(
        &self,
        tag: u8,
        r: &mut WireReader<'_>,
        policy: UnknownTagPolicy,
    ) -> Result<MessageBody, ProtocolError> {
        match self.resolve(tag) {
            Entry::Payload(decode) => decode(r),
            Entry::Notification => Ok(MessageBody::Notification(Notification::try_new(tag)?)),
            Entry::Extension => decode_extension(tag, r).map(MessageBody::Extension),
            Entry::Batch => Err(ProtocolError::malformed("tag", "nested batch header")),
            Entry::Unknown => match policy {
                UnknownTagPolicy::Notify => {
                    tracing::debug!(tag, "unknown tag, decoding as notification");
                    // Unknown tags outside the payload set are zero-width.
                    Notification::try_new(tag).map(MessageBody::Notification)
                }
                UnknownTagPolicy::Reject => Err(ProtocolError::UnknownType(tag)),
            },
        }
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::standard()
    }
}

impl fmt::Debug for Registry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let known = (0..=u8::MAX).filter(|t| self.is_known(*t)).count();
        f.debug_struct("Registry").field("known_tags", &known).finish()
    }
}
