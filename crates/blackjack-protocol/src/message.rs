//! The message catalog: every shape that can travel between peers.
//!
//! A [`Message`] is a [`MessageBody`] plus the sender handle the decoder
//! attaches on receipt. The body is a closed enum, so every consumer
//! matches exhaustively and the compiler points out each place that needs
//! updating when a variant is added.
//!
//! The wire tag is never stored separately from the payload. It is derived
//! from the variant (notifications and extensions carry theirs inside), so
//! a message can't claim one shape and encode another.

use std::time::{SystemTime, UNIX_EPOCH};

use blackjack_transport::{PeerAddr, TransportEvent};

use crate::ProtocolError;

// ---------------------------------------------------------------------------
// Tags
// ---------------------------------------------------------------------------

/// Wire tags.
///
/// `0x00..0x86` is shared with the transport (connection events,
/// timestamps). Application messages start right after the batch tag.
/// `0xC0..=0xFF` is reserved for length-prefixed extensions.
pub mod tag {
    pub const CONNECTION_REQUEST_ACCEPTED: u8 = 0x10;
    pub const NEW_INCOMING_CONNECTION: u8 = 0x11;
    pub const NO_FREE_INCOMING_CONNECTIONS: u8 = 0x12;
    pub const DISCONNECTION_NOTIFICATION: u8 = 0x13;
    pub const CONNECTION_LOST: u8 = 0x14;
    pub const TIMESTAMP: u8 = 0x1B;

    /// Header of a batch packet.
    pub const PACKAGED_PACKET: u8 = 0x86;

    pub const DISPLAY_NAME_CHANGE: u8 = 0x87;
    pub const PLAYER_MOVE: u8 = 0x88;
    pub const PLAYER_CARD_DRAWN: u8 = 0x89;
    pub const PLAYER_JOIN_GAME_REQUEST: u8 = 0x8A;
    pub const PLAYER_CHAT: u8 = 0x8B;
    pub const PLAYER_SPECTATOR_CHOICE: u8 = 0x8C;
    pub const GAME_START: u8 = 0x8D;
    pub const PLAYER_ACTIVE_ORDER: u8 = 0x8E;

    /// First tag of the extension range.
    pub const EXTENSION_START: u8 = 0xC0;

    /// Returns `true` for tags in `0xC0..=0xFF`.
    pub const fn is_extension(tag: u8) -> bool {
        tag >= EXTENSION_START
    }

    /// Returns `true` for tags whose messages carry a fixed payload.
    pub const fn has_payload(tag: u8) -> bool {
        matches!(
            tag,
            TIMESTAMP
                | DISPLAY_NAME_CHANGE
                | PLAYER_MOVE
                | PLAYER_CARD_DRAWN
                | PLAYER_JOIN_GAME_REQUEST
                | PLAYER_CHAT
                | PLAYER_SPECTATOR_CHOICE
                | PLAYER_ACTIVE_ORDER
        )
    }
}

// ---------------------------------------------------------------------------
// Payload-free shapes
// ---------------------------------------------------------------------------

/// A message that is nothing but its tag.
///
/// Used for transport events, `GAME_START`, and for tags this build does
/// not recognize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Notification {
    tag: u8,
}

impl Notification {
    /// Sent to a table when a round begins.
    pub const GAME_START: Notification = Notification {
        tag: tag::GAME_START,
    };

    /// Builds a notification for `tag`.
    ///
    /// # Errors
    /// `InvalidTag` if the tag belongs to a payload-carrying message, the
    /// batch header, or the extension range. Encoding any of those with no
    /// payload would desync the receiver.
    pub fn try_new(tag: u8) -> Result<Self, ProtocolError> {
        if tag::has_payload(tag) || tag == tag::PACKAGED_PACKET || tag::is_extension(tag) {
            return Err(ProtocolError::InvalidTag(tag));
        }
        Ok(Self { tag })
    }

    pub fn tag(&self) -> u8 {
        self.tag
    }

    /// The transport event this notification reports, if any.
    pub fn transport_event(&self) -> Option<TransportEvent> {
        TransportEvent::from_tag(self.tag)
    }
}

impl From<TransportEvent> for Notification {
    fn from(event: TransportEvent) -> Self {
        Self { tag: event.tag() }
    }
}

/// A message in the extension range: a tag plus opaque bytes.
///
/// Receivers that don't understand the tag still decode it (the payload is
/// length-prefixed), so newer peers can talk to older ones.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Extension {
    tag: u8,
    payload: Vec<u8>,
}

impl Extension {
    /// # Errors
    /// `InvalidTag` if `tag` is below [`tag::EXTENSION_START`].
    pub fn new(tag: u8, payload: Vec<u8>) -> Result<Self, ProtocolError> {
        if !tag::is_extension(tag) {
            return Err(ProtocolError::InvalidTag(tag));
        }
        Ok(Self { tag, payload })
    }

    pub fn tag(&self) -> u8 {
        self.tag
    }

    pub fn payload(&self) -> &[u8] {
        &self.payload
    }
}

// ---------------------------------------------------------------------------
// Payload shapes
// ---------------------------------------------------------------------------

/// Milliseconds since the Unix epoch, as stamped by the sender.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Timestamp {
    pub millis: u64,
}

impl Timestamp {
    pub fn now() -> Self {
        let millis = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .unwrap_or_default()
            .as_millis();
        Self {
            millis: u64::try_from(millis).unwrap_or(u64::MAX),
        }
    }
}

/// A player announcing (or the server relaying) a new display name.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DisplayNameChange {
    pub player: PeerAddr,
    pub name: String,
}

/// What a player wants to do on their turn.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum PlayerAction {
    Stand,
    Hit,
}

impl PlayerAction {
    /// The `i16` carried on the wire.
    pub const fn to_wire(self) -> i16 {
        match self {
            Self::Stand => 0,
            Self::Hit => 1,
        }
    }

    pub const fn from_wire(value: i16) -> Option<Self> {
        match value {
            0 => Some(Self::Stand),
            1 => Some(Self::Hit),
            _ => None,
        }
    }
}

/// A move made by `player`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerMove {
    pub player: PeerAddr,
    pub action: PlayerAction,
}

impl PlayerMove {
    pub fn hit(player: PeerAddr) -> Self {
        Self {
            player,
            action: PlayerAction::Hit,
        }
    }

    pub fn stand(player: PeerAddr) -> Self {
        Self {
            player,
            action: PlayerAction::Stand,
        }
    }
}

/// Blackjack value of a card: 1 (ace) through 10 (ten and face cards).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct CardRank(u8);

impl CardRank {
    pub const MIN: u8 = 1;
    pub const MAX: u8 = 10;
    pub const ACE: CardRank = CardRank(1);

    /// Returns `None` outside `1..=10`.
    pub const fn new(value: u8) -> Option<Self> {
        if value >= Self::MIN && value <= Self::MAX {
            Some(Self(value))
        } else {
            None
        }
    }

    pub const fn value(self) -> u8 {
        self.0
    }

    pub const fn is_ace(self) -> bool {
        self.0 == Self::MIN
    }
}

/// A card dealt to a player, or to the dealer when `player` is `None`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerCardDrawn {
    pub player: Option<PeerAddr>,
    pub rank: CardRank,
}

impl PlayerCardDrawn {
    pub fn to_player(player: PeerAddr, rank: CardRank) -> Self {
        Self {
            player: Some(player),
            rank,
        }
    }

    pub fn dealer(rank: CardRank) -> Self {
        Self { player: None, rank }
    }
}

/// A request to sit at table `game`, or to go back to the lobby.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerJoinGameRequest {
    pub game: i16,
}

impl PlayerJoinGameRequest {
    /// Wire value meaning "leave my table".
    pub const LOBBY: i16 = -1;

    pub fn table(index: u16) -> Self {
        Self {
            game: i16::try_from(index).unwrap_or(i16::MAX),
        }
    }

    pub fn lobby() -> Self {
        Self { game: Self::LOBBY }
    }

    /// The requested table index, or `None` for a return to the lobby.
    ///
    /// Every negative value is read as "lobby".
    pub fn table_index(&self) -> Option<usize> {
        usize::try_from(self.game).ok()
    }
}

/// A chat line. `receiver == None` is a broadcast.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PlayerChat {
    pub receiver: Option<PeerAddr>,
    pub text: String,
}

impl PlayerChat {
    pub fn broadcast(text: impl Into<String>) -> Self {
        Self {
            receiver: None,
            text: text.into(),
        }
    }

    pub fn private(receiver: PeerAddr, text: impl Into<String>) -> Self {
        Self {
            receiver: Some(receiver),
            text: text.into(),
        }
    }
}

/// Whether the sender wants to watch rather than play.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct PlayerSpectatorChoice {
    pub spectate: bool,
}

/// Turn order at a table. `active[0]` plays first.
#[derive(Debug, Clone, Default, PartialEq, Eq, Hash)]
pub struct PlayerActiveOrder {
    pub active: Vec<PeerAddr>,
    pub spectators: Vec<PeerAddr>,
}

// ---------------------------------------------------------------------------
// MessageBody / Message
// ---------------------------------------------------------------------------

/// Every shape a message can have.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum MessageBody {
    Notification(Notification),
    Timestamp(Timestamp),
    DisplayNameChange(DisplayNameChange),
    PlayerMove(PlayerMove),
    PlayerCardDrawn(PlayerCardDrawn),
    PlayerJoinGameRequest(PlayerJoinGameRequest),
    PlayerChat(PlayerChat),
    PlayerSpectatorChoice(PlayerSpectatorChoice),
    PlayerActiveOrder(PlayerActiveOrder),
    Extension(Extension),
}

impl MessageBody {
    /// The tag this body is encoded under.
    pub fn tag(&self) -> u8 {
        match self {
            Self::Notification(n) => n.tag(),
            Self::Timestamp(_) => tag::TIMESTAMP,
            Self::DisplayNameChange(_) => tag::DISPLAY_NAME_CHANGE,
            Self::PlayerMove(_) => tag::PLAYER_MOVE,
            Self::PlayerCardDrawn(_) => tag::PLAYER_CARD_DRAWN,
            Self::PlayerJoinGameRequest(_) => tag::PLAYER_JOIN_GAME_REQUEST,
            Self::PlayerChat(_) => tag::PLAYER_CHAT,
            Self::PlayerSpectatorChoice(_) => tag::PLAYER_SPECTATOR_CHOICE,
            Self::PlayerActiveOrder(_) => tag::PLAYER_ACTIVE_ORDER,
            Self::Extension(e) => e.tag(),
        }
    }
}

/// A decoded or locally built message.
///
/// `sender` is only ever set by the decoder. Messages you build yourself
/// have none; the receiver learns who you are from the transport.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct Message {
    sender: Option<PeerAddr>,
    body: MessageBody,
}

impl Message {
    pub fn new(body: impl Into<MessageBody>) -> Self {
        Self {
            sender: None,
            body: body.into(),
        }
    }

    pub fn tag(&self) -> u8 {
        self.body.tag()
    }

    /// Who sent this message, if it came off the wire.
    pub fn sender(&self) -> Option<PeerAddr> {
        self.sender
    }

    pub fn body(&self) -> &MessageBody {
        &self.body
    }

    pub fn into_body(self) -> MessageBody {
        self.body
    }

    /// Shortcut for matching connection events.
    pub fn transport_event(&self) -> Option<TransportEvent> {
        match &self.body {
            MessageBody::Notification(n) => n.transport_event(),
            _ => None,
        }
    }

    pub(crate) fn received_from(mut self, sender: PeerAddr) -> Self {
        self.sender = Some(sender);
        self
    }
}

impl From<MessageBody> for Message {
    fn from(body: MessageBody) -> Self {
        Self::new(body)
    }
}

macro_rules! impl_into_message {
    ($($variant:ident),* $(,)?) => {
        $(
            impl From<$variant> for MessageBody {
                fn from(value: $variant) -> Self {
                    MessageBody::$variant(value)
                }
            }

            impl From<$variant> for Message {
                fn from(value: $variant) -> Self {
                    Message::new(value)
                }
            }
        )*
    };
}

impl_into_message!(
    Notification,
    Timestamp,
    DisplayNameChange,
    PlayerMove,
    PlayerCardDrawn,
    PlayerJoinGameRequest,
    PlayerChat,
    PlayerSpectatorChoice,
    PlayerActiveOrder,
    Extension,
);

impl From<TransportEvent> for Message {
    fn from(event: TransportEvent) -> Self {
        Message::new(Notification::from(event))
    }
}
