//! Per-message binary encoders and decoders.
//!
//! Each payload shape implements [`WirePayload`]: it knows its tag and how
//! to write and read the fields that follow it. The tag itself is written
//! by [`encode_message`] and consumed by the framer before the registry
//! picks a decoder, so `decode_body` starts at the first payload byte.
//!
//! ```text
//! DisplayNameChange      [player: peer][name: string]
//! PlayerMove             [player: peer][action: i16]
//! PlayerCardDrawn        [player: peer or unassigned][rank: i16]
//! PlayerJoinGameRequest  [game: i16]
//! PlayerChat             [receiver: peer or unassigned][text: string]
//! PlayerSpectatorChoice  [spectate: u8]
//! PlayerActiveOrder      [active: peer list][spectators: peer list]
//! Timestamp              [millis: u64]
//! Extension              [len: u32][len opaque bytes]
//! ```

use crate::message::{
    tag, CardRank, DisplayNameChange, Extension, MessageBody, PlayerAction,
    PlayerActiveOrder, PlayerCardDrawn, PlayerChat, PlayerJoinGameRequest,
    PlayerMove, PlayerSpectatorChoice, Timestamp,
};
use crate::wire::{WireReader, WireWriter};
use crate::ProtocolError;

/// A message shape with a fixed tag and payload layout.
pub trait WirePayload: Sized {
    /// The tag written in front of the payload.
    const TAG: u8;

    /// Appends the payload fields, in wire order.
    fn encode_body(&self, w: &mut WireWriter) -> Result<(), ProtocolError>;

    /// Reads exactly the payload fields. The tag is already consumed.
    fn decode_body(r: &mut WireReader<'_>) -> Result<Self, ProtocolError>;
}

/// Writes `[tag][payload]` for any message body.
pub fn encode_message(body: &MessageBody, w: &mut WireWriter) -> Result<(), ProtocolError> {
    w.put_u8(body.tag());
    match body {
        MessageBody::Notification(_) => Ok(()),
        MessageBody::Timestamp(m) => m.encode_body(w),
        MessageBody::DisplayNameChange(m) => m.encode_body(w),
        MessageBody::PlayerMove(m) => m.encode_body(w),
        MessageBody::PlayerCardDrawn(m) => m.encode_body(w),
        MessageBody::PlayerJoinGameRequest(m) => m.encode_body(w),
        MessageBody::PlayerChat(m) => m.encode_body(w),
        MessageBody::PlayerSpectatorChoice(m) => m.encode_body(w),
        MessageBody::PlayerActiveOrder(m) => m.encode_body(w),
        MessageBody::Extension(m) => encode_extension(m, w),
    }
}

/// Extensions are not a [`WirePayload`]: their tag is a runtime value.
pub(crate) fn encode_extension(ext: &Extension, w: &mut WireWriter) -> Result<(), ProtocolError> {
    w.put_length_prefixed(ext.payload(), "extension payload")
}

pub(crate) fn decode_extension(
    tag: u8,
    r: &mut WireReader<'_>,
) -> Result<Extension, ProtocolError> {
    let len = r.read_u32("extension length")? as usize;
    let payload = r.read_bytes(len, "extension payload")?;
    Extension::new(tag, payload)
}

// ---------------------------------------------------------------------------
// Implementations
// ---------------------------------------------------------------------------

impl WirePayload for Timestamp {
    const TAG: u8 = tag::TIMESTAMP;

    fn encode_body(&self, w: &mut WireWriter) -> Result<(), ProtocolError> {
        w.put_u64(self.millis);
        Ok(())
    }

    fn decode_body(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            millis: r.read_u64("timestamp")?,
        })
    }
}

impl WirePayload for DisplayNameChange {
    const TAG: u8 = tag::DISPLAY_NAME_CHANGE;

    fn encode_body(&self, w: &mut WireWriter) -> Result<(), ProtocolError> {
        w.put_peer(self.player);
        w.put_string(&self.name)
    }

    fn decode_body(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            player: r.read_peer("player")?,
            name: r.read_string("display name")?,
        })
    }
}

impl WirePayload for PlayerMove {
    const TAG: u8 = tag::PLAYER_MOVE;

    fn encode_body(&self, w: &mut WireWriter) -> Result<(), ProtocolError> {
        w.put_peer(self.player);
        w.put_i16(self.action.to_wire());
        Ok(())
    }

    fn decode_body(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let player = r.read_peer("player")?;
        let raw = r.read_i16("move")?;
        let action = PlayerAction::from_wire(raw).ok_or_else(|| {
            ProtocolError::malformed("move", format!("{raw} is neither stand (0) nor hit (1)"))
        })?;
        Ok(Self { player, action })
    }
}

impl WirePayload for PlayerCardDrawn {
    const TAG: u8 = tag::PLAYER_CARD_DRAWN;

    fn encode_body(&self, w: &mut WireWriter) -> Result<(), ProtocolError> {
        w.put_optional_peer(self.player);
        w.put_i16(i16::from(self.rank.value()));
        Ok(())
    }

    fn decode_body(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        let player = r.read_optional_peer("card target")?;
        let raw = r.read_i16("card rank")?;
        let rank = u8::try_from(raw)
            .ok()
            .and_then(CardRank::new)
            .ok_or_else(|| ProtocolError::malformed("card rank", format!("{raw} is not in 1..=10")))?;
        Ok(Self { player, rank })
    }
}

impl WirePayload for PlayerJoinGameRequest {
    const TAG: u8 = tag::PLAYER_JOIN_GAME_REQUEST;

    fn encode_body(&self, w: &mut WireWriter) -> Result<(), ProtocolError> {
        w.put_i16(self.game);
        Ok(())
    }

    fn decode_body(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            game: r.read_i16("game index")?,
        })
    }
}

impl WirePayload for PlayerChat {
    const TAG: u8 = tag::PLAYER_CHAT;

    fn encode_body(&self, w: &mut WireWriter) -> Result<(), ProtocolError> {
        w.put_optional_peer(self.receiver);
        w.put_string(&self.text)
    }

    fn decode_body(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            receiver: r.read_optional_peer("chat receiver")?,
            text: r.read_string("chat text")?,
        })
    }
}

impl WirePayload for PlayerSpectatorChoice {
    const TAG: u8 = tag::PLAYER_SPECTATOR_CHOICE;

    fn encode_body(&self, w: &mut WireWriter) -> Result<(), ProtocolError> {
        w.put_bool(self.spectate);
        Ok(())
    }

    fn decode_body(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            spectate: r.read_bool("spectator flag")?,
        })
    }
}

impl WirePayload for PlayerActiveOrder {
    const TAG: u8 = tag::PLAYER_ACTIVE_ORDER;

    fn encode_body(&self, w: &mut WireWriter) -> Result<(), ProtocolError> {
        w.put_peer_list(&self.active)?;
        w.put_peer_list(&self.spectators)
    }

    fn decode_body(r: &mut WireReader<'_>) -> Result<Self, ProtocolError> {
        Ok(Self {
            active: r.read_peer_list("active players")?,
            spectators: r.read_peer_list("spectators")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use blackjack_transport::PeerAddr;

    use super::*;
    use crate::message::Notification;

    fn peer(port: u16) -> PeerAddr {
        PeerAddr::from(SocketAddr::from(([192, 168, 1, 20], port)))
    }

    fn encode(body: impl Into<MessageBody>) -> Vec<u8> {
        let mut w = WireWriter::new(64);
        encode_message(&body.into(), &mut w).unwrap();
        w.into_bytes()
    }

    #[test]
    fn test_move_layout() {
        let bytes = encode(PlayerMove::hit(peer(5000)));
        assert_eq!(bytes.len(), 1 + PeerAddr::ENCODED_LEN + 2);
        assert_eq!(bytes[0], tag::PLAYER_MOVE);
        assert_eq!(&bytes[bytes.len() - 2..], &[0, 1]);
    }

    #[test]
    fn test_notification_is_tag_only() {
        assert_eq!(encode(Notification::GAME_START), vec![tag::GAME_START]);
    }

    #[test]
    fn test_dealer_card_uses_unassigned_target() {
        let bytes = encode(PlayerCardDrawn::dealer(CardRank::ACE));
        assert_eq!(&bytes[1..1 + PeerAddr::ENCODED_LEN], &[0u8; 18]);
        assert_eq!(&bytes[bytes.len() - 2..], &[0, 1]);
    }

    #[test]
    fn test_decode_rejects_bad_move() {
        let mut bytes = encode(PlayerMove::stand(peer(1)));
        let last = bytes.len() - 1;
        bytes[last] = 2;
        let mut r = WireReader::new(&bytes[1..], 64);
        assert!(matches!(
            PlayerMove::decode_body(&mut r),
            Err(ProtocolError::Malformed { field: "move", .. })
        ));
    }

    #[test]
    fn test_decode_rejects_out_of_range_rank() {
        for raw in [0i16, 11, -1, 300] {
            let mut bytes = vec![0u8; PeerAddr::ENCODED_LEN];
            bytes.extend_from_slice(&raw.to_be_bytes());
            let mut r = WireReader::new(&bytes, 64);
            assert!(
                matches!(
                    PlayerCardDrawn::decode_body(&mut r),
                    Err(ProtocolError::Malformed { field: "card rank", .. })
                ),
                "rank {raw} should be rejected"
            );
        }
    }

    #[test]
    fn test_extension_round_trip() {
        let ext = Extension::new(0xD0, vec![9, 8, 7]).unwrap();
        let bytes = encode(ext.clone());
        assert_eq!(bytes, vec![0xD0, 0, 0, 0, 3, 9, 8, 7]);
        let mut r = WireReader::new(&bytes[1..], 64);
        assert_eq!(decode_extension(0xD0, &mut r).unwrap(), ext);
        assert!(r.is_empty());
    }

    #[test]
    fn test_long_chat_fails_to_encode() {
        let mut w = WireWriter::new(4);
        let body = MessageBody::from(PlayerChat::broadcast("too long"));
        assert!(matches!(
            encode_message(&body, &mut w),
            Err(ProtocolError::StringTooLong { len: 8, max: 4 })
        ));
    }
}
