//! Integration tests for framing and dispatch of the full message catalog.

use std::collections::VecDeque;
use std::net::SocketAddr;

use blackjack_protocol::{
    CardRank, DisplayNameChange, Dispatcher, Extension, Framer, Message,
    MessageBody, Notification, PlayerActiveOrder, PlayerCardDrawn, PlayerChat,
    PlayerJoinGameRequest, PlayerMove, PlayerSpectatorChoice, ProtocolConfig,
    ProtocolError, Timestamp, UnknownTagPolicy,
};
use blackjack_transport::{PeerAddr, TransportEvent};

// =========================================================================
// Helpers
// =========================================================================

fn v4(port: u16) -> PeerAddr {
    PeerAddr::from(SocketAddr::from(([127, 0, 0, 1], port)))
}

fn v6(port: u16) -> PeerAddr {
    PeerAddr::from(SocketAddr::from((
        [0x2001, 0xdb8, 0, 0, 0, 0, 0, 1],
        port,
    )))
}

fn rank(value: u8) -> CardRank {
    CardRank::new(value).expect("valid rank")
}

/// One of everything, with boundary values where they exist.
fn catalog() -> Vec<Message> {
    vec![
        Message::from(Notification::GAME_START),
        Message::from(TransportEvent::NewIncomingConnection),
        Message::from(Timestamp { millis: u64::MAX }),
        Message::from(DisplayNameChange {
            player: v4(5000),
            name: String::new(),
        }),
        Message::from(DisplayNameChange {
            player: v6(5001),
            name: "Ünïcødé dealer 🂡".into(),
        }),
        Message::from(PlayerMove::stand(v4(1))),
        Message::from(PlayerMove::hit(v4(2))),
        Message::from(PlayerCardDrawn::to_player(v4(3), rank(10))),
        Message::from(PlayerCardDrawn::to_player(v4(3), CardRank::ACE)),
        Message::from(PlayerCardDrawn::dealer(rank(7))),
        Message::from(PlayerJoinGameRequest::lobby()),
        Message::from(PlayerJoinGameRequest::table(0)),
        Message::from(PlayerJoinGameRequest { game: i16::MAX }),
        Message::from(PlayerChat::broadcast("")),
        Message::from(PlayerChat::private(v6(9), "psst")),
        Message::from(PlayerSpectatorChoice { spectate: true }),
        Message::from(PlayerSpectatorChoice { spectate: false }),
        Message::from(PlayerActiveOrder::default()),
        Message::from(PlayerActiveOrder {
            active: vec![v4(1), v6(2)],
            spectators: vec![v4(3)],
        }),
        Message::from(Extension::new(0xC0, vec![]).unwrap()),
        Message::from(Extension::new(0xFF, vec![0, 1, 2, 3]).unwrap()),
    ]
}

fn bodies(messages: &[Message]) -> Vec<MessageBody> {
    messages.iter().map(|m| m.body().clone()).collect()
}

// =========================================================================
// Round trips
// =========================================================================

#[test]
fn test_every_variant_round_trips_unbatched() {
    let framer = Framer::default();
    for message in catalog() {
        let bytes = framer.encode_single(&message).unwrap();
        let decoded = framer.unframe(&bytes, v4(7777)).unwrap();
        assert_eq!(decoded.len(), 1, "{message:?}");
        assert_eq!(decoded[0].body(), message.body());
        assert_eq!(decoded[0].tag(), message.tag());
    }
}

#[test]
fn test_batch_preserves_order_and_attaches_sender() {
    let framer = Framer::default();
    let sender = v6(4242);
    let messages = catalog();

    let bytes = framer.frame(&messages).unwrap();
    let decoded = framer.unframe(&bytes, sender).unwrap();

    assert_eq!(bodies(&decoded), bodies(&messages));
    assert!(decoded.iter().all(|m| m.sender() == Some(sender)));
}

#[test]
fn test_active_order_keeps_sequence_order() {
    let (a, b, c) = (v4(1), v4(2), v4(3));
    let framer = Framer::default();
    let bytes = framer
        .frame(&[Message::from(PlayerActiveOrder {
            active: vec![a, b],
            spectators: vec![c],
        })])
        .unwrap();

    let decoded = framer.unframe(&bytes, v4(7777)).unwrap();
    match decoded[0].body() {
        MessageBody::PlayerActiveOrder(order) => {
            assert_eq!(order.active, vec![a, b]);
            assert_eq!(order.spectators, vec![c]);
        }
        other => panic!("expected active order, got {other:?}"),
    }
}

// =========================================================================
// Corruption
// =========================================================================

#[test]
fn test_every_prefix_of_a_single_message_fails() {
    let framer = Framer::default();
    let stamp = Timestamp { millis: 5 };
    for message in catalog() {
        let single = framer.encode_single(&message).unwrap();
        let stamped = framer.encode_timestamped(stamp, &message).unwrap();
        for bytes in [single, stamped] {
            for cut in 0..bytes.len() {
                assert!(
                    framer.unframe(&bytes[..cut], v4(1)).is_err(),
                    "{message:?} cut at {cut} of {} decoded",
                    bytes.len()
                );
            }
        }
    }
}

#[test]
fn test_every_prefix_of_a_batch_fails_and_keeps_whole_messages() {
    let framer = Framer::default();
    let messages = catalog();
    let bytes = framer.frame(&messages).unwrap();

    for cut in 0..bytes.len() {
        let mut out = VecDeque::new();
        let result = framer.unframe_into(&bytes[..cut], v4(1), &mut out);
        assert!(
            matches!(
                result,
                Err(ProtocolError::Truncated { .. } | ProtocolError::CountMismatch { .. })
            ),
            "cut at {cut}: {result:?}"
        );
        // Whatever made it out is an exact prefix of what went in.
        let got: Vec<_> = out.iter().map(|m| m.body().clone()).collect();
        assert_eq!(got, bodies(&messages[..got.len()]));
    }
}

#[test]
fn test_trailing_bytes_after_batch_are_a_count_mismatch() {
    let framer = Framer::default();
    let mut bytes = framer
        .frame(&[Message::from(PlayerMove::hit(v4(1)))])
        .unwrap();
    bytes.extend_from_slice(&[0x8D, 0x8D]);

    let mut dispatcher = Dispatcher::default();
    assert_eq!(
        dispatcher.dispatch(&bytes, v4(2)),
        Err(ProtocolError::CountMismatch {
            declared: 1,
            decoded: 1,
            trailing: 2
        })
    );
    // The declared message still reaches the application.
    assert_eq!(dispatcher.poll_inbound().len(), 1);
}

#[test]
fn test_bad_field_value_stops_the_batch() {
    let framer = Framer::default();
    let mut bytes = framer
        .frame(&[
            Message::from(Notification::GAME_START),
            Message::from(PlayerCardDrawn::dealer(rank(4))),
            Message::from(Notification::GAME_START),
        ])
        .unwrap();
    // Rank bytes of the card sit right before the final notification.
    let rank_low = bytes.len() - 2;
    bytes[rank_low] = 11;

    let mut out = VecDeque::new();
    let result = framer.unframe_into(&bytes, v4(1), &mut out);
    assert!(matches!(
        result,
        Err(ProtocolError::Malformed { field: "card rank", .. })
    ));
    assert_eq!(out.len(), 1);
}

// =========================================================================
// Unknown and extension tags
// =========================================================================

#[test]
fn test_unknown_tag_inside_batch_does_not_desync() {
    let framer = Framer::default();
    let hit = Message::from(PlayerMove::hit(v4(1)));
    let chat = Message::from(PlayerChat::broadcast("still here"));

    let mut bytes = vec![0x86, 0, 0, 0, 3];
    bytes.extend(framer.encode_message(&hit).unwrap());
    bytes.push(0x42);
    bytes.extend(framer.encode_message(&chat).unwrap());

    let decoded = framer.unframe(&bytes, v4(2)).unwrap();
    assert_eq!(decoded.len(), 3);
    assert_eq!(decoded[0].body(), hit.body());
    assert_eq!(
        decoded[1].body(),
        &MessageBody::Notification(Notification::try_new(0x42).unwrap())
    );
    assert_eq!(decoded[2].body(), chat.body());
}

#[test]
fn test_extension_payload_is_skipped_by_length() {
    let framer = Framer::default();
    let chat = Message::from(PlayerChat::broadcast("after"));

    // An extension some newer peer invented, with bytes that would look
    // like messages if the decoder tried to read them.
    let mut bytes = vec![0x86, 0, 0, 0, 2, 0xE7, 0, 0, 0, 3, 0x88, 0x89, 0x8A];
    bytes.extend(framer.encode_message(&chat).unwrap());

    let decoded = framer.unframe(&bytes, v4(2)).unwrap();
    assert_eq!(decoded.len(), 2);
    assert_eq!(
        decoded[0].body(),
        &MessageBody::Extension(Extension::new(0xE7, vec![0x88, 0x89, 0x8A]).unwrap())
    );
    assert_eq!(decoded[1].body(), chat.body());
}

#[test]
fn test_reject_policy_refuses_unknown_tag() {
    let framer = Framer::new(ProtocolConfig {
        unknown_tags: UnknownTagPolicy::Reject,
        ..ProtocolConfig::default()
    });
    let bytes = [0x86, 0, 0, 0, 2, 0x8D, 0x42];

    let mut out = VecDeque::new();
    assert_eq!(
        framer.unframe_into(&bytes, v4(1), &mut out),
        Err(ProtocolError::UnknownType(0x42))
    );
    assert_eq!(out.len(), 1);

    // Extensions are still fine under the strict policy.
    let ext = [0xC1, 0, 0, 0, 0];
    assert_eq!(framer.unframe(&ext, v4(1)).unwrap().len(), 1);
}

#[test]
fn test_transport_event_packet_decodes_as_notification() {
    let framer = Framer::default();
    for event in TransportEvent::ALL {
        let decoded = framer.unframe(&[event.tag()], v4(3)).unwrap();
        assert_eq!(decoded[0].transport_event(), Some(event));
    }
}

// =========================================================================
// Limits
// =========================================================================

#[test]
fn test_oversized_string_rejected_on_decode() {
    let loose = Framer::default();
    let strict = Framer::new(ProtocolConfig {
        max_string_len: 8,
        ..ProtocolConfig::default()
    });
    let bytes = loose
        .encode_single(&Message::from(PlayerChat::broadcast("nine byte")))
        .unwrap();
    assert_eq!(
        strict.unframe(&bytes, v4(1)),
        Err(ProtocolError::StringTooLong { len: 9, max: 8 })
    );
}
