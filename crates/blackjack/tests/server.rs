//! Integration tests for the blackjack server and client over the
//! in-memory transport.

use std::net::SocketAddr;
use std::time::Duration;

use blackjack::prelude::*;

type Client = BlackjackClient<MemoryPeer>;
type Server = BlackjackServer<MemoryPeer>;

// =========================================================================
// Helpers
// =========================================================================

const SERVER_PORT: u16 = 9000;

fn sock(port: u16) -> SocketAddr {
    SocketAddr::from(([127, 0, 0, 1], port))
}

fn server(net: &MemoryNetwork) -> Server {
    let peer = net.bind(sock(SERVER_PORT)).unwrap();
    BlackjackServerBuilder::new()
        .tables(2)
        .seed(99)
        .table_config(TableConfig {
            min_players: 2,
            ..TableConfig::default()
        })
        .build(peer)
}

fn client(net: &MemoryNetwork, port: u16) -> Client {
    let peer = net.bind(sock(port)).unwrap();
    peer.connect(sock(SERVER_PORT)).unwrap();
    BlackjackClient::new(peer, ProtocolConfig::default())
}

/// A server and `n` connected clients, with the greetings already read.
fn setup(n: u16) -> (MemoryNetwork, Server, Vec<Client>) {
    let net = MemoryNetwork::new();
    let mut server = server(&net);
    let mut clients: Vec<_> = (0..n).map(|i| client(&net, 9100 + i)).collect();
    pump(&mut server, &mut clients);
    (net, server, clients)
}

/// Runs client and server ticks until the traffic settles, returning
/// each client's events.
fn pump(server: &mut Server, clients: &mut [Client]) -> Vec<Vec<ClientEvent>> {
    let mut events = vec![Vec::new(); clients.len()];
    for _ in 0..3 {
        for (client, log) in clients.iter_mut().zip(&mut events) {
            log.extend(client.tick());
        }
        server.tick();
    }
    for (client, log) in clients.iter_mut().zip(&mut events) {
        log.extend(client.tick());
    }
    events
}

// =========================================================================
// Connection flow
// =========================================================================

#[test]
fn test_clients_learn_server_and_names() {
    let (_net, server, clients) = setup(2);
    for client in &clients {
        assert_eq!(client.server(), Some(server.local_addr()));
    }
    assert_eq!(server.lobby().player_count(), 2);

    let second = clients[1].local_addr();
    assert_eq!(clients[0].view().name_of(second), "player-9101");
}

#[test]
fn test_full_server_refuses() {
    let net = MemoryNetwork::new();
    let mut server = server(&net);
    server.endpoint().peer().set_max_incoming(1);

    let mut clients = vec![client(&net, 9100), client(&net, 9101)];
    let events = pump(&mut server, &mut clients);

    assert!(events[0].contains(&ClientEvent::Connected(server.local_addr())));
    assert!(events[1].contains(&ClientEvent::Refused(server.local_addr())));
    assert_eq!(clients[1].server(), None);
    assert_eq!(server.lobby().player_count(), 1);
}

#[test]
fn test_disconnect_is_announced() {
    let (_net, mut server, mut clients) = setup(3);
    let leaver = clients.pop().unwrap();
    drop(leaver);

    let events = pump(&mut server, &mut clients);
    assert_eq!(server.lobby().player_count(), 2);
    for log in &events {
        assert!(log.contains(&ClientEvent::Chat {
            text: "player-9102 left".into(),
            private: false,
        }));
    }
}

// =========================================================================
// Table play
// =========================================================================

#[test]
fn test_players_see_active_order() {
    let (_net, mut server, mut clients) = setup(3);
    let (a, b, c) = (
        clients[0].local_addr(),
        clients[1].local_addr(),
        clients[2].local_addr(),
    );

    clients[0].join_table(0);
    clients[2].choose_spectator(true);
    clients[2].join_table(0);
    pump(&mut server, &mut clients);
    assert_eq!(
        server.lobby().table(0).unwrap().phase(),
        TablePhase::WaitingForPlayers
    );

    clients[1].join_table(0);
    let events = pump(&mut server, &mut clients);
    assert_eq!(server.lobby().table(0).unwrap().phase(), TablePhase::InProgress);

    for (client, log) in clients.iter().zip(&events) {
        assert!(log.contains(&ClientEvent::RoundStarted));
        assert_eq!(client.view().active, [a, b]);
        assert_eq!(client.view().spectators, [c]);
        assert_eq!(client.view().rounds, 1);
    }

    // Everyone at the table saw both opening cards for each player.
    let view = clients[2].view();
    assert_eq!(view.hand(a).map(|h| h.cards().len()), Some(2));
    assert_eq!(view.hand(b).map(|h| h.cards().len()), Some(2));
    assert_eq!(view.dealer.cards().len(), 1);
}

#[test]
fn test_hit_returns_card_to_sender() {
    let (_net, mut server, mut clients) = setup(2);
    for client in clients.iter_mut() {
        client.join_table(1);
    }
    pump(&mut server, &mut clients);

    let turn = server
        .lobby()
        .table(1)
        .unwrap()
        .current_turn()
        .expect("someone to act");
    let hitter = clients
        .iter()
        .position(|c| c.local_addr() == turn)
        .unwrap();
    let other = 1 - hitter;

    clients[hitter].hit();
    let events = pump(&mut server, &mut clients);

    let drawn = events[hitter]
        .iter()
        .find_map(|event| match event {
            ClientEvent::CardDrawn {
                player: Some(p),
                rank,
            } if *p == turn => Some(*rank),
            _ => None,
        })
        .expect("a card for the hitter");
    assert!((1..=10).contains(&drawn.value()));
    assert!(events[other].contains(&ClientEvent::CardDrawn {
        player: Some(turn),
        rank: drawn,
    }));
}

#[test]
fn test_chat_uses_display_name() {
    let (_net, mut server, mut clients) = setup(2);
    clients[0].set_display_name("ann");
    clients[0].say("hi");
    pump(&mut server, &mut clients);

    let ann = clients[0].local_addr();
    assert_eq!(clients[1].view().name_of(ann), "ann");
    assert!(clients[1].view().chat.iter().any(|line| line == "ann: hi"));
}

#[test]
fn test_chat_too_long_after_name_is_refused() {
    let (_net, mut server, mut clients) = setup(2);
    let limit = server.config().protocol.max_string_len;
    // Fits the client's own encoder, but not once the server adds "name: ".
    clients[0].say("x".repeat(limit - 1));
    let events = pump(&mut server, &mut clients);

    assert!(events[0].iter().any(|event| {
        matches!(event, ClientEvent::Chat { text, private: true } if text.contains("too long"))
    }));
    assert!(!events[1].iter().any(|event| matches!(event, ClientEvent::Chat { .. })));
    assert_eq!(server.endpoint().stats().dropped_packets, 0);
}

#[test]
fn test_whisper_reaches_only_receiver() {
    let (_net, mut server, mut clients) = setup(3);
    let to = clients[1].local_addr();
    clients[0].whisper(to, "secret");
    let events = pump(&mut server, &mut clients);

    let got_secret = |log: &Vec<ClientEvent>| {
        log.iter().any(|event| {
            matches!(event, ClientEvent::Chat { text, private: true } if text.ends_with("secret"))
        })
    };
    assert!(got_secret(&events[1]));
    assert!(!got_secret(&events[2]));
}

#[test]
fn test_corrupt_packet_does_not_stall_server() {
    let (_net, mut server, mut clients) = setup(1);
    let to = Destination::Peer(server.local_addr());

    // A batch that promises three messages and carries one.
    clients[0]
        .endpoint()
        .peer()
        .send(&[0x86, 0, 0, 0, 3, 0x8C, 1], to, Reliability::default())
        .unwrap();
    clients[0].set_display_name("still-here");
    pump(&mut server, &mut clients);

    assert_eq!(server.endpoint().stats().dropped_packets, 1);
    let me = clients[0].local_addr();
    assert_eq!(server.lobby().player(me).unwrap().name, "still-here");
}

// =========================================================================
// Run loop
// =========================================================================

#[tokio::test]
async fn test_run_loop_serves_clients() {
    let net = MemoryNetwork::new();
    let server = server(&net);
    let handle = tokio::spawn(server.run());

    let mut client = client(&net, 9100);
    let result = tokio::time::timeout(Duration::from_secs(2), async {
        loop {
            let events = client.tick();
            if events
                .iter()
                .any(|e| matches!(e, ClientEvent::Chat { text, .. } if text.starts_with("Welcome")))
            {
                break;
            }
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    })
    .await;

    handle.abort();
    assert!(result.is_ok(), "no welcome from the running server");
    assert!(client.server().is_some());
}
