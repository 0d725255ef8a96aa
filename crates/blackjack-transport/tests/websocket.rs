//! Integration tests for the WebSocket transport.
//!
//! These tests spin up a real listening peer and a connecting peer on
//! localhost and check that packets and lifecycle events flow through the
//! non-blocking `receive` path.

#[cfg(feature = "websocket")]
mod websocket {
    use std::time::Duration;

    use blackjack_transport::{
        Destination, Inbound, Peer, Reliability, TransportEvent,
        WebSocketConfig, WebSocketPeer,
    };

    /// Polls `peer` until a packet shows up or two seconds pass.
    async fn next_packet(peer: &mut WebSocketPeer) -> Inbound {
        let deadline = tokio::time::Instant::now() + Duration::from_secs(2);
        loop {
            if let Some(packet) = peer.receive() {
                return packet;
            }
            assert!(
                tokio::time::Instant::now() < deadline,
                "timed out waiting for a packet"
            );
            tokio::time::sleep(Duration::from_millis(5)).await;
        }
    }

    async fn listen(max_clients: usize) -> (WebSocketPeer, String) {
        let server = WebSocketPeer::bind(
            "127.0.0.1:0",
            WebSocketConfig { max_clients },
        )
        .await
        .expect("should bind");
        let addr = server.local_addr().socket_addr().to_string();
        (server, addr)
    }

    #[tokio::test]
    async fn test_websocket_connect_and_exchange() {
        let (mut server, addr) = listen(4).await;
        let mut client = WebSocketPeer::connect(&addr)
            .await
            .expect("client should connect");

        let accepted = next_packet(&mut client).await;
        assert_eq!(
            accepted.data,
            vec![TransportEvent::ConnectionRequestAccepted.tag()]
        );
        assert_eq!(accepted.source, server.local_addr());

        let incoming = next_packet(&mut server).await;
        assert_eq!(
            incoming.data,
            vec![TransportEvent::NewIncomingConnection.tag()]
        );
        let client_addr = incoming.source;
        assert_eq!(client_addr, client.local_addr());

        // --- Client sends, server receives ---
        client
            .send(
                b"hello from client",
                Destination::Peer(server.local_addr()),
                Reliability::ReliableOrdered,
            )
            .expect("send should succeed");
        let packet = next_packet(&mut server).await;
        assert_eq!(packet.data, b"hello from client");
        assert_eq!(packet.source, client_addr);

        // --- Server broadcasts, client receives ---
        server
            .send(b"hello table", Destination::Broadcast, Reliability::Unreliable)
            .expect("broadcast should succeed");
        let packet = next_packet(&mut client).await;
        assert_eq!(packet.data, b"hello table");
    }

    #[tokio::test]
    async fn test_websocket_reports_remote_disconnect() {
        let (mut server, addr) = listen(4).await;
        let mut client = WebSocketPeer::connect(&addr).await.unwrap();
        let _ = next_packet(&mut client).await;
        let incoming = next_packet(&mut server).await;

        client.disconnect(server.local_addr());

        let closed = next_packet(&mut server).await;
        assert_eq!(closed.source, incoming.source);
        assert!(
            closed.data == vec![TransportEvent::DisconnectionNotification.tag()]
                || closed.data == vec![TransportEvent::ConnectionLost.tag()],
            "unexpected close event {:?}",
            closed.data
        );
        assert!(server.connections().is_empty());
    }

    #[tokio::test]
    async fn test_websocket_refuses_when_full() {
        let (mut server, addr) = listen(1).await;

        let mut first = WebSocketPeer::connect(&addr).await.unwrap();
        let _ = next_packet(&mut first).await;
        let _ = next_packet(&mut server).await;

        let mut second = WebSocketPeer::connect(&addr).await.unwrap();
        // The link opens at the socket level, then the refusal arrives.
        let mut events = vec![next_packet(&mut second).await.data];
        if events[0] != vec![TransportEvent::NoFreeIncomingConnections.tag()] {
            events.push(next_packet(&mut second).await.data);
        }
        assert_eq!(
            events.last().unwrap(),
            &vec![TransportEvent::NoFreeIncomingConnections.tag()]
        );
        assert!(second.connections().is_empty());
    }

    #[tokio::test]
    async fn test_send_to_unknown_peer_fails() {
        let (server, _addr) = listen(1).await;
        let stranger = blackjack_transport::PeerAddr::from(
            std::net::SocketAddr::from(([127, 0, 0, 1], 1)),
        );
        assert!(
            server
                .send(b"x", Destination::Peer(stranger), Reliability::ReliableOrdered)
                .is_err()
        );
    }
}
