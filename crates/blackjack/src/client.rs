//! Client side: commands out, a running picture of the table in.
//!
//! A [`BlackjackClient`] wraps an [`Endpoint`] connected to one server.
//! Commands (`hit`, `say`, `join_table`, ...) are queued and go out on the
//! next [`tick`](BlackjackClient::tick). Everything the server sends is
//! folded into a [`TableView`] and also reported as [`ClientEvent`]s so a
//! UI can react without diffing the view.

use std::collections::BTreeMap;

use blackjack_protocol::{
    CardRank, DisplayNameChange, Message, MessageBody, Notification, PlayerAction,
    PlayerActiveOrder, PlayerChat, PlayerJoinGameRequest, PlayerMove, PlayerSpectatorChoice,
    ProtocolConfig,
};
use blackjack_table::Hand;
use blackjack_transport::{Destination, Peer, PeerAddr, TransportEvent};

use crate::endpoint::Endpoint;

// ---------------------------------------------------------------------------
// View state
// ---------------------------------------------------------------------------

/// What the client knows about the lobby and its table.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TableView {
    /// Display names by player.
    pub names: BTreeMap<PeerAddr, String>,
    /// Turn order at our table, first to act first.
    pub active: Vec<PeerAddr>,
    pub spectators: Vec<PeerAddr>,
    /// Cards seen this round, per player.
    pub hands: BTreeMap<PeerAddr, Hand>,
    pub dealer: Hand,
    /// Every chat line and server notice, oldest first.
    pub chat: Vec<String>,
    /// Rounds we have seen start.
    pub rounds: u32,
}

impl TableView {
    /// Display name for `player`, falling back to the address.
    pub fn name_of(&self, player: PeerAddr) -> String {
        self.names
            .get(&player)
            .cloned()
            .unwrap_or_else(|| player.to_string())
    }

    pub fn hand(&self, player: PeerAddr) -> Option<&Hand> {
        self.hands.get(&player)
    }

    /// The player whose turn it is, as far as we can tell.
    ///
    /// Turn order is `active`; a player whose hand is bust or at 21 has
    /// finished. Standing is not announced, so this is a best guess.
    pub fn likely_turn(&self) -> Option<PeerAddr> {
        self.active.iter().copied().find(|player| {
            self.hands
                .get(player)
                .is_some_and(|hand| !hand.is_empty() && hand.value() < blackjack_table::BLACKJACK)
        })
    }

    fn start_round(&mut self) {
        self.hands.clear();
        self.dealer.clear();
        self.rounds += 1;
    }
}

/// Something that happened as a result of a server message.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ClientEvent {
    /// The server accepted our connection.
    Connected(PeerAddr),
    /// The server is full.
    Refused(PeerAddr),
    /// The link to the server is gone.
    Disconnected,
    NameChanged { player: PeerAddr, name: String },
    RoundStarted,
    OrderChanged,
    /// `player == None` is the dealer.
    CardDrawn { player: Option<PeerAddr>, rank: CardRank },
    Chat { text: String, private: bool },
}

// ---------------------------------------------------------------------------
// Client
// ---------------------------------------------------------------------------

pub struct BlackjackClient<P: Peer> {
    endpoint: Endpoint<P>,
    server: Option<PeerAddr>,
    view: TableView,
}

impl<P: Peer> BlackjackClient<P> {
    pub fn new(peer: P, config: ProtocolConfig) -> Self {
        Self {
            endpoint: Endpoint::new(peer, config),
            server: None,
            view: TableView::default(),
        }
    }

    pub fn local_addr(&self) -> PeerAddr {
        self.endpoint.local_addr()
    }

    /// The server we are connected to, once it has accepted us.
    pub fn server(&self) -> Option<PeerAddr> {
        self.server
    }

    pub fn view(&self) -> &TableView {
        &self.view
    }

    pub fn endpoint(&self) -> &Endpoint<P> {
        &self.endpoint
    }

    pub fn endpoint_mut(&mut self) -> &mut Endpoint<P> {
        &mut self.endpoint
    }

    // -----------------------------------------------------------------------
    // Commands
    // -----------------------------------------------------------------------

    pub fn hit(&mut self) {
        self.play(PlayerAction::Hit);
    }

    pub fn stand(&mut self) {
        self.play(PlayerAction::Stand);
    }

    fn play(&mut self, action: PlayerAction) {
        let player = self.local_addr();
        self.send(PlayerMove { player, action });
    }

    /// Chat to everyone.
    pub fn say(&mut self, text: impl Into<String>) {
        self.send(PlayerChat::broadcast(text));
    }

    /// Chat to one player.
    pub fn whisper(&mut self, to: PeerAddr, text: impl Into<String>) {
        self.send(PlayerChat::private(to, text));
    }

    pub fn join_table(&mut self, index: u16) {
        self.send(PlayerJoinGameRequest::table(index));
    }

    pub fn leave_table(&mut self) {
        self.send(PlayerJoinGameRequest::lobby());
    }

    pub fn set_display_name(&mut self, name: impl Into<String>) {
        let player = self.local_addr();
        self.send(DisplayNameChange {
            player,
            name: name.into(),
        });
    }

    pub fn choose_spectator(&mut self, spectate: bool) {
        self.send(PlayerSpectatorChoice { spectate });
    }

    /// Queues a message for the server.
    ///
    /// Until the server has accepted us this goes to every link, which
    /// for a client is just the server.
    pub fn send(&mut self, message: impl Into<Message>) {
        let destination = self
            .server
            .map_or(Destination::Broadcast, Destination::Peer);
        self.endpoint.enqueue_outbound(destination, message.into());
    }

    // -----------------------------------------------------------------------
    // Loop
    // -----------------------------------------------------------------------

    /// Reads everything the server sent, updates the view, then sends
    /// queued commands.
    pub fn tick(&mut self) -> Vec<ClientEvent> {
        self.endpoint.poll_transport();
        let events = self
            .endpoint
            .poll_inbound()
            .into_iter()
            .filter_map(|message| self.apply(message))
            .collect();
        self.endpoint.flush();
        events
    }

    /// Folds one server message into the view.
    pub fn apply(&mut self, message: Message) -> Option<ClientEvent> {
        let sender = message.sender();
        match message.into_body() {
            MessageBody::Notification(n) => self.apply_notification(n, sender),
            MessageBody::DisplayNameChange(change) => {
                self.view.names.insert(change.player, change.name.clone());
                Some(ClientEvent::NameChanged {
                    player: change.player,
                    name: change.name,
                })
            }
            MessageBody::PlayerActiveOrder(PlayerActiveOrder { active, spectators }) => {
                self.view.active = active;
                self.view.spectators = spectators;
                Some(ClientEvent::OrderChanged)
            }
            MessageBody::PlayerCardDrawn(drawn) => {
                match drawn.player {
                    Some(player) => self.view.hands.entry(player).or_default().push(drawn.rank),
                    None => self.view.dealer.push(drawn.rank),
                }
                Some(ClientEvent::CardDrawn {
                    player: drawn.player,
                    rank: drawn.rank,
                })
            }
            MessageBody::PlayerChat(chat) => {
                self.view.chat.push(chat.text.clone());
                Some(ClientEvent::Chat {
                    text: chat.text,
                    private: chat.receiver.is_some(),
                })
            }
            MessageBody::Timestamp(_) => None,
            other => {
                tracing::debug!(tag = other.tag(), "ignoring client-side message from server");
                None
            }
        }
    }

    fn apply_notification(
        &mut self,
        notification: Notification,
        sender: Option<PeerAddr>,
    ) -> Option<ClientEvent> {
        if notification == Notification::GAME_START {
            self.view.start_round();
            return Some(ClientEvent::RoundStarted);
        }

        let from = sender?;
        match notification.transport_event()? {
            TransportEvent::ConnectionRequestAccepted => {
                tracing::info!(server = %from, "connected");
                self.server = Some(from);
                Some(ClientEvent::Connected(from))
            }
            TransportEvent::NoFreeIncomingConnections => {
                tracing::warn!(server = %from, "server full");
                // A WebSocket link reports the accept before the refusal.
                if self.server.is_none_or(|server| server == from) {
                    self.forget_server();
                }
                Some(ClientEvent::Refused(from))
            }
            TransportEvent::DisconnectionNotification | TransportEvent::ConnectionLost
                if self.server == Some(from) =>
            {
                tracing::info!(server = %from, "disconnected");
                self.forget_server();
                Some(ClientEvent::Disconnected)
            }
            _ => None,
        }
    }

    /// Drops the server link state, including commands not yet sent to it.
    fn forget_server(&mut self) {
        self.server = None;
        self.view = TableView::default();
        self.endpoint.discard_outbound();
    }
}

#[cfg(test)]
mod tests {
    use std::net::SocketAddr;

    use blackjack_protocol::PlayerCardDrawn;
    use blackjack_transport::{MemoryNetwork, MemoryPeer};

    use super::*;

    fn addr(port: u16) -> PeerAddr {
        PeerAddr::from(SocketAddr::from(([127, 0, 0, 1], port)))
    }

    fn client(net: &MemoryNetwork) -> BlackjackClient<MemoryPeer> {
        let peer = net.bind(addr(6001).socket_addr()).unwrap();
        BlackjackClient::new(peer, ProtocolConfig::default())
    }

    fn rank(v: u8) -> CardRank {
        CardRank::new(v).unwrap()
    }

    #[test]
    fn test_round_start_clears_hands() {
        let net = MemoryNetwork::new();
        let mut c = client(&net);
        let me = c.local_addr();

        c.apply(Message::from(PlayerCardDrawn::to_player(me, rank(5))));
        c.apply(Message::from(PlayerCardDrawn::dealer(rank(9))));
        assert_eq!(c.view().hand(me).map(Hand::value), Some(5));
        assert_eq!(c.view().dealer.value(), 9);

        let event = c.apply(Message::from(Notification::GAME_START));
        assert_eq!(event, Some(ClientEvent::RoundStarted));
        assert!(c.view().hand(me).is_none());
        assert!(c.view().dealer.is_empty());
        assert_eq!(c.view().rounds, 1);
    }

    #[test]
    fn test_order_and_names() {
        let net = MemoryNetwork::new();
        let mut c = client(&net);
        let (a, b) = (addr(7001), addr(7002));

        c.apply(Message::from(DisplayNameChange {
            player: a,
            name: "ann".into(),
        }));
        c.apply(Message::from(PlayerActiveOrder {
            active: vec![a, b],
            spectators: vec![],
        }));
        assert_eq!(c.view().active, [a, b]);
        assert_eq!(c.view().name_of(a), "ann");
        assert_eq!(c.view().name_of(b), "127.0.0.1:7002");
    }

    #[test]
    fn test_likely_turn_skips_finished_hands() {
        let mut view = TableView::default();
        let (a, b) = (addr(7001), addr(7002));
        view.active = vec![a, b];
        for v in [10, 1] {
            view.hands.entry(a).or_default().push(rank(v));
        }
        for v in [4, 5] {
            view.hands.entry(b).or_default().push(rank(v));
        }
        assert_eq!(view.likely_turn(), Some(b));
    }

    #[test]
    fn test_refusal_after_accept_forgets_server() {
        let net = MemoryNetwork::new();
        let mut c = client(&net);
        let server = addr(9000);
        let from_server = |event: TransportEvent| {
            let framer = blackjack_protocol::Framer::default();
            let bytes = framer.encode_single(&Message::from(event)).unwrap();
            framer.unframe(&bytes, server).unwrap().remove(0)
        };

        c.apply(from_server(TransportEvent::ConnectionRequestAccepted));
        assert_eq!(c.server(), Some(server));
        c.apply(Message::from(DisplayNameChange {
            player: server,
            name: "host".into(),
        }));
        c.join_table(0);
        assert_eq!(c.endpoint().queued(), 1);

        let event = c.apply(from_server(TransportEvent::NoFreeIncomingConnections));
        assert_eq!(event, Some(ClientEvent::Refused(server)));
        assert_eq!(c.server(), None);
        assert!(c.view().names.is_empty());
        assert_eq!(c.endpoint().queued(), 0);
    }

    #[test]
    fn test_disconnect_drops_unsent_commands() {
        let net = MemoryNetwork::new();
        let mut c = client(&net);
        let server = addr(9000);
        let event_from = |sender: PeerAddr, event: TransportEvent| {
            let framer = blackjack_protocol::Framer::default();
            let bytes = framer.encode_single(&Message::from(event)).unwrap();
            framer.unframe(&bytes, sender).unwrap().remove(0)
        };

        c.apply(event_from(server, TransportEvent::ConnectionRequestAccepted));
        c.hit();
        c.say("bye");
        let event = c.apply(event_from(server, TransportEvent::ConnectionLost));
        assert_eq!(event, Some(ClientEvent::Disconnected));
        assert_eq!(c.endpoint().queued(), 0);

        // A lost link to some other peer leaves the queue alone.
        c.apply(event_from(server, TransportEvent::ConnectionRequestAccepted));
        c.hit();
        assert_eq!(c.apply(event_from(addr(9001), TransportEvent::ConnectionLost)), None);
        assert_eq!(c.endpoint().queued(), 1);
    }

    #[test]
    fn test_chat_privacy_flag() {
        let net = MemoryNetwork::new();
        let mut c = client(&net);
        let me = c.local_addr();
        let event = c.apply(Message::from(PlayerChat::private(me, "psst")));
        assert_eq!(
            event,
            Some(ClientEvent::Chat {
                text: "psst".into(),
                private: true
            })
        );
        assert_eq!(c.view().chat, ["psst"]);
    }
}
