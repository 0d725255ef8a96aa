//! The lobby: every connected player and every table on a server.
//!
//! The lobby is the update phase of the server loop. It takes decoded
//! messages one at a time, applies them to its players and tables, and
//! returns what should be sent in response.
//!
//! A player is in at most ONE table at a time. The lobby keeps that true
//! by always joining the new table before leaving the old one.

use std::collections::BTreeMap;

use blackjack_protocol::{
    DisplayNameChange, Message, MessageBody, PlayerAction, PlayerChat, ProtocolConfig,
};
use blackjack_transport::{Destination, PeerAddr, TransportEvent};

use crate::{Deck, Outgoing, Seating, Table, TableConfig, TableError, TablePhase};

/// Longest display name accepted, in characters.
pub const MAX_NAME_CHARS: usize = 32;

/// What the lobby knows about one connected peer.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PlayerInfo {
    pub name: String,
    /// Index of the table the player is at, if any.
    pub table: Option<usize>,
    /// Applied on the next table join.
    pub prefers_spectating: bool,
}

/// All players and tables of one server.
#[derive(Debug)]
pub struct Lobby {
    tables: Vec<Table>,
    players: BTreeMap<PeerAddr, PlayerInfo>,
    /// Longest relayed chat line, in encoded bytes.
    max_chat_bytes: usize,
}

impl Lobby {
    /// Creates `table_count` tables sharing `config`.
    pub fn new(table_count: usize, config: TableConfig) -> Self {
        let tables = (0..table_count)
            .map(|index| Table::new(index, config.clone()))
            .collect();
        Self::with_tables(tables)
    }

    /// Like [`Lobby::new`] but every table gets a deck seeded from `seed`
    /// plus its index.
    pub fn seeded(table_count: usize, config: TableConfig, seed: u64) -> Self {
        let tables = (0..table_count)
            .map(|index| {
                Table::with_deck(index, config.clone(), Deck::seeded(seed.wrapping_add(index as u64)))
            })
            .collect();
        Self::with_tables(tables)
    }

    pub fn with_tables(tables: Vec<Table>) -> Self {
        Self {
            tables,
            players: BTreeMap::new(),
            max_chat_bytes: ProtocolConfig::default().max_string_len,
        }
    }

    /// Caps relayed chat lines at `max` bytes. Should match the
    /// `max_string_len` the receivers decode with.
    pub fn with_max_chat_bytes(mut self, max: usize) -> Self {
        self.max_chat_bytes = max;
        self
    }

    pub fn tables(&self) -> &[Table] {
        &self.tables
    }

    pub fn table(&self, index: usize) -> Option<&Table> {
        self.tables.get(index)
    }

    pub fn player(&self, addr: PeerAddr) -> Option<&PlayerInfo> {
        self.players.get(&addr)
    }

    pub fn player_count(&self) -> usize {
        self.players.len()
    }

    // -----------------------------------------------------------------------
    // Message entry point
    // -----------------------------------------------------------------------

    /// Applies one decoded message and returns the replies.
    ///
    /// Rule violations are answered with a private notice to the sender;
    /// they never fail the caller.
    pub fn handle(&mut self, message: Message) -> Outgoing {
        let Some(sender) = message.sender() else {
            tracing::debug!(tag = message.tag(), "ignoring message with no sender");
            return Vec::new();
        };

        let result = match message.into_body() {
            MessageBody::Notification(n) => match n.transport_event() {
                Some(TransportEvent::NewIncomingConnection) => Ok(self.connect(sender)),
                Some(
                    TransportEvent::DisconnectionNotification | TransportEvent::ConnectionLost,
                ) => Ok(self.disconnect(sender)),
                _ => {
                    tracing::debug!(%sender, tag = n.tag(), "ignoring notification");
                    Ok(Vec::new())
                }
            },
            MessageBody::DisplayNameChange(change) => {
                if change.player != sender {
                    tracing::warn!(%sender, claimed = %change.player, "name change for another player");
                }
                self.rename(sender, &change.name)
            }
            MessageBody::PlayerChat(chat) => self.chat(sender, chat.receiver, &chat.text),
            MessageBody::PlayerJoinGameRequest(request) => {
                self.join_table(sender, request.table_index())
            }
            MessageBody::PlayerSpectatorChoice(choice) => {
                self.choose_spectator(sender, choice.spectate)
            }
            MessageBody::PlayerMove(mv) => self.player_move(sender, mv.action),
            MessageBody::Timestamp(_) => Ok(Vec::new()),
            MessageBody::PlayerCardDrawn(_)
            | MessageBody::PlayerActiveOrder(_)
            | MessageBody::Extension(_) => {
                tracing::debug!(%sender, "ignoring server-side message from client");
                Ok(Vec::new())
            }
        };

        result.unwrap_or_else(|e| {
            tracing::warn!(%sender, error = %e, "rejected player action");
            vec![notice(sender, e.to_string())]
        })
    }

    // -----------------------------------------------------------------------
    // Operations
    // -----------------------------------------------------------------------

    /// Registers a newly connected peer under a default name.
    ///
    /// The newcomer is told everyone else's name; everyone else is told
    /// the newcomer's.
    pub fn connect(&mut self, addr: PeerAddr) -> Outgoing {
        if self.players.contains_key(&addr) {
            return Vec::new();
        }
        let name = format!("player-{}", addr.socket_addr().port());
        tracing::info!(%addr, %name, "player connected");

        let mut out: Outgoing = self
            .players
            .iter()
            .map(|(other, info)| {
                (
                    Destination::Peer(addr),
                    Message::from(DisplayNameChange {
                        player: *other,
                        name: info.name.clone(),
                    }),
                )
            })
            .collect();
        out.push((
            Destination::Broadcast,
            Message::from(DisplayNameChange {
                player: addr,
                name: name.clone(),
            }),
        ));
        out.push(notice(
            addr,
            format!("Welcome, {name}. {} tables are open.", self.tables.len()),
        ));

        self.players.insert(
            addr,
            PlayerInfo {
                name,
                table: None,
                prefers_spectating: false,
            },
        );
        out
    }

    /// Forgets a peer and frees their seat.
    pub fn disconnect(&mut self, addr: PeerAddr) -> Outgoing {
        let Some(info) = self.players.remove(&addr) else {
            return Vec::new();
        };
        tracing::info!(%addr, name = %info.name, "player disconnected");

        let mut out = Vec::new();
        if let Some(index) = info.table {
            if let Some(table) = self.tables.get_mut(index) {
                match table.leave(addr) {
                    Ok(update) => out.extend(update),
                    Err(e) => tracing::warn!(%addr, error = %e, "seat already gone"),
                }
            }
            out.extend(self.progress(index));
        }
        out.push((
            Destination::Broadcast,
            Message::from(PlayerChat::broadcast(format!("{} left", info.name))),
        ));
        out
    }

    /// Sets a player's display name and announces it to everyone.
    pub fn rename(&mut self, addr: PeerAddr, name: &str) -> Result<Outgoing, TableError> {
        let name = name.trim();
        if name.is_empty() || name.chars().count() > MAX_NAME_CHARS {
            return Err(TableError::InvalidName(name.to_owned()));
        }
        let info = self
            .players
            .get_mut(&addr)
            .ok_or(TableError::UnknownPlayer(addr))?;

        tracing::info!(%addr, old = %info.name, new = %name, "display name changed");
        info.name = name.to_owned();
        Ok(vec![(
            Destination::Broadcast,
            Message::from(DisplayNameChange {
                player: addr,
                name: info.name.clone(),
            }),
        )])
    }

    /// Relays a chat line with the author's name in front.
    ///
    /// `receiver == None` goes to everyone, otherwise only to that player.
    /// Fails with [`TableError::ChatTooLong`] when the prefixed line is over
    /// the chat limit.
    pub fn chat(
        &mut self,
        addr: PeerAddr,
        receiver: Option<PeerAddr>,
        text: &str,
    ) -> Result<Outgoing, TableError> {
        let author = self
            .players
            .get(&addr)
            .ok_or(TableError::UnknownPlayer(addr))?;
        let line = format!("{}: {text}", author.name);
        if line.len() > self.max_chat_bytes {
            return Err(TableError::ChatTooLong {
                len: line.len(),
                max: self.max_chat_bytes,
            });
        }

        match receiver {
            None => Ok(vec![(
                Destination::Broadcast,
                Message::from(PlayerChat::broadcast(line)),
            )]),
            Some(to) if self.players.contains_key(&to) => Ok(vec![(
                Destination::Peer(to),
                Message::from(PlayerChat::private(to, line)),
            )]),
            Some(to) => Err(TableError::UnknownPlayer(to)),
        }
    }

    /// Moves a player to table `target`, or back to the lobby for `None`.
    pub fn join_table(
        &mut self,
        addr: PeerAddr,
        target: Option<usize>,
    ) -> Result<Outgoing, TableError> {
        let info = self
            .players
            .get(&addr)
            .ok_or(TableError::UnknownPlayer(addr))?;
        let current = info.table;
        let spectate = info.prefers_spectating;
        if target.is_none() && current.is_none() {
            return Err(TableError::NotAtTable(addr));
        }

        let mut out = Vec::new();
        let seating = match target {
            None => None,
            Some(index) => {
                if current == Some(index) {
                    return Err(TableError::AlreadyAtTable(addr, index));
                }
                let table = self
                    .tables
                    .get_mut(index)
                    .ok_or(TableError::NoSuchTable(index))?;
                let seating = table.join(addr, spectate)?;
                out.extend(table.order_update());
                Some((index, seating))
            }
        };

        if let Some(old) = current {
            if let Some(table) = self.tables.get_mut(old) {
                match table.leave(addr) {
                    Ok(update) => out.extend(update),
                    Err(e) => tracing::warn!(%addr, table = old, error = %e, "seat already gone"),
                }
            }
            out.extend(self.progress(old));
        }

        if let Some(info) = self.players.get_mut(&addr) {
            info.table = seating.map(|(index, _)| index);
        }

        match seating {
            Some((index, seating)) => {
                let role = match seating {
                    Seating::Player => "player",
                    Seating::Spectator => "spectator",
                };
                out.push(notice(addr, format!("Joined table {index} as {role}.")));
                out.extend(self.progress(index));
            }
            None => out.push(notice(addr, "Back in the lobby.".to_owned())),
        }
        Ok(out)
    }

    /// Records whether a player wants to watch. At a table this takes
    /// effect immediately; in the lobby it applies to the next join.
    pub fn choose_spectator(
        &mut self,
        addr: PeerAddr,
        spectate: bool,
    ) -> Result<Outgoing, TableError> {
        let info = self
            .players
            .get_mut(&addr)
            .ok_or(TableError::UnknownPlayer(addr))?;
        info.prefers_spectating = spectate;

        let Some(index) = info.table else {
            return Ok(Vec::new());
        };
        let table = self
            .tables
            .get_mut(index)
            .ok_or(TableError::NoSuchTable(index))?;
        let mut out = table.set_spectating(addr, spectate)?;
        out.extend(self.progress(index));
        Ok(out)
    }

    /// Forwards a hit or stand to the player's table.
    pub fn player_move(
        &mut self,
        addr: PeerAddr,
        action: PlayerAction,
    ) -> Result<Outgoing, TableError> {
        let index = self
            .players
            .get(&addr)
            .ok_or(TableError::UnknownPlayer(addr))?
            .table
            .ok_or(TableError::NotAtTable(addr))?;
        let table = self
            .tables
            .get_mut(index)
            .ok_or(TableError::NoSuchTable(index))?;
        let mut out = table.handle_move(addr, action)?;
        out.extend(self.progress(index));
        Ok(out)
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    /// Clears a finished round and deals the next one when enough
    /// players are seated.
    ///
    /// A deal can finish on the spot when every player is dealt 21, so
    /// this keeps dealing until a round is left in progress.
    fn progress(&mut self, index: usize) -> Outgoing {
        let Some(table) = self.tables.get_mut(index) else {
            return Vec::new();
        };
        let mut out = Vec::new();
        loop {
            if table.phase() == TablePhase::Finished {
                if let Err(e) = table.clear_round() {
                    tracing::warn!(table = index, error = %e, "could not clear round");
                }
            }
            if !table.can_start() {
                return out;
            }
            match table.start_round() {
                Ok(dealt) => out.extend(dealt),
                Err(e) => {
                    tracing::warn!(table = index, error = %e, "could not start round");
                    return out;
                }
            }
            if table.phase() != TablePhase::Finished {
                return out;
            }
        }
    }
}

/// A private line from the server to one player.
fn notice(to: PeerAddr, text: String) -> (Destination, Message) {
    (
        Destination::Peer(to),
        Message::from(PlayerChat::private(to, text)),
    )
}
