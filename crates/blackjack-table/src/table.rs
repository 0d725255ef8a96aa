//! One blackjack table: seats, spectators, turn order, and the dealer.
//!
//! A `Table` is a plain owned value. Nothing here touches the network;
//! every operation returns the messages it wants sent as [`Outgoing`]
//! and the caller queues them.

use blackjack_protocol::{
    Message, Notification, PlayerAction, PlayerActiveOrder, PlayerCardDrawn,
    PlayerChat,
};
use blackjack_transport::{Destination, PeerAddr};

use crate::hand::BLACKJACK;
use crate::{Deck, Hand, Outgoing, TableConfig, TableError, TablePhase};

/// How a player sits at a table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Seating {
    Player,
    Spectator,
}

/// How a player's hand compared to the dealer's.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Outcome {
    Blackjack,
    Win,
    Push,
    Lose,
}

impl Outcome {
    /// Scores `player` against `dealer`.
    pub fn settle(player: &Hand, dealer: &Hand) -> Self {
        if player.is_bust() {
            return Self::Lose;
        }
        if player.is_blackjack() && !dealer.is_blackjack() {
            return Self::Blackjack;
        }
        if dealer.is_bust() {
            return Self::Win;
        }
        match player.value().cmp(&dealer.value()) {
            std::cmp::Ordering::Greater => Self::Win,
            std::cmp::Ordering::Equal => Self::Push,
            std::cmp::Ordering::Less => Self::Lose,
        }
    }
}

impl std::fmt::Display for Outcome {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Blackjack => write!(f, "blackjack, you win"),
            Self::Win => write!(f, "you win"),
            Self::Push => write!(f, "push"),
            Self::Lose => write!(f, "you lose"),
        }
    }
}

#[derive(Debug, Clone)]
struct Seat {
    player: PeerAddr,
    hand: Hand,
}

/// A single table and its round state.
#[derive(Debug)]
pub struct Table {
    index: usize,
    config: TableConfig,
    phase: TablePhase,
    /// Seated players, in the order they sat down.
    seats: Vec<Seat>,
    spectators: Vec<PeerAddr>,
    /// Players dealt into the current round, in turn order.
    order: Vec<PeerAddr>,
    /// Index into `order` of the player to act.
    turn: usize,
    dealer: Hand,
    deck: Deck,
}

impl Table {
    pub fn new(index: usize, config: TableConfig) -> Self {
        Self::with_deck(index, config, Deck::new())
    }

    pub fn with_deck(index: usize, config: TableConfig, deck: Deck) -> Self {
        Self {
            index,
            config: config.validated(),
            phase: TablePhase::WaitingForPlayers,
            seats: Vec::new(),
            spectators: Vec::new(),
            order: Vec::new(),
            turn: 0,
            dealer: Hand::new(),
            deck,
        }
    }

    // -----------------------------------------------------------------------
    // Queries
    // -----------------------------------------------------------------------

    pub fn index(&self) -> usize {
        self.index
    }

    pub fn phase(&self) -> TablePhase {
        self.phase
    }

    pub fn config(&self) -> &TableConfig {
        &self.config
    }

    /// Seated players, in seat order.
    pub fn players(&self) -> Vec<PeerAddr> {
        self.seats.iter().map(|seat| seat.player).collect()
    }

    pub fn spectators(&self) -> &[PeerAddr] {
        &self.spectators
    }

    pub fn seating(&self, player: PeerAddr) -> Option<Seating> {
        if self.seats.iter().any(|seat| seat.player == player) {
            Some(Seating::Player)
        } else if self.spectators.contains(&player) {
            Some(Seating::Spectator)
        } else {
            None
        }
    }

    pub fn contains(&self, player: PeerAddr) -> bool {
        self.seating(player).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.seats.is_empty() && self.spectators.is_empty()
    }

    pub fn hand(&self, player: PeerAddr) -> Option<&Hand> {
        self.seats
            .iter()
            .find(|seat| seat.player == player)
            .map(|seat| &seat.hand)
    }

    pub fn dealer_hand(&self) -> &Hand {
        &self.dealer
    }

    /// The player expected to move, while a round is in progress.
    pub fn current_turn(&self) -> Option<PeerAddr> {
        if self.phase.is_active() {
            self.order.get(self.turn).copied()
        } else {
            None
        }
    }

    /// Turn order as announced to clients. Between rounds this is the
    /// seat order.
    pub fn active_order(&self) -> PlayerActiveOrder {
        let active = if self.phase.is_active() {
            self.order.clone()
        } else {
            self.players()
        };
        PlayerActiveOrder {
            active,
            spectators: self.spectators.clone(),
        }
    }

    /// Returns `true` if a round could start right now.
    pub fn can_start(&self) -> bool {
        self.phase == TablePhase::WaitingForPlayers && self.seats.len() >= self.config.min_players
    }

    // -----------------------------------------------------------------------
    // Membership
    // -----------------------------------------------------------------------

    /// Sits `player` down, or adds them as a spectator.
    ///
    /// A player asking for a seat at a full table is made a spectator if
    /// the table has room for one.
    pub fn join(&mut self, player: PeerAddr, spectate: bool) -> Result<Seating, TableError> {
        if self.contains(player) {
            return Err(TableError::AlreadyAtTable(player, self.index));
        }

        let seat_free = self.seats.len() < self.config.max_players;
        let seating = if !spectate && seat_free {
            self.seats.push(Seat {
                player,
                hand: Hand::new(),
            });
            Seating::Player
        } else if self.config.has_spectator_room(self.spectators.len()) {
            self.spectators.push(player);
            Seating::Spectator
        } else if spectate {
            return Err(TableError::NoSpectatorRoom(self.index));
        } else {
            return Err(TableError::TableFull(self.index));
        };

        tracing::info!(table = self.index, %player, ?seating, "joined table");
        Ok(seating)
    }

    /// Removes `player` from the table.
    ///
    /// Leaving mid-round forfeits the hand. If it was the leaver's turn,
    /// play passes on, and if nobody is left to act the dealer plays out.
    pub fn leave(&mut self, player: PeerAddr) -> Result<Outgoing, TableError> {
        match self.seating(player) {
            None => return Err(TableError::NotAtTable(player)),
            Some(Seating::Spectator) => self.spectators.retain(|p| *p != player),
            Some(Seating::Player) => self.seats.retain(|seat| seat.player != player),
        }
        tracing::info!(table = self.index, %player, "left table");

        let mut out = Vec::new();
        if self.phase.is_active() {
            if let Some(pos) = self.order.iter().position(|p| *p == player) {
                self.order.remove(pos);
                if pos < self.turn {
                    self.turn -= 1;
                }
            }
        }
        out.extend(self.order_update());
        if self.phase.is_active() {
            out.extend(self.pass_finished_turns()?);
        }
        Ok(out)
    }

    /// Switches a seated player to spectating or back.
    ///
    /// Not allowed for someone dealt into the current round.
    pub fn set_spectating(
        &mut self,
        player: PeerAddr,
        spectate: bool,
    ) -> Result<Outgoing, TableError> {
        let current = self.seating(player).ok_or(TableError::NotAtTable(player))?;
        if self.phase.is_active() && self.order.contains(&player) {
            return Err(TableError::InRound(player));
        }

        match (current, spectate) {
            (Seating::Player, true) => {
                if !self.config.has_spectator_room(self.spectators.len()) {
                    return Err(TableError::NoSpectatorRoom(self.index));
                }
                self.seats.retain(|seat| seat.player != player);
                self.spectators.push(player);
            }
            (Seating::Spectator, false) => {
                if self.seats.len() >= self.config.max_players {
                    return Err(TableError::TableFull(self.index));
                }
                self.spectators.retain(|p| *p != player);
                self.seats.push(Seat {
                    player,
                    hand: Hand::new(),
                });
            }
            _ => return Ok(Vec::new()),
        }

        tracing::debug!(table = self.index, %player, spectate, "changed seating");
        Ok(self.order_update())
    }

    // -----------------------------------------------------------------------
    // Round flow
    // -----------------------------------------------------------------------

    /// Deals a new round.
    ///
    /// Announces `GAME_START` and the turn order to everyone at the table,
    /// then deals two cards to each player and one to the dealer. Players
    /// dealt 21 don't get a turn; if nobody is left to act the dealer
    /// plays out at once.
    pub fn start_round(&mut self) -> Result<Outgoing, TableError> {
        if !self.phase.can_transition_to(TablePhase::InProgress) {
            return Err(self.invalid_phase());
        }
        if self.seats.len() < self.config.min_players {
            return Err(TableError::NotEnoughPlayers {
                table: self.index,
                seated: self.seats.len(),
                needed: self.config.min_players,
            });
        }

        self.enter(TablePhase::InProgress)?;
        self.order = self.players();
        self.turn = 0;
        self.dealer.clear();
        for seat in &mut self.seats {
            seat.hand.clear();
        }
        tracing::info!(table = self.index, players = self.order.len(), "round started");

        let mut out = self.to_members(Notification::GAME_START);
        out.extend(self.order_update());

        for _ in 0..2 {
            for player in self.order.clone() {
                out.extend(self.deal_to(player));
            }
        }
        let card = self.deck.draw();
        self.dealer.push(card);
        out.extend(self.to_members(PlayerCardDrawn::dealer(card)));

        out.extend(self.pass_finished_turns()?);
        Ok(out)
    }

    /// Applies a move from `player`.
    ///
    /// A hit deals one card, announced to the whole table. Play passes on
    /// after a stand, a bust, or a hand worth 21. After the last player the
    /// dealer draws and results go out.
    pub fn handle_move(
        &mut self,
        player: PeerAddr,
        action: PlayerAction,
    ) -> Result<Outgoing, TableError> {
        if !self.phase.is_active() {
            return Err(self.invalid_phase());
        }
        if self.current_turn() != Some(player) {
            return Err(TableError::NotYourTurn(player));
        }

        let mut out = Vec::new();
        let turn_over = match action {
            PlayerAction::Hit => {
                out.extend(self.deal_to(player));
                self.hand(player)
                    .is_none_or(|hand| hand.is_bust() || hand.value() == BLACKJACK)
            }
            PlayerAction::Stand => true,
        };

        if turn_over {
            self.turn += 1;
            tracing::debug!(table = self.index, %player, "turn over");
            out.extend(self.pass_finished_turns()?);
        }
        Ok(out)
    }

    /// Resets a finished table for the next round.
    pub fn clear_round(&mut self) -> Result<(), TableError> {
        self.enter(TablePhase::WaitingForPlayers)?;
        self.order.clear();
        self.turn = 0;
        self.dealer.clear();
        for seat in &mut self.seats {
            seat.hand.clear();
        }
        Ok(())
    }

    /// The current turn order, addressed to everyone at the table.
    pub fn order_update(&self) -> Outgoing {
        self.to_members(self.active_order())
    }

    // -----------------------------------------------------------------------
    // Internals
    // -----------------------------------------------------------------------

    fn enter(&mut self, target: TablePhase) -> Result<(), TableError> {
        if !self.phase.can_transition_to(target) {
            return Err(self.invalid_phase());
        }
        tracing::debug!(table = self.index, from = %self.phase, to = %target, "phase change");
        self.phase = target;
        Ok(())
    }

    /// Moves the turn past anyone whose hand is already 21 or bust. Once
    /// the turn runs off the end of the order, the dealer plays out.
    fn pass_finished_turns(&mut self) -> Result<Outgoing, TableError> {
        while let Some(player) = self.order.get(self.turn).copied() {
            if self.hand(player).is_some_and(|hand| hand.value() < BLACKJACK) {
                return Ok(Vec::new());
            }
            tracing::debug!(table = self.index, %player, "no move left, skipping turn");
            self.turn += 1;
        }
        self.finish_round()
    }

    fn invalid_phase(&self) -> TableError {
        TableError::InvalidPhase {
            table: self.index,
            phase: self.phase,
        }
    }

    fn members(&self) -> impl Iterator<Item = PeerAddr> + '_ {
        self.seats
            .iter()
            .map(|seat| seat.player)
            .chain(self.spectators.iter().copied())
    }

    fn to_members(&self, message: impl Into<Message>) -> Outgoing {
        let message = message.into();
        self.members()
            .map(|member| (Destination::Peer(member), message.clone()))
            .collect()
    }

    fn deal_to(&mut self, player: PeerAddr) -> Outgoing {
        let card = self.deck.draw();
        match self.seats.iter_mut().find(|seat| seat.player == player) {
            Some(seat) => seat.hand.push(card),
            None => return Vec::new(),
        }
        self.to_members(PlayerCardDrawn::to_player(player, card))
    }

    /// Dealer plays out, results go to each player privately.
    fn finish_round(&mut self) -> Result<Outgoing, TableError> {
        self.enter(TablePhase::Finished)?;
        let mut out = Vec::new();

        let anyone_standing = self
            .order
            .iter()
            .filter_map(|p| self.hand(*p))
            .any(|hand| !hand.is_bust());
        if anyone_standing {
            while self.dealer.value() < self.config.dealer_stands_on {
                let card = self.deck.draw();
                self.dealer.push(card);
                out.extend(self.to_members(PlayerCardDrawn::dealer(card)));
            }
        }

        tracing::info!(
            table = self.index,
            dealer = self.dealer.value(),
            "round finished"
        );

        for player in &self.order {
            let Some(hand) = self.hand(*player) else {
                continue;
            };
            let outcome = Outcome::settle(hand, &self.dealer);
            let text = format!(
                "Dealer has {}, you have {}: {outcome}",
                self.dealer.value(),
                hand.value()
            );
            out.push((
                Destination::Peer(*player),
                Message::from(PlayerChat::private(*player, text)),
            ));
        }
        Ok(out)
    }
}
