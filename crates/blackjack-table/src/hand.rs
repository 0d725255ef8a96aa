//! Hand scoring: soft aces, busts and blackjacks.

use blackjack_protocol::CardRank;

/// Best possible hand value.
pub const BLACKJACK: u8 = 21;

/// Cards held by a player or the dealer.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Hand {
    cards: Vec<CardRank>,
}

impl Hand {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, card: CardRank) {
        self.cards.push(card);
    }

    pub fn cards(&self) -> &[CardRank] {
        &self.cards
    }

    pub fn is_empty(&self) -> bool {
        self.cards.is_empty()
    }

    pub fn clear(&mut self) {
        self.cards.clear();
    }

    /// Hand value, counting one ace as 11 when that doesn't bust.
    pub fn value(&self) -> u8 {
        let hard: u8 = self
            .cards
            .iter()
            .fold(0u8, |sum, card| sum.saturating_add(card.value()));
        let has_ace = self.cards.iter().any(|card| card.is_ace());
        if has_ace && hard <= BLACKJACK - 10 {
            hard + 10
        } else {
            hard
        }
    }

    pub fn is_bust(&self) -> bool {
        self.value() > BLACKJACK
    }

    /// 21 on the first two cards.
    pub fn is_blackjack(&self) -> bool {
        self.cards.len() == 2 && self.value() == BLACKJACK
    }
}
