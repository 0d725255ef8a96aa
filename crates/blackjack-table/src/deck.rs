//! A shuffled 52-card shoe.

use blackjack_protocol::CardRank;
use rand::SeedableRng;
use rand::rngs::StdRng;
use rand::seq::SliceRandom;

/// Cards per deck.
pub const DECK_SIZE: usize = 52;

/// A single deck that reshuffles itself when it runs out.
///
/// Suits don't matter in blackjack, so a card is just its [`CardRank`]:
/// ace is 1, two through ten are face value, and jack, queen and king
/// are all 10.
#[derive(Debug, Clone)]
pub struct Deck {
    cards: Vec<CardRank>,
    rng: StdRng,
}

impl Deck {
    /// A freshly shuffled deck seeded from the OS.
    pub fn new() -> Self {
        Self::with_rng(StdRng::from_os_rng())
    }

    /// A deck with a fixed shuffle order. Same seed, same cards.
    pub fn seeded(seed: u64) -> Self {
        Self::with_rng(StdRng::seed_from_u64(seed))
    }

    fn with_rng(rng: StdRng) -> Self {
        let mut deck = Self {
            cards: Vec::with_capacity(DECK_SIZE),
            rng,
        };
        deck.reshuffle();
        deck
    }

    /// Puts all 52 cards back and shuffles.
    pub fn reshuffle(&mut self) {
        self.cards.clear();
        for _suit in 0..4 {
            self.cards
                .extend((1..=13u8).filter_map(|face| CardRank::new(face.min(CardRank::MAX))));
        }
        self.cards.shuffle(&mut self.rng);
    }

    /// Takes the top card, reshuffling first if the deck is empty.
    pub fn draw(&mut self) -> CardRank {
        loop {
            if let Some(card) = self.cards.pop() {
                return card;
            }
            tracing::debug!("deck empty, reshuffling");
            self.reshuffle();
        }
    }

    /// A seeded deck with `top` drawn first, in order.
    #[cfg(test)]
    pub(crate) fn stacked(top: &[u8]) -> Self {
        let mut deck = Self::seeded(0);
        deck.cards
            .extend(top.iter().rev().filter_map(|face| CardRank::new(*face)));
        deck
    }

    /// Cards left before the next reshuffle.
    pub fn remaining(&self) -> usize {
        self.cards.len()
    }
}

impl Default for Deck {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_deck_composition() {
        let mut deck = Deck::seeded(7);
        assert_eq!(deck.remaining(), DECK_SIZE);

        let mut counts = [0usize; 11];
        for _ in 0..DECK_SIZE {
            counts[usize::from(deck.draw().value())] += 1;
        }
        assert_eq!(counts[1], 4, "four aces");
        for value in 2..=9 {
            assert_eq!(counts[value], 4, "four of {value}");
        }
        assert_eq!(counts[10], 16, "tens and face cards");
        assert_eq!(deck.remaining(), 0);
    }

    #[test]
    fn test_empty_deck_reshuffles() {
        let mut deck = Deck::seeded(1);
        for _ in 0..DECK_SIZE {
            deck.draw();
        }
        let card = deck.draw();
        assert!((1..=10).contains(&card.value()));
        assert_eq!(deck.remaining(), DECK_SIZE - 1);
    }

    #[test]
    fn test_same_seed_same_order() {
        let mut a = Deck::seeded(42);
        let mut b = Deck::seeded(42);
        let first: Vec<_> = (0..10).map(|_| a.draw()).collect();
        let second: Vec<_> = (0..10).map(|_| b.draw()).collect();
        assert_eq!(first, second);
    }
}
